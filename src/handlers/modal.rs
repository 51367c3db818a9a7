//! Distance, plane, units and work-offset modal recording.

use crate::error::NcError;
use crate::handlers::{ExecContext, Flow};
use crate::node::CommandNode;
use crate::state::{modal_group_of, CncState, ModalGroup};

/// Records the general-purpose modal groups and always passes the node on,
/// so composite blocks (`G90 G1 X…`) still reach motion.
///
/// The feed-mode and spindle-mode groups have their own links; the motion
/// group is recorded by the motion handler itself.
#[derive(Debug)]
pub struct ModalHandler;

impl ModalHandler {
    pub fn handle(
        &self,
        node: &CommandNode,
        state: &mut CncState,
        _ctx: &mut ExecContext,
    ) -> Result<Flow, NcError> {
        for code in &node.g_code {
            match modal_group_of(code) {
                Some(
                    group @ (ModalGroup::Distance
                    | ModalGroup::Plane
                    | ModalGroup::Units
                    | ModalGroup::WorkOffset),
                ) => state.set_modal(group, code),
                _ => {}
            }
        }
        if let Some(n) = node.line_number {
            state.line_number = n;
        }
        Ok(Flow::Pass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn apply(line: &str, state: &mut CncState) {
        let node = Parser::new().parse(line).expect("parse");
        let mut ctx = ExecContext::default();
        ctx.begin_step(0, &node);
        let flow = ModalHandler.handle(&node, state, &mut ctx).expect("handle");
        assert!(matches!(flow, Flow::Pass));
    }

    #[test]
    fn records_all_four_groups_from_one_block() {
        let mut state = CncState::new();
        apply("N10 G17 G90 G21 G54", &mut state);
        assert_eq!(state.modal(ModalGroup::Plane), Some("G17"));
        assert_eq!(state.modal(ModalGroup::Distance), Some("G90"));
        assert_eq!(state.modal(ModalGroup::Units), Some("G21"));
        assert_eq!(state.modal(ModalGroup::WorkOffset), Some("G54"));
        assert_eq!(state.line_number, 10);
    }

    #[test]
    fn later_code_supersedes_the_group() {
        let mut state = CncState::new();
        apply("G90", &mut state);
        apply("G91", &mut state);
        assert_eq!(state.modal(ModalGroup::Distance), Some("G91"));
        assert!(!state.absolute_distance());
    }

    #[test]
    fn other_groups_are_left_to_their_own_handlers() {
        let mut state = CncState::new();
        apply("G94 G96 G1", &mut state);
        assert_eq!(state.modal(ModalGroup::FeedMode), None);
        assert_eq!(state.modal(ModalGroup::SpindleMode), None);
        assert_eq!(state.modal(ModalGroup::Motion), None);
    }
}
