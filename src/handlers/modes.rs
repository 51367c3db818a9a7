//! Feed-mode (group 5) and spindle-mode (group 2) modal links.

use crate::error::NcError;
use crate::handlers::{ExecContext, Flow};
use crate::node::CommandNode;
use crate::state::{modal_group_of, CncState, ModalGroup};

/// `G94`/`G95` (milling) and `G98`/`G99` (turning): how the F word converts
/// into a traversal time. State only; motion reads the modal later.
#[derive(Debug)]
pub struct FeedModeHandler;

impl FeedModeHandler {
    pub fn handle(
        &self,
        node: &CommandNode,
        state: &mut CncState,
        _ctx: &mut ExecContext,
    ) -> Result<Flow, NcError> {
        record(node, state, ModalGroup::FeedMode);
        Ok(Flow::Pass)
    }
}

/// `G96` constant surface speed / `G97` direct RPM: how the S word is read.
#[derive(Debug)]
pub struct SpindleModeHandler;

impl SpindleModeHandler {
    pub fn handle(
        &self,
        node: &CommandNode,
        state: &mut CncState,
        _ctx: &mut ExecContext,
    ) -> Result<Flow, NcError> {
        record(node, state, ModalGroup::SpindleMode);
        Ok(Flow::Pass)
    }
}

fn record(node: &CommandNode, state: &mut CncState, group: ModalGroup) {
    for code in &node.g_code {
        if modal_group_of(code) == Some(group) {
            state.set_modal(group, code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn node_of(line: &str) -> CommandNode {
        Parser::new().parse(line).expect("parse")
    }

    #[test]
    fn feed_mode_codes_are_recorded() {
        let mut state = CncState::new();
        let mut ctx = ExecContext::default();
        for (code, expected) in [("G94", "G94"), ("G95", "G95"), ("G98", "G98"), ("G99", "G99")] {
            FeedModeHandler
                .handle(&node_of(code), &mut state, &mut ctx)
                .expect("handle");
            assert_eq!(state.modal(ModalGroup::FeedMode), Some(expected));
        }
        assert!(state.feed_per_revolution());
    }

    #[test]
    fn spindle_mode_codes_are_recorded() {
        let mut state = CncState::new();
        let mut ctx = ExecContext::default();
        SpindleModeHandler
            .handle(&node_of("G96 S200"), &mut state, &mut ctx)
            .expect("handle");
        assert_eq!(state.modal(ModalGroup::SpindleMode), Some("G96"));
        SpindleModeHandler
            .handle(&node_of("G97"), &mut state, &mut ctx)
            .expect("handle");
        assert_eq!(state.modal(ModalGroup::SpindleMode), Some("G97"));
    }

    #[test]
    fn unrelated_codes_are_ignored() {
        let mut state = CncState::new();
        let mut ctx = ExecContext::default();
        FeedModeHandler
            .handle(&node_of("G1 X1"), &mut state, &mut ctx)
            .expect("handle");
        assert_eq!(state.modal(ModalGroup::FeedMode), None);
    }
}
