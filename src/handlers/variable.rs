//! Program variable assignment and substitution.

use crate::error::NcError;
use crate::expr;
use crate::handlers::{ExecContext, Flow};
use crate::node::CommandNode;
use crate::state::{CncState, VarKey};

/// Runs first in the chain: stores `#n=…` / `Rn=…` assignments and replaces
/// variable references in the step's parameter scratch, so every handler
/// downstream only ever sees plain numbers.
#[derive(Debug)]
pub struct VariableHandler;

impl VariableHandler {
    pub fn handle(
        &self,
        node: &CommandNode,
        state: &mut CncState,
        ctx: &mut ExecContext,
    ) -> Result<Flow, NcError> {
        let line = node.diagnostic_line();

        if let Some(statement) = node.loop_command.as_deref() {
            if let Some((key, rhs)) = split_assignment(statement) {
                let value = expr::eval(rhs, &state.parameters, line)?;
                tracing::trace!(variable = %key, value, "assign");
                state.set_parameter(key, value);
                return Ok(Flow::Done(None));
            }
        }

        // Substitute references in the scratch copy only; the node keeps its
        // literal text so re-entry under a loop resolves against fresh state.
        for value in ctx.params.values_mut() {
            if let Some(key) = reference_key(value) {
                let resolved = state.parameter(key).ok_or_else(|| {
                    NcError::code_in(line, format!("unknown variable {key}"), value.clone())
                })?;
                *value = format_value(resolved);
            }
        }

        Ok(Flow::Pass)
    }
}

/// Splits `#1=10+2` into the target key and the right-hand side.
fn split_assignment(statement: &str) -> Option<(VarKey, &str)> {
    let (lhs, rhs) = statement.split_once('=')?;
    let key = VarKey::parse(lhs.trim())?;
    Some((key, rhs.trim()))
}

/// `Some(key)` when a parameter literal is a variable reference.
fn reference_key(literal: &str) -> Option<VarKey> {
    if literal.starts_with('#') || literal.starts_with('R') || literal.starts_with('r') {
        VarKey::parse(literal)
    } else {
        None
    }
}

fn format_value(value: f64) -> String {
    // f64 Display round-trips exactly, so the motion parser sees the same
    // number that was stored.
    format!("{value}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn step(program_line: &str, state: &mut CncState) -> (CommandNode, ExecContext, Flow) {
        let node = Parser::new().parse(program_line).expect("parse");
        let mut ctx = ExecContext::default();
        ctx.begin_step(0, &node);
        let flow = VariableHandler
            .handle(&node, state, &mut ctx)
            .expect("handle");
        (node, ctx, flow)
    }

    #[test]
    fn hash_assignment_is_stored_and_consumed() {
        let mut state = CncState::new();
        let (_, _, flow) = step("#1=10", &mut state);
        assert!(matches!(flow, Flow::Done(None)));
        assert_eq!(state.parameter(VarKey::Hash(1)), Some(10.0));
    }

    #[test]
    fn r_assignment_evaluates_the_right_hand_side() {
        let mut state = CncState::new();
        state.set_parameter(VarKey::R(1), 4.0);
        step("R2=2*R1+1", &mut state);
        assert_eq!(state.parameter(VarKey::R(2)), Some(9.0));
    }

    #[test]
    fn reassignment_overwrites() {
        let mut state = CncState::new();
        step("#1=1", &mut state);
        step("#1=#1+1", &mut state);
        assert_eq!(state.parameter(VarKey::Hash(1)), Some(2.0));
    }

    #[test]
    fn references_are_substituted_into_the_scratch_only() {
        let mut state = CncState::new();
        state.set_parameter(VarKey::Hash(1), 10.0);
        let (node, ctx, flow) = step("G0 X#1", &mut state);
        assert!(matches!(flow, Flow::Pass));
        assert_eq!(ctx.param('X'), Some("10"));
        // The node itself keeps the literal reference.
        assert_eq!(node.command_parameter[&'X'], "#1");
    }

    #[test]
    fn siemens_reference_form_is_substituted() {
        let mut state = CncState::new();
        state.set_parameter(VarKey::R(1), 7.5);
        let (_, ctx, _) = step("G0 X=R1", &mut state);
        assert_eq!(ctx.param('X'), Some("7.5"));
    }

    #[test]
    fn unknown_reference_is_an_error() {
        let node = Parser::new().parse("G0 X#9").expect("parse");
        let mut state = CncState::new();
        let mut ctx = ExecContext::default();
        ctx.begin_step(0, &node);
        let err = VariableHandler
            .handle(&node, &mut state, &mut ctx)
            .unwrap_err();
        assert!(err.message.contains("unknown variable #9"), "{err}");
    }

    #[test]
    fn arc_radius_literal_is_not_treated_as_a_reference() {
        let mut state = CncState::new();
        let (_, ctx, _) = step("G2 X10 Y0 R5", &mut state);
        assert_eq!(ctx.param('R'), Some("5"));
    }

    #[test]
    fn division_by_zero_in_assignment_is_an_error() {
        let node = Parser::new().parse("#1=1/0").expect("parse");
        let mut state = CncState::new();
        let mut ctx = ExecContext::default();
        ctx.begin_step(0, &node);
        assert!(VariableHandler
            .handle(&node, &mut state, &mut ctx)
            .is_err());
    }
}
