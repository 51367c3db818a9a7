//! Technology words: feed, spindle speed and tool selection.

use crate::dialect::Dialect;
use crate::error::NcError;
use crate::handlers::{ExecContext, Flow};
use crate::node::CommandNode;
use crate::state::CncState;

/// Captures `F`/`S`/`T` words into the state before motion runs, so a
/// composite block (`G1 X… F… S…`) uses its own values. Always passes.
#[derive(Debug)]
pub struct TechnologyHandler {
    pub dialect: Dialect,
}

impl TechnologyHandler {
    pub fn handle(
        &self,
        node: &CommandNode,
        state: &mut CncState,
        ctx: &mut ExecContext,
    ) -> Result<Flow, NcError> {
        let line = node.diagnostic_line();

        if let Some(text) = ctx.param('F') {
            state.feed_rate = Some(parse_word(text, 'F', line)?);
        }
        if let Some(text) = ctx.param('S') {
            // Stored as commanded; the spindle-mode modal decides whether it
            // reads as RPM (G97) or surface speed (G96).
            state.spindle_speed = Some(parse_word(text, 'S', line)?);
        }
        if let Some(text) = ctx.param('T') {
            let number = parse_word(text, 'T', line)? as i64;
            let selection = self.dialect.validate_tool(number, line)?;
            tracing::trace!(tool = selection.tool, offset = selection.offset, "tool select");
            state
                .extra
                .insert("tool_number".to_string(), selection.tool.to_string());
            state
                .extra
                .insert("tool_offset".to_string(), selection.offset.to_string());
        }

        Ok(Flow::Pass)
    }
}

fn parse_word(literal: &str, letter: char, line: i64) -> Result<f64, NcError> {
    literal.trim().parse().map_err(|_| {
        NcError::code_in(
            line,
            format!("malformed value for word {letter}"),
            format!("{letter}{literal}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn run(line: &str, dialect: Dialect, state: &mut CncState) -> Result<Flow, NcError> {
        let node = Parser::new().parse(line).expect("parse");
        let mut ctx = ExecContext::default();
        ctx.begin_step(0, &node);
        TechnologyHandler { dialect }.handle(&node, state, &mut ctx)
    }

    #[test]
    fn feed_and_spindle_words_update_state() {
        let mut state = CncState::new();
        run("G1 X1 F250 S1200", Dialect::IsoTurn, &mut state).expect("handle");
        assert_eq!(state.feed_rate, Some(250.0));
        assert_eq!(state.spindle_speed, Some(1200.0));
    }

    #[test]
    fn words_are_optional_and_sticky() {
        let mut state = CncState::new();
        run("F100", Dialect::IsoTurn, &mut state).expect("handle");
        run("G1 X5", Dialect::IsoTurn, &mut state).expect("handle");
        assert_eq!(state.feed_rate, Some(100.0));
    }

    #[test]
    fn iso_tool_word_records_the_hundreds_split() {
        let mut state = CncState::new();
        run("T0101", Dialect::IsoTurn, &mut state).expect("handle");
        assert_eq!(state.extra.get("tool_number").map(String::as_str), Some("1"));
        assert_eq!(state.extra.get("tool_offset").map(String::as_str), Some("1"));
    }

    #[test]
    fn siemens_tool_word_is_taken_whole() {
        let mut state = CncState::new();
        run("T100", Dialect::SiemensMill, &mut state).expect("handle");
        assert_eq!(
            state.extra.get("tool_number").map(String::as_str),
            Some("100")
        );
    }

    #[test]
    fn out_of_range_tool_is_an_error() {
        let mut state = CncState::new();
        let err = run("T10000", Dialect::IsoTurn, &mut state).unwrap_err();
        assert!(
            err.message.contains("Tool number T10000 out of range"),
            "{err}"
        );
    }
}
