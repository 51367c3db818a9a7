//! Jumps and counted loops.
//!
//! Control flow never touches the node list. The canal builds `label_map`,
//! `do_map` and `end_map` before the run; this handler reads them and
//! requests jumps through `ctx.jump`, which the engine follows instead of
//! the next sequential index.

use crate::error::NcError;
use crate::expr;
use crate::handlers::{ExecContext, Flow};
use crate::node::CommandNode;
use crate::state::{CncState, VarKey};

#[derive(Debug)]
pub struct ControlFlowHandler;

impl ControlFlowHandler {
    pub fn handle(
        &self,
        node: &CommandNode,
        state: &mut CncState,
        ctx: &mut ExecContext,
    ) -> Result<Flow, NcError> {
        let Some(statement) = node.loop_command.as_deref() else {
            return Ok(Flow::Pass);
        };
        let line = node.diagnostic_line();

        if let Some(rest) = statement.strip_prefix("GOTO") {
            ctx.jump = Some(self.resolve_label(rest, ctx, line)?);
            return Ok(Flow::Done(None));
        }

        if let Some(rest) = statement.strip_prefix("IF") {
            let (condition, target) = rest.split_once("GOTO").ok_or_else(|| {
                NcError::code_in(line, "IF without GOTO target", statement)
            })?;
            if evaluate_condition(condition, state, line)? {
                ctx.jump = Some(self.resolve_label(target, ctx, line)?);
            }
            return Ok(Flow::Done(None));
        }

        for token in statement.split_whitespace() {
            if let Some(tag) = strip_marker(token, "DO") {
                self.enter_loop(tag, node, state, ctx, line)?;
            } else if let Some(tag) = strip_marker(token, "END") {
                self.close_loop(tag, ctx, line)?;
            }
        }
        Ok(Flow::Pass)
    }

    /// `DO<tag>`: arm the counter. The repetition count comes from a `Q`
    /// word on the same block, else from the variable spelled like the tag,
    /// else 1. Loop-backs land on the block after the `DO`, so the counter
    /// is armed exactly once per loop entry.
    fn enter_loop(
        &self,
        tag: &str,
        node: &CommandNode,
        state: &CncState,
        ctx: &mut ExecContext,
        line: i64,
    ) -> Result<(), NcError> {
        let count = match ctx.param('Q') {
            Some(text) => expr::eval(text, &state.parameters, line)? as i64,
            None => tag
                .parse::<u32>()
                .ok()
                .and_then(|n| {
                    state
                        .parameter(VarKey::R(n))
                        .or_else(|| state.parameter(VarKey::Hash(n)))
                })
                .map(|v| v as i64)
                .unwrap_or(1),
        };
        if count < 0 {
            return Err(NcError::code_in(
                line,
                format!("negative repeat count {count} for DO{tag}"),
                node.loop_command.clone().unwrap_or_default(),
            ));
        }
        tracing::trace!(tag, count, "enter loop");
        ctx.loop_counters.insert(tag.to_string(), count);
        Ok(())
    }

    /// `END<tag>`: count down and jump back to the block after the matching
    /// `DO` while repetitions remain.
    fn close_loop(&self, tag: &str, ctx: &mut ExecContext, line: i64) -> Result<(), NcError> {
        let do_index = ctx
            .do_map
            .get(tag)
            .and_then(|dos| dos.iter().rev().find(|&&i| i < ctx.current))
            .copied()
            .ok_or_else(|| {
                NcError::code_in(line, format!("END{tag} has no matching DO{tag}"), "")
            })?;

        let Some(remaining) = ctx.loop_counters.get_mut(tag) else {
            return Ok(()); // counter exhausted or DO skipped over; fall through
        };
        *remaining -= 1;
        if *remaining > 0 {
            ctx.jump = Some(do_index + 1);
        } else {
            ctx.loop_counters.remove(tag);
        }
        Ok(())
    }

    /// Parses ` N20`, `20`, `F N20` (forward/backward variants share the
    /// label table) and looks the label up.
    fn resolve_label(&self, text: &str, ctx: &ExecContext, line: i64) -> Result<usize, NcError> {
        let text = text.trim_start_matches(['F', 'B']).trim();
        let digits = text.trim_start_matches(['N', 'n']).trim();
        let label: i64 = digits.parse().map_err(|_| {
            NcError::code_in(line, format!("malformed jump target `{text}`"), "")
        })?;
        ctx.label_map.get(&label).copied().ok_or_else(|| {
            NcError::code_in(line, format!("jump target N{label} not found"), "")
        })
    }
}

fn strip_marker<'a>(token: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = token.strip_prefix(prefix)?;
    (!rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit())).then_some(rest)
}

/// `<lhs> <op> <rhs>` over parameter expressions.
fn evaluate_condition(text: &str, state: &CncState, line: i64) -> Result<bool, NcError> {
    const OPERATORS: [&str; 7] = [">=", "<=", "<>", "==", ">", "<", "="];
    let text = text.trim();
    for op in OPERATORS {
        if let Some(at) = text.find(op) {
            let lhs = expr::eval(&text[..at], &state.parameters, line)?;
            let rhs = expr::eval(&text[at + op.len()..], &state.parameters, line)?;
            return Ok(match op {
                ">=" => lhs >= rhs,
                "<=" => lhs <= rhs,
                "<>" => lhs != rhs,
                ">" => lhs > rhs,
                "<" => lhs < rhs,
                _ => lhs == rhs,
            });
        }
    }
    Err(NcError::code_in(
        line,
        "condition has no comparison operator",
        text,
    ))
}
