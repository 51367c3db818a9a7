//! Non-modal codes: `G28` reference return and `G50` position set.

use std::collections::BTreeMap;

use crate::error::NcError;
use crate::handlers::motion::{duration_seconds, feed_per_minute, segment_line};
use crate::handlers::{Emission, ExecContext, Flow};
use crate::node::CommandNode;
use crate::state::CncState;
use crate::toolpath::Point;

#[derive(Debug)]
pub struct NonModalHandler {
    pub max_segment: f64,
    pub rapid_rate: Option<f64>,
}

impl NonModalHandler {
    pub fn handle(
        &self,
        node: &CommandNode,
        state: &mut CncState,
        ctx: &mut ExecContext,
    ) -> Result<Flow, NcError> {
        if node.has_g(28) {
            return self.reference_return(node, state, ctx).map(|emission| {
                Flow::Done(Some(emission))
            });
        }
        if node.has_g(50) {
            self.set_position(node, state, ctx)?;
            return Ok(Flow::Done(None));
        }
        Ok(Flow::Pass)
    }

    /// `G28`: move through the optional intermediate point given by the axis
    /// words, then to the machine reference position. The reference position
    /// per axis is its entry in `state.offsets` (0.0 when absent).
    fn reference_return(
        &self,
        node: &CommandNode,
        state: &mut CncState,
        ctx: &ExecContext,
    ) -> Result<Emission, NcError> {
        let line = node.diagnostic_line();
        let intermediate = self.axis_words(ctx, line)?;
        let referenced: Vec<char> = if intermediate.is_empty() {
            state.axes.keys().copied().collect()
        } else {
            intermediate.keys().copied().collect()
        };

        let feed = feed_per_minute(state, true, self.rapid_rate);
        let mut points = Vec::new();
        let mut travelled = 0.0;
        let mut from = Point::from_axes(&state.axes);

        if !intermediate.is_empty() {
            let via = state.resolve_target(&intermediate, state.absolute_distance());
            let to = Point::from_axes(&via);
            travelled += from.linear_distance(&to);
            points.extend(segment_line(from, to, self.max_segment));
            state.update_axes(&via);
            from = to;
        }

        let mut reference = state.axes.clone();
        for letter in referenced {
            let home = state.offsets.get(&letter).copied().unwrap_or(0.0);
            reference.insert(letter, home);
        }
        let to = Point::from_axes(&reference);
        travelled += from.linear_distance(&to);
        points.extend(segment_line(from, to, self.max_segment));
        state.update_axes(&reference);

        tracing::trace!(line, "reference return");
        Ok(Emission::new(points, duration_seconds(travelled, feed)))
    }

    /// `G50`: declare the current position. Axes are written directly, no
    /// motion is emitted, and nothing further on the block is interpreted.
    fn set_position(
        &self,
        node: &CommandNode,
        state: &mut CncState,
        ctx: &ExecContext,
    ) -> Result<(), NcError> {
        let declared = self.axis_words(ctx, node.diagnostic_line())?;
        state.update_axes(&declared);
        Ok(())
    }

    fn axis_words(&self, ctx: &ExecContext, line: i64) -> Result<BTreeMap<char, f64>, NcError> {
        let mut words = BTreeMap::new();
        for (&letter, literal) in &ctx.params {
            if matches!(letter, 'X' | 'Y' | 'Z' | 'A' | 'B' | 'C' | 'U' | 'V' | 'W') {
                let value: f64 = literal.trim().parse().map_err(|_| {
                    NcError::code_in(
                        line,
                        format!("malformed value for word {letter}"),
                        format!("{letter}{literal}"),
                    )
                })?;
                words.insert(letter, value);
            }
        }
        Ok(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn handler() -> NonModalHandler {
        NonModalHandler {
            max_segment: 0.5,
            rapid_rate: None,
        }
    }

    fn run(line: &str, state: &mut CncState) -> Flow {
        let node = Parser::new().parse(line).expect("parse");
        let mut ctx = ExecContext::default();
        ctx.begin_step(0, &node);
        handler().handle(&node, state, &mut ctx).expect("handle")
    }

    #[test]
    fn g50_sets_axes_without_motion() {
        let mut state = CncState::new();
        let flow = run("G50 X100 Z50", &mut state);
        assert!(matches!(flow, Flow::Done(None)));
        assert_eq!(state.axis('X'), 100.0);
        assert_eq!(state.axis('Z'), 50.0);
    }

    #[test]
    fn g28_without_words_homes_every_axis() {
        let mut state = CncState::new();
        state.set_axis('X', 10.0);
        state.set_axis('Z', -5.0);
        let Flow::Done(Some(emission)) = run("G28", &mut state) else {
            panic!("expected emission");
        };
        assert_eq!(state.axis('X'), 0.0);
        assert_eq!(state.axis('Z'), 0.0);
        let last = emission.points.last().unwrap();
        assert_eq!((last.x, last.y, last.z), (0.0, 0.0, 0.0));
    }

    #[test]
    fn g28_goes_through_the_intermediate_point() {
        let mut state = CncState::new();
        state.set_axis('X', 10.0);
        let Flow::Done(Some(emission)) = run("G28 X5", &mut state) else {
            panic!("expected emission");
        };
        // 10 → 5 → 0: some emitted point sits at the via position.
        assert!(emission
            .points
            .iter()
            .any(|p| (p.x - 5.0).abs() < 1e-9));
        assert_eq!(state.axis('X'), 0.0);
        // Only the referenced axis moves.
        assert_eq!(state.axis('Y'), 0.0);
    }

    #[test]
    fn g28_reference_position_comes_from_offsets() {
        let mut state = CncState::new();
        state.offsets.insert('X', 2.0);
        state.set_axis('X', 10.0);
        run("G28 X10", &mut state);
        assert_eq!(state.axis('X'), 2.0);
    }

    #[test]
    fn other_blocks_pass_through() {
        let mut state = CncState::new();
        assert!(matches!(run("G1 X5", &mut state), Flow::Pass));
    }
}
