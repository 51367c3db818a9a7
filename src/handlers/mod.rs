//! The block-interpretation chain.
//!
//! Each handler inspects the current node and either consumes it
//! ([`Flow::Done`]) or leaves it for the links further down ([`Flow::Pass`]),
//! possibly after recording side effects in the state or the execution
//! context. The ordered array of links per dialect is built by
//! [`Chain::for_dialect`].

pub mod control_flow;
pub mod cycles;
pub mod modal;
pub mod modes;
pub mod motion;
pub mod non_modal;
pub mod technology;
pub mod variable;

use std::collections::BTreeMap;

use crate::config::MotionLimits;
use crate::dialect::Dialect;
use crate::error::NcError;
use crate::node::CommandNode;
use crate::state::CncState;
use crate::toolpath::Point;

pub use control_flow::ControlFlowHandler;
pub use cycles::CycleHandler;
pub use modal::ModalHandler;
pub use modes::{FeedModeHandler, SpindleModeHandler};
pub use motion::MotionHandler;
pub use non_modal::NonModalHandler;
pub use technology::TechnologyHandler;
pub use variable::VariableHandler;

/// Geometry emitted by one interpreted block.
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    pub points: Vec<Point>,
    pub seconds: f64,
}

impl Emission {
    pub fn new(points: Vec<Point>, seconds: f64) -> Self {
        Emission { points, seconds }
    }
}

/// Outcome of one handler looking at one node.
#[derive(Debug)]
pub enum Flow {
    /// Not consumed (or side effects only); the next link decides.
    Pass,
    /// Consumed; the engine appends the emission, if any, and moves on.
    Done(Option<Emission>),
}

/// Per-run lookup tables and per-step scratch shared by the chain links.
///
/// Control flow never mutates the node list; it requests a jump here and
/// the engine follows `jump.unwrap_or(current + 1)`.
#[derive(Debug, Default)]
pub struct ExecContext {
    /// N word → node index.
    pub label_map: BTreeMap<i64, usize>,
    /// Loop tag → indices of its `DO` nodes, ascending.
    pub do_map: BTreeMap<String, Vec<usize>>,
    /// Loop tag → indices of its `END` nodes, ascending.
    pub end_map: BTreeMap<String, Vec<usize>>,
    /// Remaining repetitions per loop tag.
    pub loop_counters: BTreeMap<String, i64>,
    /// Index of the node being interpreted.
    pub current: usize,
    /// Requested next node, when control flow redirects execution.
    pub jump: Option<usize>,
    /// This step's working copy of the node's parameters. The variable
    /// handler substitutes references here so the node itself stays
    /// untouched and re-entrant.
    pub params: BTreeMap<char, String>,
}

impl ExecContext {
    /// Scans the node list and builds the jump tables for one run.
    pub fn for_nodes(nodes: &[CommandNode]) -> Self {
        let mut ctx = ExecContext::default();
        for (index, node) in nodes.iter().enumerate() {
            if let Some(n) = node.line_number {
                ctx.label_map.entry(n).or_insert(index);
            }
            let Some(loop_command) = &node.loop_command else {
                continue;
            };
            for token in loop_command.split_whitespace() {
                if let Some(tag) = loop_tag(token, "DO") {
                    ctx.do_map.entry(tag).or_default().push(index);
                } else if let Some(tag) = loop_tag(token, "END") {
                    ctx.end_map.entry(tag).or_default().push(index);
                }
            }
        }
        ctx
    }

    /// Prepares the per-step scratch before dispatching `node`.
    pub fn begin_step(&mut self, index: usize, node: &CommandNode) {
        self.current = index;
        self.jump = None;
        self.params = node.command_parameter.clone();
    }

    /// This step's value for a parameter letter, after substitution.
    pub fn param(&self, letter: char) -> Option<&str> {
        self.params.get(&letter).map(String::as_str)
    }
}

/// Extracts the digit tag from `DO1`-style tokens.
fn loop_tag(token: &str, prefix: &str) -> Option<String> {
    let rest = token.strip_prefix(prefix)?;
    if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
        Some(rest.to_string())
    } else {
        None
    }
}

/// One link of the chain. A tagged enum keeps dispatch flat and lets each
/// variant own only its configuration.
#[derive(Debug)]
pub enum Handler {
    Variable(VariableHandler),
    ControlFlow(ControlFlowHandler),
    Cycle(CycleHandler),
    Technology(TechnologyHandler),
    Modal(ModalHandler),
    FeedMode(FeedModeHandler),
    SpindleMode(SpindleModeHandler),
    NonModal(NonModalHandler),
    Motion(MotionHandler),
}

impl Handler {
    pub fn handle(
        &self,
        node: &CommandNode,
        state: &mut CncState,
        ctx: &mut ExecContext,
    ) -> Result<Flow, NcError> {
        match self {
            Handler::Variable(h) => h.handle(node, state, ctx),
            Handler::ControlFlow(h) => h.handle(node, state, ctx),
            Handler::Cycle(h) => h.handle(node, state, ctx),
            Handler::Technology(h) => h.handle(node, state, ctx),
            Handler::Modal(h) => h.handle(node, state, ctx),
            Handler::FeedMode(h) => h.handle(node, state, ctx),
            Handler::SpindleMode(h) => h.handle(node, state, ctx),
            Handler::NonModal(h) => h.handle(node, state, ctx),
            Handler::Motion(h) => h.handle(node, state, ctx),
        }
    }
}

/// The ordered handler array for one canal.
#[derive(Debug)]
pub struct Chain {
    links: Vec<Handler>,
}

impl Chain {
    /// Builds the chain for a dialect: variables and control flow first,
    /// cycle expansion (where the dialect has cycles) before the word
    /// handlers, motion terminal.
    pub fn for_dialect(dialect: Dialect, limits: &MotionLimits) -> Self {
        let mut links = vec![
            Handler::Variable(VariableHandler),
            Handler::ControlFlow(ControlFlowHandler),
        ];
        if dialect == Dialect::SiemensMill {
            links.push(Handler::Cycle(CycleHandler {
                max_segment: limits.cycle_segment,
            }));
        }
        links.push(Handler::Technology(TechnologyHandler { dialect }));
        links.push(Handler::Modal(ModalHandler));
        links.push(Handler::FeedMode(FeedModeHandler));
        links.push(Handler::SpindleMode(SpindleModeHandler));
        links.push(Handler::NonModal(NonModalHandler {
            max_segment: limits.max_segment,
            rapid_rate: limits.rapid_rate,
        }));
        links.push(Handler::Motion(MotionHandler {
            max_segment: limits.max_segment,
            rapid_rate: limits.rapid_rate,
        }));
        Chain { links }
    }

    /// Runs the node through the links in order. `None` when no link
    /// produced geometry.
    pub fn dispatch(
        &self,
        node: &CommandNode,
        state: &mut CncState,
        ctx: &mut ExecContext,
    ) -> Result<Option<Emission>, NcError> {
        for link in &self.links {
            match link.handle(node, state, ctx)? {
                Flow::Pass => continue,
                Flow::Done(emission) => return Ok(emission),
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn nodes_of(program: &str) -> Vec<CommandNode> {
        Parser::new().parse_program(program).expect("parse")
    }

    #[test]
    fn context_builds_label_and_loop_maps() {
        let nodes = nodes_of("N10 G0 X0\nDO1\nN20 G1 X1 F100\nEND1\nN30 M30\n");
        let ctx = ExecContext::for_nodes(&nodes);
        assert_eq!(ctx.label_map[&10], 0);
        assert_eq!(ctx.label_map[&20], 2);
        assert_eq!(ctx.label_map[&30], 4);
        assert_eq!(ctx.do_map["1"], vec![1]);
        assert_eq!(ctx.end_map["1"], vec![3]);
    }

    #[test]
    fn duplicate_labels_keep_the_first_node() {
        let nodes = nodes_of("N10 G0 X0\nN10 G0 X1\n");
        let ctx = ExecContext::for_nodes(&nodes);
        assert_eq!(ctx.label_map[&10], 0);
    }

    #[test]
    fn begin_step_resets_jump_and_copies_params() {
        let nodes = nodes_of("G1 X5 F100\n");
        let mut ctx = ExecContext::for_nodes(&nodes);
        ctx.jump = Some(7);
        ctx.begin_step(0, &nodes[0]);
        assert_eq!(ctx.current, 0);
        assert!(ctx.jump.is_none());
        assert_eq!(ctx.param('X'), Some("5"));
        assert_eq!(ctx.param('Q'), None);
    }

    #[test]
    fn chain_for_siemens_includes_cycle_link() {
        let limits = MotionLimits::default();
        let mill = Chain::for_dialect(Dialect::SiemensMill, &limits);
        assert!(mill
            .links
            .iter()
            .any(|link| matches!(link, Handler::Cycle(_))));
        let turn = Chain::for_dialect(Dialect::IsoTurn, &limits);
        assert!(!turn
            .links
            .iter()
            .any(|link| matches!(link, Handler::Cycle(_))));
    }

    #[test]
    fn unmatched_node_falls_through_to_none() {
        let nodes = nodes_of("N10 G17\n");
        let chain = Chain::for_dialect(Dialect::IsoTurn, &MotionLimits::default());
        let mut state = CncState::new();
        let mut ctx = ExecContext::for_nodes(&nodes);
        ctx.begin_step(0, &nodes[0]);
        let emission = chain
            .dispatch(&nodes[0], &mut state, &mut ctx)
            .expect("dispatch");
        assert!(emission.is_none());
    }
}
