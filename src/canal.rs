//! One independent NC execution channel.
//!
//! A canal owns its state, its handler chain, the node list of the current
//! run and the emitted tool path. Canals never share state; a controller
//! simply owns several of them.

use crate::config::MotionLimits;
use crate::dialect::Dialect;
use crate::error::{ErrorKind, NcError};
use crate::handlers::{Chain, ExecContext};
use crate::node::CommandNode;
use crate::state::{modal_group_of, CncState, ModalGroup};
use crate::toolpath::PathSegment;

#[derive(Debug)]
pub struct Canal {
    name: String,
    state: CncState,
    chain: Chain,
    nodes: Vec<CommandNode>,
    tool_path: Vec<PathSegment>,
    error_log: Vec<NcError>,
}

impl Canal {
    pub fn new(name: impl Into<String>, dialect: Dialect) -> Self {
        Canal::with_limits(name, dialect, &MotionLimits::default())
    }

    pub fn with_limits(name: impl Into<String>, dialect: Dialect, limits: &MotionLimits) -> Self {
        Canal {
            name: name.into(),
            state: CncState::new(),
            chain: Chain::for_dialect(dialect, limits),
            nodes: Vec::new(),
            tool_path: Vec::new(),
            error_log: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &CncState {
        &self.state
    }

    /// The `(points, seconds)` segments of the last successful run, in
    /// execution order.
    pub fn tool_path(&self) -> &[PathSegment] {
        &self.tool_path
    }

    /// The node list of the last run.
    pub fn exec_nodes(&self) -> &[CommandNode] {
        &self.nodes
    }

    /// Every error this canal has reported, oldest first.
    pub fn error_log(&self) -> &[NcError] {
        &self.error_log
    }

    /// Interprets a program.
    ///
    /// Execution follows node indices; control flow redirects by writing a
    /// jump into the context, and the engine reads `jump.unwrap_or(i + 1)`.
    /// On error the partial tool path is discarded and the error is also
    /// appended to [`Canal::error_log`].
    pub fn run_nc_code_list(&mut self, nodes: Vec<CommandNode>) -> Result<(), NcError> {
        self.nodes = nodes;
        self.tool_path.clear();
        let mut ctx = ExecContext::for_nodes(&self.nodes);

        // Hard bound against non-terminating programs.
        let max_steps = 10_000.max(self.nodes.len() * 100);
        let mut steps = 0usize;
        let mut index = 0usize;

        tracing::debug!(canal = %self.name, nodes = self.nodes.len(), "run start");
        while index < self.nodes.len() {
            steps += 1;
            if steps > max_steps {
                return Err(self.fail(NcError::code(
                    -1,
                    format!("program exceeded the step budget of {max_steps} nodes"),
                )));
            }

            let node = &self.nodes[index];
            if let Err(err) = one_code_per_group(node) {
                return Err(self.fail(err));
            }

            ctx.begin_step(index, node);
            tracing::trace!(canal = %self.name, index, line = node.diagnostic_line(), "step");
            match self.chain.dispatch(node, &mut self.state, &mut ctx) {
                Ok(Some(emission)) => {
                    self.tool_path
                        .push(PathSegment::new(emission.points, emission.seconds));
                }
                Ok(None) => {}
                Err(err) => return Err(self.fail(err)),
            }

            if node.has_m(30) || node.has_m(2) {
                break;
            }
            let next = ctx.jump.take().unwrap_or(index + 1);
            if next == index {
                break; // a self-jump would never advance
            }
            index = next;
        }
        tracing::debug!(canal = %self.name, segments = self.tool_path.len(), "run done");
        Ok(())
    }

    fn fail(&mut self, err: NcError) -> NcError {
        tracing::warn!(canal = %self.name, error = %err, "run aborted");
        self.tool_path.clear();
        self.error_log.push(err.clone());
        err
    }
}

/// At most one G-code of each modal group per block.
fn one_code_per_group(node: &CommandNode) -> Result<(), NcError> {
    let mut seen: Vec<ModalGroup> = Vec::new();
    for code in &node.g_code {
        if let Some(group) = modal_group_of(code) {
            if seen.contains(&group) {
                return Err(NcError::new(
                    ErrorKind::TooManyGcodeOfOneGroup,
                    node.diagnostic_line(),
                    format!("more than one G-code of group {group:?} on one block"),
                    node.g_code.join(" "),
                ));
            }
            seen.push(group);
        }
    }
    Ok(())
}
