//! The multi-canal control: owns N canals and forwards calls.

use std::collections::BTreeMap;

use crate::canal::Canal;
use crate::config::MachineConfig;
use crate::dialect::Dialect;
use crate::error::{ErrorKind, NcError};
use crate::node::CommandNode;
use crate::parser::Parser;
use crate::toolpath::PathSegment;

/// Owns the canals of one machine, indexed `1..=N`.
///
/// Read accessors return empties for unknown indices; running a program on
/// an unknown index is an error.
#[derive(Debug)]
pub struct Controller {
    canals: BTreeMap<u32, Canal>,
    parser: Parser,
}

impl Controller {
    /// A controller with `count` canals named `C1..CN`.
    pub fn new(count: u32, dialect: Dialect) -> Self {
        let canals = (1..=count)
            .map(|index| (index, Canal::new(format!("C{index}"), dialect)))
            .collect();
        Controller {
            canals,
            parser: Parser::new(),
        }
    }

    /// Builds the controller a machine description declares.
    pub fn from_config(config: &MachineConfig) -> Self {
        let canals = (1..=config.machine.canals)
            .map(|index| {
                let canal = Canal::with_limits(
                    config.canal_name(index),
                    config.machine.dialect,
                    &config.motion,
                );
                (index, canal)
            })
            .collect();
        Controller {
            canals,
            parser: Parser::new(),
        }
    }

    /// Parses a TOML machine description and builds its controller.
    pub fn from_toml(text: &str) -> Result<Self, NcError> {
        let config = MachineConfig::from_toml(text).map_err(|err| {
            NcError::new(ErrorKind::ErrorInACanal, -1, err.to_string(), "machine config")
        })?;
        Ok(Controller::from_config(&config))
    }

    pub fn canal_count(&self) -> u32 {
        self.canals.len() as u32
    }

    pub fn canal_name(&self, canal: u32) -> String {
        self.canals
            .get(&canal)
            .map(|c| c.name().to_string())
            .unwrap_or_else(|| format!("C{canal}"))
    }

    /// Runs a parsed node list on the selected canal.
    pub fn run_nc_code_list(&mut self, nodes: Vec<CommandNode>, canal: u32) -> Result<(), NcError> {
        let selected = self.canals.get_mut(&canal).ok_or_else(|| {
            NcError::new(
                ErrorKind::SelectedCanalDoesNotExist,
                -1,
                format!("canal {canal} is not configured"),
                "",
            )
        })?;
        selected.run_nc_code_list(nodes)
    }

    /// Parses `text` and runs it on the selected canal. Lexer failures are
    /// wrapped at this boundary.
    pub fn run_program(&mut self, text: &str, canal: u32) -> Result<(), NcError> {
        let nodes = self.parser.parse_program(text).map_err(|err| {
            NcError::new(ErrorKind::ErrorInACanal, -1, err.to_string(), "parser")
        })?;
        self.run_nc_code_list(nodes, canal)
    }

    pub fn tool_path(&self, canal: u32) -> &[PathSegment] {
        self.canals
            .get(&canal)
            .map(|c| c.tool_path())
            .unwrap_or(&[])
    }

    pub fn exec_nodes(&self, canal: u32) -> &[CommandNode] {
        self.canals
            .get(&canal)
            .map(|c| c.exec_nodes())
            .unwrap_or(&[])
    }

    pub fn canal(&self, canal: u32) -> Option<&Canal> {
        self.canals.get(&canal)
    }

    /// Cross-canal wait-code synchronisation is not implemented: the canals
    /// of this control run independently and no time alignment is applied.
    pub fn synchro_points(&mut self) {}
}
