//! ncpath — an NC/G-code interpreter that turns part programs into
//! time-stamped tool paths.
//!
//! Programs are lexed into [`CommandNode`]s, then interpreted per canal by a
//! chain of handlers that maintains the modal machine state and emits
//! discretised geometry for every move. Two dialects are supported: ISO
//! turning (`#n` variables, `Txxyy` tool words) and Siemens-like milling
//! (`Rn` parameters, named canned cycles).
//!
//! ```
//! use ncpath::{Controller, Dialect};
//!
//! let mut control = Controller::new(1, Dialect::IsoTurn);
//! control
//!     .run_program("G1 X1.0 Y2.0 Z0.0 F100\nG1 X2.5 Y3.5\n", 1)
//!     .expect("interpret");
//! assert_eq!(control.tool_path(1).len(), 2);
//! ```

pub mod canal;
pub mod config;
pub mod controller;
pub mod dialect;
pub mod error;
pub mod expr;
pub mod handlers;
pub mod node;
pub mod parser;
pub mod state;
pub mod toolpath;

pub use canal::Canal;
pub use config::{MachineConfig, MotionLimits};
pub use controller::Controller;
pub use dialect::Dialect;
pub use error::{ErrorKind, NcError};
pub use node::CommandNode;
pub use parser::{ParseError, Parser};
pub use state::{CncState, ModalGroup, VarKey};
pub use toolpath::{PathSegment, Point};
