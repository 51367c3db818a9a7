//! Controller dialect capabilities.
//!
//! The interpreter core is dialect-agnostic. Everything vendor-flavoured is
//! answered here: which canned cycles exist and how T words are validated
//! and split.

use serde::{Deserialize, Serialize};

use crate::error::NcError;

/// The supported controller families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// ISO/Fanuc-style turning: `#n` variables, `Txxyy` tool/offset split.
    IsoTurn,
    /// Siemens-style milling: `Rn` parameters, named canned cycles.
    SiemensMill,
}

/// A validated tool selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSelection {
    pub tool: u32,
    pub offset: u32,
}

impl Dialect {
    /// Canned cycle names this dialect expands.
    pub fn recognises_cycle(&self, name: &str) -> bool {
        match self {
            Dialect::IsoTurn => false,
            Dialect::SiemensMill => {
                matches!(name, "POCKET4" | "SLOT2" | "CYCLE61" | "CYCLE81")
            }
        }
    }

    /// Validates a T word and splits it into tool and offset numbers.
    ///
    /// Both dialects accept 0–9999; ISO turning additionally splits the
    /// hundreds into tool and offset (`T0101` → tool 1, offset 1).
    pub fn validate_tool(&self, number: i64, line: i64) -> Result<ToolSelection, NcError> {
        if !(0..=9999).contains(&number) {
            return Err(NcError::code_in(
                line,
                format!("Tool number T{number} out of range for this control"),
                format!("T{number}"),
            ));
        }
        let number = number as u32;
        Ok(match self {
            Dialect::IsoTurn => ToolSelection {
                tool: number / 100,
                offset: number % 100,
            },
            Dialect::SiemensMill => ToolSelection {
                tool: number,
                offset: 0,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_turn_splits_hundreds() {
        let sel = Dialect::IsoTurn.validate_tool(101, 0).expect("T0101");
        assert_eq!(sel.tool, 1);
        assert_eq!(sel.offset, 1);

        let sel = Dialect::IsoTurn.validate_tool(100, 0).expect("T100");
        assert_eq!(sel.tool, 1);
        assert_eq!(sel.offset, 0);
    }

    #[test]
    fn siemens_keeps_the_full_number() {
        let sel = Dialect::SiemensMill.validate_tool(100, 0).expect("T100");
        assert_eq!(sel.tool, 100);
        assert_eq!(sel.offset, 0);
    }

    #[test]
    fn out_of_range_tool_is_rejected_by_both() {
        for dialect in [Dialect::IsoTurn, Dialect::SiemensMill] {
            let err = dialect.validate_tool(10000, 4).unwrap_err();
            assert!(
                err.message.contains("Tool number T10000 out of range"),
                "{err}"
            );
            assert_eq!(err.line, 4);
            assert!(dialect.validate_tool(-1, 0).is_err());
        }
    }

    #[test]
    fn cycle_names_are_a_siemens_capability() {
        assert!(Dialect::SiemensMill.recognises_cycle("POCKET4"));
        assert!(Dialect::SiemensMill.recognises_cycle("CYCLE81"));
        assert!(!Dialect::SiemensMill.recognises_cycle("POCKET9"));
        assert!(!Dialect::IsoTurn.recognises_cycle("POCKET4"));
    }

    #[test]
    fn dialect_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(Dialect::IsoTurn).expect("serialize"),
            "iso_turn"
        );
        assert_eq!(
            serde_json::to_value(Dialect::SiemensMill).expect("serialize"),
            "siemens_mill"
        );
    }
}
