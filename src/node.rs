//! A parsed NC block, as produced by the parser.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One parsed line of an NC program.
///
/// The parser fills every field except the links between blocks: the node
/// list is immutable after parsing, and the engine expresses execution order
/// (including jumps) with indices into that list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommandNode {
    /// Zero-based index of the source line this node was parsed from.
    pub line: usize,
    /// The N word, when present. Used as a jump label.
    pub line_number: Option<i64>,
    /// G words in source order, upper-cased, leading-zero forms preserved.
    pub g_code: Vec<String>,
    /// M words in source order, upper-cased.
    pub m_code: Vec<String>,
    /// Letter parameters with their literal values exactly as written
    /// (`'X' → "12.5"`, `'X' → "#1"`, `'X' → "R1"` for the `X=R1` form).
    pub command_parameter: BTreeMap<char, String>,
    /// Raw text of anything that is not a word: `DO1`, `END1`, `GOTO N20`,
    /// `IF …`, variable assignments, and named cycle calls.
    pub loop_command: Option<String>,
}

impl CommandNode {
    /// `true` when any G word of this block equals `number` (accepting both
    /// the short and the zero-padded spelling).
    pub fn has_g(&self, number: u32) -> bool {
        self.g_code.iter().any(|code| {
            code.trim_start_matches(['G', 'g'])
                .parse::<u32>()
                .map(|n| n == number)
                .unwrap_or(false)
        })
    }

    /// `true` when any M word of this block equals `number`.
    pub fn has_m(&self, number: u32) -> bool {
        self.m_code.iter().any(|code| {
            code.trim_start_matches(['M', 'm'])
                .parse::<u32>()
                .map(|n| n == number)
                .unwrap_or(false)
        })
    }

    /// The line to report in diagnostics: the N word when present, else the
    /// source index.
    pub fn diagnostic_line(&self) -> i64 {
        self.line_number.unwrap_or(self.line as i64)
    }
}
