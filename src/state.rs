//! Interpreter state for one canal.
//!
//! [`CncState`] carries everything that survives from one block to the next:
//! active modal codes, axis positions, offsets, feed/spindle values and the
//! program parameter (variable) table. Handlers mutate it in place; callers
//! wanting transactional behaviour clone it first.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A family of G-codes where at most one member is active at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModalGroup {
    /// G0/G1/G2/G3 interpolation mode.
    Motion,
    /// G90 absolute / G91 incremental.
    Distance,
    /// G17/G18/G19 working plane.
    Plane,
    /// G20 inch / G21 metric.
    Units,
    /// G94/G95 (milling) or G98/G99 (turning) feed interpretation.
    FeedMode,
    /// G96 constant surface speed / G97 direct RPM.
    SpindleMode,
    /// G54..G59 work coordinate system.
    WorkOffset,
    /// G28/G50 — not modal; listed so one-per-block checks cover it.
    NonModal,
}

/// Maps a G-code to its modal group, or `None` for codes the interpreter
/// tracks nowhere (dwell, compensation, …).
pub fn modal_group_of(code: &str) -> Option<ModalGroup> {
    let number = code
        .trim()
        .trim_start_matches(['G', 'g'])
        .parse::<u32>()
        .ok()?;
    match number {
        0..=3 => Some(ModalGroup::Motion),
        28 | 50 => Some(ModalGroup::NonModal),
        90 | 91 => Some(ModalGroup::Distance),
        17..=19 => Some(ModalGroup::Plane),
        20 | 21 => Some(ModalGroup::Units),
        94 | 95 | 98 | 99 => Some(ModalGroup::FeedMode),
        96 | 97 => Some(ModalGroup::SpindleMode),
        54..=59 => Some(ModalGroup::WorkOffset),
        _ => None,
    }
}

/// Canonical two-digit form of a G-code (`"G1"` → `"G01"`, `"g90"` → `"G90"`).
pub fn canonical_g(code: &str) -> String {
    match code.trim().trim_start_matches(['G', 'g']).parse::<u32>() {
        Ok(n) => format!("G{n:02}"),
        Err(_) => code.trim().to_ascii_uppercase(),
    }
}

/// A program variable name. The two dialect spellings (`#n` for ISO, `Rn`
/// for Siemens-like controls) share one table per canal without colliding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VarKey {
    /// `#n` — ISO style.
    Hash(u32),
    /// `Rn` — Siemens style.
    R(u32),
}

impl VarKey {
    /// Parses `#12` or `R12` (case-insensitive); `None` for anything else.
    pub fn parse(text: &str) -> Option<VarKey> {
        let text = text.trim();
        if text.len() < 2 || !text.is_ascii() {
            return None;
        }
        let (head, digits) = text.split_at(1);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let n = digits.parse().ok()?;
        match head {
            "#" => Some(VarKey::Hash(n)),
            "R" | "r" => Some(VarKey::R(n)),
            _ => None,
        }
    }
}

impl fmt::Display for VarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarKey::Hash(n) => write!(f, "#{n}"),
            VarKey::R(n) => write!(f, "R{n}"),
        }
    }
}

/// The machine state of one canal during NC interpretation.
///
/// All maps hold plain values, so `#[derive(Clone)]` is a structurally
/// independent deep copy.
#[derive(Debug, Clone, PartialEq)]
pub struct CncState {
    /// Active code per modal group; an absent entry means the group's
    /// default applies (absolute distance, XY plane, …).
    pub modal_groups: BTreeMap<ModalGroup, String>,
    /// Axis letter → current position. Arbitrary extra axes are allowed;
    /// letters are upper-cased on entry.
    pub axes: BTreeMap<char, f64>,
    /// Axis letter → offset, added on [`CncState::apply_offsets`].
    pub offsets: BTreeMap<char, f64>,
    /// Per-axis scale factors.
    pub axis_multipliers: BTreeMap<char, f64>,
    /// Per-axis feed overrides.
    pub axis_override_feeds: BTreeMap<char, f64>,
    /// Commanded feed; interpretation depends on the feed-mode modal.
    pub feed_rate: Option<f64>,
    /// Commanded spindle value; interpretation depends on the spindle-mode
    /// modal (RPM under G97, surface speed under G96).
    pub spindle_speed: Option<f64>,
    pub tool_radius: Option<f64>,
    pub tool_quadrant: Option<i32>,
    /// Program variables, shared between the `#n` and `Rn` spellings.
    pub parameters: BTreeMap<VarKey, f64>,
    /// Opaque vendor-specific table, carried verbatim.
    pub dddp_set: BTreeMap<String, f64>,
    /// Most recently seen N word.
    pub line_number: i64,
    /// Scratch space for control-flow tokens.
    pub loop_command: Vec<String>,
    /// Vendor scratch (polar axis name, selected tool, …).
    pub extra: BTreeMap<String, String>,
}

impl Default for CncState {
    fn default() -> Self {
        let mut axes = BTreeMap::new();
        axes.insert('X', 0.0);
        axes.insert('Y', 0.0);
        axes.insert('Z', 0.0);
        CncState {
            modal_groups: BTreeMap::new(),
            axes,
            offsets: BTreeMap::new(),
            axis_multipliers: BTreeMap::new(),
            axis_override_feeds: BTreeMap::new(),
            feed_rate: None,
            spindle_speed: None,
            tool_radius: None,
            tool_quadrant: None,
            parameters: BTreeMap::new(),
            dddp_set: BTreeMap::new(),
            line_number: 0,
            loop_command: Vec::new(),
            extra: BTreeMap::new(),
        }
    }
}

impl CncState {
    pub fn new() -> Self {
        CncState::default()
    }

    // ── axis helpers ─────────────────────────────────────────────────────────

    pub fn axis(&self, letter: char) -> f64 {
        self.axes
            .get(&letter.to_ascii_uppercase())
            .copied()
            .unwrap_or(0.0)
    }

    pub fn set_axis(&mut self, letter: char, value: f64) {
        self.axes.insert(letter.to_ascii_uppercase(), value);
    }

    pub fn update_axes(&mut self, updates: &BTreeMap<char, f64>) {
        for (&letter, &value) in updates {
            self.set_axis(letter, value);
        }
    }

    /// Axis positions with offsets added. Does not mutate the state.
    pub fn apply_offsets(&self) -> BTreeMap<char, f64> {
        self.axes
            .iter()
            .map(|(&letter, &pos)| {
                let off = self.offsets.get(&letter).copied().unwrap_or(0.0);
                (letter, pos + off)
            })
            .collect()
    }

    // ── modal helpers ────────────────────────────────────────────────────────

    pub fn set_modal(&mut self, group: ModalGroup, code: &str) {
        self.modal_groups.insert(group, canonical_g(code));
    }

    pub fn modal(&self, group: ModalGroup) -> Option<&str> {
        self.modal_groups.get(&group).map(String::as_str)
    }

    /// `true` when axis words are absolute targets. Unset distance modal
    /// defaults to absolute (G90).
    pub fn absolute_distance(&self) -> bool {
        self.modal(ModalGroup::Distance) != Some("G91")
    }

    /// `true` when the feed-mode modal selects per-revolution feed.
    pub fn feed_per_revolution(&self) -> bool {
        matches!(self.modal(ModalGroup::FeedMode), Some("G95") | Some("G99"))
    }

    // ── parameter helpers ────────────────────────────────────────────────────

    pub fn set_parameter(&mut self, key: VarKey, value: f64) {
        self.parameters.insert(key, value);
    }

    pub fn parameter(&self, key: VarKey) -> Option<f64> {
        self.parameters.get(&key).copied()
    }

    // ── coordinate resolution ────────────────────────────────────────────────

    /// Resolves a possibly-partial target over the union of known axes and
    /// target axes. Absolute targets replace positions; otherwise the values
    /// are deltas on the current positions.
    pub fn resolve_target(
        &self,
        target: &BTreeMap<char, f64>,
        absolute: bool,
    ) -> BTreeMap<char, f64> {
        let mut resolved = BTreeMap::new();
        for &letter in self.axes.keys().chain(target.keys()) {
            let current = self.axis(letter);
            let value = match target.get(&letter) {
                Some(&v) if absolute => v,
                Some(&v) => current + v,
                None => current,
            };
            resolved.insert(letter, value);
        }
        resolved
    }

    /// Euclidean distance between two axis maps over `axes`.
    pub fn distance_between(a: &BTreeMap<char, f64>, b: &BTreeMap<char, f64>, axes: &[char]) -> f64 {
        axes.iter()
            .map(|letter| {
                let d = a.get(letter).copied().unwrap_or(0.0)
                    - b.get(letter).copied().unwrap_or(0.0);
                d * d
            })
            .sum::<f64>()
            .sqrt()
    }
}
