//! Machine description loaded from a TOML file.
//!
//! A configuration names the controller, selects the dialect, declares the
//! canals and tunes motion discretisation. [`crate::Controller::from_toml`]
//! builds a ready controller from such a file.

use serde::Deserialize;

use crate::dialect::Dialect;

/// Configuration failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config error: {0}")]
    Invalid(String),
}

/// Fully describes one interpreted machine. Loaded from a TOML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MachineConfig {
    pub meta: MetaConfig,
    pub machine: MachineSection,
    #[serde(default)]
    pub motion: MotionLimits,
}

/// `[meta]` — identity and display information.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MetaConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// `[machine]` — dialect and canal layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MachineSection {
    pub dialect: Dialect,
    /// Number of independent execution canals, indexed from 1.
    pub canals: u32,
    /// Optional canal names; missing entries default to `C<index>`.
    #[serde(default)]
    pub canal_names: Vec<String>,
}

/// `[motion]` — discretisation caps and traverse rates.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MotionLimits {
    /// Longest emitted chord for ordinary moves, in length units.
    #[serde(default = "default_max_segment")]
    pub max_segment: f64,
    /// Finer cap used when expanding canned cycles.
    #[serde(default = "default_cycle_segment")]
    pub cycle_segment: f64,
    /// Traverse rate for rapid (G0) moves, units per minute. When absent,
    /// rapids use the programmed feed like any other move.
    #[serde(default)]
    pub rapid_rate: Option<f64>,
}

fn default_max_segment() -> f64 {
    0.5
}

fn default_cycle_segment() -> f64 {
    0.1
}

impl Default for MotionLimits {
    fn default() -> Self {
        MotionLimits {
            max_segment: default_max_segment(),
            cycle_segment: default_cycle_segment(),
            rapid_rate: None,
        }
    }
}

impl MachineConfig {
    /// Parses and validates a TOML machine description.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: MachineConfig = toml::from_str(text)?;
        if config.machine.canals == 0 {
            return Err(ConfigError::Invalid(
                "machine.canals must be at least 1".to_string(),
            ));
        }
        if config.motion.max_segment <= 0.0 || config.motion.cycle_segment <= 0.0 {
            return Err(ConfigError::Invalid(
                "motion segment caps must be positive".to_string(),
            ));
        }
        Ok(config)
    }

    /// The display name of canal `index` (1-based).
    pub fn canal_name(&self, index: u32) -> String {
        self.machine
            .canal_names
            .get(index.saturating_sub(1) as usize)
            .cloned()
            .unwrap_or_else(|| format!("C{index}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [meta]
        id = "star-sb20"
        name = "Star SB-20 turn"

        [machine]
        dialect = "iso_turn"
        canals = 2
        canal_names = ["MAIN", "SUB"]

        [motion]
        max_segment = 0.25
        rapid_rate = 12000.0
    "#;

    #[test]
    fn sample_config_parses() {
        let config = MachineConfig::from_toml(SAMPLE).expect("parse sample");
        assert_eq!(config.meta.id, "star-sb20");
        assert_eq!(config.machine.dialect, Dialect::IsoTurn);
        assert_eq!(config.machine.canals, 2);
        assert_eq!(config.motion.max_segment, 0.25);
        assert_eq!(config.motion.cycle_segment, 0.1);
        assert_eq!(config.motion.rapid_rate, Some(12000.0));
    }

    #[test]
    fn canal_names_fall_back_to_index_form() {
        let config = MachineConfig::from_toml(SAMPLE).expect("parse sample");
        assert_eq!(config.canal_name(1), "MAIN");
        assert_eq!(config.canal_name(2), "SUB");
        assert_eq!(config.canal_name(3), "C3");
    }

    #[test]
    fn motion_section_is_optional() {
        let config = MachineConfig::from_toml(
            r#"
            [meta]
            id = "mill"
            name = "840D mill"

            [machine]
            dialect = "siemens_mill"
            canals = 1
            "#,
        )
        .expect("parse minimal");
        assert_eq!(config.motion.max_segment, 0.5);
        assert!(config.motion.rapid_rate.is_none());
    }

    #[test]
    fn zero_canals_is_invalid() {
        let err = MachineConfig::from_toml(
            r#"
            [meta]
            id = "x"
            name = "x"

            [machine]
            dialect = "iso_turn"
            canals = 0
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("canals"), "{err}");
    }

    #[test]
    fn non_positive_segment_cap_is_invalid() {
        let err = MachineConfig::from_toml(
            r#"
            [meta]
            id = "x"
            name = "x"

            [machine]
            dialect = "iso_turn"
            canals = 1

            [motion]
            max_segment = 0.0
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("segment"), "{err}");
    }
}
