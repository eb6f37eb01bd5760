//! Console configuration
//!
//! Configuration file: ~/.config/vigil/vigil.yaml (or `--config <path>`).
//! A missing file means defaults.

use crate::error::VigilError;
use crate::score::ScoringConfig;
use crate::signal::{default_catalog, SignalSpec};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use vigil_core::Paths;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VigilConfig {
    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub isolation: IsolationConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub advisory: AdvisoryConfig,

    #[serde(default)]
    pub retention: RetentionConfig,

    /// Signal catalog, in display order
    #[serde(default = "default_catalog")]
    pub signals: Vec<SignalSpec>,
}

impl Default for VigilConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            isolation: IsolationConfig::default(),
            auth: AuthConfig::default(),
            advisory: AdvisoryConfig::default(),
            retention: RetentionConfig::default(),
            signals: default_catalog(),
        }
    }
}

/// Countdown settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsolationConfig {
    /// Seconds between arming and isolation
    #[serde(default = "default_countdown_secs")]
    pub countdown_secs: u32,

    /// Real duration of one countdown second
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Cooling period shown on the restricted screen. Display only.
    #[serde(default = "default_cooling_display_secs")]
    pub cooling_display_secs: u64,
}

fn default_countdown_secs() -> u32 {
    crate::timer::DEFAULT_COUNTDOWN_SECS
}

fn default_tick_ms() -> u64 {
    1000
}

fn default_cooling_display_secs() -> u64 {
    566
}

impl Default for IsolationConfig {
    fn default() -> Self {
        Self {
            countdown_secs: default_countdown_secs(),
            tick_ms: default_tick_ms(),
            cooling_display_secs: default_cooling_display_secs(),
        }
    }
}

/// Simulated authentication settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Simulated credential check latency
    #[serde(default = "default_credential_delay_ms")]
    pub credential_delay_ms: u64,

    /// Expected second-factor code. Unset accepts any code.
    #[serde(default)]
    pub second_factor_code: Option<String>,
}

fn default_credential_delay_ms() -> u64 {
    2000
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            credential_delay_ms: default_credential_delay_ms(),
            second_factor_code: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryConfig {
    /// Upper bound on any advisory call
    #[serde(default = "default_advisory_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_advisory_timeout_ms() -> u64 {
    3000
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_advisory_timeout_ms(),
        }
    }
}

/// Bounded history sizes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_audit_retention")]
    pub audit: usize,

    #[serde(default = "default_journal_retention")]
    pub journal: usize,

    #[serde(default = "default_metrics_retention")]
    pub metrics: usize,
}

fn default_audit_retention() -> usize {
    crate::audit::DEFAULT_RETENTION
}

fn default_journal_retention() -> usize {
    crate::journal::DEFAULT_RETENTION
}

fn default_metrics_retention() -> usize {
    crate::metrics::DEFAULT_RETENTION
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            audit: default_audit_retention(),
            journal: default_journal_retention(),
            metrics: default_metrics_retention(),
        }
    }
}

impl VigilConfig {
    /// Default config file location
    pub fn default_path() -> PathBuf {
        Paths::new().config_file("vigil")
    }

    /// Load configuration from default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config from {:?}", path))?
        } else {
            Self::default()
        };

        config
            .validate()
            .with_context(|| format!("Invalid config in {:?}", path))?;
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;
        Ok(())
    }

    /// Check invariants serde cannot express
    pub fn validate(&self) -> std::result::Result<(), VigilError> {
        let threshold = self.scoring.high_risk_threshold;
        if !(1..=100).contains(&threshold) {
            return Err(VigilError::InvalidConfig(format!(
                "high_risk_threshold must be within 1..=100, got {}",
                threshold
            )));
        }
        // A session starts at the base score with the countdown disarmed
        let base = self.scoring.base;
        if base >= threshold {
            return Err(VigilError::InvalidConfig(format!(
                "base score {} must be below high_risk_threshold {}",
                base, threshold
            )));
        }
        if self.isolation.countdown_secs == 0 {
            return Err(VigilError::InvalidConfig(
                "countdown_secs must be at least 1".to_string(),
            ));
        }
        if self.retention.audit == 0 || self.retention.journal == 0 || self.retention.metrics == 0
        {
            return Err(VigilError::InvalidConfig(
                "retention windows must be at least 1".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for signal in &self.signals {
            if !seen.insert(signal.id.as_str()) {
                return Err(VigilError::InvalidConfig(format!(
                    "duplicate signal id: {}",
                    signal.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_base_must_be_below_threshold() {
        let mut config = VigilConfig::default();
        config.scoring.base = 95;
        assert!(matches!(
            config.validate(),
            Err(VigilError::InvalidConfig(_))
        ));

        config.scoring.base = 90;
        assert!(config.validate().is_err());

        config.scoring.base = 89;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_base_above_threshold_rejected_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vigil.yaml");
        std::fs::write(&path, "scoring:\n  base: 101\n").unwrap();
        assert!(VigilConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempdir().unwrap();
        let config = VigilConfig::load_from(&dir.path().join("vigil.yaml")).unwrap();
        assert_eq!(config, VigilConfig::default());
        assert_eq!(config.scoring.base, 25);
        assert_eq!(config.isolation.countdown_secs, 10);
        assert_eq!(config.signals.len(), 3);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("vigil.yaml");

        let mut config = VigilConfig::default();
        config.auth.second_factor_code = Some("891794".to_string());
        config.retention.audit = 200;
        config.save_to(&path).unwrap();

        let loaded = VigilConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vigil.yaml");
        std::fs::write(&path, "isolation:\n  countdown_secs: 3\n").unwrap();

        let config = VigilConfig::load_from(&path).unwrap();
        assert_eq!(config.isolation.countdown_secs, 3);
        assert_eq!(config.isolation.tick_ms, 1000);
        assert_eq!(config.scoring.high_risk_threshold, 90);
        assert_eq!(config.signals.len(), 3);
    }

    #[test]
    fn test_rejects_duplicate_signals() {
        let mut config = VigilConfig::default();
        config
            .signals
            .push(SignalSpec::new("wifi", "Public WiFi", "NETWORK HEALTH", 10));
        assert!(matches!(
            config.validate(),
            Err(VigilError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_zero_countdown() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vigil.yaml");
        std::fs::write(&path, "isolation:\n  countdown_secs: 0\n").unwrap();
        assert!(VigilConfig::load_from(&path).is_err());
    }
}
