//! Trust score aggregation
//!
//! score = min(100, base + sum of active impacts), clamped to [0, 100].
//! Higher means riskier; at or above the high-risk threshold the session is
//! headed for isolation.

use crate::signal::SignalRegistry;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Score of a session with no active signals
pub const BASE_SCORE: u8 = 25;

/// Scores at or above this are high risk
pub const HIGH_RISK_THRESHOLD: u8 = 90;

/// Upper clamp
pub const MAX_SCORE: u8 = 100;

/// Risk classification of a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskClass {
    Normal,
    HighRisk,
}

impl RiskClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskClass::Normal => "NORMAL",
            RiskClass::HighRisk => "HIGH_RISK",
        }
    }

    pub fn is_high(&self) -> bool {
        matches!(self, RiskClass::HighRisk)
    }
}

impl fmt::Display for RiskClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A computed score and its classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustScore {
    pub value: u8,
    pub class: RiskClass,
}

impl fmt::Display for TrustScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.value, self.class)
    }
}

/// Scoring parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Score with no active signals
    #[serde(default = "default_base")]
    pub base: u8,

    /// High-risk boundary (inclusive)
    #[serde(default = "default_threshold")]
    pub high_risk_threshold: u8,
}

fn default_base() -> u8 {
    BASE_SCORE
}

fn default_threshold() -> u8 {
    HIGH_RISK_THRESHOLD
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base: BASE_SCORE,
            high_risk_threshold: HIGH_RISK_THRESHOLD,
        }
    }
}

impl ScoringConfig {
    /// Classify a raw score
    pub fn classify(&self, value: u8) -> RiskClass {
        if value >= self.high_risk_threshold {
            RiskClass::HighRisk
        } else {
            RiskClass::Normal
        }
    }

    /// Aggregate the active signals into a score. Pure and total.
    pub fn evaluate(&self, signals: &SignalRegistry) -> TrustScore {
        let sum: i64 = signals.active().map(|s| i64::from(s.impact)).sum();
        let raw = i64::from(self.base) + sum;
        let value = raw.clamp(0, i64::from(MAX_SCORE)) as u8;
        TrustScore {
            value,
            class: self.classify(value),
        }
    }

    /// Score with every signal inactive
    pub fn baseline(&self) -> TrustScore {
        let value = self.base.min(MAX_SCORE);
        TrustScore {
            value,
            class: self.classify(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{default_catalog, SignalSpec};

    fn registry_with(active: &[&str]) -> SignalRegistry {
        let mut registry = SignalRegistry::default();
        for id in active {
            registry.set_active(id, true);
        }
        registry
    }

    #[test]
    fn test_empty_is_base() {
        let score = ScoringConfig::default().evaluate(&SignalRegistry::default());
        assert_eq!(score.value, 25);
        assert_eq!(score.class, RiskClass::Normal);
    }

    #[test]
    fn test_every_subset_matches_formula() {
        let config = ScoringConfig::default();
        let catalog = default_catalog();
        for mask in 0u8..8 {
            let active: Vec<&str> = catalog
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, s)| s.id.as_str())
                .collect();
            let expected_sum: i32 = catalog
                .iter()
                .filter(|s| active.contains(&s.id.as_str()))
                .map(|s| s.impact)
                .sum();
            let expected = (25 + expected_sum).min(100) as u8;

            let score = config.evaluate(&registry_with(&active));
            assert_eq!(score.value, expected, "subset {:?}", active);
            assert!(score.value <= 100);
        }
    }

    #[test]
    fn test_wifi_and_bot_clamps_to_100() {
        let score = ScoringConfig::default().evaluate(&registry_with(&["wifi", "bot"]));
        assert_eq!(score.value, 100);
        assert!(score.class.is_high());
    }

    #[test]
    fn test_bot_alone_is_normal() {
        let score = ScoringConfig::default().evaluate(&registry_with(&["bot"]));
        assert_eq!(score.value, 85);
        assert_eq!(score.class, RiskClass::Normal);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let config = ScoringConfig::default();
        assert_eq!(config.classify(89), RiskClass::Normal);
        assert_eq!(config.classify(90), RiskClass::HighRisk);
    }

    #[test]
    fn test_negative_weights_floor_at_zero() {
        let specs = vec![SignalSpec::new("vpn", "Trusted VPN", "NETWORK HEALTH", -80)];
        let mut registry = SignalRegistry::from_specs(&specs);
        registry.set_active("vpn", true);
        let score = ScoringConfig::default().evaluate(&registry);
        assert_eq!(score.value, 0);
    }

    #[test]
    fn test_symmetric_toggle_keeps_score() {
        let config = ScoringConfig::default();
        let mut registry = registry_with(&["geo"]);
        let before = config.evaluate(&registry);
        registry.toggle("wifi");
        registry.toggle("wifi");
        assert_eq!(config.evaluate(&registry), before);
    }
}
