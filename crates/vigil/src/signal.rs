//! Risk signals and their registry
//!
//! A signal is an environmental risk indicator (public network, unusual
//! location, automated behavior) with an integer weight. The registry is a
//! fixed, insertion-ordered catalog for the lifetime of a session: only the
//! `active` flag ever changes.

use serde::{Deserialize, Serialize};

/// Catalog entry describing a signal, as written in config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalSpec {
    /// Stable identifier (e.g., "wifi")
    pub id: String,

    /// Display name (e.g., "Public WiFi")
    pub name: String,

    /// Grouping shown alongside the name
    pub category: String,

    /// Weight added to the score while active
    pub impact: i32,
}

impl SignalSpec {
    pub fn new(id: &str, name: &str, category: &str, impact: i32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            impact,
        }
    }
}

/// The built-in catalog
pub fn default_catalog() -> Vec<SignalSpec> {
    vec![
        SignalSpec::new("wifi", "Public WiFi", "NETWORK HEALTH", 35),
        SignalSpec::new("geo", "Unusual Geo", "GEOFENCING", 45),
        SignalSpec::new("bot", "Bot Pattern", "USER BEHAVIOR", 60),
    ]
}

/// A signal and its current state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub name: String,
    pub category: String,
    pub active: bool,
    pub impact: i32,
}

impl From<&SignalSpec> for Signal {
    fn from(spec: &SignalSpec) -> Self {
        Self {
            id: spec.id.clone(),
            name: spec.name.clone(),
            category: spec.category.clone(),
            active: false,
            impact: spec.impact,
        }
    }
}

/// Insertion-ordered set of signals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalRegistry {
    signals: Vec<Signal>,
}

impl Default for SignalRegistry {
    fn default() -> Self {
        Self::from_specs(&default_catalog())
    }
}

impl SignalRegistry {
    /// Build a registry with every signal inactive.
    ///
    /// Later duplicates of an id are dropped so identifiers stay unique.
    pub fn from_specs(specs: &[SignalSpec]) -> Self {
        let mut signals: Vec<Signal> = Vec::with_capacity(specs.len());
        for spec in specs {
            if signals.iter().any(|s| s.id == spec.id) {
                continue;
            }
            signals.push(Signal::from(spec));
        }
        Self { signals }
    }

    /// Look up a signal by id
    pub fn get(&self, id: &str) -> Option<&Signal> {
        self.signals.iter().find(|s| s.id == id)
    }

    /// Flip a signal. Returns the new state, or `None` for an unknown id.
    pub fn toggle(&mut self, id: &str) -> Option<bool> {
        let signal = self.signals.iter_mut().find(|s| s.id == id)?;
        signal.active = !signal.active;
        Some(signal.active)
    }

    /// Force a signal on or off. Returns `false` for an unknown id.
    pub fn set_active(&mut self, id: &str, active: bool) -> bool {
        match self.signals.iter_mut().find(|s| s.id == id) {
            Some(signal) => {
                signal.active = active;
                true
            }
            None => false,
        }
    }

    /// All signals in catalog order
    pub fn iter(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter()
    }

    /// Active signals in catalog order
    pub fn active(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter().filter(|s| s.active)
    }

    /// Display names of the active signals
    pub fn active_names(&self) -> Vec<String> {
        self.active().map(|s| s.name.clone()).collect()
    }

    /// Deactivate everything
    pub fn reset(&mut self) {
        for signal in &mut self.signals {
            signal.active = false;
        }
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_order() {
        let registry = SignalRegistry::default();
        let ids: Vec<&str> = registry.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["wifi", "geo", "bot"]);
        assert!(registry.iter().all(|s| !s.active));
    }

    #[test]
    fn test_toggle() {
        let mut registry = SignalRegistry::default();
        assert_eq!(registry.toggle("geo"), Some(true));
        assert_eq!(registry.active_names(), vec!["Unusual Geo".to_string()]);
        assert_eq!(registry.toggle("geo"), Some(false));
        assert_eq!(registry.active().count(), 0);
    }

    #[test]
    fn test_toggle_unknown() {
        let mut registry = SignalRegistry::default();
        assert_eq!(registry.toggle("vpn"), None);
        assert_eq!(registry.active().count(), 0);
    }

    #[test]
    fn test_duplicate_ids_dropped() {
        let specs = vec![
            SignalSpec::new("wifi", "Public WiFi", "NETWORK HEALTH", 35),
            SignalSpec::new("wifi", "Other", "NETWORK HEALTH", 5),
        ];
        let registry = SignalRegistry::from_specs(&specs);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("wifi").map(|s| s.impact), Some(35));
    }

    #[test]
    fn test_reset() {
        let mut registry = SignalRegistry::default();
        registry.set_active("wifi", true);
        registry.set_active("bot", true);
        registry.reset();
        assert_eq!(registry.active().count(), 0);
    }
}
