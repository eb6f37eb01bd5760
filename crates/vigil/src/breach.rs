//! Breach reports awaiting administrative review

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use vigil_core::ids::short_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    Moderate,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::Moderate => "MODERATE",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "moderate" => Ok(Severity::Moderate),
            other => Err(format!("unknown severity: {}", other)),
        }
    }
}

/// A breach reported by a signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreachReport {
    pub id: String,

    /// Where the exposure was seen (e.g., "Pastebin Leak")
    pub source: String,

    /// Date of the exposure as reported
    pub date: String,

    pub severity: Severity,
    pub description: String,

    /// Principal who filed the report
    pub reporter: String,

    pub reported_at: DateTime<Utc>,
}

/// What an administrator decides about a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewVerdict {
    /// Close the report without action
    Dismiss,
    /// Close the report and isolate the reporter
    Isolate,
}

impl FromStr for ReviewVerdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dismiss" => Ok(ReviewVerdict::Dismiss),
            "isolate" => Ok(ReviewVerdict::Isolate),
            other => Err(format!("unknown verdict: {}", other)),
        }
    }
}

/// Pending reports in filing order
#[derive(Debug, Clone, Default)]
pub struct BreachQueue {
    pending: Vec<BreachReport>,
}

impl BreachQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// File a report; returns it as stored
    pub(crate) fn file(
        &mut self,
        source: &str,
        date: &str,
        severity: Severity,
        description: &str,
        reporter: &str,
    ) -> &BreachReport {
        self.pending.push(BreachReport {
            id: short_id("brc"),
            source: source.to_string(),
            date: date.to_string(),
            severity,
            description: description.to_string(),
            reporter: reporter.to_string(),
            reported_at: Utc::now(),
        });
        &self.pending[self.pending.len() - 1]
    }

    /// Remove a report once reviewed
    pub(crate) fn take(&mut self, id: &str) -> Option<BreachReport> {
        let index = self.pending.iter().position(|r| r.id == id)?;
        Some(self.pending.remove(index))
    }

    pub fn pending(&self) -> &[BreachReport] {
        &self.pending
    }

    pub fn get(&self, id: &str) -> Option<&BreachReport> {
        self.pending.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
