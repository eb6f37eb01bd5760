//! Audit logging for session activity
//!
//! Every transition, signal toggle and administrative action lands here,
//! synchronously with the mutation it describes. Entries are kept in write
//! order inside a bounded ring; the oldest fall off once the retention
//! window is full.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Default retention window
pub const DEFAULT_RETENTION: usize = 500;

/// Principal recorded when nobody is signed in
pub const SYSTEM_PRINCIPAL: &str = "System";

/// Outcome class of an audited action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditStatus {
    Success,
    Failed,
    Info,
    Warning,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Success => "SUCCESS",
            AuditStatus::Failed => "FAILED",
            AuditStatus::Info => "INFO",
            AuditStatus::Warning => "WARNING",
        }
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single audit log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Write sequence number, strictly increasing
    pub id: u64,

    /// When the action happened
    pub timestamp: DateTime<Utc>,

    /// Who it concerns
    pub principal: String,

    /// Short action name (e.g., "Isolation Triggered")
    pub action: String,

    pub status: AuditStatus,

    /// Additional details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Append-only bounded audit log
#[derive(Debug, Clone)]
pub struct AuditLog {
    entries: VecDeque<AuditEntry>,
    retention: usize,
    next_id: u64,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

impl AuditLog {
    /// Create a log keeping at most `retention` entries
    pub fn new(retention: usize) -> Self {
        let retention = retention.max(1);
        Self {
            entries: VecDeque::with_capacity(retention.min(1024)),
            retention,
            next_id: 1,
        }
    }

    /// Append an entry
    pub fn record(
        &mut self,
        principal: &str,
        action: &str,
        status: AuditStatus,
        details: Option<String>,
    ) -> &AuditEntry {
        let entry = AuditEntry {
            id: self.next_id,
            timestamp: Utc::now(),
            principal: principal.to_string(),
            action: action.to_string(),
            status,
            details,
        };
        self.next_id += 1;

        if self.entries.len() == self.retention {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
        &self.entries[self.entries.len() - 1]
    }

    /// Entries in true write order, oldest first
    pub fn chronological(&self) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter()
    }

    /// Entries for display, most recent first
    pub fn newest_first(&self) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter().rev()
    }

    /// Most recent entry
    pub fn last(&self) -> Option<&AuditEntry> {
        self.entries.back()
    }

    /// Query recent entries
    pub fn recent(&self, limit: usize) -> Vec<AuditEntry> {
        self.query(AuditQuery::default().limit(limit))
    }

    /// Query with custom filter. Results are most recent first.
    pub fn query(&self, query: AuditQuery) -> Vec<AuditEntry> {
        let matching = self.newest_first().filter(|entry| query.matches(entry));
        match query.limit {
            Some(limit) => matching.take(limit).cloned().collect(),
            None => matching.cloned().collect(),
        }
    }

    /// Get statistics over the retained window
    pub fn stats(&self) -> AuditStats {
        let mut stats = AuditStats::default();
        for entry in &self.entries {
            stats.total += 1;
            match entry.status {
                AuditStatus::Success => stats.success += 1,
                AuditStatus::Failed => stats.failed += 1,
                AuditStatus::Info => stats.info += 1,
                AuditStatus::Warning => stats.warning += 1,
            }
        }
        stats.evicted = self.total_written() - stats.total as u64;
        stats
    }

    /// Number of retained entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries ever written, including evicted ones
    pub fn total_written(&self) -> u64 {
        self.next_id - 1
    }

    pub fn retention(&self) -> usize {
        self.retention
    }
}

/// Query parameters for the audit log
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    principal: Option<String>,
    status: Option<AuditStatus>,
    action: Option<String>,
    limit: Option<usize>,
}

impl AuditQuery {
    /// Filter by principal
    pub fn principal(mut self, principal: &str) -> Self {
        self.principal = Some(principal.to_string());
        self
    }

    /// Filter by status
    pub fn status(mut self, status: AuditStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filter by action name
    pub fn action(mut self, action: &str) -> Self {
        self.action = Some(action.to_string());
        self
    }

    /// Limit results
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check if an entry matches the query
    fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(ref principal) = self.principal {
            if entry.principal != *principal {
                return false;
            }
        }

        if let Some(status) = self.status {
            if entry.status != status {
                return false;
            }
        }

        if let Some(ref action) = self.action {
            if entry.action != *action {
                return false;
            }
        }

        true
    }
}

/// Audit statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditStats {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub info: usize,
    pub warning: usize,
    /// Entries dropped by the retention window
    pub evicted: u64,
}
