//! Advisory journal
//!
//! Narrative messages produced after each score recomputation. Purely
//! informational; nothing here feeds back into state transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const DEFAULT_RETENTION: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Impact {
    Low,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub impact: Impact,
    pub message: String,
    /// Score the message was written for
    pub strength: u8,
}

#[derive(Debug, Clone)]
pub struct Journal {
    entries: VecDeque<JournalEntry>,
    retention: usize,
    next_id: u64,
}

impl Default for Journal {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

impl Journal {
    pub fn new(retention: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            retention: retention.max(1),
            next_id: 1,
        }
    }

    pub fn push(&mut self, impact: Impact, message: &str, strength: u8) -> &JournalEntry {
        if self.entries.len() == self.retention {
            self.entries.pop_back();
        }
        self.entries.push_front(JournalEntry {
            id: self.next_id,
            timestamp: Utc::now(),
            impact,
            message: message.to_string(),
            strength,
        });
        self.next_id += 1;
        &self.entries[0]
    }

    /// Most recent first
    pub fn iter(&self) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&JournalEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newest_first_and_capped() {
        let mut journal = Journal::new(2);
        journal.push(Impact::Low, "one", 25);
        journal.push(Impact::High, "two", 60);
        journal.push(Impact::High, "three", 100);

        let messages: Vec<&str> = journal.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["three", "two"]);
        assert_eq!(journal.latest().map(|e| e.strength), Some(100));
    }
}
