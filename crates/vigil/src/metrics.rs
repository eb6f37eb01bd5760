//! Collaborator call metrics
//!
//! One record per external call. Sinks must be cheap and non-blocking: they
//! run inline with the call they measure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

pub const DEFAULT_RETENTION: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetricStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiMetric {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub endpoint: String,
    pub duration_ms: f64,
    pub status: MetricStatus,
}

/// Receives metrics for every collaborator call
pub trait MetricsSink: Send + Sync {
    fn record(&self, metric: ApiMetric);
}

/// In-memory sink keeping the most recent metrics
#[derive(Debug)]
pub struct MetricsLog {
    metrics: Mutex<VecDeque<ApiMetric>>,
    retention: usize,
}

impl Default for MetricsLog {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

impl MetricsLog {
    pub fn new(retention: usize) -> Self {
        Self {
            metrics: Mutex::new(VecDeque::new()),
            retention: retention.max(1),
        }
    }

    /// Snapshot, most recent first
    pub fn snapshot(&self) -> Vec<ApiMetric> {
        match self.metrics.lock() {
            Ok(metrics) => metrics.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary::from_metrics(&self.snapshot())
    }
}

impl MetricsSink for MetricsLog {
    fn record(&self, metric: ApiMetric) {
        let mut metrics = match self.metrics.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if metrics.len() == self.retention {
            metrics.pop_back();
        }
        metrics.push_front(metric);
    }
}

/// Aggregate view over recorded metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub total: usize,
    pub avg_duration_ms: u64,
    /// Percentage of calls that errored, rounded
    pub error_rate: u32,
}

impl MetricsSummary {
    pub fn from_metrics(metrics: &[ApiMetric]) -> Self {
        if metrics.is_empty() {
            return Self::default();
        }

        let total = metrics.len();
        let errors = metrics
            .iter()
            .filter(|m| m.status == MetricStatus::Error)
            .count();
        let sum: f64 = metrics.iter().map(|m| m.duration_ms).sum();

        Self {
            total,
            avg_duration_ms: (sum / total as f64).round() as u64,
            error_rate: ((errors as f64 / total as f64) * 100.0).round() as u32,
        }
    }
}
