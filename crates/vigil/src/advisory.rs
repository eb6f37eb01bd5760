//! Advisory text collaborator
//!
//! Produces the narrative lines shown after a score change and the summary
//! on the admin surface. Never authoritative: every caller has a fallback.

use crate::audit::{AuditEntry, AuditStatus};
use crate::breach::BreachReport;
use crate::error::AdvisoryError;
use crate::metrics::{ApiMetric, MetricStatus, MetricsSink};
use async_trait::async_trait;
use chrono::Utc;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use vigil_core::ids::short_id;

/// Message for a session with nothing active
pub const NEUTRAL_ADVICE: &str =
    "Your session is secured by standard monitoring and continuous identity verification.";

/// Substituted when advice cannot be produced
pub const FALLBACK_ADVICE: &str =
    "Advisory service unavailable. Trust score and isolation policy remain in effect.";

/// Substituted when a summary cannot be produced
pub const FALLBACK_SUMMARY: &str =
    "Summary unavailable. Review the audit log and pending reports directly.";

#[async_trait]
pub trait Advisor: Send + Sync {
    /// Narrative for the given active signal names and score
    async fn advise(&self, active: &[String], score: u8) -> Result<String, AdvisoryError>;

    /// Operational summary of recent activity
    async fn summarize(
        &self,
        logs: &[AuditEntry],
        breaches: &[BreachReport],
    ) -> Result<String, AdvisoryError>;
}

#[async_trait]
impl<A: Advisor + ?Sized> Advisor for Arc<A> {
    async fn advise(&self, active: &[String], score: u8) -> Result<String, AdvisoryError> {
        (**self).advise(active, score).await
    }

    async fn summarize(
        &self,
        logs: &[AuditEntry],
        breaches: &[BreachReport],
    ) -> Result<String, AdvisoryError> {
        (**self).summarize(logs, breaches).await
    }
}

/// Built-in generator. Rotates through templates deterministically.
#[derive(Debug, Default)]
pub struct LocalAdvisor {
    turn: AtomicUsize,
}

impl LocalAdvisor {
    pub fn new() -> Self {
        Self::default()
    }

    fn template(&self, active: &[String]) -> String {
        let joined = active.join(" and ");
        let first = &active[0];
        let last = &active[active.len() - 1];

        match self.turn.fetch_add(1, Ordering::Relaxed) % 5 {
            0 => format!(
                "Caution: Detected {}. Trust level is degrading due to environmental risks.",
                joined
            ),
            1 => format!(
                "Security Alert: {} signal identified. Implementing enhanced packet inspection.",
                first
            ),
            2 => format!(
                "Protocol update: Mitigating risks associated with {}.",
                active.join(", ")
            ),
            3 => format!(
                "Anomalous behavior detected via {}. Monitoring for lateral movement.",
                last
            ),
            _ => format!(
                "Zero-Trust policy applied to {}. Re-authentication may be required.",
                active.join(" context")
            ),
        }
    }
}

#[async_trait]
impl Advisor for LocalAdvisor {
    async fn advise(&self, active: &[String], _score: u8) -> Result<String, AdvisoryError> {
        if active.is_empty() {
            return Ok(NEUTRAL_ADVICE.to_string());
        }
        Ok(self.template(active))
    }

    async fn summarize(
        &self,
        logs: &[AuditEntry],
        breaches: &[BreachReport],
    ) -> Result<String, AdvisoryError> {
        let warnings = logs
            .iter()
            .filter(|e| e.status == AuditStatus::Warning)
            .count();
        let failures = logs
            .iter()
            .filter(|e| e.status == AuditStatus::Failed)
            .count();

        if warnings == 0 && failures == 0 && breaches.is_empty() {
            return Ok(format!(
                "{} recent events reviewed. No anomalies require attention.",
                logs.len()
            ));
        }

        Ok(format!(
            "{} recent events reviewed: {} warnings, {} failed attempts, {} reports pending review.",
            logs.len(),
            warnings,
            failures,
            breaches.len()
        ))
    }
}

/// Wraps an advisor and reports a metric for every call
pub struct Instrumented<A, M> {
    inner: A,
    sink: Arc<M>,
}

impl<A: Advisor, M: MetricsSink> Instrumented<A, M> {
    pub fn new(inner: A, sink: Arc<M>) -> Self {
        Self { inner, sink }
    }

    fn call(&self, endpoint: &'static str) -> CallGuard<'_, M> {
        CallGuard {
            sink: &*self.sink,
            endpoint,
            started: Instant::now(),
            finished: false,
        }
    }
}

/// Emits exactly one metric per call. A call dropped before it finishes,
/// such as one cut off by [`with_timeout`], is recorded as an error.
struct CallGuard<'a, M: MetricsSink> {
    sink: &'a M,
    endpoint: &'static str,
    started: Instant,
    finished: bool,
}

impl<M: MetricsSink> CallGuard<'_, M> {
    fn finish(mut self, ok: bool) {
        self.emit(ok);
        self.finished = true;
    }

    fn emit(&self, ok: bool) {
        self.sink.record(ApiMetric {
            id: short_id("met"),
            timestamp: Utc::now(),
            endpoint: format!("advisory:{}", self.endpoint),
            duration_ms: self.started.elapsed().as_secs_f64() * 1000.0,
            status: if ok {
                MetricStatus::Success
            } else {
                MetricStatus::Error
            },
        });
    }
}

impl<M: MetricsSink> Drop for CallGuard<'_, M> {
    fn drop(&mut self) {
        if !self.finished {
            self.emit(false);
        }
    }
}

#[async_trait]
impl<A: Advisor, M: MetricsSink> Advisor for Instrumented<A, M> {
    async fn advise(&self, active: &[String], score: u8) -> Result<String, AdvisoryError> {
        let call = self.call("advise");
        let result = self.inner.advise(active, score).await;
        call.finish(result.is_ok());
        result
    }

    async fn summarize(
        &self,
        logs: &[AuditEntry],
        breaches: &[BreachReport],
    ) -> Result<String, AdvisoryError> {
        let call = self.call("summarize");
        let result = self.inner.summarize(logs, breaches).await;
        call.finish(result.is_ok());
        result
    }
}

/// Bound a collaborator call
pub async fn with_timeout<F>(timeout_ms: u64, call: F) -> Result<String, AdvisoryError>
where
    F: Future<Output = Result<String, AdvisoryError>>,
{
    match tokio::time::timeout(Duration::from_millis(timeout_ms), call).await {
        Ok(result) => result,
        Err(_) => Err(AdvisoryError::Timeout(timeout_ms)),
    }
}
