//! Console runtime
//!
//! Owns the session controller and a single event queue. Delayed work
//! (credential checks, countdown ticks, advisory calls) runs on spawned
//! tasks that only ever post an [`Event`] back into the queue; the task that
//! owns the `Console` applies it. State is never touched from anywhere else.

use crate::advisory::{with_timeout, Advisor};
use crate::command::Command;
use crate::error::{AdvisoryError, VigilError};
use crate::session::{Effect, SessionController};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Number of audit entries handed to the summarizer
pub const SUMMARY_WINDOW: usize = 25;

/// Completions posted back by scheduled work
#[derive(Debug)]
pub enum Event {
    CredentialsChecked {
        attempt: u64,
    },
    Tick {
        epoch: u64,
    },
    AdviceReady {
        ticket: u64,
        outcome: Result<String, AdvisoryError>,
    },
    SummaryReady {
        outcome: Result<String, AdvisoryError>,
    },
}

pub struct Console<A> {
    session: SessionController,
    advisor: Arc<A>,
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
}

impl<A: Advisor + 'static> Console<A> {
    pub fn new(session: SessionController, advisor: Arc<A>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            session,
            advisor,
            tx,
            rx,
        }
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    /// Apply a user command. View-only commands are a no-op here.
    ///
    /// Returns a one-line confirmation for commands that have one.
    pub fn dispatch(&mut self, command: &Command) -> Result<Option<String>, VigilError> {
        let mut reply = None;
        let effects = match command {
            Command::Login(identifier) => self.session.submit_credentials(identifier)?,
            Command::Verify(code) => self.session.complete_second_factor(code.as_deref())?,
            Command::Toggle(id) => self.session.toggle_signal(id)?,
            Command::Logout => self.session.logout()?,
            Command::Ack => self.session.acknowledge()?,
            Command::Report {
                source,
                severity,
                description,
            } => {
                let date = Utc::now().format("%Y-%m-%d").to_string();
                let id = self
                    .session
                    .report_breach(source, &date, *severity, description)?;
                reply = Some(format!("Filed report {}", id));
                Vec::new()
            }
            Command::Revoke(principal) => {
                let removed = self.session.admin().revoke(principal);
                reply = Some(if removed {
                    format!("Revoked restriction for {}", principal)
                } else {
                    format!("{} was not restricted", principal)
                });
                Vec::new()
            }
            Command::Review { id, verdict } => {
                let report = self.session.admin().review_breach(id, *verdict)?;
                reply = Some(format!("Closed report {} from {}", report.id, report.reporter));
                Vec::new()
            }
            _ => Vec::new(),
        };

        self.schedule(effects);
        Ok(reply)
    }

    /// Wait for the next queued event
    pub async fn next_event(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Apply a queued event. Returns the summary text when the event
    /// completes a summary request.
    pub fn handle(&mut self, event: Event) -> Option<String> {
        let effects = match event {
            Event::CredentialsChecked { attempt } => self.session.credentials_verified(attempt),
            Event::Tick { epoch } => self.session.tick(epoch),
            Event::AdviceReady { ticket, outcome } => {
                self.session.advice_ready(ticket, outcome);
                Vec::new()
            }
            Event::SummaryReady { outcome } => {
                return Some(self.session.admin().summary_ready(outcome));
            }
        };
        self.schedule(effects);
        None
    }

    /// Wait for one event and apply it. Returns `false` once the queue is closed.
    pub async fn step(&mut self) -> bool {
        match self.next_event().await {
            Some(event) => {
                self.handle(event);
                true
            }
            None => false,
        }
    }

    /// Ask the advisor for a summary of recent activity. The result arrives
    /// later as [`Event::SummaryReady`]; the session keeps running meanwhile.
    pub fn request_summary(&mut self) {
        let request = self.session.admin().summary_request(SUMMARY_WINDOW);
        let timeout_ms = self.session.config().advisory.timeout_ms;
        let advisor = Arc::clone(&self.advisor);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = with_timeout(
                timeout_ms,
                advisor.summarize(&request.logs, &request.breaches),
            )
            .await;
            post(&tx, Event::SummaryReady { outcome });
        });
    }

    fn schedule(&self, effects: Vec<Effect>) {
        for effect in effects {
            debug!(?effect, "scheduling");
            let tx = self.tx.clone();
            match effect {
                Effect::CredentialCheck { attempt, delay_ms } => {
                    tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        post(&tx, Event::CredentialsChecked { attempt });
                    });
                }
                Effect::Tick { epoch, delay_ms } => {
                    tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        post(&tx, Event::Tick { epoch });
                    });
                }
                Effect::Advise {
                    ticket,
                    active,
                    score,
                } => {
                    let advisor = Arc::clone(&self.advisor);
                    let timeout_ms = self.session.config().advisory.timeout_ms;
                    tokio::spawn(async move {
                        let outcome = with_timeout(timeout_ms, advisor.advise(&active, score)).await;
                        post(&tx, Event::AdviceReady { ticket, outcome });
                    });
                }
            }
        }
    }
}

fn post(tx: &mpsc::UnboundedSender<Event>, event: Event) {
    if tx.send(event).is_err() {
        debug!("console closed, dropping event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisory::{Instrumented, LocalAdvisor, FALLBACK_ADVICE, FALLBACK_SUMMARY};
    use crate::audit::{AuditEntry, AuditQuery};
    use crate::breach::BreachReport;
    use crate::config::VigilConfig;
    use crate::metrics::{MetricStatus, MetricsLog};
    use crate::session::SessionState;
    use async_trait::async_trait;
    use tokio::time::Instant;

    const USER: &str = "demo@ztrust.io";

    struct HangingAdvisor;

    #[async_trait]
    impl Advisor for HangingAdvisor {
        async fn advise(&self, _active: &[String], _score: u8) -> Result<String, AdvisoryError> {
            std::future::pending().await
        }

        async fn summarize(
            &self,
            _logs: &[AuditEntry],
            _breaches: &[BreachReport],
        ) -> Result<String, AdvisoryError> {
            std::future::pending().await
        }
    }

    fn console<A: Advisor + 'static>(advisor: A) -> Console<A> {
        Console::new(SessionController::new(VigilConfig::default()), Arc::new(advisor))
    }

    /// Process events until `done` holds
    async fn run_until<A, F>(console: &mut Console<A>, done: F)
    where
        A: Advisor + 'static,
        F: Fn(&SessionController) -> bool,
    {
        while !done(console.session()) {
            assert!(console.step().await, "event queue closed");
        }
    }

    /// Process events until a summary arrives
    async fn next_summary<A: Advisor + 'static>(console: &mut Console<A>) -> String {
        loop {
            let event = console.next_event().await.expect("event queue closed");
            if let Some(summary) = console.handle(event) {
                return summary;
            }
        }
    }

    async fn sign_in<A: Advisor + 'static>(console: &mut Console<A>) {
        console
            .dispatch(&Command::Login(USER.to_string()))
            .unwrap();
        run_until(console, |s| s.state() == SessionState::AwaitingSecondFactor).await;
        console.dispatch(&Command::Verify(None)).unwrap();
        assert_eq!(console.session().state(), SessionState::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_credential_delay() {
        let mut console = console(LocalAdvisor::new());
        let started = Instant::now();
        sign_in(&mut console).await;
        assert!(started.elapsed() >= Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_high_risk_isolates_after_countdown() {
        let mut console = console(LocalAdvisor::new());
        sign_in(&mut console).await;

        console.dispatch(&Command::Toggle("wifi".to_string())).unwrap();
        console.dispatch(&Command::Toggle("bot".to_string())).unwrap();
        assert_eq!(console.session().score().value, 100);
        let armed_at = Instant::now();

        run_until(&mut console, |s| s.state() == SessionState::Restricted).await;

        let elapsed = armed_at.elapsed();
        assert!(elapsed >= Duration::from_secs(10), "fired early: {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(11), "fired late: {:?}", elapsed);
        assert!(console.session().restrictions().contains(USER));
        assert_eq!(
            console
                .session()
                .audit()
                .query(AuditQuery::default().action("Isolation Triggered"))
                .len(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_deactivation_at_tick_four_cancels() {
        let mut console = console(LocalAdvisor::new());
        sign_in(&mut console).await;

        console.dispatch(&Command::Toggle("wifi".to_string())).unwrap();
        console.dispatch(&Command::Toggle("bot".to_string())).unwrap();
        run_until(&mut console, |s| s.timer().remaining() == Some(6)).await;

        console.dispatch(&Command::Toggle("wifi".to_string())).unwrap();
        assert_eq!(console.session().score().value, 85);
        assert!(!console.session().timer().is_armed());

        // Drain well past the first deadline; the in-flight tick is stale
        let drain = async {
            loop {
                console.step().await;
            }
        };
        let _ = tokio::time::timeout(Duration::from_secs(30), drain).await;

        assert_eq!(console.session().state(), SessionState::Active);
        assert!(console.session().restrictions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_advisor_does_not_block_isolation() {
        let mut console = console(HangingAdvisor);
        sign_in(&mut console).await;

        console.dispatch(&Command::Toggle("wifi".to_string())).unwrap();
        console.dispatch(&Command::Toggle("bot".to_string())).unwrap();
        run_until(&mut console, |s| s.state() == SessionState::Restricted).await;

        // Advice times out after 3s, well inside the countdown
        assert_eq!(
            console.session().journal().latest().map(|e| e.message.as_str()),
            Some(FALLBACK_ADVICE)
        );
        assert_eq!(
            console
                .session()
                .audit()
                .query(AuditQuery::default().action("Advisory Unavailable"))
                .len(),
            2
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_revocation_mid_isolation() {
        let mut console = console(LocalAdvisor::new());
        sign_in(&mut console).await;
        console.dispatch(&Command::Toggle("wifi".to_string())).unwrap();
        console.dispatch(&Command::Toggle("bot".to_string())).unwrap();
        run_until(&mut console, |s| s.state() == SessionState::Restricted).await;

        let reply = console.dispatch(&Command::Revoke(USER.to_string())).unwrap();
        assert_eq!(reply, Some(format!("Revoked restriction for {}", USER)));

        console.dispatch(&Command::Ack).unwrap();
        assert_eq!(console.session().state(), SessionState::Active);
        assert!(console.session().timer().is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_summary_falls_back() {
        let mut console = console(HangingAdvisor);
        console.request_summary();
        assert_eq!(next_summary(&mut console).await, FALLBACK_SUMMARY);
        assert_eq!(
            console.session().audit().last().map(|e| e.action.as_str()),
            Some("Advisory Unavailable")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_summary_from_local_advisor() {
        let mut console = console(LocalAdvisor::new());
        sign_in(&mut console).await;
        console.request_summary();
        let summary = next_summary(&mut console).await;
        assert!(summary.contains("recent events reviewed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_summary_does_not_delay_isolation() {
        let mut console = console(HangingAdvisor);
        sign_in(&mut console).await;

        console.dispatch(&Command::Toggle("wifi".to_string())).unwrap();
        console.dispatch(&Command::Toggle("bot".to_string())).unwrap();
        let armed_at = Instant::now();
        console.request_summary();
        console.request_summary();

        run_until(&mut console, |s| s.state() == SessionState::Restricted).await;

        let elapsed = armed_at.elapsed();
        assert!(elapsed < Duration::from_secs(11), "fired late: {:?}", elapsed);
        // Two advice timeouts and two summary timeouts
        assert_eq!(
            console
                .session()
                .audit()
                .query(AuditQuery::default().action("Advisory Unavailable"))
                .len(),
            4
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_calls_are_metered() {
        let metrics = Arc::new(MetricsLog::default());
        let mut console = console(Instrumented::new(HangingAdvisor, metrics.clone()));
        sign_in(&mut console).await;

        console.dispatch(&Command::Toggle("geo".to_string())).unwrap();
        console.request_summary();
        run_until(&mut console, |s| {
            s.audit()
                .query(AuditQuery::default().action("Advisory Unavailable"))
                .len()
                == 2
        })
        .await;

        let recorded = metrics.snapshot();
        assert_eq!(recorded.len(), 2);
        assert!(recorded.iter().all(|m| m.status == MetricStatus::Error));
    }
}
