//! Session state machine
//!
//! The controller owns the whole session aggregate and is the only place it
//! changes. Every operation is synchronous and returns the [`Effect`]s the
//! runtime has to schedule (delayed credential checks, countdown ticks,
//! advisory calls). Scheduled work reports back through the matching
//! operation, carrying the attempt/epoch/ticket it was issued under so stale
//! completions are recognized and dropped.
//!
//! ```text
//! UNAUTHENTICATED --login--> VERIFYING_CREDENTIALS --checked--> AWAITING_SECOND_FACTOR
//!        ^                          |                                   |
//!        |                  (restricted principal)                  verified
//!        |                          v                                   v
//!        +----ack (restricted)--- RESTRICTED <----isolation-------- ACTIVE
//!        +-----------------------------------------logout--------------+
//! ```

use crate::advisory::{FALLBACK_ADVICE, NEUTRAL_ADVICE};
use crate::audit::{AuditLog, AuditStatus, SYSTEM_PRINCIPAL};
use crate::breach::{BreachQueue, Severity};
use crate::config::VigilConfig;
use crate::error::{AdvisoryError, VigilError};
use crate::journal::{Impact, Journal};
use crate::restriction::RestrictionRegistry;
use crate::score::TrustScore;
use crate::signal::SignalRegistry;
use crate::timer::{IsolationTimer, TickOutcome, TimerChange};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

/// Role of a signed-in principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An identity held for the lifetime of one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub identifier: String,
    pub role: Role,
}

impl Principal {
    /// Derive the role from the identifier's shape.
    ///
    /// Simulation convention only: identifiers containing "admin" get the
    /// admin role. This is not an authentication mechanism.
    pub fn from_identifier(identifier: &str) -> Self {
        let role = if identifier.contains("admin") {
            Role::Admin
        } else {
            Role::User
        };
        Self {
            identifier: identifier.to_string(),
            role,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Unauthenticated,
    VerifyingCredentials,
    AwaitingSecondFactor,
    Active,
    Restricted,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Unauthenticated => "UNAUTHENTICATED",
            SessionState::VerifyingCredentials => "VERIFYING_CREDENTIALS",
            SessionState::AwaitingSecondFactor => "AWAITING_SECOND_FACTOR",
            SessionState::Active => "ACTIVE",
            SessionState::Restricted => "RESTRICTED",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which console an active session is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Admin,
    Standard,
}

/// Work the runtime must schedule on the controller's behalf
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Report back via `credentials_verified(attempt)` after the delay
    CredentialCheck { attempt: u64, delay_ms: u64 },
    /// Report back via `tick(epoch)` after the delay
    Tick { epoch: u64, delay_ms: u64 },
    /// Ask the advisor, then report back via `advice_ready(ticket, ..)`
    Advise {
        ticket: u64,
        active: Vec<String>,
        score: u8,
    },
}

/// Why an isolation event was raised
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum IsolationCause {
    Countdown,
    Review { report_id: String },
}

#[derive(Debug, Clone, Copy)]
struct PendingAdvice {
    impact: Impact,
    strength: u8,
}

/// The session aggregate and its transition logic
pub struct SessionController {
    pub(crate) config: VigilConfig,
    pub(crate) state: SessionState,
    pub(crate) principal: Option<Principal>,
    pub(crate) signals: SignalRegistry,
    pub(crate) score: TrustScore,
    pub(crate) timer: IsolationTimer,
    pub(crate) restrictions: RestrictionRegistry,
    pub(crate) audit: AuditLog,
    pub(crate) journal: Journal,
    pub(crate) breaches: BreachQueue,
    attempt: u64,
    next_ticket: u64,
    pending_advice: HashMap<u64, PendingAdvice>,
    restricted_at: Option<DateTime<Utc>>,
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new(VigilConfig::default())
    }
}

impl SessionController {
    pub fn new(config: VigilConfig) -> Self {
        let signals = SignalRegistry::from_specs(&config.signals);
        let score = config.scoring.baseline();
        let mut journal = Journal::new(config.retention.journal);
        journal.push(Impact::Low, NEUTRAL_ADVICE, score.value);

        Self {
            timer: IsolationTimer::new(config.isolation.countdown_secs),
            audit: AuditLog::new(config.retention.audit),
            restrictions: RestrictionRegistry::new(),
            breaches: BreachQueue::new(),
            state: SessionState::Unauthenticated,
            principal: None,
            signals,
            score,
            journal,
            config,
            attempt: 0,
            next_ticket: 1,
            pending_advice: HashMap::new(),
            restricted_at: None,
        }
    }

    pub fn config(&self) -> &VigilConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Routed view while active
    pub fn view(&self) -> Option<View> {
        if self.state != SessionState::Active {
            return None;
        }
        self.principal.as_ref().map(|p| match p.role {
            Role::Admin => View::Admin,
            Role::User => View::Standard,
        })
    }

    pub fn signals(&self) -> &SignalRegistry {
        &self.signals
    }

    pub fn score(&self) -> TrustScore {
        self.score
    }

    pub fn timer(&self) -> &IsolationTimer {
        &self.timer
    }

    pub fn restrictions(&self) -> &RestrictionRegistry {
        &self.restrictions
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn breaches(&self) -> &BreachQueue {
        &self.breaches
    }

    /// Seconds left on the restricted screen's cooling display.
    ///
    /// Informational only; restriction ends by revocation, never by this.
    pub fn cooling_remaining(&self, now: DateTime<Utc>) -> Option<u64> {
        if self.state != SessionState::Restricted {
            return None;
        }
        let since = self.restricted_at?;
        let elapsed = (now - since).num_seconds().max(0) as u64;
        Some(self.config.isolation.cooling_display_secs.saturating_sub(elapsed))
    }

    /// Principal recorded on audit entries
    pub(crate) fn actor(&self) -> String {
        self.principal
            .as_ref()
            .map(|p| p.identifier.clone())
            .unwrap_or_else(|| SYSTEM_PRINCIPAL.to_string())
    }

    pub(crate) fn record(&mut self, action: &str, status: AuditStatus, details: Option<String>) {
        let actor = self.actor();
        self.audit.record(&actor, action, status, details);
    }

    fn transition(&mut self, to: SessionState) {
        if self.state != to {
            info!(from = %self.state, to = %to, "session transition");
        }
        self.state = to;
    }

    fn reject(&mut self, event: &'static str) -> VigilError {
        warn!(state = %self.state, event, "rejected event");
        self.record(
            "Transition Rejected",
            AuditStatus::Warning,
            Some(format!("{} while {}", event, self.state)),
        );
        VigilError::InvalidTransition {
            state: self.state,
            event,
        }
    }

    /// UNAUTHENTICATED -> VERIFYING_CREDENTIALS, or straight to RESTRICTED
    /// for a restricted principal.
    pub fn submit_credentials(&mut self, identifier: &str) -> Result<Vec<Effect>, VigilError> {
        if self.state != SessionState::Unauthenticated {
            return Err(self.reject("submit credentials"));
        }

        let identifier = identifier.trim();
        if identifier.is_empty() {
            self.record(
                "Authentication Attempt",
                AuditStatus::Failed,
                Some("Empty identifier".to_string()),
            );
            return Ok(Vec::new());
        }

        self.principal = Some(Principal::from_identifier(identifier));
        self.record(
            "Authentication Attempt",
            AuditStatus::Info,
            Some(format!("Identifier: {}", identifier)),
        );

        if self.restrictions.contains(identifier) {
            self.restricted_at = Some(Utc::now());
            self.transition(SessionState::Restricted);
            self.record(
                "Access Denied",
                AuditStatus::Failed,
                Some("Account is currently isolated".to_string()),
            );
            return Ok(Vec::new());
        }

        self.attempt += 1;
        self.transition(SessionState::VerifyingCredentials);

        Ok(vec![Effect::CredentialCheck {
            attempt: self.attempt,
            delay_ms: self.config.auth.credential_delay_ms,
        }])
    }

    /// VERIFYING_CREDENTIALS -> AWAITING_SECOND_FACTOR
    pub fn credentials_verified(&mut self, attempt: u64) -> Vec<Effect> {
        if self.state != SessionState::VerifyingCredentials || attempt != self.attempt {
            debug!(attempt, current = self.attempt, "stale credential check");
            return Vec::new();
        }

        let role = self.principal.as_ref().map_or(Role::User, |p| p.role);
        self.transition(SessionState::AwaitingSecondFactor);
        self.record(
            "Credentials Verified",
            AuditStatus::Success,
            Some(format!("Role: {}", role)),
        );
        Vec::new()
    }

    /// AWAITING_SECOND_FACTOR -> ACTIVE, routed by role.
    ///
    /// With a configured code a mismatch is a FAILED self-loop.
    pub fn complete_second_factor(&mut self, code: Option<&str>) -> Result<Vec<Effect>, VigilError> {
        if self.state != SessionState::AwaitingSecondFactor {
            return Err(self.reject("complete second factor"));
        }

        if let Some(expected) = self.config.auth.second_factor_code.as_deref() {
            if code.map(str::trim) != Some(expected) {
                self.record(
                    "2FA Verification",
                    AuditStatus::Failed,
                    Some("Verification code rejected".to_string()),
                );
                return Ok(Vec::new());
            }
        }

        self.transition(SessionState::Active);
        let routed = match self.view() {
            Some(View::Admin) => "admin console",
            _ => "standard dashboard",
        };
        self.record(
            "2FA Verification",
            AuditStatus::Success,
            Some(format!("Multi-factor challenge completed, routed to {}", routed)),
        );
        Ok(Vec::new())
    }

    /// Flip a signal and re-evaluate the session
    pub fn toggle_signal(&mut self, id: &str) -> Result<Vec<Effect>, VigilError> {
        if self.state != SessionState::Active {
            return Err(self.reject("toggle signal"));
        }

        let Some(active) = self.signals.toggle(id) else {
            warn!(signal = id, "toggle of unknown signal ignored");
            self.record(
                "Signal Toggle Ignored",
                AuditStatus::Warning,
                Some(format!("Unknown signal: {}", id)),
            );
            return Ok(Vec::new());
        };

        let name = self
            .signals
            .get(id)
            .map_or_else(|| id.to_string(), |s| s.name.clone());
        self.record(
            "Signal Adjusted",
            AuditStatus::Info,
            Some(format!("{} -> {}", name, if active { "ON" } else { "OFF" })),
        );

        Ok(self.recompute())
    }

    /// Rescore, keep the timer in step, and request advice
    fn recompute(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.score = self.config.scoring.evaluate(&self.signals);
        debug!(score = self.score.value, class = %self.score.class, "score recomputed");

        match self.timer.observe(self.score.class) {
            TimerChange::Armed { epoch, remaining } => {
                info!(epoch, remaining, "isolation countdown armed");
                self.record(
                    "Isolation Countdown Armed",
                    AuditStatus::Warning,
                    Some(format!(
                        "Score {} reached threshold {}, isolation in {}s",
                        self.score.value, self.config.scoring.high_risk_threshold, remaining
                    )),
                );
                effects.push(Effect::Tick {
                    epoch,
                    delay_ms: self.config.isolation.tick_ms,
                });
            }
            TimerChange::Cancelled => {
                info!("isolation countdown cancelled");
                self.record(
                    "Isolation Countdown Cancelled",
                    AuditStatus::Info,
                    Some(format!("Score dropped to {}", self.score.value)),
                );
            }
            TimerChange::Unchanged => {}
        }

        let active = self.signals.active_names();
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.pending_advice.insert(
            ticket,
            PendingAdvice {
                impact: if active.is_empty() {
                    Impact::Low
                } else {
                    Impact::High
                },
                strength: self.score.value,
            },
        );
        effects.push(Effect::Advise {
            ticket,
            active,
            score: self.score.value,
        });

        effects
    }

    /// One countdown second elapsed
    pub fn tick(&mut self, epoch: u64) -> Vec<Effect> {
        match self.timer.tick(epoch) {
            TickOutcome::Stale => {
                debug!(epoch, "stale tick dropped");
                Vec::new()
            }
            TickOutcome::Counting { epoch, remaining } => {
                debug!(epoch, remaining, "isolation countdown");
                vec![Effect::Tick {
                    epoch,
                    delay_ms: self.config.isolation.tick_ms,
                }]
            }
            TickOutcome::Fired => {
                self.raise_isolation(IsolationCause::Countdown);
                Vec::new()
            }
        }
    }

    /// ACTIVE -> RESTRICTED. Suppressed when the session is not active.
    pub(crate) fn raise_isolation(&mut self, cause: IsolationCause) -> bool {
        if self.state != SessionState::Active {
            debug!(state = %self.state, ?cause, "duplicate isolation suppressed");
            return false;
        }
        let Some(identifier) = self.principal.as_ref().map(|p| p.identifier.clone()) else {
            return false;
        };

        self.restrictions.add(&identifier);
        self.timer.disarm();
        self.restricted_at = Some(Utc::now());
        self.transition(SessionState::Restricted);

        let details = match cause {
            IsolationCause::Countdown => format!(
                "Automatic isolation for {} due to high risk score",
                identifier
            ),
            IsolationCause::Review { report_id } => format!(
                "Administrative isolation for {} after review of {}",
                identifier, report_id
            ),
        };
        warn!(principal = %identifier, "session isolated");
        self.record("Isolation Triggered", AuditStatus::Warning, Some(details));
        true
    }

    /// ACTIVE -> UNAUTHENTICATED
    pub fn logout(&mut self) -> Result<Vec<Effect>, VigilError> {
        if self.state != SessionState::Active {
            return Err(self.reject("logout"));
        }
        self.record(
            "Session Terminated",
            AuditStatus::Info,
            Some("Manual logout performed".to_string()),
        );
        self.reset_session();
        Ok(Vec::new())
    }

    /// Leave the restricted screen: back to ACTIVE if the restriction was
    /// revoked meanwhile, otherwise a forced logout.
    pub fn acknowledge(&mut self) -> Result<Vec<Effect>, VigilError> {
        if self.state != SessionState::Restricted {
            return Err(self.reject("acknowledge"));
        }

        let still_restricted = self
            .principal
            .as_ref()
            .map_or(true, |p| self.restrictions.contains(&p.identifier));

        if still_restricted {
            self.record(
                "Isolation Finalized",
                AuditStatus::Info,
                Some("User redirected to login".to_string()),
            );
            self.reset_session();
            return Ok(Vec::new());
        }

        self.restricted_at = None;
        self.transition(SessionState::Active);
        self.record(
            "Restriction Acknowledged",
            AuditStatus::Info,
            Some("User re-entering dashboard".to_string()),
        );
        // Re-entry re-evaluates the current signals, so a still-risky session
        // gets a fresh countdown.
        Ok(self.recompute())
    }

    fn reset_session(&mut self) {
        self.transition(SessionState::Unauthenticated);
        self.principal = None;
        self.signals.reset();
        self.score = self.config.scoring.baseline();
        self.timer.disarm();
        self.restricted_at = None;
        // Invalidates any credential check still in flight
        self.attempt += 1;
    }

    /// File a breach report for administrative review. Returns its id.
    pub fn report_breach(
        &mut self,
        source: &str,
        date: &str,
        severity: Severity,
        description: &str,
    ) -> Result<String, VigilError> {
        if self.state != SessionState::Active {
            return Err(self.reject("report breach"));
        }

        let reporter = self.actor();
        let id = self
            .breaches
            .file(source, date, severity, description, &reporter)
            .id
            .clone();
        self.record(
            "Threat Reported",
            AuditStatus::Warning,
            Some(format!(
                "User {} reported breach: {} ({}, {})",
                reporter, source, severity, id
            )),
        );
        Ok(id)
    }

    /// Deliver an advisory result. Failures fall back to a neutral line.
    pub fn advice_ready(&mut self, ticket: u64, outcome: Result<String, AdvisoryError>) {
        let Some(pending) = self.pending_advice.remove(&ticket) else {
            debug!(ticket, "advice for unknown ticket dropped");
            return;
        };

        match outcome {
            Ok(message) => {
                self.journal.push(pending.impact, &message, pending.strength);
            }
            Err(err) => {
                warn!(ticket, error = %err, "advisory unavailable, using fallback");
                self.journal
                    .push(pending.impact, FALLBACK_ADVICE, pending.strength);
                self.record("Advisory Unavailable", AuditStatus::Info, Some(err.to_string()));
            }
        }
    }
}
