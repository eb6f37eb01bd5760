//! Vigil - Continuous-authentication console
//!
//! A session accumulates risk signals, derives a trust score from them, and
//! is isolated automatically when the score stays at or above the high-risk
//! threshold for a full countdown. Every transition is audited.
//!
//! Data flow:
//! - signal toggle → score recomputed → countdown armed or cancelled
//! - countdown expiry → principal restricted → session isolated
//! - restriction registry → gates the next login and the isolation screen
//!
//! Authentication here is simulated. Role derivation from the identifier and
//! the countdown values are demo conventions, not security mechanisms.

pub mod admin;
pub mod advisory;
pub mod audit;
pub mod breach;
pub mod command;
pub mod config;
pub mod console;
pub mod error;
pub mod journal;
pub mod metrics;
pub mod restriction;
pub mod score;
pub mod session;
pub mod signal;
pub mod timer;

pub use admin::AdminConsole;
pub use advisory::{Advisor, Instrumented, LocalAdvisor};
pub use audit::{AuditEntry, AuditLog, AuditStatus};
pub use config::VigilConfig;
pub use console::Console;
pub use error::{AdvisoryError, VigilError};
pub use metrics::{MetricsLog, MetricsSink};
pub use restriction::RestrictionRegistry;
pub use score::{RiskClass, TrustScore};
pub use session::{Effect, Principal, Role, SessionController, SessionState, View};
pub use signal::{Signal, SignalRegistry};
pub use timer::IsolationTimer;
