//! Administrative surface
//!
//! Revocation of restrictions and review of reported breaches. These act on
//! the registry independently of the session's own state: an administrator
//! can lift a restriction while the restricted user is still looking at the
//! isolation screen.

use crate::advisory::FALLBACK_SUMMARY;
use crate::audit::{AuditEntry, AuditStatus};
use crate::breach::{BreachReport, ReviewVerdict};
use crate::error::{AdvisoryError, VigilError};
use crate::session::{IsolationCause, SessionController, SessionState};
use tracing::{info, warn};

/// Input for an advisory summary
#[derive(Debug, Clone, Default)]
pub struct SummaryRequest {
    /// Most recent first
    pub logs: Vec<AuditEntry>,
    pub breaches: Vec<BreachReport>,
}

pub struct AdminConsole<'a> {
    session: &'a mut SessionController,
}

impl SessionController {
    /// Borrow the administrative surface
    pub fn admin(&mut self) -> AdminConsole<'_> {
        AdminConsole { session: self }
    }
}

impl<'a> AdminConsole<'a> {
    /// Restricted principals, sorted
    pub fn restricted(&self) -> Vec<String> {
        self.session
            .restrictions
            .iter()
            .map(str::to_string)
            .collect()
    }

    /// Lift a restriction. Returns whether the principal was restricted.
    pub fn revoke(&mut self, principal: &str) -> bool {
        let removed = self.session.restrictions.remove(principal);
        if removed {
            info!(principal, "restriction revoked");
            self.session.record(
                "Isolation Revoked",
                AuditStatus::Success,
                Some(format!("Admin manual revocation for {}", principal)),
            );
        } else {
            self.session.record(
                "Isolation Revoked",
                AuditStatus::Info,
                Some(format!("{} was not restricted", principal)),
            );
        }
        removed
    }

    pub fn pending_breaches(&self) -> &[BreachReport] {
        self.session.breaches.pending()
    }

    /// Close a pending report. `Isolate` restricts the reporter and, when the
    /// reporter owns the active session, isolates that session as well.
    pub fn review_breach(
        &mut self,
        id: &str,
        verdict: ReviewVerdict,
    ) -> Result<BreachReport, VigilError> {
        let report = self
            .session
            .breaches
            .take(id)
            .ok_or_else(|| VigilError::UnknownBreach(id.to_string()))?;

        match verdict {
            ReviewVerdict::Dismiss => {
                self.session.record(
                    "Threat Reviewed",
                    AuditStatus::Info,
                    Some(format!(
                        "Report {} from {} dismissed",
                        report.id, report.reporter
                    )),
                );
            }
            ReviewVerdict::Isolate => {
                let owns_session = self.session.state == SessionState::Active
                    && self
                        .session
                        .principal
                        .as_ref()
                        .is_some_and(|p| p.identifier == report.reporter);

                if owns_session {
                    self.session.raise_isolation(IsolationCause::Review {
                        report_id: report.id.clone(),
                    });
                } else {
                    self.session.restrictions.add(&report.reporter);
                    self.session.record(
                        "Isolation Enforced",
                        AuditStatus::Warning,
                        Some(format!(
                            "Reporter {} isolated after review of {}",
                            report.reporter, report.id
                        )),
                    );
                }
            }
        }

        Ok(report)
    }

    /// Recent activity for the advisory summary
    pub fn summary_request(&self, limit: usize) -> SummaryRequest {
        SummaryRequest {
            logs: self.session.audit.recent(limit),
            breaches: self.session.breaches.pending().to_vec(),
        }
    }

    /// Deliver a summary outcome. Failures fall back to a fixed line.
    pub fn summary_ready(&mut self, outcome: Result<String, AdvisoryError>) -> String {
        match outcome {
            Ok(summary) => summary,
            Err(err) => {
                warn!(error = %err, "summary unavailable, using fallback");
                self.session.record(
                    "Advisory Unavailable",
                    AuditStatus::Info,
                    Some(format!("Summary: {}", err)),
                );
                FALLBACK_SUMMARY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breach::Severity;
    use crate::config::VigilConfig;
    use crate::session::Effect;

    const USER: &str = "demo@ztrust.io";

    fn active_session(identifier: &str) -> SessionController {
        let mut session = SessionController::new(VigilConfig::default());
        let attempt = match session.submit_credentials(identifier).unwrap().as_slice() {
            [Effect::CredentialCheck { attempt, .. }] => *attempt,
            other => panic!("expected credential check, got {:?}", other),
        };
        session.credentials_verified(attempt);
        session.complete_second_factor(None).unwrap();
        session
    }

    fn file_report(session: &mut SessionController) -> String {
        session
            .report_breach(
                "Genesis Market",
                "2026-08-14",
                Severity::Critical,
                "Multi-factor bypass token listed on underground marketplace.",
            )
            .unwrap()
    }

    #[test]
    fn test_revoke_unknown_is_noop() {
        let mut session = SessionController::default();
        assert!(!session.admin().revoke("nobody@ztrust.io"));
        assert_eq!(
            session.audit().last().map(|e| e.status),
            Some(AuditStatus::Info)
        );
    }

    #[test]
    fn test_dismiss_removes_from_queue() {
        let mut session = active_session(USER);
        let id = file_report(&mut session);

        let report = session
            .admin()
            .review_breach(&id, ReviewVerdict::Dismiss)
            .unwrap();
        assert_eq!(report.source, "Genesis Market");
        assert!(session.admin().pending_breaches().is_empty());
        assert!(session.restrictions().is_empty());
        assert_eq!(session.state(), SessionState::Active);
    }

    #[test]
    fn test_isolate_own_session() {
        let mut session = active_session(USER);
        let id = file_report(&mut session);

        session
            .admin()
            .review_breach(&id, ReviewVerdict::Isolate)
            .unwrap();
        assert_eq!(session.state(), SessionState::Restricted);
        assert_eq!(session.admin().restricted(), vec![USER.to_string()]);
    }

    #[test]
    fn test_isolate_other_principal() {
        let mut session = active_session(USER);
        let id = file_report(&mut session);
        session.logout().unwrap();

        session
            .admin()
            .review_breach(&id, ReviewVerdict::Isolate)
            .unwrap();
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert!(session.restrictions().contains(USER));
        assert_eq!(
            session.audit().last().map(|e| e.action.as_str()),
            Some("Isolation Enforced")
        );

        // Next login for that principal goes straight to RESTRICTED
        session.submit_credentials(USER).unwrap();
        assert_eq!(session.state(), SessionState::Restricted);
    }

    #[test]
    fn test_review_unknown_report() {
        let mut session = SessionController::default();
        let err = session
            .admin()
            .review_breach("brc_missing", ReviewVerdict::Dismiss)
            .unwrap_err();
        assert_eq!(err, VigilError::UnknownBreach("brc_missing".to_string()));
    }

    #[test]
    fn test_summary_fallback_is_audited() {
        let mut session = SessionController::default();
        let text = session
            .admin()
            .summary_ready(Err(AdvisoryError::Timeout(3000)));
        assert_eq!(text, FALLBACK_SUMMARY);

        let last = session.audit().last().unwrap();
        assert_eq!(last.action, "Advisory Unavailable");
        assert_eq!(last.status, AuditStatus::Info);

        let text = session.admin().summary_ready(Ok("all quiet".to_string()));
        assert_eq!(text, "all quiet");
        assert_eq!(session.audit().len(), 1);
    }

    #[test]
    fn test_summary_request() {
        let mut session = active_session(USER);
        file_report(&mut session);

        let request = session.admin().summary_request(2);
        assert_eq!(request.logs.len(), 2);
        assert_eq!(request.logs[0].action, "Threat Reported");
        assert_eq!(request.breaches.len(), 1);
    }
}
