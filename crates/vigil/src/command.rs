//! Console command parsing

use crate::breach::{ReviewVerdict, Severity};
use std::str::FromStr;

/// Default number of audit entries shown
pub const DEFAULT_AUDIT_LINES: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login(String),
    Verify(Option<String>),
    Toggle(String),
    Logout,
    Ack,
    Report {
        source: String,
        severity: Severity,
        description: String,
    },
    Revoke(String),
    Review {
        id: String,
        verdict: ReviewVerdict,
    },
    Status,
    Signals,
    Audit(usize),
    Journal,
    Metrics,
    Restricted,
    Breaches,
    Summary,
    Export,
    Help,
    Quit,
}

impl Command {
    /// Whether the command changes session state
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Command::Login(_)
                | Command::Verify(_)
                | Command::Toggle(_)
                | Command::Logout
                | Command::Ack
                | Command::Report { .. }
                | Command::Revoke(_)
                | Command::Review { .. }
        )
    }
}

pub const HELP: &str = "\
Session:
  login <identifier>                       Submit credentials
  verify [code]                            Complete the second-factor challenge
  toggle <signal>                          Flip a risk signal
  ack                                      Acknowledge the isolation screen
  logout                                   End the session
  report <source> <critical|moderate> <description..>

Admin:
  revoke <identifier>                      Lift a restriction
  review <report-id> <dismiss|isolate>     Close a breach report
  restricted | breaches | summary | metrics

Views:
  status | signals | journal | audit [n] | export | help | quit";

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err("empty command".to_string());
        };
        let rest: Vec<&str> = words.collect();

        let one_arg = |what: &str| -> Result<String, String> {
            match rest.as_slice() {
                [arg] => Ok(arg.to_string()),
                _ => Err(format!("usage: {} <{}>", verb, what)),
            }
        };

        match verb.to_lowercase().as_str() {
            "login" => one_arg("identifier").map(Command::Login),
            "verify" => Ok(Command::Verify(rest.first().map(|s| s.to_string()))),
            "toggle" => one_arg("signal").map(Command::Toggle),
            "logout" => Ok(Command::Logout),
            "ack" | "acknowledge" => Ok(Command::Ack),
            "report" => {
                if rest.len() < 3 {
                    return Err(
                        "usage: report <source> <critical|moderate> <description..>".to_string(),
                    );
                }
                Ok(Command::Report {
                    source: rest[0].to_string(),
                    severity: rest[1].parse()?,
                    description: rest[2..].join(" "),
                })
            }
            "revoke" => one_arg("identifier").map(Command::Revoke),
            "review" => match rest.as_slice() {
                [id, verdict] => Ok(Command::Review {
                    id: id.to_string(),
                    verdict: verdict.parse()?,
                }),
                _ => Err("usage: review <report-id> <dismiss|isolate>".to_string()),
            },
            "status" => Ok(Command::Status),
            "signals" => Ok(Command::Signals),
            "audit" => match rest.first() {
                Some(n) => n
                    .parse()
                    .map(Command::Audit)
                    .map_err(|_| format!("not a count: {}", n)),
                None => Ok(Command::Audit(DEFAULT_AUDIT_LINES)),
            },
            "journal" => Ok(Command::Journal),
            "metrics" => Ok(Command::Metrics),
            "restricted" => Ok(Command::Restricted),
            "breaches" => Ok(Command::Breaches),
            "summary" => Ok(Command::Summary),
            "export" => Ok(Command::Export),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(format!("unknown command: {} (try 'help')", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_session_commands() {
        assert_eq!(
            "login demo@ztrust.io".parse::<Command>(),
            Ok(Command::Login("demo@ztrust.io".to_string()))
        );
        assert_eq!("verify".parse::<Command>(), Ok(Command::Verify(None)));
        assert_eq!(
            "verify 891794".parse::<Command>(),
            Ok(Command::Verify(Some("891794".to_string())))
        );
        assert_eq!(
            "TOGGLE wifi".parse::<Command>(),
            Ok(Command::Toggle("wifi".to_string()))
        );
        assert_eq!("ack".parse::<Command>(), Ok(Command::Ack));
    }

    #[test]
    fn test_parse_report() {
        let command = "report Pastebin critical creds in a clear-text dump"
            .parse::<Command>()
            .unwrap();
        assert_eq!(
            command,
            Command::Report {
                source: "Pastebin".to_string(),
                severity: Severity::Critical,
                description: "creds in a clear-text dump".to_string(),
            }
        );
        assert!(command.is_mutation());
        assert!("report Pastebin severe x".parse::<Command>().is_err());
    }

    #[test]
    fn test_parse_review_and_audit() {
        assert_eq!(
            "review brc_1234abcd isolate".parse::<Command>(),
            Ok(Command::Review {
                id: "brc_1234abcd".to_string(),
                verdict: ReviewVerdict::Isolate,
            })
        );
        assert_eq!("audit".parse::<Command>(), Ok(Command::Audit(20)));
        assert_eq!("audit 5".parse::<Command>(), Ok(Command::Audit(5)));
        assert!("audit many".parse::<Command>().is_err());
    }

    #[test]
    fn test_parse_errors() {
        assert!("".parse::<Command>().is_err());
        assert!("login".parse::<Command>().is_err());
        assert!("dance".parse::<Command>().is_err());
        assert!(!Command::Status.is_mutation());
        assert_eq!("export".parse::<Command>(), Ok(Command::Export));
        assert!(!Command::Export.is_mutation());
    }
}
