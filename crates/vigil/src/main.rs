//! vigil - Continuous-authentication console
//!
//! "Trust is a score. Isolation is a countdown."

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use vigil::{
    advisory::{Instrumented, LocalAdvisor},
    command::{Command, HELP},
    config::VigilConfig,
    console::Console,
    metrics::{MetricsLog, MetricsSummary},
    session::{SessionController, SessionState},
    signal::SignalRegistry,
    Advisor,
};

/// vigil - Continuous-authentication console
#[derive(Parser)]
#[command(name = "vigil")]
#[command(version)]
#[command(about = "Continuous-authentication console with automatic isolation")]
#[command(long_about = "Continuous-authentication console with automatic isolation.\n\n\
    A session accumulates risk signals into a trust score. When the score\n\
    stays at or above the high-risk threshold for a full countdown, the\n\
    principal is restricted and the session isolated until an administrator\n\
    revokes the restriction.")]
pub struct Cli {
    /// Config file (default: ~/.config/vigil/vigil.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive console
    #[command(about = "Run the interactive session console")]
    Console,

    /// Score a set of active signals
    #[command(about = "Evaluate the trust score for a set of active signals")]
    Score {
        /// Signal ids to treat as active
        signals: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the signal catalog
    #[command(about = "List the configured risk signals")]
    Signals {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the default configuration
    #[command(about = "Initialize default configuration")]
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(VigilConfig::default_path);

    match cli.command {
        Commands::Console => cmd_console(&config_path).await,
        Commands::Score { signals, json } => cmd_score(&config_path, signals, json),
        Commands::Signals { json } => cmd_signals(&config_path, json),
        Commands::Init { force } => cmd_init(&config_path, force),
    }
}

async fn cmd_console(config_path: &Path) -> Result<()> {
    let config = VigilConfig::load_from(config_path)?;
    let metrics = Arc::new(MetricsLog::new(config.retention.metrics));
    let advisor = Arc::new(Instrumented::new(LocalAdvisor::new(), metrics.clone()));
    let mut console = Console::new(SessionController::new(config), advisor);

    println!("Vigil console. Type 'help' for commands.");
    prompt(&console)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    enum Input {
        Line(Option<String>),
        Event(Option<vigil::console::Event>),
    }

    loop {
        let input = tokio::select! {
            line = lines.next_line() => Input::Line(line.context("Failed to read stdin")?),
            event = console.next_event() => Input::Event(event),
        };

        match input {
            Input::Line(None) => break,
            Input::Line(Some(line)) => {
                if line.trim().is_empty() {
                    prompt(&console)?;
                    continue;
                }
                let command = match line.parse::<Command>() {
                    Ok(command) => command,
                    Err(message) => {
                        println!("{}", message);
                        prompt(&console)?;
                        continue;
                    }
                };
                if command == Command::Quit {
                    break;
                }

                let before = Snapshot::take(console.session());
                if command.is_mutation() {
                    match console.dispatch(&command) {
                        Ok(Some(reply)) => println!("{}", reply),
                        Ok(None) => {}
                        Err(err) => println!("Rejected: {}", err),
                    }
                } else {
                    render(&mut console, &command, &metrics)?;
                }
                before.announce(console.session());
                prompt(&console)?;
            }
            Input::Event(None) => break,
            Input::Event(Some(event)) => {
                let before = Snapshot::take(console.session());
                let summary = console.handle(event);
                let mut printed = before.announce(console.session());
                if let Some(summary) = summary {
                    println!();
                    println!("{}", summary);
                    printed = true;
                }
                if printed {
                    prompt(&console)?;
                }
            }
        }
    }

    Ok(())
}

/// What the user is told about between commands
struct Snapshot {
    state: SessionState,
    score: u8,
    remaining: Option<u32>,
}

impl Snapshot {
    fn take(session: &SessionController) -> Self {
        Self {
            state: session.state(),
            score: session.score().value,
            remaining: session.timer().remaining(),
        }
    }

    /// Print what changed. Returns whether anything was printed.
    fn announce(&self, session: &SessionController) -> bool {
        let mut printed = false;

        if session.state() != self.state {
            println!();
            println!("[{}] -> [{}]", self.state, session.state());
            if session.state() == SessionState::Restricted {
                println!("Device restricted due to trust violations. Type 'ack' to continue.");
            }
            printed = true;
        }

        let score = session.score();
        if score.value != self.score {
            println!("Trust score: {}", score);
            printed = true;
        }

        let remaining = session.timer().remaining();
        if remaining != self.remaining {
            match remaining {
                Some(secs) => println!("MANDATORY ISOLATION: {}s", secs),
                None if session.state() != SessionState::Restricted => {
                    println!("Isolation countdown cancelled")
                }
                None => {}
            }
            printed = true;
        }

        printed
    }
}

fn prompt<A: Advisor + 'static>(console: &Console<A>) -> Result<()> {
    let session = console.session();
    let who = session
        .principal()
        .map(|p| p.identifier.as_str())
        .unwrap_or("-");
    print!("{} {}> ", session.state(), who);
    std::io::stdout().flush()?;
    Ok(())
}

fn render<A: Advisor + 'static>(
    console: &mut Console<A>,
    command: &Command,
    metrics: &MetricsLog,
) -> Result<()> {
    match command {
        Command::Help => println!("{}", HELP),
        Command::Status => print_status(console.session()),
        Command::Signals => print_signals(console.session().signals()),
        Command::Audit(limit) => {
            println!(
                "{:<6} {:<20} {:<24} {:<9} {}",
                "ID", "PRINCIPAL", "ACTION", "STATUS", "DETAILS"
            );
            println!("{}", "-".repeat(90));
            for entry in console.session().audit().recent(*limit) {
                println!(
                    "{:<6} {:<20} {:<24} {:<9} {}",
                    entry.id,
                    truncate(&entry.principal, 18),
                    entry.action,
                    entry.status,
                    entry.details.as_deref().unwrap_or("")
                );
            }
        }
        Command::Journal => {
            for entry in console.session().journal().iter() {
                println!(
                    "{} [{:?} {:>3}] \"{}\"",
                    entry.timestamp.format("%H:%M:%S"),
                    entry.impact,
                    entry.strength,
                    entry.message
                );
            }
        }
        Command::Metrics => {
            let MetricsSummary {
                total,
                avg_duration_ms,
                error_rate,
            } = metrics.summary();
            println!("Calls: {}  Avg: {}ms  Errors: {}%", total, avg_duration_ms, error_rate);
            for metric in metrics.snapshot().iter().take(10) {
                println!(
                    "  {} {:<20} {:>8.1}ms {:?}",
                    metric.timestamp.format("%H:%M:%S"),
                    metric.endpoint,
                    metric.duration_ms,
                    metric.status
                );
            }
        }
        Command::Restricted => {
            let restricted: Vec<&str> = console.session().restrictions().iter().collect();
            if restricted.is_empty() {
                println!("No restricted principals");
            }
            for principal in restricted {
                println!("  {}", principal);
            }
        }
        Command::Breaches => {
            let pending = console.session().breaches().pending();
            if pending.is_empty() {
                println!("No pending reports");
            }
            for report in pending {
                println!(
                    "  {} {:<9} {:<16} {:<20} {}",
                    report.id,
                    report.severity,
                    truncate(&report.source, 14),
                    truncate(&report.reporter, 18),
                    report.description
                );
            }
        }
        Command::Summary => {
            console.request_summary();
            println!("Summary requested");
        }
        Command::Export => {
            let session = console.session();
            let snapshot = serde_json::json!({
                "state": session.state(),
                "principal": session.principal(),
                "view": session.view(),
                "score": session.score(),
                "countdown": session.timer().remaining(),
                "cooling_remaining": session.cooling_remaining(Utc::now()),
                "signals": session.signals(),
                "restricted": session.restrictions(),
                "breaches": session.breaches().pending(),
                "audit": session.audit().newest_first().collect::<Vec<_>>(),
                "audit_stats": session.audit().stats(),
                "journal": session.journal().iter().collect::<Vec<_>>(),
                "metrics": metrics.snapshot(),
                "metrics_summary": metrics.summary(),
            });
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        _ => {}
    }
    Ok(())
}

fn print_status(session: &SessionController) {
    println!("Session Status");
    println!("{}", "=".repeat(40));
    println!("State: {}", session.state());
    if let Some(principal) = session.principal() {
        println!("Principal: {} ({})", principal.identifier, principal.role);
    }
    if let Some(view) = session.view() {
        println!("View: {:?}", view);
    }
    println!("Trust score: {}", session.score());
    match session.timer().remaining() {
        Some(secs) => println!("Isolation countdown: {}s", secs),
        None => println!("Isolation countdown: disarmed"),
    }
    if let Some(secs) = session.cooling_remaining(Utc::now()) {
        println!("Cooling period remaining: {:02}:{:02}", secs / 60, secs % 60);
    }
    let stats = session.audit().stats();
    println!(
        "Audit: {} entries ({} warnings, {} failed)",
        stats.total, stats.warning, stats.failed
    );
}

fn print_signals(signals: &SignalRegistry) {
    println!("{:<8} {:<14} {:<16} {:>7} {}", "ID", "NAME", "CATEGORY", "IMPACT", "ACTIVE");
    println!("{}", "-".repeat(56));
    for signal in signals.iter() {
        println!(
            "{:<8} {:<14} {:<16} {:>7} {}",
            signal.id,
            signal.name,
            signal.category,
            signal.impact,
            if signal.active { "yes" } else { "no" }
        );
    }
}

fn cmd_score(config_path: &Path, active: Vec<String>, json_output: bool) -> Result<()> {
    let config = VigilConfig::load_from(config_path)?;
    let mut signals = SignalRegistry::from_specs(&config.signals);

    for id in &active {
        if !signals.set_active(id, true) {
            anyhow::bail!("Unknown signal: {}", id);
        }
    }

    let score = config.scoring.evaluate(&signals);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&score)?);
    } else {
        println!("Score: {}", score);
        if score.class.is_high() {
            println!(
                "Isolation would fire after {}s at this level",
                config.isolation.countdown_secs
            );
        }
    }
    Ok(())
}

fn cmd_signals(config_path: &Path, json_output: bool) -> Result<()> {
    let config = VigilConfig::load_from(config_path)?;
    let signals = SignalRegistry::from_specs(&config.signals);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&config.signals)?);
    } else {
        print_signals(&signals);
    }
    Ok(())
}

fn cmd_init(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        println!("Config already exists at {:?}", config_path);
        println!("Use --force to overwrite");
        return Ok(());
    }

    VigilConfig::default().save_to(config_path)?;
    println!("Created default config at {:?}", config_path);
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max).collect();
        format!("{}...", cut)
    } else {
        s.to_string()
    }
}
