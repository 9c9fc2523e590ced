//! webgate
//!
//! Replays scripted handshakes against a web component and prints what the
//! engine received for each request.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use webgate_cli::scenario::{Scenario, replay};
use webgate_core::config::{Config, load_config};
use webgate_core::{DefaultPolicy, EventName, GrantPolicy};

#[derive(Parser, Debug)]
#[command(name = "webgate")]
#[command(version, about = "Web component authorization handshake")]
struct Args {
    /// Project directory holding `.webgate/settings.json`
    #[arg(long, env = "WEBGATE_PROJECT_DIR", global = true)]
    project_dir: Option<PathBuf>,

    /// What happens to requests the host never answers
    #[arg(long, global = true, value_enum)]
    default_policy: Option<PolicyArg>,

    /// Seconds before an unanswered request gets its default (timeout policy)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Treatment of grants outside the offered set
    #[arg(long, global = true, value_enum)]
    grant_policy: Option<GrantArg>,

    /// Log level filter (e.g. "info", "debug", "warn").
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, env = "WEBGATE_LOG_JSON", global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a scenario file and print the JSON report
    Run {
        /// Path to the scenario JSON
        scenario: PathBuf,
    },
    /// List the event names host code can register for
    Events,
}

/// Policy for unanswered requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PolicyArg {
    /// Keep requests pending until navigation or teardown.
    #[value(alias = "until_teardown")]
    UntilTeardown,
    /// Apply the default after the pending timeout.
    Timeout,
}

impl From<PolicyArg> for DefaultPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::UntilTeardown => Self::UntilTeardown,
            PolicyArg::Timeout => Self::Timeout,
        }
    }
}

/// Policy for grants outside the offered set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GrantArg {
    /// Keep the offered part of the grant.
    Clamp,
    /// Deny the whole request.
    Reject,
}

impl From<GrantArg> for GrantPolicy {
    fn from(arg: GrantArg) -> Self {
        match arg {
            GrantArg::Clamp => Self::Clamp,
            GrantArg::Reject => Self::Reject,
        }
    }
}

impl Args {
    /// CLI flags take precedence over files and environment.
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(policy) = self.default_policy {
            config.handshake.default_policy = policy.into();
        }
        if let Some(secs) = self.timeout_secs {
            config.handshake.pending_timeout_secs = secs;
        }
        if let Some(policy) = self.grant_policy {
            config.handshake.grant_policy = policy.into();
        }
        if let Some(level) = &self.log_level {
            config.logging.level.clone_from(level);
        }
        if self.log_json {
            config.logging.json = true;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.project_dir.as_deref())?;
    args.apply_overrides(&mut config);

    let log_filter = format!(
        "webgate={level},webgate_runtime={level},webgate_cli={level}",
        level = config.logging.level
    );
    webgate_core::tracing_init::init_tracing(&log_filter, config.logging.json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        default_policy = %config.handshake.default_policy,
        grant_policy = %config.handshake.grant_policy,
        "Starting webgate"
    );

    match args.command {
        Command::Run { scenario } => run(&scenario, &config).await,
        Command::Events => {
            print_events();
            Ok(())
        }
    }
}

#[allow(clippy::print_stdout)]
async fn run(path: &Path, config: &Config) -> anyhow::Result<()> {
    let scenario = Scenario::load(path)
        .with_context(|| format!("Failed to load scenario {}", path.display()))?;
    let report = replay(scenario, &config.handshake).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_events() {
    for event in EventName::ALL {
        let category = event
            .category()
            .map_or_else(|| "lifecycle".to_string(), |c| c.to_string());
        let returns = if event.returns_handled() { "bool" } else { "-" };
        println!("{:<32} {category:<24} {returns}", event.as_str());
    }
}
