//! Command-line interface and command handlers

use clap::{Parser, Subcommand};
use indicatif::MultiProgress;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::apply::ApplySummary;
use crate::auth;
use crate::client::{GmailMailClient, MailClient};
use crate::config::Settings;
use crate::error::{CleanupError, Result};
use crate::models::Plan;
use crate::pipeline::CleanupRun;
use crate::report::{ConsoleReporter, PlanReport, Reporter};
use crate::retry::RetryPolicy;

#[derive(Parser, Debug)]
#[command(name = "gmail-cleaner")]
#[command(version)]
#[command(about = "Rule-driven Gmail cleanup: plan, then trash or delete matching messages", long_about = None)]
pub struct Cli {
    /// Path to the YAML rules file
    #[arg(long, global = true, default_value = "config/rules.yaml")]
    pub config: PathBuf,

    /// Log level (ERROR, WARN, INFO, DEBUG, TRACE)
    #[arg(long, global = true, default_value = "INFO")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Acquire or refresh the OAuth token and exit
    Auth {
        /// Drop the cached token and run the consent flow again
        #[arg(long)]
        force: bool,
    },

    /// Show what each rule would affect; never modifies the mailbox
    Plan {
        /// Also write the plan as Markdown to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Build the plan, report it, then apply it
    Run {
        /// Really modify the mailbox (otherwise this is a dry run)
        #[arg(long)]
        apply: bool,

        /// Also write the plan as Markdown to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Generate an example rules file
    InitConfig {
        /// Path to create the rules file at
        #[arg(short, long, default_value = "config/rules.yaml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

/// What the run should do after planning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    PlanOnly,
    Run { apply: bool },
}

impl RunMode {
    /// `(dry_run, force)` for the mutator
    ///
    /// Without `--apply` a run is always inert; with it, mutation happens
    /// even when the config asks for dry-run.
    pub fn gate(&self, config_dry_run: bool) -> Option<(bool, bool)> {
        match self {
            RunMode::PlanOnly => None,
            RunMode::Run { apply } => Some((config_dry_run || !apply, *apply)),
        }
    }
}

/// Result of a plan or run invocation
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub plan: Plan,
    pub summary: Option<ApplySummary>,
}

/// Plan (and optionally apply) against any mail client
pub async fn execute<C: MailClient + ?Sized>(
    client: &C,
    settings: &Settings,
    mode: RunMode,
    policy: RetryPolicy,
    reporter: &dyn Reporter,
) -> Result<RunOutcome> {
    let mut run = CleanupRun::new(client, settings, policy, reporter);
    run.authenticated()?;
    let plan = run.build_plan().await?.clone();

    let summary = match mode.gate(settings.app.dry_run) {
        None => {
            run.finish()?;
            None
        }
        Some((dry_run, force)) => Some(run.apply(dry_run, force).await?),
    };

    Ok(RunOutcome { plan, summary })
}

/// Authenticate with the scope the rules need and verify the mailbox answers
pub async fn connect(settings: &Settings, policy: &RetryPolicy) -> Result<(GmailMailClient, String)> {
    let scope = auth::required_scope(&settings.rules);
    let hub = auth::initialize_gmail_hub(
        &settings.app.credentials_path,
        &settings.app.token_path,
        scope,
    )
    .await?;
    GmailMailClient::connect(hub, scope, &settings.app.user_id, policy).await
}

/// Dispatch a parsed command line
pub async fn run_command(cli: &Cli, multi: MultiProgress) -> Result<()> {
    let policy = RetryPolicy::default();

    match &cli.command {
        Commands::InitConfig { output, force } => init_config(output, *force).await,

        Commands::Auth { force } => {
            let settings = Settings::load(&cli.config).await?;
            if *force && settings.app.token_path.exists() {
                tokio::fs::remove_file(&settings.app.token_path).await?;
                info!("Removed cached token {:?}", settings.app.token_path);
            }

            let (_, email) = connect(&settings, &policy).await?;
            println!("Authentication OK. Token saved to {:?}", settings.app.token_path);
            println!("Connected to account: {}", email);
            Ok(())
        }

        Commands::Plan { report } => {
            run_rules(cli, RunMode::PlanOnly, report.as_deref(), &policy, multi).await
        }

        Commands::Run { apply, report } => {
            run_rules(cli, RunMode::Run { apply: *apply }, report.as_deref(), &policy, multi).await
        }
    }
}

async fn run_rules(
    cli: &Cli,
    mode: RunMode,
    report_path: Option<&Path>,
    policy: &RetryPolicy,
    multi: MultiProgress,
) -> Result<()> {
    let settings = Settings::load(&cli.config).await?;
    let reporter = ConsoleReporter::with_multi_progress(multi);

    let (client, email) = connect(&settings, policy).await?;
    info!("Authenticated as {}", email);
    if mode == (RunMode::Run { apply: true }) && settings.uses_delete() {
        warn!("Rules with action DELETE will remove messages permanently");
    }

    let outcome = execute(&client, &settings, mode, *policy, &reporter).await?;

    if let Some(path) = report_path {
        let dry_run = match mode.gate(settings.app.dry_run) {
            Some((dry_run, force)) => dry_run && !force,
            None => true,
        };
        PlanReport::new(&outcome.plan, dry_run).save(path).await?;
        let _ = reporter
            .multi_progress()
            .println(format!("Plan report written to {:?}", path));
    }

    if let Some(summary) = outcome.summary.filter(|s| !s.dry_run) {
        let _ = reporter.multi_progress().println(format!(
            "\nDone: {} trashed, {} deleted permanently ({} rules had no matches)",
            summary.trashed, summary.deleted, summary.skipped_rules
        ));
    }

    Ok(())
}

async fn init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        return Err(CleanupError::ConfigError(format!(
            "Configuration file already exists at {:?}. Use --force to overwrite.",
            output
        )));
    }

    Settings::create_example(output).await?;
    println!("Created example configuration file at: {:?}", output);
    println!("\nEdit it before running. Key settings:");
    println!("  - app.credentials_path: OAuth client secret downloaded from Google Cloud");
    println!("  - app.dry_run: keep true until the plan looks right");
    println!("  - rules[].action: TRASH (reversible) or DELETE (permanent)");
    Ok(())
}
