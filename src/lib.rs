//! Gmail Cleaner
//!
//! A rule-driven cleanup tool for a Gmail mailbox. Each rule is a Gmail
//! search query plus an action; the tool first builds a plan of matching
//! message ids and then, only when explicitly allowed, moves them to trash
//! or deletes them permanently.
//!
//! # Overview
//!
//! - **Authentication**: OAuth2 installed-app flow with an on-disk token cache
//! - **Planning**: paginated search per rule, capped at the rule's `max_results`
//! - **Applying**: sequential trash, or batch delete in chunks of 500
//! - **Retry**: exponential backoff on 429/5xx, fail-fast on everything else
//!
//! # Example Usage
//!
//! ```no_run
//! use gmail_cleaner::{cli, report::LogReporter, config::Settings, retry::RetryPolicy};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> gmail_cleaner::Result<()> {
//!     let settings = Settings::load("config/rules.yaml".as_ref()).await?;
//!     let policy = RetryPolicy::default();
//!
//!     let (client, _email) = cli::connect(&settings, &policy).await?;
//!     let outcome = cli::execute(&client, &settings, cli::RunMode::PlanOnly, policy, &LogReporter).await?;
//!     println!("{} messages matched", outcome.plan.total_messages());
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`auth`] - OAuth2 authentication, scope selection and hub construction
//! - [`client`] - Mail client trait and the Gmail implementation
//! - [`retry`] - Retry policy with exponential backoff
//! - [`pager`] - Capped, paginated message id enumeration
//! - [`planner`] - Rule evaluation into a plan
//! - [`apply`] - Dry-run gate, trash and batch delete
//! - [`pipeline`] - Per-run state machine
//! - [`report`] - Progress events, console output and Markdown plan reports
//! - [`cli`] - Command-line interface
//! - [`config`] - YAML configuration
//! - [`error`] - Error types and result aliases
//! - [`models`] - Rules, results and plans

pub mod apply;
pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod pager;
pub mod pipeline;
pub mod planner;
pub mod report;
pub mod retry;

// Re-export commonly used types for convenience
pub use error::{CleanupError, ErrorKind, Result};

// Core data models
pub use models::{Plan, Rule, RuleAction, RuleResult};

// Config types
pub use config::{AppConfig, Settings};

// Client traits
pub use client::{connect_client, GmailMailClient, ListRequest, MailClient, MessagePage};

// Engine
pub use apply::{apply_plan, ApplySummary};
pub use pager::{MessageIdPager, PagerOptions};
pub use pipeline::{CleanupRun, RunPhase};
pub use planner::build_plan;
pub use retry::RetryPolicy;

// Reporting
pub use report::{ConsoleReporter, LogReporter, MemoryReporter, NullReporter, PlanReport, Reporter, RunEvent};

// CLI types (for binary usage)
pub use cli::{Cli, Commands, RunMode, RunOutcome};
