//! Reporting sinks for plan and apply progress
//!
//! The pipeline never prints directly; it emits [`RunEvent`]s to a
//! [`Reporter`] created for the run. [`ConsoleReporter`] renders them for a
//! terminal, [`LogReporter`] forwards them to `tracing`, and
//! [`MemoryReporter`] records them for inspection.

use chrono::{DateTime, Utc};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

use crate::models::{Plan, RuleAction};

/// One line of a plan summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanLine {
    pub rule: String,
    pub action: RuleAction,
    pub matched: usize,
}

impl PlanLine {
    pub fn from_plan(plan: &Plan) -> Vec<PlanLine> {
        plan.iter()
            .map(|r| PlanLine {
                rule: r.rule.name.clone(),
                action: r.rule.action,
                matched: r.len(),
            })
            .collect()
    }
}

/// Progress and outcome notifications emitted during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// Enumeration of a rule's query has started
    RuleStarted { rule: String, query: String },
    /// Enumeration of a rule finished
    RuleMatched { rule: String, matched: usize },
    /// All rules enumerated
    PlanReady { lines: Vec<PlanLine> },
    /// Apply was called with dry-run on and no force; nothing was changed
    DryRunInert,
    /// Mutation of one rule's messages is starting
    ApplyStarted {
        rule: String,
        action: RuleAction,
        total: usize,
    },
    /// Every 100 trashed messages
    TrashProgress {
        rule: String,
        done: usize,
        total: usize,
    },
    /// One batch delete call succeeded
    BatchDeleted {
        rule: String,
        done: usize,
        total: usize,
    },
    /// All of a rule's messages were mutated
    ApplyFinished {
        rule: String,
        action: RuleAction,
        count: usize,
    },
    /// Planning or applying aborted; the run ends here
    RunFailed { error: String },
}

/// Sink for run events
pub trait Reporter: Send + Sync {
    fn report(&self, event: &RunEvent);
}

/// Discards every event
#[derive(Debug, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&self, _event: &RunEvent) {}
}

/// Forwards events to `tracing` at info level
#[derive(Debug, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, event: &RunEvent) {
        match event {
            RunEvent::RuleStarted { rule, query } => {
                tracing::info!(rule = %rule, query = %query, "evaluating rule")
            }
            RunEvent::RuleMatched { rule, matched } => {
                tracing::info!(rule = %rule, matched, "rule evaluated")
            }
            RunEvent::PlanReady { lines } => {
                let total: usize = lines.iter().map(|l| l.matched).sum();
                tracing::info!(rules = lines.len(), total, "plan ready")
            }
            RunEvent::DryRunInert => tracing::info!("dry-run active, nothing was changed"),
            RunEvent::ApplyStarted { rule, action, total } => {
                tracing::info!(rule = %rule, action = %action, total, "applying rule")
            }
            RunEvent::TrashProgress { rule, done, total } => {
                tracing::info!(rule = %rule, done, total, "trash progress")
            }
            RunEvent::BatchDeleted { rule, done, total } => {
                tracing::info!(rule = %rule, done, total, "batch deleted")
            }
            RunEvent::ApplyFinished { rule, action, count } => {
                tracing::info!(rule = %rule, action = %action, count, "rule applied")
            }
            RunEvent::RunFailed { error } => tracing::error!(error = %error, "run aborted"),
        }
    }
}

/// Records events in order
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<RunEvent>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, event: &RunEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Terminal renderer: spinners while enumerating, a plan table, progress lines
pub struct ConsoleReporter {
    multi: MultiProgress,
    spinner_style: ProgressStyle,
    spinner: Mutex<Option<ProgressBar>>,
}

impl ConsoleReporter {
    /// Share a MultiProgress with the log writer so log lines print above spinners
    pub fn with_multi_progress(multi: MultiProgress) -> Self {
        let spinner_style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed:>6}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ");

        Self {
            multi,
            spinner_style,
            spinner: Mutex::new(None),
        }
    }

    pub fn multi_progress(&self) -> &MultiProgress {
        &self.multi
    }

    fn println(&self, line: impl AsRef<str>) {
        let _ = self.multi.println(line);
    }

    fn start_spinner(&self, msg: String) {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(self.spinner_style.clone());
        pb.set_message(msg);
        pb.enable_steady_tick(Duration::from_millis(100));
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(previous) = slot.replace(pb) {
                previous.finish_and_clear();
            }
        }
    }

    fn clear_spinner(&self) {
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(pb) = slot.take() {
                pb.finish_and_clear();
            }
        }
    }

    fn finish_spinner(&self, msg: String) {
        self.clear_spinner();
        self.println(format!("  ✓ {}", msg));
    }

    #[cfg(test)]
    fn has_active_spinner(&self) -> bool {
        self.spinner.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }
}

impl Reporter for ConsoleReporter {
    fn report(&self, event: &RunEvent) {
        match event {
            RunEvent::RuleStarted { rule, query } => {
                self.start_spinner(format!("Evaluating rule '{}' ({})", rule, query))
            }
            RunEvent::RuleMatched { rule, matched } => {
                self.finish_spinner(format!("{}: {} messages", rule, matched))
            }
            RunEvent::PlanReady { lines } => {
                for line in render_plan_table(lines).lines() {
                    self.println(line);
                }
            }
            RunEvent::DryRunInert => {
                self.println("DRY-RUN active. Nothing was changed (use `run --apply` to apply).")
            }
            RunEvent::ApplyStarted { rule, action, total } => {
                self.println(format!("\n{} | action={} | msgs={}", rule, action, total))
            }
            RunEvent::TrashProgress { done, total, .. } => {
                self.println(format!("  ... {}/{} moved to trash", done, total))
            }
            RunEvent::BatchDeleted { done, total, .. } => {
                self.println(format!("  ... {}/{} permanently deleted", done, total))
            }
            RunEvent::ApplyFinished { action, count, .. } => match action {
                RuleAction::Trash => self.println(format!("OK {} moved to TRASH.", count)),
                RuleAction::Delete => {
                    self.println(format!("OK {} deleted PERMANENTLY.", count))
                }
            },
            RunEvent::RunFailed { .. } => self.clear_spinner(),
        }
    }
}

/// Plain-text table: rule, action, matched count, then the total
pub fn render_plan_table(lines: &[PlanLine]) -> String {
    let name_width = lines
        .iter()
        .map(|l| l.rule.chars().count())
        .max()
        .unwrap_or(0)
        .max("Rule".len());

    let mut out = String::new();
    out.push_str("Plan (messages that would be affected)\n");
    out.push_str(&format!(
        "{:<width$}  {:<6}  {:>8}\n",
        "Rule",
        "Action",
        "Messages",
        width = name_width
    ));
    out.push_str(&format!("{}\n", "-".repeat(name_width + 18)));
    for line in lines {
        out.push_str(&format!(
            "{:<width$}  {:<6}  {:>8}\n",
            line.rule,
            line.action.as_str(),
            line.matched,
            width = name_width
        ));
    }
    let total: usize = lines.iter().map(|l| l.matched).sum();
    out.push_str(&format!("Total: {}\n", total));
    out
}

/// Markdown snapshot of a plan, suitable for saving alongside a run
#[derive(Debug, Clone)]
pub struct PlanReport {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub dry_run: bool,
    pub lines: Vec<PlanLine>,
}

impl PlanReport {
    pub fn new(plan: &Plan, dry_run: bool) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            dry_run,
            lines: PlanLine::from_plan(plan),
        }
    }

    pub fn total(&self) -> usize {
        self.lines.iter().map(|l| l.matched).sum()
    }

    /// Generate Markdown report
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        if self.dry_run {
            md.push_str("# Mailbox Cleanup Plan (DRY RUN)\n\n");
            md.push_str("> **DRY RUN** - No changes were made. This report shows what WOULD happen.\n\n");
        } else {
            md.push_str("# Mailbox Cleanup Plan\n\n");
        }
        md.push_str(&format!(
            "Generated: {}\n\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S")
        ));
        md.push_str(&format!("- **Run ID:** {}\n", self.run_id));
        md.push_str(&format!("- **Rules:** {}\n", self.lines.len()));
        md.push_str(&format!("- **Messages matched:** {}\n\n", self.total()));

        if self.lines.is_empty() {
            md.push_str("_No rules configured._\n");
            return md;
        }

        md.push_str("| Rule | Action | Messages |\n");
        md.push_str("|------|--------|----------|\n");
        for line in &self.lines {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                line.rule.replace('|', "\\|"),
                line.action,
                line.matched
            ));
        }

        let deleted: usize = self
            .lines
            .iter()
            .filter(|l| l.action.is_irreversible())
            .map(|l| l.matched)
            .sum();
        if deleted > 0 {
            let verb = if self.dry_run { "would be" } else { "were" };
            md.push_str(&format!(
                "\n**{} messages {} deleted permanently.**\n",
                deleted, verb
            ));
        }

        md
    }

    /// Save report to file
    pub async fn save(&self, path: &std::path::Path) -> std::io::Result<()> {
        tokio::fs::write(path, self.to_markdown()).await
    }
}
