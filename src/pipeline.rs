//! Per-run orchestration and its state machine
//!
//! ```text
//! Idle -> Authenticated -> Planned -> Done              (plan only)
//!                                  -> Applying -> Done | Failed
//! ```
//!
//! A [`CleanupRun`] lives for a single invocation and persists nothing.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error};

use crate::apply::{apply_plan, ApplySummary};
use crate::client::MailClient;
use crate::config::Settings;
use crate::error::{CleanupError, Result};
use crate::models::Plan;
use crate::planner::build_plan;
use crate::report::{Reporter, RunEvent};
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    Idle,
    Authenticated,
    Planned,
    Applying,
    Done,
    Failed,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

pub struct CleanupRun<'a, C: MailClient + ?Sized> {
    client: &'a C,
    settings: &'a Settings,
    policy: RetryPolicy,
    reporter: &'a dyn Reporter,
    phase: RunPhase,
    plan: Option<Plan>,
}

impl<'a, C: MailClient + ?Sized> CleanupRun<'a, C> {
    pub fn new(
        client: &'a C,
        settings: &'a Settings,
        policy: RetryPolicy,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            client,
            settings,
            policy,
            reporter,
            phase: RunPhase::Idle,
            plan: None,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    fn transition(&mut self, to: RunPhase) {
        debug!("Run phase {} -> {}", self.phase, to);
        self.phase = to;
    }

    fn fail(&mut self, error: &CleanupError) {
        self.transition(RunPhase::Failed);
        self.reporter.report(&RunEvent::RunFailed {
            error: error.to_string(),
        });
    }

    fn expect_phase(&self, expected: RunPhase, operation: &str) -> Result<()> {
        if self.phase != expected {
            return Err(CleanupError::InvalidState(format!(
                "cannot {} while {} (expected {})",
                operation, self.phase, expected
            )));
        }
        Ok(())
    }

    /// Record that the credential provider produced a working client
    pub fn authenticated(&mut self) -> Result<()> {
        self.expect_phase(RunPhase::Idle, "authenticate")?;
        self.transition(RunPhase::Authenticated);
        Ok(())
    }

    /// Evaluate all rules; the plan is kept for a later apply
    pub async fn build_plan(&mut self) -> Result<&Plan> {
        self.expect_phase(RunPhase::Authenticated, "build a plan")?;

        let outcome = build_plan(self.client, self.settings, &self.policy, self.reporter).await;
        match outcome {
            Ok(plan) => {
                self.transition(RunPhase::Planned);
                Ok(self.plan.insert(plan))
            }
            Err(e) => {
                error!("Plan build failed: {}", e);
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Apply the plan behind the dry-run gate
    pub async fn apply(&mut self, dry_run: bool, force: bool) -> Result<ApplySummary> {
        self.expect_phase(RunPhase::Planned, "apply")?;
        let plan = self
            .plan
            .as_ref()
            .ok_or_else(|| CleanupError::InvalidState("planned run has no plan".to_string()))?;

        self.phase = RunPhase::Applying;
        debug!("Run phase {} -> {}", RunPhase::Planned, RunPhase::Applying);

        let outcome = apply_plan(
            self.client,
            plan,
            &self.settings.app.user_id,
            dry_run,
            force,
            &self.policy,
            self.reporter,
        )
        .await;

        match outcome {
            Ok(summary) => {
                self.transition(RunPhase::Done);
                Ok(summary)
            }
            Err(e) => {
                error!("Apply failed: {}", e);
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Close a plan-only run
    pub fn finish(&mut self) -> Result<()> {
        self.expect_phase(RunPhase::Planned, "finish")?;
        self.transition(RunPhase::Done);
        Ok(())
    }
}
