//! Plan application: trash one by one, or batch-delete in chunks of 500
//!
//! Nothing here mutates the mailbox unless the dry-run gate is open
//! (`dry_run == false` or `force == true`). Processing is sequential and
//! fail-fast: the first call that still fails after retries aborts the run,
//! and whatever was already trashed or deleted stays that way.

use tracing::{debug, info, warn};

use crate::client::{MailClient, MAX_BATCH_DELETE};
use crate::error::Result;
use crate::models::{Plan, RuleAction, RuleResult};
use crate::report::{Reporter, RunEvent};
use crate::retry::RetryPolicy;

/// Trash progress is reported after every this many messages
pub const TRASH_PROGRESS_INTERVAL: usize = 100;

/// Ids per batch delete call
pub const DELETE_BATCH_SIZE: usize = MAX_BATCH_DELETE;

/// Counts of what an apply pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplySummary {
    /// True when the gate kept the pass inert
    pub dry_run: bool,
    pub trashed: usize,
    pub deleted: usize,
    pub batch_calls: usize,
    /// Rules skipped because they matched nothing
    pub skipped_rules: usize,
}

impl ApplySummary {
    pub fn total_mutated(&self) -> usize {
        self.trashed + self.deleted
    }
}

/// Whether the gate lets mutations through
pub fn mutations_allowed(dry_run: bool, force: bool) -> bool {
    !dry_run || force
}

/// Split ids into consecutive batch delete chunks
pub fn delete_batches(ids: &[String]) -> std::slice::Chunks<'_, String> {
    ids.chunks(DELETE_BATCH_SIZE)
}

/// Apply every rule result of the plan in order
pub async fn apply_plan<C: MailClient + ?Sized>(
    client: &C,
    plan: &Plan,
    user_id: &str,
    dry_run: bool,
    force: bool,
    policy: &RetryPolicy,
    reporter: &dyn Reporter,
) -> Result<ApplySummary> {
    let mut summary = ApplySummary::default();

    if !mutations_allowed(dry_run, force) {
        info!("Dry-run active; {} matched messages left untouched", plan.total_messages());
        reporter.report(&RunEvent::DryRunInert);
        summary.dry_run = true;
        return Ok(summary);
    }

    if dry_run && force {
        warn!("Dry-run overridden by --apply; mailbox will be modified");
    }
    if plan.has_irreversible_actions() {
        warn!("Plan contains DELETE rules; those messages cannot be recovered");
    }

    for result in plan {
        if result.is_empty() {
            summary.skipped_rules += 1;
            continue;
        }

        reporter.report(&RunEvent::ApplyStarted {
            rule: result.rule.name.clone(),
            action: result.rule.action,
            total: result.len(),
        });

        match result.rule.action {
            RuleAction::Trash => {
                trash_all(client, result, user_id, policy, reporter, &mut summary).await?
            }
            RuleAction::Delete => {
                delete_all(client, result, user_id, policy, reporter, &mut summary).await?
            }
        }

        reporter.report(&RunEvent::ApplyFinished {
            rule: result.rule.name.clone(),
            action: result.rule.action,
            count: result.len(),
        });
    }

    Ok(summary)
}

async fn trash_all<C: MailClient + ?Sized>(
    client: &C,
    result: &RuleResult,
    user_id: &str,
    policy: &RetryPolicy,
    reporter: &dyn Reporter,
    summary: &mut ApplySummary,
) -> Result<()> {
    let total = result.len();

    for (index, id) in result.ids.iter().enumerate() {
        policy
            .run("trash_message", || client.trash_message(user_id, id))
            .await?;
        summary.trashed += 1;

        let done = index + 1;
        if done % TRASH_PROGRESS_INTERVAL == 0 {
            reporter.report(&RunEvent::TrashProgress {
                rule: result.rule.name.clone(),
                done,
                total,
            });
        }
    }

    info!("Rule '{}': {} messages moved to trash", result.rule.name, total);
    Ok(())
}

async fn delete_all<C: MailClient + ?Sized>(
    client: &C,
    result: &RuleResult,
    user_id: &str,
    policy: &RetryPolicy,
    reporter: &dyn Reporter,
    summary: &mut ApplySummary,
) -> Result<()> {
    let total = result.len();
    let mut done = 0;

    for batch in delete_batches(&result.ids) {
        policy
            .run("batch_delete", || client.batch_delete(user_id, batch))
            .await?;
        summary.batch_calls += 1;
        summary.deleted += batch.len();
        done += batch.len();

        debug!("Rule '{}': batch of {} deleted", result.rule.name, batch.len());
        reporter.report(&RunEvent::BatchDeleted {
            rule: result.rule.name.clone(),
            done,
            total,
        });
    }

    info!("Rule '{}': {} messages deleted permanently", result.rule.name, total);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("id{}", i)).collect()
    }

    #[test]
    fn test_gate() {
        assert!(!mutations_allowed(true, false));
        assert!(mutations_allowed(true, true));
        assert!(mutations_allowed(false, false));
        assert!(mutations_allowed(false, true));
    }

    #[test]
    fn test_delete_batches_sizes() {
        let list = ids(1201);
        let sizes: Vec<usize> = delete_batches(&list).map(|c| c.len()).collect();
        assert_eq!(sizes, vec![500, 500, 201]);
    }

    #[test]
    fn test_delete_batches_exact_multiple() {
        let list = ids(1000);
        assert_eq!(delete_batches(&list).count(), 2);
        assert_eq!(delete_batches(&[]).count(), 0);
    }

    #[test]
    fn test_delete_batches_preserve_order() {
        let list = ids(750);
        let rejoined: Vec<String> = delete_batches(&list).flatten().cloned().collect();
        assert_eq!(rejoined, list);
    }

    #[test]
    fn test_summary_total() {
        let summary = ApplySummary {
            trashed: 3,
            deleted: 4,
            ..Default::default()
        };
        assert_eq!(summary.total_mutated(), 7);
    }
}
