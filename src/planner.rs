//! Rule evaluation: turn the configured rules into a [`Plan`]

use tracing::info;

use crate::client::MailClient;
use crate::config::Settings;
use crate::error::Result;
use crate::models::{Plan, Rule, RuleResult};
use crate::pager::{MessageIdPager, PagerOptions};
use crate::report::{PlanLine, Reporter, RunEvent};
use crate::retry::RetryPolicy;

/// Pager options for one rule under the app settings
pub fn pager_options(rule: &Rule, user_id: &str, page_size: u32) -> PagerOptions {
    PagerOptions {
        user_id: user_id.to_string(),
        query: rule.query.clone(),
        include_spam_trash: rule.include_spam_trash,
        page_size,
        max_total: rule.max_results,
    }
}

/// Enumerate a single rule into its result
pub async fn evaluate_rule<C: MailClient + ?Sized>(
    client: &C,
    rule: &Rule,
    user_id: &str,
    page_size: u32,
    policy: &RetryPolicy,
) -> Result<RuleResult> {
    let pager = MessageIdPager::new(client, pager_options(rule, user_id, page_size), *policy);
    let ids = pager.collect_all().await?;
    Ok(RuleResult::new(rule.clone(), ids))
}

/// Evaluate every rule in declaration order
///
/// Fails fast: the first enumeration error aborts the whole plan.
pub async fn build_plan<C: MailClient + ?Sized>(
    client: &C,
    settings: &Settings,
    policy: &RetryPolicy,
    reporter: &dyn Reporter,
) -> Result<Plan> {
    let mut plan = Plan::new();

    for rule in &settings.rules {
        reporter.report(&RunEvent::RuleStarted {
            rule: rule.name.clone(),
            query: rule.query.clone(),
        });

        let result = evaluate_rule(
            client,
            rule,
            &settings.app.user_id,
            settings.app.page_size,
            policy,
        )
        .await?;

        info!("Rule '{}' matched {} messages", rule.name, result.len());
        reporter.report(&RunEvent::RuleMatched {
            rule: rule.name.clone(),
            matched: result.len(),
        });
        plan.push(result);
    }

    reporter.report(&RunEvent::PlanReady {
        lines: PlanLine::from_plan(&plan),
    });
    Ok(plan)
}
