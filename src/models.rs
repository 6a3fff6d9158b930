use serde::{Deserialize, Serialize};
use std::fmt;

/// What to do with the messages a rule matches
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleAction {
    /// Move to trash (reversible)
    #[default]
    #[serde(alias = "trash")]
    Trash,
    /// Permanent removal through batch delete (irreversible)
    #[serde(alias = "delete")]
    Delete,
}

impl RuleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleAction::Trash => "TRASH",
            RuleAction::Delete => "DELETE",
        }
    }

    pub fn is_irreversible(&self) -> bool {
        matches!(self, RuleAction::Delete)
    }
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named cleanup policy: a Gmail search query, an action, and a cap
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rule {
    pub name: String,
    pub query: String,
    #[serde(default)]
    pub action: RuleAction,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default)]
    pub include_spam_trash: bool,
}

pub(crate) fn default_max_results() -> usize {
    2000
}

impl Rule {
    /// Rule with default action and cap
    pub fn new(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
            action: RuleAction::default(),
            max_results: default_max_results(),
            include_spam_trash: false,
        }
    }

    pub fn with_action(mut self, action: RuleAction) -> Self {
        self.action = action;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_spam_trash(mut self, include_spam_trash: bool) -> Self {
        self.include_spam_trash = include_spam_trash;
        self
    }
}

/// The message ids one rule matched, in the order the mailbox returned them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleResult {
    pub rule: Rule,
    pub ids: Vec<String>,
}

impl RuleResult {
    pub fn new(rule: Rule, ids: Vec<String>) -> Self {
        Self { rule, ids }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Snapshot of what every configured rule matches, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    results: Vec<RuleResult>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: RuleResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[RuleResult] {
        &self.results
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RuleResult> {
        self.results.iter()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of matched messages across all rules
    pub fn total_messages(&self) -> usize {
        self.results.iter().map(RuleResult::len).sum()
    }

    /// True if applying this plan would permanently delete anything
    pub fn has_irreversible_actions(&self) -> bool {
        self.results
            .iter()
            .any(|r| r.rule.action.is_irreversible() && !r.is_empty())
    }
}

impl From<Vec<RuleResult>> for Plan {
    fn from(results: Vec<RuleResult>) -> Self {
        Self { results }
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a RuleResult;
    type IntoIter = std::slice::Iter<'a, RuleResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}
