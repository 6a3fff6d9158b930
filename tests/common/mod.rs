//! Common test utilities and fixtures

#![allow(dead_code)]

use async_trait::async_trait;
use gmail_cleaner::client::{ListRequest, MailClient, MessagePage};
use gmail_cleaner::config::{AppConfig, Settings};
use gmail_cleaner::error::{CleanupError, Result};
use gmail_cleaner::models::Rule;
use mockall::mock;
use std::collections::HashMap;
use std::sync::Mutex;

/// Generate `count` sequential message ids with a prefix
pub fn message_ids(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{}{:05}", prefix, i)).collect()
}

/// Settings with test paths and the given rules; dry-run on, default page size
pub fn test_settings(rules: Vec<Rule>) -> Settings {
    Settings {
        app: AppConfig::new("credentials.json", "token.json"),
        rules,
    }
}

/// In-memory mailbox keyed by query string
///
/// Pages are cut according to each request's `max_results`; the page token is
/// the offset of the next page. Failures can be scripted per operation and
/// every call is logged.
#[derive(Default)]
pub struct FakeMailbox {
    results: HashMap<String, Vec<String>>,
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    list_failures: Vec<u16>,
    trash_failures: Vec<u16>,
    delete_failures: Vec<u16>,
    profile_failures: Vec<u16>,
    profile_attempts: usize,
    fatal_trash_ids: HashMap<String, u16>,
    list_requests: Vec<ListRequest>,
    trashed: Vec<String>,
    trash_attempts: usize,
    batches: Vec<Vec<String>>,
    delete_attempts: usize,
}

impl FakeMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages a query matches, in listing order
    pub fn with_query(mut self, query: &str, ids: Vec<String>) -> Self {
        self.results.insert(query.to_string(), ids);
        self
    }

    /// Fail the next list calls with these statuses, in order
    pub fn fail_list_with(self, statuses: &[u16]) -> Self {
        self.lock().list_failures = statuses.iter().rev().copied().collect();
        self
    }

    /// Fail the next trash calls with these statuses, in order
    pub fn fail_trash_with(self, statuses: &[u16]) -> Self {
        self.lock().trash_failures = statuses.iter().rev().copied().collect();
        self
    }

    /// Fail the next batch delete calls with these statuses, in order
    pub fn fail_delete_with(self, statuses: &[u16]) -> Self {
        self.lock().delete_failures = statuses.iter().rev().copied().collect();
        self
    }

    /// Fail the next profile lookups with these statuses, in order
    pub fn fail_profile_with(self, statuses: &[u16]) -> Self {
        self.lock().profile_failures = statuses.iter().rev().copied().collect();
        self
    }

    /// Always fail trashing this id
    pub fn fail_trash_of(self, id: &str, status: u16) -> Self {
        self.lock().fatal_trash_ids.insert(id.to_string(), status);
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn list_requests(&self) -> Vec<ListRequest> {
        self.lock().list_requests.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.lock().list_requests.len()
    }

    /// Ids successfully trashed, in call order
    pub fn trashed(&self) -> Vec<String> {
        self.lock().trashed.clone()
    }

    pub fn trash_attempts(&self) -> usize {
        self.lock().trash_attempts
    }

    /// Id chunks successfully batch-deleted, in call order
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.lock().batches.clone()
    }

    pub fn delete_attempts(&self) -> usize {
        self.lock().delete_attempts
    }

    pub fn profile_attempts(&self) -> usize {
        self.lock().profile_attempts
    }

    pub fn mutation_calls(&self) -> usize {
        let state = self.lock();
        state.trash_attempts + state.delete_attempts
    }
}

#[async_trait]
impl MailClient for FakeMailbox {
    async fn list_messages(&self, request: &ListRequest) -> Result<MessagePage> {
        let mut state = self.lock();
        state.list_requests.push(request.clone());
        if let Some(status) = state.list_failures.pop() {
            return Err(CleanupError::remote(status, "scripted list failure"));
        }

        let all = self.results.get(&request.query).cloned().unwrap_or_default();
        let start = match &request.page_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| CleanupError::remote(400, "Invalid pageToken"))?,
            None => 0,
        };
        let end = (start + request.max_results as usize).min(all.len());
        let ids = all.get(start..end).map(<[String]>::to_vec).unwrap_or_default();
        let next_page_token = (end < all.len()).then(|| end.to_string());

        Ok(MessagePage { ids, next_page_token })
    }

    async fn trash_message(&self, _user_id: &str, message_id: &str) -> Result<()> {
        let mut state = self.lock();
        state.trash_attempts += 1;
        if let Some(status) = state.fatal_trash_ids.get(message_id).copied() {
            return Err(CleanupError::remote(status, "scripted trash failure"));
        }
        if let Some(status) = state.trash_failures.pop() {
            return Err(CleanupError::remote(status, "scripted trash failure"));
        }
        state.trashed.push(message_id.to_string());
        Ok(())
    }

    async fn batch_delete(&self, _user_id: &str, message_ids: &[String]) -> Result<()> {
        let mut state = self.lock();
        state.delete_attempts += 1;
        if let Some(status) = state.delete_failures.pop() {
            return Err(CleanupError::remote(status, "scripted delete failure"));
        }
        state.batches.push(message_ids.to_vec());
        Ok(())
    }

    async fn profile_email(&self, user_id: &str) -> Result<String> {
        let mut state = self.lock();
        state.profile_attempts += 1;
        if let Some(status) = state.profile_failures.pop() {
            return Err(CleanupError::remote(status, "scripted profile failure"));
        }
        Ok(if user_id == "me" { "me@example.com".to_string() } else { user_id.to_string() })
    }
}

// Mock implementation of MailClient for testing
mock! {
    pub MailClient {}

    #[async_trait::async_trait]
    impl MailClient for MailClient {
        async fn list_messages(&self, request: &ListRequest) -> Result<MessagePage>;
        async fn trash_message(&self, user_id: &str, message_id: &str) -> Result<()>;
        async fn batch_delete(&self, user_id: &str, message_ids: &[String]) -> Result<()>;
        async fn profile_email(&self, user_id: &str) -> Result<String>;
    }
}
