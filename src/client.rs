//! Gmail API client: the three remote operations the cleanup pipeline needs

use async_trait::async_trait;
use google_gmail1::api::BatchDeleteMessagesRequest;
use tracing::debug;

use crate::auth::GmailHub;
use crate::error::{CleanupError, Result};
use crate::retry::{with_retry, RetryPolicy};

/// Hard limit of the list endpoint's `maxResults`
pub const MAX_PAGE_SIZE: u32 = 500;

/// Hard limit of ids accepted by one batch delete call
pub const MAX_BATCH_DELETE: usize = 500;

/// Parameters of a single `users.messages.list` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub user_id: String,
    pub query: String,
    pub include_spam_trash: bool,
    pub max_results: u32,
    pub page_token: Option<String>,
}

/// One page of message ids plus the continuation token, if any
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagePage {
    pub ids: Vec<String>,
    pub next_page_token: Option<String>,
}

/// Remote mailbox operations, one round trip each, no retry
#[async_trait]
pub trait MailClient: Send + Sync {
    /// List one page of message ids matching a query
    async fn list_messages(&self, request: &ListRequest) -> Result<MessagePage>;

    /// Move a single message to trash
    async fn trash_message(&self, user_id: &str, message_id: &str) -> Result<()>;

    /// Permanently delete up to 500 messages
    async fn batch_delete(&self, user_id: &str, message_ids: &[String]) -> Result<()>;

    /// Email address of the mailbox behind `user_id`
    async fn profile_email(&self, user_id: &str) -> Result<String>;
}

/// Check that the service answers before any rule runs
///
/// The profile lookup is retried like every other remote call; the mailbox
/// address is returned on success.
pub async fn connect_client<C: MailClient + ?Sized>(
    client: &C,
    user_id: &str,
    policy: &RetryPolicy,
) -> Result<String> {
    let email = with_retry(policy, "get_profile", || client.profile_email(user_id)).await?;
    debug!("Connected to mailbox {}", email);
    Ok(email)
}

/// Production client backed by the google-gmail1 hub
pub struct GmailMailClient {
    hub: GmailHub,
    scope: String,
}

impl GmailMailClient {
    /// Wrap a hub; every call is issued under `scope`
    pub fn new(hub: GmailHub, scope: impl Into<String>) -> Self {
        Self {
            hub,
            scope: scope.into(),
        }
    }

    /// Wrap a hub and verify the service answers, retrying transient failures
    ///
    /// Returns the client together with the mailbox address.
    pub async fn connect(
        hub: GmailHub,
        scope: impl Into<String>,
        user_id: &str,
        policy: &RetryPolicy,
    ) -> Result<(Self, String)> {
        let client = Self::new(hub, scope);
        let email = connect_client(&client, user_id, policy).await?;
        Ok((client, email))
    }
}

#[async_trait]
impl MailClient for GmailMailClient {
    async fn list_messages(&self, request: &ListRequest) -> Result<MessagePage> {
        let mut call = self
            .hub
            .users()
            .messages_list(&request.user_id)
            .q(&request.query)
            .include_spam_trash(request.include_spam_trash)
            .max_results(request.max_results.min(MAX_PAGE_SIZE));

        if let Some(token) = request.page_token.as_deref() {
            call = call.page_token(token);
        }

        let (_, response) = call.add_scope(&self.scope).doit().await?;

        let ids: Vec<String> = response
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|msg_ref| msg_ref.id)
            .collect();

        debug!(
            "Listed {} message ids for '{}' (more pages: {})",
            ids.len(),
            request.query,
            response.next_page_token.is_some()
        );

        Ok(MessagePage {
            ids,
            next_page_token: response.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    async fn trash_message(&self, user_id: &str, message_id: &str) -> Result<()> {
        self.hub
            .users()
            .messages_trash(user_id, message_id)
            .add_scope(&self.scope)
            .doit()
            .await?;

        Ok(())
    }

    async fn batch_delete(&self, user_id: &str, message_ids: &[String]) -> Result<()> {
        if message_ids.len() > MAX_BATCH_DELETE {
            return Err(CleanupError::InvalidState(format!(
                "batch delete accepts at most {} ids, got {}",
                MAX_BATCH_DELETE,
                message_ids.len()
            )));
        }

        let request = BatchDeleteMessagesRequest {
            ids: Some(message_ids.to_vec()),
        };

        self.hub
            .users()
            .messages_batch_delete(request, user_id)
            .add_scope(&self.scope)
            .doit()
            .await?;

        Ok(())
    }

    async fn profile_email(&self, user_id: &str) -> Result<String> {
        let (_, profile) = self
            .hub
            .users()
            .get_profile(user_id)
            .add_scope(&self.scope)
            .doit()
            .await?;

        profile
            .email_address
            .ok_or_else(|| CleanupError::InvalidResponse("Profile has no email address".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_limits() {
        assert_eq!(MAX_PAGE_SIZE, 500);
        assert_eq!(MAX_BATCH_DELETE, 500);
    }

    #[test]
    fn test_message_page_default_is_last_page() {
        let page = MessagePage::default();
        assert!(page.ids.is_empty());
        assert!(page.next_page_token.is_none());
    }
}
