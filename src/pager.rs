//! Paged enumeration of message ids for one search query
//!
//! [`MessageIdPager`] holds the continuation-token state of a single
//! enumeration. Each [`next_batch`](MessageIdPager::next_batch) call issues one
//! list request (under the retry policy) and returns the ids it contributed,
//! truncated so the total never exceeds the cap. Once [`is_done`] is true the
//! pager stays exhausted; a new enumeration needs a new pager.
//!
//! [`is_done`]: MessageIdPager::is_done

use async_stream::try_stream;
use futures::stream::Stream;
use tracing::debug;

use crate::client::{ListRequest, MailClient, MAX_PAGE_SIZE};
use crate::error::Result;
use crate::retry::RetryPolicy;

/// Effective `maxResults` for a configured page size
pub fn effective_page_size(page_size: u32) -> u32 {
    page_size.min(MAX_PAGE_SIZE)
}

/// What to enumerate: query, spam/trash flag, page size, cap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagerOptions {
    pub user_id: String,
    pub query: String,
    pub include_spam_trash: bool,
    pub page_size: u32,
    pub max_total: usize,
}

pub struct MessageIdPager<'a, C: MailClient + ?Sized> {
    client: &'a C,
    policy: RetryPolicy,
    options: PagerOptions,
    page_token: Option<String>,
    yielded: usize,
    pages_fetched: usize,
    done: bool,
}

impl<'a, C: MailClient + ?Sized> MessageIdPager<'a, C> {
    pub fn new(client: &'a C, options: PagerOptions, policy: RetryPolicy) -> Self {
        let done = options.max_total == 0;
        Self {
            client,
            policy,
            options,
            page_token: None,
            yielded: 0,
            pages_fetched: 0,
            done,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Ids handed out so far
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Fetch the next page and return its ids, capped at the remaining budget
    ///
    /// Returns an empty vector once the pager is done. A page may also be
    /// legitimately empty while more pages follow. On error the pager is left
    /// done, so a failed enumeration cannot be resumed.
    pub async fn next_batch(&mut self) -> Result<Vec<String>> {
        if self.done {
            return Ok(Vec::new());
        }

        let request = ListRequest {
            user_id: self.options.user_id.clone(),
            query: self.options.query.clone(),
            include_spam_trash: self.options.include_spam_trash,
            max_results: effective_page_size(self.options.page_size),
            page_token: self.page_token.clone(),
        };

        let client = self.client;
        let page = match self
            .policy
            .run("list_messages", || client.list_messages(&request))
            .await
        {
            Ok(page) => page,
            Err(e) => {
                self.done = true;
                return Err(e);
            }
        };
        self.pages_fetched += 1;

        let remaining = self.options.max_total - self.yielded;
        let mut ids = page.ids;
        if ids.len() >= remaining {
            // Cap reached inside this page; the rest of it is discarded
            ids.truncate(remaining);
            self.done = true;
        }
        self.yielded += ids.len();

        match page.next_page_token {
            Some(token) if !self.done => self.page_token = Some(token),
            _ => self.done = true,
        }

        debug!(
            "Page {} for '{}': {} ids ({} total, done: {})",
            self.pages_fetched,
            self.options.query,
            ids.len(),
            self.yielded,
            self.done
        );

        Ok(ids)
    }

    /// Drain the pager into an ordered list
    pub async fn collect_all(mut self) -> Result<Vec<String>> {
        let mut all = Vec::new();
        while !self.is_done() {
            let batch = self.next_batch().await?;
            all.extend(batch);
        }
        Ok(all)
    }

    /// One-shot stream of individual ids
    pub fn into_stream(self) -> impl Stream<Item = Result<String>> + 'a
    where
        C: 'a,
    {
        let mut pager = self;
        try_stream! {
            while !pager.is_done() {
                for id in pager.next_batch().await? {
                    yield id;
                }
            }
        }
    }
}
