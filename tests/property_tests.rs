//! Property tests for enumeration caps, page sizing and delete chunking

mod common;

use common::{message_ids, FakeMailbox};
use gmail_cleaner::apply::delete_batches;
use gmail_cleaner::pager::{effective_page_size, MessageIdPager, PagerOptions};
use gmail_cleaner::retry::RetryPolicy;
use proptest::prelude::*;

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

fn options(page_size: u32, max_total: usize) -> PagerOptions {
    PagerOptions {
        user_id: "me".to_string(),
        query: "q".to_string(),
        include_spam_trash: false,
        page_size,
        max_total,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_enumeration_yields_min_of_matches_and_cap(
        matches in 0usize..1500,
        cap in 0usize..2000,
        page_size in 1u32..800,
    ) {
        let ids = message_ids("m", matches);
        let mailbox = FakeMailbox::new().with_query("q", ids.clone());

        let collected = block_on(
            MessageIdPager::new(&mailbox, options(page_size, cap), RetryPolicy::immediate()).collect_all(),
        )
        .unwrap();

        let expected = matches.min(cap);
        prop_assert_eq!(collected.len(), expected);
        prop_assert_eq!(&collected[..], &ids[..expected]);

        // Every request asks for the clamped page size, and no extra page follows the cap
        let requests = mailbox.list_requests();
        prop_assert!(requests.iter().all(|r| r.max_results == page_size.min(500)));
        let per_page = page_size.min(500) as usize;
        let needed = if expected == 0 { usize::from(cap > 0) } else { (expected + per_page - 1) / per_page };
        prop_assert_eq!(requests.len(), needed);
    }

    #[test]
    fn prop_effective_page_size_is_clamped(page_size in any::<u32>()) {
        let effective = effective_page_size(page_size);
        prop_assert!(effective <= 500);
        prop_assert_eq!(effective, page_size.min(500));
    }

    #[test]
    fn prop_delete_chunks_partition_the_list(len in 0usize..3000) {
        let ids = message_ids("d", len);
        let chunks: Vec<&[String]> = delete_batches(&ids).collect();

        prop_assert_eq!(chunks.len(), (len + 499) / 500);
        prop_assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= 500));
        prop_assert_eq!(chunks.concat(), ids);
    }
}

#[test]
fn test_stream_matches_collect_all() {
    use futures::TryStreamExt;

    let mailbox = FakeMailbox::new().with_query("q", message_ids("m", 42));
    let streamed: Vec<String> = block_on(
        MessageIdPager::new(&mailbox, options(10, 35), RetryPolicy::immediate())
            .into_stream()
            .try_collect(),
    )
    .unwrap();

    assert_eq!(streamed, message_ids("m", 35));
    assert_eq!(mailbox.list_calls(), 4);
}
