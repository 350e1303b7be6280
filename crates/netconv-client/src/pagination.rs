//! Draining paginated list endpoints.
//!
//! List endpoints take a 1-based `offset` and a `limit`. A page shorter than
//! the limit is the last one. Draining stops early once the policy's
//! `max_timeout` has elapsed and returns what it has.

use crate::Result;
use netconv_core::client::PaginationPolicy;
use std::future::Future;
use tokio::time::Instant;
use tracing::{debug, warn};

/// First offset of every list endpoint.
pub const FIRST_OFFSET: u32 = 1;

/// Fetch every page and concatenate the items.
///
/// `fetch` receives `(offset, limit)`.
///
/// # Errors
///
/// Returns the first error `fetch` returns.
pub async fn drain<T, F, Fut>(policy: PaginationPolicy, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let started = Instant::now();
    let limit = policy.page_size.max(1);
    let mut offset = FIRST_OFFSET;
    let mut items = Vec::new();

    loop {
        let page = fetch(offset, limit).await?;
        let len = page.len();
        debug!(offset, len, "fetched page");
        items.extend(page);

        if len < limit as usize {
            break;
        }
        if started.elapsed() >= policy.max_timeout {
            warn!(
                offset,
                collected = items.len(),
                "pagination time budget spent, returning partial list"
            );
            break;
        }
        offset = offset.saturating_add(u32::try_from(len).unwrap_or(u32::MAX));
    }

    Ok(items)
}

/// Fetch pages until `predicate` matches an item.
///
/// Returns `None` when the list is exhausted (or the time budget runs out)
/// without a match.
///
/// # Errors
///
/// Returns the first error `fetch` returns.
pub async fn find_first<T, F, Fut, P>(
    policy: PaginationPolicy,
    mut fetch: F,
    mut predicate: P,
) -> Result<Option<T>>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
    P: FnMut(&T) -> bool,
{
    let started = Instant::now();
    let limit = policy.page_size.max(1);
    let mut offset = FIRST_OFFSET;

    loop {
        let page = fetch(offset, limit).await?;
        let len = page.len();

        if let Some(found) = page.into_iter().find(|item| predicate(item)) {
            debug!(offset, "match found");
            return Ok(Some(found));
        }
        if len < limit as usize {
            return Ok(None);
        }
        if started.elapsed() >= policy.max_timeout {
            warn!(offset, "pagination time budget spent before a match");
            return Ok(None);
        }
        offset = offset.saturating_add(u32::try_from(len).unwrap_or(u32::MAX));
    }
}
