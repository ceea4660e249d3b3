//! Forward-only pager over continuation-token paged results.
//!
//! A [`Pager`] is seeded with a page-fetch collaborator
//! `FnMut(Option<ContinuationToken>) -> Future<Output = ArmResult<Page<T>>>`
//! and advances one round trip per [`Pager::next_page`]. It has no transport
//! dependency of its own.
//!
//! # Example
//!
//! ```rust
//! use azure_mgmt_core::pager::{ContinuationToken, Page, Pager};
//!
//! # async fn example() -> azure_mgmt_core::error::ArmResult<()> {
//! let mut pager = Pager::new(|token: Option<ContinuationToken>| async move {
//!     Ok(match token {
//!         None => Page::new(vec!["a", "b"], Some("tok1".into())),
//!         Some(_) => Page::new(vec!["c"], None),
//!     })
//! });
//!
//! let mut items = Vec::new();
//! while pager.more() {
//!     items.extend(pager.next_page().await?.into_items());
//! }
//! assert_eq!(items, ["a", "b", "c"]);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::stream::{self, Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::error::{ArmError, ArmResult};

/// Opaque, server-issued marker for the next page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContinuationToken(Arc<str>);

impl ContinuationToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ContinuationToken {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

impl From<&str> for ContinuationToken {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Marker for the next page; `None` on the last page.
    pub continuation: Option<ContinuationToken>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, continuation: Option<ContinuationToken>) -> Self {
        Self {
            items,
            continuation,
        }
    }

    /// Returns `true` if no page follows this one.
    pub fn is_last(&self) -> bool {
        self.continuation.is_none()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

/// Lazy, forward-only iteration over pages.
///
/// Restarting requires a new pager, optionally resumed from a saved
/// [`ContinuationToken`] with [`Pager::with_continuation`].
pub struct Pager<T, F> {
    continuation: Option<ContinuationToken>,
    more: bool,
    fetch_page: F,
    _items: std::marker::PhantomData<fn() -> T>,
}

impl<T, F> fmt::Debug for Pager<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pager")
            .field("continuation", &self.continuation)
            .field("more", &self.more)
            .finish()
    }
}

impl<T, F, Fut> Pager<T, F>
where
    F: FnMut(Option<ContinuationToken>) -> Fut,
    Fut: Future<Output = ArmResult<Page<T>>>,
{
    /// A pager starting at the first page.
    pub fn new(fetch_page: F) -> Self {
        Self {
            continuation: None,
            more: true,
            fetch_page,
            _items: std::marker::PhantomData,
        }
    }

    /// A pager resuming from a previously saved continuation token.
    pub fn with_continuation(token: ContinuationToken, fetch_page: F) -> Self {
        Self {
            continuation: Some(token),
            more: true,
            fetch_page,
            _items: std::marker::PhantomData,
        }
    }

    /// Returns `true` if another page can be fetched.
    pub fn more(&self) -> bool {
        self.more
    }

    /// Token that the next fetch will send, if any.
    pub fn continuation_token(&self) -> Option<&ContinuationToken> {
        self.continuation.as_ref()
    }

    /// Fetch the next page.
    ///
    /// # Errors
    ///
    /// - [`ArmError::ExhaustedPager`] if [`Pager::more`] is `false`.
    /// - Errors from the fetch collaborator. The pager is left unchanged so
    ///   the call can be retried.
    pub async fn next_page(&mut self) -> ArmResult<Page<T>> {
        if !self.more {
            return Err(ArmError::ExhaustedPager);
        }

        let page = (self.fetch_page)(self.continuation.clone()).await?;

        tracing::debug!(
            items = page.items.len(),
            last = page.is_last(),
            "fetched page"
        );

        self.more = page.continuation.is_some();
        self.continuation = page.continuation.clone();
        Ok(page)
    }

    /// Like [`Pager::next_page`], failing with [`ArmError::Canceled`] without
    /// issuing a request when `cancel` has fired.
    pub async fn next_page_with_cancellation(
        &mut self,
        cancel: &CancellationToken,
    ) -> ArmResult<Page<T>> {
        if cancel.is_cancelled() {
            return Err(ArmError::Canceled);
        }
        self.next_page().await
    }

    /// Convert into a stream of pages.
    ///
    /// The stream ends after the last page, or after yielding the first error.
    pub fn into_stream(self) -> impl Stream<Item = ArmResult<Page<T>>> {
        stream::unfold(Some(self), |state| async move {
            let mut pager = state?;
            if !pager.more() {
                return None;
            }
            match pager.next_page().await {
                Ok(page) => Some((Ok(page), Some(pager))),
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    /// Convert into a stream of individual items.
    pub fn into_items(self) -> impl Stream<Item = ArmResult<T>> {
        self.into_stream().flat_map(|page| {
            let items: Vec<ArmResult<T>> = match page {
                Ok(page) => page.items.into_iter().map(Ok).collect(),
                Err(e) => vec![Err(e)],
            };
            stream::iter(items)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::{ready, Ready};
    use futures::TryStreamExt;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    type Fetched = ArmResult<Page<&'static str>>;

    /// A fetch collaborator that replays `pages` and records the tokens it receives.
    fn scripted(
        pages: Vec<Fetched>,
    ) -> (
        impl FnMut(Option<ContinuationToken>) -> Ready<Fetched>,
        Arc<Mutex<Vec<Option<ContinuationToken>>>>,
    ) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let mut queue: VecDeque<Fetched> = pages.into();
        let fetch = move |token: Option<ContinuationToken>| {
            recorder.lock().unwrap().push(token);
            ready(
                queue
                    .pop_front()
                    .unwrap_or_else(|| Err(ArmError::Transport("no more scripted pages".into()))),
            )
        };
        (fetch, seen)
    }

    fn page(items: &[&'static str], token: Option<&str>) -> Fetched {
        Ok(Page::new(items.to_vec(), token.map(ContinuationToken::from)))
    }

    #[tokio::test]
    async fn two_page_scenario() {
        let (fetch, seen) = scripted(vec![page(&["a", "b"], Some("tok1")), page(&["c"], None)]);
        let mut pager = Pager::new(fetch);

        assert!(pager.more());
        assert_eq!(pager.next_page().await.unwrap().items, ["a", "b"]);
        assert!(pager.more());
        assert_eq!(pager.continuation_token().unwrap().as_str(), "tok1");

        assert_eq!(pager.next_page().await.unwrap().items, ["c"]);
        assert!(!pager.more());
        assert!(pager.continuation_token().is_none());

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![None, Some(ContinuationToken::from("tok1"))]);
    }

    #[tokio::test]
    async fn n_pages_then_exhausted() {
        for n in 1..5usize {
            let pages = (0..n)
                .map(|i| {
                    let token = (i + 1 < n).then(|| format!("tok{i}"));
                    Ok(Page::new(vec!["x"], token.map(ContinuationToken::from)))
                })
                .collect();
            let (fetch, seen) = scripted(pages);
            let mut pager = Pager::new(fetch);

            for i in 0..n {
                assert!(pager.more(), "more() should be true before page {i}");
                pager.next_page().await.expect("page should succeed");
            }
            assert!(!pager.more());

            let err = pager.next_page().await.unwrap_err();
            assert!(matches!(err, ArmError::ExhaustedPager), "{err:?}");
            assert_eq!(seen.lock().unwrap().len(), n);
        }
    }

    #[tokio::test]
    async fn transport_error_leaves_state_unchanged() {
        let (fetch, seen) = scripted(vec![
            page(&["a"], Some("tok1")),
            Err(ArmError::Transport("connection reset".into())),
            page(&["b"], None),
        ]);
        let mut pager = Pager::new(fetch);

        pager.next_page().await.unwrap();
        let err = pager.next_page().await.unwrap_err();
        assert!(err.is_transport());
        assert!(pager.more());
        assert_eq!(pager.continuation_token().unwrap().as_str(), "tok1");

        assert_eq!(pager.next_page().await.unwrap().items, ["b"]);
        assert!(!pager.more());

        let seen = seen.lock().unwrap();
        assert_eq!(seen[1], seen[2], "retry should resend the same token");
    }

    #[tokio::test]
    async fn empty_last_page() {
        let (fetch, _) = scripted(vec![page(&[], None)]);
        let mut pager = Pager::new(fetch);

        let first = pager.next_page().await.unwrap();
        assert!(first.items.is_empty());
        assert!(first.is_last());
        assert!(!pager.more());
    }

    #[tokio::test]
    async fn cancellation_issues_no_request() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut pager = Pager::new(move |_token: Option<ContinuationToken>| {
            counter.fetch_add(1, Ordering::SeqCst);
            ready(Ok(Page::new(vec![1], None)))
        });
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = pager.next_page_with_cancellation(&cancel).await.unwrap_err();
        assert!(matches!(err, ArmError::Canceled), "{err:?}");
        assert!(pager.more());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let page = pager
            .next_page_with_cancellation(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(page.items, [1]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resumes_from_saved_token() {
        let (fetch, seen) = scripted(vec![page(&["c"], None)]);
        let mut pager = Pager::with_continuation("tok1".into(), fetch);

        assert_eq!(pager.next_page().await.unwrap().items, ["c"]);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Some(ContinuationToken::from("tok1"))]
        );
    }

    #[tokio::test]
    async fn stream_yields_all_items() {
        let (fetch, _) = scripted(vec![
            page(&["a", "b"], Some("tok1")),
            page(&[], Some("tok2")),
            page(&["c"], None),
        ]);

        let items: Vec<&str> = Pager::new(fetch).into_items().try_collect().await.unwrap();
        assert_eq!(items, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn stream_ends_after_first_error() {
        let (fetch, seen) = scripted(vec![
            page(&["a"], Some("tok1")),
            Err(ArmError::Transport("boom".into())),
            page(&["never"], None),
        ]);

        let results: Vec<_> = Pager::new(fetch).into_stream().collect().await;
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert_eq!(seen.lock().unwrap().len(), 2);
    }
}
