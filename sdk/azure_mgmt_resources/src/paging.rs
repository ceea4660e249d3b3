//! `nextLink` paging for Azure Resource Manager list operations.
//!
//! List responses have the shape `{"value": [...], "nextLink": "..."}`. The
//! `nextLink` URL is used verbatim as the continuation token; a missing or
//! empty `nextLink` marks the last page.

use azure_mgmt_core::error::ArmResult;
use azure_mgmt_core::pager::{ContinuationToken, Page, Pager};
use azure_mgmt_core::transport::{ArmRequest, Transport};
use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;

use crate::lro::operation_url;
use crate::models::ResourceList;

/// Boxed page-fetch collaborator used by [`ArmPager`].
pub type PageFetch<T> =
    Box<dyn FnMut(Option<ContinuationToken>) -> BoxFuture<'static, ArmResult<Page<T>>> + Send>;

/// Pager over an Azure Resource Manager list operation.
pub type ArmPager<T> = Pager<T, PageFetch<T>>;

/// Create a pager starting at `path`.
///
/// No request is made until the first [`Pager::next_page`].
pub fn list_pager<C, T>(client: &C, path: impl Into<String>) -> ArmPager<T>
where
    C: Transport + Clone + 'static,
    T: DeserializeOwned + Send + 'static,
{
    let client = client.clone();
    let first_page = path.into();

    let fetch: PageFetch<T> = Box::new(move |token: Option<ContinuationToken>| {
        let client = client.clone();
        let path = match token {
            Some(token) => token.as_str().to_string(),
            None => first_page.clone(),
        };
        async move { fetch_page(&client, &path).await }.boxed()
    });

    Pager::new(fetch)
}

/// Fetch one page from `path`, which may be an absolute `nextLink`.
///
/// # Tracing
///
/// Emits a span named `arm::paging::fetch_page` with field `path`.
#[tracing::instrument(name = "arm::paging::fetch_page", skip(client))]
pub async fn fetch_page<C, T>(client: &C, path: &str) -> ArmResult<Page<T>>
where
    C: Transport,
    T: DeserializeOwned,
{
    let response = client
        .execute(ArmRequest::get(operation_url(path)?))
        .await?
        .error_for_status()?;
    let list: ResourceList<T> = response.json()?;

    let continuation = list
        .next_link
        .filter(|link| !link.is_empty())
        .map(ContinuationToken::from);

    tracing::debug!(count = list.value.len(), more = continuation.is_some(), "page fetched");
    Ok(Page::new(list.value, continuation))
}
