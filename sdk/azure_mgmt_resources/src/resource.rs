//! Generic resource operations.
//!
//! Paths are resource ids as produced by
//! [`ResourceId`](crate::resource_id::ResourceId). A path without an
//! `api-version` query parameter uses the client's default.
//!
//! # Example
//!
//! ```rust,no_run
//! # use azure_mgmt_core::client::ArmClient;
//! use azure_mgmt_resources::resource;
//! use azure_mgmt_resources::resource_id::ResourceId;
//! use std::time::Duration;
//!
//! # async fn example(client: &ArmClient) -> azure_mgmt_core::error::ArmResult<()> {
//! let group = ResourceId::subscription(client.subscription_id()?).resource_group("rg-demo");
//! let path = group.to_string();
//!
//! let mut poller = resource::begin_create_or_update::<_, _, serde_json::Value>(
//!     client,
//!     &path,
//!     &serde_json::json!({"location": "westus"}),
//! )
//! .await?;
//! let created = poller
//!     .poll_until_done(Duration::from_secs(2), Duration::from_secs(300))
//!     .await?;
//! println!("created {}", created["id"]);
//!
//! let mut poller = resource::begin_delete(client, &path).await?;
//! poller
//!     .poll_until_done(Duration::from_secs(5), Duration::from_secs(1800))
//!     .await?;
//! # Ok(())
//! # }
//! ```

use azure_mgmt_core::error::ArmResult;
use azure_mgmt_core::transport::{ArmRequest, Transport};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::lro::{self, ArmPoller};
use crate::paging::{list_pager, ArmPager};

/// Get a resource.
///
/// # Tracing
///
/// Emits a span named `arm::resources::get` with field `path`.
#[tracing::instrument(name = "arm::resources::get", skip(client))]
pub async fn get<C, T>(client: &C, path: &str) -> ArmResult<T>
where
    C: Transport,
    T: DeserializeOwned,
{
    tracing::debug!("getting resource");

    let response = client
        .execute(ArmRequest::get(path))
        .await?
        .error_for_status()?;
    let resource = response.json()?;

    tracing::debug!("resource fetched");
    Ok(resource)
}

/// Create or replace a resource (PUT).
///
/// # Tracing
///
/// Emits a span named `arm::resources::begin_create_or_update` with field `path`.
#[tracing::instrument(name = "arm::resources::begin_create_or_update", skip(client, body))]
pub async fn begin_create_or_update<C, B, T>(
    client: &C,
    path: &str,
    body: &B,
) -> ArmResult<ArmPoller<T>>
where
    C: Transport + Clone + 'static,
    B: Serialize + ?Sized,
    T: DeserializeOwned + Send + 'static,
{
    let request = ArmRequest::new(Method::PUT, path).with_json(body)?;
    lro::begin(client, request).await
}

/// Update selected properties of a resource (PATCH).
///
/// # Tracing
///
/// Emits a span named `arm::resources::begin_update` with field `path`.
#[tracing::instrument(name = "arm::resources::begin_update", skip(client, body))]
pub async fn begin_update<C, B, T>(client: &C, path: &str, body: &B) -> ArmResult<ArmPoller<T>>
where
    C: Transport + Clone + 'static,
    B: Serialize + ?Sized,
    T: DeserializeOwned + Send + 'static,
{
    let request = ArmRequest::new(Method::PATCH, path).with_json(body)?;
    lro::begin(client, request).await
}

/// Delete a resource. The poller's payload is `null` on completion.
///
/// # Tracing
///
/// Emits a span named `arm::resources::begin_delete` with field `path`.
#[tracing::instrument(name = "arm::resources::begin_delete", skip(client))]
pub async fn begin_delete<C>(client: &C, path: &str) -> ArmResult<ArmPoller<Value>>
where
    C: Transport + Clone + 'static,
{
    lro::begin(client, ArmRequest::delete(path)).await
}

/// Invoke a resource action (POST), such as `restart` or `listKeys`.
///
/// # Tracing
///
/// Emits a span named `arm::resources::begin_action` with field `path`.
#[tracing::instrument(name = "arm::resources::begin_action", skip(client, body))]
pub async fn begin_action<C, T>(
    client: &C,
    path: &str,
    body: Option<Value>,
) -> ArmResult<ArmPoller<T>>
where
    C: Transport + Clone + 'static,
    T: DeserializeOwned + Send + 'static,
{
    let mut request = ArmRequest::new(Method::POST, path);
    if let Some(body) = body {
        request = request.with_body(body);
    }
    lro::begin(client, request).await
}

/// List resources under a collection path, one page per round trip.
pub fn list<C, T>(client: &C, path: &str) -> ArmPager<T>
where
    C: Transport + Clone + 'static,
    T: DeserializeOwned + Send + 'static,
{
    tracing::debug!(path, "creating list pager");
    list_pager(client, path)
}
