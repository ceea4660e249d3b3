//! Azure Resource Manager long-running operations.
//!
//! A mutating request (PUT, PATCH, POST, DELETE) may complete synchronously or
//! return a status URL to poll. [`begin`] sends the request, decides how the
//! operation is tracked, and returns an [`ArmPoller`] whose status check
//! follows that decision:
//!
//! - `Azure-AsyncOperation` header: poll the dedicated status endpoint, then
//!   fetch the final resource.
//! - `Location` header: poll the location until it stops answering `202`.
//! - Neither, for PUT, PATCH and DELETE: re-issue a GET on the resource
//!   itself and follow `properties.provisioningState`.
//! - Neither, for POST: the action completed with the initial response.
//!
//! Status URLs may point at another host; they are followed as given.
//!
//! # Example
//!
//! ```rust,no_run
//! # use azure_mgmt_core::client::ArmClient;
//! use azure_mgmt_core::transport::ArmRequest;
//! use azure_mgmt_resources::lro;
//! use std::time::Duration;
//!
//! # async fn example(client: &ArmClient) -> azure_mgmt_core::error::ArmResult<()> {
//! let request = ArmRequest::new(
//!     reqwest::Method::PUT,
//!     "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Compute/hostGroups/hg/hosts/host1?api-version=2021-03-01",
//! )
//! .with_body(serde_json::json!({"location": "westus", "sku": {"name": "DSv3-Type1"}}));
//!
//! let mut poller = lro::begin::<_, serde_json::Value>(client, request).await?;
//! let host = poller
//!     .poll_until_done(Duration::from_secs(5), Duration::from_secs(600))
//!     .await?;
//! println!("created {}", host["id"]);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use azure_mgmt_core::client::is_retriable_status;
use azure_mgmt_core::error::{ArmError, ArmResult};
use azure_mgmt_core::poller::{
    OperationHandle, OperationStatus, OperationToken, Poller, StatusReport,
};
use azure_mgmt_core::retry_after;
use azure_mgmt_core::transport::{ArmRequest, RawResponse, Transport};
use futures::future::{BoxFuture, FutureExt};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::models::{provisioning_state, AsyncOperationStatus};

/// Header naming a dedicated operation status endpoint.
pub const ASYNC_OPERATION_HEADER: &str = "azure-asyncoperation";

/// Header naming a location to poll, or the final result of a POST.
pub const LOCATION_HEADER: &str = "location";

/// How an operation's status is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollingMethod {
    /// Poll the `Azure-AsyncOperation` status endpoint.
    AsyncOperation,
    /// Poll the `Location` URL.
    Location,
    /// Re-issue a GET on the original resource URI.
    ResourceUri,
}

/// Everything a status check needs besides the token.
#[derive(Debug, Clone)]
pub struct LroContext {
    pub method: PollingMethod,
    /// Method of the initial request.
    pub request_method: Method,
    /// Path of the initial request.
    pub resource_path: String,
    /// `Location` returned alongside `Azure-AsyncOperation`, if any.
    pub final_location: Option<String>,
}

/// Boxed status-check collaborator used by [`ArmPoller`].
pub type StatusCheck<T> =
    Box<dyn FnMut(OperationToken) -> BoxFuture<'static, ArmResult<StatusReport<T>>> + Send>;

/// Poller bound to an Azure Resource Manager operation.
pub type ArmPoller<T> = Poller<T, StatusCheck<T>>;

/// Validate a service-issued URL and return it unchanged.
///
/// Accepts an endpoint-relative path or an absolute URL. Scheme and host are
/// kept so that regional status endpoints are polled where the service put
/// them.
pub fn operation_url(url: &str) -> ArmResult<String> {
    if !url.starts_with('/') {
        url::Url::parse(url).map_err(|e| {
            ArmError::invalid_endpoint_with_source("failed to parse operation URL", e)
        })?;
    }
    Ok(url.to_string())
}

/// Methods whose target can be re-read to observe progress.
fn tracks_resource(method: &Method) -> bool {
    matches!(*method, Method::PUT | Method::PATCH | Method::DELETE)
}

/// Send the initial request of a long-running operation and bind a poller.
///
/// A synchronous completion yields a poller that is already done.
///
/// # Errors
///
/// - Transport and service errors from the initial request.
/// - [`ArmError::OperationFailed`] if the response already reports a failed
///   provisioning state, [`ArmError::OperationCanceled`] for a canceled one.
///
/// # Tracing
///
/// Emits a span named `arm::lro::begin` with fields `method` and `path`.
#[tracing::instrument(
    name = "arm::lro::begin",
    skip(client, request),
    fields(method = %request.method, path = %request.path)
)]
pub async fn begin<C, T>(client: &C, request: ArmRequest) -> ArmResult<ArmPoller<T>>
where
    C: Transport + Clone + 'static,
    T: DeserializeOwned + Send + 'static,
{
    let request_method = request.method.clone();
    let resource_path = request.path.clone();

    let response = client.execute(request).await?.error_for_status()?;

    let async_operation = response
        .header(ASYNC_OPERATION_HEADER)
        .map(operation_url)
        .transpose()?;
    let location = response
        .header(LOCATION_HEADER)
        .map(operation_url)
        .transpose()?;

    let (method, token, final_location) = match (async_operation, location) {
        (Some(status_url), location) => (PollingMethod::AsyncOperation, status_url, location),
        (None, Some(location)) => (PollingMethod::Location, location, None),
        (None, None) => (PollingMethod::ResourceUri, resource_path.clone(), None),
    };

    let body: Value = response.json_or_null()?;
    let status = initial_status(response.status, method, &request_method, &body);
    tracing::debug!(?method, %status, "operation started");

    match status {
        OperationStatus::Failed => {
            return Err(ArmError::OperationFailed {
                reason: format!("provisioning state of {resource_path} is Failed"),
            })
        }
        OperationStatus::Canceled => return Err(ArmError::OperationCanceled),
        _ => {}
    }

    let mut handle = OperationHandle::new(token, status)
        .with_retry_after(retry_after::from_headers(&response.headers));
    if status == OperationStatus::Succeeded {
        handle = handle.with_payload(serde_json::from_value(body)?);
    }

    let context = Arc::new(LroContext {
        method,
        request_method,
        resource_path,
        final_location,
    });
    let client = client.clone();
    let check: StatusCheck<T> = Box::new(move |token: OperationToken| {
        let client = client.clone();
        let context = Arc::clone(&context);
        async move { check_status(&client, &context, &token).await }.boxed()
    });

    Poller::new(handle, check)
}

fn initial_status(
    http_status: u16,
    method: PollingMethod,
    request_method: &Method,
    body: &Value,
) -> OperationStatus {
    if method == PollingMethod::ResourceUri && !tracks_resource(request_method) {
        return OperationStatus::Succeeded;
    }
    if http_status == 202 {
        return OperationStatus::Running;
    }
    match provisioning_state(body) {
        Some(state) => OperationStatus::from_service_status(state),
        None if method == PollingMethod::ResourceUri => OperationStatus::Succeeded,
        None => OperationStatus::Running,
    }
}

/// Perform one status round trip for `token`.
///
/// # Errors
///
/// Transport errors, and service errors that don't describe the operation
/// itself (throttling, server errors on the status endpoint). The poller
/// treats both as retryable.
///
/// # Tracing
///
/// Emits a span named `arm::lro::check_status` with field `token`.
#[tracing::instrument(
    name = "arm::lro::check_status",
    skip(client, context),
    fields(token = %token, method = ?context.method)
)]
pub async fn check_status<C, T>(
    client: &C,
    context: &LroContext,
    token: &OperationToken,
) -> ArmResult<StatusReport<T>>
where
    C: Transport,
    T: DeserializeOwned,
{
    let response = client.execute(ArmRequest::get(token.as_str())).await?;
    let retry_after = retry_after::from_headers(&response.headers);

    let report = match context.method {
        PollingMethod::AsyncOperation => check_async_operation(client, context, response).await?,
        PollingMethod::Location => check_location(response)?,
        PollingMethod::ResourceUri => check_resource(context, response)?,
    };

    tracing::trace!(status = ?report.status, "status checked");
    Ok(report.with_retry_after(retry_after))
}

async fn check_async_operation<C, T>(
    client: &C,
    context: &LroContext,
    response: RawResponse,
) -> ArmResult<StatusReport<T>>
where
    C: Transport,
    T: DeserializeOwned,
{
    let body: AsyncOperationStatus = response.error_for_status()?.json()?;
    let status = body
        .status
        .as_deref()
        .map(OperationStatus::from_service_status);

    Ok(match status {
        Some(OperationStatus::Failed) => StatusReport::failed(
            body.error
                .map(|e| e.describe())
                .unwrap_or_else(|| "operation failed without error details".into()),
        ),
        Some(OperationStatus::Canceled) => StatusReport::canceled(),
        Some(OperationStatus::Succeeded) | None => {
            let payload = final_resource(client, context).await?;
            StatusReport {
                status,
                payload: Some(payload),
                failure_reason: None,
                retry_after: None,
            }
        }
        Some(status) => StatusReport::new(status),
    })
}

/// Fetch the result of a completed asynchronous operation.
async fn final_resource<C, T>(client: &C, context: &LroContext) -> ArmResult<T>
where
    C: Transport,
    T: DeserializeOwned,
{
    let path = match context.request_method {
        Method::DELETE => None,
        Method::POST => context.final_location.as_deref(),
        _ => Some(context.resource_path.as_str()),
    };

    match path {
        Some(path) => client
            .execute(ArmRequest::get(path))
            .await?
            .error_for_status()?
            .json_or_null(),
        None => Ok(serde_json::from_value(Value::Null)?),
    }
}

fn check_location<T: DeserializeOwned>(response: RawResponse) -> ArmResult<StatusReport<T>> {
    match response.status {
        202 => Ok(StatusReport::running()),
        200 | 201 | 204 => Ok(StatusReport::succeeded(response.json_or_null()?)),
        status if is_retriable_status(status) => Err(unexpected(response)),
        _ => Ok(StatusReport::failed(unexpected(response).to_string())),
    }
}

fn check_resource<T: DeserializeOwned>(
    context: &LroContext,
    response: RawResponse,
) -> ArmResult<StatusReport<T>> {
    if context.request_method == Method::DELETE {
        return match response.status {
            404 => Ok(StatusReport::succeeded(serde_json::from_value(Value::Null)?)),
            200..=299 => Ok(StatusReport::running()),
            _ => Err(unexpected(response)),
        };
    }

    let response = response.error_for_status()?;
    let body: Value = response.json_or_null()?;

    Ok(match provisioning_state(&body).map(OperationStatus::from_service_status) {
        None => StatusReport::without_status().with_payload(serde_json::from_value(body)?),
        Some(OperationStatus::Succeeded) => StatusReport::succeeded(serde_json::from_value(body)?),
        Some(OperationStatus::Failed) => StatusReport::failed(format!(
            "provisioning state of {} is Failed",
            context.resource_path
        )),
        Some(status) => StatusReport::new(status),
    })
}

/// Error for a response the current polling method did not expect.
fn unexpected(response: RawResponse) -> ArmError {
    let status = response.status;
    match response.error_for_status() {
        Err(e) => e,
        Ok(_) => ArmError::http(status, "unexpected status while polling"),
    }
}
