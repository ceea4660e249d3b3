//! Long-running operation poller.
//!
//! A [`Poller`] is bound to an [`OperationHandle`] returned by a mutating call
//! and to a status-check collaborator that performs one round trip per
//! [`Poller::poll`]. The poller owns the status state machine; the
//! collaborator owns the wire protocol.
//!
//! # Example
//!
//! ```rust
//! use azure_mgmt_core::poller::{
//!     OperationHandle, OperationStatus, OperationToken, Poller, StatusReport,
//! };
//! use std::time::Duration;
//!
//! # async fn example() -> azure_mgmt_core::error::ArmResult<()> {
//! let handle = OperationHandle::new("op-1", OperationStatus::Running);
//! let mut poller = Poller::new(handle, |_token: OperationToken| async {
//!     Ok(StatusReport::succeeded(serde_json::json!({"id": "host1"})))
//! })?;
//!
//! let host = poller
//!     .poll_until_done(Duration::from_secs(1), Duration::from_secs(10))
//!     .await?;
//! assert_eq!(host["id"], "host1");
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{ArmError, ArmResult};

/// Opaque, server-issued identifier of an in-flight operation.
///
/// The poller never parses or interprets the value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationToken(Arc<str>);

impl OperationToken {
    /// The raw token value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for OperationToken {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

impl From<&str> for OperationToken {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

/// Status of a long-running operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationStatus {
    /// Accepted but not yet started.
    NotStarted,
    /// In progress.
    Running,
    /// Completed successfully.
    Succeeded,
    /// Completed with a failure.
    Failed,
    /// Canceled before completion.
    Canceled,
}

impl OperationStatus {
    /// Returns `true` for `Succeeded`, `Failed` and `Canceled`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    /// Map a service-reported status string.
    ///
    /// Matching is case-insensitive. Anything that is not a recognized
    /// terminal or not-started value (`InProgress`, `Accepted`, `Creating`,
    /// `Updating`, `Deleting`, ...) counts as running.
    pub fn from_service_status(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            "canceled" | "cancelled" => Self::Canceled,
            "notstarted" => Self::NotStarted,
            _ => Self::Running,
        }
    }

    fn rank(self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::Running => 1,
            Self::Succeeded | Self::Failed | Self::Canceled => 2,
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotStarted => "NotStarted",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Canceled => "Canceled",
        };
        f.write_str(s)
    }
}

/// The state a mutating call hands to a [`Poller`].
#[derive(Debug, Clone)]
pub struct OperationHandle<T> {
    pub token: OperationToken,
    pub status: OperationStatus,
    pub payload: Option<T>,
    pub retry_after: Option<Duration>,
}

impl<T> OperationHandle<T> {
    /// A handle without payload or retry-after hint.
    pub fn new(token: impl Into<OperationToken>, status: OperationStatus) -> Self {
        Self {
            token: token.into(),
            status,
            payload: None,
            retry_after: None,
        }
    }

    /// Attach the resource state returned so far.
    pub fn with_payload(mut self, payload: T) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Attach a server-suggested polling delay.
    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }
}

/// Outcome of one status round trip, produced by the status-check collaborator.
#[derive(Debug, Clone)]
pub struct StatusReport<T> {
    /// Reported status. `None` means the response carried no status field.
    pub status: Option<OperationStatus>,
    pub payload: Option<T>,
    pub failure_reason: Option<String>,
    pub retry_after: Option<Duration>,
}

impl<T> StatusReport<T> {
    pub fn new(status: OperationStatus) -> Self {
        Self {
            status: Some(status),
            payload: None,
            failure_reason: None,
            retry_after: None,
        }
    }

    /// A response that carried no status field.
    pub fn without_status() -> Self {
        Self {
            status: None,
            payload: None,
            failure_reason: None,
            retry_after: None,
        }
    }

    pub fn running() -> Self {
        Self::new(OperationStatus::Running)
    }

    pub fn succeeded(payload: T) -> Self {
        Self::new(OperationStatus::Succeeded).with_payload(payload)
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::new(OperationStatus::Failed).with_failure_reason(reason)
    }

    pub fn canceled() -> Self {
        Self::new(OperationStatus::Canceled)
    }

    pub fn with_payload(mut self, payload: T) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_failure_reason(mut self, reason: impl Into<String>) -> Self {
        self.failure_reason = Some(reason.into());
        self
    }

    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }
}

/// Delay before the next poll: the server's suggestion wins over `interval`.
///
/// A zero suggestion is ignored.
pub fn next_poll_delay(retry_after: Option<Duration>, interval: Duration) -> Duration {
    match retry_after {
        Some(delay) if !delay.is_zero() => delay,
        _ => interval,
    }
}

/// Polls a long-running operation until it reaches a terminal status.
///
/// `F` performs one status round trip for the bound token. A `Poller` is
/// single-owner: every state change goes through `&mut self`.
pub struct Poller<T, F> {
    token: OperationToken,
    status: OperationStatus,
    payload: Option<T>,
    failure_reason: Option<String>,
    retry_after: Option<Duration>,
    check_status: F,
}

impl<T, F> fmt::Debug for Poller<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poller")
            .field("token", &self.token)
            .field("status", &self.status)
            .field("has_payload", &self.payload.is_some())
            .field("retry_after", &self.retry_after)
            .finish()
    }
}

impl<T, F, Fut> Poller<T, F>
where
    F: FnMut(OperationToken) -> Fut,
    Fut: Future<Output = ArmResult<StatusReport<T>>>,
{
    /// Bind a poller to `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::InvalidArgument`] if the handle is already
    /// `Failed` or `Canceled`. A `Succeeded` handle is accepted and never polls.
    pub fn new(handle: OperationHandle<T>, check_status: F) -> ArmResult<Self> {
        if matches!(
            handle.status,
            OperationStatus::Failed | OperationStatus::Canceled
        ) {
            return Err(ArmError::InvalidArgument(format!(
                "cannot poll operation {} in terminal status {}",
                handle.token, handle.status
            )));
        }

        Ok(Self {
            token: handle.token,
            status: handle.status,
            payload: handle.payload,
            failure_reason: None,
            retry_after: handle.retry_after,
            check_status,
        })
    }

    /// The operation token.
    pub fn token(&self) -> &OperationToken {
        &self.token
    }

    /// Last known status.
    pub fn status(&self) -> OperationStatus {
        self.status
    }

    /// Returns `true` once the status is terminal.
    pub fn is_done(&self) -> bool {
        self.status.is_terminal()
    }

    /// Latest server-suggested delay, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    /// Latest resource payload, if any.
    pub fn payload(&self) -> Option<&T> {
        self.payload.as_ref()
    }

    /// Consume the poller and return its payload.
    pub fn into_payload(self) -> Option<T> {
        self.payload
    }

    /// Issue one status check and update the poller.
    ///
    /// On a done poller no request is made and the terminal outcome is
    /// reported again.
    ///
    /// # Errors
    ///
    /// - Transport errors from the collaborator; state is left unchanged and
    ///   the call may be retried.
    /// - [`ArmError::OperationFailed`] if the operation failed.
    /// - [`ArmError::OperationCanceled`] if the operation was canceled.
    pub async fn poll(&mut self) -> ArmResult<OperationStatus> {
        if self.is_done() {
            return self.terminal_outcome();
        }

        let report = (self.check_status)(self.token.clone()).await?;
        self.apply(report);

        tracing::debug!(token = %self.token, status = %self.status, "polled operation status");

        if self.is_done() {
            self.terminal_outcome()
        } else {
            Ok(self.status)
        }
    }

    fn apply(&mut self, report: StatusReport<T>) {
        // A response without a status field ends polling.
        let status = report.status.unwrap_or(OperationStatus::Succeeded);
        if status.rank() >= self.status.rank() {
            self.status = status;
        } else {
            tracing::trace!(current = %self.status, reported = %status, "ignoring status regression");
        }

        if report.payload.is_some() {
            self.payload = report.payload;
        }
        if report.failure_reason.is_some() {
            self.failure_reason = report.failure_reason;
        }
        self.retry_after = report.retry_after;
    }

    fn terminal_outcome(&self) -> ArmResult<OperationStatus> {
        match self.status {
            OperationStatus::Failed => Err(ArmError::OperationFailed {
                reason: self
                    .failure_reason
                    .clone()
                    .unwrap_or_else(|| format!("operation {} failed", self.token)),
            }),
            OperationStatus::Canceled => Err(ArmError::OperationCanceled),
            status => Ok(status),
        }
    }
}

impl<T, F, Fut> Poller<T, F>
where
    T: Clone,
    F: FnMut(OperationToken) -> Fut,
    Fut: Future<Output = ArmResult<StatusReport<T>>>,
{
    /// Poll every `interval` until done or `timeout` elapses.
    ///
    /// A server-suggested retry-after delay takes precedence over `interval`.
    /// Returns the final payload.
    ///
    /// # Errors
    ///
    /// - [`ArmError::InvalidArgument`] if `interval` is zero.
    /// - [`ArmError::Timeout`] if the operation is not done within `timeout`.
    /// - Any error from [`Poller::poll`].
    pub async fn poll_until_done(&mut self, interval: Duration, timeout: Duration) -> ArmResult<T> {
        self.poll_until_done_with_cancellation(interval, timeout, &CancellationToken::new())
            .await
    }

    /// Like [`Poller::poll_until_done`], aborting with [`ArmError::Canceled`]
    /// when `cancel` fires. The signal is checked before each poll and
    /// interrupts the wait between polls.
    #[tracing::instrument(
        name = "arm::poller::poll_until_done",
        skip(self, cancel),
        fields(token = %self.token)
    )]
    pub async fn poll_until_done_with_cancellation(
        &mut self,
        interval: Duration,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> ArmResult<T> {
        if interval.is_zero() {
            return Err(ArmError::InvalidArgument(
                "poll interval must be greater than zero".into(),
            ));
        }

        let start = Instant::now();
        let deadline = start.checked_add(timeout);

        loop {
            if cancel.is_cancelled() {
                return Err(ArmError::Canceled);
            }

            let round_trip = self.poll();
            match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, round_trip)
                    .await
                    .map_err(|_| ArmError::Timeout {
                        elapsed: start.elapsed(),
                    })??,
                None => round_trip.await?,
            };

            if self.is_done() {
                tracing::debug!(status = %self.status, "operation reached terminal status");
                return self.payload.clone().ok_or_else(|| ArmError::OperationFailed {
                    reason: format!("operation {} succeeded without a result", self.token),
                });
            }

            let delay = next_poll_delay(self.retry_after, interval);
            let now = Instant::now();
            if deadline.is_some_and(|deadline| delay > deadline.saturating_duration_since(now)) {
                return Err(ArmError::Timeout {
                    elapsed: now - start,
                });
            }

            tracing::trace!(
                status = %self.status,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "operation still in progress, waiting",
            );
            tokio::select! {
                _ = cancel.cancelled() => return Err(ArmError::Canceled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
