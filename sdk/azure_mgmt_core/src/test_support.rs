//! Helpers for testing against a `wiremock` server.
//!
//! Enabled for sibling crates with the `test-support` feature.

use std::time::Duration;

use wiremock::MockServer;

use crate::auth::ArmCredential;
use crate::client::{ArmClient, RetryPolicy};

/// Test bearer token (not a real token).
pub const TEST_ACCESS_TOKEN: &str = "test-access-token";

/// Test subscription.
pub const TEST_SUBSCRIPTION_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Create a test client connected to a mock server.
///
/// Retries use a short backoff so retry tests stay fast.
pub async fn setup_mock_client(server: &MockServer) -> ArmClient {
    ArmClient::builder()
        .endpoint(server.uri())
        .credential(ArmCredential::access_token(TEST_ACCESS_TOKEN))
        .subscription_id(TEST_SUBSCRIPTION_ID)
        .retry_policy(RetryPolicy {
            max_retries: 2,
            initial_backoff: Duration::from_millis(10),
        })
        .build()
        .expect("should build client")
}
