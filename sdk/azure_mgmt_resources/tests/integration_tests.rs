//! Integration tests for azure_mgmt_resources.
//!
//! These tests require a live Azure subscription.
//! Run with: `cargo test --features integration-tests`
//!
//! Required environment variables:
//! - `AZURE_SUBSCRIPTION_ID`: The subscription to create a resource group in
//! - `AZURE_ACCESS_TOKEN` (optional): A management-plane bearer token; the
//!   Azure CLI login is used otherwise

#![cfg(feature = "integration-tests")]

use azure_mgmt_core::auth::ArmCredential;
use azure_mgmt_core::client::ArmClient;
use azure_mgmt_core::error::ArmError;
use azure_mgmt_resources::{resource, ResourceId};
use futures::TryStreamExt;
use serde_json::{json, Value};
use std::time::Duration;

fn get_client() -> ArmClient {
    ArmClient::builder()
        .credential(ArmCredential::from_env().expect("credential"))
        .build()
        .expect("Failed to build client")
}

fn get_location() -> String {
    std::env::var("AZURE_LOCATION").unwrap_or_else(|_| "westus".to_string())
}

#[tokio::test]
async fn test_resource_group_lifecycle() {
    let client = get_client();
    let subscription = client.subscription_id().expect("AZURE_SUBSCRIPTION_ID not set");
    let name = format!("rg-arm-it-{}", unique_suffix());
    let group = ResourceId::subscription(subscription).resource_group(&name);
    let path = group.to_string();

    // Create
    let mut poller = resource::begin_create_or_update::<_, _, Value>(
        &client,
        &path,
        &json!({"location": get_location(), "tags": {"purpose": "integration-test"}}),
    )
    .await
    .expect("begin create");
    let created = poller
        .poll_until_done(Duration::from_secs(2), Duration::from_secs(120))
        .await
        .expect("create resource group");
    assert_eq!(created["name"], name.as_str());

    // Get
    let fetched: Value = resource::get(&client, &path).await.expect("get resource group");
    assert_eq!(fetched["properties"]["provisioningState"], "Succeeded");

    // List
    let groups: Vec<Value> = resource::list(
        &client,
        &ResourceId::subscription(subscription).collection("resourcegroups").to_string(),
    )
    .into_items()
    .try_collect()
    .await
    .expect("list resource groups");
    assert!(groups.iter().any(|g| g["name"] == name.as_str()));

    // Delete
    let mut poller = resource::begin_delete(&client, &path).await.expect("begin delete");
    poller
        .poll_until_done(Duration::from_secs(10), Duration::from_secs(1800))
        .await
        .expect("delete resource group");

    match resource::get::<_, Value>(&client, &path).await {
        Err(ArmError::Api { code, .. }) => assert_eq!(code, "ResourceGroupNotFound"),
        other => panic!("Expected ResourceGroupNotFound, got {other:?}"),
    }
}

fn unique_suffix() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .subsec_nanos();
    format!("{nanos:08x}")
}
