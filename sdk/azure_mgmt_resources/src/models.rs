//! Wire shapes for long-running operation status and list responses.

use azure_mgmt_core::models::CloudErrorBody;
use serde::{Deserialize, Serialize};

/// Body of an `Azure-AsyncOperation` status response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AsyncOperationStatus {
    pub id: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "percentComplete")]
    pub percent_complete: Option<f64>,
    pub error: Option<CloudErrorBody>,
}

/// One page of a list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceList<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "nextLink", default, skip_serializing_if = "Option::is_none")]
    pub next_link: Option<String>,
}

/// Read `properties.provisioningState` from a resource body.
pub fn provisioning_state(body: &serde_json::Value) -> Option<&str> {
    body.get("properties")?.get("provisioningState")?.as_str()
}
