//! Common types shared across the Azure Resource Manager crates.

use serde::{Deserialize, Serialize};

/// The error envelope returned by Azure Resource Manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudError {
    pub error: CloudErrorBody,
}

/// Details of a management-plane error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloudErrorBody {
    pub code: Option<String>,
    pub message: Option<String>,
    pub target: Option<String>,
    #[serde(default)]
    pub details: Vec<CloudErrorBody>,
}

impl CloudErrorBody {
    /// A one-line description, preferring `code: message`.
    pub fn describe(&self) -> String {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => format!("{code}: {message}"),
            (None, Some(message)) => message.clone(),
            (Some(code), None) => code.clone(),
            (None, None) => "unknown error".into(),
        }
    }
}
