//! Request execution seam shared by the client and its test doubles.
//!
//! [`Transport`] is the `(method, path, body) -> (status, headers, body)`
//! collaborator that long-running operation and paging conventions are built
//! on. [`ArmClient`](crate::client::ArmClient) implements it over `reqwest`;
//! tests can substitute any other implementation.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::client::truncate_message;
use crate::error::{ArmError, ArmResult};
use crate::models::CloudError;

/// A single request against the management plane.
#[derive(Debug, Clone)]
pub struct ArmRequest {
    /// The HTTP method.
    pub method: Method,
    /// Path (and optional query) relative to the client endpoint, or an
    /// absolute URL.
    pub path: String,
    /// Optional JSON body.
    pub body: Option<serde_json::Value>,
}

impl ArmRequest {
    /// Create a request without a body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    /// A `GET` request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// A `DELETE` request.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach a serializable body.
    pub fn with_json<B: serde::Serialize + ?Sized>(self, body: &B) -> ArmResult<Self> {
        Ok(self.with_body(serde_json::to_value(body)?))
    }
}

/// The raw outcome of a round trip: status code, headers, and body bytes.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// The HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl RawResponse {
    /// Create a response.
    pub fn new(status: u16, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Returns `true` for 2xx status codes.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Look up a header value as a string.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> ArmResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Deserialize the body as JSON, treating an empty body as `null`.
    pub fn json_or_null<T: DeserializeOwned>(&self) -> ArmResult<T> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            Ok(serde_json::from_value(serde_json::Value::Null)?)
        } else {
            self.json()
        }
    }

    /// Convert a non-2xx response into an error.
    ///
    /// Bodies in the ARM `{"error": {"code", "message"}}` shape become
    /// [`ArmError::Api`]; anything else becomes [`ArmError::Http`]. Messages are
    /// sanitized and truncated.
    pub fn error_for_status(self) -> ArmResult<Self> {
        if self.is_success() {
            return Ok(self);
        }

        let body = String::from_utf8_lossy(&self.body);
        if let Ok(cloud) = serde_json::from_str::<CloudError>(&body) {
            return Err(ArmError::Api {
                status: self.status,
                code: cloud.error.code.unwrap_or_else(|| "unknown".into()),
                message: truncate_message(cloud.error.message.as_deref().unwrap_or(&body)),
            });
        }

        Err(ArmError::http(self.status, truncate_message(&body)))
    }
}

/// Executes requests against the management plane.
///
/// Implementations own authentication, connection pooling, and retry of
/// transient failures. Connectivity failures are reported as errors;
/// any HTTP status, including 4xx/5xx, is returned as a [`RawResponse`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute one request.
    async fn execute(&self, request: ArmRequest) -> ArmResult<RawResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn execute(&self, request: ArmRequest) -> ArmResult<RawResponse> {
        (**self).execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &'static str) -> RawResponse {
        RawResponse::new(status, HeaderMap::new(), body)
    }

    #[test]
    fn error_for_status_passes_success_through() {
        let resp = response(202, "").error_for_status().expect("202 is success");
        assert_eq!(resp.status, 202);
    }

    #[test]
    fn error_for_status_parses_cloud_error() {
        let err = response(
            409,
            r#"{"error":{"code":"Conflict","message":"Host group is full"}}"#,
        )
        .error_for_status()
        .expect_err("409 should fail");

        match err {
            ArmError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 409);
                assert_eq!(code, "Conflict");
                assert_eq!(message, "Host group is full");
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn error_for_status_falls_back_to_http_error() {
        let err = response(503, "Service Unavailable")
            .error_for_status()
            .expect_err("503 should fail");

        match err {
            ArmError::Http { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "Service Unavailable");
            }
            other => panic!("Expected Http error, got {other:?}"),
        }
    }

    #[test]
    fn json_or_null_accepts_empty_body() {
        let value: serde_json::Value = response(204, "").json_or_null().expect("empty is null");
        assert!(value.is_null());

        let value: serde_json::Value = response(200, r#"{"id":"x"}"#)
            .json_or_null()
            .expect("should parse");
        assert_eq!(value["id"], "x");
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert("Azure-AsyncOperation", "https://example/op".parse().unwrap());
        let resp = RawResponse::new(201, headers, "");
        assert_eq!(resp.header("azure-asyncoperation"), Some("https://example/op"));
    }
}
