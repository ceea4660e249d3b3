use std::sync::Arc;

use azure_core::credentials::TokenCredential;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{ArmError, ArmResult};

/// Environment variable holding a pre-acquired bearer token.
pub const ACCESS_TOKEN_ENV: &str = "AZURE_ACCESS_TOKEN";

/// Credential types supported by the management client.
#[derive(Clone)]
pub enum ArmCredential {
    /// A pre-acquired bearer token, sent as-is.
    AccessToken(SecretString),

    /// Any `azure_core` token credential (Azure CLI, client secret, managed identity, ...).
    TokenCredential(Arc<dyn TokenCredential>),
}

impl ArmCredential {
    /// Create a credential from the `AZURE_ACCESS_TOKEN` environment variable.
    /// Falls back to the Azure CLI credential if the variable is not set.
    pub fn from_env() -> ArmResult<Self> {
        match std::env::var(ACCESS_TOKEN_ENV) {
            Ok(token) if !token.is_empty() => Ok(Self::AccessToken(SecretString::from(token))),
            _ => Self::azure_cli(),
        }
    }

    /// Create a static bearer token credential.
    pub fn access_token(token: impl Into<String>) -> Self {
        Self::AccessToken(SecretString::from(token.into()))
    }

    /// Create a credential backed by the signed-in Azure CLI account.
    pub fn azure_cli() -> ArmResult<Self> {
        let credential = azure_identity::AzureCliCredential::new(None)
            .map_err(|e| ArmError::Auth(format!("failed to create Azure CLI credential: {e}")))?;
        Ok(Self::TokenCredential(credential))
    }

    /// Wrap an existing `azure_core` token credential.
    pub fn token_credential(credential: Arc<dyn TokenCredential>) -> Self {
        Self::TokenCredential(credential)
    }

    /// Resolve the credential to an authorization header value for `scope`.
    pub async fn resolve(&self, scope: &str) -> ArmResult<String> {
        match self {
            Self::AccessToken(token) => Ok(format!("Bearer {}", token.expose_secret())),
            Self::TokenCredential(credential) => {
                let token = credential
                    .get_token(&[scope], None)
                    .await
                    .map_err(|e| ArmError::Auth(format!("token acquisition failed: {e}")))?;
                Ok(format!("Bearer {}", token.token.secret()))
            }
        }
    }
}

impl std::fmt::Debug for ArmCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AccessToken(_) => write!(f, "ArmCredential::AccessToken(****)"),
            Self::TokenCredential(_) => write!(f, "ArmCredential::TokenCredential"),
        }
    }
}
