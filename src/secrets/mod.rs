use async_trait::async_trait;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use aws_sdk_secretsmanager::Client as SecretsClient;
use serde::Deserialize;
use std::fmt;

use crate::{Result, TranscriptorError};

/// Proxy credentials stored in the secret bundle
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ProxyCredentials {
    #[serde(rename = "WEBSHARE_USERNAME")]
    pub username: String,

    #[serde(rename = "WEBSHARE_PASSWORD")]
    pub password: String,
}

impl fmt::Debug for ProxyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Resolves a named secret into proxy credentials
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SecretResolver: Send + Sync {
    async fn resolve(&self, secret_name: &str) -> Result<ProxyCredentials>;
}

/// Secret resolver backed by AWS Secrets Manager
pub struct SecretsManagerResolver {
    client: SecretsClient,
}

impl SecretsManagerResolver {
    pub fn new(client: SecretsClient) -> Self {
        Self { client }
    }

    pub fn from_conf(sdk_config: &aws_types::SdkConfig) -> Self {
        Self::new(SecretsClient::new(sdk_config))
    }
}

#[async_trait]
impl SecretResolver for SecretsManagerResolver {
    async fn resolve(&self, secret_name: &str) -> Result<ProxyCredentials> {
        tracing::debug!("Fetching secret: {}", secret_name);

        let response = self
            .client
            .get_secret_value()
            .secret_id(secret_name)
            .send()
            .await
            .map_err(|e| TranscriptorError::SecretRetrievalFailed {
                name: secret_name.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
                source: Box::new(e),
            })?;

        parse_credentials(secret_name, response.secret_string())
    }
}

/// Parse the secret's string payload into credentials
pub fn parse_credentials(secret_name: &str, secret_string: Option<&str>) -> Result<ProxyCredentials> {
    let payload = match secret_string {
        Some(payload) if !payload.trim().is_empty() => payload,
        _ => return Err(TranscriptorError::EmptySecret(secret_name.to_string())),
    };

    let credentials: ProxyCredentials =
        serde_json::from_str(payload).map_err(|e| TranscriptorError::SecretRetrievalFailed {
            name: secret_name.to_string(),
            reason: format!("malformed secret payload: {}", e),
            source: Box::new(e),
        })?;

    if credentials.username.is_empty() || credentials.password.is_empty() {
        return Err(TranscriptorError::SecretRetrievalFailed {
            name: secret_name.to_string(),
            reason: "proxy username or password is empty".to_string(),
            source: "empty proxy credentials".into(),
        });
    }

    Ok(credentials)
}
