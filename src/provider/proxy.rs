use std::fmt;

use crate::config::ProxyConfig;
use crate::secrets::ProxyCredentials;
use crate::{Result, TranscriptorError};

const ROTATE_SUFFIX: &str = "-rotate";

/// Rotating residential proxy endpoint
///
/// Appending `-rotate` to the username asks the proxy to hand out a new exit IP
/// for every connection, which keeps YouTube from rate limiting a single address.
#[derive(Clone)]
pub struct WebshareProxy {
    username: String,
    password: String,
    domain: String,
    port: u16,
}

impl WebshareProxy {
    pub fn new(credentials: &ProxyCredentials, config: &ProxyConfig) -> Self {
        Self {
            username: credentials.username.clone(),
            password: credentials.password.clone(),
            domain: config.domain.clone(),
            port: config.port,
        }
    }

    pub fn rotating_username(&self) -> String {
        if self.username.ends_with(ROTATE_SUFFIX) {
            self.username.clone()
        } else {
            format!("{}{}", self.username, ROTATE_SUFFIX)
        }
    }

    /// Proxy URL without credentials
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}/", self.domain, self.port)
    }

    pub fn to_reqwest(&self) -> Result<reqwest::Proxy> {
        let proxy = reqwest::Proxy::all(self.endpoint())
            .map_err(|e| TranscriptorError::provider_with(format!("invalid proxy endpoint {}", self.endpoint()), e))?;

        Ok(proxy.basic_auth(&self.rotating_username(), &self.password))
    }
}

impl fmt::Debug for WebshareProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "http://{}:***@{}:{}/", self.rotating_username(), self.domain, self.port)
    }
}
