//! Provider configuration types.

use std::fmt;

use validator::Validate;

use crate::client::DEFAULT_SERVICE_URL;
use crate::error::{ConfigError, Result};

/// Prefix the engine puts in front of provider configuration keys.
pub const CONFIG_PREFIX: &str = "pulumiservice:config:";

/// Configuration key holding the access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Configuration key holding the service URL.
pub const API_URL_KEY: &str = "apiUrl";

/// Environment variable holding the access token.
pub const ENV_ACCESS_TOKEN: &str = "PULUMI_ACCESS_TOKEN";

/// Environment variable holding the service URL.
pub const ENV_BACKEND_URL: &str = "PULUMI_BACKEND_URL";

/// Resolved provider configuration.
#[derive(Clone, PartialEq, Eq, Validate)]
pub struct ProviderConfig {
    /// Pulumi Cloud access token.
    pub access_token: String,

    /// Base URL of the Pulumi Cloud REST API.
    #[validate(url)]
    pub service_url: String,
}

impl ProviderConfig {
    /// Creates a configuration and validates the service URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if the URL is malformed.
    pub fn new(access_token: impl Into<String>, service_url: impl Into<String>) -> Result<Self> {
        let config = Self {
            access_token: access_token.into(),
            service_url: service_url.into(),
        };
        config.validate().map_err(|e| {
            ConfigError::validation(
                format!("invalid service URL {:?}: {e}", config.service_url),
                API_URL_KEY,
            )
        })?;
        Ok(config)
    }

    /// Configuration for the public service.
    ///
    /// # Errors
    ///
    /// Never fails for the built-in URL; the signature matches [`new`](Self::new).
    pub fn with_default_url(access_token: impl Into<String>) -> Result<Self> {
        Self::new(access_token, DEFAULT_SERVICE_URL)
    }
}

// The token never reaches logs.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("access_token", &"<redacted>")
            .field("service_url", &self.service_url)
            .finish()
    }
}
