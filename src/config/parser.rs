//! Resolution of provider configuration from its sources.
//!
//! Each setting is looked up in order: the provider configuration
//! variables, then the environment, then (for the token only) the
//! credentials stored by `pulumi login`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::client::DEFAULT_SERVICE_URL;
use crate::error::{ConfigError, Result};

use super::credentials::{credentials_path, StoredCredentials, ENV_PULUMI_HOME};
use super::spec::{
    ProviderConfig, ACCESS_TOKEN_KEY, API_URL_KEY, CONFIG_PREFIX, ENV_ACCESS_TOKEN,
    ENV_BACKEND_URL,
};

/// Strips the `pulumiservice:config:` prefix from configuration keys.
#[must_use]
pub fn normalize_variables(variables: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    variables
        .iter()
        .map(|(k, v)| {
            let key = k.strip_prefix(CONFIG_PREFIX).unwrap_or(k);
            (key.to_string(), v.clone())
        })
        .collect()
}

/// Resolves [`ProviderConfig`] from configuration variables, the
/// environment and stored credentials.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Directory searched for `.env`.
    base_path: Option<PathBuf>,
    /// Overrides the stored credentials location.
    credentials_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a parser using the working directory and `~/.pulumi`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            base_path: None,
            credentials_path: None,
        }
    }

    /// Sets the directory searched for `.env`.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Reads stored credentials from `path` instead of the Pulumi home.
    #[must_use]
    pub fn with_credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = Some(path.into());
        self
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| ConfigError::ValidationError {
                message: format!("Failed to load .env file: {e}"),
                field: Some(env_path.display().to_string()),
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }
        Ok(())
    }

    /// Resolves the configuration against the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AccessTokenNotFound`] when no source provides a
    /// token and [`ConfigError::ValidationError`] for a malformed URL.
    pub fn resolve(&self, variables: &BTreeMap<String, String>) -> Result<ProviderConfig> {
        self.resolve_with(variables, |name| std::env::var(name).ok())
    }

    /// Resolves the configuration with `env` standing in for the environment.
    ///
    /// # Errors
    ///
    /// See [`resolve`](Self::resolve).
    pub fn resolve_with<F>(&self, variables: &BTreeMap<String, String>, env: F) -> Result<ProviderConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let variables = normalize_variables(variables);
        let lookup = |key: &str, env_name: &str| {
            variables
                .get(key)
                .cloned()
                .or_else(|| env(env_name))
                .filter(|value| !value.is_empty())
        };

        let service_url =
            lookup(API_URL_KEY, ENV_BACKEND_URL).unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string());

        let access_token = match lookup(ACCESS_TOKEN_KEY, ENV_ACCESS_TOKEN) {
            Some(token) => token,
            None => self.stored_token(env(ENV_PULUMI_HOME).as_deref())?,
        };

        debug!(service_url = %service_url, "Resolved provider configuration");
        ProviderConfig::new(access_token, service_url)
    }

    fn stored_token(&self, pulumi_home: Option<&str>) -> Result<String> {
        let path = self
            .credentials_path
            .clone()
            .or_else(|| credentials_path(pulumi_home))
            .ok_or(ConfigError::AccessTokenNotFound)?;

        // An unreadable credentials file means no token, as if it were absent.
        let credentials = match StoredCredentials::load(&path) {
            Ok(Some(credentials)) => credentials,
            Ok(None) => return Err(ConfigError::AccessTokenNotFound.into()),
            Err(e) => {
                debug!(error = %e, "Ignoring stored credentials");
                return Err(ConfigError::AccessTokenNotFound.into());
            }
        };
        credentials
            .current_token()
            .map(str::to_string)
            .ok_or_else(|| ConfigError::AccessTokenNotFound.into())
    }
}
