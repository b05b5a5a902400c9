//! Credentials stored by `pulumi login`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;

/// Environment variable overriding the Pulumi home directory.
pub const ENV_PULUMI_HOME: &str = "PULUMI_HOME";

/// Contents of `credentials.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredentials {
    /// Backend URL the CLI is currently logged into.
    #[serde(default)]
    pub current: String,
    /// Access token per backend URL.
    #[serde(default)]
    pub access_tokens: BTreeMap<String, String>,
}

impl StoredCredentials {
    /// Reads the credentials file. A missing file yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Credentials`] if the file exists but cannot be
    /// read or parsed.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            debug!("No stored credentials at: {}", path.display());
            return Ok(None);
        }
        let fail = |message: String| ConfigError::Credentials {
            path: path.display().to_string(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| fail(e.to_string()))?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| fail(e.to_string()))
    }

    /// Token for the backend the CLI is logged into.
    #[must_use]
    pub fn current_token(&self) -> Option<&str> {
        self.access_tokens
            .get(&self.current)
            .map(String::as_str)
            .filter(|token| !token.is_empty())
    }
}

/// Location of `credentials.json`: `$PULUMI_HOME` when set, else `~/.pulumi`.
#[must_use]
pub fn credentials_path(pulumi_home: Option<&str>) -> Option<PathBuf> {
    let home = match pulumi_home.filter(|h| !h.is_empty()) {
        Some(home) => PathBuf::from(home),
        None => dirs::home_dir()?.join(".pulumi"),
    };
    Some(home.join("credentials.json"))
}
