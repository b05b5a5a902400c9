//! Provider configuration.
//!
//! This module resolves the access token and service URL the REST client
//! needs:
//! - Provider configuration variables (`pulumiservice:config:*`)
//! - `PULUMI_ACCESS_TOKEN` / `PULUMI_BACKEND_URL`, with `.env` support
//! - Credentials stored by `pulumi login`

mod credentials;
mod parser;
mod spec;

pub use credentials::{credentials_path, StoredCredentials, ENV_PULUMI_HOME};
pub use parser::{normalize_variables, ConfigParser};
pub use spec::{
    ProviderConfig, ACCESS_TOKEN_KEY, API_URL_KEY, CONFIG_PREFIX, ENV_ACCESS_TOKEN,
    ENV_BACKEND_URL,
};
