//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{ACCESS_TOKEN_KEY, API_URL_KEY, ENV_ACCESS_TOKEN, ENV_BACKEND_URL};

/// Drives one resource lifecycle operation against Pulumi Cloud.
///
/// Each subcommand reads a JSON request (from `--request` or stdin) and
/// writes the JSON response to stdout. Logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "pulumi-resource-pulumiservice")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Pulumi Cloud access token.
    #[arg(long, global = true, env = ENV_ACCESS_TOKEN, hide_env_values = true)]
    pub access_token: Option<String>,

    /// Pulumi Cloud API URL.
    #[arg(long, global = true, env = ENV_BACKEND_URL)]
    pub api_url: Option<String>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (json, text).
    #[arg(long, global = true, default_value = "json")]
    pub output: OutputFormat,

    /// Log format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    /// Operation to perform.
    #[command(subcommand)]
    pub command: Commands,
}

/// Lifecycle operations.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate and normalize declared inputs.
    Check(RequestArgs),

    /// Compare old and new inputs.
    Diff(RequestArgs),

    /// Create a resource.
    Create(RequestArgs),

    /// Refresh a resource from the service.
    Read(RequestArgs),

    /// Update a resource in place.
    Update(RequestArgs),

    /// Delete a resource.
    Delete(RequestArgs),

    /// List the resource types this provider manages.
    Types,
}

impl Commands {
    /// Returns true if the command calls the service.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Create(_) | Self::Read(_) | Self::Update(_) | Self::Delete(_)
        )
    }
}

/// Where to read the request from.
#[derive(Args, Debug, Clone, Default)]
pub struct RequestArgs {
    /// JSON request file; stdin when omitted or `-`.
    #[arg(short, long)]
    pub request: Option<PathBuf>,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// The JSON response, for the engine or scripts.
    #[default]
    Json,
    /// Human-readable text output.
    Text,
}

/// Log format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Provider configuration variables supplied on the command line.
    #[must_use]
    pub fn config_variables(&self) -> BTreeMap<String, String> {
        let mut variables = BTreeMap::new();
        if let Some(token) = &self.access_token {
            variables.insert(ACCESS_TOKEN_KEY.to_string(), token.clone());
        }
        if let Some(url) = &self.api_url {
            variables.insert(API_URL_KEY.to_string(), url.clone());
        }
        variables
    }
}
