//! Command-line interface.
//!
//! This module provides the command line used to drive a single resource
//! lifecycle operation from a JSON request.

mod commands;
mod output;

pub use commands::{Cli, Commands, LogFormat, OutputFormat, RequestArgs};
pub use output::OutputFormatter;
