//! Pulumi Cloud resource provider entrypoint.
//!
//! Runs one lifecycle operation per invocation: the JSON request comes from
//! a file or stdin and the JSON response goes to stdout.

use std::io::{Read, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use pulumi_service_provider::cli::{Cli, Commands, LogFormat, OutputFormatter, RequestArgs};
use pulumi_service_provider::client::{PulumiClient, DEFAULT_SERVICE_URL};
use pulumi_service_provider::error::{ProviderError, Result};
use pulumi_service_provider::provider::Provider;
use pulumi_service_provider::resources::DeleteRequest;

use clap::Parser;
use serde::de::DeserializeOwned;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.log_format);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Operation failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system on stderr.
fn init_logging(verbose: bool, format: LogFormat) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<ExitCode> {
    let formatter = OutputFormatter::new(cli.output);
    let provider = if cli.command.is_remote() {
        Provider::configure(&cli.config_variables())?
    } else {
        local_provider(cli.api_url.as_deref())?
    };

    let output = match &cli.command {
        Commands::Check(args) => {
            let request = read_request(args)?;
            formatter.format_check(&provider.check(&request)?)?
        }
        Commands::Diff(args) => {
            let request = read_request(args)?;
            formatter.format_diff(&provider.diff(&request)?)?
        }
        Commands::Create(args) => {
            let request = read_request(args)?;
            match provider.create(&request).await {
                Ok(response) => formatter.format_create(&response)?,
                Err(ProviderError::ResourceInitFailed {
                    id,
                    properties,
                    reasons,
                }) => {
                    let partial = formatter.format_partial(&id, &properties, &reasons)?;
                    emit(&partial)?;
                    return Ok(ExitCode::FAILURE);
                }
                Err(e) => return Err(e),
            }
        }
        Commands::Read(args) => {
            let request = read_request(args)?;
            formatter.format_read(&provider.read(&request).await?)?
        }
        Commands::Update(args) => {
            let request = read_request(args)?;
            formatter.format_update(&provider.update(&request).await?)?
        }
        Commands::Delete(args) => {
            let request: DeleteRequest = read_request(args)?;
            provider.delete(&request).await?;
            formatter.format_delete(&request.id)?
        }
        Commands::Types => {
            let types: Vec<&str> = provider.resource_types().collect();
            formatter.format_types(&types)?
        }
    };

    emit(&output)?;
    Ok(ExitCode::SUCCESS)
}

/// A provider for operations that never reach the service.
fn local_provider(api_url: Option<&str>) -> Result<Provider> {
    let client = PulumiClient::new(api_url.unwrap_or(DEFAULT_SERVICE_URL), "")?;
    Ok(Provider::new(Arc::new(client)))
}

/// Reads and decodes the JSON request.
fn read_request<T: DeserializeOwned>(args: &RequestArgs) -> Result<T> {
    let raw = match args.request.as_deref() {
        Some(path) if path != Path::new("-") => {
            debug!("Reading request from: {}", path.display());
            std::fs::read_to_string(path)?
        }
        _ => {
            debug!("Reading request from stdin");
            let mut raw = String::new();
            std::io::stdin().read_to_string(&mut raw)?;
            raw
        }
    };
    Ok(serde_json::from_str(&raw)?)
}

/// Writes the response to stdout.
fn emit(output: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
