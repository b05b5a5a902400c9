// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![warn(missing_docs)]                // All public items must be documented
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![warn(unused_imports)]              // Unused imports are flagged
#![warn(unused_variables)]            // Unused variables are flagged
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Pulumi Service Provider
//!
//! A resource provider that manages Pulumi Cloud objects as infrastructure
//! as code: stack tags, deployment settings and schedules, environments,
//! teams and their permissions, OIDC issuers and template sources.
//!
//! ## Architecture
//!
//! Every resource kind is a thin translator between the engine's property
//! bags and the Pulumi Cloud REST API:
//!
//! 1. **Check** validates and normalizes declared inputs
//! 2. **Diff** compares old and new inputs without calling the service
//! 3. **Create / Read / Update / Delete** call the service through an
//!    injected [`PulumiServiceApi`](client::PulumiServiceApi)
//!
//! ## Modules
//!
//! - [`property`]: property values, maps and their wire encoding
//! - [`diff`]: structural diff with per-kind replacement rules
//! - [`id`]: composite resource identifiers
//! - [`secret`]: plaintext/ciphertext handling for secret fields
//! - [`duration`]: duration strings as the service prints them
//! - [`client`]: Pulumi Cloud REST client
//! - [`resources`]: one handler per resource kind
//! - [`provider`]: handler registry and dispatch
//! - [`config`]: access token and service URL resolution
//! - [`cli`]: command-line interface
//!
//! ## Example
//!
//! ```no_run
//! use std::collections::BTreeMap;
//!
//! use pulumi_service_provider::props;
//! use pulumi_service_provider::provider::Provider;
//! use pulumi_service_provider::resources::CreateRequest;
//!
//! # async fn example() -> pulumi_service_provider::error::Result<()> {
//! let provider = Provider::configure(&BTreeMap::new())?;
//! let created = provider
//!     .create(&CreateRequest {
//!         urn: "urn:pulumi:prod::web::pulumiservice:index:StackTag::owner".to_string(),
//!         properties: props! {
//!             "organization" => "acme",
//!             "project" => "web",
//!             "stack" => "prod",
//!             "name" => "owner",
//!             "value" => "platform-team",
//!         },
//!         preview: false,
//!     })
//!     .await?;
//! assert_eq!(created.id, "acme/web/prod/owner");
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod client;
pub mod config;
pub mod diff;
pub mod duration;
pub mod error;
pub mod id;
pub mod property;
pub mod provider;
pub mod resources;
pub mod secret;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::{PulumiClient, PulumiServiceApi};
pub use config::{ConfigParser, ProviderConfig};
pub use error::{ProviderError, Result};
pub use property::{PropertyMap, PropertyValue};
pub use provider::Provider;
pub use resources::ResourceHandler;
