//! Pulumi Cloud REST client.
//!
//! This module provides the service API seam used by every resource handler:
//!
//! - [`PulumiServiceApi`]: the operations resources depend on
//! - [`PulumiClient`]: the reqwest implementation
//! - API request and response types

mod api;
mod http;
mod types;

pub use api::{ApiResult, PulumiServiceApi};
pub use http::{PulumiClient, DEFAULT_SERVICE_URL};
pub use types::*;

#[cfg(test)]
pub use api::MockPulumiServiceApi;
