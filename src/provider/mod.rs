//! Provider entry point.
//!
//! This module owns the registry of resource handlers and routes each
//! lifecycle request by the type token embedded in its URN.

mod registry;
mod urn;

pub use registry::Provider;
pub use urn::resource_type;
