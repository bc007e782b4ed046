//! # API Shared
//!
//! Shared definitions for the derma APIs.
//!
//! Contains:
//! - Request and response bodies with OpenAPI schemas (`wire` module)
//! - Shared services like `HealthService`
//!
//! Used by `api-rest` and the `derma` CLI so both surfaces render the same shapes.

pub mod health;
pub mod wire;

pub use health::HealthService;
pub use wire::*;

/// Human-readable service name reported by the root endpoint.
pub const SERVICE_NAME: &str = "Skin Cancer Classification API";

/// Version reported by the root endpoint.
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");
