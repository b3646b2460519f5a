//! services/portal/src/error.rs
//!
//! Defines the primary error type for the portal client service.

use crate::config::ConfigError;
use course_portal_core::ports::PortError;

/// The primary error type for the `portal` service.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying HTTP client library.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Represents a JSON (de)serialization failure outside the request path.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A screen rendered an error banner or a not-found message instead of content.
    #[error("{0}")]
    Screen(String),
}
