//! crates/course_portal_core/src/ports.rs
//!
//! Defines the service contracts (traits) the client core depends on.
//! These traits form the boundary of the hexagonal architecture, so the session,
//! cache and controllers stay independent of a concrete HTTP stack or storage medium.

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
///
/// It is `Clone` because a single failed request may be observed by several
/// callers sharing the same in-flight fetch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PortError {
    /// The backend answered 404 for the requested entity.
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The backend answered 401.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// Any other non-2xx response.
    #[error("Request rejected with status {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Rejected { status: u16, message: Option<String> },
    /// The backend could not be reached (connect failure, timeout, broken stream).
    #[error("Backend unreachable: {0}")]
    Unreachable(String),
    /// The request was refused locally before being sent.
    #[error("Invalid request: {0}")]
    Invalid(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// The HTTP status behind this error, if the backend produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            PortError::NotFound(_) => Some(404),
            PortError::Unauthorized(_) => Some(401),
            PortError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound(_))
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Transport Request / Response
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A backend request, with the path relative to the configured API base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    /// Bearer credential, attached by the request decorator when a session token exists.
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A raw backend response. Status interpretation happens above the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends a request to the backend.
    ///
    /// Only network-level failures are errors here (`PortError::Unreachable`);
    /// any HTTP response, including 4xx/5xx, is returned as `Ok`.
    async fn send(&self, request: ApiRequest) -> PortResult<ApiResponse>;
}

/// Durable storage for the single auth token string.
pub trait TokenStorage: Send + Sync {
    fn load(&self) -> PortResult<Option<String>>;
    fn save(&self, token: &str) -> PortResult<()>;
    fn clear(&self) -> PortResult<()>;
}
