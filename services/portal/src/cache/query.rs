//! services/portal/src/cache/query.rs
//!
//! Query identity and the per-query status a subscriber observes.

use course_portal_core::ports::PortError;
use std::fmt;
use std::sync::Arc;

/// Canonical identity of a query: endpoint plus parameters sorted by name, so
/// the same request built in a different parameter order shares one entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    endpoint: String,
    params: Vec<(String, String)>,
}

impl QueryKey {
    pub fn new(endpoint: impl Into<String>, mut params: Vec<(String, String)>) -> Self {
        params.sort();
        Self {
            endpoint: endpoint.into(),
            params,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.endpoint)?;
        for (i, (name, value)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, name, value)?;
        }
        Ok(())
    }
}

/// `Uninitialized -> Loading -> {Success | Error}`; both outcomes go back to
/// `Loading` on refetch. No state is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Uninitialized,
    Loading,
    Success,
    Error,
}

/// What a subscriber sees of one cache entry.
///
/// `data` survives a failed refetch, so `Error` may come with the last good value.
pub struct QueryState<T> {
    pub status: QueryStatus,
    pub data: Option<Arc<T>>,
    pub error: Option<PortError>,
    pub is_stale: bool,
}

impl<T> QueryState<T> {
    pub fn uninitialized() -> Self {
        Self {
            status: QueryStatus::Uninitialized,
            data: None,
            error: None,
            is_stale: false,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.status, QueryStatus::Uninitialized | QueryStatus::Loading)
    }
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            is_stale: self.is_stale,
        }
    }
}

impl<T> fmt::Debug for QueryState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryState")
            .field("status", &self.status)
            .field("has_data", &self.data.is_some())
            .field("error", &self.error)
            .field("is_stale", &self.is_stale)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_order_does_not_change_identity() {
        let a = QueryKey::new(
            "GET /courses",
            vec![
                ("search".to_string(), "rust".to_string()),
                ("level".to_string(), "beginner".to_string()),
            ],
        );
        let b = QueryKey::new(
            "GET /courses",
            vec![
                ("level".to_string(), "beginner".to_string()),
                ("search".to_string(), "rust".to_string()),
            ],
        );
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "GET /courses?level=beginner&search=rust");
    }
}
