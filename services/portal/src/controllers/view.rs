//! services/portal/src/controllers/view.rs
//!
//! What a screen shows: exactly one of spinner, error banner, not-found message,
//! or content.

use crate::cache::{QueryState, QueryStatus};
use course_portal_core::ports::PortError;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum View<T> {
    Loading,
    Error(String),
    NotFound(String),
    Content(T),
}

impl<T> View<T> {
    /// `not_found` is the screen's message for a missing entity, e.g. "Course not found".
    pub fn from_result(result: Result<T, PortError>, not_found: &str) -> Self {
        match result {
            Ok(value) => View::Content(value),
            Err(e) => View::from_error(&e, not_found),
        }
    }

    pub fn from_error(error: &PortError, not_found: &str) -> Self {
        if error.is_not_found() {
            View::NotFound(not_found.to_string())
        } else {
            View::Error(describe(error))
        }
    }

    pub fn content(&self) -> Option<&T> {
        match self {
            View::Content(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, View::Loading)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> View<U> {
        match self {
            View::Loading => View::Loading,
            View::Error(message) => View::Error(message),
            View::NotFound(message) => View::NotFound(message),
            View::Content(value) => View::Content(f(value)),
        }
    }
}

impl<T> View<Arc<T>> {
    /// Renders a subscribed query. Data kept through a background refetch is
    /// still shown; a failed fetch shows the error even if older data exists.
    pub fn from_query(state: QueryState<T>, not_found: &str) -> Self {
        match (state.status, state.error, state.data) {
            (QueryStatus::Error, Some(error), _) => View::from_error(&error, not_found),
            (QueryStatus::Error, None, _) => View::Error("Request failed".to_string()),
            (_, _, Some(data)) => View::Content(data),
            (_, _, None) => View::Loading,
        }
    }
}

/// The inline message shown for a failed request.
pub fn describe(error: &PortError) -> String {
    match error {
        PortError::Rejected {
            message: Some(message),
            ..
        } => message.clone(),
        PortError::Rejected {
            status,
            message: None,
        } => format!("Request failed with status {}", status),
        PortError::Unreachable(_) => {
            "Unable to reach the server. Check your connection and try again.".to_string()
        }
        PortError::NotFound(message)
        | PortError::Unauthorized(message)
        | PortError::Invalid(message) => message.clone(),
        PortError::Unexpected(_) => "Something went wrong. Please try again.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(PortError::NotFound("missing".into()), View::NotFound("Course not found".into()))]
    #[case(
        PortError::Rejected { status: 500, message: Some("Database down".into()) },
        View::Error("Database down".into())
    )]
    #[case(
        PortError::Rejected { status: 502, message: None },
        View::Error("Request failed with status 502".into())
    )]
    #[case(
        PortError::Unreachable("connection refused".into()),
        View::Error("Unable to reach the server. Check your connection and try again.".into())
    )]
    fn errors_render_one_banner(#[case] error: PortError, #[case] expected: View<()>) {
        assert_eq!(View::<()>::from_result(Err(error), "Course not found"), expected);
    }

    #[test]
    fn query_states_map_to_one_view() {
        let loading: QueryState<u8> = QueryState::uninitialized();
        assert!(View::from_query(loading, "x").is_loading());

        let failed_with_data = QueryState {
            status: QueryStatus::Error,
            data: Some(Arc::new(1u8)),
            error: Some(PortError::Unreachable("timeout".into())),
            is_stale: false,
        };
        assert!(matches!(View::from_query(failed_with_data, "x"), View::Error(_)));

        let refreshing = QueryState {
            status: QueryStatus::Loading,
            data: Some(Arc::new(2u8)),
            error: None,
            is_stale: true,
        };
        assert_eq!(View::from_query(refreshing, "x").content().map(|v| **v), Some(2));
    }
}
