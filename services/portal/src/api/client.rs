//! services/portal/src/api/client.rs
//!
//! The request decorator sitting between endpoint definitions and the transport.
//! It attaches the session's bearer credential, sends the request, and turns the
//! raw response into a decoded value or a typed `PortError`.

use crate::store::SessionStore;
use course_portal_core::ports::{ApiRequest, ApiResponse, HttpTransport, PortError, PortResult};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    session: Arc<SessionStore>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn HttpTransport>, session: Arc<SessionStore>) -> Self {
        Self { transport, session }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Attaches `Authorization: Bearer <token>` when the session holds a token.
    /// Without one the request goes out unauthenticated.
    pub fn decorate(&self, mut request: ApiRequest) -> ApiRequest {
        request.bearer = self.session.token();
        request
    }

    /// Sends `request` and decodes a 2xx body into `T`.
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> PortResult<T> {
        let request = self.decorate(request);
        let label = format!("{} {}", request.method, request.path);
        debug!("-> {} (authenticated: {})", label, request.bearer.is_some());

        let response = self.transport.send(request).await?;
        interpret(&label, response)
    }
}

/// Maps a raw response onto the client error taxonomy.
fn interpret<T: DeserializeOwned>(label: &str, response: ApiResponse) -> PortResult<T> {
    if !response.is_success() {
        let message = server_message(&response.body);
        warn!(
            "<- {} failed with {}: {}",
            label,
            response.status,
            message.as_deref().unwrap_or("<no message>")
        );
        return Err(match response.status {
            404 => PortError::NotFound(message.unwrap_or_else(|| "Not found".to_string())),
            401 => PortError::Unauthorized(message.unwrap_or_else(|| "Unauthorized".to_string())),
            status => PortError::Rejected { status, message },
        });
    }

    debug!("<- {} {}", label, response.status);
    // 204 and other empty bodies decode as JSON null, which is what `()` expects.
    let value = if response.body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(&response.body).map_err(|e| {
            PortError::Unexpected(format!("invalid JSON in response to {}: {}", label, e))
        })?
    };
    serde_json::from_value(value).map_err(|e| {
        PortError::Unexpected(format!("unexpected response shape for {}: {}", label, e))
    })
}

/// Pulls a human-readable message out of an error body: `detail`, `message` or
/// `error` fields of a JSON object, otherwise the raw text.
fn server_message(body: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) {
        for field in ["detail", "message", "error"] {
            match map.get(field) {
                Some(Value::String(message)) => return Some(message.clone()),
                Some(Value::Null) | None => continue,
                Some(other) => return Some(other.to_string()),
            }
        }
    }
    Some(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryTokenStorage;
    use crate::test_support::FakeTransport;
    use course_portal_core::ports::HttpMethod;
    use rstest::rstest;
    use serde_json::json;

    fn client(transport: Arc<FakeTransport>, token: Option<&str>) -> ApiClient {
        let storage = Arc::new(match token {
            Some(token) => MemoryTokenStorage::with_token(token),
            None => MemoryTokenStorage::new(),
        });
        ApiClient::new(transport, Arc::new(SessionStore::restore(storage)))
    }

    #[tokio::test]
    async fn bearer_is_attached_only_with_a_token() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(HttpMethod::Get, "/courses", 200, json!([]));

        let anonymous = client(transport.clone(), None);
        let _: Vec<Value> = anonymous.execute(ApiRequest::get("/courses")).await.unwrap();
        let signed_in = client(transport.clone(), Some("tok-9"));
        let _: Vec<Value> = signed_in.execute(ApiRequest::get("/courses")).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].bearer, None);
        assert_eq!(requests[1].bearer.as_deref(), Some("tok-9"));
    }

    #[rstest]
    #[case(404, json!({ "detail": "Course not found" }), PortError::NotFound("Course not found".into()))]
    #[case(401, json!({ "message": "Token expired" }), PortError::Unauthorized("Token expired".into()))]
    #[case(
        403,
        json!({ "detail": "Not enough permissions to update this course" }),
        PortError::Rejected { status: 403, message: Some("Not enough permissions to update this course".into()) }
    )]
    #[case(500, json!({ "error": "boom" }), PortError::Rejected { status: 500, message: Some("boom".into()) })]
    #[tokio::test]
    async fn non_success_statuses_map_to_typed_errors(
        #[case] status: u16,
        #[case] body: Value,
        #[case] expected: PortError,
    ) {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(HttpMethod::Get, "/courses/42", status, body);
        let result: PortResult<Value> = client(transport, None)
            .execute(ApiRequest::get("/courses/42"))
            .await;
        assert_eq!(result.unwrap_err(), expected);
    }

    #[tokio::test]
    async fn empty_body_decodes_as_unit() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond_empty(HttpMethod::Delete, "/modules/7", 204);
        let result: PortResult<()> = client(transport, None)
            .execute(ApiRequest::new(HttpMethod::Delete, "/modules/7"))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn transport_failures_pass_through() {
        let transport = Arc::new(FakeTransport::new());
        transport.fail(
            HttpMethod::Get,
            "/courses",
            PortError::Unreachable("request timed out".to_string()),
        );
        let result: PortResult<Value> = client(transport, None)
            .execute(ApiRequest::get("/courses"))
            .await;
        assert!(matches!(result, Err(PortError::Unreachable(_))));
    }

    #[test]
    fn plain_text_error_bodies_are_kept() {
        assert_eq!(
            server_message(b"  Bad Gateway \n").as_deref(),
            Some("Bad Gateway")
        );
        assert_eq!(server_message(b""), None);
    }
}
