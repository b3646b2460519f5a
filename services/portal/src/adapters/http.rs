//! services/portal/src/adapters/http.rs
//!
//! This module contains the reqwest-backed adapter for the backend REST API.
//! It implements the `HttpTransport` port from the `core` crate and owns
//! transport details only: URL building, headers, timeout and network error mapping.

use async_trait::async_trait;
use course_portal_core::ports::{
    ApiRequest, ApiResponse, HttpMethod, HttpTransport, PortError, PortResult,
};
use reqwest::{header, Client, Method};
use std::time::Duration;
use tracing::{debug, warn};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `HttpTransport` port using `reqwest`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Creates a new `ReqwestTransport` with a client-wide request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// Every failure to obtain a response is reported as `Unreachable`; a timeout is
/// called out in the message so callers can tell it apart in logs.
fn map_transport_error(error: reqwest::Error) -> PortError {
    if error.is_timeout() {
        PortError::Unreachable(format!("request timed out: {}", error))
    } else if error.is_connect() {
        PortError::Unreachable(format!("connection failed: {}", error))
    } else {
        PortError::Unreachable(error.to_string())
    }
}

//=========================================================================================
// `HttpTransport` Trait Implementation
//=========================================================================================

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> PortResult<ApiResponse> {
        let url = self.url_for(&request.path);
        debug!("{} {}", request.method, url);

        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), &url)
            .header(header::ACCEPT, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = request.bearer.as_deref() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = request.body.as_ref() {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!("{} {} failed: {}", request.method, url, e);
            map_transport_error(e)
        })?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_transport_error)?;
        debug!("{} {} -> {}", request.method, url, status);

        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn paths_are_joined_onto_the_base_url() {
        let transport =
            ReqwestTransport::new("http://localhost:8000/api/v1/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            transport.url_for("/courses/42"),
            "http://localhost:8000/api/v1/courses/42"
        );
        assert_eq!(
            transport.url_for("auth/me"),
            "http://localhost:8000/api/v1/auth/me"
        );
    }

    #[tokio::test]
    async fn unreachable_backend_surfaces_as_unreachable() {
        // Port 9 (discard) on localhost is expected to refuse connections.
        let transport =
            ReqwestTransport::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let result = transport.send(ApiRequest::get("/courses")).await;
        assert!(matches!(result, Err(PortError::Unreachable(_))));
    }

    #[tokio::test]
    async fn silent_backend_times_out_as_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accepts connections and holds them open without ever answering.
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let transport =
            ReqwestTransport::new(format!("http://{}", addr), Duration::from_millis(100)).unwrap();
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            transport.send(ApiRequest::get("/courses")),
        )
        .await
        .expect("client timeout did not fire");

        match result {
            Err(PortError::Unreachable(message)) => assert!(message.contains("timed out"), "{}", message),
            other => panic!("expected Unreachable, got {:?}", other.map(|r| r.status)),
        }
        server.abort();
    }
}
