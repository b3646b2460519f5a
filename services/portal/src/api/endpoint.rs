//! services/portal/src/api/endpoint.rs
//!
//! Declarative endpoint descriptions. A definition carries the request to send
//! and the cache tags it provides (queries) or invalidates (mutations); binding
//! it to a client and cache happens in `PortalApi`.

use crate::cache::{QueryKey, TagRef};
use course_portal_core::ports::{ApiRequest, PortError, PortResult};
use serde::Serialize;
use std::marker::PhantomData;

/// A read endpoint whose decoded response is `T`.
#[derive(Debug, Clone)]
pub struct QueryDef<T> {
    pub request: ApiRequest,
    pub provides: Vec<TagRef>,
    _response: PhantomData<fn() -> T>,
}

impl<T> QueryDef<T> {
    pub fn new(request: ApiRequest, provides: Vec<TagRef>) -> Self {
        Self {
            request,
            provides,
            _response: PhantomData,
        }
    }

    /// Cache identity: verb, path and query parameters.
    pub fn key(&self) -> QueryKey {
        QueryKey::new(
            format!("{} {}", self.request.method, self.request.path),
            self.request.query.clone(),
        )
    }
}

/// A write endpoint whose decoded response is `T`.
#[derive(Debug, Clone)]
pub struct MutationDef<T> {
    pub request: ApiRequest,
    pub invalidates: Vec<TagRef>,
    _response: PhantomData<fn() -> T>,
}

impl<T> MutationDef<T> {
    pub fn new(request: ApiRequest, invalidates: Vec<TagRef>) -> Self {
        Self {
            request,
            invalidates,
            _response: PhantomData,
        }
    }
}

/// Attaches `body` to `request` as JSON.
pub(crate) fn with_json<B: Serialize>(request: ApiRequest, body: &B) -> PortResult<ApiRequest> {
    let value = serde_json::to_value(body)
        .map_err(|e| PortError::Invalid(format!("cannot encode request body: {}", e)))?;
    Ok(request.with_body(value))
}

/// Percent-encodes an id for use as one path segment, so it cannot add
/// segments or a query string to the request.
pub(crate) fn segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}
