//! services/portal/src/api/mod.rs
//!
//! Binds the declarative endpoint definitions to the request decorator and the
//! query cache. Controllers talk to the backend only through `PortalApi`.

pub mod auth;
pub mod client;
pub mod courses;
pub mod endpoint;
pub mod lessons;
pub mod modules;
pub mod progress;

pub use client::ApiClient;
pub use endpoint::{MutationDef, QueryDef};

use crate::cache::{CachedValue, Fetcher, QueryCache, Subscription};
use crate::store::SessionStore;
use course_portal_core::ports::{ApiRequest, HttpTransport, PortResult};
use futures::FutureExt;
use serde::de::DeserializeOwned;
use std::sync::Arc;

#[derive(Clone)]
pub struct PortalApi {
    client: Arc<ApiClient>,
    cache: QueryCache,
}

impl PortalApi {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        session: Arc<SessionStore>,
        cache: QueryCache,
    ) -> Self {
        Self {
            client: Arc::new(ApiClient::new(transport, session)),
            cache,
        }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        self.client.session()
    }

    fn fetcher<T>(&self, request: ApiRequest) -> Fetcher
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let client = self.client.clone();
        Arc::new(move || {
            let client = client.clone();
            let request = request.clone();
            async move {
                client
                    .execute::<T>(request)
                    .await
                    .map(|value| Arc::new(value) as CachedValue)
            }
            .boxed()
        })
    }

    /// One-shot cached read.
    pub async fn fetch<T>(&self, def: QueryDef<T>) -> PortResult<Arc<T>>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let key = def.key();
        let fetcher = self.fetcher::<T>(def.request);
        self.cache.query(key, def.provides, fetcher).await
    }

    /// Subscribes to a query so it is kept and re-fetched on invalidation.
    pub fn watch<T>(&self, def: QueryDef<T>) -> Subscription<T>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let key = def.key();
        let fetcher = self.fetcher::<T>(def.request);
        self.cache.subscribe(key, def.provides, fetcher)
    }

    /// Sends a mutation; its tags are invalidated only if it succeeds.
    pub async fn run<T: DeserializeOwned>(&self, def: MutationDef<T>) -> PortResult<T> {
        self.cache
            .mutate(&def.invalidates, self.client.execute::<T>(def.request))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryTokenStorage;
    use crate::cache::QueryStatus;
    use crate::test_support::{course_json, module_json, progress_json, FakeTransport};
    use course_portal_core::domain::{CourseFilter, ModuleDraft};
    use course_portal_core::ports::HttpMethod;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    fn api(transport: Arc<FakeTransport>) -> PortalApi {
        let session = Arc::new(SessionStore::restore(Arc::new(
            MemoryTokenStorage::with_token("tok-1"),
        )));
        PortalApi::new(transport, session, QueryCache::default())
    }

    async fn settled<T: Send + Sync + 'static>(sub: &mut Subscription<T>) {
        timeout(Duration::from_secs(2), async {
            loop {
                let state = sub.state();
                if !state.is_loading() && !state.is_stale {
                    return;
                }
                sub.changed().await;
            }
        })
        .await
        .expect("query did not settle");
    }

    #[tokio::test]
    async fn concurrent_course_reads_share_one_request() {
        let transport = Arc::new(FakeTransport::with_delay(Duration::from_millis(30)));
        transport.respond(HttpMethod::Get, "/courses/42", 200, course_json("42", "Rust"));
        let api = api(transport.clone());

        let (a, b) = tokio::join!(
            api.fetch(courses::by_id("42")),
            api.fetch(courses::by_id("42"))
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(transport.count(HttpMethod::Get, "/courses/42"), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.title, "Rust");
    }

    #[tokio::test]
    async fn module_creation_refreshes_course_list_but_not_progress() {
        let transport = Arc::new(FakeTransport::new());
        transport
            .respond(HttpMethod::Get, "/courses", 200, json!([course_json("1", "Old")]))
            .respond(HttpMethod::Get, "/courses", 200, json!([course_json("1", "New")]))
            .respond(HttpMethod::Get, "/progress/courses", 200, json!([progress_json("1")]))
            .respond(HttpMethod::Post, "/courses/1/modules", 201, module_json("m9", "1", 3));
        let api = api(transport.clone());

        let mut list = api.watch(courses::list(&CourseFilter::default()));
        let mut progress = api.watch(progress::enrolled());
        settled(&mut list).await;
        settled(&mut progress).await;
        assert_eq!(list.state().data.unwrap()[0].title, "Old");

        let draft = ModuleDraft {
            title: "Ownership".to_string(),
            description: "Moves and borrows".to_string(),
            order: 3,
        };
        let created = api.run(modules::create("1", &draft).unwrap()).await.unwrap();
        assert_eq!(created.id, "m9");

        timeout(Duration::from_secs(2), async {
            while transport.count(HttpMethod::Get, "/courses") < 2 {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("course list was not re-fetched");
        settled(&mut list).await;
        assert_eq!(list.state().data.unwrap()[0].title, "New");

        assert_eq!(transport.count(HttpMethod::Get, "/progress/courses"), 1);
        assert_eq!(progress.state().status, QueryStatus::Success);
        assert!(!progress.state().is_stale);
        assert_eq!(
            transport.last_body(HttpMethod::Post, "/courses/1/modules"),
            Some(json!({ "title": "Ownership", "description": "Moves and borrows", "order": 3 }))
        );
    }

    #[tokio::test]
    async fn rejected_mutation_leaves_queries_alone() {
        let transport = Arc::new(FakeTransport::new());
        transport
            .respond(HttpMethod::Get, "/courses", 200, json!([]))
            .respond(
                HttpMethod::Delete,
                "/courses/5",
                403,
                json!({ "detail": "Not enough permissions" }),
            );
        let api = api(transport.clone());
        let mut list = api.watch(courses::list(&CourseFilter::default()));
        settled(&mut list).await;

        let result = api.run(courses::delete("5")).await;
        assert_eq!(result.unwrap_err().status(), Some(403));
        assert!(!list.state().is_stale);
        assert_eq!(transport.count(HttpMethod::Get, "/courses"), 1);
    }

    #[tokio::test]
    async fn queries_carry_the_session_token() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(HttpMethod::Get, "/progress/courses/7", 200, progress_json("7"));
        let api = api(transport.clone());

        let progress = api.fetch(progress::course("7")).await.unwrap();
        assert_eq!(progress.course_id, "7");
        assert_eq!(transport.requests()[0].bearer.as_deref(), Some("tok-1"));
    }
}
