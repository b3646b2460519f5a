//! services/portal/src/cache/mod.rs
//!
//! Client-side cache of backend data, invalidated by entity tags.

pub mod query;
pub mod store;
pub mod tags;

pub use query::{QueryKey, QueryState, QueryStatus};
pub use store::{CacheConfig, CachedValue, Fetcher, QueryCache, Subscription};
pub use tags::{Tag, TagRef};
