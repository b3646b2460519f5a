//! services/portal/src/lib.rs
//!
//! Client core for the learning platform: session and UI state, the tag-driven
//! query cache, the backend API surface and the per-screen controllers.

pub mod adapters;
pub mod api;
pub mod cache;
pub mod config;
pub mod controllers;
pub mod error;
pub mod state;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;
