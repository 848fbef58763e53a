//! Capabilities the core consumes from its host.
//!
//! The upload and flip engines never reach for globals: transport, persistence
//! and authentication are injected through the traits in this module so they
//! can be exercised against fakes.

mod auth;
mod http;
mod store;

pub use auth::{AuthSession, NoAuth, RequestGuard, TokenGuard};
pub use http::{
    HttpClient, HttpRequest, Method, ProgressCallback, RequestBody, RequestOptions,
    TransferProgress,
};
#[cfg(not(target_arch = "wasm32"))]
pub use store::JsonFileStore;
pub use store::{KeyValueStore, MemoryStore, split_path};
