//! Dankbank - meme gallery upload and transition engine
//!
//! Two independent cores for a photo-gallery frontend:
//! - [`upload`]: chunked, resumable file uploads with bounded concurrency,
//!   automatic retry and aggregated progress
//! - [`flip`] and [`gesture`]: FLIP shared-element transitions and the
//!   drag-to-dismiss physics of expanded items
//!
//! Host capabilities (HTTP, persistence, auth) come in through [`services`].

pub mod config;
pub mod constants;
pub mod cursor;
pub mod error;
pub mod flip;
pub mod gesture;
pub mod logging;
pub mod selection;
pub mod services;
pub mod upload;

pub use config::AppConfig;
pub use cursor::ArrayCursor;
pub use error::{ConfigError, HttpError, StoreError, UploadError};
pub use selection::SelectionSet;

// WASM entry point
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::*;
