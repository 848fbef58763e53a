//! Chunked, resumable upload engine.
//!
//! Architecture:
//! 1. [`ChunkPlan`] splits a file into fixed-size byte ranges
//! 2. [`UploadSession`] tracks queue, in-flight set, progress and errors;
//!    it only changes through [`reduce`]
//! 3. [`Uploader`] dispatches chunk requests up to the concurrency cap,
//!    refills slots as requests settle and re-queues failed chunks until the
//!    retry budget runs out
//! 4. [`UploadBatch`] collects one [`UploadResult`] per file and hands them
//!    back in gallery order

mod batch;
mod chunk;
mod driver;
mod file;
mod session;

#[cfg(test)]
mod tests;

pub use batch::{UploadBatch, UploadResult};
pub use chunk::{ChunkPlan, chunk_headers, chunk_request, encode_file_name, multipart_request};
pub use driver::{UploadedFile, Uploader};
pub use file::{FileKey, UploadFile};
pub use session::{
    CompletedChunk, SessionAction, SessionStatus, TransferMode, UNACKNOWLEDGED_PROGRESS_CAP,
    UploadSession, reduce,
};
pub use tokio_util::sync::CancellationToken;
