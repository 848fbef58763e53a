//! Async orchestration of an upload session.
//!
//! The driver runs on whatever single-threaded executor the host provides
//! (`wasm_bindgen_futures::spawn_local` in the browser, `block_on` in tests).
//! "Concurrency" means several outstanding request futures polled from one
//! task: admission control keeps at most `max_active_requests` of them alive
//! and refills a slot as soon as one settles.
//!
//! Dropping the future returned by [`Uploader::upload`] drops every in-flight
//! request and never touches the observer again.

use futures::channel::mpsc::{self, UnboundedSender};
use futures::future::{FutureExt, LocalBoxFuture, join_all};
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::{UploadConfig, UploadMode};
use crate::constants::{BYTES_PER_KB, headers};
use crate::error::{HttpError, UploadError};
use crate::services::{HttpClient, NoAuth, RequestGuard, RequestOptions, TransferProgress};

use super::batch::UploadBatch;
use super::chunk::{ChunkPlan, chunk_request, multipart_request};
use super::file::UploadFile;
use super::session::{
    CompletedChunk, SessionAction, SessionStatus, TransferMode, UploadSession, reduce,
};

type Settled = (usize, Result<Value, HttpError>);

/// A file the server fully acknowledged.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    /// Session token sent as `X-Content-Id`
    pub identifier: String,
    /// Response of the request that completed the upload
    pub data: Value,
    /// Every acknowledged chunk in completion order
    pub chunks: Vec<CompletedChunk>,
}

impl UploadedFile {
    fn from_session(session: &UploadSession) -> Self {
        Self {
            identifier: session.identifier().to_string(),
            data: session.final_response().cloned().unwrap_or(Value::Null),
            chunks: session.complete_chunks().to_vec(),
        }
    }
}

/// Uploads files through an [`HttpClient`], guarded by a [`RequestGuard`].
pub struct Uploader<C, G = NoAuth> {
    client: C,
    guard: G,
    config: UploadConfig,
}

impl<C: HttpClient> Uploader<C, NoAuth> {
    /// Uploader for anonymous endpoints.
    pub fn new(client: C, config: UploadConfig) -> Self {
        Self::with_guard(client, NoAuth, config)
    }
}

impl<C: HttpClient, G: RequestGuard> Uploader<C, G> {
    pub fn with_guard(client: C, guard: G, config: UploadConfig) -> Self {
        Self {
            client,
            guard,
            config,
        }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Upload `file`, resolving once it is complete, failed or canceled.
    pub async fn upload(
        &self,
        file: &UploadFile,
        cancel: &CancellationToken,
    ) -> Result<UploadedFile, UploadError> {
        self.upload_with(file, cancel, |_| {}).await
    }

    /// Like [`upload`](Self::upload), calling `observer` after every session
    /// transition.
    pub async fn upload_with<F>(
        &self,
        file: &UploadFile,
        cancel: &CancellationToken,
        mut observer: F,
    ) -> Result<UploadedFile, UploadError>
    where
        F: FnMut(&UploadSession),
    {
        let (plan, mode) = self.plan_for(file)?;
        if cancel.is_cancelled() {
            return Err(UploadError::Canceled);
        }

        let identifier = Uuid::new_v4().simple().to_string();
        log::info!(
            "Starting upload of {:?} ({} bytes, {} chunks) as {}",
            file.name(),
            file.size(),
            plan.chunks_total(),
            identifier
        );

        let mut session = reduce(
            UploadSession::new(
                self.config.max_active_requests,
                self.config.max_retries_on_error,
            ),
            SessionAction::Init {
                identifier,
                plan,
                mode,
            },
        );
        observer(&session);

        // Requests are aborted through a child token: the caller's cancel
        // reaches them, a failed file in a batch does not reach its siblings.
        let abort = cancel.child_token();
        let (progress_tx, mut progress_rx) = mpsc::unbounded::<(usize, TransferProgress)>();
        let mut in_flight: FuturesUnordered<LocalBoxFuture<'_, Settled>> = FuturesUnordered::new();
        let cancelled = cancel.cancelled().fuse();
        futures::pin_mut!(cancelled);

        loop {
            while let Some(chunk) = session.next_chunk() {
                session = reduce(session, SessionAction::Dispatch { chunk });
                observer(&session);
                log::debug!(
                    "Dispatching chunk {}/{} ({} active)",
                    chunk + 1,
                    plan.chunks_total(),
                    session.active_requests()
                );
                in_flight.push(self.send(
                    file,
                    plan,
                    mode,
                    chunk,
                    session.identifier().to_string(),
                    progress_tx.clone(),
                    abort.clone(),
                ));
            }

            match session.status() {
                SessionStatus::Complete => return Ok(UploadedFile::from_session(&session)),
                SessionStatus::Failed => {
                    abort.cancel();
                    return Err(session
                        .failure()
                        .cloned()
                        .unwrap_or(UploadError::Canceled));
                }
                SessionStatus::Canceled | SessionStatus::Idle => {
                    abort.cancel();
                    return Err(UploadError::Canceled);
                }
                SessionStatus::Uploading => {}
            }
            debug_assert!(!in_flight.is_empty(), "active session with nothing in flight");

            futures::select_biased! {
                _ = cancelled => {
                    abort.cancel();
                    session = reduce(session, SessionAction::Cancel);
                    observer(&session);
                    return Err(UploadError::Canceled);
                }
                update = progress_rx.next() => {
                    if let Some((chunk, progress)) = update {
                        log::trace!("Chunk {} at {:.1}%", chunk, progress.percent());
                        session = reduce(
                            session,
                            SessionAction::Progress { chunk, percent: progress.percent() },
                        );
                        observer(&session);
                    }
                }
                settled = in_flight.next() => {
                    if let Some((chunk, result)) = settled {
                        let action = match result {
                            Ok(response) => SessionAction::ChunkSucceeded { chunk, response },
                            Err(error) => SessionAction::ChunkFailed { chunk, error },
                        };
                        session = reduce(session, action);
                        observer(&session);
                    }
                }
            }
        }
    }

    /// Upload every file in `batch` that has no successful result yet.
    ///
    /// Files upload concurrently, each in its own session with its own
    /// request cap.
    pub async fn upload_batch(&self, batch: &mut UploadBatch, cancel: &CancellationToken) {
        let pending = batch.pending_files();
        log::info!("Uploading batch of {} files", pending.len());

        let uploads = pending.iter().map(|file| async move {
            let result = self.upload(file, cancel).await;
            (file.clone(), result)
        });
        for (file, result) in join_all(uploads).await {
            batch.record(file, result);
        }
    }

    fn plan_for(&self, file: &UploadFile) -> Result<(ChunkPlan, TransferMode), UploadError> {
        match &self.config.mode {
            UploadMode::Chunked { chunk_size_kb } => {
                let chunk_size = chunk_size_kb
                    .checked_mul(BYTES_PER_KB)
                    .ok_or(UploadError::InvalidChunkSize)?;
                Ok((ChunkPlan::new(file.size(), chunk_size)?, TransferMode::Chunked))
            }
            UploadMode::Whole { .. } => Ok((ChunkPlan::whole(file.size())?, TransferMode::Whole)),
        }
    }

    #[expect(clippy::too_many_arguments)]
    fn send<'a>(
        &'a self,
        file: &'a UploadFile,
        plan: ChunkPlan,
        mode: TransferMode,
        chunk: usize,
        identifier: String,
        progress: UnboundedSender<(usize, TransferProgress)>,
        abort: CancellationToken,
    ) -> LocalBoxFuture<'a, Settled> {
        async move {
            let token = match self.guard.pre_request_guard().await {
                Ok(token) => token,
                Err(e) => return (chunk, Err(e)),
            };

            let endpoint = &self.config.endpoint;
            let mut request = match (&self.config.mode, mode) {
                (UploadMode::Whole { field_name }, TransferMode::Whole) => {
                    multipart_request(endpoint, field_name, file)
                }
                _ => chunk_request(endpoint, &plan, chunk, &identifier, file),
            };
            if let Some(token) = token {
                request = request.with_header(headers::AUTHORIZATION, format!("Bearer {}", token));
            }

            let options = RequestOptions::new(abort).with_progress(Box::new(move |update| {
                // Receiver is gone once the session ended; late ticks are moot.
                let _ = progress.unbounded_send((chunk, update));
            }));
            (chunk, self.client.request(request, options).await)
        }
        .boxed_local()
    }
}
