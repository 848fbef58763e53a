//! Upload session state and its reducer.
//!
//! All mutation of a session goes through [`reduce`], a pure function from
//! `(state, action)` to the next state. The driver feeds it actions as
//! requests are dispatched and settle; nothing else touches the queue or the
//! in-flight set, which keeps admission control intact no matter how quickly
//! callbacks arrive.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde_json::Value;

use crate::error::{HttpError, UploadError};

use super::chunk::ChunkPlan;

/// Highest percent a chunk reports before the server acknowledges it.
pub const UNACKNOWLEDGED_PROGRESS_CAP: f64 = 99.0;

/// How the file travels to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferMode {
    /// Octet-stream chunk requests; failed chunks go to the back of the queue
    #[default]
    Chunked,
    /// One multipart request, retried in place
    Whole,
}

/// A chunk the server acknowledged.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedChunk {
    pub index: usize,
    pub response: Value,
}

/// Coarse lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Uploading,
    Complete,
    Canceled,
    Failed,
}

/// State of one file's upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadSession {
    identifier: String,
    mode: TransferMode,
    plan: Option<ChunkPlan>,
    chunks_queue: VecDeque<usize>,
    in_flight: BTreeSet<usize>,
    chunk_progress: BTreeMap<usize, f64>,
    max_active_requests: usize,
    error_count: u32,
    max_retries_on_error: u32,
    complete_chunks: Vec<CompletedChunk>,
    is_complete: bool,
    was_canceled: bool,
    last_error: Option<HttpError>,
    failure: Option<UploadError>,
}

/// Transitions of an [`UploadSession`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    /// Reset and plan a new transfer
    Init {
        identifier: String,
        plan: ChunkPlan,
        mode: TransferMode,
    },
    /// Move `chunk` from the queue into flight
    Dispatch { chunk: usize },
    /// Upload progress tick for an in-flight chunk
    Progress { chunk: usize, percent: f64 },
    /// Server acknowledged `chunk`
    ChunkSucceeded { chunk: usize, response: Value },
    /// Request for `chunk` failed; counts an error and restarts the chunk
    ChunkFailed { chunk: usize, error: HttpError },
    /// Caller canceled; drops queue and in-flight bookkeeping
    Cancel,
    /// Back to the empty state
    Reset,
}

impl UploadSession {
    /// Empty session with the given limits.
    pub fn new(max_active_requests: usize, max_retries_on_error: u32) -> Self {
        Self {
            identifier: String::new(),
            mode: TransferMode::default(),
            plan: None,
            chunks_queue: VecDeque::new(),
            in_flight: BTreeSet::new(),
            chunk_progress: BTreeMap::new(),
            max_active_requests: max_active_requests.max(1),
            error_count: 0,
            max_retries_on_error,
            complete_chunks: Vec::new(),
            is_complete: false,
            was_canceled: false,
            last_error: None,
            failure: None,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn mode(&self) -> TransferMode {
        self.mode
    }

    pub fn plan(&self) -> Option<&ChunkPlan> {
        self.plan.as_ref()
    }

    pub fn chunks_total(&self) -> usize {
        self.plan.map_or(0, |plan| plan.chunks_total())
    }

    pub fn chunks_queue(&self) -> &VecDeque<usize> {
        &self.chunks_queue
    }

    pub fn in_flight(&self) -> &BTreeSet<usize> {
        &self.in_flight
    }

    pub fn chunk_progress(&self) -> &BTreeMap<usize, f64> {
        &self.chunk_progress
    }

    /// Number of chunk requests currently outstanding.
    pub fn active_requests(&self) -> usize {
        self.in_flight.len()
    }

    pub fn max_active_requests(&self) -> usize {
        self.max_active_requests
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn max_retries_on_error(&self) -> u32 {
        self.max_retries_on_error
    }

    pub fn complete_chunks(&self) -> &[CompletedChunk] {
        &self.complete_chunks
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    pub fn was_canceled(&self) -> bool {
        self.was_canceled
    }

    pub fn last_error(&self) -> Option<&HttpError> {
        self.last_error.as_ref()
    }

    /// The fatal error that ended the session, if any.
    pub fn failure(&self) -> Option<&UploadError> {
        self.failure.as_ref()
    }

    pub fn status(&self) -> SessionStatus {
        if self.is_complete {
            SessionStatus::Complete
        } else if self.failure.is_some() {
            SessionStatus::Failed
        } else if self.was_canceled {
            SessionStatus::Canceled
        } else if self.plan.is_some() {
            SessionStatus::Uploading
        } else {
            SessionStatus::Idle
        }
    }

    /// Whether the session still accepts work.
    pub fn is_active(&self) -> bool {
        self.status() == SessionStatus::Uploading
    }

    /// Whether another request may be sent right now.
    pub fn can_dispatch(&self) -> bool {
        self.is_active()
            && !self.chunks_queue.is_empty()
            && self.in_flight.len() < self.max_active_requests
    }

    /// Next chunk the driver should dispatch, if a slot is free.
    pub fn next_chunk(&self) -> Option<usize> {
        if self.can_dispatch() {
            self.chunks_queue.front().copied()
        } else {
            None
        }
    }

    /// Aggregate file progress in `[0, 100]`.
    ///
    /// Sum of recorded chunk percentages over the chunk count. Only reaches
    /// 100 once every chunk is acknowledged. Not strictly monotonic: a failed
    /// chunk drops back to zero.
    pub fn progress(&self) -> f64 {
        if self.is_complete {
            return 100.0;
        }
        let total = self.chunks_total();
        if total == 0 {
            return 0.0;
        }
        let sum: f64 = self.chunk_progress.values().sum();
        (sum / total as f64).clamp(0.0, 100.0)
    }

    /// Response of the chunk that completed the upload.
    pub fn final_response(&self) -> Option<&Value> {
        if !self.is_complete {
            return None;
        }
        self.complete_chunks.last().map(|chunk| &chunk.response)
    }

    /// Each chunk index is queued, in flight, or complete, and never more
    /// than one of those; the in-flight set respects the cap.
    pub fn invariants_hold(&self) -> bool {
        if self.in_flight.len() > self.max_active_requests {
            return false;
        }
        let mut seen = BTreeSet::new();
        let completed = self.complete_chunks.iter().map(|chunk| chunk.index);
        self.chunks_queue
            .iter()
            .copied()
            .chain(self.in_flight.iter().copied())
            .chain(completed)
            .all(|index| seen.insert(index))
    }

    fn fail(&mut self, error: UploadError) {
        log::info!("Upload {} failed: {}", self.identifier, error);
        self.failure = Some(error);
        self.was_canceled = true;
        self.chunks_queue.clear();
        self.in_flight.clear();
    }
}

/// Apply `action` to `state`, returning the next state.
pub fn reduce(mut state: UploadSession, action: SessionAction) -> UploadSession {
    match action {
        SessionAction::Init {
            identifier,
            plan,
            mode,
        } => {
            let mut next = UploadSession::new(state.max_active_requests, state.max_retries_on_error);
            next.chunks_queue = plan.initial_queue();
            next.identifier = identifier;
            next.plan = Some(plan);
            next.mode = mode;
            return next;
        }
        SessionAction::Dispatch { chunk } => {
            if !state.can_dispatch() {
                log::trace!("Dispatch of chunk {} refused", chunk);
                return state;
            }
            if let Some(position) = state.chunks_queue.iter().position(|&c| c == chunk) {
                state.chunks_queue.remove(position);
                state.in_flight.insert(chunk);
            }
        }
        SessionAction::Progress { chunk, percent } => {
            if state.is_active() && state.in_flight.contains(&chunk) {
                let percent = percent.clamp(0.0, UNACKNOWLEDGED_PROGRESS_CAP);
                state.chunk_progress.insert(chunk, percent);
            }
        }
        SessionAction::ChunkSucceeded { chunk, response } => {
            if !state.is_active() || !state.in_flight.remove(&chunk) {
                log::trace!("Ignoring stale success for chunk {}", chunk);
                return state;
            }
            state.chunk_progress.insert(chunk, 100.0);
            state.complete_chunks.push(CompletedChunk {
                index: chunk,
                response,
            });
            if state.complete_chunks.len() == state.chunks_total() {
                state.is_complete = true;
                log::info!(
                    "Upload {} complete ({} chunks, {} errors)",
                    state.identifier,
                    state.chunks_total(),
                    state.error_count
                );
            }
        }
        SessionAction::ChunkFailed { chunk, error } => {
            if !state.is_active() || !state.in_flight.remove(&chunk) {
                log::trace!("Ignoring stale failure for chunk {}", chunk);
                return state;
            }
            state.chunk_progress.remove(&chunk);
            state.error_count += 1;
            state.last_error = Some(error.clone());

            if !error.is_retryable() {
                let fatal = match error {
                    HttpError::Unauthorized(reason) => UploadError::Unauthorized(reason),
                    _ => UploadError::Canceled,
                };
                state.fail(fatal);
            } else if state.error_count >= state.max_retries_on_error {
                let errors = state.error_count;
                state.fail(UploadError::RetriesExhausted {
                    errors,
                    last: error,
                });
            } else {
                log::warn!(
                    "Chunk {} of {} failed ({}/{} errors): {}",
                    chunk,
                    state.identifier,
                    state.error_count,
                    state.max_retries_on_error,
                    error
                );
                match state.mode {
                    TransferMode::Chunked => state.chunks_queue.push_back(chunk),
                    TransferMode::Whole => state.chunks_queue.push_front(chunk),
                }
            }
        }
        SessionAction::Cancel => {
            if state.is_complete || state.was_canceled {
                return state;
            }
            log::info!("Upload {} canceled", state.identifier);
            state.was_canceled = true;
            state.chunks_queue.clear();
            state.in_flight.clear();
        }
        SessionAction::Reset => {
            return UploadSession::new(state.max_active_requests, state.max_retries_on_error);
        }
    }

    debug_assert!(state.invariants_hold(), "session invariants violated");
    state
}
