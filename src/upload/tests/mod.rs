//! Scenario tests for the upload driver.
//!
//! The fake server yields to the executor before answering, so several
//! requests are genuinely outstanding at once and settle out of index order.

mod driver_tests;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use serde_json::{Value, json};

use crate::error::HttpError;
use crate::services::{HttpClient, HttpRequest, RequestOptions, TransferProgress};
use crate::upload::CancellationToken;

/// Yield once to the executor.
pub(super) struct YieldNow(bool);

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.0 {
            Poll::Ready(())
        } else {
            self.0 = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

pub(super) fn yield_now() -> YieldNow {
    YieldNow(false)
}

type Script = Box<dyn Fn(&HttpRequest, u32) -> Result<Value, HttpError>>;

/// A request the fake server answered.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Answered {
    pub chunk: usize,
    pub file: String,
    pub ok: bool,
}

struct ActiveGuard<'a>(&'a Cell<usize>);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

/// Scripted in-process server.
pub(super) struct FakeServer {
    script: Script,
    /// Number of executor yields before answering a given chunk
    delay: Box<dyn Fn(usize) -> usize>,
    hang: bool,
    attempts: RefCell<HashMap<(String, usize), u32>>,
    active: Cell<usize>,
    max_active: Cell<usize>,
    answered: RefCell<Vec<Answered>>,
    requests: RefCell<Vec<HttpRequest>>,
    tokens: RefCell<Vec<CancellationToken>>,
}

impl FakeServer {
    /// Server answering with `script(request, attempt)`; attempts count from 1
    /// per `(file, chunk)`.
    pub fn new(script: impl Fn(&HttpRequest, u32) -> Result<Value, HttpError> + 'static) -> Self {
        Self {
            script: Box::new(script),
            delay: Box::new(|chunk| 1 + chunk % 3),
            hang: false,
            attempts: RefCell::new(HashMap::new()),
            active: Cell::new(0),
            max_active: Cell::new(0),
            answered: RefCell::new(Vec::new()),
            requests: RefCell::new(Vec::new()),
            tokens: RefCell::new(Vec::new()),
        }
    }

    pub fn always_ok() -> Self {
        Self::new(|request, _| Ok(json!({ "chunk": chunk_id(request) })))
    }

    pub fn always_failing() -> Self {
        Self::new(|_, _| Err(HttpError::Network("connection reset".to_string())))
    }

    /// Server that never answers.
    pub fn hanging() -> Self {
        let mut server = Self::always_ok();
        server.hang = true;
        server
    }

    pub fn with_delay(mut self, delay: impl Fn(usize) -> usize + 'static) -> Self {
        self.delay = Box::new(delay);
        self
    }

    pub fn active(&self) -> usize {
        self.active.get()
    }

    pub fn max_active(&self) -> usize {
        self.max_active.get()
    }

    pub fn answered(&self) -> Vec<Answered> {
        self.answered.borrow().clone()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    pub fn tokens(&self) -> Vec<CancellationToken> {
        self.tokens.borrow().clone()
    }
}

/// `X-Chunk-Id` of a request, 0 for multipart requests.
pub(super) fn chunk_id(request: &HttpRequest) -> usize {
    request
        .header("X-Chunk-Id")
        .and_then(|id| id.parse().ok())
        .unwrap_or(0)
}

fn file_name(request: &HttpRequest) -> String {
    match &request.body {
        crate::services::RequestBody::Multipart { file_name, .. } => file_name.clone(),
        _ => request.header("X-Content-Name").unwrap_or_default().to_string(),
    }
}

impl HttpClient for FakeServer {
    fn request(
        &self,
        request: HttpRequest,
        mut options: RequestOptions,
    ) -> LocalBoxFuture<'_, Result<Value, HttpError>> {
        async move {
            let chunk = chunk_id(&request);
            let file = file_name(&request);
            let attempt = {
                let mut attempts = self.attempts.borrow_mut();
                let count = attempts.entry((file.clone(), chunk)).or_insert(0);
                *count += 1;
                *count
            };
            self.requests.borrow_mut().push(request.clone());
            self.tokens.borrow_mut().push(options.cancel.clone());

            self.active.set(self.active.get() + 1);
            self.max_active
                .set(self.max_active.get().max(self.active.get()));
            let _active = ActiveGuard(&self.active);

            let total = request.body.len() as u64;
            if let Some(report) = options.on_upload_progress.as_mut() {
                report(TransferProgress::new(total / 2, total));
            }
            for _ in 0..(self.delay)(chunk) {
                yield_now().await;
            }
            if self.hang {
                futures::future::pending::<()>().await;
            }
            if options.cancel.is_cancelled() {
                return Err(HttpError::Canceled);
            }
            if let Some(report) = options.on_upload_progress.as_mut() {
                report(TransferProgress::new(total, total));
            }

            let result = (self.script)(&request, attempt);
            self.answered.borrow_mut().push(Answered {
                chunk,
                file,
                ok: result.is_ok(),
            });
            result
        }
        .boxed_local()
    }
}
