use std::cell::Cell;
use std::collections::BTreeSet;

use futures::FutureExt;
use futures::executor::block_on;
use futures::future::LocalBoxFuture;
use serde_json::json;

use super::{FakeServer, chunk_id};
use crate::config::UploadConfig;
use crate::error::{HttpError, UploadError};
use crate::services::{AuthSession, RequestBody, TokenGuard};
use crate::upload::{CancellationToken, SessionStatus, UploadFile, Uploader};

const MB: usize = 1024 * 1024;

fn meme(name: &str, size: usize) -> UploadFile {
    UploadFile::new(name, (0..size).map(|i| (i % 251) as u8).collect::<Vec<_>>())
}

#[test]
fn test_one_megabyte_scenario_with_single_retry() {
    // Chunk 2 fails on its first attempt only.
    let server = FakeServer::new(|request, attempt| {
        if chunk_id(request) == 2 && attempt == 1 {
            Err(HttpError::Network("flaky".to_string()))
        } else {
            Ok(json!({ "chunk": chunk_id(request) }))
        }
    });
    let uploader = Uploader::new(&server, UploadConfig::chunked("/api/upload", 330));
    let file = meme("big.png", MB);

    let mut first_wave = None;
    let mut last = None;
    let result = block_on(uploader.upload_with(&file, &CancellationToken::new(), |session| {
        if first_wave.is_none() && session.active_requests() == 4 {
            first_wave = Some(session.in_flight().clone());
        }
        last = Some(session.clone());
    }));

    let uploaded = result.unwrap();
    let session = last.unwrap();
    assert_eq!(session.chunks_total(), 4);
    assert_eq!(first_wave, Some(BTreeSet::from([0, 1, 2, 3])));
    assert_eq!(session.error_count(), 1);
    assert_eq!(session.complete_chunks().len(), 4);
    assert!(session.is_complete());
    assert_eq!(uploaded.chunks.len(), 4);
    assert_eq!(uploaded.identifier, session.identifier());
}

#[test]
fn test_successful_chunks_cover_every_index_once() {
    let server = FakeServer::always_ok().with_delay(|chunk| 1 + (chunk * 7) % 5);
    let uploader = Uploader::new(&server, UploadConfig::chunked("/api/upload", 1));
    let file = meme("tall.jpg", 10_000);

    block_on(uploader.upload(&file, &CancellationToken::new())).unwrap();

    let sent: Vec<usize> = server
        .answered()
        .iter()
        .filter(|answer| answer.ok)
        .map(|answer| answer.chunk)
        .collect();
    let unique: BTreeSet<usize> = sent.iter().copied().collect();
    assert_eq!(sent.len(), 10);
    assert_eq!(unique, (0..10).collect::<BTreeSet<_>>());

    // Settled out of index order, yet nothing was lost.
    let in_order: Vec<usize> = (0..10).rev().collect();
    assert_ne!(sent, in_order);
}

#[test]
fn test_concurrency_never_exceeds_cap() {
    let server = FakeServer::always_ok();
    let uploader = Uploader::new(&server, UploadConfig::chunked("/api/upload", 1));
    let file = meme("wide.gif", 20 * 1024);

    let mut max_session_active = 0;
    let mut invariants_ok = true;
    block_on(uploader.upload_with(&file, &CancellationToken::new(), |session| {
        max_session_active = max_session_active.max(session.active_requests());
        invariants_ok &= session.invariants_hold();
    }))
    .unwrap();

    assert_eq!(max_session_active, 4);
    assert_eq!(server.max_active(), 4);
    assert!(invariants_ok);
}

#[test]
fn test_custom_cap_is_respected() {
    let server = FakeServer::always_ok();
    let config = UploadConfig::chunked("/api/upload", 1).with_limits(2, 4);
    let uploader = Uploader::new(&server, config);

    block_on(uploader.upload(&meme("a.png", 8 * 1024), &CancellationToken::new())).unwrap();
    assert_eq!(server.max_active(), 2);
}

#[test]
fn test_always_failing_server_exhausts_retries_exactly() {
    let server = FakeServer::always_failing();
    let uploader = Uploader::new(&server, UploadConfig::chunked("/api/upload", 1));
    let file = meme("cursed.png", 10 * 1024);

    let mut max_errors = 0;
    let mut final_status = None;
    let result = block_on(uploader.upload_with(&file, &CancellationToken::new(), |session| {
        max_errors = max_errors.max(session.error_count());
        final_status = Some(session.status());
    }));

    assert_eq!(
        result,
        Err(UploadError::RetriesExhausted {
            errors: 4,
            last: HttpError::Network("connection reset".to_string()),
        })
    );
    assert_eq!(max_errors, 4);
    assert_eq!(final_status, Some(SessionStatus::Failed));
    assert_eq!(server.answered().iter().filter(|a| !a.ok).count(), 4);
    // Outstanding requests were dropped and their transport aborted.
    assert_eq!(server.active(), 0);
    assert!(server.tokens().iter().all(CancellationToken::is_cancelled));
}

#[test]
fn test_failed_chunk_retried_after_queued_chunks() {
    let server = FakeServer::new(|request, attempt| {
        if chunk_id(request) == 5 && attempt == 1 {
            Err(HttpError::Status {
                status: 503,
                body: String::new(),
            })
        } else {
            Ok(json!(null))
        }
    })
    .with_delay(|_| 1);
    let config = UploadConfig::chunked("/api/upload", 1).with_limits(1, 4);
    let uploader = Uploader::new(&server, config);

    block_on(uploader.upload(&meme("x.png", 6 * 1024), &CancellationToken::new())).unwrap();

    let order: Vec<usize> = server.requests().iter().map(chunk_id).collect();
    assert_eq!(order, vec![5, 4, 3, 2, 1, 0, 5]);
}

#[test]
fn test_client_error_status_spends_retry_budget() {
    let server = FakeServer::new(|_, _| {
        Err(HttpError::Status {
            status: 400,
            body: "bad".to_string(),
        })
    });
    let uploader = Uploader::new(&server, UploadConfig::chunked("/api/upload", 1));

    let mut max_errors = 0;
    let result = block_on(uploader.upload_with(&meme("doc.pdf", 4096), &CancellationToken::new(), |session| {
        max_errors = max_errors.max(session.error_count());
    }));

    assert!(matches!(
        result,
        Err(UploadError::RetriesExhausted {
            errors: 4,
            last: HttpError::Status { status: 400, .. },
        })
    ));
    assert_eq!(max_errors, 4);
    assert_eq!(server.answered().len(), 4);
}

#[test]
fn test_oversized_chunk_size_is_rejected() {
    let server = FakeServer::always_ok();
    let uploader = Uploader::new(&server, UploadConfig::chunked("/api/upload", u64::MAX / 2));

    let result = block_on(uploader.upload(&meme("huge.png", 2048), &CancellationToken::new()));
    assert_eq!(result, Err(UploadError::InvalidChunkSize));
    assert!(server.requests().is_empty());
}

#[test]
fn test_progress_stays_in_range_and_completes_at_100() {
    let server = FakeServer::always_ok();
    let uploader = Uploader::new(&server, UploadConfig::chunked("/api/upload", 2));
    let file = meme("progress.png", 9 * 1024);

    let mut samples = Vec::new();
    block_on(uploader.upload_with(&file, &CancellationToken::new(), |session| {
        samples.push((session.progress(), session.is_complete()));
    }))
    .unwrap();

    assert!(samples.iter().all(|(p, _)| (0.0..=100.0).contains(p)));
    for (progress, complete) in &samples {
        assert_eq!(*progress == 100.0, *complete);
    }
    assert_eq!(samples.last(), Some(&(100.0, true)));
    assert!(samples.iter().any(|(p, _)| *p > 0.0 && *p < 100.0));
}

#[test]
fn test_cancel_mid_flight_aborts_requests() {
    let server = FakeServer::hanging();
    let uploader = Uploader::new(&server, UploadConfig::chunked("/api/upload", 1));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let observed_after_cancel = Cell::new(0);

    let result = block_on(uploader.upload_with(&meme("slow.png", 10 * 1024), &cancel, |session| {
        if session.was_canceled() {
            observed_after_cancel.set(observed_after_cancel.get() + 1);
        }
        // Cancel once every dispatched request reached the transport.
        if server.requests().len() == 4 {
            trigger.cancel();
        }
    }));

    assert_eq!(result, Err(UploadError::Canceled));
    assert_eq!(server.requests().len(), 4);
    assert_eq!(server.active(), 0);
    assert!(server.tokens().iter().all(CancellationToken::is_cancelled));
    // Exactly one final canceled snapshot, nothing after it.
    assert_eq!(observed_after_cancel.get(), 1);

    // Canceling again is harmless.
    cancel.cancel();
}

#[test]
fn test_pre_canceled_token_sends_nothing() {
    let server = FakeServer::always_ok();
    let uploader = Uploader::new(&server, UploadConfig::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = block_on(uploader.upload(&meme("a.png", 10), &cancel));
    assert_eq!(result, Err(UploadError::Canceled));
    assert!(server.requests().is_empty());
}

#[test]
fn test_dropping_upload_future_aborts_requests() {
    let server = FakeServer::hanging();
    let uploader = Uploader::new(&server, UploadConfig::chunked("/api/upload", 1));
    let file = meme("teardown.png", 3 * 1024);
    let cancel = CancellationToken::new();

    {
        let mut upload = uploader.upload(&file, &cancel).boxed_local();
        for _ in 0..10 {
            assert!((&mut upload).now_or_never().is_none());
        }
        assert_eq!(server.active(), 3);
    }
    assert_eq!(server.active(), 0);
}

#[test]
fn test_empty_file_rejected() {
    let server = FakeServer::always_ok();
    let uploader = Uploader::new(&server, UploadConfig::default());

    let result = block_on(uploader.upload(&UploadFile::new("empty.png", Vec::new()), &CancellationToken::new()));
    assert_eq!(result, Err(UploadError::EmptyFile));
    assert!(server.requests().is_empty());
}

#[test]
fn test_whole_mode_retries_single_multipart_request() {
    let server = FakeServer::new(|_, attempt| {
        if attempt <= 2 {
            Err(HttpError::Network("timeout".to_string()))
        } else {
            Ok(json!({ "url": "/m/42.png" }))
        }
    });
    let uploader = Uploader::new(&server, UploadConfig::whole("/api/upload"));

    let uploaded = block_on(uploader.upload(&meme("whole.png", 2048), &CancellationToken::new())).unwrap();

    assert_eq!(uploaded.data, json!({ "url": "/m/42.png" }));
    let requests = server.requests();
    assert_eq!(requests.len(), 3);
    for request in &requests {
        assert!(request.header("X-Chunk-Id").is_none());
        assert!(matches!(
            &request.body,
            RequestBody::Multipart { field, file_name, bytes }
                if field == "file" && file_name == "whole.png" && bytes.len() == 2048
        ));
    }
}

struct StaticSession {
    token: Option<&'static str>,
}

impl AuthSession for StaticSession {
    fn current_access_token(&self) -> Option<String> {
        self.token.map(str::to_string)
    }

    fn is_valid(&self, _token: &str) -> bool {
        true
    }

    fn refresh(&self) -> LocalBoxFuture<'_, Result<String, HttpError>> {
        futures::future::ready(Err(HttpError::Network("offline".to_string()))).boxed_local()
    }
}

#[test]
fn test_requests_carry_bearer_token() {
    let server = FakeServer::always_ok();
    let guard = TokenGuard::new(StaticSession { token: Some("t0k3n") });
    let uploader = Uploader::with_guard(&server, guard, UploadConfig::chunked("/api/upload", 1));

    block_on(uploader.upload(&meme("auth.png", 2048), &CancellationToken::new())).unwrap();

    assert!(
        server
            .requests()
            .iter()
            .all(|r| r.header("Authorization") == Some("Bearer t0k3n"))
    );
}

#[test]
fn test_failed_refresh_is_fatal_without_sending() {
    let server = FakeServer::always_ok();
    let guard = TokenGuard::new(StaticSession { token: None });
    let uploader = Uploader::with_guard(&server, guard, UploadConfig::chunked("/api/upload", 1));

    let result = block_on(uploader.upload(&meme("auth.png", 2048), &CancellationToken::new()));
    assert!(matches!(result, Err(UploadError::Unauthorized(_))));
    assert!(server.requests().is_empty());
}
