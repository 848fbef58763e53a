//! Abstract HTTP transport.

use futures::future::LocalBoxFuture;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::HttpError;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// Body of an outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    /// Raw bytes, sent as-is
    Bytes(Vec<u8>),
    /// Single-file multipart form
    Multipart {
        field: String,
        file_name: String,
        bytes: Vec<u8>,
    },
}

impl RequestBody {
    /// Number of payload bytes carried by this body.
    pub fn len(&self) -> usize {
        match self {
            RequestBody::Empty => 0,
            RequestBody::Bytes(bytes) | RequestBody::Multipart { bytes, .. } => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A fully described outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>, body: RequestBody) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body,
        }
    }

    /// Append a header, keeping insertion order.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Upload progress reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub loaded: u64,
    pub total: u64,
}

impl TransferProgress {
    pub fn new(loaded: u64, total: u64) -> Self {
        Self { loaded, total }
    }

    /// Percent transferred in `[0, 100]`. An unknown total reports 0.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.loaded as f64 / self.total as f64 * 100.0).clamp(0.0, 100.0)
    }
}

/// Callback receiving upload progress for a single request.
pub type ProgressCallback = Box<dyn FnMut(TransferProgress)>;

/// Per-request options: cancellation and progress reporting.
pub struct RequestOptions {
    pub cancel: CancellationToken,
    pub on_upload_progress: Option<ProgressCallback>,
}

impl RequestOptions {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            on_upload_progress: None,
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_upload_progress = Some(callback);
        self
    }
}

/// Transport capability used by the upload engine.
///
/// Implementations must stop sending once `options.cancel` fires and should
/// report upload progress through `options.on_upload_progress` when they can.
/// Dropping the returned future also aborts the request.
pub trait HttpClient {
    fn request(
        &self,
        request: HttpRequest,
        options: RequestOptions,
    ) -> LocalBoxFuture<'_, Result<Value, HttpError>>;
}

impl<T: HttpClient + ?Sized> HttpClient for &T {
    fn request(
        &self,
        request: HttpRequest,
        options: RequestOptions,
    ) -> LocalBoxFuture<'_, Result<Value, HttpError>> {
        (**self).request(request, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = HttpRequest::new(Method::Post, "/upload", RequestBody::Empty)
            .with_header("X-Chunk-Id", "3");
        assert_eq!(request.header("x-chunk-id"), Some("3"));
        assert_eq!(request.header("X-Content-Id"), None);
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(TransferProgress::new(50, 200).percent(), 25.0);
        assert_eq!(TransferProgress::new(10, 0).percent(), 0.0);
        assert_eq!(TransferProgress::new(300, 200).percent(), 100.0);
    }
}
