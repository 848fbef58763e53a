//! Chunk planning and the chunk wire contract.

use std::collections::VecDeque;
use std::ops::Range;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::constants::headers;
use crate::error::UploadError;
use crate::services::{HttpRequest, Method, RequestBody};

use super::file::UploadFile;

/// Characters left unescaped, matching `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// URL-encode a file name for the `X-Content-Name` header.
pub fn encode_file_name(name: &str) -> String {
    utf8_percent_encode(name, URI_COMPONENT).to_string()
}

/// How a file splits into fixed-size byte chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    file_size: u64,
    chunk_size: u64,
    chunks_total: usize,
}

impl ChunkPlan {
    /// Plan chunks of `chunk_size` bytes over a file of `file_size` bytes.
    pub fn new(file_size: u64, chunk_size: u64) -> Result<Self, UploadError> {
        if file_size == 0 {
            return Err(UploadError::EmptyFile);
        }
        if chunk_size == 0 {
            return Err(UploadError::InvalidChunkSize);
        }
        Ok(Self {
            file_size,
            chunk_size,
            chunks_total: file_size.div_ceil(chunk_size) as usize,
        })
    }

    /// A plan sending the whole file as one piece.
    pub fn whole(file_size: u64) -> Result<Self, UploadError> {
        Self::new(file_size, file_size)
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn chunks_total(&self) -> usize {
        self.chunks_total
    }

    /// Byte range of chunk `index`. The last chunk may be short.
    pub fn range(&self, index: usize) -> Range<u64> {
        let start = (index as u64 * self.chunk_size).min(self.file_size);
        let end = (start + self.chunk_size).min(self.file_size);
        start..end
    }

    /// Pending queue in dispatch order: highest index first.
    pub fn initial_queue(&self) -> VecDeque<usize> {
        (0..self.chunks_total).rev().collect()
    }
}

/// Wire headers for chunk `index` of `file` within session `identifier`.
pub fn chunk_headers(
    plan: &ChunkPlan,
    index: usize,
    identifier: &str,
    file: &UploadFile,
) -> Vec<(String, String)> {
    vec![
        (headers::CONTENT_TYPE.to_string(), headers::OCTET_STREAM.to_string()),
        (headers::CHUNK_ID.to_string(), index.to_string()),
        (
            headers::CHUNKS_TOTAL.to_string(),
            plan.chunks_total().to_string(),
        ),
        (headers::CONTENT_ID.to_string(), identifier.to_string()),
        (headers::CONTENT_LENGTH.to_string(), file.size().to_string()),
        (headers::CONTENT_NAME.to_string(), encode_file_name(file.name())),
    ]
}

/// Build the octet-stream request carrying chunk `index`.
pub fn chunk_request(
    url: &str,
    plan: &ChunkPlan,
    index: usize,
    identifier: &str,
    file: &UploadFile,
) -> HttpRequest {
    let range = plan.range(index);
    let body = file.bytes()[range.start as usize..range.end as usize].to_vec();
    let mut request = HttpRequest::new(Method::Post, url, RequestBody::Bytes(body));
    request.headers = chunk_headers(plan, index, identifier, file);
    request
}

/// Build the single multipart request for non-chunked uploads.
pub fn multipart_request(url: &str, field: &str, file: &UploadFile) -> HttpRequest {
    HttpRequest::new(
        Method::Post,
        url,
        RequestBody::Multipart {
            field: field.to_string(),
            file_name: file.name().to_string(),
            bytes: file.bytes().to_vec(),
        },
    )
}
