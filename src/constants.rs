//! Global constants for Dankbank

/// Default chunk size in kilobytes for chunked uploads.
pub const DEFAULT_CHUNK_SIZE_KB: u64 = 330;

/// Bytes per kilobyte used when converting chunk sizes.
pub const BYTES_PER_KB: u64 = 1024;

/// Default cap on concurrently outstanding chunk requests.
pub const DEFAULT_MAX_ACTIVE_REQUESTS: usize = 4;

/// Default number of recorded errors after which a session is abandoned.
pub const DEFAULT_MAX_RETRIES_ON_ERROR: u32 = 4;

/// Default multipart field name for non-chunked uploads.
pub const DEFAULT_UPLOAD_FIELD: &str = "file";

/// Default upload endpoint.
pub const DEFAULT_UPLOAD_ENDPOINT: &str = "/api/upload";

/// Wire headers sent with every chunk request.
pub mod headers {
    pub const CONTENT_TYPE: &str = "Content-Type";
    pub const OCTET_STREAM: &str = "application/octet-stream";
    pub const CHUNK_ID: &str = "X-Chunk-Id";
    pub const CHUNKS_TOTAL: &str = "X-Chunks-Total";
    pub const CONTENT_ID: &str = "X-Content-Id";
    pub const CONTENT_LENGTH: &str = "X-Content-Length";
    pub const CONTENT_NAME: &str = "X-Content-Name";
    pub const AUTHORIZATION: &str = "Authorization";
}

/// Movement (px) a pointer must exceed before a drag counts as intentional.
pub const DEFAULT_INTENT_THRESHOLD_PX: f64 = 12.0;

/// Total movement (px) under which a release counts as a tap.
pub const DEFAULT_TAP_THRESHOLD_PX: f64 = 2.0;

/// Vertical bounds of the dismiss drag. The max is the dismiss stop.
pub const DEFAULT_DRAG_BOUNDS: (f64, f64) = (0.0, 150.0);

/// Scale an expanded item shrinks to at the dismiss stop.
pub const DEFAULT_MIN_DRAG_SCALE: f64 = 0.75;

/// Damping constant for rubber-banding past the drag bounds.
pub const RUBBER_BAND_CONSTANT: f64 = 0.15;

/// Deceleration rates for release projection.
pub mod deceleration {
    pub const NORMAL: f64 = 0.998;
    pub const FAST: f64 = 0.99;
}

/// Velocity (px/ms) under which a dismissing item counts as settled.
pub const DEFAULT_SETTLE_VELOCITY: f64 = 0.05;

/// Largest frame delta (seconds) fed to spring integration.
pub const MAX_FRAME_DT: f64 = 0.033;

/// Data attribute used to tag flip-able elements in the DOM.
pub const FLIP_KEY_ATTRIBUTE: &str = "data-flip-key";
