//! Configuration for Dankbank.
//!
//! Settings serialize to JSON and persist through any
//! [`KeyValueStore`]: localStorage in the browser, a JSON file natively.

use serde::{Deserialize, Serialize};

use crate::constants::{
    BYTES_PER_KB, DEFAULT_CHUNK_SIZE_KB, DEFAULT_DRAG_BOUNDS, DEFAULT_INTENT_THRESHOLD_PX,
    DEFAULT_MAX_ACTIVE_REQUESTS, DEFAULT_MAX_RETRIES_ON_ERROR, DEFAULT_MIN_DRAG_SCALE,
    DEFAULT_SETTLE_VELOCITY, DEFAULT_TAP_THRESHOLD_PX, DEFAULT_UPLOAD_ENDPOINT,
    DEFAULT_UPLOAD_FIELD, RUBBER_BAND_CONSTANT, deceleration,
};
use crate::error::ConfigError;
use crate::services::KeyValueStore;

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Store path the configuration lives under.
pub const CONFIG_STORE_PATH: &str = "dankbank.config";

/// How files are sent to the upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum UploadMode {
    /// Octet-stream chunks of `chunk_size_kb` kilobytes
    Chunked { chunk_size_kb: u64 },
    /// One multipart request with the file under `field_name`
    Whole { field_name: String },
}

impl Default for UploadMode {
    fn default() -> Self {
        UploadMode::Chunked {
            chunk_size_kb: DEFAULT_CHUNK_SIZE_KB,
        }
    }
}

/// Upload engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub mode: UploadMode,

    /// Cap on outstanding chunk requests per file
    #[serde(default = "default_max_active_requests")]
    pub max_active_requests: usize,

    /// Errors tolerated before a file is abandoned
    #[serde(default = "default_max_retries_on_error")]
    pub max_retries_on_error: u32,
}

fn default_endpoint() -> String {
    DEFAULT_UPLOAD_ENDPOINT.to_string()
}

fn default_max_active_requests() -> usize {
    DEFAULT_MAX_ACTIVE_REQUESTS
}

fn default_max_retries_on_error() -> u32 {
    DEFAULT_MAX_RETRIES_ON_ERROR
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            mode: UploadMode::default(),
            max_active_requests: default_max_active_requests(),
            max_retries_on_error: default_max_retries_on_error(),
        }
    }
}

impl UploadConfig {
    /// Chunked uploads of `chunk_size_kb` to `endpoint`.
    pub fn chunked(endpoint: impl Into<String>, chunk_size_kb: u64) -> Self {
        Self {
            endpoint: endpoint.into(),
            mode: UploadMode::Chunked { chunk_size_kb },
            ..Self::default()
        }
    }

    /// Single multipart uploads to `endpoint`.
    pub fn whole(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            mode: UploadMode::Whole {
                field_name: DEFAULT_UPLOAD_FIELD.to_string(),
            },
            ..Self::default()
        }
    }

    pub fn with_limits(mut self, max_active_requests: usize, max_retries_on_error: u32) -> Self {
        self.max_active_requests = max_active_requests;
        self.max_retries_on_error = max_retries_on_error;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let UploadMode::Chunked { chunk_size_kb } = self.mode {
            if chunk_size_kb == 0 {
                return Err(ConfigError::Invalid("chunk_size_kb must be > 0".to_string()));
            }
            if chunk_size_kb.checked_mul(BYTES_PER_KB).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "chunk_size_kb {} is too large",
                    chunk_size_kb
                )));
            }
        }
        if self.max_active_requests == 0 {
            return Err(ConfigError::Invalid(
                "max_active_requests must be > 0".to_string(),
            ));
        }
        if self.max_retries_on_error == 0 {
            return Err(ConfigError::Invalid(
                "max_retries_on_error must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Drag-to-dismiss gesture settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureConfig {
    /// Movement before a drag counts as intentional
    #[serde(default = "default_intent_threshold")]
    pub intent_threshold_px: f64,

    /// Total movement under which a release is a tap
    #[serde(default = "default_tap_threshold")]
    pub tap_threshold_px: f64,

    /// Vertical `(min, max)` bounds; `max` is the dismiss stop
    #[serde(default = "default_bounds")]
    pub bounds: (f64, f64),

    /// Scale at the dismiss stop
    #[serde(default = "default_min_scale")]
    pub min_scale: f64,

    #[serde(default = "default_rubber_band_constant")]
    pub rubber_band_constant: f64,

    /// Deceleration used to project release velocity
    #[serde(default = "default_deceleration_rate")]
    pub deceleration_rate: f64,

    /// Velocity (px/ms) under which a dismissing item is settled
    #[serde(default = "default_settle_velocity")]
    pub settle_velocity: f64,
}

fn default_intent_threshold() -> f64 {
    DEFAULT_INTENT_THRESHOLD_PX
}

fn default_tap_threshold() -> f64 {
    DEFAULT_TAP_THRESHOLD_PX
}

fn default_bounds() -> (f64, f64) {
    DEFAULT_DRAG_BOUNDS
}

fn default_min_scale() -> f64 {
    DEFAULT_MIN_DRAG_SCALE
}

fn default_rubber_band_constant() -> f64 {
    RUBBER_BAND_CONSTANT
}

fn default_deceleration_rate() -> f64 {
    deceleration::FAST
}

fn default_settle_velocity() -> f64 {
    DEFAULT_SETTLE_VELOCITY
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            intent_threshold_px: default_intent_threshold(),
            tap_threshold_px: default_tap_threshold(),
            bounds: default_bounds(),
            min_scale: default_min_scale(),
            rubber_band_constant: default_rubber_band_constant(),
            deceleration_rate: default_deceleration_rate(),
            settle_velocity: default_settle_velocity(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration format
    pub version: u32,

    #[serde(default)]
    pub upload: UploadConfig,

    #[serde(default)]
    pub gesture: GestureConfig,

    #[serde(default)]
    pub log_level: LogLevel,
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            upload: UploadConfig::default(),
            gesture: GestureConfig::default(),
            log_level: LogLevel::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.check()
    }

    fn check(self) -> Result<Self, ConfigError> {
        if self.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: self.version,
                supported_version: CONFIG_VERSION,
            });
        }
        self.upload.validate()?;
        Ok(self)
    }

    /// Load from `store`, falling back to defaults when absent or unreadable.
    pub fn load_from_store(store: &impl KeyValueStore) -> Self {
        let value = match store.get(CONFIG_STORE_PATH) {
            Ok(Some(value)) => value,
            Ok(None) => {
                log::debug!("No stored configuration, using defaults");
                return Self::new();
            }
            Err(e) => {
                log::warn!("Failed to read stored configuration: {}", e);
                return Self::new();
            }
        };

        match serde_json::from_value::<Self>(value)
            .map_err(ConfigError::from)
            .and_then(Self::check)
        {
            Ok(config) => {
                log::info!("Loaded configuration from store");
                config
            }
            Err(e) => {
                log::warn!("Ignoring stored configuration: {}", e);
                Self::new()
            }
        }
    }

    /// Persist into `store`.
    pub fn save_to_store(&self, store: &mut impl KeyValueStore) -> Result<(), ConfigError> {
        store.set(CONFIG_STORE_PATH, serde_json::to_value(self)?)?;
        log::info!("Saved configuration");
        Ok(())
    }

    /// Default config file path for native builds.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<std::path::PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("dankbank").join("dankbank.json"))
        } else {
            dirs::home_dir().map(|home| home.join(".config").join("dankbank").join("dankbank.json"))
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}
