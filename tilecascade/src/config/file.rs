//! INI configuration file.
//!
//! ```ini
//! [cache]
//! max_tiles = 256
//!
//! [fetch]
//! max_tries = 3
//! timeout_secs = 10      ; 0 disables the timeout
//! max_concurrent = 0     ; 0 is unbounded
//!
//! [viewport]
//! out_of_bounds = clip   ; clip | wrap
//! tile_size = 256
//!
//! [source]
//! url_template = https://tile.openstreetmap.org/{z}/{x}/{y}.png
//! user_agent = tilecascade
//!
//! [logging]
//! directory = logs
//! file = tilecascade.log
//! ```
//!
//! Missing sections and keys keep their defaults; unknown keys are ignored.

use super::defaults::{
    DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_LOG_DIR, DEFAULT_LOG_FILE, DEFAULT_MAX_CACHE_TILES,
    DEFAULT_MAX_TRIES, DEFAULT_TILE_SIZE,
};
use super::engine::EngineConfig;
use crate::viewport::OutOfBoundsPolicy;
use ini::Ini;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid INI
    #[error("Failed to parse config file: {0}")]
    Parse(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl From<ini::Error> for ConfigFileError {
    fn from(err: ini::Error) -> Self {
        match err {
            ini::Error::Io(e) => ConfigFileError::Io(e),
            ini::Error::Parse(e) => ConfigFileError::Parse(e.to_string()),
        }
    }
}

/// `[cache]` settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub max_tiles: usize,
}

/// `[fetch]` settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    pub max_tries: u32,
    /// Seconds per attempt; 0 means no timeout
    pub timeout_secs: u64,
    /// Concurrent fetch cap; 0 means unbounded
    pub max_concurrent: usize,
}

/// `[viewport]` settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewportSettings {
    pub out_of_bounds: OutOfBoundsPolicy,
    pub tile_size: u32,
}

/// `[source]` settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceSettings {
    pub url_template: Option<String>,
    pub user_agent: Option<String>,
}

/// `[logging]` settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub file: String,
}

/// The whole configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigFile {
    pub cache: CacheSettings,
    pub fetch: FetchSettings,
    pub viewport: ViewportSettings,
    pub source: SourceSettings,
    pub logging: LoggingSettings,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_tiles: DEFAULT_MAX_CACHE_TILES,
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_tries: DEFAULT_MAX_TRIES,
            timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            max_concurrent: 0,
        }
    }
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            out_of_bounds: OutOfBoundsPolicy::Clip,
            tile_size: DEFAULT_TILE_SIZE,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_LOG_DIR),
            file: DEFAULT_LOG_FILE.to_string(),
        }
    }
}

impl ConfigFile {
    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Parse configuration from INI text.
    pub fn from_ini_str(content: &str) -> Result<Self, ConfigFileError> {
        let ini = Ini::load_from_str(content).map_err(|e| ConfigFileError::Parse(e.to_string()))?;
        super::parser::parse_ini(&ini)
    }

    /// Build the engine configuration described by this file.
    pub fn engine_config(&self) -> EngineConfig {
        let timeout = match self.fetch.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let concurrency = match self.fetch.max_concurrent {
            0 => None,
            n => Some(n),
        };

        EngineConfig::new()
            .with_max_cache_tiles(self.cache.max_tiles)
            .with_max_tries(self.fetch.max_tries)
            .with_fetch_timeout(timeout)
            .with_max_concurrent_fetches(concurrency)
            .with_out_of_bounds(self.viewport.out_of_bounds)
    }
}
