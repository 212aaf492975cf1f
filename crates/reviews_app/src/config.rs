use std::fs;
use std::path::{Path, PathBuf};

use engine_logging::{engine_info, engine_warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILENAME: &str = "reviews.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 390.0,
            height: 844.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Reviews endpoint; pages are requested with `offset` and `limit` query parameters.
    pub endpoint: Option<String>,
    pub page_limit: usize,
    pub max_concurrent_fetches: usize,
    /// Pixel-byte budget for the image cache. `None` leaves it unbounded.
    pub cache_max_bytes: Option<usize>,
    pub viewport: Viewport,
    /// Give up after this many page requests.
    pub max_pages: usize,
    /// Seconds without a state change before the session is considered idle.
    pub idle_timeout_secs: u64,
    pub log_file: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            page_limit: reviews_core::DEFAULT_PAGE_LIMIT,
            max_concurrent_fetches: 10,
            cache_max_bytes: None,
            viewport: Viewport::default(),
            max_pages: 100,
            idle_timeout_secs: 30,
            log_file: None,
        }
    }
}

/// Loads the config at `path`. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<SessionConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            engine_warn!("Config {:?} not found, using defaults", path);
            return Ok(SessionConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let config = ron::from_str(&content).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    engine_info!("Loaded config from {:?}", path);
    Ok(config)
}
