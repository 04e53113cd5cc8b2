//! Configuration management for flightboard.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::assets::{AssetBase, LOCAL_HOST};
use crate::board::{BoardOptions, Cadences};
use crate::error::{Error, Result};
use crate::fetch::{DirectorySource, HttpSource, TextSource};
use crate::table::DEFAULT_STATUS_COLUMN;
use crate::view::Layout;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "flightboard";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "board.db";

/// Prefix of environment variables that override configuration.
const ENV_PREFIX: &str = "FLIGHTBOARD_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FLIGHTBOARD_`, sections split on `__`)
/// 2. TOML config file at `~/.config/flightboard/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the text resources are read from.
    pub source: SourceConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Periodic task cadences.
    pub cadence: CadenceConfig,
    /// Board geometry and asset configuration.
    pub board: BoardConfig,
    /// Flight table configuration.
    pub table: TableConfig,
}

/// Data source configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Directory holding the `.txt` resources.
    pub data_dir: PathBuf,
    /// Base URL serving `/data/<file>`. Takes precedence over `data_dir`.
    pub base_url: Option<String>,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/flightboard/board.db`
    pub database_path: Option<PathBuf>,
}

/// Cadence configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    /// Interval between progress refreshes in milliseconds.
    pub progress_refresh_ms: u64,
    /// Interval between flight status polls in seconds.
    pub status_poll_secs: u64,
    /// Interval between automatic table sorts in seconds.
    pub auto_sort_secs: u64,
    /// Interval between animation frames in milliseconds.
    pub animation_frame_ms: u64,
}

/// Board configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Width of the progress bar container in pixels.
    pub container_width: f64,
    /// Width of the aircraft marker in pixels.
    pub marker_width: f64,
    /// Host the board is served from.
    pub host: String,
    /// Image base URL used when `host` is `localhost`.
    pub local_base_url: String,
    /// Image base URL used otherwise.
    pub deployed_base_url: String,
}

/// Flight table configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// CSV file holding the flight table.
    pub path: Option<PathBuf>,
    /// Column used for the default and automatic sorts.
    pub status_column: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            base_url: None,
        }
    }
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            progress_refresh_ms: 2_000,
            status_poll_secs: 20,
            auto_sort_secs: 20,
            animation_frame_ms: 20,
        }
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        let assets = AssetBase::default();
        let layout = Layout::default();
        Self {
            container_width: layout.container_width,
            marker_width: layout.marker_width,
            host: LOCAL_HOST.to_string(),
            local_base_url: assets.local,
            deployed_base_url: assets.deployed,
        }
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            path: None,
            status_column: DEFAULT_STATUS_COLUMN,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let cadences = [
            ("progress_refresh_ms", self.cadence.progress_refresh_ms),
            ("status_poll_secs", self.cadence.status_poll_secs),
            ("auto_sort_secs", self.cadence.auto_sort_secs),
            ("animation_frame_ms", self.cadence.animation_frame_ms),
        ];
        for (name, value) in cadences {
            if value == 0 {
                return Err(invalid(format!("{name} must be greater than 0")));
            }
        }

        if !(self.board.container_width.is_finite() && self.board.container_width > 0.0) {
            return Err(invalid(format!(
                "container_width must be positive, got {}",
                self.board.container_width
            )));
        }
        if !(self.board.marker_width.is_finite() && self.board.marker_width > 0.0) {
            return Err(invalid(format!(
                "marker_width must be positive, got {}",
                self.board.marker_width
            )));
        }

        for (name, url) in [
            ("local_base_url", Some(&self.board.local_base_url)),
            ("deployed_base_url", Some(&self.board.deployed_base_url)),
            ("source.base_url", self.source.base_url.as_ref()),
        ] {
            if let Some(url) = url {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(invalid(format!("{name} must be an http(s) URL: {url}")));
                }
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Build the configured data source.
    #[must_use]
    pub fn make_source(&self) -> Arc<dyn TextSource> {
        match &self.source.base_url {
            Some(url) => Arc::new(HttpSource::new(url.clone())),
            None => Arc::new(DirectorySource::new(self.source.data_dir.clone())),
        }
    }

    /// Board geometry.
    #[must_use]
    pub fn layout(&self) -> Layout {
        Layout {
            container_width: self.board.container_width,
            marker_width: self.board.marker_width,
        }
    }

    /// Task cadences as durations.
    #[must_use]
    pub fn cadences(&self) -> Cadences {
        Cadences {
            progress_refresh: Duration::from_millis(self.cadence.progress_refresh_ms),
            status_poll: Duration::from_secs(self.cadence.status_poll_secs),
            auto_sort: Duration::from_secs(self.cadence.auto_sort_secs),
            animation_frame: Duration::from_millis(self.cadence.animation_frame_ms),
        }
    }

    /// Options for [`crate::board::Board`].
    #[must_use]
    pub fn board_options(&self) -> BoardOptions {
        BoardOptions {
            cadences: self.cadences(),
            host: self.board.host.clone(),
            assets: AssetBase {
                local: self.board.local_base_url.clone(),
                deployed: self.board.deployed_base_url.clone(),
            },
            table_path: self.table.path.clone(),
            status_column: self.table.status_column,
        }
    }
}

fn invalid(message: String) -> Error {
    Error::ConfigValidation { message }
}
