//! Bootstrap configuration and root folder resolution
//!
//! The TOML file is optional. A missing or unreadable file degrades to
//! built-in defaults with a warning; it never stops startup.
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable consulted for the root folder
pub const ENV_ROOT_FOLDER: &str = "TPS_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "placements.db";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the placements database
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP port (CLI and environment take precedence)
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub geocoding: GeocodingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Search engine tuning
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Radius used when the caller has not chosen one
    #[serde(default = "default_radius_miles")]
    pub default_radius_miles: f64,

    /// Page size used when the request carries no valid limit
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    /// Number of result entries loaded per export batch
    #[serde(default = "default_export_batch_size")]
    pub export_batch_size: usize,

    /// Minutes a session's search state survives without a request
    #[serde(default = "default_session_idle_minutes")]
    pub session_idle_minutes: u64,

    /// Most sessions held in memory at once
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_radius_miles: default_radius_miles(),
            default_page_size: default_page_size(),
            export_batch_size: default_export_batch_size(),
            session_idle_minutes: default_session_idle_minutes(),
            max_sessions: default_max_sessions(),
        }
    }
}

/// Geocoding provider settings
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingConfig {
    /// Places API key; requests fail (and redirect to location entry) without one
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_geocoding_base_url")]
    pub base_url: String,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_geocoding_base_url(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_radius_miles() -> f64 {
    10.0
}

fn default_page_size() -> usize {
    25
}

fn default_export_batch_size() -> usize {
    1000
}

fn default_session_idle_minutes() -> u64 {
    240
}

fn default_max_sessions() -> usize {
    10_000
}

fn default_geocoding_base_url() -> String {
    "https://maps.googleapis.com/maps/api".to_string()
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load configuration, falling back to defaults when the file is absent or invalid
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path.map(Path::to_path_buf).or_else(default_config_path) else {
            info!("No config file location available, using built-in defaults");
            return Self::default();
        };

        if !path.exists() {
            warn!("Config file not found: {} (using defaults)", path.display());
            return Self::default();
        }

        match Self::load(&path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring config file {}: {} (using defaults)", path.display(), e);
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if !(self.search.default_radius_miles > 0.0) {
            return Err(Error::Config(
                "search.default_radius_miles must be positive".to_string(),
            ));
        }
        if self.search.default_page_size == 0 {
            return Err(Error::Config(
                "search.default_page_size must be at least 1".to_string(),
            ));
        }
        if self.search.export_batch_size == 0 {
            return Err(Error::Config(
                "search.export_batch_size must be at least 1".to_string(),
            ));
        }
        if self.search.session_idle_minutes == 0 || self.search.max_sessions == 0 {
            return Err(Error::Config(
                "search.session_idle_minutes and search.max_sessions must be at least 1"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Platform config file location (`<config dir>/tps/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tps").join("config.toml"))
}

/// Resolve the root folder following the priority order in the module docs
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    config: &TomlConfig,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Database file location inside a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE)
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("tps"))
        .unwrap_or_else(|| PathBuf::from("./tps_data"))
}
