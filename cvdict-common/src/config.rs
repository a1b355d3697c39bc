//! Configuration loading and root folder resolution
//!
//! Bootstrap settings come from a small TOML file. Every value can be
//! overridden from the command line, and store locations are resolved into
//! explicit paths before any component is constructed.
//!
//! # Resolution order
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "CVDICT_ROOT";

/// Default Primary Store file name inside the root folder
pub const PRIMARY_DB_FILE: &str = "chinese_vietnamese_dict.db";

/// Default Source Store file name inside the root folder
pub const SOURCE_DB_FILE: &str = "cedict.db";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Folder holding both stores and generated reports
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Primary Store path (relative paths are resolved against the root folder)
    #[serde(default)]
    pub primary_db: Option<PathBuf>,

    /// Source Store path (relative paths are resolved against the root folder)
    #[serde(default)]
    pub source_db: Option<PathBuf>,

    /// Where completion reports are written (defaults to the root folder)
    #[serde(default)]
    pub report_dir: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub enrichment: EnrichmentConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
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

/// Generative API settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnrichmentConfig {
    /// Chat-completions endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Bearer credential (lowest priority source)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Minimum delay between two API calls
    #[serde(default = "default_request_interval_ms")]
    pub request_interval_ms: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            model: default_model(),
            api_key: None,
            request_interval_ms: default_request_interval_ms(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_api_url() -> String {
    "https://api.deepseek.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

fn default_request_interval_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_temperature() -> f32 {
    0.3
}

impl TomlConfig {
    /// Load configuration
    ///
    /// An explicitly requested file must exist and parse. Without an explicit
    /// path the platform config file is tried, and its absence yields defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return Self::from_file(path);
        }

        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            Some(path) => {
                debug!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => {
                warn!("Could not determine config directory, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }
}

/// Platform config file location (`<config_dir>/cvdict/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cvdict").join("config.toml"))
}

/// Resolve the root folder following the documented priority order
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// OS-dependent default root folder
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("cvdict"))
        .unwrap_or_else(|| PathBuf::from("./cvdict_data"))
}

/// Fully resolved store and report locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub root_folder: PathBuf,
    pub primary_db: PathBuf,
    pub source_db: PathBuf,
    pub report_dir: PathBuf,
}

impl StorePaths {
    /// Resolve store paths: CLI override, then TOML, then root-relative default
    pub fn resolve(
        root_folder: PathBuf,
        toml_config: &TomlConfig,
        primary_override: Option<&Path>,
        source_override: Option<&Path>,
    ) -> Self {
        let anchor = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                root_folder.join(p)
            }
        };

        let primary_db = primary_override
            .map(Path::to_path_buf)
            .or_else(|| toml_config.primary_db.as_deref().map(anchor))
            .unwrap_or_else(|| root_folder.join(PRIMARY_DB_FILE));

        let source_db = source_override
            .map(Path::to_path_buf)
            .or_else(|| toml_config.source_db.as_deref().map(anchor))
            .unwrap_or_else(|| root_folder.join(SOURCE_DB_FILE));

        let report_dir = toml_config
            .report_dir
            .as_deref()
            .map(anchor)
            .unwrap_or_else(|| root_folder.clone());

        Self {
            root_folder,
            primary_db,
            source_db,
            report_dir,
        }
    }
}
