//! Configuration management for egw-library
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use crate::render::PdfOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Full-text search configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// PDF export configuration
    #[serde(default)]
    pub pdf: PdfConfig,

    /// Background job configuration
    #[serde(default)]
    pub jobs: JobsConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file name, relative to the base directory
    #[serde(default = "default_database_file")]
    pub file: String,

    /// Connection pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Results returned when the caller gives no limit
    #[serde(default = "default_search_limit")]
    pub default_limit: u32,

    /// Upper bound on results per request
    #[serde(default = "default_search_max_limit")]
    pub max_limit: u32,

    /// Snippet width in tokens (FTS5 accepts 1..=64)
    #[serde(default = "default_snippet_tokens")]
    pub snippet_tokens: u32,

    /// Marker inserted before each matched term
    #[serde(default = "default_highlight_start")]
    pub highlight_start: String,

    /// Marker inserted after each matched term
    #[serde(default = "default_highlight_end")]
    pub highlight_end: String,
}

/// PDF export configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PdfConfig {
    /// Layout used when a request does not supply one
    #[serde(default)]
    pub layout: PdfOptions,

    /// Directory for generated files (defaults to `<base>/exports`)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

/// Background job configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Job records older than this are swept
    #[serde(default = "default_job_max_age_hours")]
    pub max_age_hours: u64,

    /// Interval between sweeps
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl JobsConfig {
    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::hours(self.max_age_hours as i64)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    pub base_dir: PathBuf,
    pub config_file: PathBuf,
    pub db_file: PathBuf,
    pub export_dir: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            file: default_database_file(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_search_limit(),
            max_limit: default_search_max_limit(),
            snippet_tokens: default_snippet_tokens(),
            highlight_start: default_highlight_start(),
            highlight_end: default_highlight_end(),
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            max_age_hours: default_job_max_age_hours(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl Config {
    /// Get the default base directory (~/.egw-library)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".egw-library")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Resolve internal paths against a base directory
    pub fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = self.paths_for(&base, base.join("config.toml"));
    }

    fn paths_for(&self, base: &Path, config_file: PathBuf) -> PathsConfig {
        PathsConfig {
            config_file,
            db_file: base.join(&self.database.file),
            export_dir: self
                .pdf
                .output_dir
                .clone()
                .unwrap_or_else(|| base.join("exports")),
            base_dir: base.to_path_buf(),
        }
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf();
        config.paths = config.paths_for(&base, config_path.to_path_buf());

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a base directory, falling back to defaults
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            return Self::load(&config.paths.config_file.clone());
        }

        debug!("No config file found, using defaults");
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.database.max_connections == 0 {
            return Err(Error::Config(
                "database.max_connections must be positive".to_string(),
            ));
        }

        if self.search.default_limit > self.search.max_limit {
            return Err(Error::Config(
                "search.default_limit must be <= search.max_limit".to_string(),
            ));
        }

        if !(1..=64).contains(&self.search.snippet_tokens) {
            return Err(Error::Config(
                "search.snippet_tokens must be between 1 and 64".to_string(),
            ));
        }

        if self.jobs.sweep_interval_secs == 0 {
            return Err(Error::Config(
                "jobs.sweep_interval_secs must be positive".to_string(),
            ));
        }

        self.pdf
            .layout
            .validate()
            .map_err(|e| Error::Config(format!("pdf.layout: {}", e)))?;

        Ok(())
    }
}
