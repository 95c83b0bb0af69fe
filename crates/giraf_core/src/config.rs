//! Process configuration.
//!
//! # Responsibility
//! - Describe every tunable the core needs at startup in one value.
//! - Load that value from TOML once; callers pass it by reference.
//!
//! # Invariants
//! - No global mutable configuration exists; `GirafConfig` is plain data.
//! - Every field has a default, so an empty document is a valid config.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Startup configuration for the Giraf core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GirafConfig {
    /// SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Directory holding pictogram image files.
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,

    /// One of `trace|debug|info|warn|error`.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Absolute directory for rolling log files. Logging stays off when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Title of the public placeholder pictogram seeded at startup.
    #[serde(default = "default_pictogram_title")]
    pub default_pictogram_title: String,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("giraf.sqlite3")
}

fn default_image_dir() -> PathBuf {
    PathBuf::from("pictograms")
}

fn default_log_level() -> String {
    crate::logging::default_log_level().to_string()
}

fn default_pictogram_title() -> String {
    "default".to_string()
}

impl Default for GirafConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            image_dir: default_image_dir(),
            log_level: default_log_level(),
            log_dir: None,
            default_pictogram_title: default_pictogram_title(),
        }
    }
}

/// Configuration load/validation errors.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    Invalid(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::Invalid(reason) => write!(f, "invalid config: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl GirafConfig {
    /// Reads and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the core cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database_path must not be empty"));
        }
        if self.image_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("image_dir must not be empty"));
        }
        if self.default_pictogram_title.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "default_pictogram_title must not be blank",
            ));
        }
        if let Some(log_dir) = &self.log_dir {
            if !log_dir.is_absolute() {
                return Err(ConfigError::Invalid("log_dir must be an absolute path"));
            }
        }
        Ok(())
    }
}
