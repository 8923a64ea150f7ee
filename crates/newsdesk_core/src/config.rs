//! Runtime configuration for stores, auth and logging.
//!
//! # Invariants
//! - Every field has a default, so an empty JSON object is a valid config.
//! - Environment overrides are applied before validation.

use crate::logging::default_log_level;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_DB_PATH: &str = "NEWSDESK_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "NEWSDESK_LOG_LEVEL";

const DEFAULT_DB_FILE_NAME: &str = "newsdesk.sqlite3";
const DEFAULT_OBJECT_ROOT: &str = "objects";
const DEFAULT_COLLECTION: &str = "News";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
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

/// Settings for one newsdesk client instance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NewsdeskConfig {
    /// SQLite file backing the document collection.
    pub db_path: PathBuf,
    /// Directory uploaded images are written under.
    pub object_root: PathBuf,
    /// Base URL images are served from; `file://<object_root>` when unset.
    pub public_base_url: Option<String>,
    /// Document collection name.
    pub collection: String,
    /// First path segment of uploaded image objects.
    pub object_prefix: String,
    /// Prefix uploads with a random token so same-named files never collide.
    pub unique_object_keys: bool,
    /// Accounts allowed to sign in and edit.
    pub editors: Vec<String>,
    pub log_level: String,
    /// Absolute directory for rolling logs; logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for NewsdeskConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            object_root: PathBuf::from(DEFAULT_OBJECT_ROOT),
            public_base_url: None,
            collection: DEFAULT_COLLECTION.to_string(),
            object_prefix: DEFAULT_COLLECTION.to_string(),
            unique_object_keys: true,
            editors: Vec::new(),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl NewsdeskConfig {
    /// Parses a JSON config document; missing fields take defaults.
    pub fn from_json_str(raw: &str) -> ConfigResult<Self> {
        serde_json::from_str(raw).map_err(ConfigError::Parse)
    }

    /// Resolved base URL for public image links.
    pub fn resolved_public_base_url(&self) -> String {
        match self.public_base_url.as_deref() {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("file://{}", self.object_root.display())
                .trim_end_matches('/')
                .to_string(),
        }
    }

    /// Applies `NEWSDESK_*` overrides from a variable lookup.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(db_path) = lookup(ENV_DB_PATH).filter(|value| !value.trim().is_empty()) {
            self.db_path = PathBuf::from(db_path.trim());
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|value| !value.trim().is_empty()) {
            self.log_level = level.trim().to_string();
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.collection.trim().is_empty() {
            return Err(ConfigError::Invalid("collection cannot be empty".to_string()));
        }
        let prefix = self.object_prefix.trim();
        if prefix.is_empty() || prefix.contains('/') || prefix == "." || prefix == ".." {
            return Err(ConfigError::Invalid(format!(
                "object_prefix must be a single path segment, got `{}`",
                self.object_prefix
            )));
        }
        if let Some(url) = self.public_base_url.as_deref() {
            if !has_url_scheme(url) {
                return Err(ConfigError::Invalid(format!(
                    "public_base_url must include a scheme, got `{url}`"
                )));
            }
        }
        Ok(())
    }
}

/// Loads config from an optional JSON file, then environment, then validates.
pub fn load_config(path: Option<&Path>) -> ConfigResult<NewsdeskConfig> {
    let mut config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            NewsdeskConfig::from_json_str(&raw)?
        }
        None => NewsdeskConfig::default(),
    };
    config.apply_env_overrides(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

fn has_url_scheme(url: &str) -> bool {
    match url.split_once("://") {
        Some((scheme, rest)) => {
            !rest.is_empty()
                && scheme
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}
