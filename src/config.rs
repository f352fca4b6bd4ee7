//! Runtime configuration.
//!
//! Values are resolved in layers: built-in defaults, then an optional YAML
//! file, then `GLYCOSENSE_*` environment variables.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::TieBreak;

/// Environment variable naming the YAML config file.
pub const CONFIG_PATH_ENV: &str = "GLYCOSENSE_CONFIG";

const LISTEN_ADDR_ENV: &str = "GLYCOSENSE_LISTEN_ADDR";
const MODEL_DIR_ENV: &str = "GLYCOSENSE_MODEL_DIR";
const FOREST_MODEL_ENV: &str = "GLYCOSENSE_FOREST_MODEL";
const NETWORK_MODEL_ENV: &str = "GLYCOSENSE_NETWORK_MODEL";
const REQUIRE_MANIFEST_ENV: &str = "GLYCOSENSE_REQUIRE_MANIFEST";
const TIE_BREAK_ENV: &str = "GLYCOSENSE_TIE_BREAK";
const BODY_LIMIT_ENV: &str = "GLYCOSENSE_BODY_LIMIT_BYTES";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Snapshot of configuration values consumed by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Socket address the HTTP server binds to
    pub listen_addr: String,

    /// Directory holding the model artifacts (and optional manifest)
    pub model_dir: PathBuf,

    /// Random forest artifact file name inside `model_dir`
    pub forest_model: String,

    /// Neural network artifact file name inside `model_dir`
    pub network_model: String,

    /// Refuse to start without `manifest.json`
    pub require_manifest: bool,

    /// Rounding rule for an ensemble mean of exactly 0.5
    pub tie_break: TieBreak,

    /// Maximum accepted request body size
    pub body_limit_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:5000".to_string(),
            model_dir: PathBuf::from("models"),
            forest_model: "random_forest_model.json".to_string(),
            network_model: "neural_network_model.json".to_string(),
            require_manifest: false,
            tie_break: TieBreak::default(),
            body_limit_bytes: 1024 * 1024,
        }
    }
}

impl Config {
    /// Resolve the full configuration: defaults, optional file, process environment.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed, or an override is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading configuration from file");
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML config file. Missing keys keep their defaults.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or the YAML is invalid.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Apply overrides from a key lookup (normally the process environment).
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` if a value cannot be parsed.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(LISTEN_ADDR_ENV) {
            self.listen_addr = v;
        }
        if let Some(v) = lookup(MODEL_DIR_ENV) {
            self.model_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup(FOREST_MODEL_ENV) {
            self.forest_model = v;
        }
        if let Some(v) = lookup(NETWORK_MODEL_ENV) {
            self.network_model = v;
        }
        if let Some(v) = lookup(REQUIRE_MANIFEST_ENV) {
            self.require_manifest = parse_bool(REQUIRE_MANIFEST_ENV, &v)?;
        }
        if let Some(v) = lookup(TIE_BREAK_ENV) {
            self.tie_break = v.parse().map_err(|reason| ConfigError::Invalid {
                key: TIE_BREAK_ENV,
                value: v.clone(),
                reason,
            })?;
        }
        if let Some(v) = lookup(BODY_LIMIT_ENV) {
            self.body_limit_bytes =
                v.trim().parse().map_err(|e: std::num::ParseIntError| {
                    ConfigError::Invalid {
                        key: BODY_LIMIT_ENV,
                        value: v.clone(),
                        reason: e.to_string(),
                    }
                })?;
        }
        Ok(())
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` for an unparsable listen address or a zero body limit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;
        if self.body_limit_bytes == 0 {
            return Err(ConfigError::Invalid {
                key: BODY_LIMIT_ENV,
                value: "0".into(),
                reason: "body limit must be positive".into(),
            });
        }
        Ok(())
    }

    /// Parsed listen address.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` if `listen_addr` is not `host:port`.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen_addr
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                key: LISTEN_ADDR_ENV,
                value: self.listen_addr.clone(),
                reason: e.to_string(),
            })
    }

    #[must_use]
    pub fn forest_path(&self) -> PathBuf {
        self.model_dir.join(&self.forest_model)
    }

    #[must_use]
    pub fn network_path(&self) -> PathBuf {
        self.model_dir.join(&self.network_model)
    }
}

/// Config file path from the first CLI argument or `GLYCOSENSE_CONFIG`.
#[must_use]
pub fn config_path_from_args() -> Option<PathBuf> {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
        .map(PathBuf::from)
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim() {
        "1" | "true" | "TRUE" | "yes" | "YES" => Ok(true),
        "0" | "false" | "FALSE" | "no" | "NO" | "" => Ok(false),
        other => Err(ConfigError::Invalid {
            key,
            value: other.to_string(),
            reason: "expected a boolean".into(),
        }),
    }
}
