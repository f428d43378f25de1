//! Application configuration
//!
//! Loaded from YAML (`$CARDWISE_CONFIG`, else `./config.yaml` when present,
//! else built-in defaults), then overridden from the environment.

use crate::llm::Provider;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_ENV: &str = "CARDWISE_CONFIG";
const LOCAL_CONFIG: &str = "config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Main configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub models: ModelsConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load with the fallback chain, then apply environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load_from_file(Path::new(&path))?,
            None => {
                let local = Path::new(LOCAL_CONFIG);
                if local.exists() {
                    Self::load_from_file(local)?
                } else {
                    tracing::info!("No config file found, using defaults");
                    Self::default()
                }
            }
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document parses as null
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Apply `CARDWISE_*` overrides read through `lookup`
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(host) = lookup("CARDWISE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("CARDWISE_PORT") {
            self.server.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: "CARDWISE_PORT",
                value: port,
            })?;
        }
        if let Some(origin) = lookup("CARDWISE_CORS_ORIGIN") {
            self.server.cors_origin = origin;
        }
        Ok(())
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `*` allows any origin
    pub cors_origin: String,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origin: "*".to_string(),
            request_timeout_secs: 120,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Interaction log settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub path: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: PathBuf::from("logs/cardwise.jsonl"),
        }
    }
}

/// Normalized provider catalog.
///
/// Always contains `mock`, and `default_provider` is always a key of
/// `providers` with at least one model.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawModelsConfig")]
pub struct ModelsConfig {
    pub default_provider: Provider,
    pub providers: BTreeMap<Provider, Vec<String>>,
}

impl ModelsConfig {
    /// Catalog with only the offline provider
    pub fn mock_only() -> Self {
        let mut providers = BTreeMap::new();
        providers.insert(Provider::Mock, stock_models(Provider::Mock));
        Self {
            default_provider: Provider::Mock,
            providers,
        }
    }
}

impl Default for ModelsConfig {
    /// Every provider with its stock models, defaulting to `mock`
    fn default() -> Self {
        Self {
            default_provider: Provider::Mock,
            providers: Provider::ALL
                .into_iter()
                .map(|p| (p, stock_models(p)))
                .collect(),
        }
    }
}

fn stock_models(provider: Provider) -> Vec<String> {
    provider
        .def()
        .default_models
        .iter()
        .map(|m| (*m).to_string())
        .collect()
}

/// `models` section as written in YAML
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawModelsConfig {
    default_provider: Option<String>,
    providers: Option<BTreeMap<String, ModelList>>,
}

/// A provider's models: a single name or a list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ModelList {
    One(String),
    Many(Vec<String>),
}

impl ModelList {
    fn into_vec(self) -> Vec<String> {
        let models = match self {
            ModelList::One(m) => vec![m],
            ModelList::Many(ms) => ms,
        };
        models
            .into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect()
    }
}

impl From<RawModelsConfig> for ModelsConfig {
    fn from(raw: RawModelsConfig) -> Self {
        let mut providers = match raw.providers {
            None => ModelsConfig::default().providers,
            Some(entries) => {
                let mut providers = BTreeMap::new();
                for (name, models) in entries {
                    let Some(provider) = Provider::from_name(&name) else {
                        tracing::warn!(provider = %name, "Ignoring unknown provider in config");
                        continue;
                    };
                    let models = models.into_vec();
                    if models.is_empty() {
                        tracing::warn!(provider = %provider, "Ignoring provider with no models");
                        continue;
                    }
                    providers
                        .entry(provider)
                        .or_insert_with(Vec::new)
                        .extend(models);
                }
                providers
            }
        };
        providers
            .entry(Provider::Mock)
            .or_insert_with(|| stock_models(Provider::Mock));

        let default_provider = raw
            .default_provider
            .as_deref()
            .and_then(Provider::from_name)
            .filter(|p| providers.contains_key(p))
            .unwrap_or_else(|| {
                if let Some(name) = &raw.default_provider {
                    tracing::warn!(provider = %name, "Default provider not configured, using mock");
                }
                Provider::Mock
            });

        Self {
            default_provider,
            providers,
        }
    }
}
