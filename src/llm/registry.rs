//! Provider registry: maps a requested provider/model pair to a service

use super::{LlmError, LlmService, LoggingService, Provider};
use crate::config::ModelsConfig;
use reqwest::Client;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Upper bound on a single provider HTTP call
const HTTP_TIMEOUT: Duration = Duration::from_secs(300);

/// API keys for real providers
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub deepseek_api_key: Option<String>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            gemini_api_key: std::env::var("GEMINI_API_KEY").ok(),
            deepseek_api_key: std::env::var("DEEPSEEK_API_KEY").ok(),
        }
    }

    /// Non-empty key for `provider`
    pub fn api_key(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::OpenAI => self.openai_api_key.as_deref(),
            Provider::Gemini => self.gemini_api_key.as_deref(),
            Provider::DeepSeek => self.deepseek_api_key.as_deref(),
            Provider::Mock => None,
        }
        .map(str::trim)
        .filter(|k| !k.is_empty())
    }
}

/// Why a provider/model pair cannot be served
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("unknown provider `{0}`")]
    UnknownProvider(String),
    #[error("provider `{0}` is not configured")]
    NotConfigured(Provider),
    #[error("model `{model}` is not allowed for provider `{provider}` (allowed: {allowed})")]
    ModelNotAllowed {
        provider: Provider,
        model: String,
        allowed: String,
    },
    #[error("{env_var} is not set; add it to the environment or switch provider to `mock`")]
    MissingApiKey {
        provider: Provider,
        env_var: &'static str,
    },
}

impl ResolveError {
    /// Missing credentials are an upstream failure; everything else is bad input
    pub fn is_validation(&self) -> bool {
        !matches!(self, Self::MissingApiKey { .. })
    }

    pub fn into_llm_error(self) -> LlmError {
        LlmError::auth(self.to_string())
    }
}

/// A service ready to call, with the names it was resolved from
#[derive(Clone)]
pub struct ResolvedService {
    pub provider: Provider,
    pub model: String,
    pub service: Arc<dyn LlmService>,
}

/// Configured provider as reported to clients
#[derive(Debug, Clone, Serialize)]
pub struct ProviderInfo {
    pub name: &'static str,
    pub display_name: &'static str,
    pub models: Vec<String>,
    pub is_default: bool,
    /// Whether an API key is present (always true for providers without keys)
    pub available: bool,
}

/// Registry of configured providers and their allowed models
pub struct ProviderRegistry {
    client: Client,
    providers: BTreeMap<Provider, Vec<String>>,
    default_provider: Provider,
    keys: LlmConfig,
    overrides: HashMap<Provider, Arc<dyn LlmService>>,
}

impl ProviderRegistry {
    pub fn new(models: &ModelsConfig, keys: LlmConfig) -> Self {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to build HTTP client, using defaults");
                Client::new()
            });

        for provider in models.providers.keys() {
            if let Some(env_var) = provider.api_key_env_var() {
                if keys.api_key(*provider).is_none() {
                    tracing::warn!(
                        provider = %provider,
                        env_var,
                        "Provider configured without API key"
                    );
                }
            }
        }

        Self {
            client,
            providers: models.providers.clone(),
            default_provider: models.default_provider,
            keys,
            overrides: HashMap::new(),
        }
    }

    /// Registry with only the mock provider
    pub fn mock_only() -> Self {
        Self::new(&ModelsConfig::mock_only(), LlmConfig::default())
    }

    /// Serve every request for `provider` with `service`, bypassing key checks.
    ///
    /// The provider is added to the configured set if it is missing.
    #[must_use]
    pub fn with_service(mut self, provider: Provider, service: Arc<dyn LlmService>) -> Self {
        self.providers
            .entry(provider)
            .or_insert_with(|| vec![service.model_id().to_string()]);
        self.overrides.insert(provider, service);
        self
    }

    pub fn default_provider(&self) -> Provider {
        self.default_provider
    }

    pub fn allowed_models(&self, provider: Provider) -> Option<&[String]> {
        self.providers.get(&provider).map(Vec::as_slice)
    }

    /// Resolve an optional provider name and model to a callable service.
    ///
    /// Blank strings count as absent. No network call is made.
    pub fn resolve(
        &self,
        provider: Option<&str>,
        model: Option<&str>,
    ) -> Result<ResolvedService, ResolveError> {
        let provider = match provider.map(str::trim).filter(|p| !p.is_empty()) {
            None => self.default_provider,
            Some(name) => Provider::from_name(name)
                .ok_or_else(|| ResolveError::UnknownProvider(name.to_string()))?,
        };

        let allowed = self
            .providers
            .get(&provider)
            .filter(|models| !models.is_empty())
            .ok_or(ResolveError::NotConfigured(provider))?;

        let model = match model.map(str::trim).filter(|m| !m.is_empty()) {
            None => allowed[0].clone(),
            Some(m) if allowed.iter().any(|a| a == m) => m.to_string(),
            Some(m) => {
                return Err(ResolveError::ModelNotAllowed {
                    provider,
                    model: m.to_string(),
                    allowed: allowed.join(", "),
                })
            }
        };

        let service = if let Some(fixed) = self.overrides.get(&provider) {
            Arc::clone(fixed)
        } else {
            let api_key = match provider.api_key_env_var() {
                None => String::new(),
                Some(env_var) => self
                    .keys
                    .api_key(provider)
                    .ok_or(ResolveError::MissingApiKey { provider, env_var })?
                    .to_string(),
            };
            provider.build_service(self.client.clone(), api_key, &model)
        };

        Ok(ResolvedService {
            provider,
            model,
            service: Arc::new(LoggingService::new(provider, service)),
        })
    }

    /// Configured providers in a stable order
    pub fn providers_info(&self) -> Vec<ProviderInfo> {
        self.providers
            .iter()
            .map(|(provider, models)| ProviderInfo {
                name: provider.name(),
                display_name: provider.display_name(),
                models: models.clone(),
                is_default: *provider == self.default_provider,
                available: !provider.requires_key()
                    || self.overrides.contains_key(provider)
                    || self.keys.api_key(*provider).is_some(),
            })
            .collect()
    }
}
