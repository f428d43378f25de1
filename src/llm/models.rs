//! Provider definitions
//!
//! Every supported backend is described once here: its config name, the
//! environment variable holding its key, its stock model list and a factory
//! building a service for one model.

use super::gemini::{GeminiService, GEMINI_BASE_URL};
use super::mock::{MockService, MOCK_MODEL};
use super::openai::{OpenAIService, DEEPSEEK_BASE_URL, OPENAI_BASE_URL};
use super::LlmService;
use reqwest::Client;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Provider enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAI,
    Gemini,
    DeepSeek,
    Mock,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::OpenAI,
        Provider::Gemini,
        Provider::DeepSeek,
        Provider::Mock,
    ];

    /// Name used in config files and requests
    pub fn name(self) -> &'static str {
        self.def().name
    }

    pub fn display_name(self) -> &'static str {
        self.def().display_name
    }

    /// Environment variable holding this provider's API key, if it needs one
    pub fn api_key_env_var(self) -> Option<&'static str> {
        self.def().api_key_env
    }

    pub fn requires_key(self) -> bool {
        self.api_key_env_var().is_some()
    }

    /// Case-insensitive lookup by config name
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
    }

    pub fn def(self) -> &'static ProviderDef {
        // ALL and all_providers() share one order
        &all_providers()[self as usize]
    }

    pub fn build_service(
        self,
        client: Client,
        api_key: String,
        model: &str,
    ) -> Arc<dyn LlmService> {
        (self.def().factory)(client, api_key, model)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Provider definition with metadata
#[derive(Debug)]
pub struct ProviderDef {
    pub provider: Provider,
    pub name: &'static str,
    pub display_name: &'static str,
    pub api_key_env: Option<&'static str>,
    /// Models offered when the config does not list any
    pub default_models: &'static [&'static str],
    /// Factory building a service for one model
    pub factory: fn(Client, String, &str) -> Arc<dyn LlmService>,
}

/// All provider definitions, in `Provider::ALL` order
pub fn all_providers() -> &'static [ProviderDef] {
    &[
        ProviderDef {
            provider: Provider::OpenAI,
            name: "openai",
            display_name: "OpenAI",
            api_key_env: Some("OPENAI_API_KEY"),
            default_models: &["gpt-4o-mini"],
            factory: |client, api_key, model| {
                Arc::new(OpenAIService::new(client, api_key, OPENAI_BASE_URL, model))
            },
        },
        ProviderDef {
            provider: Provider::Gemini,
            name: "gemini",
            display_name: "Google Gemini",
            api_key_env: Some("GEMINI_API_KEY"),
            default_models: &["gemini-1.5-flash"],
            factory: |client, api_key, model| {
                Arc::new(GeminiService::new(client, api_key, GEMINI_BASE_URL, model))
            },
        },
        ProviderDef {
            provider: Provider::DeepSeek,
            name: "deepseek",
            display_name: "DeepSeek",
            api_key_env: Some("DEEPSEEK_API_KEY"),
            default_models: &["deepseek-chat"],
            factory: |client, api_key, model| {
                Arc::new(OpenAIService::new(client, api_key, DEEPSEEK_BASE_URL, model))
            },
        },
        ProviderDef {
            provider: Provider::Mock,
            name: "mock",
            display_name: "Mock (offline)",
            api_key_env: None,
            default_models: &[MOCK_MODEL],
            factory: |_client, _api_key, model| Arc::new(MockService::new(model)),
        },
    ]
}
