//! Preflight resolution of the generation backend configuration.
//!
//! Runs before any git work so a missing credential fails fast with a clear
//! message.

use std::fmt;

use anyhow::Result;
use clap::ValueEnum;
use tracing::{debug, warn};

use crate::ai::error::AiError;
use crate::utils::settings::Settings;

/// Default Gemini model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Default OpenAI model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Default Ollama model.
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3";

const GEMINI_KEYS: &[&str] = &["GEMINI_API_KEY", "GOOGLE_API_KEY", "API_KEY"];
const OPENAI_KEYS: &[&str] = &["OPENAI_API_KEY", "OPENAI_AUTH_TOKEN"];

/// Generation backend providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    /// Google Gemini API.
    Gemini,
    /// OpenAI API.
    #[value(name = "openai")]
    OpenAi,
    /// Local Ollama.
    Ollama,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Gemini => write!(f, "Gemini API"),
            Provider::OpenAi => write!(f, "OpenAI API"),
            Provider::Ollama => write!(f, "Ollama"),
        }
    }
}

/// Everything needed to construct a generation backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiConfig {
    /// Selected provider.
    pub provider: Provider,
    /// Model identifier.
    pub model: String,
    /// Credential; `None` for Ollama.
    pub api_key: Option<String>,
    /// Endpoint override.
    pub base_url: Option<String>,
}

/// Resolves the backend configuration from the environment and settings file.
pub fn resolve_ai_config(
    model_override: Option<&str>,
    provider_override: Option<Provider>,
) -> Result<AiConfig> {
    let settings = Settings::load().unwrap_or_else(|err| {
        warn!("Ignoring unreadable settings file: {err:#}");
        Settings::default()
    });

    let config = resolve_ai_config_with(
        |key| settings.get_env_var(key),
        model_override,
        provider_override,
    )?;

    debug!(
        provider = %config.provider,
        model = %config.model,
        has_base_url = config.base_url.is_some(),
        "Resolved backend configuration"
    );

    Ok(config)
}

/// Resolves the backend configuration using `lookup` for every variable.
pub fn resolve_ai_config_with<F>(
    lookup: F,
    model_override: Option<&str>,
    provider_override: Option<Provider>,
) -> Result<AiConfig, AiError>
where
    F: Fn(&str) -> Option<String>,
{
    let flag = |key: &str| lookup(key).is_some_and(|value| value == "true");
    let first_of = |keys: &[&str]| keys.iter().find_map(|key| lookup(*key));

    let provider = provider_override.unwrap_or_else(|| {
        if flag("USE_OPENAI") {
            Provider::OpenAi
        } else if flag("USE_OLLAMA") {
            Provider::Ollama
        } else {
            Provider::Gemini
        }
    });

    let (model_key, default_model, base_url_key) = match provider {
        Provider::Gemini => ("GEMINI_MODEL", DEFAULT_GEMINI_MODEL, "GEMINI_BASE_URL"),
        Provider::OpenAi => ("OPENAI_MODEL", DEFAULT_OPENAI_MODEL, "OPENAI_BASE_URL"),
        Provider::Ollama => ("OLLAMA_MODEL", DEFAULT_OLLAMA_MODEL, "OLLAMA_BASE_URL"),
    };

    let model = model_override
        .map(String::from)
        .or_else(|| lookup(model_key))
        .unwrap_or_else(|| default_model.to_string());

    let api_key = match provider {
        Provider::Gemini => Some(first_of(GEMINI_KEYS).ok_or(AiError::ApiKeyNotFound {
            provider: "Gemini",
            keys: GEMINI_KEYS.join(", "),
        })?),
        Provider::OpenAi => Some(first_of(OPENAI_KEYS).ok_or(AiError::ApiKeyNotFound {
            provider: "OpenAI",
            keys: OPENAI_KEYS.join(", "),
        })?),
        Provider::Ollama => None,
    };

    Ok(AiConfig {
        provider,
        model,
        api_key,
        base_url: lookup(base_url_key),
    })
}
