//! Generation backend trait and shared helpers.

pub mod gemini;
pub mod openai;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{json, Value};

use crate::ai::error::AiError;
use crate::ai::response::CommitType;
use crate::utils::preflight::{AiConfig, Provider};

pub use gemini::GeminiBackend;
pub use openai::OpenAiBackend;

/// HTTP request timeout for backend calls.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Metadata about a backend implementation.
#[derive(Clone, Debug)]
pub struct BackendMetadata {
    /// Service provider name.
    pub provider: String,
    /// Model identifier.
    pub model: String,
}

/// The structured output requested from a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseShape {
    /// `{"commits": [CommitGroup, ...]}`.
    CommitGroups,
    /// `{"subject", "body", "analysis"}`.
    SingleMessage,
}

impl ResponseShape {
    /// Returns the schema hint for schema-aware backends.
    ///
    /// Uses the OpenAPI subset understood by Gemini's `responseSchema`.
    pub fn json_schema(self) -> Value {
        match self {
            Self::CommitGroups => {
                let types: Vec<&str> = CommitType::ALL.iter().map(|t| t.as_str()).collect();
                json!({
                    "type": "OBJECT",
                    "properties": {
                        "commits": {
                            "type": "ARRAY",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "type": { "type": "STRING", "enum": types },
                                    "subject": { "type": "STRING" },
                                    "body": { "type": "STRING" },
                                    "analysis": { "type": "STRING" },
                                    "paths": { "type": "ARRAY", "items": { "type": "STRING" } }
                                },
                                "required": ["type", "subject", "body", "paths"]
                            }
                        }
                    },
                    "required": ["commits"]
                })
            }
            Self::SingleMessage => json!({
                "type": "OBJECT",
                "properties": {
                    "subject": { "type": "STRING" },
                    "body": { "type": "STRING" },
                    "analysis": { "type": "STRING" }
                },
                "required": ["subject", "body"]
            }),
        }
    }
}

// ── Shared helpers for backend implementations ──────────────────────

/// Builds an HTTP client with the standard request timeout.
pub(crate) fn build_http_client() -> Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")
}

/// Passes a successful response through; turns an error status into
/// [`AiError::BackendUnavailable`] carrying the status and body.
pub(crate) async fn check_error_response(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let error_text = response.text().await.unwrap_or_else(|e| {
        tracing::debug!("Failed to read error response body: {e}");
        String::new()
    });
    Err(AiError::BackendUnavailable(format!("HTTP {status}: {error_text}")).into())
}

/// Logs successful text extraction from a backend response.
pub(crate) fn log_response_success(provider: &str, result: &Result<String>) {
    if let Ok(text) = result {
        tracing::debug!(
            response_len = text.len(),
            "Successfully extracted text content from {} response",
            provider
        );
        tracing::trace!(response_content = %text, "{} response content", provider);
    }
}

/// A text-generation service: submit a prompt, get structured text back.
pub trait GenerationBackend: Send + Sync {
    /// Sends `prompt` requesting output of `shape` and returns the raw text.
    fn send_request<'a>(
        &'a self,
        prompt: &'a str,
        shape: ResponseShape,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

    /// Returns metadata about the backend implementation.
    fn get_metadata(&self) -> BackendMetadata;
}

/// Creates the backend selected by `config`.
pub fn create_backend(config: &AiConfig) -> Result<Box<dyn GenerationBackend>> {
    let backend: Box<dyn GenerationBackend> = match config.provider {
        Provider::Gemini => {
            let api_key = config.api_key.clone().ok_or(AiError::ApiKeyNotFound {
                provider: "Gemini",
                keys: "GEMINI_API_KEY, GOOGLE_API_KEY, API_KEY".to_string(),
            })?;
            Box::new(GeminiBackend::new(
                config.model.clone(),
                api_key,
                config.base_url.clone(),
            )?)
        }
        Provider::OpenAi => {
            let api_key = config.api_key.clone().ok_or(AiError::ApiKeyNotFound {
                provider: "OpenAI",
                keys: "OPENAI_API_KEY, OPENAI_AUTH_TOKEN".to_string(),
            })?;
            Box::new(OpenAiBackend::new_openai(
                config.model.clone(),
                api_key,
                config.base_url.clone(),
            )?)
        }
        Provider::Ollama => Box::new(OpenAiBackend::new_ollama(
            config.model.clone(),
            config.base_url.clone(),
        )?),
    };

    let metadata = backend.get_metadata();
    tracing::debug!(
        provider = %metadata.provider,
        model = %metadata.model,
        "Created generation backend"
    );

    Ok(backend)
}
