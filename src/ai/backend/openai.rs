//! OpenAI-compatible chat completions backend (works with OpenAI, Ollama, etc.)

use std::future::Future;
use std::pin::Pin;

use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    build_http_client, check_error_response, log_response_success, BackendMetadata,
    GenerationBackend, ResponseShape,
};
use crate::ai::error::AiError;

/// Default OpenAI endpoint.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Default local Ollama endpoint.
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Sampling temperature for consistent output.
const TEMPERATURE: f32 = 0.1;

#[derive(Serialize, Debug)]
struct Message {
    role: String,
    content: String,
}

#[derive(Serialize, Debug)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Chat completions request body.
#[derive(Serialize, Debug)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    response_format: ResponseFormat,
    stream: bool,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Vec<Choice>,
    model: Option<String>,
}

/// OpenAI-compatible backend (works with OpenAI, Ollama, etc.)
pub struct OpenAiBackend {
    client: Client,
    /// Bearer token; Ollama runs without one.
    api_key: Option<String>,
    model: String,
    /// Base URL for the API (e.g. "https://api.openai.com" or "http://localhost:11434").
    base_url: String,
    provider: &'static str,
}

impl OpenAiBackend {
    fn new(
        provider: &'static str,
        model: String,
        api_key: Option<String>,
        base_url: String,
    ) -> Result<Self> {
        Ok(Self {
            client: build_http_client()?,
            api_key,
            model,
            base_url,
            provider,
        })
    }

    /// Creates a backend for OpenAI.
    pub fn new_openai(model: String, api_key: String, base_url: Option<String>) -> Result<Self> {
        Self::new(
            "OpenAI",
            model,
            Some(api_key),
            base_url.unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
        )
    }

    /// Creates a backend for a local Ollama instance.
    pub fn new_ollama(model: String, base_url: Option<String>) -> Result<Self> {
        Self::new(
            "Ollama",
            model,
            None,
            base_url.unwrap_or_else(|| OLLAMA_BASE_URL.to_string()),
        )
    }

    fn api_url(&self) -> String {
        let url = format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        );
        debug!(base_url = %self.base_url, full_url = %url, "Constructed chat completions URL");
        url
    }
}

impl GenerationBackend for OpenAiBackend {
    fn send_request<'a>(
        &'a self,
        prompt: &'a str,
        shape: ResponseShape,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            debug!(
                prompt_len = prompt.len(),
                model = %self.model,
                provider = self.provider,
                ?shape,
                "Preparing chat completions request"
            );

            let request = ChatRequest {
                model: self.model.clone(),
                messages: vec![Message {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                }],
                temperature: Some(TEMPERATURE),
                response_format: ResponseFormat {
                    kind: "json_object",
                },
                stream: false,
            };

            let api_url = self.api_url();
            info!(url = %api_url, model = %self.model, "Sending request to {}", self.provider);

            let mut req_builder = self
                .client
                .post(&api_url)
                .header("Content-Type", "application/json")
                .json(&request);

            if let Some(ref api_key) = self.api_key {
                req_builder = req_builder.header("Authorization", format!("Bearer {api_key}"));
            }

            let response = req_builder
                .send()
                .await
                .map_err(|e| AiError::BackendUnavailable(e.to_string()))?;

            let response = check_error_response(response).await?;

            let chat_response: ChatResponse = response
                .json()
                .await
                .map_err(|e| AiError::MalformedResponse(e.to_string()))?;

            debug!(
                choice_count = chat_response.choices.len(),
                model = ?chat_response.model,
                "Received chat completions response"
            );

            let result = chat_response
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .filter(|text| !text.trim().is_empty())
                .ok_or_else(|| {
                    AiError::MalformedResponse("No message content in response".to_string()).into()
                });

            log_response_success(self.provider, &result);
            result
        })
    }

    fn get_metadata(&self) -> BackendMetadata {
        BackendMetadata {
            provider: self.provider.to_string(),
            model: self.model.clone(),
        }
    }
}
