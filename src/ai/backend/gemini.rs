//! Gemini `generateContent` backend.

use std::future::Future;
use std::pin::Pin;

use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::{
    build_http_client, check_error_response, log_response_success, BackendMetadata,
    GenerationBackend, ResponseShape,
};
use crate::ai::error::AiError;

/// Default Gemini endpoint.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Serialize, Deserialize, Debug, Default)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

/// `generateContent` request body.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

/// `generateContent` response body.
#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateResponse {
    /// Concatenates the text parts of the first candidate.
    fn into_text(self) -> Option<String> {
        let candidate = self.candidates.into_iter().next()?;
        let text: String = candidate
            .content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

/// Gemini backend.
pub struct GeminiBackend {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiBackend {
    /// Creates a Gemini backend; `base_url` defaults to the public endpoint.
    pub fn new(model: String, api_key: String, base_url: Option<String>) -> Result<Self> {
        Ok(Self {
            client: build_http_client()?,
            api_key,
            model,
            base_url: base_url.unwrap_or_else(|| GEMINI_BASE_URL.to_string()),
        })
    }

    fn api_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

impl GenerationBackend for GeminiBackend {
    fn send_request<'a>(
        &'a self,
        prompt: &'a str,
        shape: ResponseShape,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            debug!(
                prompt_len = prompt.len(),
                model = %self.model,
                ?shape,
                "Preparing Gemini request"
            );

            let request = GenerateRequest {
                contents: vec![Content {
                    parts: vec![Part {
                        text: Some(prompt.to_string()),
                    }],
                }],
                generation_config: GenerationConfig {
                    response_mime_type: "application/json",
                    response_schema: shape.json_schema(),
                },
            };

            let api_url = self.api_url();
            info!(url = %api_url, model = %self.model, "Sending request to Gemini");

            let response = self
                .client
                .post(&api_url)
                .header(API_KEY_HEADER, &self.api_key)
                .header("Content-Type", "application/json")
                .json(&request)
                .send()
                .await
                .map_err(|e| AiError::BackendUnavailable(e.to_string()))?;

            let response = check_error_response(response).await?;

            let gemini_response: GenerateResponse = response
                .json()
                .await
                .map_err(|e| AiError::MalformedResponse(e.to_string()))?;

            debug!(
                candidate_count = gemini_response.candidates.len(),
                "Received Gemini response"
            );

            let result = gemini_response.into_text().ok_or_else(|| {
                AiError::MalformedResponse("No text content in Gemini response".to_string()).into()
            });

            log_response_success("Gemini", &result);
            result
        })
    }

    fn get_metadata(&self) -> BackendMetadata {
        BackendMetadata {
            provider: "Gemini".to_string(),
            model: self.model.clone(),
        }
    }
}
