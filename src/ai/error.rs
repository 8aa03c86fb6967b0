//! Generation backend error handling.

use thiserror::Error;

/// Errors raised while talking to a generation backend or validating what
/// it returned.
#[derive(Error, Debug)]
pub enum AiError {
    /// No credential for the selected provider in the environment or settings.
    #[error("{provider} API key not found. Set one of these environment variables: {keys}")]
    ApiKeyNotFound {
        /// Human-readable provider name.
        provider: &'static str,
        /// Comma-separated list of the variables that were checked.
        keys: String,
    },

    /// Transport-level or HTTP failure contacting the backend.
    #[error("Generation backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Backend text that is not valid JSON, or an envelope without text.
    #[error("Malformed response from generation backend: {0}")]
    MalformedResponse(String),

    /// JSON that parses but breaks the commit-group contract.
    #[error("Response violates the commit schema: {0}")]
    SchemaViolation(String),
}
