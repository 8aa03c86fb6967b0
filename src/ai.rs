//! Generation backends, prompt construction and response validation.

pub mod backend;
pub mod error;
pub mod prompts;
pub mod response;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod test_utils;

pub use backend::{create_backend, BackendMetadata, GenerationBackend, ResponseShape};
pub use error::AiError;
pub use prompts::{build_grouping_prompt, build_message_prompt, Prompt, MAX_DIFF_CHARS};
pub use response::{CommitGroup, CommitMessage, CommitPlan, CommitType};
