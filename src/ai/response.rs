//! Decoding and validation of generation backend responses.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ai::backend::ResponseShape;
use crate::ai::error::AiError;
use crate::git::diff_split::FileDiffMap;

/// Allowed conventional commit types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitType {
    /// New features or enhancements.
    Feat,
    /// Bug fixes.
    Fix,
    /// Restructuring without behaviour change.
    Refactor,
    /// Maintenance, tooling, dependencies.
    Chore,
    /// Formatting only.
    Style,
    /// Adding or updating tests.
    Test,
    /// Documentation.
    Docs,
}

impl CommitType {
    /// Every allowed type, in the order presented to the backend.
    pub const ALL: [Self; 7] = [
        Self::Feat,
        Self::Fix,
        Self::Refactor,
        Self::Chore,
        Self::Style,
        Self::Test,
        Self::Docs,
    ];

    /// Returns the lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Feat => "feat",
            Self::Fix => "fix",
            Self::Refactor => "refactor",
            Self::Chore => "chore",
            Self::Style => "style",
            Self::Test => "test",
            Self::Docs => "docs",
        }
    }

    /// Returns the prefix every subject of this type must start with.
    pub fn subject_prefix(self) -> String {
        format!("{}: ", self.as_str())
    }
}

impl fmt::Display for CommitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One proposed atomic commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitGroup {
    /// Conventional commit type.
    #[serde(rename = "type")]
    pub commit_type: CommitType,
    /// Subject line, `"<type>: <description>"`.
    pub subject: String,
    /// Message body; may be empty.
    pub body: String,
    /// The backend's rationale for grouping these files.
    #[serde(default)]
    pub analysis: Option<String>,
    /// Paths staged by this commit.
    pub paths: Vec<String>,
}

/// Response of the grouping flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitPlan {
    /// Proposed commits, in the order they should be made.
    pub commits: Vec<CommitGroup>,
}

/// Response of the single-message flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMessage {
    /// Subject line.
    pub subject: String,
    /// Message body; may be empty.
    pub body: String,
    /// The backend's reading of the change.
    #[serde(default)]
    pub analysis: Option<String>,
}

/// A decoded backend payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendPayload {
    /// Multi-group shape, `{"commits": [...]}`.
    Groups(CommitPlan),
    /// Single-message shape, `{"subject", "body", "analysis"}`.
    Single(CommitMessage),
}

/// Decodes backend text into the strict record for `shape`.
///
/// Text that is not JSON yields [`AiError::MalformedResponse`]; JSON that
/// lacks a required field or carries a disallowed type yields
/// [`AiError::SchemaViolation`].
pub fn decode_payload(text: &str, shape: ResponseShape) -> Result<BackendPayload, AiError> {
    let json = strip_code_fence(text);
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| AiError::MalformedResponse(e.to_string()))?;

    debug!(?shape, "Decoding backend payload");

    match shape {
        ResponseShape::CommitGroups => serde_json::from_value::<CommitPlan>(value)
            .map(BackendPayload::Groups)
            .map_err(|e| AiError::SchemaViolation(e.to_string())),
        ResponseShape::SingleMessage => serde_json::from_value::<CommitMessage>(value)
            .map(BackendPayload::Single)
            .map_err(|e| AiError::SchemaViolation(e.to_string())),
    }
}

/// Decodes and validates a grouping response against the segmented files.
pub fn parse_commit_plan(text: &str, files: &FileDiffMap) -> Result<CommitPlan, AiError> {
    match decode_payload(text, ResponseShape::CommitGroups)? {
        BackendPayload::Groups(plan) => {
            validate_plan(&plan, files)?;
            Ok(plan)
        }
        BackendPayload::Single(_) => Err(AiError::SchemaViolation(
            "expected a commits array, got a single message".to_string(),
        )),
    }
}

/// Decodes and validates a single-message response.
pub fn parse_commit_message(text: &str) -> Result<CommitMessage, AiError> {
    match decode_payload(text, ResponseShape::SingleMessage)? {
        BackendPayload::Single(message) => {
            validate_message(&message)?;
            Ok(message)
        }
        BackendPayload::Groups(_) => Err(AiError::SchemaViolation(
            "expected a single message, got a commits array".to_string(),
        )),
    }
}

/// Checks the domain rules of a commit plan.
///
/// Each subject must start with `"<type>: "`, each group must list at
/// least one path, and the groups together must cover every file in
/// `files` exactly once without naming any other path.
pub fn validate_plan(plan: &CommitPlan, files: &FileDiffMap) -> Result<(), AiError> {
    if plan.commits.is_empty() {
        return Err(AiError::SchemaViolation(
            "commits array is empty".to_string(),
        ));
    }

    let mut seen: HashSet<&str> = HashSet::new();

    for (i, group) in plan.commits.iter().enumerate() {
        let position = i + 1;
        let prefix = group.commit_type.subject_prefix();

        if !group.subject.starts_with(&prefix) {
            return Err(AiError::SchemaViolation(format!(
                "commit {position}: subject {:?} must start with {prefix:?}",
                group.subject
            )));
        }

        if group.paths.is_empty() {
            return Err(AiError::SchemaViolation(format!(
                "commit {position}: paths must not be empty"
            )));
        }

        for path in &group.paths {
            if !files.contains(path) {
                return Err(AiError::SchemaViolation(format!(
                    "commit {position}: unknown path {path}"
                )));
            }
            if !seen.insert(path.as_str()) {
                return Err(AiError::SchemaViolation(format!(
                    "commit {position}: path {path} is already assigned"
                )));
            }
        }
    }

    let missing: Vec<&str> = files.paths().filter(|p| !seen.contains(p)).collect();
    if !missing.is_empty() {
        return Err(AiError::SchemaViolation(format!(
            "paths not assigned to any commit: {}",
            missing.join(", ")
        )));
    }

    Ok(())
}

/// Checks that a single message has a usable subject.
pub fn validate_message(message: &CommitMessage) -> Result<(), AiError> {
    if message.subject.trim().is_empty() {
        return Err(AiError::SchemaViolation(
            "subject must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Returns the contents of a surrounding markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip an info string such as `json`.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
