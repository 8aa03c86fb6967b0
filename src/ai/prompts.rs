//! Prompt construction for the grouping and single-message flows.

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::ai::response::CommitType;
use crate::git::FileDiffMap;

/// Maximum number of characters of diff payload embedded in a prompt.
///
/// Longer payloads keep only their first `MAX_DIFF_CHARS` Unicode scalar
/// values, so identical input always yields an identical request.
pub const MAX_DIFF_CHARS: usize = 30_000;

const GROUPING_INSTRUCTIONS: &str = r#"Act as a senior software engineer and git expert.
You will receive a JSON object mapping each changed file path to its unified diff.
Split the changes into atomic commits: each commit groups the files that form one
coherent, independently meaningful change.

Rules:
1. Analyze the diffs to understand the semantic meaning of every change.
2. Every changed file path must appear in exactly one commit. Do not invent paths.
3. "type" must be one of: {types}.
4. "subject" must start with "<type>: ", use the imperative mood and stay within 50-72 characters.
5. "body" explains what changed and why, one point per line.
6. "analysis" briefly explains why these files belong together.
7. Style: Conventional Commits. Tone: professional. Language: English. No emoji.
8. If a change breaks compatibility, end the body with a "BREAKING CHANGE: <description>" line.

Return strictly valid JSON of this shape and nothing else:
{"commits": [{"type": "...", "subject": "...", "body": "...", "analysis": "...", "paths": ["..."]}]}
"#;

const MESSAGE_INSTRUCTIONS: &str = r#"Act as a senior software engineer and git expert.
Analyze the following 'git diff' output and generate a high-quality commit message.

Configuration:
- Style: Conventional Commits (e.g., feat: ..., fix: ...)
- Tone: professional
- Language: English
- Use Emoji: No
- Detect Breaking Changes: Yes (add footer BREAKING CHANGE: <desc>)

Instructions:
1. Analyze the diff to understand the semantic meaning.
2. Separate 'subject' (max 50-72 chars) from 'body'.
3. Return strictly valid JSON with keys: subject, body, analysis.
"#;

/// A prompt ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Full prompt text.
    pub text: String,
    /// Whether the diff payload was cut to [`MAX_DIFF_CHARS`].
    pub truncated: bool,
}

/// Returns the first `max_chars` characters of `text` and whether a cut happened.
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => (&text[..byte_index], true),
        None => (text, false),
    }
}

fn bounded_payload(payload: &str) -> (&str, bool) {
    let (kept, truncated) = truncate_chars(payload, MAX_DIFF_CHARS);
    if truncated {
        warn!(
            payload_chars = payload.chars().count(),
            limit = MAX_DIFF_CHARS,
            "Diff payload exceeds limit, truncating"
        );
    }
    (kept, truncated)
}

/// Builds the prompt asking for a partition of `files` into commit groups.
///
/// The changed paths are listed in full ahead of the (possibly truncated)
/// diff payload so the backend can cover every file even after a cut.
pub fn build_grouping_prompt(files: &FileDiffMap) -> Result<Prompt> {
    let payload =
        serde_json::to_string_pretty(files).context("Failed to serialize file diffs")?;
    let (payload, truncated) = bounded_payload(&payload);

    let types = CommitType::ALL
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let mut text = GROUPING_INSTRUCTIONS.replace("{types}", &types);
    text.push_str("\nChanged files:\n");
    for path in files.paths() {
        text.push_str("- ");
        text.push_str(path);
        text.push('\n');
    }
    text.push_str("\nFile diffs:\n```json\n");
    text.push_str(payload);
    text.push_str("\n```\n");

    debug!(
        file_count = files.len(),
        prompt_len = text.len(),
        truncated,
        "Built grouping prompt"
    );

    Ok(Prompt { text, truncated })
}

/// Builds the prompt asking for one commit message covering `diff`.
pub fn build_message_prompt(diff: &str) -> Prompt {
    let (payload, truncated) = bounded_payload(diff);

    let mut text = String::from(MESSAGE_INSTRUCTIONS);
    text.push_str("\nInput Diff:\n```\n");
    text.push_str(payload);
    text.push_str("\n```\n");

    debug!(prompt_len = text.len(), truncated, "Built message prompt");

    Prompt { text, truncated }
}
