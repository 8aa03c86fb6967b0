//! Shell command synthesis for proposed commits.
//!
//! Commands are produced as opaque strings for a human to run; nothing here
//! executes them.

use std::borrow::Cow;

use crate::ai::response::CommitGroup;

/// Command that stages the paths of one proposal.
pub const STAGE_COMMAND: &str = "git add";

/// Command that records one proposal.
pub const COMMIT_COMMAND: &str = "git commit";

/// The stage and commit commands realizing one commit group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPair {
    /// `git add <paths...>`.
    pub stage: String,
    /// `git commit -m "<subject>" -m "<line>"...`.
    pub commit: String,
}

/// Builds both commands for `group`.
pub fn synthesize(group: &CommitGroup) -> CommandPair {
    CommandPair {
        stage: stage_command(&group.paths),
        commit: commit_command(&group.subject, &group.body),
    }
}

/// Builds `git add` for `paths`, quoting only the paths that need it.
pub fn stage_command<S: AsRef<str>>(paths: &[S]) -> String {
    let mut command = String::from(STAGE_COMMAND);
    for path in paths {
        command.push(' ');
        command.push_str(&shell_word(path.as_ref()));
    }
    command
}

/// Builds `git commit` with the subject as the first `-m` segment and one
/// further segment per non-blank body line.
///
/// The body is trimmed before splitting, so leading and trailing blank lines
/// never produce empty segments.
pub fn commit_command(subject: &str, body: &str) -> String {
    let mut parts = vec![format!("{COMMIT_COMMAND} -m {}", double_quote(subject))];

    for line in body.trim().lines().filter(|l| !l.trim().is_empty()) {
        parts.push(format!("-m {}", double_quote(line)));
    }

    parts.join(" ")
}

/// Escapes the characters that stay special inside POSIX double quotes.
pub fn escape_double_quoted(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '"' | '$' | '`') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn double_quote(text: &str) -> String {
    format!("\"{}\"", escape_double_quoted(text))
}

/// Leaves plain paths bare and double-quotes anything else.
fn shell_word(path: &str) -> Cow<'_, str> {
    let plain = !path.is_empty()
        && path.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | '+' | '@' | ':' | ',' | '=')
        });

    if plain {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(double_quote(path))
    }
}
