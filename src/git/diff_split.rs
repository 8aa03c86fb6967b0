//! Per-file segmentation of labeled unified diff text.

use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;
use tracing::trace;

use crate::git::diff_source::{STAGED_LABEL, UNSTAGED_LABEL};

/// Prefix shared by every per-file header line in unified diff output.
const FILE_DIFF_MARKER: &str = "diff --git ";

/// Errors raised while segmenting diff text.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DiffError {
    /// A `diff --git` line whose old/new paths could not be extracted.
    #[error("Malformed diff header at line {line_number}: {line}")]
    MalformedHeader {
        /// 1-based line number within the combined diff text.
        line_number: usize,
        /// The offending header line.
        line: String,
    },
}

/// A per-file slice of a unified diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    /// Path of the file (the `b/` side of `diff --git a/... b/...`).
    pub path: String,
    /// Lines of this file's diff block, header included, joined with `\n`.
    pub body: String,
}

/// Ordered mapping from file path to that file's diff.
///
/// Entries keep the order in which their paths first appeared in the
/// input. Serializes as a JSON object in that same order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDiffMap {
    entries: Vec<FileDiff>,
    index: HashMap<String, usize>,
}

impl FileDiffMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a block, appending to the existing body when the path is
    /// already present (a file changed in both the staged and unstaged
    /// sections).
    fn insert_or_append(&mut self, path: String, body: String) {
        if let Some(&position) = self.index.get(&path) {
            let existing = &mut self.entries[position].body;
            existing.push('\n');
            existing.push_str(&body);
        } else {
            self.index.insert(path.clone(), self.entries.len());
            self.entries.push(FileDiff { path, body });
        }
    }

    /// Returns the diff for `path`, if present.
    pub fn get(&self, path: &str) -> Option<&FileDiff> {
        self.index.get(path).map(|&i| &self.entries[i])
    }

    /// Returns true when `path` is a key of this map.
    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Number of files in the map.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no file was found.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the file diffs in input order.
    pub fn iter(&self) -> std::slice::Iter<'_, FileDiff> {
        self.entries.iter()
    }

    /// Iterates over the paths in input order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|f| f.path.as_str())
    }
}

impl<'a> IntoIterator for &'a FileDiffMap {
    type Item = &'a FileDiff;
    type IntoIter = std::slice::Iter<'a, FileDiff>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Serialize for FileDiffMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for file in &self.entries {
            map.serialize_entry(&file.path, &file.body)?;
        }
        map.end()
    }
}

/// A file block being accumulated.
struct Block<'a> {
    path: String,
    lines: Vec<&'a str>,
    /// Still inside the extended header, before the first hunk.
    in_header: bool,
}

impl<'a> Block<'a> {
    fn new(path: String, header_line: &'a str) -> Self {
        Self {
            path,
            lines: vec![header_line],
            in_header: true,
        }
    }

    /// Appends a line; `+++ b/...` and `rename to ...` in the extended
    /// header name the new-side path unambiguously and replace the one
    /// taken from the `diff --git` line.
    fn push(&mut self, line: &'a str) {
        if self.in_header {
            if line.starts_with("@@") || line.starts_with("Binary files ") {
                self.in_header = false;
            } else if let Some(path) = extended_header_path(line) {
                self.path = path;
            }
        }
        self.lines.push(line);
    }
}

/// Splits labeled diff text into one [`FileDiff`] per `diff --git` block.
///
/// Lines outside any block (section labels, separators, preamble) are
/// dropped. A section label closes the open block so it never leaks into a
/// file body. Empty input, or input without a header, yields an empty map.
pub fn split_by_file(diff: &str) -> Result<FileDiffMap, DiffError> {
    let mut files = FileDiffMap::new();
    let mut current: Option<Block<'_>> = None;

    for (idx, line) in diff.lines().enumerate() {
        if line.starts_with(FILE_DIFF_MARKER) {
            let path = extract_path_from_diff_header(line).ok_or_else(|| {
                DiffError::MalformedHeader {
                    line_number: idx + 1,
                    line: line.to_string(),
                }
            })?;
            flush(&mut files, current.take());
            current = Some(Block::new(path, line));
        } else if is_section_label(line) {
            flush(&mut files, current.take());
        } else if let Some(block) = current.as_mut() {
            block.push(line);
        } else {
            trace!(line_number = idx + 1, "Dropping line outside any file block");
        }
    }
    flush(&mut files, current.take());

    Ok(files)
}

/// Moves a finished block into the map, without trailing blank lines.
fn flush(files: &mut FileDiffMap, block: Option<Block<'_>>) {
    let Some(mut block) = block else {
        return;
    };
    while block.lines.last().is_some_and(|l| l.is_empty()) {
        block.lines.pop();
    }
    files.insert_or_append(block.path, block.lines.join("\n"));
}

fn is_section_label(line: &str) -> bool {
    line == STAGED_LABEL || line == UNSTAGED_LABEL
}

/// Extracts the new-side path from a `diff --git` header line.
///
/// Quoted sides are unescaped. For unquoted sides the header is split where
/// both halves name the same file, which is the only unambiguous split when
/// a path contains ` b/`; renames fall back to the last ` b/`.
fn extract_path_from_diff_header(header_line: &str) -> Option<String> {
    let rest = header_line.strip_prefix(FILE_DIFF_MARKER)?;

    let path = if rest.starts_with('"') {
        let (_, after_old) = unquote_c_style(rest)?;
        strip_side_prefix(after_old.strip_prefix(' ')?, "b/")?
    } else if let Some(pos) = rest.find(" \"b/") {
        strip_side_prefix(&rest[pos + 1..], "b/")?
    } else {
        let sides = rest.strip_prefix("a/")?;
        split_unchanged_name(sides)
            .or_else(|| sides.rfind(" b/").map(|pos| sides[pos + 3..].to_string()))?
    };

    (!path.is_empty()).then_some(path)
}

/// Reads the path named by a `+++` or `rename to` extended header line.
fn extended_header_path(line: &str) -> Option<String> {
    let path = if let Some(rest) = line.strip_prefix("+++ ") {
        if rest == "/dev/null" {
            return None;
        }
        // Some producers end the name with a tab when it contains spaces.
        strip_side_prefix(rest.strip_suffix('\t').unwrap_or(rest), "b/")?
    } else {
        strip_side_prefix(line.strip_prefix("rename to ")?, "")?
    };
    (!path.is_empty()).then_some(path)
}

/// Unquotes `token` if needed and removes the `a/` / `b/` side prefix.
fn strip_side_prefix(token: &str, prefix: &str) -> Option<String> {
    if token.starts_with('"') {
        let (name, trailing) = unquote_c_style(token)?;
        if !trailing.is_empty() {
            return None;
        }
        name.strip_prefix(prefix).map(str::to_string)
    } else {
        token.strip_prefix(prefix).map(str::to_string)
    }
}

/// Splits `"<p> b/<p>"` into `<p>` when both halves are equal.
fn split_unchanged_name(sides: &str) -> Option<String> {
    let doubled = sides.len().checked_sub(3)?;
    if doubled == 0 || doubled % 2 != 0 {
        return None;
    }
    let half = doubled / 2;
    let old = sides.get(..half)?;
    let new = sides.get(half + 3..)?;
    (sides.get(half..half + 3)? == " b/" && old == new).then(|| new.to_string())
}

/// Decodes a C-style quoted string as written by git for unusual paths.
///
/// `text` must start with `"`. Returns the decoded value and whatever
/// follows the closing quote. Octal escapes are raw bytes, so multi-byte
/// UTF-8 sequences arrive as several `\ooo` groups.
fn unquote_c_style(text: &str) -> Option<(String, &str)> {
    let body = text.strip_prefix('"')?;
    let mut bytes = Vec::with_capacity(body.len());
    let mut chars = body.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => {
                let decoded = String::from_utf8_lossy(&bytes).into_owned();
                return Some((decoded, &body[i + 1..]));
            }
            '\\' => {
                let (_, escaped) = chars.next()?;
                let byte = match escaped {
                    'a' => 0x07,
                    'b' => 0x08,
                    't' => b'\t',
                    'n' => b'\n',
                    'v' => 0x0b,
                    'f' => 0x0c,
                    'r' => b'\r',
                    '"' => b'"',
                    '\\' => b'\\',
                    '0'..='7' => {
                        let mut value = escaped.to_digit(8)?;
                        for _ in 0..2 {
                            let (_, digit) = chars.next()?;
                            value = value * 8 + digit.to_digit(8)?;
                        }
                        u8::try_from(value).ok()?
                    }
                    _ => return None,
                };
                bytes.push(byte);
            }
            _ => {
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }

    None
}
