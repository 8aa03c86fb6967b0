//! Retrieval of staged and unstaged diff text.

use std::path::Path;

use anyhow::{Context, Result};
use git2::{Diff, DiffFormat, ErrorCode, Repository, Tree};
use tracing::debug;

/// Label line preceding the staged section of the combined diff text.
pub const STAGED_LABEL: &str = "### STAGED CHANGES";

/// Label line preceding the unstaged section of the combined diff text.
pub const UNSTAGED_LABEL: &str = "### UNSTAGED CHANGES";

/// Read-only access to the pending changes of a working tree.
pub trait DiffSource {
    /// Returns the unified diff of changes staged in the index.
    fn staged_diff(&self) -> Result<String>;

    /// Returns the unified diff of working-tree changes not yet staged.
    fn unstaged_diff(&self) -> Result<String>;
}

/// Concatenates the two sections into one labeled text stream.
///
/// Sections that are empty or whitespace-only are omitted together with
/// their label; if both are, the result is empty.
pub fn combine_sections(staged: &str, unstaged: &str) -> String {
    let mut parts: Vec<String> = Vec::new();

    if !staged.trim().is_empty() {
        parts.push(format!("{STAGED_LABEL}\n"));
        parts.push(staged.to_string());
    }

    if !unstaged.trim().is_empty() {
        parts.push(format!("\n{UNSTAGED_LABEL}\n"));
        parts.push(unstaged.to_string());
    }

    parts.join("\n")
}

/// Queries both sections from `source` and combines them.
pub fn collect_diff_text(source: &dyn DiffSource) -> Result<String> {
    let staged = source.staged_diff().context("Failed to read staged diff")?;
    let unstaged = source
        .unstaged_diff()
        .context("Failed to read unstaged diff")?;

    debug!(
        staged_len = staged.len(),
        unstaged_len = unstaged.len(),
        "Collected working tree diffs"
    );

    Ok(combine_sections(&staged, &unstaged))
}

/// [`DiffSource`] backed by a git repository on disk.
pub struct GitDiffSource {
    repo: Repository,
}

impl GitDiffSource {
    /// Opens the repository containing `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let repo = Repository::discover(path)
            .with_context(|| format!("Not in a git repository: {}", path.display()))?;

        Ok(Self { repo })
    }

    /// Wraps an already opened repository.
    pub fn from_repository(repo: Repository) -> Self {
        Self { repo }
    }

    /// Resolves the HEAD tree; `None` for a repository without commits.
    fn head_tree(&self) -> Result<Option<Tree<'_>>> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                return Ok(None);
            }
            Err(e) => return Err(e).context("Failed to resolve HEAD"),
        };

        let tree = head.peel_to_tree().context("Failed to peel HEAD to tree")?;
        Ok(Some(tree))
    }
}

impl DiffSource for GitDiffSource {
    fn staged_diff(&self) -> Result<String> {
        let head_tree = self.head_tree()?;
        let diff = self
            .repo
            .diff_tree_to_index(head_tree.as_ref(), None, None)
            .context("Failed to diff HEAD against the index")?;

        render_patch(&diff)
    }

    fn unstaged_diff(&self) -> Result<String> {
        let diff = self
            .repo
            .diff_index_to_workdir(None, None)
            .context("Failed to diff the index against the working tree")?;

        render_patch(&diff)
    }
}

/// Renders a git2 diff as unified patch text.
fn render_patch(diff: &Diff<'_>) -> Result<String> {
    let mut patch = String::new();

    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        let content = String::from_utf8_lossy(line.content());
        let prefix = match line.origin() {
            '+' => "+",
            '-' => "-",
            ' ' => " ",
            _ => "",
        };
        patch.push_str(prefix);
        patch.push_str(&content);
        true
    })
    .context("Failed to format diff")?;

    Ok(patch)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::fs;

    use git2::Signature;
    use tempfile::TempDir;

    use super::*;

    struct FixedSource {
        staged: &'static str,
        unstaged: &'static str,
    }

    impl DiffSource for FixedSource {
        fn staged_diff(&self) -> Result<String> {
            Ok(self.staged.to_string())
        }

        fn unstaged_diff(&self) -> Result<String> {
            Ok(self.unstaged.to_string())
        }
    }

    fn init_repo() -> (TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Test User").unwrap();
        config.set_str("user.email", "test@example.com").unwrap();
        (dir, repo)
    }

    fn commit_file(dir: &TempDir, repo: &Repository, name: &str, content: &str) {
        fs::write(dir.path().join(name), content).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Test User", "test@example.com").unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &parents)
            .unwrap();
    }

    #[test]
    fn combine_both_sections() {
        let combined = combine_sections("staged\n", "unstaged\n");
        assert_eq!(
            combined,
            "### STAGED CHANGES\n\nstaged\n\n\n### UNSTAGED CHANGES\n\nunstaged\n"
        );
    }

    #[test]
    fn combine_omits_empty_sections() {
        assert_eq!(
            combine_sections("  \n", "unstaged"),
            "\n### UNSTAGED CHANGES\n\nunstaged"
        );
        assert_eq!(combine_sections("staged", ""), "### STAGED CHANGES\n\nstaged");
    }

    #[test]
    fn combine_both_empty_is_empty() {
        assert_eq!(combine_sections("", " \n\t"), "");
    }

    #[test]
    fn collect_uses_both_queries() {
        let source = FixedSource {
            staged: "a",
            unstaged: "b",
        };
        let text = collect_diff_text(&source).unwrap();
        assert!(text.contains(STAGED_LABEL));
        assert!(text.contains(UNSTAGED_LABEL));
    }

    #[test]
    fn clean_repository_has_no_diff() {
        let (dir, repo) = init_repo();
        commit_file(&dir, &repo, "a.txt", "one\n");
        let source = GitDiffSource::from_repository(repo);

        assert!(source.staged_diff().unwrap().is_empty());
        assert!(source.unstaged_diff().unwrap().is_empty());
    }

    #[test]
    fn unborn_head_reports_staged_files() {
        let (dir, repo) = init_repo();
        fs::write(dir.path().join("new.txt"), "hello\n").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("new.txt")).unwrap();
        index.write().unwrap();
        let source = GitDiffSource::from_repository(repo);

        let staged = source.staged_diff().unwrap();
        assert!(staged.starts_with("diff --git a/new.txt b/new.txt"));
        assert!(staged.contains("+hello"));
    }

    #[test]
    fn separates_staged_and_unstaged_changes() {
        let (dir, repo) = init_repo();
        commit_file(&dir, &repo, "a.txt", "one\n");
        commit_file(&dir, &repo, "b.txt", "two\n");

        fs::write(dir.path().join("a.txt"), "one changed\n").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("a.txt")).unwrap();
        index.write().unwrap();
        fs::write(dir.path().join("b.txt"), "two changed\n").unwrap();

        let source = GitDiffSource::from_repository(repo);
        let staged = source.staged_diff().unwrap();
        let unstaged = source.unstaged_diff().unwrap();

        assert!(staged.contains("diff --git a/a.txt b/a.txt"));
        assert!(staged.contains("-one\n+one changed"));
        assert!(!staged.contains("b.txt"));
        assert!(unstaged.contains("diff --git a/b.txt b/b.txt"));
        assert!(!unstaged.contains("a.txt"));
    }

    #[test]
    fn non_utf8_line_keeps_its_readable_bytes() {
        let (dir, repo) = init_repo();
        commit_file(&dir, &repo, "notes.txt", "header\n");
        fs::write(dir.path().join("notes.txt"), b"header\ncaf\xe9 au lait\n").unwrap();
        let source = GitDiffSource::from_repository(repo);

        let unstaged = source.unstaged_diff().unwrap();
        assert!(unstaged.contains("+caf\u{FFFD} au lait\n"));
        assert!(unstaged.contains(" header\n"));
        assert!(!unstaged.contains("<binary>"));
    }
}
