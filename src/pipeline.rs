//! Orchestration of the diff-to-commit pipeline.

use std::fmt;

use anyhow::{Context, Result};
use tracing::debug;

use crate::ai::backend::{GenerationBackend, ResponseShape};
use crate::ai::prompts::{build_grouping_prompt, build_message_prompt};
use crate::ai::response::{parse_commit_message, parse_commit_plan, CommitGroup, CommitMessage};
use crate::git::command::{commit_command, synthesize, CommandPair};
use crate::git::diff_source::{collect_diff_text, DiffSource};
use crate::git::diff_split::split_by_file;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Reading staged and unstaged diffs.
    CollectingDiff,
    /// Splitting the diff text per file.
    Segmenting,
    /// Waiting on the generation backend.
    Requesting,
    /// Decoding and checking the backend response.
    Validating,
    /// Building shell commands.
    Synthesizing,
    /// Handing results to the caller.
    Presenting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::CollectingDiff => "collecting diff",
            Stage::Segmenting => "segmenting diff",
            Stage::Requesting => "requesting generation",
            Stage::Validating => "validating response",
            Stage::Synthesizing => "synthesizing commands",
            Stage::Presenting => "presenting results",
        };
        write!(f, "{name} stage failed")
    }
}

/// One validated commit group with its commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    /// The group as returned by the backend.
    pub group: CommitGroup,
    /// Commands realizing the group.
    pub commands: CommandPair,
}

/// A single commit message with its commit command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageProposal {
    /// The message as returned by the backend.
    pub message: CommitMessage,
    /// `git commit` command recording the message.
    pub command: String,
}

/// Terminal state of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// Nothing to commit.
    NoChanges,
    /// The backend's proposal, validated and ready to present.
    Proposed(T),
}

/// Runs the pipeline against one diff source and one backend.
pub struct Orchestrator {
    source: Box<dyn DiffSource>,
    backend: Box<dyn GenerationBackend>,
}

impl Orchestrator {
    /// Creates an orchestrator over `source` and `backend`.
    pub fn new(source: Box<dyn DiffSource>, backend: Box<dyn GenerationBackend>) -> Self {
        Self { source, backend }
    }

    /// Proposes a partition of the pending changes into atomic commits.
    pub async fn run_grouping(&self) -> Result<Outcome<Vec<Proposal>>> {
        let Some(diff) = self.collect()? else {
            return Ok(Outcome::NoChanges);
        };

        enter(Stage::Segmenting);
        let files = split_by_file(&diff).context(Stage::Segmenting)?;
        if files.is_empty() {
            debug!("No file headers in diff text");
            return Ok(Outcome::NoChanges);
        }
        debug!(file_count = files.len(), "Segmented diff");

        let prompt = build_grouping_prompt(&files).context(Stage::Requesting)?;
        let text = self
            .request(&prompt.text, ResponseShape::CommitGroups)
            .await?;

        enter(Stage::Validating);
        let plan = parse_commit_plan(&text, &files).context(Stage::Validating)?;
        debug!(commit_count = plan.commits.len(), "Validated commit plan");

        enter(Stage::Synthesizing);
        let proposals = plan
            .commits
            .into_iter()
            .map(|group| {
                let commands = synthesize(&group);
                Proposal { group, commands }
            })
            .collect();

        enter(Stage::Presenting);
        Ok(Outcome::Proposed(proposals))
    }

    /// Proposes one commit message for all pending changes.
    pub async fn run_single(&self) -> Result<Outcome<MessageProposal>> {
        let Some(diff) = self.collect()? else {
            return Ok(Outcome::NoChanges);
        };

        let prompt = build_message_prompt(&diff);
        let text = self
            .request(&prompt.text, ResponseShape::SingleMessage)
            .await?;

        enter(Stage::Validating);
        let message = parse_commit_message(&text).context(Stage::Validating)?;

        enter(Stage::Synthesizing);
        let command = commit_command(&message.subject, &message.body);

        enter(Stage::Presenting);
        Ok(Outcome::Proposed(MessageProposal { message, command }))
    }

    /// Returns the combined diff text, or `None` when there is nothing to commit.
    fn collect(&self) -> Result<Option<String>> {
        enter(Stage::CollectingDiff);
        let diff = collect_diff_text(self.source.as_ref()).context(Stage::CollectingDiff)?;

        if diff.trim().is_empty() {
            debug!("No staged or unstaged changes");
            return Ok(None);
        }
        Ok(Some(diff))
    }

    async fn request(&self, prompt: &str, shape: ResponseShape) -> Result<String> {
        enter(Stage::Requesting);
        let metadata = self.backend.get_metadata();
        debug!(
            provider = %metadata.provider,
            model = %metadata.model,
            prompt_len = prompt.len(),
            "Requesting generation"
        );
        self.backend
            .send_request(prompt, shape)
            .await
            .context(Stage::Requesting)
    }
}

fn enter(stage: Stage) {
    debug!(stage = ?stage, "Entering pipeline stage");
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::ai::error::AiError;
    use crate::ai::test_utils::ConfigurableMockBackend;

    struct FixedSource {
        staged: String,
        unstaged: String,
    }

    impl DiffSource for FixedSource {
        fn staged_diff(&self) -> Result<String> {
            Ok(self.staged.clone())
        }

        fn unstaged_diff(&self) -> Result<String> {
            Ok(self.unstaged.clone())
        }
    }

    fn source(staged: &str, unstaged: &str) -> Box<dyn DiffSource> {
        Box::new(FixedSource {
            staged: staged.to_string(),
            unstaged: unstaged.to_string(),
        })
    }

    const A_PY: &str = "diff --git a/a.py b/a.py\nindex 1..2 100644\n--- a/a.py\n+++ b/a.py\n@@ -1 +1 @@\n-old\n+new\n";

    const SCENARIO_C: &str = r#"{"commits":[{"type":"feat","subject":"feat: add x","body":"line1\nline2","analysis":"...","paths":["a.py"]}]}"#;

    #[tokio::test]
    async fn empty_diffs_reach_no_changes_without_a_request() {
        let backend = ConfigurableMockBackend::replying(SCENARIO_C);
        let prompts = backend.prompt_handle();
        let responses = backend.response_handle();
        let orchestrator = Orchestrator::new(source("", "  \n\t"), Box::new(backend));

        let outcome = orchestrator.run_grouping().await.unwrap();

        assert_eq!(outcome, Outcome::NoChanges);
        assert_eq!(prompts.request_count(), 0);
        assert_eq!(responses.remaining(), 1);
    }

    #[tokio::test]
    async fn single_flow_also_detects_no_changes() {
        let backend = ConfigurableMockBackend::new(vec![]);
        let prompts = backend.prompt_handle();
        let orchestrator = Orchestrator::new(source("", ""), Box::new(backend));

        assert_eq!(orchestrator.run_single().await.unwrap(), Outcome::NoChanges);
        assert_eq!(prompts.request_count(), 0);
    }

    #[tokio::test]
    async fn diff_without_headers_is_no_changes() {
        let backend = ConfigurableMockBackend::new(vec![]);
        let prompts = backend.prompt_handle();
        let orchestrator =
            Orchestrator::new(source("Binary files differ\n", ""), Box::new(backend));

        assert_eq!(orchestrator.run_grouping().await.unwrap(), Outcome::NoChanges);
        assert_eq!(prompts.request_count(), 0);
    }

    #[tokio::test]
    async fn grouping_produces_commands() {
        let backend = ConfigurableMockBackend::replying(SCENARIO_C);
        let prompts = backend.prompt_handle();
        let orchestrator = Orchestrator::new(source(A_PY, ""), Box::new(backend));

        let Outcome::Proposed(proposals) = orchestrator.run_grouping().await.unwrap() else {
            panic!("expected proposals");
        };

        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].commands.stage, "git add a.py");
        assert_eq!(
            proposals[0].commands.commit,
            r#"git commit -m "feat: add x" -m "line1" -m "line2""#
        );

        let recorded = prompts.prompts();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].1, ResponseShape::CommitGroups);
        assert!(recorded[0].0.contains("- a.py\n"));
    }

    #[tokio::test]
    async fn disallowed_type_aborts_in_validation() {
        let response = SCENARIO_C.replace(r#""type":"feat""#, r#""type":"wip""#);
        let backend = ConfigurableMockBackend::new(vec![Ok(response)]);
        let orchestrator = Orchestrator::new(source(A_PY, ""), Box::new(backend));

        let err = orchestrator.run_grouping().await.unwrap_err();

        assert_eq!(err.to_string(), Stage::Validating.to_string());
        assert!(matches!(
            err.root_cause().downcast_ref::<AiError>(),
            Some(AiError::SchemaViolation(_))
        ));
    }

    #[tokio::test]
    async fn non_json_response_is_malformed() {
        let backend = ConfigurableMockBackend::replying("Sure! Here are your commits.");
        let orchestrator = Orchestrator::new(source(A_PY, ""), Box::new(backend));

        let err = orchestrator.run_grouping().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AiError>(),
            Some(AiError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn backend_failure_names_request_stage() {
        let backend = ConfigurableMockBackend::new(vec![Err(
            AiError::BackendUnavailable("HTTP 503".to_string()).into(),
        )]);
        let orchestrator = Orchestrator::new(source(A_PY, ""), Box::new(backend));

        let err = orchestrator.run_grouping().await.unwrap_err();
        assert_eq!(err.to_string(), "requesting generation stage failed");
        assert!(format!("{err:#}").contains("HTTP 503"));
    }

    #[tokio::test]
    async fn uncovered_file_is_rejected() {
        let two_files = format!("{A_PY}diff --git a/b.py b/b.py\n@@ -1 +1 @@\n-x\n+y\n");
        let backend = ConfigurableMockBackend::replying(SCENARIO_C);
        let orchestrator = Orchestrator::new(source(&two_files, ""), Box::new(backend));

        let err = orchestrator.run_grouping().await.unwrap_err();
        assert!(format!("{err:#}").contains("b.py"));
    }

    #[tokio::test]
    async fn malformed_header_fails_segmentation() {
        let backend = ConfigurableMockBackend::new(vec![]);
        let orchestrator =
            Orchestrator::new(source("diff --git broken\n+x\n", ""), Box::new(backend));

        let err = orchestrator.run_grouping().await.unwrap_err();
        assert_eq!(err.to_string(), "segmenting diff stage failed");
    }

    #[tokio::test]
    async fn single_message_flow() {
        let backend = ConfigurableMockBackend::replying(
            r#"{"subject":"fix: handle \"empty\" input","body":"Guard the parser.\n\nBREAKING CHANGE: none","analysis":"small fix"}"#,
        );
        let prompts = backend.prompt_handle();
        let orchestrator = Orchestrator::new(source("", A_PY), Box::new(backend));

        let Outcome::Proposed(proposal) = orchestrator.run_single().await.unwrap() else {
            panic!("expected a message");
        };

        assert_eq!(proposal.message.analysis.as_deref(), Some("small fix"));
        assert_eq!(
            proposal.command,
            r#"git commit -m "fix: handle \"empty\" input" -m "Guard the parser." -m "BREAKING CHANGE: none""#
        );

        let recorded = prompts.prompts();
        assert_eq!(recorded[0].1, ResponseShape::SingleMessage);
        assert!(recorded[0].0.contains("### UNSTAGED CHANGES"));
    }
}
