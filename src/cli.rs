//! CLI interface for commitsmith.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::ai::backend::create_backend;
use crate::git::diff_source::GitDiffSource;
use crate::pipeline::Orchestrator;
use crate::utils::preflight::{resolve_ai_config, Provider};

pub mod formatting;
pub mod message;
pub mod split;

/// commitsmith: proposes atomic commits for pending git changes.
#[derive(Parser)]
#[command(name = "commitsmith")]
#[command(about = "Proposes atomic commits for pending git changes", long_about = None)]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// The command to execute; `split` when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Options for the implicit `split` run.
    #[command(flatten)]
    pub ai: AiArgs,
}

/// Available workflows.
#[derive(Subcommand)]
pub enum Commands {
    /// Splits pending changes into atomic commit proposals.
    Split(split::SplitCommand),
    /// Proposes one commit message for all pending changes.
    Message(message::MessageCommand),
}

impl Cli {
    /// Executes the CLI command.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Some(Commands::Split(cmd)) => cmd.execute().await,
            Some(Commands::Message(cmd)) => cmd.execute().await,
            None => split::SplitCommand { ai: self.ai }.execute().await,
        }
    }
}

/// Options shared by every workflow.
#[derive(Args, Debug, Clone)]
pub struct AiArgs {
    /// Model to use (if not specified, uses settings or the provider default).
    #[arg(long)]
    pub model: Option<String>,

    /// Generation backend (if not specified, uses USE_OPENAI / USE_OLLAMA or Gemini).
    #[arg(long, value_enum)]
    pub provider: Option<Provider>,

    /// Repository to inspect.
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,
}

impl AiArgs {
    /// Resolves credentials, then opens the repository and wires the pipeline.
    ///
    /// Credentials are checked first so a missing key fails before any git work.
    pub(crate) fn build_orchestrator(&self) -> Result<Orchestrator> {
        let config = resolve_ai_config(self.model.as_deref(), self.provider)?;
        let backend = create_backend(&config)?;

        let source = GitDiffSource::open(&self.repo).with_context(|| {
            format!("Failed to open git repository at {}", self.repo.display())
        })?;

        Ok(Orchestrator::new(Box::new(source), backend))
    }
}
