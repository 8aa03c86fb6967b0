//! Message command: proposes one commit message for all pending changes.

use anyhow::Result;
use clap::Parser;

use super::formatting::{format_message, ANALYZING_NOTICE, MESSAGE_NOTICE, NO_CHANGES_NOTICE};
use super::AiArgs;
use crate::pipeline::Outcome;

/// Message command options.
#[derive(Parser)]
pub struct MessageCommand {
    /// Backend and repository options.
    #[command(flatten)]
    pub ai: AiArgs,
}

impl MessageCommand {
    /// Runs the single-message flow and prints the message and commit command.
    pub async fn execute(self) -> Result<()> {
        let orchestrator = self.ai.build_orchestrator()?;

        println!("{ANALYZING_NOTICE}");
        println!("{MESSAGE_NOTICE}");

        match orchestrator.run_single().await? {
            Outcome::NoChanges => println!("{NO_CHANGES_NOTICE}"),
            Outcome::Proposed(proposal) => print!("{}", format_message(&proposal)),
        }

        Ok(())
    }
}
