//! Split command: proposes a partition of pending changes into atomic commits.

use anyhow::Result;
use clap::Parser;

use super::formatting::{format_proposals, ANALYZING_NOTICE, GROUPING_NOTICE, NO_CHANGES_NOTICE};
use super::AiArgs;
use crate::pipeline::Outcome;

/// Split command options.
#[derive(Parser)]
pub struct SplitCommand {
    /// Backend and repository options.
    #[command(flatten)]
    pub ai: AiArgs,
}

impl SplitCommand {
    /// Runs the grouping flow and prints each proposal with its commands.
    pub async fn execute(self) -> Result<()> {
        let orchestrator = self.ai.build_orchestrator()?;

        println!("{ANALYZING_NOTICE}");
        println!("{GROUPING_NOTICE}");

        match orchestrator.run_grouping().await? {
            Outcome::NoChanges => println!("{NO_CHANGES_NOTICE}"),
            Outcome::Proposed(proposals) => print!("{}", format_proposals(&proposals)),
        }

        Ok(())
    }
}
