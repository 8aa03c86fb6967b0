//! Plain-text rendering of pipeline results.
//!
//! Pure functions returning strings so the command modules only print.

use crate::pipeline::{MessageProposal, Proposal};

/// Printed before the diff is read.
pub(crate) const ANALYZING_NOTICE: &str = "Analyzing git changes...";

/// Printed when there is nothing to commit.
pub(crate) const NO_CHANGES_NOTICE: &str = "No changes detected in git.";

/// Printed before the backend is asked for a single message.
pub(crate) const MESSAGE_NOTICE: &str = "Creating the commit message...";

/// Printed before the backend is asked for commit groups.
pub(crate) const GROUPING_NOTICE: &str = "Grouping changes into atomic commits...";

const SEPARATOR_WIDTH: usize = 40;

fn separator() -> String {
    "-".repeat(SEPARATOR_WIDTH)
}

fn analysis_or_placeholder(analysis: Option<&str>) -> &str {
    match analysis {
        Some(text) if !text.trim().is_empty() => text,
        _ => "N/A",
    }
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

/// Renders the analysis, suggested message and commands of one proposal.
pub(crate) fn format_proposal(index: usize, total: usize, proposal: &Proposal) -> String {
    let group = &proposal.group;
    let mut out = String::new();

    push_line(&mut out, &separator());
    push_line(
        &mut out,
        &format!("Commit {index}/{total} ({})", group.commit_type),
    );
    push_line(&mut out, &separator());
    push_line(&mut out, "Analysis:");
    push_line(&mut out, "");
    push_line(&mut out, analysis_or_placeholder(group.analysis.as_deref()));
    push_line(&mut out, &separator());
    push_line(&mut out, "Suggested Commit:");
    push_line(&mut out, "");
    push_line(&mut out, &group.subject);
    if !group.body.trim().is_empty() {
        push_line(&mut out, group.body.trim_end());
    }
    push_line(&mut out, &separator());
    push_line(&mut out, "");
    push_line(&mut out, &proposal.commands.stage);
    push_line(&mut out, &proposal.commands.commit);
    push_line(&mut out, &separator());
    out
}

/// Renders every proposal in order.
pub(crate) fn format_proposals(proposals: &[Proposal]) -> String {
    let total = proposals.len();
    proposals
        .iter()
        .enumerate()
        .map(|(i, proposal)| format_proposal(i + 1, total, proposal))
        .collect()
}

/// Renders a single-message proposal.
pub(crate) fn format_message(proposal: &MessageProposal) -> String {
    let message = &proposal.message;
    let mut out = String::new();

    push_line(&mut out, &separator());
    push_line(&mut out, "Analysis:");
    push_line(&mut out, "");
    push_line(&mut out, analysis_or_placeholder(message.analysis.as_deref()));
    push_line(&mut out, &separator());
    push_line(&mut out, "Suggested Commit:");
    push_line(&mut out, "");
    push_line(&mut out, &message.subject);
    push_line(&mut out, message.body.trim_end());
    push_line(&mut out, &separator());
    push_line(&mut out, "");
    push_line(&mut out, &proposal.command);
    push_line(&mut out, &separator());
    out
}
