//! Git diff retrieval, segmentation and command synthesis.

pub mod command;
pub mod diff_source;
pub mod diff_split;

pub use command::{synthesize, CommandPair};
pub use diff_source::{collect_diff_text, combine_sections, DiffSource, GitDiffSource};
pub use diff_split::{split_by_file, DiffError, FileDiff, FileDiffMap};
