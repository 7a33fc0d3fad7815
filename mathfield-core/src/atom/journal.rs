//! Journal of structural mutations.
//!
//! Every mutating method of [`AtomTree`](super::AtomTree) appends one entry.
//! The edit engine drains the journal after each command: an empty journal
//! means the command did not change the tree.

use super::kind::BranchName;
use super::style::Style;
use super::tree::AtomId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Created {
        atom: AtomId,
    },
    Inserted {
        parent: AtomId,
        branch: BranchName,
        index: usize,
        atoms: Vec<AtomId>,
    },
    Detached {
        parent: AtomId,
        branch: BranchName,
        index: usize,
        atoms: Vec<AtomId>,
    },
    BranchCreated {
        atom: AtomId,
        branch: BranchName,
    },
    BranchRemoved {
        atom: AtomId,
        branch: BranchName,
    },
    StyleChanged {
        atom: AtomId,
        before: Style,
        after: Style,
    },
    Retagged {
        atom: AtomId,
    },
    /// Prompt correctness or lock state
    PromptStateChanged {
        atom: AtomId,
    },
    Freed {
        atom: AtomId,
    },
}

impl Mutation {
    /// Short label used by logs and the CLI `edit` report.
    pub fn label(&self) -> &'static str {
        match self {
            Mutation::Created { .. } => "created",
            Mutation::Inserted { .. } => "inserted",
            Mutation::Detached { .. } => "detached",
            Mutation::BranchCreated { .. } => "branch-created",
            Mutation::BranchRemoved { .. } => "branch-removed",
            Mutation::StyleChanged { .. } => "style",
            Mutation::Retagged { .. } => "retagged",
            Mutation::PromptStateChanged { .. } => "prompt-state",
            Mutation::Freed { .. } => "freed",
        }
    }
}
