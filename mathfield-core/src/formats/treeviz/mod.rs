//! Treeviz formatter for atom trees
//!
//! A visual representation of the atom tree, one line per atom or branch:
//!
//! ```text
//! ⧉ root (2 atoms)
//! ├─ ◦ x
//! └─ ⁄ fraction
//!   ├─ ➔ above
//!   │ └─ ◦ 1
//!   └─ ➔ below
//!     └─ ◦ 2
//! ```
//!
//! Labels are the atom value when it has one, else the kind name, followed
//! by kind data in brackets. Long labels are truncated to 30 characters.

use super::icons::get_icon;
use crate::atom::{Atom, AtomId, AtomKind, AtomTree, BranchName, Fence, ParseMode};
use crate::error::FormatError;
use crate::format::Format;

const MAX_LABEL: usize = 30;

fn truncate(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL {
        return label.to_string();
    }
    let head: String = label.chars().take(MAX_LABEL - 1).collect();
    format!("{head}…")
}

fn label(atom: &Atom) -> String {
    let mut label = match &atom.kind {
        AtomKind::Fence(Fence::Explicit { open, close }) => format!("{open} {close}"),
        AtomKind::Fence(Fence::Smart { open }) => format!("{open} ?"),
        AtomKind::Array(info) => format!("{} {}x{}", info.environment, info.rows, info.cols),
        AtomKind::Prompt(prompt) => {
            let mut text = format!("prompt {}", prompt.id);
            if prompt.locked {
                text.push_str(" (locked)");
            }
            text
        }
        AtomKind::Macro(reference) => format!("\\{}", reference.name),
        AtomKind::Text if atom.value == " " => "␣".to_string(),
        _ if !atom.value.is_empty() => atom.value.clone(),
        kind => kind.name().to_string(),
    };
    if atom.mode == ParseMode::Text && atom.kind != AtomKind::Text {
        label.push_str(" [text]");
    }
    if !atom.style.is_empty() {
        label.push_str(" [styled]");
    }
    truncate(&label)
}

fn format_atom(tree: &AtomTree, id: AtomId, prefix: &str, is_last: bool, output: &mut String) {
    let Some(atom) = tree.get(id) else {
        return;
    };
    let connector = if is_last { "└─" } else { "├─" };
    let icon = get_icon(atom.kind.name());
    output.push_str(&format!("{prefix}{connector} {icon} {}\n", label(atom)));

    let child_prefix = format!("{}{}", prefix, if is_last { "  " } else { "│ " });
    // single-body atoms list their children directly
    let branches = atom.branches();
    if let [(BranchName::Body, kids)] = branches {
        format_children(tree, kids, &child_prefix, output);
        return;
    }
    let branch_icon = get_icon("branch");
    for (i, (name, kids)) in branches.iter().enumerate() {
        let last_branch = i == branches.len() - 1;
        let connector = if last_branch { "└─" } else { "├─" };
        output.push_str(&format!("{child_prefix}{connector} {branch_icon} {}\n", name.label()));
        let kid_prefix = format!("{}{}", child_prefix, if last_branch { "  " } else { "│ " });
        format_children(tree, kids, &kid_prefix, output);
    }
}

fn format_children(tree: &AtomTree, children: &[AtomId], prefix: &str, output: &mut String) {
    for (i, child) in children.iter().enumerate() {
        format_atom(tree, *child, prefix, i == children.len() - 1, output);
    }
}

/// Render a run of atoms under a root header line
pub fn to_treeviz_str(tree: &AtomTree, atoms: &[AtomId]) -> String {
    let icon = get_icon("root");
    let mut output = format!("{icon} root ({} atoms)\n", atoms.len());
    format_children(tree, atoms, "", &mut output);
    output
}

/// Format implementation for treeviz format
pub struct TreevizFormat;

impl Format for TreevizFormat {
    fn name(&self) -> &str {
        "treeviz"
    }

    fn description(&self) -> &str {
        "Visual tree representation with indentation and Unicode icons"
    }

    fn file_extensions(&self) -> &[&str] {
        &["tree", "treeviz"]
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn serialize_subtree(&self, tree: &AtomTree, atoms: &[AtomId]) -> Result<String, FormatError> {
        Ok(to_treeviz_str(tree, atoms))
    }
}
