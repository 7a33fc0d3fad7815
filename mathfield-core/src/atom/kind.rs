//! Atom kinds and branch names.
//!
//! The set of kinds is closed. Behavior shared between kinds lives in free
//! functions (here and in the parser, serializers and editor) that match on
//! [`AtomKind`] exhaustively.

use serde::{Deserialize, Serialize};

/// Named child slot of an atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BranchName {
    Body,
    Above,
    Below,
    Index,
    Superscript,
    Subscript,
    Cell(u16, u16),
}

impl BranchName {
    /// Canonical order of branches within one atom.
    pub fn rank(self) -> (u8, u16, u16) {
        match self {
            BranchName::Above => (0, 0, 0),
            BranchName::Below => (1, 0, 0),
            BranchName::Index => (2, 0, 0),
            BranchName::Body => (3, 0, 0),
            BranchName::Cell(row, col) => (4, row, col),
            BranchName::Superscript => (5, 0, 0),
            BranchName::Subscript => (6, 0, 0),
        }
    }

    pub fn is_script(self) -> bool {
        matches!(self, BranchName::Superscript | BranchName::Subscript)
    }

    pub fn label(self) -> String {
        match self {
            BranchName::Body => "body".to_string(),
            BranchName::Above => "above".to_string(),
            BranchName::Below => "below".to_string(),
            BranchName::Index => "index".to_string(),
            BranchName::Superscript => "superscript".to_string(),
            BranchName::Subscript => "subscript".to_string(),
            BranchName::Cell(row, col) => format!("cell-{row}-{col}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperatorKind {
    Binary,
    Relation,
    Punctuation,
    Open,
    Close,
    /// Big operators such as `\sum` and `\int`
    Large,
    /// Named functions such as `\sin`
    Function,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FractionKind {
    Frac,
    Display,
    Text,
    Binomial,
}

impl FractionKind {
    pub fn command(self) -> &'static str {
        match self {
            FractionKind::Frac => "frac",
            FractionKind::Display => "dfrac",
            FractionKind::Text => "tfrac",
            FractionKind::Binomial => "binom",
        }
    }
}

/// Delimiter pair of a fence atom.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Fence {
    /// `\left<open> ... \right<close>`
    Explicit { open: String, close: String },
    /// Auto-sized fence whose closing delimiter is still pending
    Smart { open: String },
}

impl Fence {
    pub fn open(&self) -> &str {
        match self {
            Fence::Explicit { open, .. } | Fence::Smart { open } => open,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArrayInfo {
    pub environment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<String>,
    pub rows: u16,
    pub cols: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Correctness {
    #[default]
    Undefined,
    Correct,
    Incorrect,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Prompt {
    pub id: String,
    #[serde(default)]
    pub correctness: Correctness,
    #[serde(default)]
    pub locked: bool,
}

impl Prompt {
    pub fn new(id: impl Into<String>) -> Self {
        Prompt {
            id: id.into(),
            correctness: Correctness::Undefined,
            locked: false,
        }
    }
}

/// Reference to a host-supplied macro or register, kept by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacroRef {
    pub name: String,
    /// Raw markup of each argument
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "type", content = "data")]
pub enum AtomKind {
    Root,
    Ord,
    Operator(OperatorKind),
    Fraction(FractionKind),
    Radical,
    Subsup,
    Fence(Fence),
    Array(ArrayInfo),
    Placeholder,
    Prompt(Prompt),
    Text,
    Group,
    Accent,
    Space,
    Macro(MacroRef),
    Error,
}

impl AtomKind {
    pub fn name(&self) -> &'static str {
        match self {
            AtomKind::Root => "root",
            AtomKind::Ord => "ord",
            AtomKind::Operator(OperatorKind::Binary) => "bin",
            AtomKind::Operator(OperatorKind::Relation) => "rel",
            AtomKind::Operator(OperatorKind::Punctuation) => "punct",
            AtomKind::Operator(OperatorKind::Open) => "open",
            AtomKind::Operator(OperatorKind::Close) => "close",
            AtomKind::Operator(OperatorKind::Large) => "large-op",
            AtomKind::Operator(OperatorKind::Function) => "function",
            AtomKind::Fraction(_) => "fraction",
            AtomKind::Radical => "radical",
            AtomKind::Subsup => "subsup",
            AtomKind::Fence(Fence::Explicit { .. }) => "fence",
            AtomKind::Fence(Fence::Smart { .. }) => "smart-fence",
            AtomKind::Array(_) => "array",
            AtomKind::Placeholder => "placeholder",
            AtomKind::Prompt(_) => "prompt",
            AtomKind::Text => "text",
            AtomKind::Group => "group",
            AtomKind::Accent => "accent",
            AtomKind::Space => "space",
            AtomKind::Macro(_) => "macro",
            AtomKind::Error => "error",
        }
    }

    /// Branches that must always be present for this kind.
    pub fn required_branches(&self) -> Vec<BranchName> {
        match self {
            AtomKind::Root
            | AtomKind::Fence(_)
            | AtomKind::Prompt(_)
            | AtomKind::Group
            | AtomKind::Accent
            | AtomKind::Macro(_)
            | AtomKind::Radical => vec![BranchName::Body],
            AtomKind::Fraction(_) => vec![BranchName::Above, BranchName::Below],
            AtomKind::Array(info) => (0..info.rows)
                .flat_map(|r| (0..info.cols).map(move |c| BranchName::Cell(r, c)))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Whether `branch` may appear on an atom of this kind.
    pub fn allows_branch(&self, branch: BranchName) -> bool {
        if branch.is_script() {
            return self.takes_scripts();
        }
        match self {
            AtomKind::Radical => matches!(branch, BranchName::Body | BranchName::Index),
            AtomKind::Array(info) => match branch {
                BranchName::Cell(r, c) => r < info.rows && c < info.cols,
                _ => false,
            },
            _ => self.required_branches().contains(&branch),
        }
    }

    /// Whether `^`/`_` attach to an atom of this kind.
    pub fn takes_scripts(&self) -> bool {
        !matches!(self, AtomKind::Root | AtomKind::Text)
    }

    /// Atoms navigated as one unit: the caret never stops inside them.
    pub fn captures_selection(&self) -> bool {
        match self {
            AtomKind::Macro(_) => true,
            AtomKind::Prompt(prompt) => prompt.locked,
            _ => false,
        }
    }

    pub fn is_operator(&self, op: OperatorKind) -> bool {
        matches!(self, AtomKind::Operator(kind) if *kind == op)
    }
}

/// Closing delimiter matching `open`, if `open` is a known opener.
pub fn matching_close(open: &str) -> Option<&'static str> {
    Some(match open {
        "(" => ")",
        "[" => "]",
        "\\{" => "\\}",
        "\\lbrace" => "\\rbrace",
        "\\langle" => "\\rangle",
        "\\lfloor" => "\\rfloor",
        "\\lceil" => "\\rceil",
        "\\lvert" => "\\rvert",
        "\\lVert" => "\\rVert",
        "|" => "|",
        "\\|" => "\\|",
        "." => ".",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_rank_orders_scripts_last() {
        let mut names = vec![
            BranchName::Subscript,
            BranchName::Body,
            BranchName::Superscript,
            BranchName::Index,
        ];
        names.sort_by_key(|b| b.rank());
        assert_eq!(
            names,
            vec![
                BranchName::Index,
                BranchName::Body,
                BranchName::Superscript,
                BranchName::Subscript
            ]
        );
    }

    #[test]
    fn test_array_required_branches_are_row_major() {
        let kind = AtomKind::Array(ArrayInfo {
            environment: "matrix".into(),
            columns: None,
            rows: 2,
            cols: 2,
        });
        assert_eq!(
            kind.required_branches(),
            vec![
                BranchName::Cell(0, 0),
                BranchName::Cell(0, 1),
                BranchName::Cell(1, 0),
                BranchName::Cell(1, 1)
            ]
        );
        assert!(!kind.allows_branch(BranchName::Cell(2, 0)));
    }

    #[test]
    fn test_capture_rules() {
        let mut prompt = Prompt::new("p1");
        assert!(!AtomKind::Prompt(prompt.clone()).captures_selection());
        prompt.locked = true;
        assert!(AtomKind::Prompt(prompt).captures_selection());
        assert!(AtomKind::Macro(MacroRef {
            name: "R".into(),
            args: vec![]
        })
        .captures_selection());
    }

    #[test]
    fn test_matching_close() {
        assert_eq!(matching_close("("), Some(")"));
        assert_eq!(matching_close("\\langle"), Some("\\rangle"));
        assert_eq!(matching_close("x"), None);
    }
}
