//! The import/export seam
//!
//! A format turns markup into an atom tree, an atom tree (or a run of sibling
//! atoms) back into text, or both.

use crate::atom::{AtomId, AtomTree};
use crate::error::FormatError;
use crate::parser::ParseContext;

/// Serialization is defined over a run of siblings so that a selection is
/// exported the same way as a whole formula.
///
/// ```ignore
/// struct AtomCount;
///
/// impl Format for AtomCount {
///     fn name(&self) -> &str {
///         "atom-count"
///     }
///     fn supports_serialization(&self) -> bool {
///         true
///     }
///     fn serialize_subtree(&self, _: &AtomTree, atoms: &[AtomId]) -> Result<String, FormatError> {
///         Ok(atoms.len().to_string())
///     }
/// }
/// ```
pub trait Format: Send + Sync {
    /// The name of this format (e.g., "latex", "plain-text")
    fn name(&self) -> &str;

    /// One line for `--list-formats`
    fn description(&self) -> &str {
        ""
    }

    /// File extensions associated with this format, without the leading dot
    fn file_extensions(&self) -> &[&str] {
        &[]
    }

    /// Whether this format supports parsing (source → tree)
    fn supports_parsing(&self) -> bool {
        false
    }

    /// Whether this format supports serialization (tree → source)
    fn supports_serialization(&self) -> bool {
        false
    }

    /// Parse source text into an atom tree
    fn parse(&self, _source: &str, _ctx: &ParseContext) -> Result<AtomTree, FormatError> {
        Err(FormatError::NotSupported(format!(
            "Format '{}' does not support parsing",
            self.name()
        )))
    }

    /// Serialize a whole tree
    fn serialize(&self, tree: &AtomTree) -> Result<String, FormatError> {
        self.serialize_subtree(tree, tree.body())
    }

    /// Serialize a run of sibling atoms of `tree`
    fn serialize_subtree(&self, _tree: &AtomTree, _atoms: &[AtomId]) -> Result<String, FormatError> {
        Err(FormatError::NotSupported(format!(
            "Format '{}' does not support serialization",
            self.name()
        )))
    }
}
