//! LaTeX format implementation
//!
//! The markup format itself, treated as one format among the others so that
//! every conversion goes through the same interface. Parsing delegates to
//! [`crate::parser`]; serialization lives in [`serializer`].
//!
//! `latex-expanded` writes the same markup with macro bodies in place of
//! macro names. It is export only: the expansion of a macro does not parse
//! back into the macro.

pub mod serializer;

use crate::atom::{AtomId, AtomTree};
use crate::error::FormatError;
use crate::format::Format;
use crate::parser::{parse, ParseContext};
use serializer::{serialize_atoms, LatexOptions};

pub use serializer::to_latex;

#[derive(Debug, Default, Clone, Copy)]
pub struct LatexFormat;

impl Format for LatexFormat {
    fn name(&self) -> &str {
        "latex"
    }

    fn description(&self) -> &str {
        "LaTeX-like math markup"
    }

    fn file_extensions(&self) -> &[&str] {
        &["tex", "latex"]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str, ctx: &ParseContext) -> Result<AtomTree, FormatError> {
        Ok(parse(source, ctx)?)
    }

    fn serialize_subtree(&self, tree: &AtomTree, atoms: &[AtomId]) -> Result<String, FormatError> {
        Ok(serialize_atoms(tree, atoms, &LatexOptions::default()))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LatexExpandedFormat;

impl Format for LatexExpandedFormat {
    fn name(&self) -> &str {
        "latex-expanded"
    }

    fn description(&self) -> &str {
        "LaTeX markup with macros expanded"
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn serialize_subtree(&self, tree: &AtomTree, atoms: &[AtomId]) -> Result<String, FormatError> {
        let options = LatexOptions {
            expand_macros: true,
            ..LatexOptions::default()
        };
        Ok(serialize_atoms(tree, atoms, &options))
    }
}
