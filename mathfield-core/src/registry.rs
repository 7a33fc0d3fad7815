//! Name-based lookup of the import/export formats
//!
//! The CLI and [`crate::Mathfield::get_value`] resolve format names here, so a
//! host can register its own [`Format`] next to the built-in ones.

use std::collections::BTreeMap;

use crate::atom::{AtomId, AtomTree};
use crate::error::FormatError;
use crate::format::Format;
use crate::formats::{
    JsonFormat, LatexExpandedFormat, LatexFormat, PlainTextFormat, SpokenTextFormat, TagFormat,
    TreevizFormat,
};
use crate::parser::ParseContext;

/// Formats keyed by name
///
/// ```ignore
/// let registry = FormatRegistry::default();
/// let tree = registry.parse("\\frac{1}{2}", "latex", &ParseContext::default())?;
/// let text = registry.serialize(&tree, "plain-text")?;
/// ```
pub struct FormatRegistry {
    formats: BTreeMap<String, Box<dyn Format>>,
}

impl FormatRegistry {
    /// An empty registry
    pub fn new() -> Self {
        FormatRegistry {
            formats: BTreeMap::new(),
        }
    }

    /// Add `format`; a format already registered under the same name is replaced.
    pub fn register<F: Format + 'static>(&mut self, format: F) {
        self.formats.insert(format.name().to_string(), Box::new(format));
    }

    pub fn get(&self, name: &str) -> Result<&dyn Format, FormatError> {
        match self.formats.get(name) {
            Some(format) => Ok(format.as_ref()),
            None => Err(FormatError::FormatNotFound(name.to_string())),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.formats.contains_key(name)
    }

    /// Registered names in alphabetical order
    pub fn list_formats(&self) -> Vec<String> {
        self.formats.keys().cloned().collect()
    }

    /// First format (alphabetically) claiming the extension of `filename`
    pub fn detect_format_from_filename(&self, filename: &str) -> Option<String> {
        let extension = std::path::Path::new(filename).extension()?.to_str()?;
        self.formats
            .iter()
            .find(|(_, format)| format.file_extensions().contains(&extension))
            .map(|(name, _)| name.clone())
    }

    pub fn parse(
        &self,
        source: &str,
        format: &str,
        ctx: &ParseContext,
    ) -> Result<AtomTree, FormatError> {
        let reader = self.get(format)?;
        if !reader.supports_parsing() {
            return Err(FormatError::NotSupported(format!("'{format}' cannot be read")));
        }
        reader.parse(source, ctx)
    }

    pub fn serialize(&self, tree: &AtomTree, format: &str) -> Result<String, FormatError> {
        self.writer(format)?.serialize(tree)
    }

    /// Serialize a run of siblings, e.g. the atoms of a selection
    pub fn serialize_subtree(
        &self,
        tree: &AtomTree,
        atoms: &[AtomId],
        format: &str,
    ) -> Result<String, FormatError> {
        self.writer(format)?.serialize_subtree(tree, atoms)
    }

    fn writer(&self, format: &str) -> Result<&dyn Format, FormatError> {
        let writer = self.get(format)?;
        if !writer.supports_serialization() {
            return Err(FormatError::NotSupported(format!("'{format}' cannot be written")));
        }
        Ok(writer)
    }

    /// Registry holding every built-in format
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(LatexFormat);
        registry.register(LatexExpandedFormat);
        registry.register(PlainTextFormat);
        registry.register(SpokenTextFormat);
        registry.register(TagFormat);
        registry.register(TreevizFormat);
        registry.register(JsonFormat);
        registry
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::{Atom, AtomKind, BranchName};

    /// Reads anything as a single `x`, writes an atom count.
    struct CountingFormat;

    impl Format for CountingFormat {
        fn name(&self) -> &str {
            "count"
        }
        fn file_extensions(&self) -> &[&str] {
            &["cnt"]
        }
        fn supports_parsing(&self) -> bool {
            true
        }
        fn supports_serialization(&self) -> bool {
            true
        }
        fn parse(&self, _source: &str, _ctx: &ParseContext) -> Result<AtomTree, FormatError> {
            let mut tree = AtomTree::new();
            let x = tree.add(Atom::new(AtomKind::Ord, "x"));
            let root = tree.root();
            tree.insert(root, BranchName::Body, 0, &[x])
                .map_err(|e| FormatError::ParseError(e.to_string()))?;
            Ok(tree)
        }
        fn serialize_subtree(&self, _tree: &AtomTree, atoms: &[AtomId]) -> Result<String, FormatError> {
            Ok(format!("{} atoms", atoms.len()))
        }
    }

    struct Opaque;

    impl Format for Opaque {
        fn name(&self) -> &str {
            "opaque"
        }
    }

    #[test]
    fn test_custom_format_round_trip() {
        let mut registry = FormatRegistry::new();
        assert!(registry.list_formats().is_empty());
        registry.register(CountingFormat);

        assert!(registry.has("count"));
        let tree = registry.parse("ignored", "count", &ParseContext::default()).unwrap();
        assert_eq!(registry.serialize(&tree, "count").unwrap(), "1 atoms");
        assert_eq!(registry.detect_format_from_filename("a.cnt").as_deref(), Some("count"));
    }

    #[test]
    fn test_unknown_format() {
        let registry = FormatRegistry::new();
        assert_eq!(
            registry.get("mathml").err(),
            Some(FormatError::FormatNotFound("mathml".to_string()))
        );
    }

    #[test]
    fn test_capabilities_are_checked() {
        let mut registry = FormatRegistry::new();
        registry.register(Opaque);

        let read = registry.parse("x", "opaque", &ParseContext::default());
        assert!(matches!(read, Err(FormatError::NotSupported(_))));
        let write = registry.serialize(&AtomTree::new(), "opaque");
        assert!(matches!(write, Err(FormatError::NotSupported(_))));
    }

    #[test]
    fn test_subtree_serialization() {
        let registry = FormatRegistry::default();
        let tree = registry.parse("a+\\frac{1}{2}", "latex", &ParseContext::default()).unwrap();
        let frac = tree.body()[2];
        assert_eq!(registry.serialize_subtree(&tree, &[frac], "latex").unwrap(), "\\frac{1}{2}");
    }

    #[test]
    fn test_detect_format_from_filename() {
        let registry = FormatRegistry::default();
        assert_eq!(registry.detect_format_from_filename("eq.tex").as_deref(), Some("latex"));
        assert_eq!(registry.detect_format_from_filename("tree.json").as_deref(), Some("json"));
        assert_eq!(registry.detect_format_from_filename("notes.unknown"), None);
        assert_eq!(registry.detect_format_from_filename("noext"), None);
    }

    #[test]
    fn test_default_formats() {
        let registry = FormatRegistry::default();
        assert_eq!(
            registry.list_formats(),
            vec!["json", "latex", "latex-expanded", "plain-text", "spoken-text", "tag", "treeviz"]
        );
    }
}
