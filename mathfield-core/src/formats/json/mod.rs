//! JSON format implementation
//!
//! A lossless dump of the atom tree for hosts that want to store or inspect
//! the structure without a markup parser. Arena handles are not written;
//! the nesting carries the structure.
//!
//! ```json
//! {
//!   "kind": { "type": "root" },
//!   "branches": [
//!     { "name": "body", "atoms": [ { "kind": { "type": "ord" }, "value": "x" } ] }
//!   ]
//! }
//! ```
//!
//! Parsing accepts either a root object or a bare array of atoms, which
//! becomes the root body.

use serde::{Deserialize, Serialize};

use crate::atom::{Atom, AtomId, AtomKind, AtomTree, BranchName, ParseMode, Style};
use crate::error::FormatError;
use crate::format::Format;
use crate::parser::ParseContext;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonAtom {
    pub kind: AtomKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(default, skip_serializing_if = "is_math")]
    pub mode: ParseMode,
    #[serde(default, skip_serializing_if = "Style::is_empty")]
    pub style: Style,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<JsonBranch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonBranch {
    pub name: BranchName,
    #[serde(default)]
    pub atoms: Vec<JsonAtom>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonInput {
    Root(JsonAtom),
    Atoms(Vec<JsonAtom>),
}

fn is_math(mode: &ParseMode) -> bool {
    *mode == ParseMode::Math
}

fn to_json_atom(tree: &AtomTree, id: AtomId) -> Option<JsonAtom> {
    let atom = tree.get(id)?;
    Some(JsonAtom {
        kind: atom.kind.clone(),
        value: atom.value.clone(),
        mode: atom.mode,
        style: atom.style.clone(),
        branches: atom
            .branches()
            .iter()
            .map(|(name, kids)| JsonBranch {
                name: *name,
                atoms: kids.iter().filter_map(|k| to_json_atom(tree, *k)).collect(),
            })
            .collect(),
    })
}

/// Root object holding `atoms` as its body.
pub fn to_json_value(tree: &AtomTree, atoms: &[AtomId]) -> JsonAtom {
    JsonAtom {
        kind: AtomKind::Root,
        value: String::new(),
        mode: ParseMode::Math,
        style: Style::default(),
        branches: vec![JsonBranch {
            name: BranchName::Body,
            atoms: atoms.iter().filter_map(|id| to_json_atom(tree, *id)).collect(),
        }],
    }
}

fn build(tree: &mut AtomTree, json: &JsonAtom) -> Result<AtomId, FormatError> {
    if json.kind == AtomKind::Root {
        return Err(FormatError::ParseError("root atom nested in the tree".into()));
    }
    let mut atom = Atom::new(json.kind.clone(), json.value.clone())
        .in_mode(json.mode)
        .styled(json.style.clone());
    for branch in &json.branches {
        let kids = branch
            .atoms
            .iter()
            .map(|kid| build(tree, kid))
            .collect::<Result<Vec<_>, _>>()?;
        atom = atom.with_branch(branch.name, kids);
    }
    Ok(tree.add(atom))
}

/// Build a tree from its JSON dump, checking every tree invariant.
pub fn from_json(source: &str) -> Result<AtomTree, FormatError> {
    let input: JsonInput =
        serde_json::from_str(source).map_err(|e| FormatError::ParseError(e.to_string()))?;
    let body = match input {
        JsonInput::Atoms(atoms) => atoms,
        JsonInput::Root(root) if root.kind == AtomKind::Root => root
            .branches
            .into_iter()
            .find(|b| b.name == BranchName::Body)
            .map(|b| b.atoms)
            .unwrap_or_default(),
        JsonInput::Root(atom) => vec![atom],
    };

    let mut tree = AtomTree::new();
    let ids = body
        .iter()
        .map(|json| build(&mut tree, json))
        .collect::<Result<Vec<_>, _>>()?;
    let root = tree.root();
    tree.insert(root, BranchName::Body, 0, &ids)
        .map_err(|e| FormatError::ParseError(e.to_string()))?;
    tree.validate().map_err(FormatError::ParseError)?;
    tree.take_journal();
    Ok(tree)
}

/// Format implementation for the JSON tree dump
pub struct JsonFormat;

impl Format for JsonFormat {
    fn name(&self) -> &str {
        "json"
    }

    fn description(&self) -> &str {
        "Lossless JSON dump of the atom tree"
    }

    fn file_extensions(&self) -> &[&str] {
        &["json"]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str, _ctx: &ParseContext) -> Result<AtomTree, FormatError> {
        from_json(source)
    }

    fn serialize_subtree(&self, tree: &AtomTree, atoms: &[AtomId]) -> Result<String, FormatError> {
        serde_json::to_string_pretty(&to_json_value(tree, atoms))
            .map_err(|e| FormatError::SerializationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_json_preserves_structure() {
        let markup = "\\textcolor{blue}{x}^{2}+\\placeholder[p1][correct]{\\sqrt[3]{y}}";
        let tree = parse(markup, &ParseContext::default()).unwrap();
        let json = JsonFormat.serialize(&tree).unwrap();
        let back = JsonFormat.parse(&json, &ParseContext::default()).unwrap();
        assert!(back.structurally_eq(&tree));
        assert!(back.validate().is_ok());
    }

    #[test]
    fn test_leaf_fields_are_omitted() {
        let tree = parse("x", &ParseContext::default()).unwrap();
        let value = serde_json::to_value(to_json_value(&tree, tree.body())).unwrap();
        let atom = &value["branches"][0]["atoms"][0];
        assert_eq!(atom["kind"]["type"], "ord");
        assert_eq!(atom["value"], "x");
        assert!(atom.get("mode").is_none());
        assert!(atom.get("branches").is_none());
    }

    #[test]
    fn test_bare_array_becomes_body() {
        let tree = from_json(r#"[{"kind":{"type":"ord"},"value":"a"}]"#).unwrap();
        assert_eq!(tree.body().len(), 1);
    }

    #[test]
    fn test_invalid_trees_are_rejected() {
        // fraction without its branches
        let err = from_json(r#"[{"kind":{"type":"fraction","data":"frac"}}]"#).unwrap_err();
        assert!(matches!(err, FormatError::ParseError(_)));

        let err = from_json("not json").unwrap_err();
        assert!(matches!(err, FormatError::ParseError(_)));
    }
}
