//! XML-like atom tag serialization
//!
//! Serializes the atom tree directly to an XML-like dump, mostly for
//! debugging and for tests that want to see the structure.
//!
//! ## Format
//!
//! - Atom kind → tag name (`ord`, `fraction`, `smart-fence`, ...)
//! - Kind data, mode and local style → attributes
//! - Value → text content
//! - Each branch → a wrapper tag (`<above>`, `<cell-0-1>`, ...) around its
//!   children
//!
//! ## Example
//!
//! ```text
//! <root>
//!   <fraction kind="frac">
//!     <above>
//!       <ord>1</ord>
//!     </above>
//!     <below>
//!       <ord>2</ord>
//!     </below>
//!   </fraction>
//! </root>
//! ```

use serde::Serialize;

use crate::atom::{Atom, AtomId, AtomKind, AtomTree, Correctness, Fence, ParseMode};
use crate::error::FormatError;
use crate::format::Format;

/// Kebab-case spelling of a unit enum, as serde writes it.
fn serde_name<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn attributes(atom: &Atom) -> Vec<(&'static str, String)> {
    let mut attrs = Vec::new();
    match &atom.kind {
        AtomKind::Fraction(kind) => attrs.push(("kind", serde_name(kind))),
        AtomKind::Fence(Fence::Explicit { open, close }) => {
            attrs.push(("open", open.clone()));
            attrs.push(("close", close.clone()));
        }
        AtomKind::Fence(Fence::Smart { open }) => attrs.push(("open", open.clone())),
        AtomKind::Array(info) => {
            attrs.push(("environment", info.environment.clone()));
            if let Some(columns) = &info.columns {
                attrs.push(("columns", columns.clone()));
            }
            attrs.push(("rows", info.rows.to_string()));
            attrs.push(("cols", info.cols.to_string()));
        }
        AtomKind::Prompt(prompt) => {
            attrs.push(("id", prompt.id.clone()));
            if prompt.correctness != Correctness::Undefined {
                attrs.push(("correctness", serde_name(&prompt.correctness)));
            }
            if prompt.locked {
                attrs.push(("locked", "true".to_string()));
            }
        }
        AtomKind::Macro(reference) => {
            attrs.push(("name", reference.name.clone()));
            for (i, arg) in reference.args.iter().enumerate() {
                attrs.push((ARG_NAMES.get(i).copied().unwrap_or("arg"), arg.clone()));
            }
        }
        _ => {}
    }
    if atom.mode == ParseMode::Text && atom.kind != AtomKind::Text {
        attrs.push(("mode", "text".to_string()));
    }
    let style = &atom.style;
    if let Some(variant) = style.variant {
        attrs.push(("variant", serde_name(&variant)));
    }
    if let Some(family) = style.font_family {
        attrs.push(("family", serde_name(&family)));
    }
    if let Some(color) = &style.color {
        attrs.push(("color", color.clone()));
    }
    if let Some(background) = &style.background {
        attrs.push(("background", background.clone()));
    }
    attrs
}

const ARG_NAMES: [&str; 9] = [
    "arg1", "arg2", "arg3", "arg4", "arg5", "arg6", "arg7", "arg8", "arg9",
];

fn format_atom(tree: &AtomTree, id: AtomId, indent_level: usize, output: &mut String) {
    let Some(atom) = tree.get(id) else {
        return;
    };
    let indent = "  ".repeat(indent_level);
    let tag = atom.kind.name();
    let attrs: String = attributes(atom)
        .into_iter()
        .map(|(key, value)| format!(" {key}=\"{}\"", escape_xml(&value)))
        .collect();

    output.push_str(&format!("{indent}<{tag}{attrs}>"));
    output.push_str(&escape_xml(&atom.value));

    if atom.is_leaf() {
        output.push_str(&format!("</{tag}>\n"));
        return;
    }

    output.push('\n');
    for (name, kids) in atom.branches() {
        let branch_tag = name.label();
        if kids.is_empty() {
            output.push_str(&format!("{indent}  <{branch_tag}/>\n"));
            continue;
        }
        output.push_str(&format!("{indent}  <{branch_tag}>\n"));
        for kid in kids {
            format_atom(tree, *kid, indent_level + 2, output);
        }
        output.push_str(&format!("{indent}  </{branch_tag}>\n"));
    }
    output.push_str(&format!("{indent}</{tag}>\n"));
}

/// Serialize a run of atoms to tag format, wrapped in `<root>`
pub fn serialize_atoms(tree: &AtomTree, atoms: &[AtomId]) -> String {
    let mut result = String::new();
    result.push_str("<root>\n");
    for id in atoms {
        format_atom(tree, *id, 1, &mut result);
    }
    result.push_str("</root>");
    result
}

/// Escape XML special characters
fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\"', "&quot;")
        .replace('\'', "&apos;")
}

/// Format implementation for XML-like tag format
pub struct TagFormat;

impl Format for TagFormat {
    fn name(&self) -> &str {
        "tag"
    }

    fn description(&self) -> &str {
        "XML-like tag format with hierarchical structure"
    }

    fn file_extensions(&self) -> &[&str] {
        &["tag", "xml"]
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn serialize_subtree(&self, tree: &AtomTree, atoms: &[AtomId]) -> Result<String, FormatError> {
        Ok(serialize_atoms(tree, atoms))
    }
}
