//! Inspect transforms
//!
//! Each transform shows one internal view of a parsed formula:
//!
//! - `tree-treeviz`: atom tree with Unicode icons (default)
//! - `tree-tag`: atom tree as XML-like tags
//! - `tree-json`: atom tree as JSON
//! - `offsets`: every caret offset with the branch slot it stands for
//!
//! Example: `mathfield inspect formula.tex offsets`

use mathfield_core::selection::OffsetMap;
use mathfield_core::{AtomTree, FormatRegistry};

/// All available inspect transforms
pub const AVAILABLE_TRANSFORMS: &[&str] = &["tree-treeviz", "tree-tag", "tree-json", "offsets"];

pub const DEFAULT_TRANSFORM: &str = "tree-treeviz";

/// Render `tree` with the named transform.
pub fn execute_transform(tree: &AtomTree, transform_name: &str) -> Result<String, String> {
    let registry = FormatRegistry::default();
    let format = match transform_name {
        "tree-treeviz" => "treeviz",
        "tree-tag" => "tag",
        "tree-json" => "json",
        "offsets" => return Ok(offsets_table(tree)),
        other => return Err(format!("Unknown transform '{other}'")),
    };
    registry
        .serialize(tree, format)
        .map_err(|e| format!("Transform failed: {e}"))
}

/// One line per offset: offset, branch owner, branch, index, depth.
fn offsets_table(tree: &AtomTree) -> String {
    let map = OffsetMap::build(tree);
    let mut out = String::from("offset\tatom\tbranch\tindex\tdepth\n");
    for (offset, position) in map.positions().iter().enumerate() {
        out.push_str(&format!(
            "{offset}\t{}\t{}\t{}\t{}\n",
            position.parent,
            position.branch.label(),
            position.index,
            tree.depth(position.parent)
        ));
    }
    out
}
