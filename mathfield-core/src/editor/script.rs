//! Superscript and subscript editing.

use crate::atom::{Atom, AtomId, AtomKind, AtomTree, BranchName};
use crate::error::EditError;
use crate::selection::Position;

use super::transaction::{Draft, Target};

/// How many `branch` scripts enclose a caret in `parent`/`at`.
pub(crate) fn nesting(tree: &AtomTree, parent: AtomId, at: BranchName, branch: BranchName) -> usize {
    let mut count = usize::from(at == branch);
    let mut current = parent;
    while let Some((up, name)) = tree.parent_branch(current) {
        count += usize::from(name == branch);
        current = up;
    }
    count
}

/// Open (or re-enter) a script on the atom before the caret, or on a new
/// empty base. Returns the caret inside the script, or the caret unchanged
/// when the configured depth is exhausted.
pub(crate) fn enter(
    draft: &mut Draft<'_>,
    caret: Position,
    branch: BranchName,
) -> Result<Position, EditError> {
    if let Some(limit) = draft.options.script_depth.limit(branch) {
        if nesting(&draft.tree, caret.parent, caret.branch, branch) >= limit {
            return Ok(caret);
        }
    }
    let takes_scripts = |id: &AtomId| {
        draft
            .tree
            .get(*id)
            .is_some_and(|a| a.kind.takes_scripts() && a.kind != AtomKind::Placeholder)
    };
    let base = match caret.atom_before(&draft.tree).filter(takes_scripts) {
        Some(base) => base,
        None => {
            let subsup = draft.new_atom(Atom::new(AtomKind::Subsup, "").with_branch(branch, Vec::new()));
            draft.tree.insert(caret.parent, caret.branch, caret.index, &[subsup])?;
            subsup
        }
    };
    if !draft.tree.has_branch(base, branch) {
        draft.tree.insert(base, branch, 0, &[])?;
    }
    let len = draft.tree.branch(base, branch).len();
    Ok(Position::new(base, branch, len))
}

/// Move the atoms from `from` on out of a script of `base`, to just after
/// the base. Empty scripts and bare bases left behind are removed. Returns
/// the caret between the base and the moved atoms.
pub(crate) fn lift_out(
    tree: &mut AtomTree,
    base: AtomId,
    branch: BranchName,
    from: usize,
) -> Result<Position, EditError> {
    let anchor = Position::before(tree, base)
        .ok_or_else(|| EditError::InvariantViolation(format!("script base {base} is detached")))?;
    let tail = tree.detach_tail(base, branch, from)?;
    if tree.branch(base, branch).is_empty() {
        tree.remove_branch(base, branch)?;
    }
    let bare = tree.get(base).is_some_and(|a| {
        a.kind == AtomKind::Subsup
            && !a.has_branch(BranchName::Superscript)
            && !a.has_branch(BranchName::Subscript)
    });
    if bare {
        tree.replace(base, &tail)?;
        return Ok(anchor);
    }
    tree.insert(anchor.parent, anchor.branch, anchor.index + 1, &tail)?;
    Ok(Position::new(anchor.parent, anchor.branch, anchor.index + 1))
}

/// Nearest script branch around `position`, with the index just after the
/// caret's atom inside it.
fn enclosing_script(tree: &AtomTree, position: Position) -> Option<Position> {
    if position.branch.is_script() {
        return Some(position);
    }
    let mut atom = position.parent;
    while let Some(before) = Position::before(tree, atom) {
        if before.branch.is_script() {
            return Some(Position::new(before.parent, before.branch, before.index + 1));
        }
        atom = before.parent;
    }
    None
}

pub(crate) fn promote(draft: &mut Draft<'_>) -> Result<Target, EditError> {
    let caret = draft.position(draft.selection.primary().focus)?;
    let Some(script) = enclosing_script(&draft.tree, caret) else {
        return Ok(Target::Keep);
    };
    draft.ensure_editable(script.parent)?;
    let caret = lift_out(&mut draft.tree, script.parent, script.branch, script.index)?;
    Ok(Target::Caret(caret))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse, ParseContext};

    #[test]
    fn test_nesting_counts_matching_scripts() {
        let tree = parse("x^{y^{z}}", &ParseContext::default()).unwrap();
        let x = tree.body()[0];
        let y = tree.branch(x, BranchName::Superscript)[0];
        assert_eq!(nesting(&tree, y, BranchName::Superscript, BranchName::Superscript), 2);
        assert_eq!(nesting(&tree, y, BranchName::Superscript, BranchName::Subscript), 0);
    }

    #[test]
    fn test_lift_out_moves_tail_after_base() {
        let mut tree = parse("x^{ab}", &ParseContext::default()).unwrap();
        let x = tree.body()[0];
        let caret = lift_out(&mut tree, x, BranchName::Superscript, 1).unwrap();
        assert_eq!(caret.index, 1);
        assert_eq!(crate::formats::latex::to_latex(&tree), "x^{a}b");
    }

    #[test]
    fn test_lift_out_removes_bare_subsup() {
        let mut tree = parse("{}^{ab}", &ParseContext::default()).unwrap();
        let subsup = tree.body()[0];
        lift_out(&mut tree, subsup, BranchName::Superscript, 0).unwrap();
        assert_eq!(crate::formats::latex::to_latex(&tree), "ab");
        assert!(tree.validate().is_ok());
    }
}
