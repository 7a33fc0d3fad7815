//! Smart fences: typing delimiters, and settling pending fences.
//!
//! A smart fence starts as `Fence::Smart`, an auto-sized opener whose closer
//! is still unknown. Typing a matching closer inside it turns it into an
//! explicit `\left..\right` pair; accepting it closes it with the matching
//! delimiter; rejecting it turns the opener back into a literal symbol.

use crate::atom::{
    matching_close, Atom, AtomId, AtomKind, AtomTree, BranchName, Fence, OperatorKind,
};
use crate::error::EditError;
use crate::selection::Position;

use super::transaction::{Draft, Target};

/// Delimiter spelling for a typed opener.
pub(crate) fn opener(c: char) -> Option<&'static str> {
    match c {
        '(' => Some("("),
        '[' => Some("["),
        '{' => Some("\\{"),
        _ => None,
    }
}

pub(crate) fn closer(c: char) -> Option<&'static str> {
    match c {
        ')' => Some(")"),
        ']' => Some("]"),
        '}' => Some("\\}"),
        _ => None,
    }
}

fn is_literal(tree: &AtomTree, id: Option<AtomId>, op: OperatorKind, value: &str) -> bool {
    id.and_then(|id| tree.get(id))
        .is_some_and(|a| a.kind.is_operator(op) && a.value == value)
}

fn smart_open(tree: &AtomTree, id: AtomId) -> Option<String> {
    match tree.get(id).map(|a| &a.kind) {
        Some(AtomKind::Fence(Fence::Smart { open })) => Some(open.clone()),
        _ => None,
    }
}

/// Type an opening delimiter. Right before its own literal closer it stays
/// literal; otherwise it opens an empty smart fence with the caret inside.
pub(crate) fn type_open(
    draft: &mut Draft<'_>,
    caret: Position,
    open: &str,
) -> Result<Position, EditError> {
    let close = matching_close(open).unwrap_or(".");
    if is_literal(&draft.tree, caret.atom_after(&draft.tree), OperatorKind::Close, close) {
        let atom = draft.new_atom(Atom::new(AtomKind::Operator(OperatorKind::Open), open));
        return draft.place(caret, &[atom]);
    }
    let fence = draft.new_atom(
        Atom::new(AtomKind::Fence(Fence::Smart { open: open.to_string() }), "")
            .with_branch(BranchName::Body, Vec::new()),
    );
    draft.place(caret, &[fence])?;
    Ok(Position::new(fence, BranchName::Body, 0))
}

/// Type a closing delimiter: step over a literal closer, else close the
/// innermost matching smart fence, else insert the closer as a symbol.
pub(crate) fn type_close(
    draft: &mut Draft<'_>,
    caret: Position,
    close: &str,
) -> Result<Position, EditError> {
    if is_literal(&draft.tree, caret.atom_after(&draft.tree), OperatorKind::Close, close) {
        return Ok(Position::new(caret.parent, caret.branch, caret.index + 1));
    }
    if let Some((fence, at)) = matching_smart_fence(&draft.tree, caret, close) {
        draft.ensure_editable(fence)?;
        return close_at(&mut draft.tree, fence, at, close);
    }
    let atom = draft.new_atom(Atom::new(AtomKind::Operator(OperatorKind::Close), close));
    draft.place(caret, &[atom])
}

/// Smart fence closed by `close`, climbing only through smart fence
/// bodies, with the index in its body where the fence should end.
fn matching_smart_fence(tree: &AtomTree, caret: Position, close: &str) -> Option<(AtomId, usize)> {
    let mut current = caret;
    loop {
        let open = smart_open(tree, current.parent)?;
        if current.branch == BranchName::Body && matching_close(&open) == Some(close) {
            return Some((current.parent, current.index));
        }
        let outer = Position::before(tree, current.parent)?;
        current = Position::new(outer.parent, outer.branch, outer.index + 1);
    }
}

/// Turn a smart fence into an explicit pair ending at `at`; the atoms after
/// `at` move out behind it.
fn close_at(tree: &mut AtomTree, fence: AtomId, at: usize, close: &str) -> Result<Position, EditError> {
    let (open, mode) = match tree.get(fence) {
        Some(atom) => match &atom.kind {
            AtomKind::Fence(fence) => (fence.open().to_string(), atom.mode),
            _ => return Err(EditError::InvariantViolation(format!("{fence} is not a fence"))),
        },
        None => return Err(EditError::InvariantViolation(format!("{fence} does not exist"))),
    };
    let after = Position::after(tree, fence)
        .ok_or_else(|| EditError::InvariantViolation(format!("fence {fence} is detached")))?;
    let tail = tree.detach_tail(fence, BranchName::Body, at)?;
    let kind = AtomKind::Fence(Fence::Explicit {
        open,
        close: close.to_string(),
    });
    tree.retag(fence, kind, "", mode)?;
    tree.insert(after.parent, after.branch, after.index, &tail)?;
    Ok(after)
}

/// Innermost smart fence around the caret, with the caret's index in its
/// body.
fn enclosing_smart_fence(tree: &AtomTree, caret: Position) -> Option<(AtomId, usize)> {
    let mut current = caret;
    loop {
        if smart_open(tree, current.parent).is_some() {
            return Some((current.parent, current.index));
        }
        let outer = Position::before(tree, current.parent)?;
        current = Position::new(outer.parent, outer.branch, outer.index + 1);
    }
}

pub(crate) fn accept(draft: &mut Draft<'_>) -> Result<Target, EditError> {
    let caret = draft.position(draft.selection.primary().focus)?;
    let Some((fence, _)) = enclosing_smart_fence(&draft.tree, caret) else {
        return Ok(Target::Keep);
    };
    draft.ensure_editable(fence)?;
    let Some(open) = smart_open(&draft.tree, fence) else {
        return Ok(Target::Keep);
    };
    let close = matching_close(&open).unwrap_or(".").to_string();
    let mode = draft.tree.atom(fence)?.mode;
    draft
        .tree
        .retag(fence, AtomKind::Fence(Fence::Explicit { open, close }), "", mode)?;
    Ok(Target::Keep)
}

pub(crate) fn reject(draft: &mut Draft<'_>) -> Result<Target, EditError> {
    let caret = draft.position(draft.selection.primary().focus)?;
    let Some((fence, at)) = enclosing_smart_fence(&draft.tree, caret) else {
        return Ok(Target::Keep);
    };
    draft.ensure_editable(fence)?;
    let Some(open) = smart_open(&draft.tree, fence) else {
        return Ok(Target::Keep);
    };
    let before = Position::before(&draft.tree, fence)
        .ok_or_else(|| EditError::InvariantViolation(format!("fence {fence} is detached")))?;
    let style = draft.tree.atom(fence)?.style.clone();
    let literal = draft.tree.add(
        Atom::new(AtomKind::Operator(OperatorKind::Open), open).styled(style),
    );
    let body = draft.tree.detach_tail(fence, BranchName::Body, 0)?;
    let mut replacement = vec![literal];
    replacement.extend(body);
    draft.tree.replace(fence, &replacement)?;
    Ok(Target::Caret(Position::new(
        before.parent,
        before.branch,
        before.index + 1 + at,
    )))
}
