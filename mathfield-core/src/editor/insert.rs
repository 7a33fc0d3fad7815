//! Markup insertion and whole-document replacement.

use crate::atom::{AtomId, AtomKind, AtomTree, BranchName, Fence};
use crate::error::EditError;
use crate::parser::parse;
use crate::selection::Position;

use super::command::{InsertOptions, InsertionMode, SelectionMode};
use super::transaction::{Draft, Target};

/// Where new content goes and which siblings it replaces.
struct Slot {
    parent: AtomId,
    branch: BranchName,
    start: usize,
    end: usize,
}

fn slot(draft: &Draft<'_>, mode: InsertionMode) -> Result<Slot, EditError> {
    let range = draft.selection.primary();
    let at = |offset| -> Result<Slot, EditError> {
        let position = draft.position(offset)?;
        Ok(Slot {
            parent: position.parent,
            branch: position.branch,
            start: position.index,
            end: position.index,
        })
    };
    match mode {
        InsertionMode::ReplaceAll => Ok(Slot {
            parent: draft.root(),
            branch: BranchName::Body,
            start: 0,
            end: draft.tree.body().len(),
        }),
        InsertionMode::ReplaceSelection if range.is_collapsed() => at(range.focus),
        InsertionMode::ReplaceSelection => {
            let span = draft.span(range)?;
            Ok(Slot {
                parent: span.parent,
                branch: span.branch,
                start: span.start,
                end: span.end,
            })
        }
        InsertionMode::InsertBefore => at(range.start()),
        InsertionMode::InsertAfter => at(range.end()),
    }
}

pub(crate) fn insert(
    draft: &mut Draft<'_>,
    markup: &str,
    options: &InsertOptions,
) -> Result<Target, EditError> {
    let slot = slot(draft, options.insertion_mode)?;
    let mode = match (options.mode, options.insertion_mode) {
        (Some(mode), _) => mode,
        (None, InsertionMode::ReplaceAll) => draft.options.default_mode,
        (None, _) => draft.mode,
    };
    draft.ensure_editable(slot.parent)?;
    let replaced = draft.tree.branch(slot.parent, slot.branch)[slot.start..slot.end].to_vec();
    draft.ensure_removable(&replaced)?;

    let fragment = draft.parse_fragment(markup, mode)?;
    if fragment.body().is_empty() && replaced.is_empty() {
        return Ok(Target::Keep);
    }

    let removed = draft.tree.detach(slot.parent, slot.branch, slot.start..slot.end)?;
    let mut start = slot.start;
    if removed.is_empty() {
        if let Some(placeholder) = draft.sole_placeholder(slot.parent, slot.branch) {
            draft.tree.remove(placeholder)?;
            start = 0;
        }
    }
    let before = draft.tree.branch(slot.parent, slot.branch).len();
    let ids = draft.graft_checked(&fragment)?;
    draft.tree.insert(slot.parent, slot.branch, start, &ids)?;
    substitute_selection(&mut draft.tree, &ids, &removed)?;
    let count = draft.tree.branch(slot.parent, slot.branch).len() - before;
    let inserted = draft.tree.branch(slot.parent, slot.branch)[start..start + count].to_vec();

    let at = |index| Position::new(slot.parent, slot.branch, index);
    let target = match options.selection_mode {
        SelectionMode::Placeholder | SelectionMode::After => {
            let placeholder = (options.selection_mode == SelectionMode::Placeholder)
                .then(|| first_placeholder(&draft.tree, &inserted))
                .flatten();
            match (placeholder, open_smart_fence(&draft.tree, &inserted)) {
                (Some(placeholder), _) => select_atom(&draft.tree, placeholder),
                (None, Some(fence)) => Target::Caret(Position::new(fence, BranchName::Body, 0)),
                (None, None) => Target::Caret(at(start + count)),
            }
        }
        SelectionMode::Before => Target::Caret(at(start)),
        SelectionMode::Item => Target::Range {
            anchor: at(start),
            focus: at(start + count),
        },
    };
    Ok(target)
}

/// Put the replaced atoms in place of each `#@` marker of the inserted
/// content; later markers receive copies.
fn substitute_selection(
    tree: &mut AtomTree,
    inserted: &[AtomId],
    removed: &[AtomId],
) -> Result<(), EditError> {
    let markers: Vec<AtomId> = inserted
        .iter()
        .flat_map(|id| std::iter::once(*id).chain(tree.descendants(*id)))
        .filter(|id| {
            tree.get(*id)
                .is_some_and(|a| a.kind == AtomKind::Placeholder && a.value == "#@")
        })
        .collect();
    for (i, marker) in markers.into_iter().enumerate() {
        let content = if i == 0 {
            removed.to_vec()
        } else {
            tree.duplicate(removed)
        };
        tree.replace(marker, &content)?;
    }
    Ok(())
}

/// First placeholder among `atoms` and their descendants, in document order.
pub(crate) fn first_placeholder(tree: &AtomTree, atoms: &[AtomId]) -> Option<AtomId> {
    atoms
        .iter()
        .flat_map(|id| std::iter::once(*id).chain(tree.descendants(*id)))
        .find(|id| tree.get(*id).is_some_and(|a| a.kind == AtomKind::Placeholder))
}

/// Trailing auto-sized fence with nothing inside yet.
fn open_smart_fence(tree: &AtomTree, atoms: &[AtomId]) -> Option<AtomId> {
    let last = *atoms.last()?;
    let atom = tree.get(last)?;
    (matches!(atom.kind, AtomKind::Fence(Fence::Smart { .. }))
        && atom.branch(BranchName::Body).is_some_and(<[AtomId]>::is_empty))
    .then_some(last)
}

pub(crate) fn select_atom(tree: &AtomTree, atom: AtomId) -> Target {
    match (Position::before(tree, atom), Position::after(tree, atom)) {
        (Some(anchor), Some(focus)) => Target::Range { anchor, focus },
        _ => Target::Keep,
    }
}

/// Replace the whole document. Markup equal to the current content is a
/// no-op.
pub(crate) fn set_value(draft: &mut Draft<'_>, markup: &str) -> Result<Target, EditError> {
    let parsed = parse(markup, draft.ctx)?;
    if parsed.structurally_eq(&draft.tree) {
        return Ok(Target::Keep);
    }
    let root = draft.root();
    let len = draft.tree.body().len();
    draft.tree.detach(root, BranchName::Body, 0..len)?;
    let ids = draft.tree.graft(&parsed, parsed.body());
    draft.tree.insert(root, BranchName::Body, 0, &ids)?;
    Ok(Target::Caret(Position::new(root, BranchName::Body, ids.len())))
}
