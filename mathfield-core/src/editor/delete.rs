//! Deletion.
//!
//! A non-collapsed selection deletes the atoms each range covers. A caret
//! deletes the neighbouring leaf, or steps into the neighbouring structure.
//! At the edge of a branch the enclosing structure is taken apart:
//!
//! - scripts: the script content moves after its base
//! - fractions, radicals, fences, groups, accents: replaced by their content
//! - prompts, radical indexes, array cells: the caret moves out instead

use crate::atom::{AtomId, AtomKind, AtomTree, BranchName};
use crate::error::EditError;
use crate::selection::{BranchSpan, Direction, Position};

use super::script;
use super::transaction::{is_attached, Draft, Target};

pub(crate) fn delete(draft: &mut Draft<'_>, direction: Direction) -> Result<Target, EditError> {
    match direction {
        Direction::Upward | Direction::Downward => Err(EditError::InvalidRange(format!(
            "cannot delete {}",
            direction.name()
        ))),
        _ if !draft.selection.is_collapsed() => delete_ranges(draft),
        _ => {
            let caret = draft.position(draft.selection.primary().focus)?;
            delete_at(draft, caret, direction)
        }
    }
}

fn delete_ranges(draft: &mut Draft<'_>) -> Result<Target, EditError> {
    let spans = draft
        .selection
        .ranges()
        .iter()
        .map(|range| draft.span(*range))
        .collect::<Result<Vec<BranchSpan>, _>>()?;
    for span in &spans {
        draft.ensure_editable(span.parent)?;
        draft.ensure_removable(&span.atoms(&draft.tree))?;
    }

    let mut done: Vec<BranchSpan> = Vec::new();
    for span in spans.iter().rev() {
        if !is_attached(&draft.tree, span.parent) {
            continue;
        }
        // a later span in the same branch may already hold our last atom
        let end = done
            .iter()
            .filter(|d| d.parent == span.parent && d.branch == span.branch)
            .map(|d| d.start)
            .fold(span.end, usize::min);
        let start = span.start.min(end);
        draft.tree.detach(span.parent, span.branch, start..end)?;
        done.push(BranchSpan { start, end, ..*span });
    }
    match done.last() {
        Some(first) => Ok(Target::Caret(Position::new(first.parent, first.branch, first.start))),
        None => Ok(Target::Keep),
    }
}

fn delete_at(draft: &mut Draft<'_>, caret: Position, direction: Direction) -> Result<Target, EditError> {
    let backward = direction == Direction::Backward;
    let neighbour = if backward {
        caret.atom_before(&draft.tree)
    } else {
        caret.atom_after(&draft.tree)
    };
    let Some(neighbour) = neighbour else {
        return at_edge(draft, caret, backward);
    };

    let atom = draft.tree.atom(neighbour)?;
    if atom.is_leaf() || atom.kind.captures_selection() {
        draft.ensure_editable(caret.parent)?;
        draft.ensure_removable(&[neighbour])?;
        draft.tree.remove(neighbour)?;
        let index = if backward { caret.index - 1 } else { caret.index };
        return Ok(Target::Caret(Position::new(caret.parent, caret.branch, index)));
    }

    // step into the structure instead of deleting it whole
    let names = draft.tree.branch_names(neighbour);
    let entry = if backward { names.last() } else { names.first() };
    match entry {
        Some(name) => {
            let index = if backward {
                draft.tree.branch(neighbour, *name).len()
            } else {
                0
            };
            Ok(Target::Caret(Position::new(neighbour, *name, index)))
        }
        None => Ok(Target::Keep),
    }
}

/// Caret at the start (backward) or end (forward) of its branch.
fn at_edge(draft: &mut Draft<'_>, caret: Position, backward: bool) -> Result<Target, EditError> {
    let parent = caret.parent;
    if parent == draft.root() {
        return Ok(Target::Keep);
    }
    let outside = if backward {
        Position::before(&draft.tree, parent)
    } else {
        Position::after(&draft.tree, parent)
    };
    let Some(outside) = outside else {
        return Ok(Target::Keep);
    };
    let kind = draft.tree.atom(parent)?.kind.clone();
    let empty = draft.tree.branch(parent, caret.branch).is_empty();

    if caret.branch.is_script() {
        if !backward && !empty {
            return Ok(Target::Keep);
        }
        draft.ensure_editable(parent)?;
        draft.ensure_editable(outside.parent)?;
        let at = script::lift_out(&mut draft.tree, parent, caret.branch, 0)?;
        return Ok(Target::Caret(at));
    }

    match kind {
        AtomKind::Prompt(_) => Ok(Target::Caret(outside)),
        AtomKind::Radical if caret.branch == BranchName::Index => Ok(Target::Caret(outside)),
        AtomKind::Array(info) => {
            let BranchName::Cell(row, col) = caret.branch else {
                return Ok(Target::Caret(outside));
            };
            let next = if backward {
                match (row, col) {
                    (0, 0) => None,
                    (r, 0) => Some(BranchName::Cell(r - 1, info.cols.saturating_sub(1))),
                    (r, c) => Some(BranchName::Cell(r, c - 1)),
                }
            } else if col + 1 < info.cols {
                Some(BranchName::Cell(row, col + 1))
            } else if row + 1 < info.rows {
                Some(BranchName::Cell(row + 1, 0))
            } else {
                None
            };
            match next {
                Some(cell) if backward => {
                    let len = draft.tree.branch(parent, cell).len();
                    Ok(Target::Caret(Position::new(parent, cell, len)))
                }
                Some(cell) => Ok(Target::Caret(Position::new(parent, cell, 0))),
                None => Ok(Target::Caret(outside)),
            }
        }
        AtomKind::Fraction(_)
        | AtomKind::Radical
        | AtomKind::Fence(_)
        | AtomKind::Group
        | AtomKind::Accent => {
            if !backward && !empty {
                return Ok(Target::Keep);
            }
            if has_scripts(&draft.tree, parent) {
                return Ok(Target::Caret(outside));
            }
            draft.ensure_editable(parent)?;
            let before = Position::before(&draft.tree, parent).unwrap_or(outside);
            draft.ensure_editable(before.parent)?;
            let at = dissolve(&mut draft.tree, parent, caret, before)?;
            Ok(Target::Caret(at))
        }
        _ => Ok(Target::Caret(outside)),
    }
}

fn has_scripts(tree: &AtomTree, id: AtomId) -> bool {
    tree.branches(id)
        .iter()
        .any(|(name, kids)| name.is_script() && !kids.is_empty())
}

/// Replace `atom` with the content of its branches, in branch order. The
/// caret keeps its place within that content.
fn dissolve(
    tree: &mut AtomTree,
    atom: AtomId,
    caret: Position,
    before: Position,
) -> Result<Position, EditError> {
    let mut contents = Vec::new();
    let mut offset = 0;
    for name in tree.branch_names(atom) {
        if name == caret.branch {
            offset = contents.len() + caret.index;
        }
        contents.extend(tree.detach_tail(atom, name, 0)?);
    }
    tree.replace(atom, &contents)?;
    Ok(Position::new(before.parent, before.branch, before.index + offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::latex::to_latex;
    use crate::parser::{parse, ParseContext};

    #[test]
    fn test_dissolve_keeps_caret_in_place() {
        let mut tree = parse("a\\frac{bc}{d}", &ParseContext::default()).unwrap();
        let fraction = tree.body()[1];
        let before = Position::before(&tree, fraction).unwrap();
        let caret = Position::new(fraction, BranchName::Below, 0);
        let at = dissolve(&mut tree, fraction, caret, before).unwrap();
        assert_eq!(to_latex(&tree), "abcd");
        assert_eq!(at.index, 3);
        assert!(tree.validate().is_ok());
    }
}
