//! Selection model: offsets, ranges and the atoms a range covers.

pub mod navigation;
pub mod offsets;

pub use navigation::{
    navigation_order, next_offset, snap_offset, snap_out_of_macros, Adjacent, Direction,
    FractionNavigationOrder, NavigationOptions,
};
pub use offsets::{OffsetMap, Position};

use serde::{Deserialize, Serialize};

use crate::atom::{AtomId, AtomTree, BranchName};
use crate::error::EditError;

/// A directed span between two offsets. `anchor` stays put while the
/// selection is extended; `focus` moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub anchor: usize,
    pub focus: usize,
}

impl Range {
    pub fn new(anchor: usize, focus: usize) -> Self {
        Range { anchor, focus }
    }

    pub fn caret(offset: usize) -> Self {
        Range::new(offset, offset)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn start(&self) -> usize {
        self.anchor.min(self.focus)
    }

    pub fn end(&self) -> usize {
        self.anchor.max(self.focus)
    }

    pub fn is_backward(&self) -> bool {
        self.focus < self.anchor
    }
}

/// One or more disjoint ranges. The last range is the primary one: it
/// receives insertions and carries the caret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    ranges: Vec<Range>,
}

impl Selection {
    pub fn caret(offset: usize) -> Self {
        Selection {
            ranges: vec![Range::caret(offset)],
        }
    }

    pub fn single(range: Range) -> Self {
        Selection {
            ranges: vec![range],
        }
    }

    /// Sort and merge `ranges`. Overlapping or touching ranges become one;
    /// a caret inside a non-collapsed range disappears into it.
    pub fn from_ranges(ranges: Vec<Range>) -> Result<Self, EditError> {
        if ranges.is_empty() {
            return Err(EditError::InvalidRange(
                "a selection needs at least one range".to_string(),
            ));
        }
        if ranges.len() == 1 {
            return Ok(Selection { ranges });
        }

        let mut sorted = ranges;
        sorted.sort_by_key(|r| (r.start(), r.end()));

        let mut merged: Vec<Range> = Vec::with_capacity(sorted.len());
        for range in sorted {
            let Some(last) = merged.last_mut() else {
                merged.push(range);
                continue;
            };
            let touches = range.start() <= last.end();
            let both_extended = !range.is_collapsed() && !last.is_collapsed();
            let swallowed = range.is_collapsed() && range.start() <= last.end();
            if (touches && both_extended) || swallowed {
                let start = last.start();
                let end = last.end().max(range.end());
                *last = if last.is_backward() {
                    Range::new(end, start)
                } else {
                    Range::new(start, end)
                };
            } else if last.is_collapsed() && range.start() <= last.start() {
                // caret at the start of the next range
                *last = range;
            } else {
                merged.push(range);
            }
        }
        Ok(Selection { ranges: merged })
    }

    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    pub fn primary(&self) -> Range {
        self.ranges[self.ranges.len() - 1]
    }

    pub fn is_collapsed(&self) -> bool {
        self.ranges.len() == 1 && self.ranges[0].is_collapsed()
    }

    /// Offset of the caret when the selection is collapsed.
    pub fn caret_offset(&self) -> Option<usize> {
        self.is_collapsed().then(|| self.ranges[0].focus)
    }

    /// Check every endpoint against the current tree's offsets.
    pub fn validate(&self, map: &OffsetMap) -> Result<(), EditError> {
        for range in &self.ranges {
            map.position_of(range.anchor)?;
            map.position_of(range.focus)?;
        }
        Ok(())
    }
}

impl Default for Selection {
    fn default() -> Self {
        Selection::caret(0)
    }
}

/// Half-open run of siblings `[start, end)` in one branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchSpan {
    pub parent: AtomId,
    pub branch: BranchName,
    pub start: usize,
    pub end: usize,
}

impl BranchSpan {
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn atoms(&self, tree: &AtomTree) -> Vec<AtomId> {
        let atoms = tree.branch(self.parent, self.branch);
        let end = self.end.min(atoms.len());
        let start = self.start.min(end);
        atoms[start..end].to_vec()
    }
}

/// Branch slot seen on the way from a position up to the root, with the
/// index either of the caret itself or of the atom containing it.
struct Step {
    parent: AtomId,
    branch: BranchName,
    index: usize,
    direct: bool,
}

fn lift(tree: &AtomTree, position: Position) -> Vec<Step> {
    let mut steps = vec![Step {
        parent: position.parent,
        branch: position.branch,
        index: position.index,
        direct: true,
    }];
    let mut atom = position.parent;
    while let Some(before) = Position::before(tree, atom) {
        steps.push(Step {
            parent: before.parent,
            branch: before.branch,
            index: before.index,
            direct: false,
        });
        atom = before.parent;
    }
    steps
}

/// Siblings covered by `range`, after lifting both ends to their lowest
/// common branch. An end inside an atom pulls in the whole atom.
pub fn span_of(tree: &AtomTree, map: &OffsetMap, range: Range) -> Result<BranchSpan, EditError> {
    let from = lift(tree, map.position_of(range.start())?);
    let to = lift(tree, map.position_of(range.end())?);
    for a in &from {
        if let Some(b) = to
            .iter()
            .find(|b| b.parent == a.parent && b.branch == a.branch)
        {
            let start = a.index;
            let end = if b.direct { b.index } else { b.index + 1 };
            return Ok(BranchSpan {
                parent: a.parent,
                branch: a.branch,
                start: start.min(end),
                end: start.max(end),
            });
        }
    }
    Err(EditError::InvalidRange(format!(
        "offsets {} and {} share no branch",
        range.start(),
        range.end()
    )))
}

pub fn atoms_in_range(
    tree: &AtomTree,
    map: &OffsetMap,
    range: Range,
) -> Result<Vec<AtomId>, EditError> {
    Ok(span_of(tree, map, range)?.atoms(tree))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse, ParseContext};

    fn values(tree: &AtomTree, atoms: &[AtomId]) -> Vec<String> {
        atoms
            .iter()
            .map(|id| tree.get(*id).unwrap().value.clone())
            .collect()
    }

    #[test]
    fn test_selection_merges_overlapping_ranges() {
        let selection =
            Selection::from_ranges(vec![Range::new(5, 8), Range::new(1, 3), Range::new(2, 6)])
                .unwrap();
        assert_eq!(selection.ranges(), &[Range::new(1, 8)]);
    }

    #[test]
    fn test_selection_keeps_disjoint_ranges_sorted() {
        let selection = Selection::from_ranges(vec![Range::new(6, 4), Range::new(0, 1)]).unwrap();
        assert_eq!(selection.ranges(), &[Range::new(0, 1), Range::new(6, 4)]);
        assert_eq!(selection.primary(), Range::new(6, 4));
    }

    #[test]
    fn test_selection_drops_caret_inside_range() {
        let selection = Selection::from_ranges(vec![Range::new(1, 4), Range::caret(2)]).unwrap();
        assert_eq!(selection.ranges(), &[Range::new(1, 4)]);
    }

    #[test]
    fn test_empty_selection_is_rejected() {
        assert!(matches!(
            Selection::from_ranges(Vec::new()),
            Err(EditError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_atoms_in_flat_range() {
        let tree = parse("abcd", &ParseContext::default()).unwrap();
        let map = OffsetMap::build(&tree);
        let atoms = atoms_in_range(&tree, &map, Range::new(3, 1)).unwrap();
        assert_eq!(values(&tree, &atoms), vec!["b", "c"]);
    }

    #[test]
    fn test_range_lifts_to_common_branch() {
        // 0 | a 1 | + 2 | frac[ 3 | 1 4 | ] [ 5 | 2 6 | ] 7 |
        let tree = parse("a+\\frac{1}{2}", &ParseContext::default()).unwrap();
        let map = OffsetMap::build(&tree);
        let span = span_of(&tree, &map, Range::new(4, 7)).unwrap();
        assert_eq!(span.parent, tree.root());
        assert_eq!((span.start, span.end), (2, 3));

        let span = span_of(&tree, &map, Range::new(1, 3)).unwrap();
        assert_eq!((span.start, span.end), (1, 3));
    }

    #[test]
    fn test_range_within_one_branch_stays_there() {
        let tree = parse("\\frac{12}{3}", &ParseContext::default()).unwrap();
        let map = OffsetMap::build(&tree);
        let span = span_of(&tree, &map, Range::new(1, 2)).unwrap();
        assert_eq!(span.branch, BranchName::Above);
        assert_eq!((span.start, span.end), (0, 1));
    }

    #[test]
    fn test_collapsed_range_is_empty_span() {
        let tree = parse("ab", &ParseContext::default()).unwrap();
        let map = OffsetMap::build(&tree);
        let span = span_of(&tree, &map, Range::caret(1)).unwrap();
        assert!(span.is_empty());
        assert_eq!(span.start, 1);
    }
}
