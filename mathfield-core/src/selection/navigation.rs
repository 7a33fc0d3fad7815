//! Caret adjacency: where arrow-key style movement lands next.
//!
//! Forward/backward movement walks the navigation order, which is the offset
//! order with two adjustments: atoms that capture the caret contribute only
//! the positions around them, and fraction branches are visited in the
//! configured order. Upward/downward movement switches between vertically
//! stacked branches (numerator/denominator, superscript/subscript, array
//! rows). When no further position exists the caller receives
//! [`Adjacent::MoveOut`] and decides what to do.

use serde::{Deserialize, Serialize};

use super::offsets::{OffsetMap, Position};
use crate::atom::{AtomId, AtomKind, AtomTree, BranchName};
use crate::error::EditError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    Forward,
    Backward,
    Upward,
    Downward,
}

impl Direction {
    pub fn name(self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
            Direction::Upward => "upward",
            Direction::Downward => "downward",
        }
    }

    pub fn from_name(name: &str) -> Option<Direction> {
        match name {
            "forward" | "right" => Some(Direction::Forward),
            "backward" | "left" => Some(Direction::Backward),
            "upward" | "up" => Some(Direction::Upward),
            "downward" | "down" => Some(Direction::Downward),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FractionNavigationOrder {
    #[default]
    NumeratorDenominator,
    DenominatorNumerator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationOptions {
    pub fraction_order: FractionNavigationOrder,
    /// Move sideways from the first fraction branch into the second. When
    /// off, the second branch is only reachable with up/down movement.
    pub lateral_fraction_movement: bool,
}

impl Default for NavigationOptions {
    fn default() -> Self {
        NavigationOptions {
            fraction_order: FractionNavigationOrder::default(),
            lateral_fraction_movement: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjacent {
    Offset(usize),
    /// No position exists in that direction
    MoveOut(Direction),
}

fn captures(tree: &AtomTree, atom: AtomId) -> bool {
    tree.get(atom).is_some_and(|a| a.kind.captures_selection())
}

/// Branches of `atom` in visiting order.
fn visit_order(tree: &AtomTree, atom: AtomId, options: &NavigationOptions) -> Vec<BranchName> {
    let mut names = tree.branch_names(atom);
    if matches!(tree.get(atom).map(|a| &a.kind), Some(AtomKind::Fraction(_))) {
        if options.fraction_order == FractionNavigationOrder::DenominatorNumerator {
            if let (Some(a), Some(b)) = (
                names.iter().position(|n| *n == BranchName::Above),
                names.iter().position(|n| *n == BranchName::Below),
            ) {
                names.swap(a, b);
            }
        }
        if !options.lateral_fraction_movement {
            let excluded = second_fraction_branch(options);
            names.retain(|n| *n != excluded);
        }
    }
    names
}

fn first_fraction_branch(options: &NavigationOptions) -> BranchName {
    match options.fraction_order {
        FractionNavigationOrder::NumeratorDenominator => BranchName::Above,
        FractionNavigationOrder::DenominatorNumerator => BranchName::Below,
    }
}

fn second_fraction_branch(options: &NavigationOptions) -> BranchName {
    match options.fraction_order {
        FractionNavigationOrder::NumeratorDenominator => BranchName::Below,
        FractionNavigationOrder::DenominatorNumerator => BranchName::Above,
    }
}

/// Offsets in the order forward movement visits them.
pub fn navigation_order(tree: &AtomTree, map: &OffsetMap, options: &NavigationOptions) -> Vec<usize> {
    let mut out = Vec::with_capacity(map.positions().len());
    visit(tree, map, tree.root(), BranchName::Body, options, &mut out);
    out
}

fn visit(
    tree: &AtomTree,
    map: &OffsetMap,
    parent: AtomId,
    branch: BranchName,
    options: &NavigationOptions,
    out: &mut Vec<usize>,
) {
    out.extend(map.offset_of(&Position::new(parent, branch, 0)));
    for (index, child) in tree.branch(parent, branch).iter().enumerate() {
        if !captures(tree, *child) {
            for name in visit_order(tree, *child, options) {
                visit(tree, map, *child, name, options, out);
            }
        }
        out.extend(map.offset_of(&Position::new(parent, branch, index + 1)));
    }
}

/// Move an offset that lies inside a caret-capturing atom to just after the
/// outermost such atom.
pub fn snap_offset(tree: &AtomTree, map: &OffsetMap, offset: usize) -> usize {
    snap_out_of(tree, map, offset, |kind| kind.captures_selection())
}

/// Like [`snap_offset`], but only macro expansions capture. Offsets inside a
/// locked prompt stay where they are; edits there fail instead.
pub fn snap_out_of_macros(tree: &AtomTree, map: &OffsetMap, offset: usize) -> usize {
    snap_out_of(tree, map, offset, |kind| matches!(kind, AtomKind::Macro(_)))
}

fn snap_out_of(
    tree: &AtomTree,
    map: &OffsetMap,
    offset: usize,
    capturing: impl Fn(&AtomKind) -> bool,
) -> usize {
    let Ok(position) = map.position_of(offset) else {
        return offset;
    };
    let mut chain = vec![position.parent];
    chain.extend(tree.ancestors(position.parent));
    let outermost = chain
        .into_iter()
        .rev()
        .find(|atom| tree.get(*atom).is_some_and(|a| capturing(&a.kind)));
    match outermost {
        Some(atom) => map.offset_after(tree, atom).unwrap_or(offset),
        None => offset,
    }
}

pub fn next_offset(
    tree: &AtomTree,
    map: &OffsetMap,
    offset: usize,
    direction: Direction,
    options: &NavigationOptions,
) -> Result<Adjacent, EditError> {
    map.position_of(offset)?;
    let offset = snap_offset(tree, map, offset);
    let adjacent = match direction {
        Direction::Forward | Direction::Backward => {
            let order = navigation_order(tree, map, options);
            match order.iter().position(|o| *o == offset) {
                Some(i) => {
                    let next = match direction {
                        Direction::Forward => order.get(i + 1),
                        _ => i.checked_sub(1).and_then(|j| order.get(j)),
                    };
                    next.map(|o| Adjacent::Offset(*o))
                }
                None => leave_hidden_branch(tree, map, offset, direction, options),
            }
        }
        Direction::Upward | Direction::Downward => {
            let position = map.position_of(offset)?;
            vertical(tree, map, position, direction)
        }
    };
    Ok(adjacent.unwrap_or(Adjacent::MoveOut(direction)))
}

/// From inside a fraction branch that sideways movement does not visit.
fn leave_hidden_branch(
    tree: &AtomTree,
    map: &OffsetMap,
    offset: usize,
    direction: Direction,
    options: &NavigationOptions,
) -> Option<Adjacent> {
    let position = map.position_of(offset).ok()?;
    let hidden = second_fraction_branch(options);
    let mut current = position;
    loop {
        let is_fraction = matches!(
            tree.get(current.parent).map(|a| &a.kind),
            Some(AtomKind::Fraction(_))
        );
        if is_fraction && current.branch == hidden {
            let fraction = current.parent;
            let target = match direction {
                Direction::Forward => map.offset_after(tree, fraction)?,
                _ => {
                    let first = first_fraction_branch(options);
                    let len = tree.branch(fraction, first).len();
                    map.offset_of(&Position::new(fraction, first, len))?
                }
            };
            return Some(Adjacent::Offset(target));
        }
        current = Position::before(tree, current.parent)?;
    }
}

/// Branch stacked above or below `branch` of `atom`.
fn vertical_target(
    tree: &AtomTree,
    atom: AtomId,
    branch: BranchName,
    direction: Direction,
) -> Option<BranchName> {
    let kind = &tree.get(atom)?.kind;
    let up = direction == Direction::Upward;
    let target = match (branch, up) {
        (BranchName::Subscript, true) => BranchName::Superscript,
        (BranchName::Superscript, false) => BranchName::Subscript,
        (BranchName::Below, true) if matches!(kind, AtomKind::Fraction(_)) => BranchName::Above,
        (BranchName::Above, false) if matches!(kind, AtomKind::Fraction(_)) => BranchName::Below,
        (BranchName::Cell(r, c), true) if r > 0 => BranchName::Cell(r - 1, c),
        (BranchName::Cell(r, c), false) => BranchName::Cell(r + 1, c),
        _ => return None,
    };
    tree.has_branch(atom, target).then_some(target)
}

fn vertical(
    tree: &AtomTree,
    map: &OffsetMap,
    position: Position,
    direction: Direction,
) -> Option<Adjacent> {
    let mut current = position;
    loop {
        if let Some(target) = vertical_target(tree, current.parent, current.branch, direction) {
            let len = tree.branch(current.parent, target).len();
            let landing = Position::new(current.parent, target, current.index.min(len));
            return map.offset_of(&landing).map(Adjacent::Offset);
        }
        current = Position::before(tree, current.parent)?;
    }
}
