//! Mapping between linear offsets and tree positions.
//!
//! Offsets enumerate caret positions depth-first: each branch contributes a
//! start position and one position after each of its atoms, and the nested
//! branches of an atom come before the position after that atom. An empty
//! branch still has its start position, so every branch is reachable.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::atom::{AtomId, AtomTree, BranchName};
use crate::error::EditError;

/// Caret position in tree terms: before child `index` of a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub parent: AtomId,
    pub branch: BranchName,
    pub index: usize,
}

impl Position {
    pub fn new(parent: AtomId, branch: BranchName, index: usize) -> Self {
        Position {
            parent,
            branch,
            index,
        }
    }

    /// Position just before `atom` in its parent branch.
    pub fn before(tree: &AtomTree, atom: AtomId) -> Option<Position> {
        let (parent, branch) = tree.parent_branch(atom)?;
        let index = tree.index_in_parent(atom)?;
        Some(Position::new(parent, branch, index))
    }

    /// Position just after `atom` in its parent branch.
    pub fn after(tree: &AtomTree, atom: AtomId) -> Option<Position> {
        Position::before(tree, atom).map(|p| Position::new(p.parent, p.branch, p.index + 1))
    }

    /// Atom immediately before the caret in its branch.
    pub fn atom_before(&self, tree: &AtomTree) -> Option<AtomId> {
        self.index
            .checked_sub(1)
            .and_then(|i| tree.branch(self.parent, self.branch).get(i).copied())
    }

    /// Atom immediately after the caret in its branch.
    pub fn atom_after(&self, tree: &AtomTree) -> Option<AtomId> {
        tree.branch(self.parent, self.branch).get(self.index).copied()
    }
}

#[derive(Debug, Clone)]
pub struct OffsetMap {
    generation: u64,
    positions: Vec<Position>,
    lookup: HashMap<Position, usize>,
}

impl OffsetMap {
    pub fn build(tree: &AtomTree) -> Self {
        let mut positions = Vec::new();
        visit_branch(tree, tree.root(), BranchName::Body, &mut positions);
        let lookup = positions
            .iter()
            .enumerate()
            .map(|(offset, position)| (*position, offset))
            .collect();
        OffsetMap {
            generation: tree.generation(),
            positions,
            lookup,
        }
    }

    /// Tree generation this map was built for.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, tree: &AtomTree) -> bool {
        self.generation == tree.generation()
    }

    pub fn last_offset(&self) -> usize {
        self.positions.len().saturating_sub(1)
    }

    /// Offset of the position after the last root atom.
    pub fn end_of_root(&self, tree: &AtomTree) -> usize {
        let root = tree.root();
        self.offset_of(&Position::new(root, BranchName::Body, tree.body().len()))
            .unwrap_or_else(|| self.last_offset())
    }

    pub fn position_of(&self, offset: usize) -> Result<Position, EditError> {
        self.positions
            .get(offset)
            .copied()
            .ok_or(EditError::InvalidOffset {
                offset,
                last: self.last_offset(),
            })
    }

    pub fn offset_of(&self, position: &Position) -> Option<usize> {
        self.lookup.get(position).copied()
    }

    pub fn offset_before(&self, tree: &AtomTree, atom: AtomId) -> Option<usize> {
        Position::before(tree, atom).and_then(|p| self.offset_of(&p))
    }

    pub fn offset_after(&self, tree: &AtomTree, atom: AtomId) -> Option<usize> {
        Position::after(tree, atom).and_then(|p| self.offset_of(&p))
    }

    /// Depth of the branch owner at `offset`: 0 for the root body.
    pub fn offset_depth(&self, tree: &AtomTree, offset: usize) -> Result<usize, EditError> {
        let position = self.position_of(offset)?;
        Ok(tree.depth(position.parent))
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }
}

fn visit_branch(tree: &AtomTree, parent: AtomId, branch: BranchName, out: &mut Vec<Position>) {
    out.push(Position::new(parent, branch, 0));
    for (index, child) in tree.branch(parent, branch).iter().enumerate() {
        for name in tree.branch_names(*child) {
            visit_branch(tree, *child, name, out);
        }
        out.push(Position::new(parent, branch, index + 1));
    }
}
