//! Arena-backed atom tree.
//!
//! The tree owns every atom in a single arena; atoms refer to each other by
//! [`AtomId`] handles. A child stores a back-link to its parent branch, which
//! keeps `depth()` proportional to the depth of the atom rather than to the
//! size of the tree.
//!
//! Mutations may leave atoms temporarily detached (no parent). Detached atoms
//! are either re-inserted, freed explicitly, or reclaimed by
//! [`AtomTree::collect_garbage`] before a tree is handed out again.

use std::collections::HashSet;
use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::journal::Mutation;
use super::kind::{AtomKind, BranchName, Correctness};
use super::style::{ParseMode, Style};
use crate::error::EditError;

/// Handle of an atom inside one [`AtomTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AtomId(u32);

impl AtomId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One node of the document.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub kind: AtomKind,
    /// Symbol or command spelling (`x`, `+`, `\alpha`, `\hat`, ...)
    pub value: String,
    pub mode: ParseMode,
    /// Local style; unset fields inherit from ancestors
    pub style: Style,
    pub(crate) branches: Vec<(BranchName, Vec<AtomId>)>,
    pub(crate) parent: Option<(AtomId, BranchName)>,
}

impl Atom {
    pub fn new(kind: AtomKind, value: impl Into<String>) -> Self {
        Atom {
            kind,
            value: value.into(),
            mode: ParseMode::Math,
            style: Style::default(),
            branches: Vec::new(),
            parent: None,
        }
    }

    pub fn in_mode(mut self, mode: ParseMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn styled(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Attach a branch of detached children. Used when building bottom-up.
    pub fn with_branch(mut self, name: BranchName, children: Vec<AtomId>) -> Self {
        match self.branches.iter_mut().find(|(n, _)| *n == name) {
            Some((_, kids)) => *kids = children,
            None => {
                self.branches.push((name, children));
                self.branches.sort_by_key(|(n, _)| n.rank());
            }
        }
        self
    }

    pub fn branches(&self) -> &[(BranchName, Vec<AtomId>)] {
        &self.branches
    }

    pub fn branch(&self, name: BranchName) -> Option<&[AtomId]> {
        self.branches
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, kids)| kids.as_slice())
    }

    pub fn has_branch(&self, name: BranchName) -> bool {
        self.branch(name).is_some()
    }

    pub fn parent(&self) -> Option<(AtomId, BranchName)> {
        self.parent
    }

    pub fn is_leaf(&self) -> bool {
        self.branches.is_empty()
    }
}

/// Owned copy of a subtree, independent of any arena.
#[derive(Debug, Clone)]
struct Fragment {
    atom: Atom,
    branches: Vec<(BranchName, Vec<Fragment>)>,
}

#[derive(Debug, Clone)]
pub struct AtomTree {
    atoms: Vec<Option<Atom>>,
    free: Vec<u32>,
    root: AtomId,
    generation: u64,
    journal: Vec<Mutation>,
}

impl Default for AtomTree {
    fn default() -> Self {
        Self::new()
    }
}

fn missing(id: AtomId) -> EditError {
    EditError::InvariantViolation(format!("atom {id} does not exist"))
}

impl AtomTree {
    /// An empty document: a root atom with an empty body.
    pub fn new() -> Self {
        let root = Atom::new(AtomKind::Root, "").with_branch(BranchName::Body, Vec::new());
        AtomTree {
            atoms: vec![Some(root)],
            free: Vec::new(),
            root: AtomId(0),
            generation: 0,
            journal: Vec::new(),
        }
    }

    // ===== Queries =====

    pub fn root(&self) -> AtomId {
        self.root
    }

    /// Bumped on every mutation. Offsets are only valid for one generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id.index()).and_then(|slot| slot.as_ref())
    }

    pub fn atom(&self, id: AtomId) -> Result<&Atom, EditError> {
        self.get(id).ok_or_else(|| missing(id))
    }

    fn atom_mut(&mut self, id: AtomId) -> Result<&mut Atom, EditError> {
        self.atoms
            .get_mut(id.index())
            .and_then(|slot| slot.as_mut())
            .ok_or_else(|| missing(id))
    }

    pub fn contains(&self, id: AtomId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live atoms, the root included.
    pub fn len(&self) -> usize {
        self.atoms.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.body().is_empty()
    }

    /// Atoms of the root body.
    pub fn body(&self) -> &[AtomId] {
        self.branch(self.root, BranchName::Body)
    }

    pub fn parent(&self, id: AtomId) -> Option<AtomId> {
        self.parent_branch(id).map(|(parent, _)| parent)
    }

    pub fn parent_branch(&self, id: AtomId) -> Option<(AtomId, BranchName)> {
        self.get(id).and_then(|atom| atom.parent)
    }

    pub fn index_in_parent(&self, id: AtomId) -> Option<usize> {
        let (parent, branch) = self.parent_branch(id)?;
        self.branch(parent, branch).iter().position(|c| *c == id)
    }

    /// Children of one branch; empty when the atom or branch is absent.
    pub fn branch(&self, id: AtomId, name: BranchName) -> &[AtomId] {
        self.get(id).and_then(|a| a.branch(name)).unwrap_or(&[])
    }

    pub fn has_branch(&self, id: AtomId, name: BranchName) -> bool {
        self.get(id).is_some_and(|a| a.has_branch(name))
    }

    pub fn branches(&self, id: AtomId) -> &[(BranchName, Vec<AtomId>)] {
        self.get(id).map(|a| a.branches.as_slice()).unwrap_or(&[])
    }

    pub fn branch_names(&self, id: AtomId) -> Vec<BranchName> {
        self.branches(id).iter().map(|(n, _)| *n).collect()
    }

    /// All children in branch order.
    pub fn children(&self, id: AtomId) -> Vec<AtomId> {
        self.branches(id)
            .iter()
            .flat_map(|(_, kids)| kids.iter().copied())
            .collect()
    }

    /// Distance from the root (root is depth 0).
    pub fn depth(&self, id: AtomId) -> usize {
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            depth += 1;
            current = parent;
        }
        depth
    }

    /// Parent chain from the nearest ancestor up to the root.
    pub fn ancestors(&self, id: AtomId) -> Vec<AtomId> {
        let mut chain = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    pub fn is_ancestor_of(&self, ancestor: AtomId, id: AtomId) -> bool {
        self.ancestors(id).contains(&ancestor)
    }

    /// Pre-order descendants, `id` excluded.
    pub fn descendants(&self, id: AtomId) -> Vec<AtomId> {
        let mut out = Vec::new();
        self.collect_descendants(id, &mut out);
        out
    }

    fn collect_descendants(&self, id: AtomId, out: &mut Vec<AtomId>) {
        for (_, kids) in self.branches(id) {
            for kid in kids {
                out.push(*kid);
                self.collect_descendants(*kid, out);
            }
        }
    }

    /// Prompt atoms in document order.
    pub fn prompts(&self) -> Vec<AtomId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|id| matches!(self.get(*id).map(|a| &a.kind), Some(AtomKind::Prompt(_))))
            .collect()
    }

    pub fn find_prompt(&self, prompt_id: &str) -> Option<AtomId> {
        self.prompts().into_iter().find(|id| {
            matches!(self.get(*id).map(|a| &a.kind), Some(AtomKind::Prompt(p)) if p.id == prompt_id)
        })
    }

    /// True when `id` is a locked prompt or lies inside one.
    pub fn is_locked(&self, id: AtomId) -> bool {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .any(|a| matches!(self.get(a).map(|x| &x.kind), Some(AtomKind::Prompt(p)) if p.locked))
    }

    /// True when `id` is or contains a locked prompt.
    pub fn contains_locked(&self, id: AtomId) -> bool {
        std::iter::once(id)
            .chain(self.descendants(id))
            .any(|a| matches!(self.get(a).map(|x| &x.kind), Some(AtomKind::Prompt(p)) if p.locked))
    }

    /// Style after inheritance from every ancestor.
    pub fn effective_style(&self, id: AtomId) -> Style {
        let mut chain = vec![id];
        chain.extend(self.ancestors(id));
        chain.iter().rev().fold(Style::default(), |inherited, a| {
            self.get(*a)
                .map(|atom| atom.style.resolve(&inherited))
                .unwrap_or(inherited)
        })
    }

    // ===== Mutations =====

    fn touch(&mut self, mutation: Mutation) {
        self.generation += 1;
        self.journal.push(mutation);
    }

    /// Drain the mutation journal.
    pub fn take_journal(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.journal)
    }

    /// Add an atom to the arena. Children named in its branches must be
    /// detached; they become children of the new atom.
    pub fn add(&mut self, mut atom: Atom) -> AtomId {
        atom.parent = None;
        atom.branches.sort_by_key(|(n, _)| n.rank());
        let id = match self.free.pop() {
            Some(slot) => AtomId(slot),
            None => {
                self.atoms.push(None);
                AtomId((self.atoms.len() - 1) as u32)
            }
        };
        let links: Vec<(BranchName, AtomId)> = atom
            .branches
            .iter()
            .flat_map(|(n, kids)| kids.iter().map(move |k| (*n, *k)))
            .collect();
        self.atoms[id.index()] = Some(atom);
        for (name, kid) in links {
            if let Some(child) = self.atoms.get_mut(kid.index()).and_then(|s| s.as_mut()) {
                child.parent = Some((id, name));
            }
        }
        self.touch(Mutation::Created { atom: id });
        id
    }

    fn check_insertable(&self, parent: AtomId, atoms: &[AtomId]) -> Result<(), EditError> {
        let mut chain = self.ancestors(parent);
        chain.push(parent);
        for id in atoms {
            let atom = self.atom(*id)?;
            if *id == self.root {
                return Err(EditError::InvariantViolation("root cannot be inserted".into()));
            }
            if atom.parent.is_some() {
                return Err(EditError::InvariantViolation(format!(
                    "atom {id} is already attached"
                )));
            }
            if chain.contains(id) {
                return Err(EditError::InvariantViolation(format!(
                    "inserting {id} would create a cycle"
                )));
            }
        }
        Ok(())
    }

    fn ensure_branch(&mut self, id: AtomId, name: BranchName) -> Result<(), EditError> {
        let atom = self.atom_mut(id)?;
        if atom.has_branch(name) {
            return Ok(());
        }
        if !atom.kind.allows_branch(name) {
            return Err(EditError::InvariantViolation(format!(
                "{} atoms have no {} branch",
                atom.kind.name(),
                name.label()
            )));
        }
        atom.branches.push((name, Vec::new()));
        atom.branches.sort_by_key(|(n, _)| n.rank());
        self.touch(Mutation::BranchCreated { atom: id, branch: name });
        Ok(())
    }

    fn branch_mut(&mut self, id: AtomId, name: BranchName) -> Result<&mut Vec<AtomId>, EditError> {
        let atom = self.atom_mut(id)?;
        let label = atom.kind.name();
        atom.branches
            .iter_mut()
            .find(|(n, _)| *n == name)
            .map(|(_, kids)| kids)
            .ok_or_else(|| {
                EditError::InvariantViolation(format!("{label} atom has no {} branch", name.label()))
            })
    }

    /// Insert detached atoms at `index` of a branch, creating the branch if
    /// the kind allows it.
    pub fn insert(
        &mut self,
        parent: AtomId,
        branch: BranchName,
        index: usize,
        atoms: &[AtomId],
    ) -> Result<(), EditError> {
        self.check_insertable(parent, atoms)?;
        self.ensure_branch(parent, branch)?;
        let kids = self.branch_mut(parent, branch)?;
        if index > kids.len() {
            return Err(EditError::InvariantViolation(format!(
                "index {index} past end of branch ({})",
                kids.len()
            )));
        }
        kids.splice(index..index, atoms.iter().copied());
        for id in atoms {
            self.atom_mut(*id)?.parent = Some((parent, branch));
        }
        self.touch(Mutation::Inserted {
            parent,
            branch,
            index,
            atoms: atoms.to_vec(),
        });
        Ok(())
    }

    /// Take a run of siblings out of a branch. The returned atoms stay
    /// alive, detached.
    pub fn detach(
        &mut self,
        parent: AtomId,
        branch: BranchName,
        range: Range<usize>,
    ) -> Result<Vec<AtomId>, EditError> {
        let kids = self.branch_mut(parent, branch)?;
        if range.start > range.end || range.end > kids.len() {
            return Err(EditError::InvariantViolation(format!(
                "range {}..{} outside branch of length {}",
                range.start,
                range.end,
                kids.len()
            )));
        }
        let start = range.start;
        let removed: Vec<AtomId> = kids.drain(range).collect();
        for id in &removed {
            self.atom_mut(*id)?.parent = None;
        }
        if !removed.is_empty() {
            self.touch(Mutation::Detached {
                parent,
                branch,
                index: start,
                atoms: removed.clone(),
            });
        }
        Ok(removed)
    }

    /// Detach every atom after `index` in a branch.
    pub fn detach_tail(
        &mut self,
        parent: AtomId,
        branch: BranchName,
        index: usize,
    ) -> Result<Vec<AtomId>, EditError> {
        let len = self.branch(parent, branch).len();
        self.detach(parent, branch, index.min(len)..len)
    }

    /// Replace a run of siblings with detached atoms; returns the removed
    /// atoms, detached.
    pub fn splice(
        &mut self,
        parent: AtomId,
        branch: BranchName,
        range: Range<usize>,
        replacement: &[AtomId],
    ) -> Result<Vec<AtomId>, EditError> {
        self.check_insertable(parent, replacement)?;
        let start = range.start;
        let removed = self.detach(parent, branch, range)?;
        self.insert(parent, branch, start, replacement)?;
        Ok(removed)
    }

    /// Detach `id` from its parent and free its subtree.
    pub fn remove(&mut self, id: AtomId) -> Result<(), EditError> {
        if id == self.root {
            return Err(EditError::InvariantViolation("the root cannot be removed".into()));
        }
        if let Some((parent, branch)) = self.parent_branch(id) {
            let index = self.index_in_parent(id).ok_or_else(|| missing(id))?;
            self.detach(parent, branch, index..index + 1)?;
        }
        self.free(id);
        Ok(())
    }

    /// Put detached atoms in the place of `old`, which is freed.
    pub fn replace(&mut self, old: AtomId, new: &[AtomId]) -> Result<(), EditError> {
        let (parent, branch) = self
            .parent_branch(old)
            .ok_or_else(|| EditError::InvariantViolation(format!("atom {old} is detached")))?;
        let index = self.index_in_parent(old).ok_or_else(|| missing(old))?;
        let removed = self.splice(parent, branch, index..index + 1, new)?;
        for id in removed {
            self.free(id);
        }
        Ok(())
    }

    /// Swap the children of a branch, creating it when needed; returns the
    /// previous children, detached.
    pub fn set_branch(
        &mut self,
        id: AtomId,
        name: BranchName,
        atoms: &[AtomId],
    ) -> Result<Vec<AtomId>, EditError> {
        self.check_insertable(id, atoms)?;
        self.ensure_branch(id, name)?;
        let len = self.branch(id, name).len();
        let old = self.detach(id, name, 0..len)?;
        self.insert(id, name, 0, atoms)?;
        Ok(old)
    }

    /// Drop a branch; its children are returned detached.
    pub fn remove_branch(&mut self, id: AtomId, name: BranchName) -> Result<Vec<AtomId>, EditError> {
        if self.atom(id)?.kind.required_branches().contains(&name) {
            return Err(EditError::InvariantViolation(format!(
                "{} branch is required",
                name.label()
            )));
        }
        if !self.has_branch(id, name) {
            return Ok(Vec::new());
        }
        let len = self.branch(id, name).len();
        let old = self.detach(id, name, 0..len)?;
        self.atom_mut(id)?.branches.retain(|(n, _)| *n != name);
        self.touch(Mutation::BranchRemoved { atom: id, branch: name });
        Ok(old)
    }

    pub fn set_style(&mut self, id: AtomId, style: Style) -> Result<(), EditError> {
        let atom = self.atom_mut(id)?;
        if atom.style == style {
            return Ok(());
        }
        let before = std::mem::replace(&mut atom.style, style.clone());
        self.touch(Mutation::StyleChanged {
            atom: id,
            before,
            after: style,
        });
        Ok(())
    }

    /// Change the kind, value and mode of an atom in place, keeping its
    /// branches. The new kind must accept every existing branch.
    pub fn retag(
        &mut self,
        id: AtomId,
        kind: AtomKind,
        value: impl Into<String>,
        mode: ParseMode,
    ) -> Result<(), EditError> {
        let atom = self.atom_mut(id)?;
        if let Some((name, _)) = atom.branches.iter().find(|(n, _)| !kind.allows_branch(*n)) {
            return Err(EditError::InvariantViolation(format!(
                "{} atoms have no {} branch",
                kind.name(),
                name.label()
            )));
        }
        atom.kind = kind;
        atom.value = value.into();
        atom.mode = mode;
        self.touch(Mutation::Retagged { atom: id });
        Ok(())
    }

    /// Update the correctness and lock state of a prompt. Unset arguments
    /// keep their value.
    pub fn set_prompt_state(
        &mut self,
        id: AtomId,
        correctness: Option<Correctness>,
        locked: Option<bool>,
    ) -> Result<(), EditError> {
        let AtomKind::Prompt(prompt) = &mut self.atom_mut(id)?.kind else {
            return Err(EditError::InvariantViolation(format!("atom {id} is not a prompt")));
        };
        let before = (prompt.correctness, prompt.locked);
        if let Some(correctness) = correctness {
            prompt.correctness = correctness;
        }
        if let Some(locked) = locked {
            prompt.locked = locked;
        }
        if before != (prompt.correctness, prompt.locked) {
            self.touch(Mutation::PromptStateChanged { atom: id });
        }
        Ok(())
    }

    /// Release a detached subtree.
    pub fn free(&mut self, id: AtomId) {
        if id == self.root {
            return;
        }
        let Some(atom) = self.atoms.get_mut(id.index()).and_then(|s| s.take()) else {
            return;
        };
        self.free.push(id.0);
        self.touch(Mutation::Freed { atom: id });
        for (_, kids) in atom.branches {
            for kid in kids {
                self.free(kid);
            }
        }
    }

    /// Free every atom not reachable from the root.
    pub fn collect_garbage(&mut self) -> usize {
        let mut reachable: HashSet<AtomId> = self.descendants(self.root).into_iter().collect();
        reachable.insert(self.root);
        let mut freed = 0;
        for index in 0..self.atoms.len() {
            let id = AtomId(index as u32);
            if self.atoms[index].is_some() && !reachable.contains(&id) {
                self.atoms[index] = None;
                self.free.push(id.0);
                freed += 1;
            }
        }
        freed
    }

    fn extract(&self, id: AtomId) -> Option<Fragment> {
        let atom = self.get(id)?;
        let branches = atom
            .branches
            .iter()
            .map(|(name, kids)| (*name, kids.iter().filter_map(|k| self.extract(*k)).collect()))
            .collect();
        let mut copy = atom.clone();
        copy.branches.clear();
        copy.parent = None;
        Some(Fragment {
            atom: copy,
            branches,
        })
    }

    fn materialize(&mut self, fragment: Fragment) -> AtomId {
        let Fragment { mut atom, branches } = fragment;
        for (name, kids) in branches {
            let ids = kids.into_iter().map(|k| self.materialize(k)).collect();
            atom.branches.push((name, ids));
        }
        self.add(atom)
    }

    /// Deep-copy atoms of another tree into this one. The copies are
    /// returned detached.
    pub fn graft(&mut self, other: &AtomTree, ids: &[AtomId]) -> Vec<AtomId> {
        ids.iter()
            .filter_map(|id| other.extract(*id))
            .map(|fragment| self.materialize(fragment))
            .collect()
    }

    /// Deep-copy atoms of this tree; the copies are returned detached.
    pub fn duplicate(&mut self, ids: &[AtomId]) -> Vec<AtomId> {
        let fragments: Vec<Fragment> = ids.iter().filter_map(|id| self.extract(*id)).collect();
        fragments
            .into_iter()
            .map(|fragment| self.materialize(fragment))
            .collect()
    }

    // ===== Invariants =====

    /// Check parent links, acyclicity, branch arity and prompt id
    /// uniqueness over the atoms reachable from the root.
    pub fn validate(&self) -> Result<(), String> {
        let root = self.get(self.root).ok_or("root atom is missing")?;
        if root.kind != AtomKind::Root || root.parent.is_some() {
            return Err("root atom is malformed".into());
        }
        let mut seen = HashSet::new();
        let mut prompt_ids = HashSet::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                return Err(format!("atom {id} is reachable twice"));
            }
            let atom = self.get(id).ok_or_else(|| format!("dangling child {id}"))?;
            for name in atom.kind.required_branches() {
                if !atom.has_branch(name) {
                    return Err(format!(
                        "{} atom {id} is missing its {} branch",
                        atom.kind.name(),
                        name.label()
                    ));
                }
            }
            match &atom.kind {
                AtomKind::Subsup
                    if !atom.has_branch(BranchName::Superscript)
                        && !atom.has_branch(BranchName::Subscript) =>
                {
                    return Err(format!("subsup atom {id} has no script"));
                }
                AtomKind::Prompt(prompt) if !prompt_ids.insert(prompt.id.clone()) => {
                    return Err(format!("duplicate prompt id '{}'", prompt.id));
                }
                _ => {}
            }
            for (name, kids) in &atom.branches {
                if !atom.kind.allows_branch(*name) {
                    return Err(format!(
                        "{} atom {id} has an unexpected {} branch",
                        atom.kind.name(),
                        name.label()
                    ));
                }
                for kid in kids {
                    let child = self.get(*kid).ok_or_else(|| format!("dangling child {kid}"))?;
                    if child.parent != Some((id, *name)) {
                        return Err(format!("atom {kid} has a stale parent link"));
                    }
                    if child.kind == AtomKind::Root {
                        return Err(format!("root kind nested at {kid}"));
                    }
                    stack.push(*kid);
                }
            }
        }
        Ok(())
    }

    /// Same atom kinds, values, modes, effective styles and branch
    /// structure. Arena handles are not compared.
    pub fn structurally_eq(&self, other: &AtomTree) -> bool {
        self.lists_eq(
            self.body(),
            &Style::default(),
            other,
            other.body(),
            &Style::default(),
        )
    }

    /// Structural equality of two sibling runs, each under its inherited
    /// style.
    pub fn lists_eq(
        &self,
        ours: &[AtomId],
        our_style: &Style,
        other: &AtomTree,
        theirs: &[AtomId],
        their_style: &Style,
    ) -> bool {
        ours.len() == theirs.len()
            && ours
                .iter()
                .zip(theirs)
                .all(|(a, b)| self.atoms_eq(*a, our_style, other, *b, their_style))
    }

    fn atoms_eq(
        &self,
        a: AtomId,
        a_inherited: &Style,
        other: &AtomTree,
        b: AtomId,
        b_inherited: &Style,
    ) -> bool {
        let (Some(x), Some(y)) = (self.get(a), other.get(b)) else {
            return false;
        };
        let x_style = x.style.resolve(a_inherited);
        let y_style = y.style.resolve(b_inherited);
        x.kind == y.kind
            && x.value == y.value
            && x.mode == y.mode
            && x_style == y_style
            && x.branches.len() == y.branches.len()
            && x
                .branches
                .iter()
                .zip(&y.branches)
                .all(|((xn, xk), (yn, yk))| {
                    xn == yn && self.lists_eq(xk, &x_style, other, yk, &y_style)
                })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::kind::{FractionKind, Prompt};

    fn ord(tree: &mut AtomTree, value: &str) -> AtomId {
        tree.add(Atom::new(AtomKind::Ord, value))
    }

    fn fraction(tree: &mut AtomTree, above: &str, below: &str) -> AtomId {
        let a = ord(tree, above);
        let b = ord(tree, below);
        tree.add(
            Atom::new(AtomKind::Fraction(FractionKind::Frac), "")
                .with_branch(BranchName::Above, vec![a])
                .with_branch(BranchName::Below, vec![b]),
        )
    }

    #[test]
    fn test_new_tree_is_valid_and_empty() {
        let tree = AtomTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 1);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_insert_sets_parent_links_and_depth() {
        let mut tree = AtomTree::new();
        let frac = fraction(&mut tree, "1", "2");
        let root = tree.root();
        tree.insert(root, BranchName::Body, 0, &[frac]).unwrap();

        let numerator = tree.branch(frac, BranchName::Above)[0];
        assert_eq!(tree.parent(frac), Some(root));
        assert_eq!(tree.parent_branch(numerator), Some((frac, BranchName::Above)));
        assert_eq!(tree.depth(root), 0);
        assert_eq!(tree.depth(frac), 1);
        assert_eq!(tree.depth(numerator), 2);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_insert_rejects_attached_atoms() {
        let mut tree = AtomTree::new();
        let x = ord(&mut tree, "x");
        let root = tree.root();
        tree.insert(root, BranchName::Body, 0, &[x]).unwrap();
        let err = tree.insert(root, BranchName::Body, 1, &[x]).unwrap_err();
        assert!(matches!(err, EditError::InvariantViolation(_)));
    }

    #[test]
    fn test_insert_rejects_cycles() {
        let mut tree = AtomTree::new();
        let group = tree.add(Atom::new(AtomKind::Group, "").with_branch(BranchName::Body, vec![]));
        let err = tree.insert(group, BranchName::Body, 0, &[group]).unwrap_err();
        assert!(matches!(err, EditError::InvariantViolation(_)));
    }

    #[test]
    fn test_branch_that_kind_does_not_allow() {
        let mut tree = AtomTree::new();
        let frac = fraction(&mut tree, "1", "2");
        let y = ord(&mut tree, "y");
        assert!(tree.insert(frac, BranchName::Index, 0, &[y]).is_err());
    }

    #[test]
    fn test_splice_and_remove() {
        let mut tree = AtomTree::new();
        let root = tree.root();
        let atoms: Vec<AtomId> = ["a", "b", "c"].iter().map(|v| ord(&mut tree, v)).collect();
        tree.insert(root, BranchName::Body, 0, &atoms).unwrap();

        let z = ord(&mut tree, "z");
        let removed = tree.splice(root, BranchName::Body, 1..2, &[z]).unwrap();
        assert_eq!(removed, vec![atoms[1]]);
        assert_eq!(tree.parent(atoms[1]), None);
        tree.free(atoms[1]);

        tree.remove(atoms[0]).unwrap();
        let values: Vec<&str> = tree
            .body()
            .iter()
            .map(|id| tree.get(*id).unwrap().value.as_str())
            .collect();
        assert_eq!(values, vec!["z", "c"]);
        assert!(!tree.contains(atoms[0]));
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_required_branch_cannot_be_removed() {
        let mut tree = AtomTree::new();
        let frac = fraction(&mut tree, "1", "2");
        assert!(tree.remove_branch(frac, BranchName::Above).is_err());
    }

    #[test]
    fn test_scripts_create_and_drop_branches() {
        let mut tree = AtomTree::new();
        let root = tree.root();
        let x = ord(&mut tree, "x");
        tree.insert(root, BranchName::Body, 0, &[x]).unwrap();
        let two = ord(&mut tree, "2");
        tree.insert(x, BranchName::Superscript, 0, &[two]).unwrap();
        assert_eq!(tree.branch_names(x), vec![BranchName::Superscript]);

        let old = tree.remove_branch(x, BranchName::Superscript).unwrap();
        assert_eq!(old, vec![two]);
        assert!(tree.get(x).unwrap().is_leaf());
    }

    #[test]
    fn test_validate_reports_duplicate_prompt_ids() {
        let mut tree = AtomTree::new();
        let root = tree.root();
        for _ in 0..2 {
            let prompt = tree.add(
                Atom::new(AtomKind::Prompt(Prompt::new("p1")), "")
                    .with_branch(BranchName::Body, vec![]),
            );
            let len = tree.body().len();
            tree.insert(root, BranchName::Body, len, &[prompt]).unwrap();
        }
        let err = tree.validate().unwrap_err();
        assert!(err.contains("duplicate prompt id"));
    }

    #[test]
    fn test_effective_style_inherits() {
        let mut tree = AtomTree::new();
        let root = tree.root();
        let x = ord(&mut tree, "x");
        let group = tree.add(
            Atom::new(AtomKind::Group, "")
                .styled(Style::default().with_color("red"))
                .with_branch(BranchName::Body, vec![x]),
        );
        tree.insert(root, BranchName::Body, 0, &[group]).unwrap();
        assert_eq!(tree.effective_style(x).color.as_deref(), Some("red"));
    }

    #[test]
    fn test_structural_equality_uses_effective_style() {
        let mut a = AtomTree::new();
        let ax = ord(&mut a, "x");
        let group = a.add(
            Atom::new(AtomKind::Group, "")
                .styled(Style::default().with_color("red"))
                .with_branch(BranchName::Body, vec![ax]),
        );
        let root = a.root();
        a.insert(root, BranchName::Body, 0, &[group]).unwrap();

        let mut b = AtomTree::new();
        let bx = b.add(Atom::new(AtomKind::Ord, "x").styled(Style::default().with_color("red")));
        let group = b.add(
            Atom::new(AtomKind::Group, "")
                .styled(Style::default().with_color("red"))
                .with_branch(BranchName::Body, vec![bx]),
        );
        let root = b.root();
        b.insert(root, BranchName::Body, 0, &[group]).unwrap();

        assert!(a.structurally_eq(&b));
    }

    #[test]
    fn test_graft_copies_between_trees() {
        let mut source = AtomTree::new();
        let frac = fraction(&mut source, "a", "b");
        let root = source.root();
        source.insert(root, BranchName::Body, 0, &[frac]).unwrap();

        let mut target = AtomTree::new();
        let copies = target.graft(&source, source.body());
        let root = target.root();
        target.insert(root, BranchName::Body, 0, &copies).unwrap();
        assert!(target.structurally_eq(&source));
        assert!(target.validate().is_ok());
    }

    #[test]
    fn test_generation_and_journal() {
        let mut tree = AtomTree::new();
        let start = tree.generation();
        let x = ord(&mut tree, "x");
        let root = tree.root();
        tree.insert(root, BranchName::Body, 0, &[x]).unwrap();
        assert!(tree.generation() > start);
        let journal = tree.take_journal();
        assert_eq!(journal.len(), 2);
        assert!(tree.take_journal().is_empty());
    }

    #[test]
    fn test_prompt_state_is_journaled() {
        let mut tree = AtomTree::new();
        let prompt = tree.add(Atom::new(AtomKind::Prompt(Prompt::new("p1")), ""));
        let root = tree.root();
        tree.insert(root, BranchName::Body, 0, &[prompt]).unwrap();
        tree.take_journal();
        let start = tree.generation();

        tree.set_prompt_state(prompt, Some(Correctness::Correct), Some(true)).unwrap();
        assert!(tree.is_locked(prompt));
        assert!(tree.generation() > start);
        assert_eq!(tree.take_journal(), vec![Mutation::PromptStateChanged { atom: prompt }]);

        // unchanged state records nothing
        tree.set_prompt_state(prompt, None, Some(true)).unwrap();
        assert!(tree.take_journal().is_empty());
        assert!(tree.set_prompt_state(root, None, Some(true)).is_err());
    }

    #[test]
    fn test_collect_garbage_frees_orphans() {
        let mut tree = AtomTree::new();
        let orphan = ord(&mut tree, "x");
        assert_eq!(tree.collect_garbage(), 1);
        assert!(!tree.contains(orphan));
    }
}
