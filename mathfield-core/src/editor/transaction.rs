//! Working copies and committed transactions.
//!
//! A command never touches the live tree. It receives a [`Draft`], a clone
//! of the tree plus read access to everything else, mutates the clone, and
//! names where the selection should land with a [`Target`]. The engine
//! validates the clone and swaps it in only when the command succeeded.

use crate::atom::{Atom, AtomId, AtomKind, AtomTree, BranchName, Mutation, ParseMode, Style};
use crate::error::EditError;
use crate::parser::{parse_in_mode, ParseContext};
use crate::selection::{snap_offset, span_of, BranchSpan, OffsetMap, Position, Range, Selection};

use super::EditorOptions;

/// Tree and selection at one point in time.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub tree: AtomTree,
    pub selection: Selection,
}

/// One committed command.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub command: String,
    pub mutations: Vec<Mutation>,
    pub before: Snapshot,
    pub after: Snapshot,
}

/// Where the selection goes once a command is done. Positions refer to the
/// draft tree after all mutations.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Target {
    /// Previous offsets, when they are still valid
    Keep,
    Caret(Position),
    Range { anchor: Position, focus: Position },
}

pub(crate) struct Draft<'a> {
    pub tree: AtomTree,
    /// Offsets of the tree as it was before the command
    pub map: &'a OffsetMap,
    pub selection: &'a Selection,
    pub options: &'a EditorOptions,
    pub ctx: &'a ParseContext,
    pub mode: ParseMode,
    pub pending_style: Option<Style>,
}

impl Draft<'_> {
    pub fn position(&self, offset: usize) -> Result<Position, EditError> {
        self.map.position_of(offset)
    }

    /// Only meaningful before the first mutation.
    pub fn span(&self, range: Range) -> Result<BranchSpan, EditError> {
        span_of(&self.tree, self.map, range)
    }

    pub fn root(&self) -> AtomId {
        self.tree.root()
    }

    pub fn ensure_editable(&self, parent: AtomId) -> Result<(), EditError> {
        if self.tree.is_locked(parent) {
            return Err(EditError::LockedRegion(format!(
                "atom {parent} is inside a locked prompt"
            )));
        }
        Ok(())
    }

    pub fn ensure_removable(&self, atoms: &[AtomId]) -> Result<(), EditError> {
        match atoms.iter().find(|id| self.tree.contains_locked(**id)) {
            Some(id) => Err(EditError::LockedRegion(format!(
                "atom {id} contains a locked prompt"
            ))),
            None => Ok(()),
        }
    }

    /// Parse inserted markup with the editor's settings.
    pub fn parse_fragment(&self, markup: &str, mode: ParseMode) -> Result<AtomTree, EditError> {
        let mut ctx = self.ctx.clone();
        ctx.allow_selection_marker = true;
        ctx.smart_fence = self.options.smart_fence;
        if let Some(style) = &self.pending_style {
            ctx.style = style.clone();
        }
        Ok(parse_in_mode(markup, &ctx, mode)?)
    }

    /// Copy the body of `fragment` into the draft. Prompt ids must stay
    /// unique across the document.
    pub fn graft_checked(&mut self, fragment: &AtomTree) -> Result<Vec<AtomId>, EditError> {
        for id in fragment.prompts() {
            if let Some(AtomKind::Prompt(prompt)) = fragment.get(id).map(|a| &a.kind) {
                if self.tree.find_prompt(&prompt.id).is_some() {
                    return Err(EditError::InvariantViolation(format!(
                        "prompt id '{}' is already in use",
                        prompt.id
                    )));
                }
            }
        }
        Ok(self.tree.graft(fragment, fragment.body()))
    }

    /// Add a new atom carrying the pending style.
    pub fn new_atom(&mut self, atom: Atom) -> AtomId {
        let atom = match &self.pending_style {
            Some(style) if atom.style.is_empty() => atom.styled(style.clone()),
            _ => atom,
        };
        self.tree.add(atom)
    }

    pub fn placeholder(&mut self) -> AtomId {
        self.tree.add(Atom::new(AtomKind::Placeholder, ""))
    }

    /// Insert atoms at the caret and return the caret after them. A branch
    /// holding nothing but a placeholder is filled instead.
    pub fn place(&mut self, caret: Position, atoms: &[AtomId]) -> Result<Position, EditError> {
        let index = match self.sole_placeholder(caret.parent, caret.branch) {
            Some(placeholder) => {
                self.tree.remove(placeholder)?;
                0
            }
            None => caret.index,
        };
        self.tree.insert(caret.parent, caret.branch, index, atoms)?;
        Ok(Position::new(caret.parent, caret.branch, index + atoms.len()))
    }

    pub fn sole_placeholder(&self, parent: AtomId, branch: BranchName) -> Option<AtomId> {
        match self.tree.branch(parent, branch) {
            [only] => self
                .tree
                .get(*only)
                .filter(|a| a.kind == AtomKind::Placeholder && a.value != "#@")
                .map(|_| *only),
            _ => None,
        }
    }
}

/// Selection for `target` in the committed tree.
pub(crate) fn resolve(
    target: Target,
    tree: &AtomTree,
    map: &OffsetMap,
    previous: &Selection,
) -> Selection {
    let end = map.end_of_root(tree);
    let offset = |p: &Position| map.offset_of(p).unwrap_or(end);
    match target {
        Target::Keep if previous.validate(map).is_ok() => previous.clone(),
        Target::Keep => Selection::caret(end),
        Target::Caret(position) => Selection::caret(snap_offset(tree, map, offset(&position))),
        Target::Range { anchor, focus } => {
            Selection::single(Range::new(offset(&anchor), offset(&focus)))
        }
    }
}

/// Copy prompt correctness and lock state from `from` into `to`, by id.
/// Prompt state lives outside the undo history, so the journal entries
/// this produces are dropped.
pub(crate) fn carry_prompt_states(from: &AtomTree, to: &mut AtomTree) {
    for id in to.prompts() {
        let Some(AtomKind::Prompt(target)) = to.get(id).map(|a| &a.kind) else {
            continue;
        };
        let source = from.find_prompt(&target.id).and_then(|p| match from.get(p).map(|a| &a.kind) {
            Some(AtomKind::Prompt(prompt)) => Some(prompt.clone()),
            _ => None,
        });
        if let Some(source) = source {
            // `id` was just listed as a prompt of `to`
            let _ = to.set_prompt_state(id, Some(source.correctness), Some(source.locked));
        }
    }
    to.take_journal();
}

/// True while `id` is reachable from the root.
pub(crate) fn is_attached(tree: &AtomTree, id: AtomId) -> bool {
    id == tree.root() || tree.ancestors(id).last() == Some(&tree.root())
}
