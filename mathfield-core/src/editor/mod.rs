//! Edit engine.
//!
//! [`Mathfield`] owns one document: the atom tree, the selection, the undo
//! history and the notifications the host has not collected yet. Hosts drive
//! it with [`Command`]s through [`Mathfield::execute`].
//!
//! Mutating commands run against a [`Draft`](transaction::Draft), a working
//! copy of the tree. When the command returns, the copy is validated and
//! only then swapped in and recorded in the history. A command that fails,
//! for any reason, leaves the tree, the selection and the history exactly as
//! they were. Commands take `&mut self`, so a command can never start while
//! another one is still running.

pub mod command;
mod delete;
mod fence;
mod insert;
mod prompt;
mod script;
mod style;
mod transaction;
mod typing;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

pub use command::{
    Command, InsertOptions, InsertionMode, PromptFilter, SelectionMode, StyleOperation,
};
pub use transaction::{Snapshot, Transaction};

use crate::atom::{AtomKind, AtomTree, BranchName, Correctness, ParseMode, Prompt, Style};
use crate::error::EditError;
use crate::formats::latex::to_latex;
use crate::history::UndoLog;
use crate::parser::{parse, ParseContext};
use crate::registry::FormatRegistry;
use crate::selection::{
    atoms_in_range, next_offset, snap_offset, snap_out_of_macros, Adjacent, Direction,
    NavigationOptions, OffsetMap, Position, Range, Selection,
};
use transaction::{carry_prompt_states, resolve, Draft, Target};

/// Maximum nesting of scripts; `None` is unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptDepth {
    pub superscript: Option<usize>,
    pub subscript: Option<usize>,
}

impl ScriptDepth {
    pub fn uniform(depth: usize) -> Self {
        ScriptDepth {
            superscript: Some(depth),
            subscript: Some(depth),
        }
    }

    pub fn limit(&self, branch: BranchName) -> Option<usize> {
        match branch {
            BranchName::Superscript => self.superscript,
            BranchName::Subscript => self.subscript,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorOptions {
    /// Wrap unmatched openers in auto-sized fences
    pub smart_fence: bool,
    /// Leave a fresh superscript after a single digit
    pub smart_superscript: bool,
    /// Switch typed English words to text mode
    pub smart_mode: bool,
    pub script_depth: ScriptDepth,
    /// Drop the parentheses around a typed numerator
    pub remove_extraneous_parentheses: bool,
    /// Markup inserted for a space typed in math mode. Empty makes the
    /// space leap out of the current branch.
    pub math_mode_space: String,
    pub navigation: NavigationOptions,
    pub undo_limit: usize,
    pub default_mode: ParseMode,
    /// Reject every mutating command
    pub read_only: bool,
    /// Panic on post-command invariant violations
    pub strict_invariants: bool,
}

impl Default for EditorOptions {
    fn default() -> Self {
        EditorOptions {
            smart_fence: true,
            smart_superscript: true,
            smart_mode: false,
            script_depth: ScriptDepth::default(),
            remove_extraneous_parentheses: true,
            math_mode_space: String::new(),
            navigation: NavigationOptions::default(),
            undo_limit: 256,
            default_mode: ParseMode::Math,
            read_only: false,
            strict_invariants: cfg!(debug_assertions),
        }
    }
}

/// Events for the host, collected with [`Mathfield::take_notifications`].
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    ContentChanged,
    SelectionChanged(Selection),
    ModeChanged(ParseMode),
    UndoStateChanged { can_undo: bool, can_redo: bool },
    /// Navigation hit the edge of the document
    MoveOut(Direction),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditOutcome {
    pub selection: Selection,
    /// Whether the tree changed
    pub changed: bool,
}

pub struct Mathfield {
    tree: AtomTree,
    selection: Selection,
    options: EditorOptions,
    context: ParseContext,
    history: UndoLog,
    mode: ParseMode,
    /// Style for the next typed atoms, set by a collapsed style command
    pending_style: Option<Style>,
    notifications: Vec<Notification>,
    formats: FormatRegistry,
}

impl Default for Mathfield {
    fn default() -> Self {
        Mathfield::new(EditorOptions::default(), ParseContext::default())
    }
}

impl Mathfield {
    pub fn new(options: EditorOptions, context: ParseContext) -> Self {
        Mathfield {
            tree: AtomTree::new(),
            selection: Selection::default(),
            history: UndoLog::new(options.undo_limit),
            mode: options.default_mode,
            options,
            context,
            pending_style: None,
            notifications: Vec::new(),
            formats: FormatRegistry::with_defaults(),
        }
    }

    /// A field holding `markup`, caret at the end, with empty history.
    pub fn with_value(
        markup: &str,
        options: EditorOptions,
        context: ParseContext,
    ) -> Result<Self, EditError> {
        let mut field = Mathfield::new(options, context);
        field.tree = parse(markup, &field.context)?;
        let map = OffsetMap::build(&field.tree);
        field.selection = Selection::caret(map.end_of_root(&field.tree));
        field.mode = field.compute_mode(&map);
        Ok(field)
    }

    // ===== Commands =====

    pub fn execute(&mut self, command: Command) -> Result<EditOutcome, EditError> {
        let label = command.name();
        debug!(command = label, "execute");
        match command {
            Command::Insert { markup, options } => {
                self.apply(label, |draft| insert::insert(draft, &markup, &options))
            }
            Command::TypedText(text) => self.apply(label, |draft| typing::type_text(draft, &text)),
            Command::Delete(direction) => {
                self.apply(label, |draft| delete::delete(draft, direction))
            }
            Command::ApplyStyle {
                style,
                range,
                operation,
            } => self.apply_style(style, range, operation),
            Command::PromoteOutOfScript => self.apply(label, script::promote),
            Command::AcceptSmartFence => self.apply(label, fence::accept),
            Command::RejectSmartFence => self.apply(label, fence::reject),
            Command::Move(direction) => self.move_caret(direction),
            Command::Extend(direction) => self.extend(direction),
            Command::SelectAll => {
                let map = OffsetMap::build(&self.tree);
                let end = map.end_of_root(&self.tree);
                Ok(self.moved(Selection::single(Range::new(0, end))))
            }
            Command::SetSelection(selection) => self.set_selection(selection),
            Command::MoveAfterParent => self.move_after_parent(),
            Command::SwitchMode(mode) => {
                self.set_mode(mode);
                Ok(self.outcome(false))
            }
            Command::SetValue(markup) => {
                self.apply(label, |draft| insert::set_value(draft, &markup))
            }
            Command::SetPromptContent { id, markup } => {
                self.apply(label, |draft| prompt::set_content(draft, &id, &markup))
            }
            Command::StripPromptContent(filter) => {
                self.strip_prompt_content(&filter).map(|(outcome, _)| outcome)
            }
            Command::Undo => Ok(self.undo()),
            Command::Redo => Ok(self.redo()),
        }
    }

    /// Run `edit` on a draft and commit the result.
    fn apply<F>(&mut self, label: &str, edit: F) -> Result<EditOutcome, EditError>
    where
        F: FnOnce(&mut Draft<'_>) -> Result<Target, EditError>,
    {
        if self.options.read_only {
            warn!(command = label, "edit rejected: read-only field");
            return Err(EditError::LockedRegion("the field is read-only".into()));
        }
        let map = OffsetMap::build(&self.tree);
        let mut draft = Draft {
            tree: self.tree.clone(),
            map: &map,
            selection: &self.selection,
            options: &self.options,
            ctx: &self.context,
            mode: self.mode,
            pending_style: self.pending_style.clone(),
        };
        let target = match edit(&mut draft) {
            Ok(target) => target,
            Err(err) => {
                warn!(command = label, error = %err, "edit rejected");
                return Err(err);
            }
        };
        let Draft {
            mut tree,
            mode,
            pending_style,
            ..
        } = draft;

        let mutations = tree.take_journal();
        if mutations.is_empty() {
            let selection = resolve(target, &self.tree, &map, &self.selection);
            let moved = selection != self.selection;
            self.pending_style = pending_style;
            let outcome = self.settle(selection, false);
            if !moved {
                self.set_mode(mode);
            }
            return Ok(outcome);
        }

        tree.collect_garbage();
        if let Err(message) = tree.validate() {
            error!(command = label, %message, "command broke a tree invariant");
            debug_assert!(
                !self.options.strict_invariants,
                "{label} broke a tree invariant: {message}"
            );
            return Err(EditError::InvariantViolation(message));
        }

        let new_map = OffsetMap::build(&tree);
        let selection = resolve(target, &tree, &new_map, &self.selection);
        let before = Snapshot {
            tree: std::mem::replace(&mut self.tree, tree),
            selection: self.selection.clone(),
        };
        let after = Snapshot {
            tree: self.tree.clone(),
            selection: selection.clone(),
        };
        debug!(
            command = label,
            mutations = mutations.len(),
            atoms = self.tree.len(),
            "committed"
        );
        self.history.push(Transaction {
            command: label.to_string(),
            mutations,
            before,
            after,
        });
        self.pending_style = pending_style;
        self.notifications.push(Notification::ContentChanged);
        let outcome = self.settle(selection, true);
        self.notify_undo_state();
        Ok(outcome)
    }

    /// Install `selection` and recompute the typing mode when something
    /// moved.
    fn settle(&mut self, selection: Selection, changed: bool) -> EditOutcome {
        let moved = selection != self.selection;
        if moved {
            self.selection = selection;
            self.notifications
                .push(Notification::SelectionChanged(self.selection.clone()));
        }
        if moved || changed {
            let map = OffsetMap::build(&self.tree);
            let mode = self.compute_mode(&map);
            self.set_mode(mode);
        }
        self.outcome(changed)
    }

    /// Selection change from navigation: the pending style does not survive.
    fn moved(&mut self, selection: Selection) -> EditOutcome {
        self.pending_style = None;
        self.settle(selection, false)
    }

    fn outcome(&self, changed: bool) -> EditOutcome {
        EditOutcome {
            selection: self.selection.clone(),
            changed,
        }
    }

    fn set_mode(&mut self, mode: ParseMode) {
        if self.mode != mode {
            self.mode = mode;
            self.notifications.push(Notification::ModeChanged(mode));
        }
    }

    fn notify_undo_state(&mut self) {
        self.notifications.push(Notification::UndoStateChanged {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        });
    }

    fn compute_mode(&self, map: &OffsetMap) -> ParseMode {
        match map.position_of(self.selection.primary().focus) {
            Ok(position) => mode_at(&self.tree, &position, self.options.default_mode),
            Err(_) => self.options.default_mode,
        }
    }

    // ===== Navigation =====

    fn move_caret(&mut self, direction: Direction) -> Result<EditOutcome, EditError> {
        if !self.selection.is_collapsed()
            && matches!(direction, Direction::Forward | Direction::Backward)
        {
            let ranges = self.selection.ranges();
            let offset = match direction {
                Direction::Forward => ranges.iter().map(Range::end).max(),
                _ => ranges.iter().map(Range::start).min(),
            }
            .unwrap_or_default();
            return Ok(self.moved(Selection::caret(offset)));
        }
        let map = OffsetMap::build(&self.tree);
        let focus = self.selection.primary().focus;
        // leaving a prompt the host put the caret into
        let snapped = snap_offset(&self.tree, &map, focus);
        if direction == Direction::Forward && snapped != focus {
            return Ok(self.moved(Selection::caret(snapped)));
        }
        match next_offset(&self.tree, &map, focus, direction, &self.options.navigation)? {
            Adjacent::Offset(offset) => Ok(self.moved(Selection::caret(offset))),
            Adjacent::MoveOut(direction) => {
                self.notifications.push(Notification::MoveOut(direction));
                Ok(self.moved(Selection::caret(focus)))
            }
        }
    }

    fn extend(&mut self, direction: Direction) -> Result<EditOutcome, EditError> {
        let map = OffsetMap::build(&self.tree);
        let primary = self.selection.primary();
        let focus = match next_offset(
            &self.tree,
            &map,
            primary.focus,
            direction,
            &self.options.navigation,
        )? {
            Adjacent::Offset(offset) => offset,
            Adjacent::MoveOut(direction) => {
                self.notifications.push(Notification::MoveOut(direction));
                return Ok(self.outcome(false));
            }
        };
        let mut ranges = self.selection.ranges().to_vec();
        let last = ranges.len() - 1;
        ranges[last] = Range::new(primary.anchor, focus);
        let selection = Selection::from_ranges(ranges)?;
        Ok(self.moved(selection))
    }

    /// Hosts may address offsets inside a locked prompt; only macro
    /// expansions push the selection out.
    fn set_selection(&mut self, selection: Selection) -> Result<EditOutcome, EditError> {
        let map = OffsetMap::build(&self.tree);
        selection.validate(&map)?;
        let ranges = selection
            .ranges()
            .iter()
            .map(|r| {
                Range::new(
                    snap_out_of_macros(&self.tree, &map, r.anchor),
                    snap_out_of_macros(&self.tree, &map, r.focus),
                )
            })
            .collect();
        let selection = Selection::from_ranges(ranges)?;
        Ok(self.moved(selection))
    }

    fn move_after_parent(&mut self) -> Result<EditOutcome, EditError> {
        let map = OffsetMap::build(&self.tree);
        let position = map.position_of(self.selection.primary().focus)?;
        if position.parent == self.tree.root() {
            return Ok(self.outcome(false));
        }
        match map.offset_after(&self.tree, position.parent) {
            Some(offset) => Ok(self.moved(Selection::caret(offset))),
            None => Ok(self.outcome(false)),
        }
    }

    // ===== Style =====

    fn apply_style(
        &mut self,
        style: Style,
        range: Option<Range>,
        operation: StyleOperation,
    ) -> Result<EditOutcome, EditError> {
        let collapsed = match range {
            Some(range) => range.is_collapsed(),
            None => self.selection.is_collapsed(),
        };
        if collapsed {
            let current = self.pending_style.take().unwrap_or_default();
            let next = match operation {
                StyleOperation::Toggle if current.contains(&style) => current.without(&style),
                _ => {
                    let mut next = current;
                    next.overlay(&style);
                    next
                }
            };
            self.pending_style = (!next.is_empty()).then_some(next);
            return Ok(self.outcome(false));
        }
        let ranges = match range {
            Some(range) => vec![range],
            None => self.selection.ranges().to_vec(),
        };
        self.apply("apply-style", |draft| {
            style::apply(draft, &ranges, &style, operation)
        })
    }

    /// Style the next typed atoms will carry.
    pub fn pending_style(&self) -> Option<&Style> {
        self.pending_style.as_ref()
    }

    // ===== History =====

    fn undo(&mut self) -> EditOutcome {
        let snapshot = match self.history.undo() {
            Some(transaction) => transaction.before.clone(),
            None => return self.outcome(false),
        };
        debug!("undo");
        self.restore(snapshot)
    }

    fn redo(&mut self) -> EditOutcome {
        let snapshot = match self.history.redo() {
            Some(transaction) => transaction.after.clone(),
            None => return self.outcome(false),
        };
        debug!("redo");
        self.restore(snapshot)
    }

    fn restore(&mut self, snapshot: Snapshot) -> EditOutcome {
        let Snapshot { mut tree, selection } = snapshot;
        carry_prompt_states(&self.tree, &mut tree);
        self.tree = tree;
        self.pending_style = None;
        self.notifications.push(Notification::ContentChanged);
        let map = OffsetMap::build(&self.tree);
        let selection = match selection.validate(&map) {
            Ok(()) => selection,
            Err(_) => Selection::caret(map.end_of_root(&self.tree)),
        };
        let outcome = self.settle(selection, true);
        self.notify_undo_state();
        outcome
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Forget the history; the document stays as it is.
    pub fn reset_undo(&mut self) {
        self.history.reset();
        self.notify_undo_state();
    }

    pub fn history(&self) -> &UndoLog {
        &self.history
    }

    // ===== Prompts =====

    /// Update prompt metadata out of band: no transaction, no undo entry.
    pub fn set_prompt_state(
        &mut self,
        id: &str,
        correctness: Option<Correctness>,
        locked: Option<bool>,
    ) -> Result<(), EditError> {
        let atom = self
            .tree
            .find_prompt(id)
            .ok_or_else(|| EditError::UnknownPrompt(id.to_string()))?;
        self.tree.set_prompt_state(atom, correctness, locked)?;
        // out of band: the next transaction must not pick this up
        self.tree.take_journal();
        debug!(prompt = id, ?correctness, ?locked, "prompt state updated");
        self.notifications.push(Notification::ContentChanged);
        // a freshly locked prompt may now capture the caret
        let map = OffsetMap::build(&self.tree);
        let ranges = self
            .selection
            .ranges()
            .iter()
            .map(|r| {
                Range::new(
                    snap_offset(&self.tree, &map, r.anchor),
                    snap_offset(&self.tree, &map, r.focus),
                )
            })
            .collect();
        let selection = Selection::from_ranges(ranges)?;
        self.settle(selection, false);
        Ok(())
    }

    pub fn get_prompt_state(&self, id: &str) -> Result<Prompt, EditError> {
        self.tree
            .find_prompt(id)
            .and_then(|atom| match self.tree.get(atom).map(|a| &a.kind) {
                Some(AtomKind::Prompt(prompt)) => Some(prompt.clone()),
                _ => None,
            })
            .ok_or_else(|| EditError::UnknownPrompt(id.to_string()))
    }

    /// Ids of the prompts matching `filter`, in document order.
    pub fn get_prompts(&self, filter: &PromptFilter) -> Vec<String> {
        prompt::matching(&self.tree, filter)
            .into_iter()
            .map(|(_, prompt)| prompt.id)
            .collect()
    }

    /// Content of a prompt in `format`.
    pub fn get_prompt_value(&self, id: &str, format: &str) -> Result<String, EditError> {
        let atom = self
            .tree
            .find_prompt(id)
            .ok_or_else(|| EditError::UnknownPrompt(id.to_string()))?;
        let body = self.tree.branch(atom, BranchName::Body);
        Ok(self.formats.serialize_subtree(&self.tree, body, format)?)
    }

    /// Empty the prompts matching `filter`; returns their former content
    /// as markup, by id.
    pub fn strip_prompt_content(
        &mut self,
        filter: &PromptFilter,
    ) -> Result<(EditOutcome, BTreeMap<String, String>), EditError> {
        let mut stripped = BTreeMap::new();
        let outcome = self.apply("strip-prompt-content", |draft| {
            prompt::strip(draft, filter, &mut stripped)
        })?;
        Ok((outcome, stripped))
    }

    // ===== Queries =====

    /// The document as markup.
    pub fn value(&self) -> String {
        to_latex(&self.tree)
    }

    pub fn get_value(&self, format: &str) -> Result<String, EditError> {
        Ok(self.formats.serialize(&self.tree, format)?)
    }

    pub fn get_value_of(&self, range: Range, format: &str) -> Result<String, EditError> {
        let map = OffsetMap::build(&self.tree);
        let atoms = atoms_in_range(&self.tree, &map, range)?;
        Ok(self.formats.serialize_subtree(&self.tree, &atoms, format)?)
    }

    /// Focus offset of the primary range.
    pub fn position(&self) -> usize {
        self.selection.primary().focus
    }

    pub fn last_offset(&self) -> usize {
        OffsetMap::build(&self.tree).last_offset()
    }

    pub fn offset_depth(&self, offset: usize) -> Result<usize, EditError> {
        OffsetMap::build(&self.tree).offset_depth(&self.tree, offset)
    }

    pub fn selection_is_collapsed(&self) -> bool {
        self.selection.is_collapsed()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn mode(&self) -> ParseMode {
        self.mode
    }

    pub fn tree(&self) -> &AtomTree {
        &self.tree
    }

    pub fn offsets(&self) -> OffsetMap {
        OffsetMap::build(&self.tree)
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: EditorOptions) {
        self.history.set_limit(options.undo_limit);
        self.options = options;
    }

    pub fn context(&self) -> &ParseContext {
        &self.context
    }

    pub fn set_context(&mut self, context: ParseContext) {
        self.context = context;
    }

    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    pub fn formats_mut(&mut self) -> &mut FormatRegistry {
        &mut self.formats
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }
}

/// Typing mode at a caret: that of the neighbouring atoms, else of the
/// enclosing atom.
pub fn mode_at(tree: &AtomTree, position: &Position, default: ParseMode) -> ParseMode {
    let mode_of = |id| {
        tree.get(id).map(|a| match a.kind {
            AtomKind::Text => ParseMode::Text,
            _ => a.mode,
        })
    };
    position
        .atom_before(tree)
        .and_then(mode_of)
        .or_else(|| position.atom_after(tree).and_then(mode_of))
        .or_else(|| {
            (position.parent != tree.root())
                .then(|| mode_of(position.parent))
                .flatten()
        })
        .unwrap_or(default)
}

#[cfg(test)]
mod tests;
