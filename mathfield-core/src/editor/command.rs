//! Command vocabulary of the edit engine.

use serde::{Deserialize, Serialize};

use crate::atom::{Correctness, ParseMode, Prompt, Style};
use crate::selection::{Direction, Selection};

/// Which part of the document an insertion replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsertionMode {
    #[default]
    ReplaceSelection,
    ReplaceAll,
    InsertBefore,
    InsertAfter,
}

/// Where the selection lands after an insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionMode {
    /// Select the first placeholder of the inserted content, else `After`
    #[default]
    Placeholder,
    After,
    Before,
    /// Select the inserted content
    Item,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsertOptions {
    pub insertion_mode: InsertionMode,
    pub selection_mode: SelectionMode,
    /// Mode the markup is parsed in; defaults to the current typing mode
    pub mode: Option<ParseMode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StyleOperation {
    #[default]
    Set,
    /// Remove the style when the whole range already has it, else set it
    Toggle,
}

/// Prompt selection used by `get_prompts` and `strip_prompt_content`.
/// Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptFilter {
    pub id: Option<String>,
    pub locked: Option<bool>,
    pub correctness: Option<Correctness>,
}

impl PromptFilter {
    pub fn matches(&self, prompt: &Prompt) -> bool {
        self.id.as_ref().is_none_or(|id| *id == prompt.id)
            && self.locked.is_none_or(|locked| locked == prompt.locked)
            && self
                .correctness
                .is_none_or(|correctness| correctness == prompt.correctness)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Insert {
        markup: String,
        options: InsertOptions,
    },
    /// Keystrokes, with smart fence, smart superscript and smart mode
    TypedText(String),
    Delete(Direction),
    ApplyStyle {
        style: Style,
        range: Option<crate::selection::Range>,
        operation: StyleOperation,
    },
    PromoteOutOfScript,
    AcceptSmartFence,
    RejectSmartFence,
    Move(Direction),
    Extend(Direction),
    SelectAll,
    SetSelection(Selection),
    MoveAfterParent,
    SwitchMode(ParseMode),
    SetValue(String),
    SetPromptContent {
        id: String,
        markup: String,
    },
    StripPromptContent(PromptFilter),
    Undo,
    Redo,
}

impl Command {
    pub fn insert(markup: impl Into<String>) -> Self {
        Command::Insert {
            markup: markup.into(),
            options: InsertOptions::default(),
        }
    }

    pub fn typed(text: impl Into<String>) -> Self {
        Command::TypedText(text.into())
    }

    /// Label used in the undo history and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Insert { .. } => "insert",
            Command::TypedText(_) => "typed-text",
            Command::Delete(_) => "delete",
            Command::ApplyStyle { .. } => "apply-style",
            Command::PromoteOutOfScript => "promote-out-of-script",
            Command::AcceptSmartFence => "accept-smart-fence",
            Command::RejectSmartFence => "reject-smart-fence",
            Command::Move(_) => "move",
            Command::Extend(_) => "extend",
            Command::SelectAll => "select-all",
            Command::SetSelection(_) => "set-selection",
            Command::MoveAfterParent => "move-after-parent",
            Command::SwitchMode(_) => "switch-mode",
            Command::SetValue(_) => "set-value",
            Command::SetPromptContent { .. } => "set-prompt-content",
            Command::StripPromptContent(_) => "strip-prompt-content",
            Command::Undo => "undo",
            Command::Redo => "redo",
        }
    }
}
