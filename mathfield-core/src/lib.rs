//! Document model and edit engine for math fields
//!
//!     This crate holds everything a math field needs that is not drawing: the atom tree that
//!     represents a formula, a parser and serializers for LaTeX-like markup, the offset model the
//!     caret and selection live in, and the edit engine that turns keystrokes and host commands
//!     into tree mutations with undo.
//!
//!     This is a pure lib. It never prints, reads the environment or touches files; the
//!     mathfield-cli crate is the shell around it.
//!
//!     The file structure :
//!     .
//!     ├── atom                    # Atom kinds, styles and the arena tree
//!     ├── parser                  # Markup → atom tree (tokenizer, commands, macros, smart mode)
//!     ├── selection               # Offsets, ranges and navigation
//!     ├── editor                  # Commands, transactions and the Mathfield engine
//!     ├── history.rs              # Undo log
//!     ├── error.rs
//!     ├── format.rs               # Format trait definition
//!     ├── registry.rs             # FormatRegistry for discovery and selection
//!     └── formats
//!         └── <format>            # latex, plain-text, spoken, tag, json, treeviz
//!
//! The Atom Tree
//!
//!     Atoms live in an arena owned by [`AtomTree`] and refer to each other by [`AtomId`]. Each
//!     atom has named branches (body, numerator, superscript, cells...) holding ordered child
//!     lists. Every mutation goes through the tree's methods, which keep parent links in sync and
//!     journal what they did.
//!
//! Offsets
//!
//!     A caret position is a plain integer: the index of a (branch, index) slot in a pre-order walk
//!     of the tree. Offsets are recomputed after every change, so hosts never hold on to atom ids.
//!
//! Editing
//!
//!     [`Mathfield`] applies one [`Command`] at a time. Mutating commands work on a copy of the
//!     tree; the copy is validated and swapped in only if the command succeeded, so a failed
//!     command is invisible. Each committed command is one undo step.
//!
pub mod atom;
pub mod editor;
pub mod error;
pub mod format;
pub mod formats;
pub mod history;
pub mod parser;
pub mod registry;
pub mod selection;

pub use atom::{Atom, AtomId, AtomKind, AtomTree, BranchName, ParseMode, Style};
pub use editor::{Command, EditOutcome, EditorOptions, Mathfield, Notification};
pub use error::{EditError, FormatError, ParseError};
pub use format::Format;
pub use parser::{parse, ParseContext};
pub use registry::FormatRegistry;
pub use selection::{Direction, Position, Range, Selection};
