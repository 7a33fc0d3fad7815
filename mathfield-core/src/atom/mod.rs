//! Document model: atoms, their kinds and styles, and the arena tree that
//! owns them.

pub mod journal;
pub mod kind;
pub mod style;
pub mod tree;

pub use journal::Mutation;
pub use kind::{
    matching_close, ArrayInfo, AtomKind, BranchName, Correctness, Fence, FractionKind, MacroRef,
    OperatorKind, Prompt,
};
pub use style::{FontFamily, ParseMode, Style, Variant};
pub use tree::{Atom, AtomId, AtomTree};
