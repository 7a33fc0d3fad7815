//! Format implementations
//!
//! This module contains all format implementations that convert between
//! the atom tree and various text representations.

pub mod icons;
pub mod json;
pub mod latex;
pub mod plain_text;
pub mod spoken;
pub mod tag;
pub mod treeviz;

pub use json::JsonFormat;
pub use latex::{LatexExpandedFormat, LatexFormat};
pub use plain_text::PlainTextFormat;
pub use spoken::SpokenTextFormat;
pub use tag::TagFormat;
pub use treeviz::TreevizFormat;
