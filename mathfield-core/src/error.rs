//! Error types for parsing, editing and format operations

use thiserror::Error;

/// Errors produced while turning markup into an atom tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Malformed markup. `position` is a byte offset into the source.
    #[error("Syntax error at {position}: {message} (near '{fragment}')")]
    Syntax {
        message: String,
        fragment: String,
        position: usize,
    },
    /// A command that is neither built in nor in the macro dictionary
    #[error("Unknown macro '\\{name}' at {position}")]
    UnknownMacro { name: String, position: usize },
    /// Text/math regions that do not nest
    #[error("Unbalanced mode at {position}: {message}")]
    UnbalancedMode { message: String, position: usize },
    /// `\left` without `\right` or the reverse
    #[error("Unbalanced fence at {position}: {message}")]
    UnbalancedFence { message: String, position: usize },
}

impl ParseError {
    /// Byte offset in the source where the error was detected.
    pub fn position(&self) -> usize {
        match self {
            ParseError::Syntax { position, .. }
            | ParseError::UnknownMacro { position, .. }
            | ParseError::UnbalancedMode { position, .. }
            | ParseError::UnbalancedFence { position, .. } => *position,
        }
    }
}

/// Errors produced by edit engine commands. A command that fails leaves the
/// tree and the selection exactly as they were.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("Invalid offset {offset} (last offset is {last})")]
    InvalidOffset { offset: usize, last: usize },
    #[error("Invalid range: {0}")]
    InvalidRange(String),
    #[error("Locked region: {0}")]
    LockedRegion(String),
    #[error("Unknown prompt '{0}'")]
    UnknownPrompt(String),
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Errors that can occur during format operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Format not found in registry
    #[error("Format '{0}' not found")]
    FormatNotFound(String),
    /// Error during parsing
    #[error("Parse error: {0}")]
    ParseError(String),
    /// Error during serialization
    #[error("Serialization error: {0}")]
    SerializationError(String),
    /// Format does not support the operation
    #[error("Operation not supported: {0}")]
    NotSupported(String),
}

impl From<ParseError> for FormatError {
    fn from(err: ParseError) -> Self {
        FormatError::ParseError(err.to_string())
    }
}
