//! Error types for prefix-tree construction, configuration and cell decoding.

use thiserror::Error;

/// Prefix-tree errors.
///
/// All of these are local usage or configuration faults. None is retried and
/// none is safe to log and continue past: a cell built from a bad token would
/// corrupt every later spatial comparison.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PrefixTreeError {
    /// Invalid grid or factory configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A level or detail level outside what the grid supports.
    #[error("Level {level} is outside the supported range [{min}, {max}]")]
    LevelOutOfRange { level: usize, min: usize, max: usize },

    /// A token that does not decode on this grid.
    #[error("Invalid token {token:?}: {reason}")]
    InvalidToken { token: String, reason: String },

    /// Mutation attempted on the shared level-0 cell.
    #[error("Operation not supported on the world cell: {0}")]
    WorldCell(&'static str),

    /// Token bytes requested from a range that does not span its whole buffer.
    #[error(
        "Token bytes {offset}..{end} cannot be returned verbatim from a {buffer_len}-byte buffer"
    )]
    TokenRange {
        offset: usize,
        end: usize,
        buffer_len: usize,
    },

    /// A point outside the grid's world bounds.
    #[error("Point ({x}, {y}) is outside the world bounds")]
    PointOutOfBounds { x: f64, y: f64 },

    /// A `prefixTree` name with no registered factory.
    #[error("Unknown prefix tree implementation: {0}")]
    UnknownPrefixTree(String),

    /// A shape the grid cannot decompose.
    #[error("Invalid shape: {0}")]
    InvalidShape(String),
}

impl PrefixTreeError {
    pub(crate) fn invalid_token(token: impl Into<String>, reason: impl Into<String>) -> Self {
        PrefixTreeError::InvalidToken {
            token: token.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn level_out_of_range(level: usize, max: usize) -> Self {
        PrefixTreeError::LevelOutOfRange { level, min: 1, max }
    }
}

/// Result type for prefix-tree operations.
pub type Result<T> = std::result::Result<T, PrefixTreeError>;
