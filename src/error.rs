//! Error types for the qtoe crate

use thiserror::Error;

/// Main error type for the qtoe crate
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid grid size {size} (boards must be square with at least 2 cells per side)")]
    InvalidGridSize { size: usize },

    #[error("row {row} has {got} cells, expected {expected} for a square board")]
    RaggedBoard {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("invalid streak length {streak} for a {grid}x{grid} grid")]
    InvalidStreak { streak: usize, grid: usize },

    #[error("invalid character '{character}' at row {row} in '{context}'")]
    InvalidCellCharacter {
        character: char,
        row: usize,
        context: String,
    },

    #[error("no candidate actions were supplied")]
    EmptyOptions,

    #[error("malformed action key '{action}' (expected 'x|y')")]
    InvalidAction { action: String },

    #[error("action ({x}, {y}) is outside a {size}x{size} board")]
    ActionOutOfBounds { x: usize, y: usize, size: usize },

    #[error("unknown outcome label '{label}' (expected alive, win, lose or cat)")]
    UnknownOutcome { label: String },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("agent has not been started on a game")]
    NotStarted,

    #[error("game already over")]
    GameOver,

    #[error("square {action} is already taken")]
    SquareTaken { action: String },

    #[error("square {action} is not a legal option")]
    NotAnOption { action: String },

    #[error("player '{player}' is not the current player")]
    NotCurrentPlayer { player: String },

    #[error("player '{player}' is human and cannot move unattended")]
    AwaitingHuman { player: String },

    #[error("failed to {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to {operation}: {message}")]
    SerializationContext { operation: String, message: String },

    #[error("sync with shared store failed: {message}")]
    Network { message: String },

    #[error("progress bar template error: {message}")]
    ProgressBarTemplate { message: String },
}

/// The recovery class an [`Error`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Fatal at setup: bad grid, empty options, unknown reward labels.
    Configuration,
    /// Durable read/write failure; callers fall back to an empty table.
    Storage,
    /// Flush/fetch failure; retried on the next timer tick.
    Network,
    /// Ordering or timing fault in the game glue; logged and ignored.
    State,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidGridSize { .. }
            | Error::RaggedBoard { .. }
            | Error::InvalidStreak { .. }
            | Error::InvalidCellCharacter { .. }
            | Error::EmptyOptions
            | Error::InvalidAction { .. }
            | Error::ActionOutOfBounds { .. }
            | Error::UnknownOutcome { .. }
            | Error::InvalidConfiguration { .. }
            | Error::ProgressBarTemplate { .. } => ErrorKind::Configuration,
            Error::Io { .. } | Error::Serialization(_) | Error::SerializationContext { .. } => {
                ErrorKind::Storage
            }
            Error::Network { .. } => ErrorKind::Network,
            Error::NotStarted
            | Error::GameOver
            | Error::SquareTaken { .. }
            | Error::NotAnOption { .. }
            | Error::NotCurrentPlayer { .. }
            | Error::AwaitingHuman { .. } => ErrorKind::State,
        }
    }
}

/// Convenience type alias for Results using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io {
            operation: "IO operation".to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_options_is_configuration_error() {
        assert_eq!(Error::EmptyOptions.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_io_is_storage_error() {
        let err: Error = std::io::Error::other("disk gone").into();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_ordering_faults_are_state_errors() {
        assert_eq!(Error::NotStarted.kind(), ErrorKind::State);
        assert_eq!(Error::GameOver.kind(), ErrorKind::State);
    }
}
