use thiserror::Error;

/// Errors surfaced to callers for conditions that are not ordinary game flow.
///
/// Illegal moves, empty move lists and unmatched channel messages are not
/// errors; those come back as `bool` / `Option` from the operations themselves.
#[derive(Debug, Error)]
pub enum LobbyError {
    #[error("invalid position encoding `{fen}`: {reason}")]
    InvalidFen { fen: String, reason: String },

    #[error("invalid square `{0}`")]
    InvalidSquare(String),

    #[error("malformed message: {0}")]
    MalformedMessage(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type LobbyResult<T> = Result<T, LobbyError>;
