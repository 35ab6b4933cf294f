//! Error types for the Secret AGI engine

use crate::core::PlayerId;
use crate::storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Player {0} not found")]
    PlayerNotFound(PlayerId),

    /// An action that is illegal for the current state or actor.
    ///
    /// The message is the user-visible reason returned in `GameUpdate::error`.
    #[error("{0}")]
    InvalidAction(String),

    /// A fault while applying an already-validated action.
    #[error("Error processing action: {0}")]
    InvalidState(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GameError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        GameError::InvalidAction(message.into())
    }

    pub(crate) fn fault(message: impl Into<String>) -> Self {
        GameError::InvalidState(message.into())
    }
}

pub type Result<T> = std::result::Result<T, GameError>;
