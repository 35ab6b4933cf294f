//! Game snapshots for persistence and resume
//!
//! A snapshot pairs a full [`GameState`] with the turn it was taken at and,
//! optionally, the engine's RNG so a resumed game continues the same random
//! sequence it would have produced uninterrupted.

use crate::core::GameId;
use crate::game::state::GameState;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// The complete (unfiltered) game state
    pub game_state: GameState,

    /// Turn number when this snapshot was created
    pub turn_number: u32,

    /// Engine RNG at snapshot time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rng: Option<ChaCha12Rng>,
}

impl GameSnapshot {
    pub fn new(game_state: GameState, turn_number: u32) -> Self {
        GameSnapshot {
            game_state,
            turn_number,
            rng: None,
        }
    }

    pub fn with_rng(game_state: GameState, turn_number: u32, rng: ChaCha12Rng) -> Self {
        GameSnapshot {
            game_state,
            turn_number,
            rng: Some(rng),
        }
    }

    pub fn game_id(&self) -> &GameId {
        &self.game_state.game_id
    }

    /// Save this snapshot to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SnapshotError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SnapshotError::Serialization(e.to_string()))?;

        std::fs::write(path.as_ref(), json).map_err(|e| SnapshotError::Io(e.to_string()))?;

        Ok(())
    }

    /// Load a snapshot from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, SnapshotError> {
        let json =
            std::fs::read_to_string(path.as_ref()).map_err(|e| SnapshotError::Io(e.to_string()))?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(self).map_err(|e| SnapshotError::Serialization(e.to_string()))
    }

    /// Decode and sanity-check a snapshot
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: GameSnapshot =
            serde_json::from_str(json).map_err(|e| SnapshotError::Deserialization(e.to_string()))?;
        snapshot
            .game_state
            .check_invariants()
            .map_err(|e| SnapshotError::InvalidState(e.to_string()))?;
        Ok(snapshot)
    }
}

/// Errors that can occur during snapshot operations
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Failed to serialize snapshot: {0}")]
    Serialization(String),

    #[error("Failed to deserialize snapshot: {0}")]
    Deserialization(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Invalid snapshot state: {0}")]
    InvalidState(String),
}
