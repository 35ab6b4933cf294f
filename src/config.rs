//! Engine settings
//!
//! Settings a host process needs beyond a single game's [`GameConfig`]:
//! the simulation turn cap, snapshot policy and where a file store lives.
//! They load from a JSON file with every field optional; the CLI then
//! overrides individual fields from flags and `SECRET_AGI_*` variables.
//!
//! [`GameConfig`]: crate::game::GameConfig

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default cap on action attempts for simulations and the game loop
pub const DEFAULT_MAX_TURNS: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub max_turns: u32,
    /// Save a snapshot after every successful action
    pub snapshot_every_action: bool,
    /// Root directory for the file store; in-memory storage when unset
    pub data_dir: Option<PathBuf>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            max_turns: DEFAULT_MAX_TURNS,
            snapshot_every_action: true,
            data_dir: None,
        }
    }
}

impl EngineSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
