//! Strongly-typed wrappers for game identifiers
//!
//! Player, paper and game identifiers are all strings on the wire. Wrapping
//! them in distinct types keeps a paper id from being passed where a player
//! id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Player identifier (seat name supplied by the game config)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(s: impl Into<String>) -> Self {
        PlayerId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PlayerId {
    fn from(s: String) -> Self {
        PlayerId(s)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        PlayerId(s.to_string())
    }
}

/// Research paper identifier
///
/// Papers in the standard deck are numbered `paper_0` through `paper_16`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaperId(String);

impl PaperId {
    pub fn new(s: impl Into<String>) -> Self {
        PaperId(s.into())
    }

    /// Id of the `index`-th paper of a freshly built deck
    pub fn numbered(index: usize) -> Self {
        PaperId(format!("paper_{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PaperId {
    fn from(s: String) -> Self {
        PaperId(s)
    }
}

impl From<&str> for PaperId {
    fn from(s: &str) -> Self {
        PaperId(s.to_string())
    }
}

/// Game identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    pub fn new(s: impl Into<String>) -> Self {
        GameId(s.into())
    }

    /// Build an id from 64 random bits, rendered as fixed-width hex
    pub fn from_bits(bits: u64) -> Self {
        GameId(format!("game-{bits:016x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for GameId {
    fn from(s: String) -> Self {
        GameId(s)
    }
}

impl From<&str> for GameId {
    fn from(s: &str) -> Self {
        GameId(s.to_string())
    }
}
