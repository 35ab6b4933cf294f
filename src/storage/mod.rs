//! Persistence contract for games
//!
//! The engine core never does I/O itself. A [`GameStore`] records every
//! action attempt, every event and a snapshot after each successful action,
//! and answers the queries crash recovery needs. Two implementations ship
//! with the crate: [`MemoryStore`] for tests and embedding, and
//! [`FileStore`] which keeps one directory of JSON documents per game.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::core::{GameId, PlayerId};
use crate::game::snapshot::GameSnapshot;
use crate::game::{Action, ActionType, GameEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Lifecycle status of a stored game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    #[default]
    Active,
    Completed,
    Failed,
    Paused,
}

/// Identifies one saved snapshot
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotId {
    pub game_id: GameId,
    pub turn_number: u32,
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.game_id, self.turn_number)
    }
}

/// Identifies one recorded action attempt
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId {
    pub game_id: GameId,
    pub index: usize,
}

/// One action attempt
///
/// `is_valid` stays `None` until the attempt completes; a record left in that
/// state means the process stopped mid-action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub turn_number: u32,
    pub player_id: PlayerId,
    pub action_type: ActionType,
    pub data: Value,
    pub is_valid: Option<bool>,
    pub error: Option<String>,
    pub duration_ms: Option<u64>,
}

impl ActionRecord {
    pub fn is_incomplete(&self) -> bool {
        self.is_valid.is_none()
    }
}

/// Everything stored about a game apart from its snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: GameId,
    pub status: GameStatus,
    pub current_turn: u32,
    pub player_ids: Vec<PlayerId>,
    pub actions: Vec<ActionRecord>,
    pub events: Vec<GameEvent>,
}

impl GameRecord {
    pub fn new(game_id: GameId, player_ids: Vec<PlayerId>) -> Self {
        GameRecord {
            game_id,
            status: GameStatus::Active,
            current_turn: 0,
            player_ids,
            actions: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn incomplete_actions(&self) -> impl Iterator<Item = &ActionRecord> {
        self.actions.iter().filter(|a| a.is_incomplete())
    }

    fn has_valid_action_at(&self, turn: u32) -> bool {
        self.actions
            .iter()
            .any(|a| a.turn_number == turn && a.is_valid == Some(true))
    }

    /// Highest of `snapshot_turns` that is backed by a valid action
    ///
    /// Turn 0 is the initial deal and needs no action behind it.
    pub fn last_consistent_turn(&self, snapshot_turns: impl IntoIterator<Item = u32>) -> Option<u32> {
        snapshot_turns
            .into_iter()
            .filter(|&t| t == 0 || self.has_valid_action_at(t))
            .max()
    }

    pub(crate) fn push_action(&mut self, turn_number: u32, player_id: &PlayerId, action: &Action) -> ActionId {
        self.actions.push(ActionRecord {
            turn_number,
            player_id: player_id.clone(),
            action_type: action.action_type(),
            data: action.to_json(),
            is_valid: None,
            error: None,
            duration_ms: None,
        });
        self.current_turn = self.current_turn.max(turn_number);
        ActionId {
            game_id: self.game_id.clone(),
            index: self.actions.len() - 1,
        }
    }

    pub(crate) fn complete(
        &mut self,
        index: usize,
        is_valid: bool,
        error: Option<String>,
        duration_ms: Option<u64>,
    ) -> StorageResult<()> {
        let record = self
            .actions
            .get_mut(index)
            .ok_or_else(|| StorageError::NotFound(format!("action {index} of {}", self.game_id)))?;
        record.is_valid = Some(is_valid);
        record.error = error;
        record.duration_ms = duration_ms;
        Ok(())
    }

    pub(crate) fn mark_incomplete_failed(&mut self, message: &str) -> usize {
        let mut marked = 0;
        for action in self.actions.iter_mut().filter(|a| a.is_incomplete()) {
            action.is_valid = Some(false);
            action.error = Some(message.to_string());
            marked += 1;
        }
        marked
    }
}

/// Latest snapshot at or before `turn` (or the latest overall)
pub(crate) fn pick_snapshot_turn(
    turns: impl IntoIterator<Item = u32>,
    turn: Option<u32>,
) -> Option<u32> {
    turns
        .into_iter()
        .filter(|&t| turn.map_or(true, |limit| t <= limit))
        .max()
}

/// Async persistence contract
///
/// Implementations must be safe to share between tasks. A failing call must
/// leave previously stored data readable.
pub trait GameStore: Send + Sync {
    /// Register a new game
    fn create_game(
        &self,
        game_id: &GameId,
        player_ids: &[PlayerId],
    ) -> impl Future<Output = StorageResult<()>> + Send;

    fn game_record(&self, game_id: &GameId) -> impl Future<Output = StorageResult<GameRecord>> + Send;

    fn list_games(&self) -> impl Future<Output = StorageResult<Vec<GameId>>> + Send;

    fn update_status(
        &self,
        game_id: &GameId,
        status: GameStatus,
        current_turn: Option<u32>,
    ) -> impl Future<Output = StorageResult<()>> + Send;

    fn save_snapshot(
        &self,
        snapshot: &GameSnapshot,
    ) -> impl Future<Output = StorageResult<SnapshotId>> + Send;

    /// Snapshot at `turn` or the closest earlier one; the latest if `turn` is `None`
    fn load_snapshot(
        &self,
        game_id: &GameId,
        turn: Option<u32>,
    ) -> impl Future<Output = StorageResult<Option<GameSnapshot>>> + Send;

    /// Turns that have a snapshot, ascending
    fn snapshot_turns(&self, game_id: &GameId) -> impl Future<Output = StorageResult<Vec<u32>>> + Send;

    fn record_action(
        &self,
        game_id: &GameId,
        turn_number: u32,
        player_id: &PlayerId,
        action: &Action,
    ) -> impl Future<Output = StorageResult<ActionId>> + Send;

    fn complete_action(
        &self,
        action_id: &ActionId,
        is_valid: bool,
        error: Option<String>,
        duration_ms: Option<u64>,
    ) -> impl Future<Output = StorageResult<()>> + Send;

    fn record_event(
        &self,
        game_id: &GameId,
        event: &GameEvent,
    ) -> impl Future<Output = StorageResult<()>> + Send;

    /// Active games with at least one incomplete action
    fn find_interrupted_games(&self) -> impl Future<Output = StorageResult<Vec<GameId>>> + Send;

    /// Mark every incomplete action failed with `message`; returns how many
    fn mark_incomplete_actions_failed(
        &self,
        game_id: &GameId,
        message: &str,
    ) -> impl Future<Output = StorageResult<usize>> + Send;

    /// Latest snapshot whose turn has a matching valid action
    fn last_consistent_state(
        &self,
        game_id: &GameId,
    ) -> impl Future<Output = StorageResult<Option<GameSnapshot>>> + Send;
}

/// Snapshots of one game keyed by turn
pub(crate) type SnapshotMap = BTreeMap<u32, GameSnapshot>;
