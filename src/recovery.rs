//! Crash recovery for stored games
//!
//! After a process dies mid-game the store may hold action attempts that
//! never completed, or snapshots newer than the last action known to be
//! valid. [`RecoveryManager`] classifies what went wrong and rolls the game
//! back to a snapshot it can trust.

use crate::core::GameId;
use crate::game::snapshot::GameSnapshot;
use crate::storage::{GameStatus, GameStore, StorageResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Error text written onto actions abandoned by an interruption
pub const RECOVERY_MESSAGE: &str = "Recovered from interruption";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryType {
    /// An action was recorded but never completed
    IncompleteAction,
    /// Nothing pending; the game stopped while waiting on a player
    AgentTimeout,
    /// No snapshot exists to resume from
    TransactionFailure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryReport {
    pub game_id: GameId,
    pub failure_type: Option<RecoveryType>,
    pub last_valid_turn: u32,
    pub actions_taken: Vec<String>,
    #[serde(skip)]
    pub recovered: Option<GameSnapshot>,
    pub success: bool,
}

pub struct RecoveryManager<S> {
    store: Arc<S>,
}

impl<S: GameStore> RecoveryManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        RecoveryManager { store }
    }

    pub async fn find_interrupted_games(&self) -> StorageResult<Vec<GameId>> {
        self.store.find_interrupted_games().await
    }

    /// Classify how `game_id` was interrupted, if at all
    pub async fn detect_interruption(&self, game_id: &GameId) -> StorageResult<Option<RecoveryType>> {
        let record = self.store.game_record(game_id).await?;
        if record.incomplete_actions().next().is_some() {
            return Ok(Some(RecoveryType::IncompleteAction));
        }
        if self.store.snapshot_turns(game_id).await?.is_empty() {
            return Ok(Some(RecoveryType::TransactionFailure));
        }
        if record.status == GameStatus::Active {
            return Ok(Some(RecoveryType::AgentTimeout));
        }
        Ok(None)
    }

    /// Roll `game_id` back to a trustworthy snapshot
    ///
    /// On success the game is marked Active at the recovered turn; otherwise
    /// it is marked Failed. Storage errors abort and propagate.
    pub async fn recover_game(&self, game_id: &GameId) -> StorageResult<RecoveryReport> {
        let failure_type = self.detect_interruption(game_id).await?;
        let mut report = RecoveryReport {
            game_id: game_id.clone(),
            failure_type,
            last_valid_turn: 0,
            actions_taken: Vec::new(),
            recovered: None,
            success: false,
        };

        let snapshot = match failure_type {
            None => {
                report.actions_taken.push("No interruption detected".to_string());
                report.success = true;
                return Ok(report);
            }
            Some(RecoveryType::IncompleteAction) => {
                let marked = self
                    .store
                    .mark_incomplete_actions_failed(game_id, RECOVERY_MESSAGE)
                    .await?;
                report
                    .actions_taken
                    .push(format!("Marked {marked} incomplete actions as failed"));
                self.store.last_consistent_state(game_id).await?
            }
            Some(RecoveryType::AgentTimeout) => self.store.load_snapshot(game_id, None).await?,
            Some(RecoveryType::TransactionFailure) => self.store.last_consistent_state(game_id).await?,
        };

        match snapshot {
            Some(snapshot) => {
                report.last_valid_turn = snapshot.turn_number;
                report
                    .actions_taken
                    .push(format!("Loaded state from turn {}", snapshot.turn_number));
                self.store
                    .update_status(game_id, GameStatus::Active, Some(snapshot.turn_number))
                    .await?;
                report.actions_taken.push("Updated game status to active".to_string());
                report.recovered = Some(snapshot);
                report.success = true;
            }
            None => {
                self.store
                    .update_status(game_id, GameStatus::Failed, None)
                    .await?;
                report
                    .actions_taken
                    .push("Marked game as failed due to unrecoverable state".to_string());
            }
        }
        Ok(report)
    }

    /// Recover every interrupted game in the store
    pub async fn recover_all(&self) -> StorageResult<Vec<RecoveryReport>> {
        let mut reports = Vec::new();
        for game_id in self.find_interrupted_games().await? {
            reports.push(self.recover_game(&game_id).await?);
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PlayerId;
    use crate::game::state::tests::five_player_state;
    use crate::game::Action;
    use crate::storage::MemoryStore;

    async fn store_with_game() -> (Arc<MemoryStore>, GameId) {
        let store = Arc::new(MemoryStore::new());
        let game_id = GameId::new("test");
        store.create_game(&game_id, &[]).await.unwrap();
        (store, game_id)
    }

    fn snapshot_at(turn: u32) -> GameSnapshot {
        let mut state = five_player_state();
        state.turn_number = turn;
        GameSnapshot::new(state, turn)
    }

    #[tokio::test]
    async fn test_no_snapshot_is_transaction_failure() {
        let (store, game_id) = store_with_game().await;
        let manager = RecoveryManager::new(store.clone());
        assert_eq!(
            manager.detect_interruption(&game_id).await.unwrap(),
            Some(RecoveryType::TransactionFailure)
        );

        let report = manager.recover_game(&game_id).await.unwrap();
        assert!(!report.success);
        assert_eq!(
            store.game_record(&game_id).await.unwrap().status,
            GameStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_incomplete_action_rolls_back() {
        let (store, game_id) = store_with_game().await;
        let p1 = PlayerId::new("p1");
        store.save_snapshot(&snapshot_at(0)).await.unwrap();
        let a1 = store.record_action(&game_id, 1, &p1, &Action::Observe).await.unwrap();
        store.complete_action(&a1, true, None, None).await.unwrap();
        store.save_snapshot(&snapshot_at(1)).await.unwrap();
        store.record_action(&game_id, 2, &p1, &Action::Observe).await.unwrap();

        let manager = RecoveryManager::new(store.clone());
        assert_eq!(manager.find_interrupted_games().await.unwrap(), vec![game_id.clone()]);

        let report = manager.recover_game(&game_id).await.unwrap();
        assert_eq!(report.failure_type, Some(RecoveryType::IncompleteAction));
        assert!(report.success);
        assert_eq!(report.last_valid_turn, 1);
        assert_eq!(report.recovered.unwrap().turn_number, 1);

        let record = store.game_record(&game_id).await.unwrap();
        assert_eq!(record.actions[1].error.as_deref(), Some(RECOVERY_MESSAGE));
        assert!(manager.find_interrupted_games().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_completed_game_needs_nothing() {
        let (store, game_id) = store_with_game().await;
        store.save_snapshot(&snapshot_at(0)).await.unwrap();
        store
            .update_status(&game_id, GameStatus::Completed, None)
            .await
            .unwrap();
        let manager = RecoveryManager::new(store);
        assert_eq!(manager.detect_interruption(&game_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_active_without_pending_is_agent_timeout() {
        let (store, game_id) = store_with_game().await;
        store.save_snapshot(&snapshot_at(0)).await.unwrap();
        store.save_snapshot(&snapshot_at(4)).await.unwrap();
        let manager = RecoveryManager::new(store);

        let report = manager.recover_game(&game_id).await.unwrap();
        assert_eq!(report.failure_type, Some(RecoveryType::AgentTimeout));
        assert_eq!(report.last_valid_turn, 4);
    }
}
