//! In-memory game store

use super::{
    pick_snapshot_turn, ActionId, GameRecord, GameStatus, GameStore, SnapshotId, SnapshotMap,
    StorageError, StorageResult,
};
use crate::core::{GameId, PlayerId};
use crate::game::snapshot::GameSnapshot;
use crate::game::{Action, GameEvent};
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;

#[derive(Debug)]
struct StoredGame {
    record: GameRecord,
    snapshots: SnapshotMap,
}

/// Store that keeps everything in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    games: RwLock<FxHashMap<GameId, StoredGame>>,
}

fn not_found(game_id: &GameId) -> StorageError {
    StorageError::NotFound(format!("game {game_id}"))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn with_game<T>(
        &self,
        game_id: &GameId,
        f: impl FnOnce(&mut StoredGame) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let mut games = self.games.write().await;
        let game = games.get_mut(game_id).ok_or_else(|| not_found(game_id))?;
        f(game)
    }
}

impl GameStore for MemoryStore {
    async fn create_game(&self, game_id: &GameId, player_ids: &[PlayerId]) -> StorageResult<()> {
        let mut games = self.games.write().await;
        games.insert(
            game_id.clone(),
            StoredGame {
                record: GameRecord::new(game_id.clone(), player_ids.to_vec()),
                snapshots: SnapshotMap::new(),
            },
        );
        Ok(())
    }

    async fn game_record(&self, game_id: &GameId) -> StorageResult<GameRecord> {
        let games = self.games.read().await;
        games
            .get(game_id)
            .map(|g| g.record.clone())
            .ok_or_else(|| not_found(game_id))
    }

    async fn list_games(&self) -> StorageResult<Vec<GameId>> {
        let games = self.games.read().await;
        let mut ids: Vec<GameId> = games.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn update_status(
        &self,
        game_id: &GameId,
        status: GameStatus,
        current_turn: Option<u32>,
    ) -> StorageResult<()> {
        self.with_game(game_id, |g| {
            g.record.status = status;
            if let Some(turn) = current_turn {
                g.record.current_turn = turn;
            }
            Ok(())
        })
        .await
    }

    async fn save_snapshot(&self, snapshot: &GameSnapshot) -> StorageResult<SnapshotId> {
        let game_id = snapshot.game_id().clone();
        let turn_number = snapshot.turn_number;
        self.with_game(&game_id, |g| {
            g.snapshots.insert(turn_number, snapshot.clone());
            g.record.current_turn = g.record.current_turn.max(turn_number);
            Ok(())
        })
        .await?;
        Ok(SnapshotId {
            game_id,
            turn_number,
        })
    }

    async fn load_snapshot(
        &self,
        game_id: &GameId,
        turn: Option<u32>,
    ) -> StorageResult<Option<GameSnapshot>> {
        let games = self.games.read().await;
        let Some(game) = games.get(game_id) else {
            return Ok(None);
        };
        Ok(pick_snapshot_turn(game.snapshots.keys().copied(), turn)
            .and_then(|t| game.snapshots.get(&t).cloned()))
    }

    async fn snapshot_turns(&self, game_id: &GameId) -> StorageResult<Vec<u32>> {
        let games = self.games.read().await;
        Ok(games
            .get(game_id)
            .map(|g| g.snapshots.keys().copied().collect())
            .unwrap_or_default())
    }

    async fn record_action(
        &self,
        game_id: &GameId,
        turn_number: u32,
        player_id: &PlayerId,
        action: &Action,
    ) -> StorageResult<ActionId> {
        self.with_game(game_id, |g| Ok(g.record.push_action(turn_number, player_id, action)))
            .await
    }

    async fn complete_action(
        &self,
        action_id: &ActionId,
        is_valid: bool,
        error: Option<String>,
        duration_ms: Option<u64>,
    ) -> StorageResult<()> {
        self.with_game(&action_id.game_id, |g| {
            g.record.complete(action_id.index, is_valid, error, duration_ms)
        })
        .await
    }

    async fn record_event(&self, game_id: &GameId, event: &GameEvent) -> StorageResult<()> {
        self.with_game(game_id, |g| {
            g.record.events.push(event.clone());
            Ok(())
        })
        .await
    }

    async fn find_interrupted_games(&self) -> StorageResult<Vec<GameId>> {
        let games = self.games.read().await;
        let mut ids: Vec<GameId> = games
            .values()
            .filter(|g| {
                g.record.status == GameStatus::Active && g.record.incomplete_actions().next().is_some()
            })
            .map(|g| g.record.game_id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn mark_incomplete_actions_failed(
        &self,
        game_id: &GameId,
        message: &str,
    ) -> StorageResult<usize> {
        self.with_game(game_id, |g| Ok(g.record.mark_incomplete_failed(message)))
            .await
    }

    async fn last_consistent_state(&self, game_id: &GameId) -> StorageResult<Option<GameSnapshot>> {
        let games = self.games.read().await;
        let Some(game) = games.get(game_id) else {
            return Ok(None);
        };
        Ok(game
            .record
            .last_consistent_turn(game.snapshots.keys().copied())
            .and_then(|t| game.snapshots.get(&t).cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::tests::five_player_state;

    fn snapshot_at(turn: u32) -> GameSnapshot {
        let mut state = five_player_state();
        state.turn_number = turn;
        GameSnapshot::new(state, turn)
    }

    #[tokio::test]
    async fn test_snapshot_roundtrip_and_lookup() {
        let store = MemoryStore::new();
        let game_id = GameId::new("test");
        store.create_game(&game_id, &[]).await.unwrap();

        for turn in [0, 2, 5] {
            store.save_snapshot(&snapshot_at(turn)).await.unwrap();
        }

        let latest = store.load_snapshot(&game_id, None).await.unwrap().unwrap();
        assert_eq!(latest.turn_number, 5);
        let at_four = store.load_snapshot(&game_id, Some(4)).await.unwrap().unwrap();
        assert_eq!(at_four.turn_number, 2);
        similar_asserts::assert_eq!(at_four.game_state, snapshot_at(2).game_state);

        let missing = store
            .load_snapshot(&GameId::new("nope"), None)
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_incomplete_actions_flag_interrupted_game() {
        let store = MemoryStore::new();
        let game_id = GameId::new("test");
        store.create_game(&game_id, &[]).await.unwrap();

        let p1 = PlayerId::new("p1");
        let done = store
            .record_action(&game_id, 1, &p1, &Action::Observe)
            .await
            .unwrap();
        store.complete_action(&done, true, None, Some(3)).await.unwrap();
        assert!(store.find_interrupted_games().await.unwrap().is_empty());

        store
            .record_action(&game_id, 2, &p1, &Action::DeclareVeto)
            .await
            .unwrap();
        assert_eq!(store.find_interrupted_games().await.unwrap(), vec![game_id.clone()]);

        let marked = store
            .mark_incomplete_actions_failed(&game_id, "interrupted")
            .await
            .unwrap();
        assert_eq!(marked, 1);
        assert!(store.find_interrupted_games().await.unwrap().is_empty());

        let record = store.game_record(&game_id).await.unwrap();
        assert_eq!(record.actions[1].is_valid, Some(false));
        assert_eq!(record.actions[1].error.as_deref(), Some("interrupted"));
    }

    #[tokio::test]
    async fn test_last_consistent_state_needs_valid_action() {
        let store = MemoryStore::new();
        let game_id = GameId::new("test");
        store.create_game(&game_id, &[]).await.unwrap();
        store.save_snapshot(&snapshot_at(0)).await.unwrap();
        store.save_snapshot(&snapshot_at(1)).await.unwrap();
        store.save_snapshot(&snapshot_at(2)).await.unwrap();

        let p1 = PlayerId::new("p1");
        let a1 = store.record_action(&game_id, 1, &p1, &Action::Observe).await.unwrap();
        store.complete_action(&a1, true, None, None).await.unwrap();
        let a2 = store.record_action(&game_id, 2, &p1, &Action::Observe).await.unwrap();
        store
            .complete_action(&a2, false, Some("bad".into()), None)
            .await
            .unwrap();

        let state = store.last_consistent_state(&game_id).await.unwrap().unwrap();
        assert_eq!(state.turn_number, 1);
    }

    #[tokio::test]
    async fn test_unknown_game_errors() {
        let store = MemoryStore::new();
        let event = GameEvent {
            id: 0,
            event_type: crate::game::EventType::ChatMessage,
            player_id: None,
            data: serde_json::Value::Null,
            turn_number: 0,
        };
        let err = store
            .record_event(&GameId::new("ghost"), &event)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }
}
