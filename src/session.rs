//! Persistent game sessions
//!
//! A [`GameSession`] pairs an engine with a [`GameStore`]: every action
//! attempt is recorded before it runs and completed after, new events are
//! stored, and a snapshot is saved after each successful action. Storage
//! failures are logged and reported on the update but never undo the
//! in-memory move.
//!
//! [`SessionRegistry`] hosts many sessions at once. Each session sits behind
//! its own async mutex, so actions on one game are serialized while
//! different games proceed independently.

use crate::config::EngineSettings;
use crate::core::{GameId, PlayerId};
use crate::engine::{GameEngine, GameUpdate};
use crate::game::{Action, GameConfig, GameEvent};
use crate::recovery::{RecoveryManager, RecoveryReport};
use crate::storage::{GameStatus, GameStore, StorageError};
use crate::{GameError, Result};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

pub struct GameSession<S> {
    engine: GameEngine,
    store: Arc<S>,
    snapshot_every_action: bool,
}

impl<S: GameStore> GameSession<S> {
    /// Create a new game and persist its initial state
    pub async fn create(config: &GameConfig, store: Arc<S>, settings: &EngineSettings) -> Result<Self> {
        let engine = GameEngine::create_game(config)?;
        let game_id = engine.game_id().clone();
        let snapshot = engine.snapshot();
        store.create_game(&game_id, config.player_ids()).await?;
        store.save_snapshot(&snapshot).await?;
        Ok(GameSession {
            engine,
            store,
            snapshot_every_action: settings.snapshot_every_action,
        })
    }

    /// Resume a stored game at `turn` (or its latest snapshot)
    pub async fn load(
        store: Arc<S>,
        game_id: &GameId,
        turn: Option<u32>,
        settings: &EngineSettings,
    ) -> Result<Self> {
        let snapshot = store
            .load_snapshot(game_id, turn)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("snapshot of {game_id}")))?;
        Ok(GameSession {
            engine: GameEngine::from_snapshot(snapshot)?,
            store,
            snapshot_every_action: settings.snapshot_every_action,
        })
    }

    /// Run recovery on `game_id` and resume from the recovered snapshot
    pub async fn recover(
        store: Arc<S>,
        game_id: &GameId,
        settings: &EngineSettings,
    ) -> Result<(Self, RecoveryReport)> {
        let mut report = RecoveryManager::new(store.clone())
            .recover_game(game_id)
            .await?;
        let snapshot = match report.recovered.take() {
            Some(snapshot) => snapshot,
            None if report.success => store
                .load_snapshot(game_id, None)
                .await?
                .ok_or_else(|| StorageError::NotFound(format!("snapshot of {game_id}")))?,
            None => {
                return Err(GameError::fault(format!("Game {game_id} could not be recovered")));
            }
        };
        let session = GameSession {
            engine: GameEngine::from_snapshot(snapshot)?,
            store,
            snapshot_every_action: settings.snapshot_every_action,
        };
        Ok((session, report))
    }

    pub fn engine(&self) -> &GameEngine {
        &self.engine
    }

    pub fn game_id(&self) -> &GameId {
        self.engine.game_id()
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Attempt `action` and persist the outcome
    pub async fn perform_action(&mut self, player_id: &PlayerId, action: &Action) -> GameUpdate {
        let game_id = self.engine.game_id().clone();
        let turn = self.engine.state().turn_number + 1;
        let first_new_event = self.engine.state().events.len();
        let mut storage_errors: Vec<String> = Vec::new();

        let action_id = match self.store.record_action(&game_id, turn, player_id, action).await {
            Ok(id) => Some(id),
            Err(e) => {
                storage_errors.push(format!("record_action: {e}"));
                None
            }
        };

        let started = Instant::now();
        let mut update = self.engine.perform_action(player_id, action);
        let duration_ms = started.elapsed().as_millis() as u64;

        if let Some(action_id) = action_id {
            if let Err(e) = self
                .store
                .complete_action(&action_id, update.success, update.error.clone(), Some(duration_ms))
                .await
            {
                storage_errors.push(format!("complete_action: {e}"));
            }
        }

        let new_events: Vec<GameEvent> = self.engine.state().events[first_new_event..].to_vec();
        for event in &new_events {
            if let Err(e) = self.store.record_event(&game_id, event).await {
                storage_errors.push(format!("record_event: {e}"));
                break;
            }
        }

        if update.success && self.snapshot_every_action {
            let snapshot = self.engine.snapshot();
            if let Err(e) = self.store.save_snapshot(&snapshot).await {
                storage_errors.push(format!("save_snapshot: {e}"));
            }
        }

        if update.success && self.engine.is_game_over() {
            if let Err(e) = self
                .store
                .update_status(&game_id, GameStatus::Completed, Some(turn))
                .await
            {
                storage_errors.push(format!("update_status: {e}"));
            }
        }

        if !storage_errors.is_empty() {
            let message = storage_errors.join("; ");
            self.engine
                .logger()
                .normal(&format!("{game_id} turn {turn}: storage failure: {message}"));
            update.storage_error = Some(message);
        }
        update
    }
}

pub type SharedSession<S> = Arc<Mutex<GameSession<S>>>;

/// Concurrent host for many sessions over one store
pub struct SessionRegistry<S> {
    store: Arc<S>,
    settings: EngineSettings,
    sessions: RwLock<FxHashMap<GameId, SharedSession<S>>>,
}

impl<S: GameStore> SessionRegistry<S> {
    pub fn new(store: Arc<S>, settings: EngineSettings) -> Self {
        SessionRegistry {
            store,
            settings,
            sessions: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub async fn create_game(&self, config: &GameConfig) -> Result<GameId> {
        let session = GameSession::create(config, self.store.clone(), &self.settings).await?;
        let game_id = session.game_id().clone();
        self.sessions
            .write()
            .await
            .insert(game_id.clone(), Arc::new(Mutex::new(session)));
        Ok(game_id)
    }

    /// Session for `game_id`, loading it from the store on first use
    pub async fn open(&self, game_id: &GameId) -> Result<SharedSession<S>> {
        if let Some(session) = self.sessions.read().await.get(game_id) {
            return Ok(session.clone());
        }
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(game_id) {
            return Ok(session.clone());
        }
        let session = GameSession::load(self.store.clone(), game_id, None, &self.settings).await?;
        let shared = Arc::new(Mutex::new(session));
        sessions.insert(game_id.clone(), shared.clone());
        Ok(shared)
    }

    pub async fn get(&self, game_id: &GameId) -> Option<SharedSession<S>> {
        self.sessions.read().await.get(game_id).cloned()
    }

    pub async fn perform_action(
        &self,
        game_id: &GameId,
        player_id: &PlayerId,
        action: &Action,
    ) -> Result<GameUpdate> {
        let session = self.open(game_id).await?;
        let mut session = session.lock().await;
        Ok(session.perform_action(player_id, action).await)
    }

    /// Drop the in-memory session; stored data is kept
    pub async fn close(&self, game_id: &GameId) -> bool {
        self.sessions.write().await.remove(game_id).is_some()
    }

    pub async fn game_ids(&self) -> Vec<GameId> {
        let mut ids: Vec<GameId> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{ActionType, VerbosityLevel};
    use crate::storage::MemoryStore;

    fn settings() -> EngineSettings {
        EngineSettings::default()
    }

    async fn session(seed: u64) -> GameSession<MemoryStore> {
        let config = GameConfig::with_default_ids(5, Some(seed)).unwrap();
        let mut session = GameSession::create(&config, Arc::new(MemoryStore::new()), &settings())
            .await
            .unwrap();
        session.engine.logger_mut().set_verbosity(VerbosityLevel::Silent);
        session
    }

    #[tokio::test]
    async fn test_actions_are_recorded_and_snapshotted() {
        let mut session = session(42).await;
        let director = session.engine().state().current_director_id().cloned().unwrap();
        let target = session
            .engine()
            .state()
            .eligible_engineers()
            .map(|p| p.id.clone())
            .next()
            .unwrap();

        let update = session
            .perform_action(&director, &Action::Nominate { target_id: target })
            .await;
        assert!(update.success);
        assert_eq!(update.storage_error, None);

        let game_id = session.game_id().clone();
        let record = session.store().game_record(&game_id).await.unwrap();
        assert_eq!(record.actions.len(), 1);
        assert_eq!(record.actions[0].action_type, ActionType::Nominate);
        assert_eq!(record.actions[0].is_valid, Some(true));
        assert_eq!(record.events.len(), session.engine().state().events.len());
        assert_eq!(session.store().snapshot_turns(&game_id).await.unwrap(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_rejected_action_recorded_without_snapshot() {
        let mut session = session(42).await;
        let update = session
            .perform_action(&PlayerId::new("ghost"), &Action::DeclareVeto)
            .await;
        assert!(!update.success);

        let game_id = session.game_id().clone();
        let record = session.store().game_record(&game_id).await.unwrap();
        assert_eq!(record.actions[0].is_valid, Some(false));
        assert_eq!(record.actions[0].error.as_deref(), Some("Player ghost not found"));
        assert_eq!(session.store().snapshot_turns(&game_id).await.unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn test_load_resumes_latest_snapshot() {
        let mut session = session(9).await;
        let p1 = PlayerId::new("player_1");
        session.perform_action(&p1, &Action::Observe).await;
        session.perform_action(&p1, &Action::Observe).await;

        let game_id = session.game_id().clone();
        let loaded = GameSession::load(session.store().clone(), &game_id, None, &settings())
            .await
            .unwrap();
        similar_asserts::assert_eq!(loaded.engine().state(), session.engine().state());

        let early = GameSession::load(session.store().clone(), &game_id, Some(1), &settings())
            .await
            .unwrap();
        assert_eq!(early.engine().state().turn_number, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_registry_runs_games_concurrently() {
        let registry = Arc::new(SessionRegistry::new(Arc::new(MemoryStore::new()), settings()));
        let mut game_ids = Vec::new();
        for seed in 0..4 {
            let config = GameConfig::with_default_ids(5, Some(seed)).unwrap();
            game_ids.push(registry.create_game(&config).await.unwrap());
        }

        let mut tasks = Vec::new();
        for game_id in game_ids.clone() {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..5 {
                    let update = registry
                        .perform_action(&game_id, &PlayerId::new("player_1"), &Action::Observe)
                        .await
                        .unwrap();
                    assert!(update.success);
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        for game_id in &game_ids {
            let session = registry.get(game_id).await.unwrap();
            assert_eq!(session.lock().await.engine().state().turn_number, 5);
        }
        assert_eq!(registry.game_ids().await.len(), 4);
    }

    #[tokio::test]
    async fn test_registry_reopens_closed_game() {
        let registry = SessionRegistry::new(Arc::new(MemoryStore::new()), settings());
        let config = GameConfig::with_default_ids(6, Some(3)).unwrap();
        let game_id = registry.create_game(&config).await.unwrap();
        let p1 = PlayerId::new("player_1");
        registry.perform_action(&game_id, &p1, &Action::Observe).await.unwrap();

        assert!(registry.close(&game_id).await);
        assert!(registry.get(&game_id).await.is_none());

        let session = registry.open(&game_id).await.unwrap();
        assert_eq!(session.lock().await.engine().state().turn_number, 1);
    }

    #[tokio::test]
    async fn test_unknown_game_is_storage_error() {
        let registry = SessionRegistry::new(Arc::new(MemoryStore::new()), settings());
        let err = registry
            .perform_action(&GameId::new("nope"), &PlayerId::new("p"), &Action::Observe)
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::Storage(StorageError::NotFound(_))));
    }
}
