//! JSON file store
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<game_id>/record.json        status, actions and events
//! <root>/<game_id>/turn_000042.json   snapshot after turn 42
//! ```
//!
//! Every write goes to a temporary file that is then renamed over the
//! target, so a crash never leaves a half-written document behind.

use super::{
    pick_snapshot_turn, ActionId, GameRecord, GameStatus, GameStore, SnapshotId, StorageError,
    StorageResult,
};
use crate::core::{GameId, PlayerId};
use crate::game::snapshot::GameSnapshot;
use crate::game::{Action, GameEvent};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

const RECORD_FILE: &str = "record.json";
const SNAPSHOT_PREFIX: &str = "turn_";

#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    /// Serializes read-modify-write cycles on record files
    write_lock: Mutex<()>,
}

fn snapshot_file_name(turn: u32) -> String {
    format!("{SNAPSHOT_PREFIX}{turn:06}.json")
}

fn parse_snapshot_file_name(name: &str) -> Option<u32> {
    name.strip_prefix(SNAPSHOT_PREFIX)?
        .strip_suffix(".json")?
        .parse()
        .ok()
}

async fn write_atomic(path: &Path, contents: &[u8]) -> StorageResult<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, contents).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`
    pub async fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(FileStore {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn game_dir(&self, game_id: &GameId) -> PathBuf {
        self.root.join(game_id.as_str())
    }

    async fn read_record(&self, game_id: &GameId) -> StorageResult<GameRecord> {
        let path = self.game_dir(game_id).join(RECORD_FILE);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(format!("game {game_id}")))
            }
            Err(e) => return Err(e.into()),
        };
        let record: GameRecord = serde_json::from_slice(&bytes)
            .map_err(|e| StorageError::Corrupt(format!("{}: {e}", path.display())))?;
        if &record.game_id != game_id {
            return Err(StorageError::Corrupt(format!(
                "{} holds game {}",
                path.display(),
                record.game_id
            )));
        }
        Ok(record)
    }

    async fn write_record(&self, record: &GameRecord) -> StorageResult<()> {
        let path = self.game_dir(&record.game_id).join(RECORD_FILE);
        let json = serde_json::to_vec_pretty(record)?;
        write_atomic(&path, &json).await
    }

    /// Read, modify and write back one record under the write lock
    async fn update_record<T>(
        &self,
        game_id: &GameId,
        f: impl FnOnce(&mut GameRecord) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.read_record(game_id).await?;
        let out = f(&mut record)?;
        self.write_record(&record).await?;
        Ok(out)
    }

    async fn read_snapshot(&self, game_id: &GameId, turn: u32) -> StorageResult<GameSnapshot> {
        let path = self.game_dir(game_id).join(snapshot_file_name(turn));
        let json = fs::read_to_string(&path).await?;
        GameSnapshot::from_json(&json)
            .map_err(|e| StorageError::Corrupt(format!("{}: {e}", path.display())))
    }
}

impl GameStore for FileStore {
    async fn create_game(&self, game_id: &GameId, player_ids: &[PlayerId]) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        fs::create_dir_all(self.game_dir(game_id)).await?;
        self.write_record(&GameRecord::new(game_id.clone(), player_ids.to_vec()))
            .await
    }

    async fn game_record(&self, game_id: &GameId) -> StorageResult<GameRecord> {
        self.read_record(game_id).await
    }

    async fn list_games(&self) -> StorageResult<Vec<GameId>> {
        let mut ids = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().join(RECORD_FILE).is_file() {
                ids.push(GameId::new(entry.file_name().to_string_lossy().into_owned()));
            }
        }
        ids.sort();
        Ok(ids)
    }

    async fn update_status(
        &self,
        game_id: &GameId,
        status: GameStatus,
        current_turn: Option<u32>,
    ) -> StorageResult<()> {
        self.update_record(game_id, |r| {
            r.status = status;
            if let Some(turn) = current_turn {
                r.current_turn = turn;
            }
            Ok(())
        })
        .await
    }

    async fn save_snapshot(&self, snapshot: &GameSnapshot) -> StorageResult<SnapshotId> {
        let game_id = snapshot.game_id().clone();
        let dir = self.game_dir(&game_id);
        if !dir.join(RECORD_FILE).is_file() {
            return Err(StorageError::NotFound(format!("game {game_id}")));
        }
        let json = snapshot
            .to_json()
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;
        write_atomic(&dir.join(snapshot_file_name(snapshot.turn_number)), json.as_bytes()).await?;
        Ok(SnapshotId {
            game_id,
            turn_number: snapshot.turn_number,
        })
    }

    async fn load_snapshot(
        &self,
        game_id: &GameId,
        turn: Option<u32>,
    ) -> StorageResult<Option<GameSnapshot>> {
        let turns = self.snapshot_turns(game_id).await?;
        match pick_snapshot_turn(turns, turn) {
            Some(t) => Ok(Some(self.read_snapshot(game_id, t).await?)),
            None => Ok(None),
        }
    }

    async fn snapshot_turns(&self, game_id: &GameId) -> StorageResult<Vec<u32>> {
        let dir = self.game_dir(game_id);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut turns = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(turn) = parse_snapshot_file_name(&entry.file_name().to_string_lossy()) {
                turns.push(turn);
            }
        }
        turns.sort_unstable();
        Ok(turns)
    }

    async fn record_action(
        &self,
        game_id: &GameId,
        turn_number: u32,
        player_id: &PlayerId,
        action: &Action,
    ) -> StorageResult<ActionId> {
        self.update_record(game_id, |r| Ok(r.push_action(turn_number, player_id, action)))
            .await
    }

    async fn complete_action(
        &self,
        action_id: &ActionId,
        is_valid: bool,
        error: Option<String>,
        duration_ms: Option<u64>,
    ) -> StorageResult<()> {
        self.update_record(&action_id.game_id, |r| {
            r.complete(action_id.index, is_valid, error, duration_ms)
        })
        .await
    }

    async fn record_event(&self, game_id: &GameId, event: &GameEvent) -> StorageResult<()> {
        self.update_record(game_id, |r| {
            r.events.push(event.clone());
            Ok(())
        })
        .await
    }

    async fn find_interrupted_games(&self) -> StorageResult<Vec<GameId>> {
        let mut interrupted = Vec::new();
        for game_id in self.list_games().await? {
            let record = self.read_record(&game_id).await?;
            if record.status == GameStatus::Active && record.incomplete_actions().next().is_some() {
                interrupted.push(game_id);
            }
        }
        Ok(interrupted)
    }

    async fn mark_incomplete_actions_failed(
        &self,
        game_id: &GameId,
        message: &str,
    ) -> StorageResult<usize> {
        self.update_record(game_id, |r| Ok(r.mark_incomplete_failed(message)))
            .await
    }

    async fn last_consistent_state(&self, game_id: &GameId) -> StorageResult<Option<GameSnapshot>> {
        let record = self.read_record(game_id).await?;
        let turns = self.snapshot_turns(game_id).await?;
        match record.last_consistent_turn(turns) {
            Some(t) => Ok(Some(self.read_snapshot(game_id, t).await?)),
            None => Ok(None),
        }
    }
}
