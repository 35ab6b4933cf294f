//! Deterministic state hashing
//!
//! Hashes the canonical JSON encoding of a [`GameState`] with the event log
//! stripped. Two states with identical board, zones, seats and round
//! sub-state hash equal; useful for replay and save/load comparisons.

use crate::game::GameState;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Top-level fields that are audit data rather than gameplay state
const EXCLUDED_FIELDS: &[&str] = &["events"];

/// Compute a deterministic hash of game state
///
/// Map-valued fields are BTreeMaps, so the JSON encoding is canonical. A
/// state that fails to encode hashes to 0.
pub fn compute_state_hash(game: &GameState) -> u64 {
    match canonical_json(game) {
        Ok(canonical) => {
            let mut hasher = DefaultHasher::new();
            canonical.hash(&mut hasher);
            hasher.finish()
        }
        Err(e) => {
            eprintln!("Warning: cannot encode {} for hashing: {e}", game.game_id);
            0
        }
    }
}

fn canonical_json(game: &GameState) -> serde_json::Result<String> {
    let value = strip_metadata(serde_json::to_value(game)?);
    serde_json::to_string(&value)
}

fn strip_metadata(mut value: serde_json::Value) -> serde_json::Value {
    if let Some(map) = value.as_object_mut() {
        for field in EXCLUDED_FIELDS {
            map.remove(*field);
        }
    }
    value
}

/// Format a hash for display (shows first 8 hex digits)
pub fn format_hash(hash: u64) -> String {
    format!("{:08x}", (hash >> 32) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PlayerId;
    use crate::game::state::tests::five_player_state;

    #[test]
    fn test_strip_metadata() {
        let json = serde_json::json!({
            "turn_number": 5,
            "events": [{"id": 0}],
        });
        assert_eq!(strip_metadata(json), serde_json::json!({ "turn_number": 5 }));
    }

    #[test]
    fn test_hash_ignores_event_log() {
        let a = five_player_state();
        let mut b = a.clone();
        b.log_chat(&PlayerId::new("p1"), "hello");
        assert_eq!(compute_state_hash(&a), compute_state_hash(&b));
    }

    #[test]
    fn test_hash_tracks_board() {
        let a = five_player_state();
        let mut b = a.clone();
        b.capability += 1;
        assert_ne!(compute_state_hash(&a), compute_state_hash(&b));
    }

    #[test]
    fn test_format_hash() {
        assert_eq!(format_hash(0xdead_beef_0000_0000), "deadbeef");
    }
}
