//! Append-only game event log
//!
//! Every state change the engine makes is mirrored by a [`GameEvent`]. The
//! log serves both as an audit trail and as the input to per-player
//! visibility filtering, so payloads are plain JSON objects that the filter
//! can inspect (`StateChanged` events carry their sub-kind in `data.type`).

use crate::core::{Allegiance, Paper, PlayerId, Role};
use crate::game::actions::PowerType;
use crate::game::{GameState, Phase};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// `data.type` of a StateChanged event recording a private allegiance view
pub const ALLEGIANCE_VIEWED: &str = "allegiance_viewed";
/// `data.type` of a StateChanged event recording an elimination
pub const PLAYER_ELIMINATED: &str = "player_eliminated";
/// `data.type` of a StateChanged event recording a director override
pub const DIRECTOR_CHOSEN: &str = "director_chosen";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ActionAttempted,
    StateChanged,
    ChatMessage,
    PhaseTransition,
    GameEnded,
    PowerTriggered,
    PaperPublished,
    VoteCompleted,
}

impl EventType {
    /// Event kinds every player may see regardless of payload
    pub fn is_public(self) -> bool {
        matches!(
            self,
            EventType::ActionAttempted
                | EventType::PhaseTransition
                | EventType::GameEnded
                | EventType::PowerTriggered
                | EventType::PaperPublished
                | EventType::VoteCompleted
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Position in the log (stable across filtered views)
    pub id: u64,
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Initiating player; `None` for system events
    pub player_id: Option<PlayerId>,
    pub data: Value,
    pub turn_number: u32,
}

impl GameEvent {
    /// `data.type` for StateChanged events
    pub fn change_kind(&self) -> Option<&str> {
        self.data.get("type").and_then(Value::as_str)
    }
}

fn paper_json(paper: &Paper) -> Value {
    json!({
        "id": paper.id,
        "capability": paper.capability,
        "safety": paper.safety,
    })
}

impl GameState {
    /// Append an event stamped with the current turn
    pub fn add_event(&mut self, event_type: EventType, player_id: Option<PlayerId>, data: Value) {
        let event = GameEvent {
            id: self.events.len() as u64,
            event_type,
            player_id,
            data,
            turn_number: self.turn_number,
        };
        self.events.push(event);
    }

    pub(crate) fn log_action(&mut self, player_id: &PlayerId, data: Value) {
        self.add_event(EventType::ActionAttempted, Some(player_id.clone()), data);
    }

    pub(crate) fn log_phase_transition(&mut self, from: Phase, to: Phase) {
        self.add_event(
            EventType::PhaseTransition,
            None,
            json!({ "from_phase": from.to_string(), "to_phase": to.to_string() }),
        );
    }

    pub(crate) fn log_vote_completed(&mut self, vote_type: &str, result: bool, votes: Value) {
        self.add_event(
            EventType::VoteCompleted,
            None,
            json!({ "vote_type": vote_type, "result": result, "votes": votes }),
        );
    }

    pub(crate) fn log_paper_published(
        &mut self,
        engineer: Option<&PlayerId>,
        paper: &Paper,
        capability_gain: u32,
    ) {
        let auto_published = engineer.is_none();
        self.add_event(
            EventType::PaperPublished,
            engineer.cloned(),
            json!({
                "paper": paper_json(paper),
                "capability_gain": capability_gain,
                "auto_published": auto_published,
            }),
        );
    }

    pub(crate) fn log_flag_power(&mut self, threshold: u32, effect: &str) {
        self.add_event(
            EventType::PowerTriggered,
            None,
            json!({ "power_level": threshold, "effect": effect }),
        );
    }

    pub(crate) fn log_director_power(
        &mut self,
        threshold: u32,
        power: PowerType,
        director: &PlayerId,
    ) {
        self.add_event(
            EventType::PowerTriggered,
            Some(director.clone()),
            json!({
                "power_level": threshold,
                "power": power,
                "effect": format!("Director power at capability {threshold}"),
            }),
        );
    }

    pub(crate) fn log_allegiance_viewed(
        &mut self,
        viewer: &PlayerId,
        target: &PlayerId,
        allegiance: Allegiance,
    ) {
        self.add_event(
            EventType::StateChanged,
            Some(viewer.clone()),
            json!({
                "type": ALLEGIANCE_VIEWED,
                "target_id": target,
                "allegiance": allegiance,
            }),
        );
    }

    pub(crate) fn log_player_eliminated(&mut self, target: &PlayerId, role: Role) {
        self.add_event(
            EventType::StateChanged,
            None,
            json!({ "type": PLAYER_ELIMINATED, "player_id": target, "role": role }),
        );
    }

    pub(crate) fn log_director_chosen(&mut self, director: &PlayerId) {
        self.add_event(
            EventType::StateChanged,
            None,
            json!({ "type": DIRECTOR_CHOSEN, "new_director_id": director }),
        );
    }

    pub(crate) fn log_chat(&mut self, player_id: &PlayerId, message: &str) {
        self.add_event(
            EventType::ChatMessage,
            Some(player_id.clone()),
            json!({ "message": message }),
        );
    }

    pub(crate) fn log_game_ended(&mut self, winners: &[Role], reason: &str) {
        self.add_event(
            EventType::GameEnded,
            None,
            json!({ "winners": winners, "reason": reason }),
        );
    }

    /// Events logged at or after `turn`
    pub fn events_since(&self, turn: u32) -> impl Iterator<Item = &GameEvent> {
        self.events.iter().filter(move |e| e.turn_number >= turn)
    }
}
