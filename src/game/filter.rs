//! Per-player information filtering
//!
//! [`GameState::view_for`] produces the copy of the shared state a single
//! player is allowed to see. The copy is O(state size) per call; hidden
//! fields are never cloned in the first place.
//!
//! # Visibility rules
//!
//! - A player always sees their own role
//! - Accelerationists and the AGI see each other's true roles
//! - Every other role shows as Safety
//! - Deck contents are never visible (only its size, via [`PublicInfo`])
//! - A hand is visible only to the director or engineer holding it
//! - Allegiance views are visible only to the player who made them
//! - Chat is visible only to living players

use crate::core::{GameId, PlayerId, Role};
use crate::game::events::{GameEvent, ALLEGIANCE_VIEWED, DIRECTOR_CHOSEN, PLAYER_ELIMINATED};
use crate::game::{EventType, GameState, Phase};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

impl GameState {
    /// The state as `viewer` is allowed to see it
    ///
    /// An id that is not seated at the table gets a spectator view: no roles,
    /// hands, allegiance views or chat.
    pub fn view_for(&self, viewer: &PlayerId) -> GameState {
        let me = self.player(viewer);
        let viewer_alive = me.map(|p| p.alive).unwrap_or(false);
        let sees_conspirators = me.map(|p| p.role().is_acceleration()).unwrap_or(false);

        let players = self
            .players
            .iter()
            .map(|p| {
                let mut p = p.clone();
                let visible = &p.id == viewer || (sees_conspirators && p.role().is_acceleration());
                if !visible {
                    p.conceal();
                }
                p
            })
            .collect();

        let director_cards = if self.is_director(viewer) {
            self.director_cards.clone()
        } else {
            None
        };
        let engineer_cards = if self.is_engineer(viewer) {
            self.engineer_cards.clone()
        } else {
            None
        };

        let viewed_allegiances = self
            .viewed_allegiances
            .get(viewer)
            .map(|seen| BTreeMap::from([(viewer.clone(), seen.clone())]))
            .unwrap_or_default();

        let events = self
            .events
            .iter()
            .filter(|e| event_visible_to(e, viewer, viewer_alive))
            .cloned()
            .collect();

        let pending_powers = self.powers_for(viewer).cloned().collect();

        GameState {
            game_id: self.game_id.clone(),
            turn_number: self.turn_number,
            round_number: self.round_number,
            players,
            capability: self.capability,
            safety: self.safety,
            deck: VecDeque::new(),
            discard: self.discard.clone(),
            current_director_index: self.current_director_index,
            failed_proposals: self.failed_proposals,
            current_phase: self.current_phase,
            nominated_engineer_id: self.nominated_engineer_id.clone(),
            director_cards,
            engineer_cards,
            team_votes: self.team_votes.clone(),
            emergency_votes: self.emergency_votes.clone(),
            emergency_safety_called: self.emergency_safety_called,
            emergency_safety_active: self.emergency_safety_active,
            veto_unlocked: self.veto_unlocked,
            agi_must_reveal: self.agi_must_reveal,
            veto_state: self.veto_state,
            pending_powers,
            viewed_allegiances,
            is_game_over: self.is_game_over,
            winners: self.winners.clone(),
            events,
        }
    }

    /// Broadcast-safe summary with no hidden information
    pub fn public_info(&self) -> PublicInfo {
        PublicInfo {
            game_id: self.game_id.clone(),
            turn_number: self.turn_number,
            round_number: self.round_number,
            phase: self.current_phase,
            capability: self.capability,
            safety: self.safety,
            director_id: self.current_director_id().cloned(),
            engineer_id: self.nominated_engineer_id.clone(),
            failed_proposals: self.failed_proposals,
            emergency_safety_active: self.emergency_safety_active,
            veto_unlocked: self.veto_unlocked,
            agi_must_reveal: self.agi_must_reveal,
            deck_size: self.deck.len(),
            discard_size: self.discard.len(),
            player_count: self.player_count(),
            players: self
                .players
                .iter()
                .map(|p| PublicPlayer {
                    id: p.id.clone(),
                    alive: p.alive,
                    was_last_engineer: p.was_last_engineer,
                })
                .collect(),
            is_game_over: self.is_game_over,
            winners: self.winners.clone(),
        }
    }

    /// Events visible to `viewer` logged at or after `turn`
    pub fn events_for(&self, viewer: &PlayerId, turn: u32) -> Vec<GameEvent> {
        let alive = self.player(viewer).map(|p| p.alive).unwrap_or(false);
        self.events_since(turn)
            .filter(|e| event_visible_to(e, viewer, alive))
            .cloned()
            .collect()
    }
}

/// Whether `viewer` may see `event`
pub fn event_visible_to(event: &GameEvent, viewer: &PlayerId, viewer_alive: bool) -> bool {
    match event.event_type {
        t if t.is_public() => true,
        EventType::StateChanged => match event.change_kind() {
            Some(PLAYER_ELIMINATED) | Some(DIRECTOR_CHOSEN) => true,
            Some(ALLEGIANCE_VIEWED) => event.player_id.as_ref() == Some(viewer),
            _ => false,
        },
        EventType::ChatMessage => viewer_alive,
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicPlayer {
    pub id: PlayerId,
    pub alive: bool,
    pub was_last_engineer: bool,
}

/// Allegiance-agnostic snapshot for observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicInfo {
    pub game_id: GameId,
    pub turn_number: u32,
    pub round_number: u32,
    pub phase: Phase,
    pub capability: u32,
    pub safety: u32,
    pub director_id: Option<PlayerId>,
    pub engineer_id: Option<PlayerId>,
    pub failed_proposals: u32,
    pub emergency_safety_active: bool,
    pub veto_unlocked: bool,
    pub agi_must_reveal: bool,
    pub deck_size: usize,
    pub discard_size: usize,
    pub player_count: usize,
    pub players: Vec<PublicPlayer>,
    pub is_game_over: bool,
    pub winners: Vec<Role>,
}
