//! Main game state structure

use crate::core::{
    get_role_distribution, Allegiance, GameId, Paper, Player, PlayerId, Role, STANDARD_DECK_SIZE,
};
use crate::game::actions::PowerType;
use crate::game::events::GameEvent;
use crate::game::{Phase, VetoState};
use crate::{GameError, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BTreeMap, VecDeque};

/// A hand of papers (director holds at most 3, engineer at most 2)
pub type Hand = SmallVec<[Paper; 3]>;

/// Validated game configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    player_count: usize,
    player_ids: Vec<PlayerId>,
    pub seed: Option<u64>,
}

impl GameConfig {
    /// Build a config, failing immediately on a bad player count or id list
    pub fn new(player_count: usize, player_ids: Vec<PlayerId>, seed: Option<u64>) -> Result<Self> {
        get_role_distribution(player_count)?;
        if player_ids.len() != player_count {
            return Err(GameError::Config(format!(
                "Expected {player_count} player ids, got {}",
                player_ids.len()
            )));
        }
        for (i, id) in player_ids.iter().enumerate() {
            if id.as_str().is_empty() {
                return Err(GameError::Config("Player ids must be non-empty".to_string()));
            }
            if player_ids[..i].contains(id) {
                return Err(GameError::Config(format!("Duplicate player id: {id}")));
            }
        }
        Ok(GameConfig {
            player_count,
            player_ids,
            seed,
        })
    }

    /// Config with ids `player_1` .. `player_n`
    pub fn with_default_ids(player_count: usize, seed: Option<u64>) -> Result<Self> {
        let ids = (1..=player_count)
            .map(|i| PlayerId::new(format!("player_{i}")))
            .collect();
        Self::new(player_count, ids, seed)
    }

    pub fn player_count(&self) -> usize {
        self.player_count
    }

    pub fn player_ids(&self) -> &[PlayerId] {
        &self.player_ids
    }
}

/// An unspent director power earned when capability crossed a threshold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerGrant {
    pub threshold: u32,
    pub power: PowerType,
    /// Director in office when the threshold fired
    pub director_id: PlayerId,
}

/// Complete game state
///
/// The aggregate root: one value holds the board, every zone a paper can be
/// in, the round sub-state, and the event log. Clones are deep; per-player
/// views and the engine's rollback checkpoint both copy the whole value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub game_id: GameId,
    /// Incremented on every action attempt, valid or not
    pub turn_number: u32,
    /// Incremented after each completed research cycle
    pub round_number: u32,
    /// Seating order, which is also director rotation order
    pub players: Vec<Player>,

    pub capability: u32,
    pub safety: u32,

    /// Draw pile; papers are drawn from the front
    pub deck: VecDeque<Paper>,
    pub discard: Vec<Paper>,

    pub current_director_index: usize,
    pub failed_proposals: u32,
    pub current_phase: Phase,

    pub nominated_engineer_id: Option<PlayerId>,
    pub director_cards: Option<Hand>,
    pub engineer_cards: Option<Hand>,

    pub team_votes: BTreeMap<PlayerId, bool>,
    pub emergency_votes: BTreeMap<PlayerId, bool>,
    pub emergency_safety_called: bool,
    pub emergency_safety_active: bool,

    /// Permanent once set (capability 12)
    pub veto_unlocked: bool,
    /// Permanent once set (capability 10)
    pub agi_must_reveal: bool,
    #[serde(default)]
    pub veto_state: VetoState,
    #[serde(default)]
    pub pending_powers: Vec<PowerGrant>,

    /// viewer -> target -> allegiance seen
    pub viewed_allegiances: BTreeMap<PlayerId, BTreeMap<PlayerId, Allegiance>>,

    pub is_game_over: bool,
    pub winners: Vec<Role>,
    pub events: Vec<GameEvent>,
}

impl GameState {
    /// Fresh state at turn 0 in TeamProposal
    pub fn new(
        game_id: GameId,
        players: Vec<Player>,
        deck: impl Into<VecDeque<Paper>>,
        current_director_index: usize,
    ) -> Self {
        GameState {
            game_id,
            turn_number: 0,
            round_number: 0,
            players,
            capability: 0,
            safety: 0,
            deck: deck.into(),
            discard: Vec::new(),
            current_director_index,
            failed_proposals: 0,
            current_phase: Phase::TeamProposal,
            nominated_engineer_id: None,
            director_cards: None,
            engineer_cards: None,
            team_votes: BTreeMap::new(),
            emergency_votes: BTreeMap::new(),
            emergency_safety_called: false,
            emergency_safety_active: false,
            veto_unlocked: false,
            agi_must_reveal: false,
            veto_state: VetoState::Idle,
            pending_powers: Vec::new(),
            viewed_allegiances: BTreeMap::new(),
            is_game_over: false,
            winners: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    pub fn player_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| &p.id == id)
    }

    pub fn player_index(&self, id: &PlayerId) -> Option<usize> {
        self.players.iter().position(|p| &p.id == id)
    }

    pub fn alive_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.alive)
    }

    pub fn alive_count(&self) -> usize {
        self.alive_players().count()
    }

    pub fn current_director(&self) -> Option<&Player> {
        self.players.get(self.current_director_index)
    }

    pub fn current_director_id(&self) -> Option<&PlayerId> {
        self.current_director().map(|p| &p.id)
    }

    pub fn is_director(&self, id: &PlayerId) -> bool {
        self.current_director_id() == Some(id)
    }

    pub fn is_engineer(&self, id: &PlayerId) -> bool {
        self.nominated_engineer_id.as_ref() == Some(id)
    }

    pub fn agi_player(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.role() == Role::Agi)
    }

    /// Next alive seat clockwise from the current director
    ///
    /// Falls back to the current index when nobody else is alive.
    pub fn next_director_index(&self) -> usize {
        let n = self.players.len();
        (1..=n)
            .map(|offset| (self.current_director_index + offset) % n)
            .find(|&i| self.players[i].alive)
            .unwrap_or(self.current_director_index)
    }

    /// Players who could be nominated as engineer right now
    pub fn eligible_engineers(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_eligible_engineer())
    }

    /// Unspent grants held by `id`
    pub fn powers_for<'a>(&'a self, id: &'a PlayerId) -> impl Iterator<Item = &'a PowerGrant> {
        self.pending_powers.iter().filter(move |g| &g.director_id == id)
    }

    pub fn director_hand(&self) -> &[Paper] {
        self.director_cards.as_deref().unwrap_or(&[])
    }

    pub fn engineer_hand(&self) -> &[Paper] {
        self.engineer_cards.as_deref().unwrap_or(&[])
    }

    /// Papers across deck, discard and both hands
    pub fn total_papers(&self) -> usize {
        self.deck.len() + self.discard.len() + self.director_hand().len() + self.engineer_hand().len()
    }

    /// Clear nominee, votes, emergency call, hands and veto for a new proposal
    pub(crate) fn reset_round_state(&mut self) {
        self.nominated_engineer_id = None;
        self.team_votes.clear();
        self.emergency_votes.clear();
        self.emergency_safety_called = false;
        self.director_cards = None;
        self.engineer_cards = None;
        self.veto_state = VetoState::Idle;
    }

    /// Sanity check of the structural invariants
    pub fn check_invariants(&self) -> Result<()> {
        if self.current_director_index >= self.players.len() {
            return Err(GameError::fault(format!(
                "Director index {} out of range",
                self.current_director_index
            )));
        }
        if let Some(p) = self.players.iter().find(|p| !p.allegiance_matches_role()) {
            return Err(GameError::fault(format!(
                "Player {} has role {:?} but allegiance {}",
                p.id,
                p.role(),
                p.allegiance()
            )));
        }
        let agi_count = self.players.iter().filter(|p| p.role() == Role::Agi).count();
        if agi_count != 1 {
            return Err(GameError::fault(format!("Expected one AGI, found {agi_count}")));
        }
        if self.total_papers() > STANDARD_DECK_SIZE {
            return Err(GameError::fault(format!(
                "Paper count {} exceeds deck size",
                self.total_papers()
            )));
        }
        if self.director_hand().len() > 3 || self.engineer_hand().len() > 2 {
            return Err(GameError::fault("Hand size exceeded"));
        }
        if self.failed_proposals > 3 {
            return Err(GameError::fault("Failed proposal counter above 3"));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::create_standard_deck;

    /// p1-p3 Safety, p4 Accelerationist, p5 AGI, unshuffled deck, p1 directs
    pub(crate) fn five_player_state() -> GameState {
        let players = vec![
            Player::new("p1", Role::Safety),
            Player::new("p2", Role::Safety),
            Player::new("p3", Role::Safety),
            Player::new("p4", Role::Accelerationist),
            Player::new("p5", Role::Agi),
        ];
        GameState::new(GameId::new("test"), players, create_standard_deck(), 0)
    }

    #[test]
    fn test_config_validation() {
        assert!(GameConfig::with_default_ids(5, None).is_ok());
        assert!(matches!(
            GameConfig::with_default_ids(4, None),
            Err(GameError::Config(_))
        ));
        let ids = vec![PlayerId::new("a"), PlayerId::new("b")];
        assert!(matches!(
            GameConfig::new(5, ids, None),
            Err(GameError::Config(_))
        ));
    }

    #[test]
    fn test_config_rejects_duplicate_ids() {
        let ids = ["a", "b", "c", "d", "a"].iter().map(|s| PlayerId::new(*s)).collect();
        assert!(GameConfig::new(5, ids, Some(1)).is_err());
    }

    #[test]
    fn test_next_director_skips_dead() {
        let mut state = five_player_state();
        state.players[1].alive = false;
        assert_eq!(state.next_director_index(), 2);
        state.current_director_index = 4;
        assert_eq!(state.next_director_index(), 0);
    }

    #[test]
    fn test_total_papers_counts_hands() {
        let mut state = five_player_state();
        let a = state.deck.pop_front().unwrap();
        let b = state.deck.pop_front().unwrap();
        state.director_cards = Some(SmallVec::from_vec(vec![a]));
        state.engineer_cards = Some(SmallVec::from_vec(vec![b]));
        assert_eq!(state.total_papers(), STANDARD_DECK_SIZE);
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn test_reset_round_state() {
        let mut state = five_player_state();
        state.nominated_engineer_id = Some(PlayerId::new("p2"));
        state.team_votes.insert(PlayerId::new("p1"), true);
        state.emergency_safety_called = true;
        state.veto_state = VetoState::Declared;
        state.reset_round_state();
        assert!(state.nominated_engineer_id.is_none());
        assert!(state.team_votes.is_empty());
        assert!(!state.emergency_safety_called);
        assert_eq!(state.veto_state, VetoState::Idle);
    }

    #[test]
    fn test_loaded_allegiance_must_match_role() {
        let mut json = serde_json::to_value(five_player_state()).unwrap();
        assert_eq!(json["players"][4]["allegiance"], "acceleration");
        json["players"][4]["allegiance"] = "safety".into();

        let state: GameState = serde_json::from_value(json).unwrap();
        let err = state.check_invariants().unwrap_err();
        assert!(err.to_string().contains("Player p5 has role Agi"), "{err}");
    }
}
