//! Engine facade
//!
//! [`GameEngine`] owns one game: its full state, the seeded RNG every random
//! decision is drawn from, and the game's logger. Every player-facing call
//! returns a value; rule violations and internal faults come back inside a
//! [`GameUpdate`] rather than as errors.

/// Conditional logging that compiles away without the `verbose-logging` feature
macro_rules! log_if_verbose {
    ($self:expr, $($arg:tt)*) => {
        #[cfg(feature = "verbose-logging")]
        {
            $self.logger.action(&format!($($arg)*));
        }
        #[cfg(not(feature = "verbose-logging"))]
        {
            let _ = &$self;
        }
    };
}

use crate::core::{create_standard_deck, get_role_distribution, GameId, Player, PlayerId, Role};
use crate::game::random_controller::{random_action, VoteBias};
use crate::game::snapshot::GameSnapshot;
use crate::game::{
    Action, ActionType, EventType, GameConfig, GameEvent, GameLogger, GameState, PublicInfo,
};
use crate::{GameError, Result};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};

/// Result envelope of one action attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameUpdate {
    pub success: bool,
    pub error: Option<String>,
    /// New events produced by this attempt that the actor may see
    pub events: Vec<GameEvent>,
    /// Resulting state, filtered for the actor
    pub game_state: GameState,
    /// Valid actions for the actor after this attempt
    pub valid_actions: Vec<ActionType>,
    /// Set when the action applied but persisting it failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_error: Option<String>,
}

/// Board summary at the end of a game or simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GameStats {
    pub capability: u32,
    pub safety: u32,
    pub round_number: u32,
    pub turn_number: u32,
    pub failed_proposals: u32,
    pub papers_published: usize,
    pub alive_players: usize,
    pub deck_size: usize,
}

impl GameStats {
    pub fn from_state(state: &GameState) -> Self {
        GameStats {
            capability: state.capability,
            safety: state.safety,
            round_number: state.round_number,
            turn_number: state.turn_number,
            failed_proposals: state.failed_proposals,
            papers_published: state
                .events
                .iter()
                .filter(|e| e.event_type == EventType::PaperPublished)
                .count(),
            alive_players: state.alive_count(),
            deck_size: state.deck.len(),
        }
    }
}

/// Outcome of [`GameEngine::simulate_to_completion`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationSummary {
    /// Whether the game reached GameOver
    pub completed: bool,
    pub turns_taken: u32,
    pub winners: Vec<Role>,
    pub final_stats: GameStats,
}

pub struct GameEngine {
    state: GameState,
    rng: ChaCha12Rng,
    logger: GameLogger,
}

impl GameEngine {
    /// Set up a new game from a validated config
    ///
    /// Roles, deck order, the starting director and the game id all come
    /// from one generator seeded by `config.seed`, so equal seeds give equal
    /// games.
    pub fn create_game(config: &GameConfig) -> Result<Self> {
        let mut rng = match config.seed {
            Some(seed) => ChaCha12Rng::seed_from_u64(seed),
            None => ChaCha12Rng::from_entropy(),
        };

        let player_count = config.player_count();
        let mut roles = get_role_distribution(player_count)?.roles();
        roles.shuffle(&mut rng);
        let players: Vec<Player> = config
            .player_ids()
            .iter()
            .zip(roles)
            .map(|(id, role)| Player::new(id.clone(), role))
            .collect();

        let mut deck = create_standard_deck();
        deck.shuffle(&mut rng);

        let director = rng.gen_range(0..player_count);
        let game_id = GameId::from_bits(rng.next_u64());

        let state = GameState::new(game_id, players, deck, director);
        state.check_invariants()?;

        let engine = GameEngine {
            state,
            rng,
            logger: GameLogger::new(),
        };
        engine.logger.normal(&format!(
            "Created {} with {} players, director {}",
            engine.state.game_id,
            player_count,
            engine.state.current_director_id().map(|p| p.as_str()).unwrap_or("?")
        ));
        Ok(engine)
    }

    /// Resume a game from a snapshot
    ///
    /// The saved RNG is restored when present; otherwise a fresh entropy
    /// seeded generator is used and later random choices will differ from an
    /// uninterrupted run.
    pub fn from_snapshot(snapshot: GameSnapshot) -> Result<Self> {
        snapshot.game_state.check_invariants()?;
        let rng = snapshot.rng.unwrap_or_else(ChaCha12Rng::from_entropy);
        Ok(GameEngine {
            state: snapshot.game_state,
            rng,
            logger: GameLogger::new(),
        })
    }

    /// Full snapshot of the current state including the RNG
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot::with_rng(self.state.clone(), self.state.turn_number, self.rng.clone())
    }

    pub fn game_id(&self) -> &GameId {
        &self.state.game_id
    }

    pub fn logger(&self) -> &GameLogger {
        &self.logger
    }

    pub fn logger_mut(&mut self) -> &mut GameLogger {
        &mut self.logger
    }

    /// Unfiltered state
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Direct mutable access for test setups
    #[doc(hidden)]
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    /// Attempt `action` for `player_id`
    ///
    /// The turn counter advances on every attempt. A rejected action leaves
    /// the rest of the state untouched; a fault during application restores
    /// the state from before the attempt.
    pub fn perform_action(&mut self, player_id: &PlayerId, action: &Action) -> GameUpdate {
        self.state.turn_number += 1;
        let first_new_event = self.state.events.len();

        let events = std::mem::take(&mut self.state.events);
        let checkpoint = self.state.clone();
        self.state.events = events;

        let error = match self.state.apply_action(player_id, action) {
            Ok(()) => {
                log_if_verbose!(self, "{player_id}: {action}");
                None
            }
            Err(err) => {
                if matches!(err, GameError::InvalidState(_)) {
                    self.state.events.truncate(first_new_event);
                    let events = std::mem::take(&mut self.state.events);
                    self.state = checkpoint;
                    self.state.events = events;
                    self.logger
                        .normal(&format!("{player_id}: {action} failed: {err}"));
                } else {
                    log_if_verbose!(self, "{player_id}: {action} rejected: {err}");
                }
                Some(err.to_string())
            }
        };

        for event in &self.state.events[first_new_event..] {
            self.logger.event(event);
        }

        let viewer_alive = self.state.player(player_id).map(|p| p.alive).unwrap_or(false);
        let events = self.state.events[first_new_event..]
            .iter()
            .filter(|e| crate::game::filter::event_visible_to(e, player_id, viewer_alive))
            .cloned()
            .collect();

        GameUpdate {
            success: error.is_none(),
            error,
            events,
            game_state: self.state.view_for(player_id),
            valid_actions: self.state.valid_actions(player_id),
            storage_error: None,
        }
    }

    /// State as seen by `player_id`, or the full state when `None`
    ///
    /// The full state reveals every role and the deck order; never hand it
    /// to a player.
    pub fn get_game_state(&self, player_id: Option<&PlayerId>) -> GameState {
        match player_id {
            Some(id) => self.state.view_for(id),
            None => self.state.clone(),
        }
    }

    pub fn get_valid_actions(&self, player_id: &PlayerId) -> Vec<ActionType> {
        self.state.valid_actions(player_id)
    }

    pub fn is_game_over(&self) -> bool {
        self.state.is_game_over
    }

    pub fn get_winners(&self) -> &[Role] {
        &self.state.winners
    }

    pub fn get_public_info(&self) -> PublicInfo {
        self.state.public_info()
    }

    /// All events logged at or after `turn` (unfiltered)
    pub fn events_since(&self, turn: u32) -> Vec<GameEvent> {
        self.state.events_since(turn).cloned().collect()
    }

    pub fn stats(&self) -> GameStats {
        GameStats::from_state(&self.state)
    }

    /// Drive the game with uniformly random choices until it ends
    ///
    /// Each step the first alive player with something meaningful to do
    /// acts. Stops at `max_turns` attempts, or when no player has a
    /// non-Observe action that succeeds.
    pub fn simulate_to_completion(&mut self, max_turns: u32) -> SimulationSummary {
        let mut turns_taken = 0;

        while !self.state.is_game_over && turns_taken < max_turns {
            let alive: Vec<PlayerId> = self.state.alive_players().map(|p| p.id.clone()).collect();
            let mut progressed = false;

            for id in &alive {
                if turns_taken >= max_turns {
                    break;
                }
                let valid = self.state.valid_actions(id);
                if valid.iter().all(|a| *a == ActionType::Observe) {
                    continue;
                }
                let view = self.state.view_for(id);
                let action = random_action(&view, id, &valid, &mut self.rng, VoteBias::UNIFORM);
                if action == Action::Observe {
                    continue;
                }
                turns_taken += 1;
                if self.perform_action(id, &action).success {
                    progressed = true;
                    break;
                }
            }

            if !progressed {
                self.logger.normal(&format!(
                    "No player can act in {} (phase {}), stopping",
                    self.state.game_id, self.state.current_phase
                ));
                break;
            }
        }

        SimulationSummary {
            completed: self.state.is_game_over,
            turns_taken,
            winners: self.state.winners.clone(),
            final_stats: self.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Phase;

    fn engine(seed: u64) -> GameEngine {
        let config = GameConfig::with_default_ids(5, Some(seed)).unwrap();
        let mut engine = GameEngine::create_game(&config).unwrap();
        engine.logger_mut().set_verbosity(crate::game::VerbosityLevel::Silent);
        engine
    }

    #[test]
    fn test_create_game_deals_roles() {
        let engine = engine(42);
        let state = engine.state();
        assert_eq!(state.players.len(), 5);
        assert_eq!(state.deck.len(), 17);
        assert_eq!(
            state.players.iter().filter(|p| p.role() == Role::Agi).count(),
            1
        );
        assert_eq!(state.current_phase, Phase::TeamProposal);
        assert!(state.game_id.as_str().starts_with("game-"));
    }

    #[test]
    fn test_same_seed_same_setup() {
        similar_asserts::assert_eq!(engine(7).state(), engine(7).state());
    }

    #[test]
    fn test_invalid_action_advances_turn_only() {
        let mut engine = engine(3);
        let before = engine.state().clone();
        let not_director = engine
            .state()
            .players
            .iter()
            .find(|p| !engine.state().is_director(&p.id))
            .map(|p| p.id.clone())
            .unwrap();

        let update = engine.perform_action(
            &not_director,
            &Action::Nominate {
                target_id: not_director.clone(),
            },
        );

        assert!(!update.success);
        assert_eq!(update.error.as_deref(), Some("Only the director can nominate"));
        assert_eq!(engine.state().turn_number, before.turn_number + 1);
        let mut after = engine.state().clone();
        after.turn_number = before.turn_number;
        assert_eq!(after, before);
    }

    #[test]
    fn test_unknown_player_rejected() {
        let mut engine = engine(3);
        let update = engine.perform_action(&PlayerId::new("ghost"), &Action::Observe);
        assert!(!update.success);
        assert_eq!(update.error.as_deref(), Some("Player ghost not found"));
    }

    #[test]
    fn test_update_state_is_filtered() {
        let mut engine = engine(11);
        let me = PlayerId::new("player_1");
        let update = engine.perform_action(&me, &Action::Observe);
        assert!(update.success);
        assert!(update.game_state.deck.is_empty());
        assert_eq!(update.valid_actions, engine.get_valid_actions(&me));
    }

    #[test]
    fn test_simulation_terminates() {
        let mut engine = engine(42);
        let summary = engine.simulate_to_completion(1000);
        assert!(summary.turns_taken <= 1000);
        if summary.completed {
            assert!(!summary.winners.is_empty());
            assert!(engine.is_game_over());
        }
        assert_eq!(engine.state().total_papers(), 17);
    }

    #[test]
    fn test_snapshot_resume_continues_identically() {
        let mut a = engine(5);
        a.simulate_to_completion(10);
        let mut b = GameEngine::from_snapshot(a.snapshot()).unwrap();
        b.logger_mut().set_verbosity(crate::game::VerbosityLevel::Silent);

        let sa = a.simulate_to_completion(1000);
        let sb = b.simulate_to_completion(1000);
        assert_eq!(sa, sb);
    }
}
