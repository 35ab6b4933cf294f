//! Game loop implementation
//!
//! Drives one engine with a controller per seat until a win condition,
//! the turn limit, or a deadlock (nobody has a meaningful action that the
//! engine accepts).

use crate::config::DEFAULT_MAX_TURNS;
use crate::core::{PlayerId, Role};
use crate::engine::{GameEngine, GameStats};
use crate::game::controller::PlayerController;
use crate::game::logger::VerbosityLevel;
use crate::game::{Action, ActionType};
use crate::{GameError, Result};

/// Result of running a game to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameResult {
    /// Winning roles (empty unless a win condition fired)
    pub winners: Vec<Role>,
    /// Action attempts made by the loop
    pub turns_played: u32,
    pub end_reason: GameEndReason,
    pub final_stats: GameStats,
}

/// Reason the game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameEndReason {
    /// A win condition fired
    WinCondition,
    /// Game reached maximum turn limit
    MaxTurns,
    /// No alive player had an action the engine accepted
    Deadlock,
}

/// Game loop manager
pub struct GameLoop<'a> {
    pub engine: &'a mut GameEngine,
    /// Maximum action attempts before giving up
    max_turns: u32,
    turns_elapsed: u32,
}

impl<'a> GameLoop<'a> {
    pub fn new(engine: &'a mut GameEngine) -> Self {
        GameLoop {
            engine,
            max_turns: DEFAULT_MAX_TURNS,
            turns_elapsed: 0,
        }
    }

    /// Set maximum action attempts before stopping
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Set verbosity on the engine's logger
    pub fn with_verbosity(self, verbosity: VerbosityLevel) -> Self {
        self.engine.logger_mut().set_verbosity(verbosity);
        self
    }

    /// Map each seat, in seating order, to the index of its controller
    fn seat_order(&self, controllers: &[Box<dyn PlayerController + '_>]) -> Result<Vec<usize>> {
        let players = &self.engine.state().players;
        if controllers.len() != players.len() {
            return Err(GameError::Config(format!(
                "Expected {} controllers, got {}",
                players.len(),
                controllers.len()
            )));
        }
        players
            .iter()
            .map(|p| {
                controllers
                    .iter()
                    .position(|c| c.player_id() == &p.id)
                    .ok_or_else(|| GameError::PlayerNotFound(p.id.clone()))
            })
            .collect()
    }

    /// Run the game with one controller per seat
    pub fn run_game(
        &mut self,
        controllers: &mut [Box<dyn PlayerController + '_>],
    ) -> Result<GameResult> {
        let order = self.seat_order(controllers)?;

        for controller in controllers.iter_mut() {
            let view = self.engine.get_game_state(Some(controller.player_id()));
            controller.on_game_start(&view);
        }

        let end_reason = loop {
            if self.engine.is_game_over() {
                break GameEndReason::WinCondition;
            }
            if self.turns_elapsed >= self.max_turns {
                break GameEndReason::MaxTurns;
            }
            if !self.step(controllers, &order) {
                if self.turns_elapsed >= self.max_turns {
                    break GameEndReason::MaxTurns;
                }
                break GameEndReason::Deadlock;
            }
        };

        let result = GameResult {
            winners: self.engine.get_winners().to_vec(),
            turns_played: self.turns_elapsed,
            end_reason,
            final_stats: self.engine.stats(),
        };
        self.engine.logger().minimal(&format!(
            "{} ended after {} turns: {:?}, winners {:?}",
            self.engine.game_id(),
            result.turns_played,
            result.end_reason,
            result.winners
        ));

        for controller in controllers.iter_mut() {
            let view = self.engine.get_game_state(Some(controller.player_id()));
            controller.on_game_end(&view);
        }

        Ok(result)
    }

    /// Give the first seat with something to do a chance to act
    ///
    /// Seats whose action is rejected are skipped in favour of later seats.
    /// Returns false when no seat made progress.
    fn step(&mut self, controllers: &mut [Box<dyn PlayerController + '_>], order: &[usize]) -> bool {
        for &idx in order {
            if self.turns_elapsed >= self.max_turns {
                return false;
            }
            let controller = &mut controllers[idx];
            let id: PlayerId = controller.player_id().clone();
            let alive = self.engine.state().player(&id).map(|p| p.alive).unwrap_or(false);
            if !alive {
                continue;
            }

            let valid = self.engine.get_valid_actions(&id);
            if valid.iter().all(|a| *a == ActionType::Observe) {
                continue;
            }

            let view = self.engine.get_game_state(Some(&id));
            let action = controller.choose_action(&view, &valid);
            if action == Action::Observe {
                continue;
            }

            self.turns_elapsed += 1;
            let update = self.engine.perform_action(&id, &action);
            let success = update.success;
            controller.on_game_update(&update);
            if success {
                return true;
            }
        }
        false
    }
}
