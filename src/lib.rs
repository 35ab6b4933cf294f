//! Secret AGI - rules engine for a hidden-role social deduction game
//!
//! The engine is a deterministic state machine over a single [`GameState`]:
//! actions are validated and applied, win conditions are evaluated after
//! every mutation, and each player receives a filtered view of the shared
//! hidden state. Persistence and recovery sit behind the async
//! [`storage::GameStore`] contract.

pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod game;
pub mod recovery;
pub mod session;
pub mod storage;
pub mod tournament;

pub use config::EngineSettings;
pub use engine::{GameEngine, GameUpdate, SimulationSummary};
pub use error::{GameError, Result};
pub use game::{Action, ActionType, GameConfig, GameState, Phase, PowerType};
