//! Game state, rules and turn structure

pub mod actions;
pub mod controller;
pub mod events;
pub mod filter;
pub mod game_loop;
pub mod logger;
pub mod phase;
pub mod process;
pub mod random_controller;
pub mod rules;
pub mod snapshot;
pub mod state;
pub mod state_hash;
pub mod zero_controller;

pub use actions::{Action, ActionType, PowerType};
pub use controller::PlayerController;
pub use events::{EventType, GameEvent};
pub use filter::{PublicInfo, PublicPlayer};
pub use game_loop::{GameEndReason, GameLoop, GameResult};
pub use logger::{GameLogger, LogEntry, OutputFormat, OutputMode, VerbosityLevel};
pub use phase::{Phase, VetoState};
pub use random_controller::{RandomController, VoteBias};
pub use rules::{Victory, WinReason};
pub use snapshot::{GameSnapshot, SnapshotError};
pub use state::{GameConfig, GameState, PowerGrant};
pub use state_hash::{compute_state_hash, format_hash};
pub use zero_controller::ZeroController;
