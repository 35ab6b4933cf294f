//! Core domain types: identifiers, papers, players and roles

pub mod paper;
pub mod player;
pub mod types;

pub use paper::{create_standard_deck, Paper, STANDARD_DECK_SIZE};
pub use player::{get_role_distribution, Allegiance, Player, Role, RoleDistribution};
pub use types::{GameId, PaperId, PlayerId};
