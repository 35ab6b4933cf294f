//! Research papers and the standard deck

use crate::core::PaperId;
use serde::{Deserialize, Serialize};

/// Number of papers in a standard deck
pub const STANDARD_DECK_SIZE: usize = 17;

/// (capability, safety, copies) for every paper kind in the standard deck
const STANDARD_DECK: &[(u32, u32, usize)] = &[
    (0, 2, 3),
    (1, 2, 2),
    (1, 3, 2),
    (1, 1, 2),
    (2, 2, 2),
    (3, 0, 2),
    (2, 1, 2),
    (3, 1, 2),
];

/// A research card. Papers never change; they only move between deck, hands and discard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Paper {
    pub id: PaperId,
    pub capability: u32,
    pub safety: u32,
}

impl Paper {
    pub fn new(id: impl Into<PaperId>, capability: u32, safety: u32) -> Self {
        Paper {
            id: id.into(),
            capability,
            safety,
        }
    }
}

impl std::fmt::Display for Paper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (C+{}, S+{})", self.id, self.capability, self.safety)
    }
}

/// Build the unshuffled 17-paper deck
pub fn create_standard_deck() -> Vec<Paper> {
    STANDARD_DECK
        .iter()
        .flat_map(|&(capability, safety, copies)| {
            std::iter::repeat((capability, safety)).take(copies)
        })
        .enumerate()
        .map(|(i, (capability, safety))| Paper::new(PaperId::numbered(i), capability, safety))
        .collect()
}
