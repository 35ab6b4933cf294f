//! Game phases and the veto sub-state of Research

use serde::{Deserialize, Serialize};

/// Top-level state machine phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Director nominates, players vote (and may call emergency safety)
    #[default]
    TeamProposal,
    /// Director discards one paper, engineer publishes one
    Research,
    /// Terminal
    GameOver,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        self == Phase::GameOver
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::TeamProposal => write!(f, "TeamProposal"),
            Phase::Research => write!(f, "Research"),
            Phase::GameOver => write!(f, "GameOver"),
        }
    }
}

/// Progress of a veto within one Research phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VetoState {
    /// No veto this round
    #[default]
    Idle,
    /// Engineer declared a veto; waiting on the director
    Declared,
    /// Director refused; engineer must publish
    Refused,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_display_and_serde() {
        assert_eq!(Phase::TeamProposal.to_string(), "TeamProposal");
        assert_eq!(
            serde_json::to_string(&Phase::TeamProposal).unwrap(),
            "\"team_proposal\""
        );
        assert!(Phase::GameOver.is_terminal());
        assert!(!Phase::Research.is_terminal());
    }
}
