//! Zero controller for testing and automation
//!
//! Always takes the first meaningful action offered, with the first legal
//! parameters: nominate the first eligible seat, vote yes, discard and
//! publish the first paper, refuse vetoes. Fully deterministic, which makes
//! it useful for benchmarks and reproducible scripted games.

use crate::core::PlayerId;
use crate::game::controller::{held_powers, nomination_targets, power_targets, PlayerController};
use crate::game::{Action, ActionType, GameState};

pub struct ZeroController {
    player_id: PlayerId,
}

impl ZeroController {
    pub fn new(player_id: PlayerId) -> Self {
        ZeroController { player_id }
    }

    fn first_params(&self, view: &GameState, action_type: ActionType) -> Option<Action> {
        let action = match action_type {
            ActionType::Observe => Action::Observe,
            ActionType::Nominate => Action::Nominate {
                target_id: nomination_targets(view).into_iter().next()?,
            },
            ActionType::CallEmergencySafety => Action::CallEmergencySafety,
            ActionType::VoteEmergency => Action::VoteEmergency { vote: true },
            ActionType::VoteTeam => Action::VoteTeam { vote: true },
            ActionType::DiscardPaper => Action::DiscardPaper {
                paper_id: view.director_hand().first()?.id.clone(),
            },
            ActionType::PublishPaper => Action::PublishPaper {
                paper_id: view.engineer_hand().first()?.id.clone(),
            },
            ActionType::DeclareVeto => Action::DeclareVeto,
            ActionType::RespondVeto => Action::RespondVeto { agree: false },
            ActionType::UsePower => {
                let power = *held_powers(view, &self.player_id).first()?;
                let target_id = power_targets(view, &self.player_id, power).into_iter().next()?;
                Action::UsePower { power, target_id }
            }
            ActionType::SendChatMessage => return None,
        };
        Some(action)
    }
}

impl PlayerController for ZeroController {
    fn player_id(&self) -> &PlayerId {
        &self.player_id
    }

    fn choose_action(&mut self, view: &GameState, valid_actions: &[ActionType]) -> Action {
        valid_actions
            .iter()
            .filter(|a| **a != ActionType::Observe)
            .find_map(|a| self.first_params(view, *a))
            .unwrap_or(Action::Observe)
    }
}
