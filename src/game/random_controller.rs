//! Random controller for testing and baseline gameplay
//!
//! Picks uniformly among the meaningful actions it is offered, then fills in
//! random legal parameters. Vote and veto decisions are biased by a
//! [`VoteBias`].

use crate::core::PlayerId;
use crate::game::controller::{held_powers, nomination_targets, power_targets, PlayerController};
use crate::game::{Action, ActionType, GameState};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Probabilities used for yes/no decisions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoteBias {
    pub team_yes: f64,
    pub emergency_yes: f64,
    pub veto_agree: f64,
}

impl VoteBias {
    /// Coin flips for everything
    pub const UNIFORM: VoteBias = VoteBias {
        team_yes: 0.5,
        emergency_yes: 0.5,
        veto_agree: 0.5,
    };

    /// Leans toward approving teams and refusing vetoes
    pub const COOPERATIVE: VoteBias = VoteBias {
        team_yes: 0.75,
        emergency_yes: 0.5,
        veto_agree: 0.33,
    };
}

impl Default for VoteBias {
    fn default() -> Self {
        VoteBias::COOPERATIVE
    }
}

/// Pick a random meaningful action from `valid_actions` with random parameters
///
/// Returns Observe when nothing else is offered or when the chosen kind has
/// no legal parameters in `view`.
pub fn random_action<R: Rng + ?Sized>(
    view: &GameState,
    actor: &PlayerId,
    valid_actions: &[ActionType],
    rng: &mut R,
    bias: VoteBias,
) -> Action {
    let meaningful: Vec<ActionType> = valid_actions
        .iter()
        .copied()
        .filter(|a| *a != ActionType::Observe)
        .collect();
    match meaningful.choose(rng) {
        Some(&action_type) => random_params(view, actor, action_type, rng, bias),
        None => Action::Observe,
    }
}

/// Random legal parameters for `action_type`
pub fn random_params<R: Rng + ?Sized>(
    view: &GameState,
    actor: &PlayerId,
    action_type: ActionType,
    rng: &mut R,
    bias: VoteBias,
) -> Action {
    match action_type {
        ActionType::Observe => Action::Observe,
        ActionType::Nominate => match nomination_targets(view).choose(rng) {
            Some(target) => Action::Nominate {
                target_id: target.clone(),
            },
            None => Action::Observe,
        },
        ActionType::CallEmergencySafety => Action::CallEmergencySafety,
        ActionType::VoteEmergency => Action::VoteEmergency {
            vote: rng.gen_bool(bias.emergency_yes),
        },
        ActionType::VoteTeam => Action::VoteTeam {
            vote: rng.gen_bool(bias.team_yes),
        },
        ActionType::DiscardPaper => match view.director_hand().choose(rng) {
            Some(paper) => Action::DiscardPaper {
                paper_id: paper.id.clone(),
            },
            None => Action::Observe,
        },
        ActionType::PublishPaper => match view.engineer_hand().choose(rng) {
            Some(paper) => Action::PublishPaper {
                paper_id: paper.id.clone(),
            },
            None => Action::Observe,
        },
        ActionType::DeclareVeto => Action::DeclareVeto,
        ActionType::RespondVeto => Action::RespondVeto {
            agree: rng.gen_bool(bias.veto_agree),
        },
        ActionType::UsePower => {
            let Some(&power) = held_powers(view, actor).choose(rng) else {
                return Action::Observe;
            };
            match power_targets(view, actor, power).choose(rng) {
                Some(target) => Action::UsePower {
                    power,
                    target_id: target.clone(),
                },
                None => Action::Observe,
            }
        }
        ActionType::SendChatMessage => Action::SendChatMessage {
            message: format!("Random message from {actor}"),
        },
    }
}

/// A controller that makes random choices
pub struct RandomController {
    player_id: PlayerId,
    rng: StdRng,
    bias: VoteBias,
}

impl RandomController {
    /// Create a new random controller with an entropy-seeded RNG
    pub fn new(player_id: PlayerId) -> Self {
        RandomController {
            player_id,
            rng: StdRng::from_entropy(),
            bias: VoteBias::default(),
        }
    }

    /// Create a random controller with a seeded RNG (for deterministic testing)
    pub fn with_seed(player_id: PlayerId, seed: u64) -> Self {
        RandomController {
            player_id,
            rng: StdRng::seed_from_u64(seed),
            bias: VoteBias::default(),
        }
    }

    pub fn with_bias(mut self, bias: VoteBias) -> Self {
        self.bias = bias;
        self
    }
}

impl PlayerController for RandomController {
    fn player_id(&self) -> &PlayerId {
        &self.player_id
    }

    fn choose_action(&mut self, view: &GameState, valid_actions: &[ActionType]) -> Action {
        random_action(view, &self.player_id, valid_actions, &mut self.rng, self.bias)
    }
}
