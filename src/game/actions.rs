//! Player actions and their validation
//!
//! [`Action`] is the typed request a player submits; [`ActionType`] is its
//! fieldless discriminant, which is what `valid_actions` reports. Validation
//! never mutates state: it either accepts the action or returns
//! [`GameError::InvalidAction`] carrying the user-visible reason.

use crate::core::{PaperId, PlayerId};
use crate::game::{GameState, Phase, VetoState};
use crate::{GameError, Result};
use serde::{Deserialize, Serialize};

/// Director powers that require a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerType {
    /// Capability 3 (9-10 players) and 6: privately learn a player's allegiance
    ViewAllegiance,
    /// Capability 9: pick the current director
    ChooseDirector,
    /// Capability 11 (9-10 players): eliminate a player
    Eliminate,
}

impl PowerType {
    pub fn as_str(self) -> &'static str {
        match self {
            PowerType::ViewAllegiance => "view_allegiance",
            PowerType::ChooseDirector => "choose_director",
            PowerType::Eliminate => "eliminate",
        }
    }
}

impl std::fmt::Display for PowerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A player action with its parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Observe,
    Nominate { target_id: PlayerId },
    CallEmergencySafety,
    VoteEmergency { vote: bool },
    VoteTeam { vote: bool },
    DiscardPaper { paper_id: PaperId },
    PublishPaper { paper_id: PaperId },
    DeclareVeto,
    RespondVeto { agree: bool },
    UsePower { power: PowerType, target_id: PlayerId },
    SendChatMessage { message: String },
}

/// Action kinds without parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Observe,
    Nominate,
    CallEmergencySafety,
    VoteEmergency,
    VoteTeam,
    DiscardPaper,
    PublishPaper,
    DeclareVeto,
    RespondVeto,
    UsePower,
    SendChatMessage,
}

impl ActionType {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::Observe => "observe",
            ActionType::Nominate => "nominate",
            ActionType::CallEmergencySafety => "call_emergency_safety",
            ActionType::VoteEmergency => "vote_emergency",
            ActionType::VoteTeam => "vote_team",
            ActionType::DiscardPaper => "discard_paper",
            ActionType::PublishPaper => "publish_paper",
            ActionType::DeclareVeto => "declare_veto",
            ActionType::RespondVeto => "respond_veto",
            ActionType::UsePower => "use_power",
            ActionType::SendChatMessage => "send_chat_message",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Action {
    pub fn action_type(&self) -> ActionType {
        match self {
            Action::Observe => ActionType::Observe,
            Action::Nominate { .. } => ActionType::Nominate,
            Action::CallEmergencySafety => ActionType::CallEmergencySafety,
            Action::VoteEmergency { .. } => ActionType::VoteEmergency,
            Action::VoteTeam { .. } => ActionType::VoteTeam,
            Action::DiscardPaper { .. } => ActionType::DiscardPaper,
            Action::PublishPaper { .. } => ActionType::PublishPaper,
            Action::DeclareVeto => ActionType::DeclareVeto,
            Action::RespondVeto { .. } => ActionType::RespondVeto,
            Action::UsePower { .. } => ActionType::UsePower,
            Action::SendChatMessage { .. } => ActionType::SendChatMessage,
        }
    }

    /// JSON form of the action (`{"action": "...", ...params}`)
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Nominate { target_id } => write!(f, "nominate {target_id}"),
            Action::VoteEmergency { vote } | Action::VoteTeam { vote } => {
                write!(f, "{} {}", self.action_type(), if *vote { "yes" } else { "no" })
            }
            Action::DiscardPaper { paper_id } | Action::PublishPaper { paper_id } => {
                write!(f, "{} {paper_id}", self.action_type())
            }
            Action::RespondVeto { agree } => {
                write!(f, "respond_veto {}", if *agree { "agree" } else { "refuse" })
            }
            Action::UsePower { power, target_id } => write!(f, "use_power {power} on {target_id}"),
            Action::SendChatMessage { message } => write!(f, "chat {message:?}"),
            other => f.write_str(other.action_type().as_str()),
        }
    }
}

impl GameState {
    /// Actions `player_id` may take right now
    ///
    /// Observe is always listed. Chat is accepted by validation but never
    /// listed, so an empty list (beyond Observe) means the player is idle.
    pub fn valid_actions(&self, player_id: &PlayerId) -> Vec<ActionType> {
        let mut actions = vec![ActionType::Observe];

        let Some(player) = self.player(player_id) else {
            return actions;
        };
        if !player.alive || self.is_game_over {
            return actions;
        }

        match self.current_phase {
            Phase::TeamProposal => {
                if self.is_director(player_id) && self.nominated_engineer_id.is_none() {
                    actions.push(ActionType::Nominate);
                }
                if self.emergency_safety_available() && !self.emergency_safety_called {
                    actions.push(ActionType::CallEmergencySafety);
                }
                if self.emergency_safety_called && !self.emergency_votes.contains_key(player_id) {
                    actions.push(ActionType::VoteEmergency);
                }
                if self.nominated_engineer_id.is_some()
                    && !self.team_votes.contains_key(player_id)
                    && (!self.emergency_safety_called || self.emergency_vote_complete())
                {
                    actions.push(ActionType::VoteTeam);
                }
            }
            Phase::Research => {
                let director_holding = !self.director_hand().is_empty();
                if self.is_director(player_id) {
                    if self.veto_state == VetoState::Declared {
                        actions.push(ActionType::RespondVeto);
                    } else if director_holding {
                        actions.push(ActionType::DiscardPaper);
                    }
                }
                if self.is_engineer(player_id)
                    && !self.engineer_hand().is_empty()
                    && !director_holding
                    && self.veto_state != VetoState::Declared
                {
                    actions.push(ActionType::PublishPaper);
                    if self.veto_unlocked && self.veto_state == VetoState::Idle {
                        actions.push(ActionType::DeclareVeto);
                    }
                }
            }
            Phase::GameOver => {}
        }

        if self.powers_for(player_id).next().is_some() {
            actions.push(ActionType::UsePower);
        }

        actions
    }

    /// Check `action` against the current state without mutating it
    pub fn validate_action(&self, player_id: &PlayerId, action: &Action) -> Result<()> {
        let player = self
            .player(player_id)
            .ok_or_else(|| GameError::invalid(format!("Player {player_id} not found")))?;

        if matches!(action, Action::Observe) {
            return Ok(());
        }
        if !player.alive {
            return Err(GameError::invalid(format!("Player {player_id} is eliminated")));
        }
        if self.is_game_over || self.current_phase == Phase::GameOver {
            return Err(GameError::invalid("Game is over"));
        }

        match action {
            Action::SendChatMessage { message } => {
                if message.trim().is_empty() {
                    return Err(GameError::invalid("Message cannot be empty"));
                }
                Ok(())
            }
            Action::UsePower { power, target_id } => {
                self.validate_use_power(player_id, *power, target_id)
            }
            _ => match self.current_phase {
                Phase::TeamProposal => self.validate_team_proposal(player_id, action),
                Phase::Research => self.validate_research(player_id, action),
                Phase::GameOver => Err(GameError::invalid("Game is over")),
            },
        }
    }

    fn validate_team_proposal(&self, player_id: &PlayerId, action: &Action) -> Result<()> {
        match action {
            Action::Nominate { target_id } => {
                if !self.is_director(player_id) {
                    return Err(GameError::invalid("Only the director can nominate"));
                }
                if self.nominated_engineer_id.is_some() {
                    return Err(GameError::invalid("Engineer already nominated for this round"));
                }
                let eligible = self
                    .player(target_id)
                    .map(|p| p.is_eligible_engineer())
                    .unwrap_or(false);
                if !eligible {
                    return Err(GameError::invalid(format!(
                        "Player {target_id} is not eligible to be engineer"
                    )));
                }
                Ok(())
            }
            Action::CallEmergencySafety => {
                if !self.emergency_safety_available() {
                    return Err(GameError::invalid("Emergency safety conditions not met"));
                }
                if self.emergency_safety_called {
                    return Err(GameError::invalid("Emergency safety already called this round"));
                }
                Ok(())
            }
            Action::VoteEmergency { .. } => {
                if !self.emergency_safety_called {
                    return Err(GameError::invalid("No emergency safety vote in progress"));
                }
                if self.emergency_votes.contains_key(player_id) {
                    return Err(GameError::invalid("Already voted on emergency safety"));
                }
                Ok(())
            }
            Action::VoteTeam { .. } => {
                if self.nominated_engineer_id.is_none() {
                    return Err(GameError::invalid("No engineer nominated yet"));
                }
                if self.emergency_safety_called && !self.emergency_vote_complete() {
                    return Err(GameError::invalid("Must complete emergency safety vote first"));
                }
                if self.team_votes.contains_key(player_id) {
                    return Err(GameError::invalid("Already voted on team"));
                }
                Ok(())
            }
            other => Err(GameError::invalid(format!(
                "Action {} not valid during team proposal phase",
                other.action_type()
            ))),
        }
    }

    fn validate_research(&self, player_id: &PlayerId, action: &Action) -> Result<()> {
        match action {
            Action::DiscardPaper { paper_id } => {
                if !self.is_director(player_id) {
                    return Err(GameError::invalid("Only the director can discard papers"));
                }
                if self.director_hand().is_empty() {
                    return Err(GameError::invalid("No papers to discard"));
                }
                if !self.director_hand().iter().any(|p| &p.id == paper_id) {
                    return Err(GameError::invalid("Paper not in director's hand"));
                }
                Ok(())
            }
            Action::PublishPaper { paper_id } => {
                if !self.is_engineer(player_id) {
                    return Err(GameError::invalid("Only the engineer can publish papers"));
                }
                if self.engineer_hand().is_empty() || !self.director_hand().is_empty() {
                    return Err(GameError::invalid("No papers to publish"));
                }
                if self.veto_state == VetoState::Declared {
                    return Err(GameError::invalid("Waiting for director to respond to veto"));
                }
                if !self.engineer_hand().iter().any(|p| &p.id == paper_id) {
                    return Err(GameError::invalid("Paper not in engineer's hand"));
                }
                Ok(())
            }
            Action::DeclareVeto => {
                if !self.is_engineer(player_id) {
                    return Err(GameError::invalid("Only the engineer can declare veto"));
                }
                if !self.veto_unlocked {
                    return Err(GameError::invalid("Veto power not unlocked"));
                }
                if self.engineer_hand().is_empty() {
                    return Err(GameError::invalid("No papers available for veto"));
                }
                if self.veto_state != VetoState::Idle {
                    return Err(GameError::invalid("Veto already declared this round"));
                }
                Ok(())
            }
            Action::RespondVeto { .. } => {
                if !self.is_director(player_id) {
                    return Err(GameError::invalid("Only the director can respond to veto"));
                }
                if self.veto_state != VetoState::Declared {
                    return Err(GameError::invalid("No veto to respond to"));
                }
                Ok(())
            }
            other => Err(GameError::invalid(format!(
                "Action {} not valid during research phase",
                other.action_type()
            ))),
        }
    }

    fn validate_use_power(&self, player_id: &PlayerId, power: PowerType, target_id: &PlayerId) -> Result<()> {
        if self.powers_for(player_id).next().is_none() {
            return Err(GameError::invalid("Only the director can use powers"));
        }
        if !self.powers_for(player_id).any(|g| g.power == power) {
            return Err(GameError::invalid(format!("No {power} power available")));
        }
        let target = self
            .player(target_id)
            .ok_or_else(|| GameError::invalid(format!("Player {target_id} not found")))?;
        if !target.alive {
            return Err(GameError::invalid(format!("Player {target_id} is eliminated")));
        }
        match power {
            PowerType::ViewAllegiance | PowerType::Eliminate if target_id == player_id => {
                Err(GameError::invalid("Cannot target yourself"))
            }
            PowerType::Eliminate
                if self.current_phase == Phase::Research
                    && (self.is_director(target_id) || self.is_engineer(target_id)) =>
            {
                Err(GameError::invalid(
                    "Cannot eliminate the director or engineer during research",
                ))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::tests::five_player_state;

    fn pid(s: &str) -> PlayerId {
        PlayerId::new(s)
    }

    #[test]
    fn test_action_json_shape() {
        let action = Action::Nominate {
            target_id: pid("p2"),
        };
        let json = action.to_json();
        assert_eq!(json["action"], "nominate");
        assert_eq!(json["target_id"], "p2");
        let back: Action = serde_json::from_value(json).unwrap();
        assert_eq!(back, action);
    }

    #[test]
    fn test_director_can_nominate() {
        let state = five_player_state();
        assert_eq!(
            state.valid_actions(&pid("p1")),
            vec![ActionType::Observe, ActionType::Nominate]
        );
        assert_eq!(state.valid_actions(&pid("p2")), vec![ActionType::Observe]);
    }

    #[test]
    fn test_unknown_player() {
        let state = five_player_state();
        let err = state.validate_action(&pid("ghost"), &Action::CallEmergencySafety);
        assert_eq!(err.unwrap_err().to_string(), "Player ghost not found");
        assert_eq!(state.valid_actions(&pid("ghost")), vec![ActionType::Observe]);
    }

    #[test]
    fn test_non_director_cannot_nominate() {
        let state = five_player_state();
        let err = state
            .validate_action(&pid("p2"), &Action::Nominate { target_id: pid("p3") })
            .unwrap_err();
        assert_eq!(err.to_string(), "Only the director can nominate");
    }

    #[test]
    fn test_last_engineer_not_eligible() {
        let mut state = five_player_state();
        state.players[2].was_last_engineer = true;
        let err = state
            .validate_action(&pid("p1"), &Action::Nominate { target_id: pid("p3") })
            .unwrap_err();
        assert_eq!(err.to_string(), "Player p3 is not eligible to be engineer");
    }

    #[test]
    fn test_emergency_requires_exact_gap() {
        let mut state = five_player_state();
        for (cap, safety, ok) in [(4, 0, true), (5, 0, true), (3, 0, false), (6, 0, false)] {
            state.capability = cap;
            state.safety = safety;
            let result = state.validate_action(&pid("p2"), &Action::CallEmergencySafety);
            assert_eq!(result.is_ok(), ok, "gap {}", cap - safety);
        }
    }

    #[test]
    fn test_team_vote_waits_for_emergency_vote() {
        let mut state = five_player_state();
        state.capability = 4;
        state.nominated_engineer_id = Some(pid("p2"));
        state.emergency_safety_called = true;
        let err = state
            .validate_action(&pid("p3"), &Action::VoteTeam { vote: true })
            .unwrap_err();
        assert_eq!(err.to_string(), "Must complete emergency safety vote first");
        assert!(!state.valid_actions(&pid("p3")).contains(&ActionType::VoteTeam));
        assert!(state.valid_actions(&pid("p3")).contains(&ActionType::VoteEmergency));
    }

    #[test]
    fn test_eliminated_player_may_only_observe() {
        let mut state = five_player_state();
        state.players[1].alive = false;
        assert!(state.validate_action(&pid("p2"), &Action::Observe).is_ok());
        let err = state
            .validate_action(&pid("p2"), &Action::SendChatMessage { message: "hi".into() })
            .unwrap_err();
        assert_eq!(err.to_string(), "Player p2 is eliminated");
    }

    #[test]
    fn test_game_over_blocks_actions() {
        let mut state = five_player_state();
        state.is_game_over = true;
        state.current_phase = Phase::GameOver;
        assert!(state.validate_action(&pid("p1"), &Action::Observe).is_ok());
        let err = state
            .validate_action(&pid("p1"), &Action::Nominate { target_id: pid("p2") })
            .unwrap_err();
        assert_eq!(err.to_string(), "Game is over");
    }

    #[test]
    fn test_wrong_phase_action() {
        let state = five_player_state();
        let err = state.validate_action(&pid("p1"), &Action::DeclareVeto).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Action declare_veto not valid during team proposal phase"
        );
    }

    #[test]
    fn test_use_power_requires_grant() {
        let state = five_player_state();
        let err = state
            .validate_action(
                &pid("p1"),
                &Action::UsePower {
                    power: PowerType::ViewAllegiance,
                    target_id: pid("p2"),
                },
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "Only the director can use powers");
    }
}
