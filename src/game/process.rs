//! Action processor: applies validated actions to the state machine

use crate::core::{PaperId, PlayerId};
use crate::game::actions::{Action, PowerType};
use crate::game::rules::MAX_FAILED_PROPOSALS;
use crate::game::state::Hand;
use crate::game::{GameState, Phase, VetoState};
use crate::{GameError, Result};
use serde_json::json;

/// Papers the director draws on entering Research
const DIRECTOR_DRAW: usize = 3;

impl GameState {
    /// Validate then apply `action`, followed by a win-condition check
    ///
    /// The turn counter is not touched here; the engine increments it per
    /// attempt. On a validation error nothing is mutated. An `InvalidState`
    /// error means the state may be partially updated and the caller should
    /// restore its checkpoint.
    pub fn apply_action(&mut self, player_id: &PlayerId, action: &Action) -> Result<()> {
        self.validate_action(player_id, action)?;

        match action {
            Action::Observe => self.log_action(player_id, json!({ "action": "observe" })),
            Action::Nominate { target_id } => self.process_nominate(player_id, target_id),
            Action::CallEmergencySafety => {
                self.emergency_safety_called = true;
                self.log_action(player_id, json!({ "action": "call_emergency_safety" }));
            }
            Action::VoteEmergency { vote } => self.process_vote_emergency(player_id, *vote),
            Action::VoteTeam { vote } => self.process_vote_team(player_id, *vote),
            Action::DiscardPaper { paper_id } => self.process_discard(player_id, paper_id)?,
            Action::PublishPaper { paper_id } => self.process_publish(player_id, paper_id)?,
            Action::DeclareVeto => {
                self.veto_state = VetoState::Declared;
                self.log_action(player_id, json!({ "action": "declare_veto" }));
            }
            Action::RespondVeto { agree } => self.process_respond_veto(player_id, *agree),
            Action::UsePower { power, target_id } => {
                self.process_use_power(player_id, *power, target_id)?
            }
            Action::SendChatMessage { message } => self.log_chat(player_id, message),
        }

        self.resolve_win_conditions();
        Ok(())
    }

    fn process_nominate(&mut self, player_id: &PlayerId, target_id: &PlayerId) {
        self.nominated_engineer_id = Some(target_id.clone());
        self.log_action(
            player_id,
            json!({ "action": "nominate", "target_id": target_id }),
        );
    }

    fn process_vote_emergency(&mut self, player_id: &PlayerId, vote: bool) {
        self.emergency_votes.insert(player_id.clone(), vote);
        self.log_action(player_id, json!({ "action": "vote_emergency", "vote": vote }));
        self.resolve_open_votes(true);
    }

    fn process_vote_team(&mut self, player_id: &PlayerId, vote: bool) {
        self.team_votes.insert(player_id.clone(), vote);
        self.log_action(player_id, json!({ "action": "vote_team", "vote": vote }));
        self.resolve_open_votes(false);
    }

    /// Tally every TeamProposal vote that is now complete
    ///
    /// A vote completes when each alive player has cast one, so this runs
    /// after every ballot and after an elimination. `emergency_open` says
    /// whether the emergency vote was still collecting before the action;
    /// a finished emergency vote is applied exactly once. The team vote is
    /// tallied only after any emergency vote has resolved.
    fn resolve_open_votes(&mut self, emergency_open: bool) {
        if self.current_phase != Phase::TeamProposal {
            return;
        }

        if emergency_open && self.emergency_vote_complete() {
            let result = self.emergency_vote_passes();
            if result {
                self.emergency_safety_active = true;
            }
            let votes = json!(self.emergency_votes);
            self.log_vote_completed("emergency_safety", result, votes);
        }

        let team_ready = self.nominated_engineer_id.is_some()
            && (!self.emergency_safety_called || self.emergency_vote_complete())
            && self.team_vote_complete();
        if !team_ready {
            return;
        }
        let result = self.team_vote_passes();
        let votes = json!(self.team_votes);
        self.log_vote_completed("team", result, votes);

        if result {
            self.failed_proposals = 0;
            self.start_research();
            self.resolve_win_conditions();
        } else {
            self.register_failed_proposal();
        }
    }

    /// Shared failure path for rejected teams and agreed vetoes
    ///
    /// The third failure auto-publishes and returns to TeamProposal with the
    /// same director; earlier failures rotate the director.
    fn register_failed_proposal(&mut self) {
        self.failed_proposals += 1;
        if self.failed_proposals >= MAX_FAILED_PROPOSALS {
            self.auto_publish();
            if !self.resolve_win_conditions() {
                self.reset_to_team_proposal();
            }
        } else if self.current_phase == Phase::Research {
            self.reset_to_team_proposal();
        } else {
            self.current_director_index = self.next_director_index();
            self.reset_round_state();
        }
    }

    fn start_research(&mut self) {
        self.current_phase = Phase::Research;
        self.veto_state = VetoState::Idle;

        let draw = DIRECTOR_DRAW.min(self.deck.len());
        let hand: Hand = self.deck.drain(..draw).collect();
        self.director_cards = Some(hand);
        self.log_phase_transition(Phase::TeamProposal, Phase::Research);

        // An emptied deck can end the game before anyone discards
        if self.deck.is_empty() {
            self.resolve_win_conditions();
        }
    }

    fn process_discard(&mut self, player_id: &PlayerId, paper_id: &PaperId) -> Result<()> {
        let mut hand = self
            .director_cards
            .take()
            .ok_or_else(|| GameError::fault("No director cards available"))?;
        let Some(pos) = hand.iter().position(|p| &p.id == paper_id) else {
            self.director_cards = Some(hand);
            return Err(GameError::fault(format!("Paper {paper_id} not found")));
        };
        let discarded = hand.remove(pos);
        self.discard.push(discarded);
        self.engineer_cards = Some(hand);

        self.log_action(
            player_id,
            json!({ "action": "discard_paper", "paper_id": paper_id }),
        );
        Ok(())
    }

    fn process_publish(&mut self, player_id: &PlayerId, paper_id: &PaperId) -> Result<()> {
        self.publish_paper(player_id, paper_id)?;
        self.log_action(
            player_id,
            json!({ "action": "publish_paper", "paper_id": paper_id }),
        );
        if !self.resolve_win_conditions() {
            self.prepare_next_round(player_id);
        }
        Ok(())
    }

    fn process_respond_veto(&mut self, player_id: &PlayerId, agree: bool) {
        self.log_action(player_id, json!({ "action": "respond_veto", "agree": agree }));

        if agree {
            let director = self.director_cards.take().unwrap_or_default();
            let engineer = self.engineer_cards.take().unwrap_or_default();
            self.discard.extend(director);
            self.discard.extend(engineer);
            self.register_failed_proposal();
        } else {
            self.veto_state = VetoState::Refused;
        }
    }

    fn process_use_power(
        &mut self,
        player_id: &PlayerId,
        power: PowerType,
        target_id: &PlayerId,
    ) -> Result<()> {
        let grant = self.consume_power(player_id, power)?;
        let emergency_open = self.emergency_safety_called && !self.emergency_vote_complete();
        match power {
            PowerType::ViewAllegiance => self.view_allegiance(player_id, target_id)?,
            PowerType::Eliminate => self.eliminate_player(target_id)?,
            PowerType::ChooseDirector => self.choose_director(target_id)?,
        }
        self.log_action(
            player_id,
            json!({
                "action": "use_power",
                "power_type": power,
                "target_id": target_id,
                "power_level": grant.threshold,
            }),
        );

        // The dead no longer count towards vote completion
        if power == PowerType::Eliminate && !self.resolve_win_conditions() {
            self.resolve_open_votes(emergency_open);
        }
        Ok(())
    }

    fn reset_to_team_proposal(&mut self) {
        let from = self.current_phase;
        self.current_phase = Phase::TeamProposal;
        self.reset_round_state();
        if from != Phase::TeamProposal {
            self.log_phase_transition(from, Phase::TeamProposal);
        }
    }

    /// After a publication that did not end the game
    fn prepare_next_round(&mut self, engineer_id: &PlayerId) {
        self.current_director_index = self.next_director_index();
        self.reset_engineer_eligibility(Some(engineer_id));
        self.reset_to_team_proposal();
        self.round_number += 1;
    }
}
