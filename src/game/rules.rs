//! Rules evaluator
//!
//! Pure checks over [`GameState`] (win conditions, vote tallies, power
//! thresholds, emergency eligibility) plus the "apply consequence" half of
//! the rules: publication, auto-publish and power effects, which mutate the
//! board and append events as their designed side effect.

use crate::core::{Paper, PaperId, PlayerId, Role};
use crate::game::actions::PowerType;
use crate::game::state::PowerGrant;
use crate::game::{GameState, Phase};
use crate::{GameError, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;

/// Failed proposals that force an auto-publish
pub const MAX_FAILED_PROPOSALS: u32 = 3;

/// Why a game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinReason {
    AgiEliminated,
    CapabilityTenContained,
    SafetyFifteen,
    CapabilityFifteen,
    CapabilityGap,
    AgiEngineer,
    DeckExhausted,
}

impl WinReason {
    pub fn description(self) -> &'static str {
        match self {
            WinReason::AgiEliminated => "AGI eliminated",
            WinReason::CapabilityTenContained => "safety kept pace at capability 10",
            WinReason::SafetyFifteen => "safety reached 15",
            WinReason::CapabilityFifteen => "capability reached 15 with safety below 10",
            WinReason::CapabilityGap => "capability lead of 6 or more",
            WinReason::AgiEngineer => "AGI became engineer at capability 8+",
            WinReason::DeckExhausted => "deck exhausted",
        }
    }
}

/// Outcome of a win-condition check that ended the game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Victory {
    pub winners: Vec<Role>,
    pub reason: WinReason,
}

impl Victory {
    fn safety(reason: WinReason) -> Self {
        Victory {
            winners: vec![Role::Safety],
            reason,
        }
    }

    fn acceleration(reason: WinReason) -> Self {
        Victory {
            winners: vec![Role::Accelerationist, Role::Agi],
            reason,
        }
    }
}

/// Capability thresholds crossed going from `old` to `new`, ascending
///
/// 6, 9, 10 and 12 always count; 3 and 11 only at 9-10 players.
pub fn crossed_thresholds(old: u32, new: u32, player_count: usize) -> SmallVec<[u32; 6]> {
    let large_game = player_count >= 9;
    [3, 6, 9, 10, 11, 12]
        .into_iter()
        .filter(|&t| large_game || (t != 3 && t != 11))
        .filter(|&t| old < t && t <= new)
        .collect()
}

/// Director power granted by a threshold, if any
pub fn director_power_for(threshold: u32) -> Option<PowerType> {
    match threshold {
        3 | 6 => Some(PowerType::ViewAllegiance),
        9 => Some(PowerType::ChooseDirector),
        11 => Some(PowerType::Eliminate),
        _ => None,
    }
}

impl GameState {
    /// Evaluate win conditions in fixed order; the first match wins
    pub fn check_win_conditions(&self) -> Option<Victory> {
        let agi = self.agi_player();
        if agi.map(|p| !p.alive).unwrap_or(false) {
            return Some(Victory::safety(WinReason::AgiEliminated));
        }
        if self.capability == 10 && self.safety >= self.capability {
            return Some(Victory::safety(WinReason::CapabilityTenContained));
        }
        if self.safety >= 15 {
            return Some(Victory::safety(WinReason::SafetyFifteen));
        }
        if self.capability >= 15 && self.safety < 10 {
            return Some(Victory::acceleration(WinReason::CapabilityFifteen));
        }
        if self.capability >= self.safety + 6 {
            return Some(Victory::acceleration(WinReason::CapabilityGap));
        }
        if let (Some(agi), Some(engineer)) = (agi, self.nominated_engineer_id.as_ref()) {
            if self.capability >= 8 && &agi.id == engineer && self.current_phase == Phase::Research {
                return Some(Victory::acceleration(WinReason::AgiEngineer));
            }
        }
        if self.deck.is_empty() {
            return Some(if self.safety >= self.capability {
                Victory::safety(WinReason::DeckExhausted)
            } else {
                Victory::acceleration(WinReason::DeckExhausted)
            });
        }
        None
    }

    /// Run the win check and, on a match, move to GameOver
    ///
    /// Returns true if the game is over (including when it already was).
    pub(crate) fn resolve_win_conditions(&mut self) -> bool {
        if self.is_game_over {
            return true;
        }
        match self.check_win_conditions() {
            Some(victory) => {
                self.end_game(victory);
                true
            }
            None => false,
        }
    }

    fn end_game(&mut self, victory: Victory) {
        self.is_game_over = true;
        self.winners = victory.winners.clone();
        self.current_phase = Phase::GameOver;
        self.pending_powers.clear();
        let winners = victory.winners;
        self.log_game_ended(&winners, victory.reason.description());
    }

    /// Emergency safety may be called only when capability leads by exactly 4 or 5
    pub fn emergency_safety_available(&self) -> bool {
        let gap = i64::from(self.capability) - i64::from(self.safety);
        gap == 4 || gap == 5
    }

    fn vote_complete(&self, votes: &BTreeMap<PlayerId, bool>) -> bool {
        self.alive_players().all(|p| votes.contains_key(&p.id))
    }

    /// Strict majority of alive voters; ties fail
    fn vote_passes(&self, votes: &BTreeMap<PlayerId, bool>) -> bool {
        if !self.vote_complete(votes) {
            return false;
        }
        let (yes, total) = self
            .alive_players()
            .filter_map(|p| votes.get(&p.id))
            .fold((0usize, 0usize), |(yes, total), &v| (yes + usize::from(v), total + 1));
        yes > total / 2
    }

    pub fn team_vote_complete(&self) -> bool {
        self.vote_complete(&self.team_votes)
    }

    pub fn team_vote_passes(&self) -> bool {
        self.vote_passes(&self.team_votes)
    }

    pub fn emergency_vote_complete(&self) -> bool {
        self.vote_complete(&self.emergency_votes)
    }

    pub fn emergency_vote_passes(&self) -> bool {
        self.vote_passes(&self.emergency_votes)
    }

    /// Capability gain for `paper`, consuming an active emergency safety
    fn capability_gain(&mut self, paper: &Paper) -> u32 {
        if self.emergency_safety_active {
            self.emergency_safety_active = false;
            paper.capability.saturating_sub(1)
        } else {
            paper.capability
        }
    }

    /// Engineer publishes `paper_id`; the other engineer paper is discarded
    pub(crate) fn publish_paper(&mut self, engineer_id: &PlayerId, paper_id: &PaperId) -> Result<()> {
        let hand = self.engineer_cards.take().unwrap_or_default();
        let Some(pos) = hand.iter().position(|p| &p.id == paper_id) else {
            self.engineer_cards = Some(hand);
            return Err(GameError::fault(format!(
                "Paper {paper_id} not found in engineer's cards"
            )));
        };
        let paper = hand[pos].clone();

        let old_capability = self.capability;
        let gain = self.capability_gain(&paper);
        self.capability += gain;
        self.safety += paper.safety;

        self.discard.extend(hand);
        self.director_cards = None;

        if let Some(engineer) = self.player_mut(engineer_id) {
            engineer.was_last_engineer = true;
        }
        self.log_paper_published(Some(engineer_id), &paper, gain);
        self.fire_powers(old_capability, self.capability);
        Ok(())
    }

    /// Publish the top of the deck after three failed proposals
    ///
    /// Resets the failure counter and everyone's term limit. Returns false
    /// when the deck is empty (nothing to publish).
    pub(crate) fn auto_publish(&mut self) -> bool {
        let Some(paper) = self.deck.pop_front() else {
            return false;
        };
        let old_capability = self.capability;
        let gain = self.capability_gain(&paper);
        self.capability += gain;
        self.safety += paper.safety;
        self.log_paper_published(None, &paper, gain);
        self.discard.push(paper);

        self.failed_proposals = 0;
        self.reset_engineer_eligibility(None);
        self.fire_powers(old_capability, self.capability);
        true
    }

    /// Clear term limits for everyone except `keep`
    pub(crate) fn reset_engineer_eligibility(&mut self, keep: Option<&PlayerId>) {
        for player in &mut self.players {
            if Some(&player.id) != keep {
                player.was_last_engineer = false;
            }
        }
    }

    fn fire_powers(&mut self, old: u32, new: u32) {
        for threshold in crossed_thresholds(old, new, self.player_count()) {
            match threshold {
                10 => {
                    self.agi_must_reveal = true;
                    self.log_flag_power(10, "AGI must reveal identity when asked");
                }
                12 => {
                    self.veto_unlocked = true;
                    self.log_flag_power(12, "Veto power unlocked for Engineers");
                }
                t => {
                    let (Some(power), Some(director)) =
                        (director_power_for(t), self.current_director_id().cloned())
                    else {
                        continue;
                    };
                    self.log_director_power(t, power, &director);
                    self.pending_powers.push(PowerGrant {
                        threshold: t,
                        power,
                        director_id: director,
                    });
                }
            }
        }
    }

    /// Spend the first matching grant held by `holder`
    pub(crate) fn consume_power(&mut self, holder: &PlayerId, power: PowerType) -> Result<PowerGrant> {
        let pos = self
            .pending_powers
            .iter()
            .position(|g| &g.director_id == holder && g.power == power)
            .ok_or_else(|| GameError::fault(format!("No {power} power held by {holder}")))?;
        Ok(self.pending_powers.remove(pos))
    }

    pub(crate) fn view_allegiance(&mut self, viewer: &PlayerId, target: &PlayerId) -> Result<()> {
        let allegiance = self
            .player(target)
            .map(|p| p.allegiance())
            .ok_or_else(|| GameError::fault(format!("Player {target} not found")))?;
        self.viewed_allegiances
            .entry(viewer.clone())
            .or_default()
            .insert(target.clone(), allegiance);
        self.log_allegiance_viewed(viewer, target, allegiance);
        Ok(())
    }

    pub(crate) fn eliminate_player(&mut self, target: &PlayerId) -> Result<()> {
        let player = self
            .player_mut(target)
            .ok_or_else(|| GameError::fault(format!("Player {target} not found")))?;
        player.alive = false;
        let role = player.role();
        self.log_player_eliminated(target, role);

        // A dead nominee or director would stall the proposal
        if self.current_phase == Phase::TeamProposal && self.is_engineer(target) {
            self.nominated_engineer_id = None;
            self.team_votes.clear();
        }
        if self.is_director(target) {
            self.current_director_index = self.next_director_index();
        }
        self.pending_powers.retain(|g| &g.director_id != target);
        Ok(())
    }

    pub(crate) fn choose_director(&mut self, target: &PlayerId) -> Result<()> {
        let index = self
            .player_index(target)
            .filter(|&i| self.players[i].alive)
            .ok_or_else(|| GameError::fault(format!("Player {target} cannot be director")))?;
        self.current_director_index = index;
        self.log_director_chosen(target);
        Ok(())
    }
}
