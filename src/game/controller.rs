//! Player controller trait
//!
//! This module defines the interface between the engine and player
//! implementations (bots, humans behind a UI, remote agents). The
//! orchestrator hands each controller its own filtered view of the game and
//! the list of legal action kinds; the controller answers with a concrete
//! [`Action`].

use crate::core::{PlayerId, Role};
use crate::engine::GameUpdate;
use crate::game::{Action, ActionType, GameState, Phase, PowerType};

/// Player controller trait
///
/// Implement this trait to create AI players or connect to a UI.
pub trait PlayerController {
    /// The seat this controller plays
    fn player_id(&self) -> &PlayerId;

    /// Choose an action
    ///
    /// `view` is already filtered for this player. `valid_actions` always
    /// contains Observe; returning an action whose kind is not listed is
    /// allowed but will be rejected by the engine.
    fn choose_action(&mut self, view: &GameState, valid_actions: &[ActionType]) -> Action;

    /// Called once before the first action
    fn on_game_start(&mut self, _view: &GameState) {}

    /// Called after every action this controller submits
    fn on_game_update(&mut self, _update: &GameUpdate) {}

    /// Called when the game ends (for cleanup/logging)
    fn on_game_end(&mut self, _view: &GameState) {}
}

/// Did `id`'s team win? Uses the true role, so pass an unfiltered state
/// or the player's own view (which always shows their own role).
pub fn is_winner(view: &GameState, id: &PlayerId) -> bool {
    view.player(id)
        .map(|p| view.winners.contains(&p.role()))
        .unwrap_or(false)
}

/// Legal targets for a nomination (eligible seats, as far as `view` shows)
pub fn nomination_targets(view: &GameState) -> Vec<PlayerId> {
    view.eligible_engineers().map(|p| p.id.clone()).collect()
}

/// Legal targets for `power` used by `actor`
pub fn power_targets(view: &GameState, actor: &PlayerId, power: PowerType) -> Vec<PlayerId> {
    view.alive_players()
        .filter(|p| match power {
            PowerType::ViewAllegiance => &p.id != actor,
            PowerType::Eliminate => {
                &p.id != actor
                    && !(view.current_phase == Phase::Research
                        && (view.is_director(&p.id) || view.is_engineer(&p.id)))
            }
            PowerType::ChooseDirector => true,
        })
        .map(|p| p.id.clone())
        .collect()
}

/// Unspent powers `actor` holds (only their own appear in a filtered view)
pub fn held_powers(view: &GameState, actor: &PlayerId) -> Vec<PowerType> {
    view.powers_for(actor).map(|g| g.power).collect()
}

/// Roles `actor` can see other than Safety (co-conspirators)
pub fn known_allies(view: &GameState, actor: &PlayerId) -> Vec<(PlayerId, Role)> {
    view.players
        .iter()
        .filter(|p| &p.id != actor && p.role() != Role::Safety)
        .map(|p| (p.id.clone(), p.role()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::tests::five_player_state;

    #[test]
    fn test_known_allies_from_filtered_view() {
        let state = five_player_state();
        let agi_view = state.view_for(&PlayerId::new("p5"));
        assert_eq!(
            known_allies(&agi_view, &PlayerId::new("p5")),
            vec![(PlayerId::new("p4"), Role::Accelerationist)]
        );
        let safety_view = state.view_for(&PlayerId::new("p1"));
        assert!(known_allies(&safety_view, &PlayerId::new("p1")).is_empty());
    }

    #[test]
    fn test_power_targets_exclude_self() {
        let state = five_player_state();
        let me = PlayerId::new("p1");
        let targets = power_targets(&state, &me, PowerType::ViewAllegiance);
        assert_eq!(targets.len(), 4);
        assert!(!targets.contains(&me));
        assert_eq!(power_targets(&state, &me, PowerType::ChooseDirector).len(), 5);
    }

    #[test]
    fn test_is_winner() {
        let mut state = five_player_state();
        state.winners = vec![Role::Safety];
        assert!(is_winner(&state, &PlayerId::new("p1")));
        assert!(!is_winner(&state, &PlayerId::new("p5")));
    }
}
