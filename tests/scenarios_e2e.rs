//! End-to-end rule scenarios driven through the public engine API

use secret_agi::core::{Paper, PlayerId, Role};
use secret_agi::game::{EventType, PowerGrant, VerbosityLevel};
use secret_agi::{Action, ActionType, GameConfig, GameEngine, Phase, PowerType};
use similar_asserts::assert_eq;
use std::collections::VecDeque;

fn engine(players: usize, seed: u64) -> GameEngine {
    let config = GameConfig::with_default_ids(players, Some(seed)).unwrap();
    let mut engine = GameEngine::create_game(&config).unwrap();
    engine.logger_mut().set_verbosity(VerbosityLevel::Silent);
    engine
}

fn director(engine: &GameEngine) -> PlayerId {
    engine.state().current_director_id().cloned().unwrap()
}

/// An eligible seat that is neither the director nor the AGI
fn safe_nominee(engine: &GameEngine) -> PlayerId {
    let state = engine.state();
    state
        .eligible_engineers()
        .find(|p| p.role() != Role::Agi && !state.is_director(&p.id))
        .map(|p| p.id.clone())
        .unwrap()
}

fn alive_ids(engine: &GameEngine) -> Vec<PlayerId> {
    engine.state().alive_players().map(|p| p.id.clone()).collect()
}

fn all_vote_team(engine: &mut GameEngine, vote: bool) {
    for id in alive_ids(engine) {
        let update = engine.perform_action(&id, &Action::VoteTeam { vote });
        assert!(update.success, "vote by {id} failed: {:?}", update.error);
    }
}

fn nominate(engine: &mut GameEngine, target: &PlayerId) {
    let director = director(engine);
    let update = engine.perform_action(
        &director,
        &Action::Nominate {
            target_id: target.clone(),
        },
    );
    assert!(update.success, "{:?}", update.error);
}

#[test]
fn test_capability_paper_wins_for_acceleration() {
    let mut engine = engine(5, 42);
    {
        let state = engine.state_mut();
        state.capability = 14;
        state.safety = 9;
        state.deck = VecDeque::from(vec![
            Paper::new("dummy_a", 0, 2),
            Paper::new("winning", 1, 0),
            Paper::new("dummy_b", 0, 2),
            Paper::new("filler", 0, 1),
        ]);
    }

    let engineer = safe_nominee(&engine);
    nominate(&mut engine, &engineer);
    all_vote_team(&mut engine, true);
    assert_eq!(engine.state().current_phase, Phase::Research);
    assert_eq!(engine.state().director_hand().len(), 3);

    let director = director(&engine);
    let update = engine.perform_action(
        &director,
        &Action::DiscardPaper {
            paper_id: "dummy_a".into(),
        },
    );
    assert!(update.success, "{:?}", update.error);
    assert_eq!(engine.state().engineer_hand().len(), 2);

    let update = engine.perform_action(
        &engineer,
        &Action::PublishPaper {
            paper_id: "winning".into(),
        },
    );
    assert!(update.success, "{:?}", update.error);

    assert_eq!(engine.state().capability, 15);
    assert!(engine.is_game_over());
    assert_eq!(
        engine.get_winners().to_vec(),
        vec![Role::Accelerationist, Role::Agi]
    );
    assert_eq!(engine.state().current_phase, Phase::GameOver);
    assert!(update
        .events
        .iter()
        .any(|e| e.event_type == EventType::GameEnded));

    // Only Observe is left for anyone
    for id in alive_ids(&engine) {
        assert_eq!(engine.get_valid_actions(&id), vec![ActionType::Observe]);
    }
}

#[test]
fn test_tied_team_vote_fails() {
    let mut engine = engine(5, 7);
    // Four alive players so the vote can split 2-2
    let victim = engine
        .state()
        .players
        .iter()
        .find(|p| p.role() == Role::Safety && !engine.state().is_director(&p.id))
        .map(|p| p.id.clone())
        .unwrap();
    engine.state_mut().player_mut(&victim).unwrap().alive = false;

    let first_director = director(&engine);
    let nominee = safe_nominee(&engine);
    nominate(&mut engine, &nominee);

    let voters = alive_ids(&engine);
    assert_eq!(voters.len(), 4);
    for (i, id) in voters.iter().enumerate() {
        let update = engine.perform_action(id, &Action::VoteTeam { vote: i < 2 });
        assert!(update.success);
    }

    let state = engine.state();
    assert_eq!(state.current_phase, Phase::TeamProposal);
    assert_eq!(state.failed_proposals, 1);
    assert_eq!(state.nominated_engineer_id, None);
    assert!(state.team_votes.is_empty());
    assert_ne!(state.current_director_id(), Some(&first_director));
}

#[test]
fn test_third_failed_vote_auto_publishes() {
    let mut engine = engine(6, 99);
    let top = engine.state().deck.front().cloned().unwrap();

    for _ in 0..3 {
        let nominee = safe_nominee(&engine);
        nominate(&mut engine, &nominee);
        all_vote_team(&mut engine, false);
        if engine.is_game_over() {
            return;
        }
    }

    let state = engine.state();
    assert_eq!(state.failed_proposals, 0);
    assert_eq!(state.capability, top.capability);
    assert_eq!(state.safety, top.safety);
    assert_eq!(state.deck.len(), 16);
    assert!(state.discard.iter().any(|p| p.id == top.id));
    assert!(state.players.iter().all(|p| !p.was_last_engineer));
}

#[test]
fn test_emergency_safety_only_once_per_round() {
    let mut engine = engine(5, 3);
    {
        let state = engine.state_mut();
        state.capability = 5;
        state.safety = 1;
    }
    let caller = alive_ids(&engine)[0].clone();
    let other = alive_ids(&engine)[1].clone();

    assert!(engine
        .get_valid_actions(&caller)
        .contains(&ActionType::CallEmergencySafety));
    let first = engine.perform_action(&caller, &Action::CallEmergencySafety);
    assert!(first.success);

    let second = engine.perform_action(&other, &Action::CallEmergencySafety);
    assert!(!second.success);
    assert_eq!(
        second.error.as_deref(),
        Some("Emergency safety already called this round")
    );
}

#[test]
fn test_emergency_safety_reduces_next_gain() {
    let mut engine = engine(5, 21);
    {
        let state = engine.state_mut();
        state.capability = 4;
        state.safety = 0;
        state.deck = VecDeque::from(vec![
            Paper::new("a", 2, 1),
            Paper::new("b", 0, 3),
            Paper::new("c", 0, 3),
            Paper::new("d", 0, 3),
        ]);
    }
    let caller = alive_ids(&engine)[0].clone();
    assert!(engine.perform_action(&caller, &Action::CallEmergencySafety).success);
    for id in alive_ids(&engine) {
        assert!(engine
            .perform_action(&id, &Action::VoteEmergency { vote: true })
            .success);
    }
    assert!(engine.state().emergency_safety_active);

    let engineer = safe_nominee(&engine);
    nominate(&mut engine, &engineer);
    all_vote_team(&mut engine, true);
    let director = director(&engine);
    assert!(engine
        .perform_action(&director, &Action::DiscardPaper { paper_id: "b".into() })
        .success);
    assert!(engine
        .perform_action(&engineer, &Action::PublishPaper { paper_id: "a".into() })
        .success);

    let state = engine.state();
    assert_eq!(state.capability, 5);
    assert_eq!(state.safety, 1);
    assert!(!state.emergency_safety_active);
}

#[test]
fn test_vetoed_agenda_discards_both_papers() {
    let mut engine = engine(5, 8);
    engine.state_mut().veto_unlocked = true;
    let discard_before = engine.state().discard.len();

    let engineer = safe_nominee(&engine);
    nominate(&mut engine, &engineer);
    all_vote_team(&mut engine, true);
    let director = director(&engine);
    let paper = engine.state().director_hand()[0].id.clone();
    assert!(engine
        .perform_action(&director, &Action::DiscardPaper { paper_id: paper })
        .success);

    assert!(engine
        .get_valid_actions(&engineer)
        .contains(&ActionType::DeclareVeto));
    assert!(engine.perform_action(&engineer, &Action::DeclareVeto).success);
    assert_eq!(
        engine.get_valid_actions(&director),
        vec![ActionType::Observe, ActionType::RespondVeto]
    );
    assert!(engine
        .perform_action(&director, &Action::RespondVeto { agree: true })
        .success);

    let state = engine.state();
    assert_eq!(state.discard.len(), discard_before + 3);
    assert_eq!(state.failed_proposals, 1);
    assert_eq!(state.current_phase, Phase::TeamProposal);
    assert_eq!(state.total_papers(), 17);
}

#[test]
fn test_turn_counts_attempts() {
    let mut engine = engine(5, 1);
    let nobody = PlayerId::new("nobody");
    for expected in 1..=3 {
        let update = engine.perform_action(&nobody, &Action::DeclareVeto);
        assert!(!update.success);
        assert_eq!(engine.state().turn_number, expected);
    }
}

/// Seat index of someone who is neither the AGI nor in `skip`
fn plain_seat(engine: &GameEngine, skip: &[&PlayerId]) -> usize {
    engine
        .state()
        .players
        .iter()
        .position(|p| p.role() != Role::Agi && !skip.contains(&&p.id))
        .unwrap()
}

/// Run one research round where the engineer publishes `publish`
fn research_round(engine: &mut GameEngine, discard: &str, publish: &str) -> PlayerId {
    let engineer = safe_nominee(engine);
    nominate(engine, &engineer);
    all_vote_team(engine, true);
    assert_eq!(engine.state().current_phase, Phase::Research);

    let director = director(engine);
    let update = engine.perform_action(
        &director,
        &Action::DiscardPaper {
            paper_id: discard.into(),
        },
    );
    assert!(update.success, "{:?}", update.error);
    let update = engine.perform_action(
        &engineer,
        &Action::PublishPaper {
            paper_id: publish.into(),
        },
    );
    assert!(update.success, "{:?}", update.error);
    director
}

#[test]
fn test_eliminating_agi_wins_for_safety() {
    let mut engine = engine(10, 5);
    {
        let seat = plain_seat(&engine, &[]);
        let state = engine.state_mut();
        state.current_director_index = seat;
        state.capability = 10;
        state.safety = 8;
        state.deck = VecDeque::from(vec![
            Paper::new("boost", 1, 0),
            Paper::new("spare", 0, 1),
            Paper::new("other", 0, 1),
            Paper::new("filler_a", 0, 1),
            Paper::new("filler_b", 0, 1),
        ]);
    }

    let old_director = research_round(&mut engine, "spare", "boost");
    assert_eq!(engine.state().capability, 11);
    assert!(!engine.is_game_over());
    let actions = engine.get_valid_actions(&old_director);
    assert_eq!(actions.last(), Some(&ActionType::UsePower));

    let agi = engine
        .state()
        .agi_player()
        .map(|p| p.id.clone())
        .unwrap();
    let update = engine.perform_action(
        &old_director,
        &Action::UsePower {
            power: PowerType::Eliminate,
            target_id: agi.clone(),
        },
    );
    assert!(update.success, "{:?}", update.error);

    assert!(!engine.state().player(&agi).unwrap().alive);
    assert!(engine.is_game_over());
    assert_eq!(engine.get_winners().to_vec(), vec![Role::Safety]);
    assert_eq!(engine.state().current_phase, Phase::GameOver);
    assert!(engine.state().pending_powers.is_empty());
}

#[test]
fn test_choose_director_takes_effect_immediately() {
    let mut engine = engine(5, 13);
    {
        let seat = plain_seat(&engine, &[]);
        let state = engine.state_mut();
        state.current_director_index = seat;
        state.capability = 8;
        state.safety = 4;
        state.deck = VecDeque::from(vec![
            Paper::new("boost", 1, 0),
            Paper::new("spare", 0, 1),
            Paper::new("other", 0, 1),
            Paper::new("filler_a", 0, 1),
            Paper::new("filler_b", 0, 1),
        ]);
    }

    let old_director = research_round(&mut engine, "spare", "boost");
    assert_eq!(engine.state().capability, 9);
    let new_director = director(&engine);
    assert_ne!(new_director, old_director);

    let chosen_seat = plain_seat(&engine, &[&old_director, &new_director]);
    let chosen = engine.state().players[chosen_seat].id.clone();
    let update = engine.perform_action(
        &old_director,
        &Action::UsePower {
            power: PowerType::ChooseDirector,
            target_id: chosen.clone(),
        },
    );
    assert!(update.success, "{:?}", update.error);

    assert_eq!(engine.state().current_director_index, chosen_seat);
    assert_eq!(director(&engine), chosen);
    assert!(engine
        .get_valid_actions(&chosen)
        .contains(&ActionType::Nominate));
    assert!(!engine
        .get_valid_actions(&new_director)
        .contains(&ActionType::Nominate));
}

#[test]
fn test_eliminating_last_voter_completes_team_vote() {
    let mut engine = engine(10, 44);
    let first_director = director(&engine);
    let holder = alive_ids(&engine)
        .into_iter()
        .find(|id| *id != first_director)
        .unwrap();
    engine.state_mut().pending_powers.push(PowerGrant {
        threshold: 11,
        power: PowerType::Eliminate,
        director_id: holder.clone(),
    });

    let engineer = safe_nominee(&engine);
    nominate(&mut engine, &engineer);
    let holdout_seat = plain_seat(&engine, &[&first_director, &holder, &engineer]);
    let holdout = engine.state().players[holdout_seat].id.clone();
    for id in alive_ids(&engine) {
        if id != holdout {
            assert!(engine
                .perform_action(&id, &Action::VoteTeam { vote: true })
                .success);
        }
    }
    assert_eq!(engine.state().current_phase, Phase::TeamProposal);

    let update = engine.perform_action(
        &holder,
        &Action::UsePower {
            power: PowerType::Eliminate,
            target_id: holdout.clone(),
        },
    );
    assert!(update.success, "{:?}", update.error);

    let state = engine.state();
    assert!(!state.player(&holdout).unwrap().alive);
    assert_eq!(state.current_phase, Phase::Research);
    assert_eq!(state.director_hand().len(), 3);
    assert!(engine
        .get_valid_actions(&first_director)
        .contains(&ActionType::DiscardPaper));
}
