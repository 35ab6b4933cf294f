//! Tournament mode for running many games in parallel and collecting statistics
//!
//! Games run concurrently on the rayon pool. Each game derives its player
//! count and engine seed from the tournament seed and its own index, so a
//! seeded tournament is reproducible regardless of scheduling.

use crate::core::Role;
use crate::engine::GameEngine;
use crate::game::{
    GameConfig, GameEndReason, GameLoop, GameResult, PlayerController, RandomController,
    VerbosityLevel, ZeroController,
};
use crate::{GameError, Result};
use rand::{Rng, RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Controller type for tournament games
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ControllerType {
    Zero,
    Random,
}

#[derive(Debug, Clone)]
pub struct TourneySettings {
    /// Number of games to play
    pub games: Option<usize>,
    /// Wall-clock budget; games not yet started when it expires are skipped
    pub seconds: Option<u64>,
    /// Player counts to draw from, uniformly
    pub player_counts: Vec<usize>,
    pub controller: ControllerType,
    pub seed: Option<u64>,
    pub max_turns: u32,
}

/// Per player-count tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableStats {
    pub games: usize,
    pub safety_wins: usize,
    pub acceleration_wins: usize,
}

/// Statistics collected during a tournament
#[derive(Debug, Clone, Default)]
pub struct TournamentStats {
    pub games: usize,
    pub safety_wins: usize,
    pub acceleration_wins: usize,
    pub turn_limit: usize,
    pub deadlocks: usize,
    pub failures: usize,
    pub total_turns: u64,
    pub by_player_count: BTreeMap<usize, TableStats>,
}

impl TournamentStats {
    fn record(&mut self, player_count: usize, result: &GameResult) {
        self.games += 1;
        self.total_turns += u64::from(result.turns_played);
        let table = self.by_player_count.entry(player_count).or_default();
        table.games += 1;
        match result.end_reason {
            GameEndReason::WinCondition => {
                if result.winners.contains(&Role::Safety) {
                    self.safety_wins += 1;
                    table.safety_wins += 1;
                } else {
                    self.acceleration_wins += 1;
                    table.acceleration_wins += 1;
                }
            }
            GameEndReason::MaxTurns => self.turn_limit += 1,
            GameEndReason::Deadlock => self.deadlocks += 1,
        }
    }

    pub fn average_turns(&self) -> f64 {
        if self.games == 0 {
            0.0
        } else {
            self.total_turns as f64 / self.games as f64
        }
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * part as f64 / total as f64
    }
}

/// Player count and engine seed for game `game_idx`
fn derive_game(settings: &TourneySettings, game_idx: usize) -> (usize, u64) {
    let base = settings.seed.unwrap_or(42);
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(base.wrapping_add(game_idx as u64));
    let player_count = settings.player_counts[rng.gen_range(0..settings.player_counts.len())];
    (player_count, rng.next_u64())
}

/// Play one silent game
pub fn play_game(
    player_count: usize,
    game_seed: u64,
    controller: ControllerType,
    max_turns: u32,
) -> Result<GameResult> {
    let config = GameConfig::with_default_ids(player_count, Some(game_seed))?;
    let mut engine = GameEngine::create_game(&config)?;
    engine.logger_mut().set_verbosity(VerbosityLevel::Silent);

    let mut controllers: Vec<Box<dyn PlayerController>> = config
        .player_ids()
        .iter()
        .enumerate()
        .map(|(seat, id)| -> Box<dyn PlayerController> {
            match controller {
                ControllerType::Zero => Box::new(ZeroController::new(id.clone())),
                ControllerType::Random => Box::new(RandomController::with_seed(
                    id.clone(),
                    game_seed.wrapping_add((seat as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)),
                )),
            }
        })
        .collect();

    GameLoop::new(&mut engine)
        .with_max_turns(max_turns)
        .run_game(&mut controllers)
}

/// Run a tournament and return the collected statistics
pub fn run_tourney(settings: &TourneySettings) -> Result<TournamentStats> {
    if settings.games.is_none() && settings.seconds.is_none() {
        return Err(GameError::Config(
            "Must specify either --games or --seconds".to_string(),
        ));
    }
    if settings.player_counts.is_empty() {
        return Err(GameError::Config("No player counts given".to_string()));
    }
    for &n in &settings.player_counts {
        crate::core::get_role_distribution(n)?;
    }

    // Time-bounded runs stop on the deadline rather than the count
    let total_games = settings.games.unwrap_or(1_000_000);
    let deadline = settings
        .seconds
        .map(|s| Instant::now() + Duration::from_secs(s));

    let stats = Arc::new(Mutex::new(TournamentStats::default()));
    let started = AtomicUsize::new(0);

    (0..total_games).into_par_iter().for_each(|game_idx| {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return;
        }
        let count = started.fetch_add(1, Ordering::Relaxed) + 1;

        let (player_count, game_seed) = derive_game(settings, game_idx);
        let outcome = play_game(player_count, game_seed, settings.controller, settings.max_turns);

        let mut stats = stats.lock().unwrap_or_else(|e| e.into_inner());
        match outcome {
            Ok(result) => stats.record(player_count, &result),
            Err(e) => {
                stats.failures += 1;
                eprintln!("Warning: Game {game_idx} failed: {e}");
            }
        }
        drop(stats);

        if count % 1000 == 0 {
            println!("Completed {count} games");
        }
    });

    let stats = stats.lock().unwrap_or_else(|e| e.into_inner()).clone();
    Ok(stats)
}

/// Print a human-readable tournament summary
pub fn print_report(stats: &TournamentStats, elapsed: Duration) {
    println!("\n=== Tournament Complete ===");
    println!("Total games played: {}", stats.games);
    println!("Elapsed time: {:.2}s", elapsed.as_secs_f64());
    if elapsed.as_secs_f64() > 0.0 {
        println!(
            "Games per second: {:.2}",
            stats.games as f64 / elapsed.as_secs_f64()
        );
    }
    println!("Average turns: {:.1}\n", stats.average_turns());

    println!("=== Outcomes ===");
    println!(
        "Safety wins: {} ({:.1}%)",
        stats.safety_wins,
        percent(stats.safety_wins, stats.games)
    );
    println!(
        "Accelerationist/AGI wins: {} ({:.1}%)",
        stats.acceleration_wins,
        percent(stats.acceleration_wins, stats.games)
    );
    if stats.turn_limit > 0 {
        println!("Turn limit reached: {}", stats.turn_limit);
    }
    if stats.deadlocks > 0 {
        println!("Deadlocks: {}", stats.deadlocks);
    }
    if stats.failures > 0 {
        println!("Failed games: {}", stats.failures);
    }

    println!("\n=== By Player Count ===");
    for (n, table) in &stats.by_player_count {
        println!(
            "  {n} players: {} games, Safety {:.1}%, Acceleration {:.1}%",
            table.games,
            percent(table.safety_wins, table.games),
            percent(table.acceleration_wins, table.games)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(games: usize, controller: ControllerType) -> TourneySettings {
        TourneySettings {
            games: Some(games),
            seconds: None,
            player_counts: vec![5, 7, 10],
            controller,
            seed: Some(1234),
            max_turns: 500,
        }
    }

    #[test]
    fn test_tourney_counts_every_game() {
        let stats = run_tourney(&settings(24, ControllerType::Random)).unwrap();
        assert_eq!(stats.games + stats.failures, 24);
        assert_eq!(stats.failures, 0);
        assert_eq!(
            stats.safety_wins + stats.acceleration_wins + stats.turn_limit + stats.deadlocks,
            stats.games
        );
        let per_table: usize = stats.by_player_count.values().map(|t| t.games).sum();
        assert_eq!(per_table, stats.games);
    }

    #[test]
    fn test_seeded_tourney_is_reproducible() {
        let a = run_tourney(&settings(16, ControllerType::Random)).unwrap();
        let b = run_tourney(&settings(16, ControllerType::Random)).unwrap();
        assert_eq!(a.safety_wins, b.safety_wins);
        assert_eq!(a.total_turns, b.total_turns);
        assert_eq!(a.by_player_count, b.by_player_count);
    }

    #[test]
    fn test_requires_a_stop_condition() {
        let mut s = settings(1, ControllerType::Zero);
        s.games = None;
        assert!(matches!(run_tourney(&s), Err(GameError::Config(_))));
    }

    #[test]
    fn test_rejects_bad_player_count() {
        let mut s = settings(1, ControllerType::Zero);
        s.player_counts = vec![4];
        assert!(matches!(run_tourney(&s), Err(GameError::Config(_))));
    }
}
