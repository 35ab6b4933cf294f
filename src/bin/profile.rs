//! Profiling binary for game execution
//!
//! Plays seeded games in a tight loop with no benchmark harness around them,
//! which gives cleaner flamegraphs than the Criterion benches.
//!
//! Usage:
//!   cargo flamegraph --bin profile
//!   PROFILE_ITERATIONS=5000 PROFILE_PLAYERS=10 cargo run --release --bin profile

use secret_agi::tournament::{play_game, ControllerType};
use secret_agi::config::DEFAULT_MAX_TURNS;
use std::time::Instant;

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn main() {
    let iterations: u64 = env_or("PROFILE_ITERATIONS", 1000);
    let players: usize = env_or("PROFILE_PLAYERS", 7);
    let seed = 42u64;

    println!("Profiling game execution...");
    println!("Running {iterations} games of {players} players from seed {seed}");
    println!();

    let start = Instant::now();
    let mut turns = 0u64;
    for i in 0..iterations {
        match play_game(players, seed + i, ControllerType::Random, DEFAULT_MAX_TURNS) {
            Ok(result) => turns += u64::from(result.turns_played),
            Err(e) => {
                eprintln!("Game {i} failed: {e}");
                std::process::exit(1);
            }
        }
        if (i + 1) % 100 == 0 {
            println!("Completed {} games", i + 1);
        }
    }

    let elapsed = start.elapsed().as_secs_f64();
    println!();
    println!("Total time: {elapsed:.2}s");
    println!("Games/sec: {:.2}", iterations as f64 / elapsed);
    println!("Turns/sec: {:.2}", turns as f64 / elapsed);
}
