//! Secret AGI - command line driver
//!
//! Simulate single games, run parallel tournaments, and inspect or recover
//! games kept in a file store.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use secret_agi::{
    core::{GameId, PlayerId},
    game::{
        compute_state_hash, format_hash, GameConfig, GameLoop, OutputFormat, PlayerController,
        RandomController, VerbosityLevel, ZeroController,
    },
    recovery::RecoveryManager,
    session::GameSession,
    storage::{FileStore, GameStore},
    tournament::{self, ControllerType, TourneySettings},
    ActionType, EngineSettings, GameEngine,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Verbosity level for game output (names or numbers)
#[derive(Debug, Clone, Copy)]
struct VerbosityArg(VerbosityLevel);

impl std::str::FromStr for VerbosityArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silent" | "0" => Ok(VerbosityArg(VerbosityLevel::Silent)),
            "minimal" | "1" => Ok(VerbosityArg(VerbosityLevel::Minimal)),
            "normal" | "2" => Ok(VerbosityArg(VerbosityLevel::Normal)),
            "verbose" | "3" => Ok(VerbosityArg(VerbosityLevel::Verbose)),
            _ => Err(format!(
                "invalid verbosity level '{s}' (expected: silent/0, minimal/1, normal/2, verbose/3)"
            )),
        }
    }
}

#[derive(Parser)]
#[command(name = "secret-agi")]
#[command(about = "Secret AGI - hidden-role game engine", long_about = None)]
struct Cli {
    /// JSON settings file
    #[arg(long, global = true, env = "SECRET_AGI_SETTINGS")]
    settings: Option<PathBuf>,

    /// Directory of the file store
    #[arg(long, global = true, env = "SECRET_AGI_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Cap on action attempts per game
    #[arg(long, global = true, env = "SECRET_AGI_MAX_TURNS")]
    max_turns: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one game with bots
    Simulate {
        /// Number of players (5-10)
        #[arg(long, default_value_t = 5, env = "SECRET_AGI_PLAYERS")]
        players: usize,

        /// Random seed for deterministic games
        #[arg(long, env = "SECRET_AGI_SEED")]
        seed: Option<u64>,

        #[arg(long, value_enum, default_value = "random")]
        controller: ControllerType,

        /// Verbosity level for game output (0=silent, 1=minimal, 2=normal, 3=verbose)
        #[arg(long, default_value = "normal", short = 'v')]
        verbosity: VerbosityArg,

        /// Emit log lines and the final summary as JSON
        #[arg(long)]
        json: bool,

        /// Record the game in the file store (needs --data-dir)
        #[arg(long)]
        persist: bool,

        /// Write the final state as a snapshot file
        #[arg(long, value_name = "FILE")]
        save: Option<PathBuf>,
    },

    /// Run many games in parallel and report win rates
    Tourney {
        #[arg(long)]
        games: Option<usize>,

        /// Run for this many seconds instead of a fixed count
        #[arg(long)]
        seconds: Option<u64>,

        /// Player counts to sample from
        #[arg(long, value_delimiter = ',', default_value = "5,6,7,8,9,10")]
        players: Vec<usize>,

        #[arg(long, value_enum, default_value = "random")]
        controller: ControllerType,

        #[arg(long, env = "SECRET_AGI_SEED")]
        seed: Option<u64>,
    },

    /// Find interrupted games in the file store and roll them back
    Recover {
        /// Recover only this game
        #[arg(long)]
        game: Option<String>,
    },

    /// Show public information about a stored game
    Info {
        game: String,

        /// Snapshot turn (latest if omitted)
        #[arg(long)]
        turn: Option<u32>,

        /// Show the state as this player sees it
        #[arg(long = "as", value_name = "PLAYER")]
        as_player: Option<String>,
    },
}

fn load_settings(cli: &Cli) -> Result<EngineSettings> {
    let mut settings = match &cli.settings {
        Some(path) => EngineSettings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => EngineSettings::default(),
    };
    if let Some(dir) = &cli.data_dir {
        settings.data_dir = Some(dir.clone());
    }
    if let Some(max_turns) = cli.max_turns {
        settings.max_turns = max_turns;
    }
    Ok(settings)
}

async fn open_store(settings: &EngineSettings) -> Result<Arc<FileStore>> {
    let Some(dir) = &settings.data_dir else {
        bail!("--data-dir (or SECRET_AGI_DATA_DIR) is required for this command");
    };
    let store = FileStore::open(dir)
        .await
        .with_context(|| format!("opening store at {}", dir.display()))?;
    Ok(Arc::new(store))
}

fn make_controllers(
    config: &GameConfig,
    controller: ControllerType,
    seed: u64,
) -> Vec<Box<dyn PlayerController>> {
    config
        .player_ids()
        .iter()
        .enumerate()
        .map(|(seat, id)| -> Box<dyn PlayerController> {
            match controller {
                ControllerType::Zero => Box::new(ZeroController::new(id.clone())),
                ControllerType::Random => {
                    Box::new(RandomController::with_seed(id.clone(), seed.wrapping_add(seat as u64 + 1)))
                }
            }
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    match cli.command {
        Commands::Simulate {
            players,
            seed,
            controller,
            verbosity,
            json,
            persist,
            save,
        } => {
            let seed = seed.unwrap_or_else(rand::random);
            let config = GameConfig::with_default_ids(players, Some(seed))?;
            let mut controllers = make_controllers(&config, controller, seed);
            if persist {
                let store = open_store(&settings).await?;
                run_persisted(&config, store, &settings, &mut controllers, verbosity.0).await
            } else {
                run_simulation(&config, &settings, &mut controllers, verbosity.0, json, save)
            }
        }
        Commands::Tourney {
            games,
            seconds,
            players,
            controller,
            seed,
        } => {
            let tourney = TourneySettings {
                games,
                seconds,
                player_counts: players,
                controller,
                seed,
                max_turns: settings.max_turns,
            };
            println!("=== Secret AGI - Tournament Mode ===\n");
            if let Some(seed) = seed {
                println!("Using tournament seed: {seed}");
            }
            let start = Instant::now();
            let stats = tournament::run_tourney(&tourney)?;
            tournament::print_report(&stats, start.elapsed());
            Ok(())
        }
        Commands::Recover { game } => {
            let store = open_store(&settings).await?;
            let manager = RecoveryManager::new(store);
            let reports = match game {
                Some(id) => vec![manager.recover_game(&GameId::new(id)).await?],
                None => manager.recover_all().await?,
            };
            if reports.is_empty() {
                println!("No interrupted games found");
            }
            for report in reports {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            Ok(())
        }
        Commands::Info {
            game,
            turn,
            as_player,
        } => {
            let store = open_store(&settings).await?;
            let game_id = GameId::new(game);
            let record = store.game_record(&game_id).await?;
            let snapshot = store
                .load_snapshot(&game_id, turn)
                .await?
                .with_context(|| format!("no snapshot stored for {game_id}"))?;
            let engine = GameEngine::from_snapshot(snapshot)?;
            println!("status: {:?}", record.status);
            println!("actions recorded: {}", record.actions.len());
            println!("state hash: {}", format_hash(compute_state_hash(engine.state())));
            println!("{}", serde_json::to_string_pretty(&engine.get_public_info())?);
            if let Some(player) = as_player {
                let view = engine.get_game_state(Some(&PlayerId::new(player)));
                println!("{}", serde_json::to_string_pretty(&view)?);
            }
            Ok(())
        }
    }
}

fn run_simulation(
    config: &GameConfig,
    settings: &EngineSettings,
    controllers: &mut [Box<dyn PlayerController>],
    verbosity: VerbosityLevel,
    json: bool,
    save: Option<PathBuf>,
) -> Result<()> {
    let mut engine = GameEngine::create_game(config)?;
    if json {
        engine.logger_mut().set_output_format(OutputFormat::Json);
    }
    let result = GameLoop::new(&mut engine)
        .with_verbosity(verbosity)
        .with_max_turns(settings.max_turns)
        .run_game(controllers)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "game_id": engine.game_id(),
                "winners": result.winners,
                "turns_played": result.turns_played,
                "end_reason": format!("{:?}", result.end_reason),
                "final_stats": result.final_stats,
            })
        );
    } else {
        println!("\n=== Game Over ===");
        println!("Game: {}", engine.game_id());
        println!("Result: {:?}", result.end_reason);
        println!("Winners: {:?}", result.winners);
        println!("Turns: {}", result.turns_played);
        println!(
            "Board: capability {} / safety {}",
            result.final_stats.capability, result.final_stats.safety
        );
    }

    if let Some(path) = save {
        engine
            .snapshot()
            .save_to_file(&path)
            .with_context(|| format!("writing snapshot to {}", path.display()))?;
        println!("Snapshot saved to {}", path.display());
    }
    Ok(())
}

/// Play a game through a persistent session, one action per step
async fn run_persisted(
    config: &GameConfig,
    store: Arc<FileStore>,
    settings: &EngineSettings,
    controllers: &mut [Box<dyn PlayerController>],
    verbosity: VerbosityLevel,
) -> Result<()> {
    let mut session = GameSession::create(config, store, settings).await?;
    println!("Created {}", session.game_id());

    let mut turns = 0;
    'game: while !session.engine().is_game_over() && turns < settings.max_turns {
        for controller in controllers.iter_mut() {
            let id = controller.player_id().clone();
            let valid = session.engine().get_valid_actions(&id);
            if valid.iter().all(|a| *a == ActionType::Observe) {
                continue;
            }
            let view = session.engine().get_game_state(Some(&id));
            let action = controller.choose_action(&view, &valid);
            turns += 1;
            let update = session.perform_action(&id, &action).await;
            if let Some(err) = &update.storage_error {
                eprintln!("Warning: {err}");
            }
            controller.on_game_update(&update);
            if update.success {
                continue 'game;
            }
        }
        break;
    }

    let engine = session.engine();
    if verbosity >= VerbosityLevel::Minimal {
        println!(
            "{} finished after {turns} turns, winners {:?}",
            engine.game_id(),
            engine.get_winners()
        );
    }
    if !engine.is_game_over() {
        bail!("game {} did not finish", engine.game_id());
    }
    Ok(())
}
