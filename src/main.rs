//! Bombot CLI - run, play, replay, and probe seeded bomb-placement games.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

/// Bombot - a deterministic LLM-driven bomb-placement game engine
#[derive(Parser, Debug)]
#[command(name = "bombot")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a headless game on random-safe fallback moves
    Run {
        /// Random seed (default: random)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Number of players (2-4)
        #[arg(short, long, default_value = "4")]
        players: usize,

        /// Maximum rounds (default: 200)
        #[arg(short, long, default_value = "200")]
        rounds: u32,

        /// Soft block density (0.0-1.0)
        #[arg(short, long, default_value = "0.4")]
        density: f64,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,

        /// Save the session to a file
        #[arg(long)]
        save: Option<std::path::PathBuf>,

        /// Suppress round-by-round output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Play a live game driven by a chat-completion provider
    Play {
        /// API key (default: the BOMBOT_API_KEY environment variable)
        #[arg(long)]
        api_key: Option<String>,

        /// Random seed
        #[arg(short, long)]
        seed: Option<u64>,

        /// Number of players (2-4)
        #[arg(short, long, default_value = "4")]
        players: usize,

        /// Maximum rounds (default: 200)
        #[arg(short, long, default_value = "200")]
        rounds: u32,

        /// Delay between rounds in milliseconds
        #[arg(long, default_value = "1500")]
        delay: u64,

        /// Save the session to a file
        #[arg(long)]
        save: Option<std::path::PathBuf>,

        /// Suppress round-by-round output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Replay a saved session
    Replay {
        /// Session file written by `run --save` or `play --save`
        #[arg(required = true)]
        session: std::path::PathBuf,

        /// Playback speed multiplier
        #[arg(long, default_value = "1.0")]
        speed: f64,

        /// Start at a specific turn
        #[arg(short, long)]
        turn: Option<u32>,

        /// Print summary statistics and exit
        #[arg(long)]
        stats: bool,
    },

    /// Search for seeds whose initial world satisfies constraints
    Seeds {
        /// First seed to scan
        #[arg(long, default_value = "0")]
        start: u64,

        /// Number of seeds to scan
        #[arg(short, long, default_value = "10000")]
        attempts: u64,

        /// Stop after this many matches
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Soft block density (0.0-1.0)
        #[arg(short, long, default_value = "0.4")]
        density: f64,

        /// Minimum soft block count
        #[arg(long)]
        min_soft: Option<usize>,

        /// Maximum soft block count
        #[arg(long)]
        max_soft: Option<usize>,

        /// Require a clear board center
        #[arg(long)]
        open_center: bool,

        /// Require a path between spawn corners
        #[arg(long)]
        reachable: bool,

        /// Minimum size of the largest soft block cluster
        #[arg(long)]
        min_cluster: Option<usize>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let result = match args.command {
        Commands::Run {
            seed,
            players,
            rounds,
            density,
            format,
            save,
            quiet,
        } => cli::run::execute(seed, players, rounds, density, format, save, quiet),

        Commands::Play {
            api_key,
            seed,
            players,
            rounds,
            delay,
            save,
            quiet,
        } => cli::play::execute(api_key, seed, players, rounds, delay, save, quiet),

        Commands::Replay {
            session,
            speed,
            turn,
            stats,
        } => cli::replay::execute(session, speed, turn, stats),

        Commands::Seeds {
            start,
            attempts,
            limit,
            density,
            min_soft,
            max_soft,
            open_center,
            reachable,
            min_cluster,
            format,
        } => cli::seeds::execute(
            start, attempts, limit, density, min_soft, max_soft, open_center, reachable,
            min_cluster, format,
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
