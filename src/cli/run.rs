//! Run command: a headless game on random-safe fallback moves.

use std::path::PathBuf;

use bombot::config::GameConfig;
use bombot::engine::{Engine, EngineEvent, RandomProvider};

use super::{CliError, OutputFormat, render_board, score_line};

/// Execute the run command.
///
/// # Errors
///
/// Returns an error when world generation, the round loop, or saving fails.
pub(crate) fn execute(
    seed: Option<u64>,
    players: usize,
    rounds: u32,
    density: f64,
    format: OutputFormat,
    save: Option<PathBuf>,
    quiet: bool,
) -> Result<(), CliError> {
    let seed = seed.unwrap_or_else(random_seed);
    let config = GameConfig {
        seed,
        num_players: players,
        soft_block_density: density,
        turn_delay_ms: 0,
        ..GameConfig::default()
    };

    let mut engine = Engine::new(config, RandomProvider)?;
    engine.start();

    if !quiet {
        println!("Running seed {seed} with {players} players...\n");
        println!("{}", render_board(engine.state()));
    }

    let runtime = super::build_runtime()?;
    let mut winner = None;
    runtime.block_on(async {
        while !engine.is_finished() && engine.state().round_count < rounds {
            engine.tick().await?;
            while let Some(event) = engine.poll_event() {
                match event {
                    EngineEvent::StateChanged => {
                        if !quiet {
                            println!("-- round {} --", engine.state().round_count);
                            println!("{}", render_board(engine.state()));
                        }
                    }
                    EngineEvent::GameOver { winner: w } => winner = w,
                    EngineEvent::Error { message } => eprintln!("Error: {message}"),
                }
            }
        }
        Ok::<(), CliError>(())
    })?;

    if let Some(path) = save {
        std::fs::write(&path, engine.history().to_json()?)?;
        if !quiet {
            println!("Session saved to {}", path.display());
        }
    }

    match format {
        OutputFormat::Text => {
            println!("{}", score_line(engine.state()));
            match winner.or_else(|| engine.state().winner()) {
                Some(id) => println!("Winner: Player {id}"),
                None => println!("No winner after {rounds} rounds"),
            }
        }
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "seed": seed,
                "rounds": engine.state().round_count,
                "winner": winner.or_else(|| engine.state().winner()),
                "players": engine.state().players.iter().map(|p| {
                    serde_json::json!({
                        "id": p.id,
                        "score": p.score,
                        "alive": p.alive,
                    })
                }).collect::<Vec<_>>(),
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&summary)
                    .map_err(|e| CliError::new(e.to_string()))?
            );
        }
    }
    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
fn random_seed() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(42)
}
