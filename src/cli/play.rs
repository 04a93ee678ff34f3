//! Play command: a live game driven by a chat-completion provider.

use std::path::PathBuf;

use bombot::config::GameConfig;
use bombot::engine::{Engine, EngineEvent};
use bombot::llm::LlmClient;

use super::{CliError, render_board, score_line};

/// Execute the play command.
///
/// # Errors
///
/// Returns an error when no API key is available or the round loop fails.
#[allow(clippy::too_many_arguments)]
pub(crate) fn execute(
    api_key: Option<String>,
    seed: Option<u64>,
    players: usize,
    rounds: u32,
    delay_ms: u64,
    save: Option<PathBuf>,
    quiet: bool,
) -> Result<(), CliError> {
    let api_key = api_key
        .or_else(|| std::env::var("BOMBOT_API_KEY").ok())
        .ok_or_else(|| {
            CliError::new("no API key: pass --api-key or set BOMBOT_API_KEY")
        })?;

    let config = GameConfig {
        seed: seed.unwrap_or(1),
        num_players: players,
        turn_delay_ms: delay_ms,
        require_reachable: true,
        ..GameConfig::default()
    };

    let client = LlmClient::new(&api_key, &config)?;
    if !quiet {
        println!("Provider: {}", client.provider().name);
    }

    let mut engine = Engine::new(config, client)?;
    engine.start();

    let runtime = super::build_runtime()?;
    runtime.block_on(async {
        while !engine.is_finished() && engine.state().round_count < rounds {
            engine.tick().await?;
            while let Some(event) = engine.poll_event() {
                match event {
                    EngineEvent::StateChanged => {
                        if !quiet {
                            println!("-- round {} --", engine.state().round_count);
                            println!("{}", render_board(engine.state()));
                            println!("{}\n", score_line(engine.state()));
                        }
                    }
                    EngineEvent::GameOver { winner } => match winner {
                        Some(id) => println!("Winner: Player {id}"),
                        None => println!("Game over with no winner"),
                    },
                    EngineEvent::Error { message } => eprintln!("Error: {message}"),
                }
            }
        }
        Ok::<(), CliError>(())
    })?;

    if let Some(path) = save {
        std::fs::write(&path, engine.history().to_json()?)?;
        println!("Session saved to {}", path.display());
    }
    Ok(())
}
