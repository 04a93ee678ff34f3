//! Replay command: step through a saved session.

use std::path::PathBuf;

use bombot::history::{History, ReplayPlayer};

use super::{CliError, render_board, score_line};

/// Execute the replay command.
///
/// # Errors
///
/// Returns an error when the session file is missing or malformed.
pub(crate) fn execute(
    session: PathBuf,
    speed: f64,
    from_turn: Option<u32>,
    stats_only: bool,
) -> Result<(), CliError> {
    let json = std::fs::read_to_string(&session)
        .map_err(|e| CliError::new(format!("failed to read {}: {e}", session.display())))?;
    let history = History::from_json(&json, usize::MAX)?;

    if stats_only {
        let stats = history.stats();
        println!("Entries:     {}", stats.entries);
        println!("Checkpoints: {}", stats.checkpoints);
        if let (Some(first), Some(last)) = (stats.first_turn, stats.last_turn) {
            println!("Turns:       {first}..{last}");
        }
        return Ok(());
    }

    let mut player = ReplayPlayer::new(&history);
    player.set_speed(speed);
    if let Some(turn) = from_turn {
        // Position the playback cursor on the requested turn
        while player
            .current()
            .is_some_and(|entry| entry.turn_number < turn)
        {
            if player.step_forward().is_none() {
                break;
            }
        }
    }
    player.play();

    let delay = std::time::Duration::from_millis(player.frame_delay_ms(500));
    loop {
        let Some(entry) = player.current() else { break };
        println!("-- turn {} --", entry.turn_number);
        println!("{}", render_board(&entry.state));
        println!("{}\n", score_line(&entry.state));
        if player.step_forward().is_none() {
            break;
        }
        std::thread::sleep(delay);
    }
    Ok(())
}
