//! Seeds command: parallel constraint search over initial worlds.

use indicatif::{ProgressBar, ProgressStyle};

use bombot::config::GameConfig;
use bombot::seedfind::{SeedConstraints, find_seeds};

use super::{CliError, OutputFormat};

/// Seeds scanned between progress bar updates.
const SCAN_CHUNK: u64 = 2048;

/// Execute the seeds command.
///
/// # Errors
///
/// Returns an error when output serialization fails.
#[allow(clippy::too_many_arguments)]
pub(crate) fn execute(
    start: u64,
    attempts: u64,
    limit: usize,
    density: f64,
    min_soft: Option<usize>,
    max_soft: Option<usize>,
    open_center: bool,
    reachable: bool,
    min_cluster: Option<usize>,
    format: OutputFormat,
) -> Result<(), CliError> {
    let constraints = SeedConstraints {
        min_soft_blocks: min_soft,
        max_soft_blocks: max_soft,
        open_center,
        corners_reachable: reachable,
        min_cluster_size: min_cluster,
    };
    let config = GameConfig {
        soft_block_density: density,
        ..GameConfig::default()
    };

    let bar = ProgressBar::new(attempts);
    bar.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} seeds ({eta})")
            .map_err(|e| CliError::new(e.to_string()))?,
    );

    let mut results = Vec::new();
    let mut offset = 0u64;
    while offset < attempts && results.len() < limit {
        let chunk = SCAN_CHUNK.min(attempts - offset);
        let remaining = limit - results.len();
        results.extend(find_seeds(
            start.wrapping_add(offset),
            &constraints,
            &config,
            chunk,
            remaining,
        ));
        offset += chunk;
        bar.set_position(offset);
    }
    bar.finish_and_clear();

    match format {
        OutputFormat::Text => {
            if results.is_empty() {
                println!("No matching seeds in {offset} attempts");
            }
            for analysis in &results {
                println!(
                    "seed {:>12}  soft {:>3}  cluster {:>3}  center {}  reachable {}",
                    analysis.seed,
                    analysis.soft_blocks,
                    analysis.largest_cluster,
                    if analysis.open_center { "open" } else { "blocked" },
                    analysis.corners_reachable,
                );
            }
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&results)
                    .map_err(|e| CliError::new(e.to_string()))?
            );
        }
    }
    Ok(())
}
