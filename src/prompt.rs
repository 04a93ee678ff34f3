//! Per-agent prompt synthesis.
//!
//! Pure with respect to state: the same `(game, player_id, system_prompt,
//! memory)` always yields identical artifacts, so prompts never perturb
//! determinism. Board squares use chess notation, files `A..M` left to
//! right and ranks `11..1` top to bottom.

use serde_json::{Value, json};

use crate::game::{Coord, Direction, Game, PlayerId, Tile};

/// How far the vision window extends from the player in each direction.
const VISION_RADIUS: i32 = 3;

/// Baseline system instruction handed to every tactical request.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are an agent in a turn-based bomb-placement arena. The board is a 13x11 \
grid: '#' cells are indestructible walls, 'S' cells are breakable blocks \
(worth 10 points when destroyed by your bomb), '.' cells are open floor. \
Each round you submit one move: a direction (up, down, left, right, stay) \
and whether to drop a bomb on your current square before moving. Bombs \
detonate after their fuse runs out, blasting a cross-shaped area that stops \
at walls and breaks the first soft block in each direction. Explosions kill \
any player they touch, including you. Killing another player is worth 100 \
points. Destroyed blocks sometimes drop loot: flash_radius extends your \
bomb range, extra_bomb raises your bomb capacity, bomb_pickup lets you pick \
up and throw bombs. Survive, break blocks, collect loot, and eliminate the \
other players. Respond with JSON only, matching the provided schema. Never \
move onto a square marked lethal unless every option is lethal.";

/// The three artifacts consumed by the chat-completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptArtifacts {
    /// System role message.
    pub system: String,
    /// User role message.
    pub user: String,
    /// Strict JSON schema for the expected response.
    pub schema: Value,
}

impl PromptArtifacts {
    /// JSON schema for a move response.
    #[must_use]
    pub fn move_schema() -> Value {
        json!({
            "name": "move",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "direction": {
                        "type": "string",
                        "enum": ["up", "down", "left", "right", "stay"]
                    },
                    "dropBomb": { "type": "boolean" },
                    "thought": {
                        "type": "string",
                        "description": "Tactical reasoning, at most 50 words"
                    }
                },
                "required": ["direction", "dropBomb", "thought"],
                "additionalProperties": false
            }
        })
    }
}

/// Build the full prompt for a player's tactical move.
#[must_use]
pub fn build_prompt(
    game: &Game,
    player_id: PlayerId,
    system_prompt: &str,
    memory: &str,
) -> PromptArtifacts {
    let mut user = String::new();
    let Some(player) = game.player(player_id) else {
        return PromptArtifacts {
            system: system_prompt.to_string(),
            user,
            schema: PromptArtifacts::move_schema(),
        };
    };

    let height = game.grid.height();
    user.push_str(&format!(
        "== ROUND {} ==\nYou are Player {} at {} (x={}, y={}).\n\n",
        game.round_count,
        player_id,
        player.pos().notation(height),
        player.x,
        player.y
    ));

    push_vision_table(&mut user, game, player.pos());
    push_adjacent_breakables(&mut user, game, player.pos());
    push_rosters(&mut user, game, player_id);
    push_moves(&mut user, game, player_id);
    push_danger(&mut user, game, player_id);
    push_status(&mut user, game, player_id);

    if !memory.is_empty() {
        user.push_str(&format!("## Your notes from earlier rounds\n{memory}\n"));
    }

    PromptArtifacts {
        system: system_prompt.to_string(),
        user,
        schema: PromptArtifacts::move_schema(),
    }
}

/// Build the compact prompt for the asynchronous memory update.
///
/// Asks for operational notes only; the reply is truncated to 50 words
/// before storage.
#[must_use]
pub fn build_memory_prompt(
    game: &Game,
    player_id: PlayerId,
    last_move: &crate::game::Move,
    memory: &str,
) -> String {
    let mut prompt = String::new();
    let Some(player) = game.player(player_id) else {
        return prompt;
    };
    let height = game.grid.height();
    prompt.push_str(&format!(
        "You are Player {} in a bomb-placement arena, round {}, at {}. \
         Your last move was '{}'{}. Score {}.\n",
        player_id,
        game.round_count,
        player.pos().notation(height),
        last_move.direction.as_str(),
        if last_move.drop_bomb {
            " and you dropped a bomb"
        } else {
            ""
        },
        player.score,
    ));
    if !memory.is_empty() {
        prompt.push_str(&format!("Previous notes: {memory}\n"));
    }
    prompt.push_str(
        "Write updated operational notes for your next turn: threats, plans, \
         loot worth chasing. At most 50 words. Reply with the notes only.",
    );
    prompt
}

fn cell_symbol(game: &Game, coord: Coord, viewer: PlayerId) -> String {
    for player in game.living_players() {
        if player.pos() == coord {
            return if player.id == viewer {
                "YOU".to_string()
            } else {
                format!("P{}", player.id)
            };
        }
    }
    if let Some(bomb) = game.bomb_at(coord) {
        return format!("B{}", bomb.rounds_remaining(game.round_count));
    }
    if let Some(item) = game.loot_at(coord) {
        return format!("L:{}", item.kind.as_str());
    }
    match game.grid.get(coord) {
        Some(Tile::Hard) => "#".to_string(),
        Some(Tile::Soft) => "S".to_string(),
        Some(Tile::Empty) => ".".to_string(),
        None => "X".to_string(),
    }
}

fn push_vision_table(out: &mut String, game: &Game, center: Coord) {
    out.push_str("## Vision (7x7 window, X = outside the board)\n");

    let xs: Vec<i32> = (-VISION_RADIUS..=VISION_RADIUS)
        .map(|d| i32::from(center.x) + d)
        .collect();

    // Header row: file letters
    out.push_str("|    |");
    for &x in &xs {
        if (0..i32::from(game.grid.width())).contains(&x) {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let file = (b'A' + x as u8) as char;
            out.push_str(&format!(" {file} |"));
        } else {
            out.push_str("   |");
        }
    }
    out.push('\n');

    let viewer = game
        .players
        .iter()
        .find(|p| p.pos() == center)
        .map_or(0, |p| p.id);

    for dy in -VISION_RADIUS..=VISION_RADIUS {
        let y = i32::from(center.y) + dy;
        let rank = if (0..i32::from(game.grid.height())).contains(&y) {
            format!("{:>2}", i32::from(game.grid.height()) - y)
        } else {
            "  ".to_string()
        };
        out.push_str(&format!("| {rank} |"));
        for &x in &xs {
            let symbol = if (0..i32::from(game.grid.width())).contains(&x)
                && (0..i32::from(game.grid.height())).contains(&y)
            {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let cell = Coord::new(x as u16, y as u16);
                cell_symbol(game, cell, viewer)
            } else {
                "X".to_string()
            };
            out.push_str(&format!(" {symbol} |"));
        }
        out.push('\n');
    }
    out.push('\n');
}

fn push_adjacent_breakables(out: &mut String, game: &Game, center: Coord) {
    let height = game.grid.height();
    let mut found = Vec::new();
    for direction in Direction::CARDINAL {
        if let Some(next) = game.grid.step(center, direction)
            && game.grid.get(next) == Some(Tile::Soft)
        {
            found.push(format!("{} ({})", direction.as_str(), next.notation(height)));
        }
    }
    if found.is_empty() {
        out.push_str("No breakable blocks adjacent to you.\n\n");
    } else {
        out.push_str(&format!(
            "Breakable blocks adjacent to you: {}.\n\n",
            found.join(", ")
        ));
    }
}

fn push_rosters(out: &mut String, game: &Game, viewer: PlayerId) {
    let height = game.grid.height();

    out.push_str("## Players\n");
    for player in &game.players {
        let marker = if player.id == viewer { " (YOU)" } else { "" };
        if player.alive {
            out.push_str(&format!(
                "- Player {}{marker} at {}, score {}\n",
                player.id,
                player.pos().notation(height),
                player.score
            ));
        } else {
            out.push_str(&format!(
                "- Player {}{marker} DEAD, score {}\n",
                player.id, player.score
            ));
        }
    }

    if game.bombs.is_empty() {
        out.push_str("\nNo bombs on the board.\n");
    } else {
        out.push_str("\n## Bombs\n");
        for bomb in &game.bombs {
            out.push_str(&format!(
                "- Bomb at {}, {} round(s) until detonation, range {}, owner Player {}{}\n",
                bomb.pos().notation(height),
                bomb.rounds_remaining(game.round_count),
                bomb.range,
                bomb.owner,
                if bomb.being_carried { " (carried)" } else { "" }
            ));
        }
    }

    if !game.loot.is_empty() {
        out.push_str("\n## Loot\n");
        for item in &game.loot {
            out.push_str(&format!(
                "- {} at {}\n",
                item.kind.as_str(),
                item.pos().notation(height)
            ));
        }
    }
    out.push('\n');
}

fn push_moves(out: &mut String, game: &Game, player_id: PlayerId) {
    let height = game.grid.height();

    out.push_str("## Moves\nValid: ");
    let valid = game.valid_moves(player_id);
    let parts: Vec<String> = valid
        .iter()
        .map(|(d, dest)| format!("{} -> {}", d.as_str(), dest.notation(height)))
        .collect();
    out.push_str(&parts.join(", "));
    out.push('\n');

    let blocked = game.blocked_moves(player_id);
    if !blocked.is_empty() {
        out.push_str("Blocked: ");
        let parts: Vec<String> = blocked
            .iter()
            .map(|(d, dest)| match dest {
                Some(c) => format!("{} ({} impassable)", d.as_str(), c.notation(height)),
                None => format!("{} (edge of board)", d.as_str()),
            })
            .collect();
        out.push_str(&parts.join(", "));
        out.push('\n');
    }
    out.push('\n');
}

fn push_danger(out: &mut String, game: &Game, player_id: PlayerId) {
    let analysis = game.analyze_moves(player_id);
    out.push_str("## DANGER\n");
    if analysis.currently_safe {
        out.push_str("Your current square is safe this round.\n");
    } else {
        out.push_str(
            "WARNING: your current square will be hit by an explosion within \
             one round. MOVE to a safe square now.\n",
        );
    }
    let names = |dirs: &[Direction]| {
        dirs.iter()
            .map(|d| d.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    if !analysis.safe.is_empty() {
        out.push_str(&format!("Safe moves: {}\n", names(&analysis.safe)));
    }
    if !analysis.dangerous.is_empty() {
        out.push_str(&format!("Lethal moves: {}\n", names(&analysis.dangerous)));
    }
    out.push('\n');
}

fn push_status(out: &mut String, game: &Game, player_id: PlayerId) {
    let Some(player) = game.player(player_id) else {
        return;
    };
    out.push_str(&format!(
        "## Your status\nBomb range {}, bombs {}/{} placed, pickup ability: {}{}\n\n",
        player.bomb_range,
        player.bombs_active,
        player.max_bombs,
        if player.can_pickup_bombs { "yes" } else { "no" },
        if player.carried_bomb.is_some() {
            ", carrying a bomb"
        } else {
            ""
        }
    ));
}
