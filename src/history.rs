//! Per-turn snapshot history: undo/redo, checkpoints, save files, replay.
//!
//! Entries hold full state snapshots, so jumping anywhere is O(1) and a
//! restored snapshot continues the exact RNG trajectory it was taken with.

use std::collections::{BTreeMap, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::game::{Game, Move, PlayerId};

/// Save format version written into every file.
pub const SAVE_VERSION: u32 = 1;

/// The moves of one completed round, keyed by player id.
///
/// A `BTreeMap` keeps application order canonical (ascending id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundAction {
    /// Each player's move for the round.
    #[serde(with = "move_keys")]
    pub moves: BTreeMap<PlayerId, Move>,
}

/// Serde codec writing the move map with string keys.
///
/// [`SaveFile`] is internally tagged, and serde buffers the content of such
/// enums before dispatch; the buffered form only round-trips string map
/// keys, so numeric keys must be encoded as strings.
mod move_keys {
    use std::collections::BTreeMap;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::game::{Move, PlayerId};

    pub(super) fn serialize<S: Serializer>(
        moves: &BTreeMap<PlayerId, Move>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let keyed: BTreeMap<String, &Move> =
            moves.iter().map(|(id, mv)| (id.to_string(), mv)).collect();
        keyed.serialize(serializer)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<PlayerId, Move>, D::Error> {
        let keyed = BTreeMap::<String, Move>::deserialize(deserializer)?;
        keyed
            .into_iter()
            .map(|(key, mv)| {
                key.parse::<PlayerId>()
                    .map(|id| (id, mv))
                    .map_err(|_| D::Error::custom(format!("invalid player id key {key:?}")))
            })
            .collect()
    }
}

/// One recorded snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Monotonically allocated entry id.
    pub id: u64,
    /// Immutable state snapshot taken after the round resolved.
    pub state: Game,
    /// The round's moves, or `None` for the initial entry.
    pub action: Option<RoundAction>,
    /// `turn_count` of the snapshot.
    pub turn_number: u32,
    /// Unix timestamp in milliseconds at record time.
    pub timestamp_ms: u64,
}

/// Compact replay form: the initial state plus the action list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayData {
    /// State before any round was played.
    pub initial: Game,
    /// Actions of every recorded round, in order.
    pub actions: Vec<RoundAction>,
}

/// Versioned on-disk format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SaveFile {
    /// A full session: every entry, the cursor, and named checkpoints.
    GameSession {
        /// Format version.
        version: u32,
        /// Unix timestamp in milliseconds at save time.
        timestamp_ms: u64,
        /// All recorded entries.
        entries: Vec<HistoryEntry>,
        /// Cursor position at save time.
        cursor: usize,
        /// Named checkpoints.
        checkpoints: HashMap<String, HistoryEntry>,
    },
    /// A single state snapshot.
    GameState {
        /// Format version.
        version: u32,
        /// Unix timestamp in milliseconds at save time.
        timestamp_ms: u64,
        /// The snapshot.
        state: Game,
    },
    /// Compact replay: initial state plus actions.
    Replay {
        /// Format version.
        version: u32,
        /// Unix timestamp in milliseconds at save time.
        timestamp_ms: u64,
        /// Initial state and the action list.
        data: ReplayData,
    },
}

/// Summary counters for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStats {
    /// Number of recorded entries.
    pub entries: usize,
    /// Current cursor index.
    pub cursor: usize,
    /// Number of named checkpoints.
    pub checkpoints: usize,
    /// Turn number of the first entry, if any.
    pub first_turn: Option<u32>,
    /// Turn number of the last entry, if any.
    pub last_turn: Option<u32>,
}

/// Single-timeline snapshot buffer with a movable cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    entries: Vec<HistoryEntry>,
    cursor: usize,
    next_id: u64,
    capacity: usize,
    checkpoints: HashMap<String, HistoryEntry>,
}

impl History {
    /// Create an empty history with the given capacity cap.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            next_id: 1,
            capacity: capacity.max(1),
            checkpoints: HashMap::new(),
        }
    }

    /// Number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entry has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current cursor index.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// The entry under the cursor.
    #[must_use]
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.cursor)
    }

    /// Record the initial state, discarding any prior timeline.
    pub fn record_initial(&mut self, state: Game) {
        self.entries.clear();
        self.cursor = 0;
        let entry = self.make_entry(state, None);
        self.entries.push(entry);
    }

    /// Record a completed round.
    ///
    /// Recording while the cursor is behind the tip truncates the tail
    /// (single-timeline semantics). The buffer cap drops the oldest entry.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] when the new turn number is not strictly
    /// greater than the current entry's.
    pub fn record(&mut self, state: Game, action: RoundAction) -> Result<(), EngineError> {
        if let Some(current) = self.current() {
            if state.turn_count <= current.turn_number {
                return Err(EngineError::new(format!(
                    "non-monotonic history: turn {} recorded after turn {}",
                    state.turn_count, current.turn_number
                )));
            }
            self.entries.truncate(self.cursor + 1);
        }
        let entry = self.make_entry(state, Some(action));
        self.entries.push(entry);
        while self.entries.len() > self.capacity {
            self.entries.remove(0);
        }
        self.cursor = self.entries.len() - 1;
        Ok(())
    }

    fn make_entry(&mut self, state: Game, action: Option<RoundAction>) -> HistoryEntry {
        let id = self.next_id;
        self.next_id += 1;
        HistoryEntry {
            id,
            turn_number: state.turn_count,
            timestamp_ms: now_ms(),
            state,
            action,
        }
    }

    /// Step the cursor back one entry.
    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        if self.cursor == 0 || self.entries.is_empty() {
            return None;
        }
        self.cursor -= 1;
        self.current()
    }

    /// Step the cursor forward one entry.
    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.current()
    }

    /// Move the cursor to an absolute index.
    pub fn jump_to_index(&mut self, index: usize) -> Option<&HistoryEntry> {
        if index >= self.entries.len() {
            return None;
        }
        self.cursor = index;
        self.current()
    }

    /// Move the cursor to the latest entry at or before a turn number.
    pub fn jump_to_turn(&mut self, turn: u32) -> Option<&HistoryEntry> {
        let index = self
            .entries
            .iter()
            .rposition(|e| e.turn_number <= turn)?;
        self.cursor = index;
        self.current()
    }

    /// Move the cursor to the first entry.
    pub fn jump_to_start(&mut self) -> Option<&HistoryEntry> {
        self.jump_to_index(0)
    }

    /// Move the cursor to the last entry.
    pub fn jump_to_end(&mut self) -> Option<&HistoryEntry> {
        if self.entries.is_empty() {
            return None;
        }
        self.jump_to_index(self.entries.len() - 1)
    }

    /// Name the entry under the cursor.
    ///
    /// Checkpoints are cloned out of the timeline, so truncation and the
    /// capacity cap never invalidate them.
    pub fn create_checkpoint(&mut self, name: impl Into<String>) -> bool {
        let Some(entry) = self.current().cloned() else {
            return false;
        };
        self.checkpoints.insert(name.into(), entry);
        true
    }

    /// Retrieve a named checkpoint.
    #[must_use]
    pub fn load_checkpoint(&self, name: &str) -> Option<&HistoryEntry> {
        self.checkpoints.get(name)
    }

    /// Names of all checkpoints.
    #[must_use]
    pub fn checkpoint_names(&self) -> Vec<&str> {
        self.checkpoints.keys().map(String::as_str).collect()
    }

    /// Summary counters.
    #[must_use]
    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            entries: self.entries.len(),
            cursor: self.cursor,
            checkpoints: self.checkpoints.len(),
            first_turn: self.entries.first().map(|e| e.turn_number),
            last_turn: self.entries.last().map(|e| e.turn_number),
        }
    }

    /// Serialize the full session.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] when serialization fails.
    pub fn to_json(&self) -> Result<String, EngineError> {
        let save = SaveFile::GameSession {
            version: SAVE_VERSION,
            timestamp_ms: now_ms(),
            entries: self.entries.clone(),
            cursor: self.cursor,
            checkpoints: self.checkpoints.clone(),
        };
        serde_json::to_string_pretty(&save).map_err(|e| EngineError::new(e.to_string()))
    }

    /// Restore a session from [`Self::to_json`] output.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] for malformed JSON, a wrong save kind, or
    /// an unsupported version.
    pub fn from_json(json: &str, capacity: usize) -> Result<Self, EngineError> {
        let save: SaveFile =
            serde_json::from_str(json).map_err(|e| EngineError::new(e.to_string()))?;
        let SaveFile::GameSession {
            version,
            entries,
            cursor,
            checkpoints,
            ..
        } = save
        else {
            return Err(EngineError::new("save file is not a game session"));
        };
        if version != SAVE_VERSION {
            return Err(EngineError::new(format!(
                "unsupported save version {version}"
            )));
        }
        let next_id = entries.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        let cursor = cursor.min(entries.len().saturating_sub(1));
        Ok(Self {
            entries,
            cursor,
            next_id,
            capacity: capacity.max(1),
            checkpoints,
        })
    }

    /// Compact replay form: initial state plus the action list.
    ///
    /// Returns `None` while the history is empty.
    #[must_use]
    pub fn to_replay_data(&self) -> Option<ReplayData> {
        let initial = self.entries.first()?.state.clone();
        let actions = self
            .entries
            .iter()
            .filter_map(|e| e.action.clone())
            .collect();
        Some(ReplayData { initial, actions })
    }

    /// All recorded entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }
}

#[allow(clippy::cast_possible_truncation)]
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Playback cursor over a recorded history.
#[derive(Debug, Clone)]
pub struct ReplayPlayer {
    entries: Vec<HistoryEntry>,
    position: usize,
    playing: bool,
    speed: f64,
    pending_ms: f64,
}

impl ReplayPlayer {
    /// Playback speed bounds.
    pub const SPEED_RANGE: (f64, f64) = (0.25, 8.0);

    /// Wrap a history's entries for playback.
    #[must_use]
    pub fn new(history: &History) -> Self {
        Self {
            entries: history.entries().to_vec(),
            position: 0,
            playing: false,
            speed: 1.0,
            pending_ms: 0.0,
        }
    }

    /// Start playback.
    pub fn play(&mut self) {
        self.playing = true;
    }

    /// Pause playback, keeping the position.
    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Stop playback and rewind to the first frame.
    pub fn stop(&mut self) {
        self.playing = false;
        self.position = 0;
        self.pending_ms = 0.0;
    }

    /// Whether playback is active.
    #[must_use]
    pub const fn is_playing(&self) -> bool {
        self.playing
    }

    /// The frame under the playback cursor.
    #[must_use]
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.position)
    }

    /// Advance one frame; pauses at the final frame.
    pub fn step_forward(&mut self) -> Option<&HistoryEntry> {
        if self.position + 1 >= self.entries.len() {
            self.playing = false;
            return None;
        }
        self.position += 1;
        self.current()
    }

    /// Rewind one frame.
    pub fn step_backward(&mut self) -> Option<&HistoryEntry> {
        if self.position == 0 {
            return None;
        }
        self.position -= 1;
        self.current()
    }

    /// Set playback speed, clamped to [`Self::SPEED_RANGE`].
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed.clamp(Self::SPEED_RANGE.0, Self::SPEED_RANGE.1);
    }

    /// Current playback speed.
    #[must_use]
    pub const fn speed(&self) -> f64 {
        self.speed
    }

    /// Jump to a fractional position in `[0, 1]`.
    pub fn seek_to_progress(&mut self, progress: f64) -> Option<&HistoryEntry> {
        if self.entries.is_empty() {
            return None;
        }
        let clamped = progress.clamp(0.0, 1.0);
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        #[allow(clippy::cast_sign_loss)]
        let index = (clamped * (self.entries.len() - 1) as f64).round() as usize;
        self.position = index;
        self.current()
    }

    /// Fraction of the replay consumed, in `[0, 1]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> f64 {
        if self.entries.len() <= 1 {
            return 1.0;
        }
        self.position as f64 / (self.entries.len() - 1) as f64
    }

    /// Feed elapsed wall time and step frames as they come due.
    ///
    /// Each frame takes `base_ms / speed` milliseconds; leftover time carries
    /// over to the next call. Returns the frame under the cursor when at
    /// least one step happened, `None` when paused or no frame came due.
    #[allow(clippy::cast_precision_loss)]
    pub fn advance(&mut self, elapsed_ms: u64, base_ms: u64) -> Option<&HistoryEntry> {
        if !self.playing || base_ms == 0 {
            return None;
        }
        self.pending_ms += elapsed_ms as f64;
        let frame = self.frame_delay_ms(base_ms) as f64;
        let mut stepped = false;
        while self.playing && self.pending_ms >= frame {
            self.pending_ms -= frame;
            if self.step_forward().is_none() {
                break;
            }
            stepped = true;
        }
        if stepped { self.current() } else { None }
    }

    /// Milliseconds to wait before the next frame at the current speed.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    pub fn frame_delay_ms(&self, base_ms: u64) -> u64 {
        (base_ms as f64 / self.speed).round() as u64
    }
}
