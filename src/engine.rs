//! Round scheduler: gathers moves, applies them in canonical order, and
//! records history.
//!
//! The engine is generic over a [`MoveProvider`] so live LLM play, scripted
//! tests, and headless random games all share the same loop. Replay applies
//! the same [`apply_round`] used for live rounds.

use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::time::{Duration, Instant};

use crate::config::GameConfig;
use crate::error::{ConfigError, EngineError, LlmError};
use crate::game::{Direction, Game, Move, PlayerId};
use crate::history::{History, RoundAction};

/// Source of per-round moves.
pub trait MoveProvider {
    /// Produce a move result for each requested player.
    ///
    /// The engine requests the living players minus any manually controlled
    /// one. A failed result never fails the round; the engine substitutes a
    /// random-safe fallback move for that player.
    fn round_moves(
        &mut self,
        game: &Game,
        players: &[PlayerId],
    ) -> impl Future<Output = BTreeMap<PlayerId, Result<Move, LlmError>>>;

    /// Hook invoked on engine reset.
    fn reset(&mut self) {}
}

/// Provider that replays pre-recorded move queues; exhausted queues stay.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    scripts: BTreeMap<PlayerId, VecDeque<Move>>,
}

impl ScriptedProvider {
    /// Create an empty provider; unscripted players stay put.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a sequence of moves for a player.
    pub fn script(&mut self, id: PlayerId, moves: impl IntoIterator<Item = Move>) {
        self.scripts.entry(id).or_default().extend(moves);
    }
}

impl MoveProvider for ScriptedProvider {
    async fn round_moves(
        &mut self,
        _game: &Game,
        players: &[PlayerId],
    ) -> BTreeMap<PlayerId, Result<Move, LlmError>> {
        players
            .iter()
            .map(|&id| {
                let mv = self
                    .scripts
                    .get_mut(&id)
                    .and_then(VecDeque::pop_front)
                    .unwrap_or_else(Move::stay);
                (id, Ok(mv))
            })
            .collect()
    }
}

/// Provider that fails every request, forcing the engine's random-safe
/// fallback. Used for headless games without an API key.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomProvider;

impl MoveProvider for RandomProvider {
    async fn round_moves(
        &mut self,
        _game: &Game,
        players: &[PlayerId],
    ) -> BTreeMap<PlayerId, Result<Move, LlmError>> {
        players
            .iter()
            .map(|&id| (id, Err(LlmError::MissingKey)))
            .collect()
    }
}

/// Events emitted by the engine, drained via [`Engine::poll_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A round resolved and the state changed.
    StateChanged,
    /// The game ended.
    GameOver {
        /// The winning player, if a winner could be decided.
        winner: Option<PlayerId>,
    },
    /// A non-fatal problem worth surfacing.
    Error {
        /// Description.
        message: String,
    },
}

/// Apply one round's moves in canonical order and advance the round.
///
/// Moves apply in ascending player id: bomb placement first, then the
/// directional step. Dead players are skipped, blocked actions no-op.
/// Shared between live rounds and replay.
pub fn apply_round(game: &mut Game, action: &RoundAction) {
    for (&id, mv) in &action.moves {
        let Some(player) = game.player(id) else {
            continue;
        };
        if !player.alive {
            continue;
        }
        if mv.drop_bomb && !game.place_bomb(id) {
            log::debug!("player {id}: bomb placement blocked");
        }
        if mv.direction != Direction::Stay && !game.move_player(id, mv.direction) {
            log::debug!("player {id}: move {} blocked", mv.direction.as_str());
        }
    }
    game.advance_round();
}

/// The round loop.
///
/// The run/pause flags live here, not in [`Game`]: snapshots stay free of
/// loop state, so a replayed state compares equal to the recorded one.
#[derive(Debug)]
pub struct Engine<P: MoveProvider> {
    game: Game,
    provider: P,
    history: History,
    manual_player: Option<PlayerId>,
    pending_manual: Option<(PlayerId, Move)>,
    last_round_at: Option<Instant>,
    running: bool,
    paused: bool,
    finished: bool,
    events: VecDeque<EngineEvent>,
}

impl<P: MoveProvider> Engine<P> {
    /// Create an engine with a fresh world and record the initial snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the configuration or generated world
    /// is unusable.
    pub fn new(config: GameConfig, provider: P) -> Result<Self, ConfigError> {
        let game = Game::new(config)?;
        let mut history = History::new(game.config.max_history_entries);
        history.record_initial(game.clone());
        Ok(Self {
            game,
            provider,
            history,
            manual_player: None,
            pending_manual: None,
            last_round_at: None,
            running: false,
            paused: false,
            finished: false,
            events: VecDeque::new(),
        })
    }

    /// Current state snapshot.
    #[must_use]
    pub const fn state(&self) -> &Game {
        &self.game
    }

    /// Recorded history.
    #[must_use]
    pub const fn history(&self) -> &History {
        &self.history
    }

    /// Mutable history access (checkpoints, jumps, saves).
    pub const fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    /// Start (or resume) the loop.
    pub fn start(&mut self) {
        self.running = true;
        self.paused = false;
    }

    /// Pause the loop; state is preserved.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Whether the loop is running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Whether the loop is paused.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether the game reached a terminal state.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Discard everything and regenerate the initial world from the
    /// configured seed. Pending manual moves and in-flight round results
    /// are dropped.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when regeneration fails.
    pub fn reset(&mut self) -> Result<(), ConfigError> {
        let config = self.game.config.clone();
        self.game = Game::new(config)?;
        self.history = History::new(self.game.config.max_history_entries);
        self.history.record_initial(self.game.clone());
        self.pending_manual = None;
        self.last_round_at = None;
        self.running = false;
        self.paused = false;
        self.finished = false;
        self.provider.reset();
        self.events.clear();
        self.events.push_back(EngineEvent::StateChanged);
        Ok(())
    }

    /// Designate one player whose moves come from [`Self::handle_manual_move`]
    /// instead of the provider. A manual player is excluded from the
    /// provider fan-out entirely; without a submitted move they stay put.
    pub fn set_manual_player(&mut self, player: Option<PlayerId>) {
        if self.manual_player != player {
            self.pending_manual = None;
        }
        self.manual_player = player;
    }

    /// Submit the designated manual player's move for the next round.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] when the player is not the designated
    /// manual player or the move is invalid.
    pub fn handle_manual_move(&mut self, id: PlayerId, mv: Move) -> Result<(), EngineError> {
        if self.manual_player != Some(id) {
            return Err(EngineError::new(format!(
                "player {id} is not under manual control"
            )));
        }
        if !self.game.validate_move(id, &mv) {
            return Err(EngineError::new(format!(
                "manual move rejected for player {id}"
            )));
        }
        self.pending_manual = Some((id, mv));
        Ok(())
    }

    /// Drain one queued event.
    pub fn poll_event(&mut self) -> Option<EngineEvent> {
        self.events.pop_front()
    }

    /// One cooperative step of the loop.
    ///
    /// Does nothing while stopped or paused; emits the terminal event when
    /// the game is over; otherwise waits out the inter-round delay and
    /// executes a round.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] when history recording fails.
    pub async fn tick(&mut self) -> Result<(), EngineError> {
        if !self.running || self.paused || self.finished {
            return Ok(());
        }
        if self.game.is_game_over() {
            self.finish();
            return Ok(());
        }
        let delay = Duration::from_millis(self.game.config.effective_turn_delay_ms());
        if let Some(last) = self.last_round_at {
            let elapsed = last.elapsed();
            if elapsed < delay {
                tokio::time::sleep(delay - elapsed).await;
            }
        }
        self.execute_round().await
    }

    /// Gather, apply, and record one full round.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] when history recording fails.
    pub async fn execute_round(&mut self) -> Result<(), EngineError> {
        let requested: Vec<PlayerId> = self
            .game
            .living_players()
            .map(|p| p.id)
            .filter(|&id| self.manual_player != Some(id))
            .collect();
        let results = self.provider.round_moves(&self.game, &requested).await;

        let mut moves: BTreeMap<PlayerId, Move> = BTreeMap::new();
        for (id, result) in results {
            let mv = match result {
                Ok(mv) => mv,
                Err(err) => {
                    log::warn!("player {id}: move request failed ({err}), using fallback");
                    self.game.random_move(id)
                }
            };
            moves.insert(id, mv);
        }
        if let Some(id) = self.manual_player
            && self.game.player(id).is_some_and(|p| p.alive)
        {
            let mv = self
                .pending_manual
                .take()
                .map_or_else(Move::stay, |(_, mv)| mv);
            moves.insert(id, mv);
        }

        let action = RoundAction { moves };
        apply_round(&mut self.game, &action);
        self.history.record(self.game.clone(), action)?;
        self.last_round_at = Some(Instant::now());
        self.events.push_back(EngineEvent::StateChanged);

        if self.game.is_game_over() {
            self.finish();
        }
        Ok(())
    }

    fn finish(&mut self) {
        self.finished = true;
        self.running = false;
        self.events.push_back(EngineEvent::GameOver {
            winner: self.game.winner(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Coord, Tile};

    fn test_config(seed: u64) -> GameConfig {
        GameConfig {
            seed,
            soft_block_density: 0.0,
            loot_drop_chance: 0.0,
            testing_mode: true,
            ..GameConfig::default()
        }
    }

    #[tokio::test]
    async fn test_scripted_round_applies_in_id_order() {
        let mut provider = ScriptedProvider::new();
        provider.script(1, [Move::drop_and_step(Direction::Down)]);
        provider.script(2, [Move::step(Direction::Left)]);

        let mut engine = Engine::new(test_config(1), provider).unwrap();
        engine.start();
        engine.tick().await.unwrap();

        let game = engine.state();
        assert_eq!(game.round_count, 1);
        assert_eq!(game.player(1).unwrap().pos(), Coord::new(0, 1));
        assert_eq!(game.player(2).unwrap().pos(), Coord::new(11, 0));
        assert!(game.bomb_at(Coord::new(0, 0)).is_some());
        assert_eq!(engine.poll_event(), Some(EngineEvent::StateChanged));
    }

    #[tokio::test]
    async fn test_tick_is_inert_until_started() {
        let mut engine = Engine::new(test_config(1), ScriptedProvider::new()).unwrap();
        engine.tick().await.unwrap();
        assert_eq!(engine.state().round_count, 0);

        engine.start();
        engine.pause();
        engine.tick().await.unwrap();
        assert_eq!(engine.state().round_count, 0);

        engine.start();
        engine.tick().await.unwrap();
        assert_eq!(engine.state().round_count, 1);
    }

    #[tokio::test]
    async fn test_failing_provider_falls_back_to_random_moves() {
        // Every request fails; the round must still complete with valid
        // recorded moves for all living players.
        let mut engine = Engine::new(test_config(7), RandomProvider).unwrap();
        engine.start();
        engine.tick().await.unwrap();

        assert_eq!(engine.state().round_count, 1);
        let entry = engine.history().current().unwrap();
        let action = entry.action.as_ref().unwrap();
        assert_eq!(action.moves.len(), 4);
        assert_eq!(engine.history().len(), 2);
    }

    #[tokio::test]
    async fn test_history_grows_per_round() {
        let mut engine = Engine::new(test_config(3), RandomProvider).unwrap();
        engine.start();
        for _ in 0..5 {
            if engine.is_finished() {
                break;
            }
            engine.tick().await.unwrap();
        }
        let rounds = usize::try_from(engine.state().round_count).unwrap();
        assert_eq!(engine.history().len(), rounds + 1);
    }

    #[tokio::test]
    async fn test_manual_move_overrides_provider() {
        let mut provider = ScriptedProvider::new();
        provider.script(1, [Move::step(Direction::Down)]);

        let mut engine = Engine::new(test_config(1), provider).unwrap();
        engine.set_manual_player(Some(1));
        engine.handle_manual_move(1, Move::step(Direction::Right)).unwrap();
        engine.start();
        engine.tick().await.unwrap();

        assert_eq!(engine.state().player(1).unwrap().pos(), Coord::new(1, 0));
    }

    /// Records which players each round requested from the provider.
    #[derive(Debug, Default)]
    struct RosterProvider {
        requested: Vec<Vec<PlayerId>>,
    }

    impl MoveProvider for RosterProvider {
        async fn round_moves(
            &mut self,
            _game: &Game,
            players: &[PlayerId],
        ) -> BTreeMap<PlayerId, Result<Move, LlmError>> {
            self.requested.push(players.to_vec());
            players.iter().map(|&id| (id, Ok(Move::stay()))).collect()
        }
    }

    #[tokio::test]
    async fn test_manual_player_excluded_from_provider_requests() {
        let mut engine = Engine::new(test_config(1), RosterProvider::default()).unwrap();
        engine.set_manual_player(Some(1));
        engine.handle_manual_move(1, Move::step(Direction::Right)).unwrap();
        engine.start();
        engine.tick().await.unwrap();

        assert_eq!(engine.provider.requested, vec![vec![2, 3, 4]]);
        assert_eq!(engine.state().player(1).unwrap().pos(), Coord::new(1, 0));
    }

    #[tokio::test]
    async fn test_manual_player_without_move_stays() {
        let mut engine = Engine::new(test_config(1), RosterProvider::default()).unwrap();
        engine.set_manual_player(Some(1));
        engine.start();
        engine.tick().await.unwrap();

        assert_eq!(engine.provider.requested, vec![vec![2, 3, 4]]);
        assert_eq!(engine.state().player(1).unwrap().pos(), Coord::new(0, 0));
        let action = engine.history().current().unwrap().action.as_ref().unwrap();
        assert_eq!(action.moves[&1], Move::stay());
    }

    #[tokio::test]
    async fn test_manual_move_rejected_for_wrong_player() {
        let mut engine = Engine::new(test_config(1), ScriptedProvider::new()).unwrap();
        engine.set_manual_player(Some(1));
        assert!(engine.handle_manual_move(2, Move::stay()).is_err());
        assert!(engine.handle_manual_move(1, Move::stay()).is_ok());
    }

    #[tokio::test]
    async fn test_game_over_emits_winner() {
        let mut engine = Engine::new(test_config(1), RandomProvider).unwrap();
        // Leave only player 3 alive
        for idx in [0, 1, 3] {
            engine.game.players[idx].alive = false;
        }
        engine.start();
        engine.tick().await.unwrap();

        assert!(engine.is_finished());
        let events: Vec<_> = std::iter::from_fn(|| engine.poll_event()).collect();
        assert!(events.contains(&EngineEvent::GameOver { winner: Some(3) }));
    }

    #[tokio::test]
    async fn test_reset_restores_initial_world() {
        let mut engine = Engine::new(
            GameConfig {
                seed: 42,
                testing_mode: true,
                ..GameConfig::default()
            },
            RandomProvider,
        )
        .unwrap();
        let initial_grid = engine.state().grid.clone();
        engine.start();
        for _ in 0..3 {
            engine.tick().await.unwrap();
        }
        assert_ne!(engine.state().round_count, 0);

        engine.reset().unwrap();
        assert_eq!(engine.state().round_count, 0);
        assert_eq!(engine.state().grid, initial_grid);
        assert_eq!(engine.history().len(), 1);
        assert!(!engine.is_finished());
    }

    #[tokio::test]
    async fn test_replay_reproduces_scripted_session() {
        // Record a scripted session, then re-apply its actions to the
        // initial snapshot; every intermediate state must match.
        let mut provider = ScriptedProvider::new();
        provider.script(
            1,
            [
                Move::drop_and_step(Direction::Down),
                Move::step(Direction::Down),
                Move::step(Direction::Right),
                Move::stay(),
                Move::stay(),
            ],
        );
        provider.script(2, vec![Move::step(Direction::Left); 5]);
        provider.script(3, vec![Move::step(Direction::Up); 5]);

        let mut engine = Engine::new(test_config(11), provider).unwrap();
        engine.start();
        for _ in 0..5 {
            engine.tick().await.unwrap();
        }

        let replay = engine.history().to_replay_data().unwrap();
        let mut game = replay.initial;
        for (i, action) in replay.actions.iter().enumerate() {
            apply_round(&mut game, action);
            assert_eq!(
                &game,
                &engine.history().entries()[i + 1].state,
                "divergence after round {}",
                i + 1
            );
        }
        assert_eq!(&game, engine.state());
    }

    #[tokio::test]
    async fn test_blocked_moves_are_non_fatal() {
        let mut provider = ScriptedProvider::new();
        // Up and left from the corner are off the board
        provider.script(1, [Move::step(Direction::Up), Move::step(Direction::Left)]);

        let mut engine = Engine::new(test_config(1), provider).unwrap();
        engine.start();
        engine.tick().await.unwrap();
        engine.tick().await.unwrap();

        assert_eq!(engine.state().round_count, 2);
        assert_eq!(engine.state().player(1).unwrap().pos(), Coord::new(0, 0));
    }

    #[tokio::test]
    async fn test_soft_density_zero_board_in_tests_is_open() {
        let engine = Engine::new(test_config(5), RandomProvider).unwrap();
        assert_eq!(engine.state().grid.count(Tile::Soft), 0);
    }
}
