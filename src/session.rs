//! Game session state machine
//!
//! `GameSession` owns the simulation state and drives level, score and lives
//! progression. `SharedSession` wraps it for the scheduler: one mutex guards
//! the session, and every logic tick publishes an immutable `Frame` plus the
//! tick's events for the presentation layer.

use std::{
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        mpsc::{self, Receiver, Sender},
    },
    thread::{self, JoinHandle},
};

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::engine::LoopHandler;
use crate::error::PersistError;
use crate::persistence::{SaveRecord, SaveStore};
use crate::settings::Settings;
use crate::sim::{
    Ball, BlockKind, GameEvent, GamePhase, GameState, Rect, TickInput, generate, logic_step,
    physics_step, time_step,
};
use crate::{Color, PALETTE, palette_color};

/// A standing block as the presentation layer sees it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockView {
    pub rect: Rect,
    pub color: Color,
    pub kind: BlockKind,
}

/// Immutable per-tick view of the session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub level: u32,
    pub score: i32,
    pub lives: i32,
    pub phase: GamePhase,
    pub elapsed_ms: u64,
    pub gold: bool,
    pub ball: Ball,
    pub paddle: Rect,
    pub blocks: Vec<BlockView>,
    pub bonuses: Vec<Rect>,
}

/// One player's game
pub struct GameSession {
    state: GameState,
    rng: Pcg32,
    seed: u64,
    input: TickInput,
    events: Vec<GameEvent>,
    settings: Settings,
    store: SaveStore,
    /// Score and lives when the current level began, for `restart`
    level_start: (i32, i32),
}

impl GameSession {
    /// Session at level 1, seeded from settings or entropy
    pub fn new(settings: Settings) -> Self {
        let seed = settings.seed.unwrap_or_else(rand::random);
        let store = SaveStore::new(settings.save_path.clone());
        let mut session = Self {
            state: GameState::new(1, settings.starting_lives),
            rng: Pcg32::seed_from_u64(seed),
            seed,
            input: TickInput::default(),
            events: Vec::new(),
            settings,
            store,
            level_start: (0, 0),
        };
        session.new_game();
        session
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Direct state access for scripted scenarios
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &SaveStore {
        &self.store
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    /// Level 1, zero score, full lives
    pub fn new_game(&mut self) {
        let autopilot = self.input.autopilot;
        self.state = GameState::new(1, self.settings.starting_lives);
        self.input = TickInput {
            autopilot,
            ..TickInput::default()
        };
        log::info!("New game (seed {})", self.seed);
        self.start_level(1);
    }

    /// Replay the current level from its starting score and lives
    pub fn restart(&mut self) {
        let (score, lives) = self.level_start;
        self.state.score = score;
        self.state.lives = lives;
        log::info!("Restarting level {}", self.state.level);
        self.start_level(self.state.level);
    }

    /// Skip to the next level, or win when already on the final one
    pub fn next_level(&mut self) {
        if self.state.phase == GamePhase::Won {
            return;
        }
        self.advance_level();
    }

    /// Replace the live state with the saved one
    ///
    /// `Ok(false)` when there is no save or the saved game had already ended;
    /// a fresh game is started instead. A malformed save also starts a fresh
    /// game and returns the error.
    pub fn load(&mut self) -> Result<bool, PersistError> {
        match self.store.load() {
            Ok(Some(record)) if self.is_finished_record(&record) => {
                log::info!(
                    "Saved game already over (level {}, {} lives), starting fresh",
                    record.level,
                    record.lives
                );
                self.new_game();
                Ok(false)
            }
            Ok(Some(record)) => {
                self.state = record.into_state();
                self.level_start = (self.state.score, self.state.lives);
                self.events.clear();
                log::info!(
                    "Resumed level {} with score {} and {} lives",
                    self.state.level,
                    self.state.score,
                    self.state.lives
                );
                Ok(true)
            }
            Ok(None) => {
                log::info!("No save found, starting fresh");
                self.new_game();
                Ok(false)
            }
            Err(err) => {
                log::error!("Failed to load save: {err}");
                self.new_game();
                Err(err)
            }
        }
    }

    /// No lives left, or nothing standing on the final level
    fn is_finished_record(&self, record: &SaveRecord) -> bool {
        record.lives <= 0
            || (record.blocks.is_empty() && record.level >= self.settings.final_level as i32)
    }

    /// Write the current state synchronously
    pub fn save(&self) -> Result<(), PersistError> {
        self.store
            .save(&SaveRecord::from(&self.state))
            .inspect_err(|err| log::error!("Failed to save: {err}"))
    }

    /// Snapshot now, write on a dedicated thread
    pub fn save_in_background(&self) -> Result<JoinHandle<Result<(), PersistError>>, PersistError> {
        let record = SaveRecord::from(&self.state);
        let store = self.store.clone();
        let handle = thread::Builder::new()
            .name("brickfall-save".to_string())
            .spawn(move || {
                store
                    .save(&record)
                    .inspect_err(|err| log::error!("Background save failed: {err}"))
            })?;
        Ok(handle)
    }

    pub fn set_left(&mut self, held: bool) {
        self.input.left = held;
    }

    pub fn set_right(&mut self, held: bool) {
        self.input.right = held;
    }

    /// Let the paddle follow the ball
    pub fn set_autopilot(&mut self, enabled: bool) {
        self.input.autopilot = enabled;
    }

    /// Switch between playing and paused; ignored once the game has ended
    pub fn toggle_pause(&mut self) {
        self.state.phase = match self.state.phase {
            GamePhase::Playing => GamePhase::Paused,
            GamePhase::Paused => GamePhase::Playing,
            finished => finished,
        };
        log::debug!("Phase now {:?}", self.state.phase);
    }

    pub fn physics_update(&mut self) {
        physics_step(&mut self.state, &self.input, &mut self.events);
    }

    /// Logic tick followed by level-clear detection
    pub fn logic_update(&mut self) {
        logic_step(&mut self.state, &self.input, &mut self.rng, &mut self.events);

        if self.state.phase == GamePhase::Playing && self.state.is_level_clear() {
            let level = self.state.level;
            log::info!("Level {} cleared with score {}", level, self.state.score);
            self.events.push(GameEvent::LevelCleared { level });
            self.advance_level();
        }
    }

    pub fn time_update(&mut self, delta_ms: u64) {
        time_step(&mut self.state, delta_ms);
    }

    pub fn snapshot(&self) -> Frame {
        let state = &self.state;
        Frame {
            level: state.level,
            score: state.score,
            lives: state.lives,
            phase: state.phase,
            elapsed_ms: state.elapsed_ms,
            gold: state.gold_status,
            ball: state.ball.clone(),
            paddle: state.paddle.rect(),
            blocks: state
                .surviving_blocks()
                .map(|b| BlockView {
                    rect: b.rect,
                    color: palette_color(b.color_index),
                    kind: b.kind,
                })
                .collect(),
            bonuses: state.bonuses.iter().map(|b| b.rect()).collect(),
        }
    }

    /// Events since the last drain, oldest first
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    fn advance_level(&mut self) {
        if self.state.level >= self.settings.final_level {
            self.state.phase = GamePhase::Won;
            log::info!("Game won with score {}", self.state.score);
            self.events.push(GameEvent::GameWon {
                score: self.state.score,
            });
            return;
        }
        self.start_level(self.state.level + 1);
    }

    fn start_level(&mut self, level: u32) {
        self.state.level = level;
        self.state.reset_for_level();
        let layout = generate(level, &PALETTE, &mut self.rng);
        self.state.populate(layout);
        self.level_start = (self.state.score, self.state.lives);
        log::info!(
            "Level {} started with {} blocks",
            level,
            self.state.blocks.len()
        );
        self.events.push(GameEvent::LevelStarted { level });
    }
}

/// Scheduler-facing wrapper around a session
pub struct SharedSession {
    session: Mutex<GameSession>,
    frame: Mutex<Arc<Frame>>,
    events: Sender<GameEvent>,
}

impl SharedSession {
    /// Wrap a session; the receiver yields every event in tick order
    pub fn new(session: GameSession) -> (Arc<Self>, Receiver<GameEvent>) {
        let (events, receiver) = mpsc::channel();
        let frame = Mutex::new(Arc::new(session.snapshot()));
        let shared = Arc::new(Self {
            session: Mutex::new(session),
            frame,
            events,
        });
        (shared, receiver)
    }

    /// Run commands against the session under the lock
    pub fn with<R>(&self, f: impl FnOnce(&mut GameSession) -> R) -> R {
        f(&mut lock(&self.session))
    }

    /// Latest published frame
    pub fn frame(&self) -> Arc<Frame> {
        Arc::clone(&lock(&self.frame))
    }
}

impl LoopHandler for SharedSession {
    fn on_update(&self) {
        let (frame, events) = {
            let mut session = lock(&self.session);
            session.logic_update();
            (Arc::new(session.snapshot()), session.drain_events())
        };
        *lock(&self.frame) = frame;
        for event in events {
            // Nobody listening is fine
            let _ = self.events.send(event);
        }
    }

    fn on_physics_update(&self) {
        lock(&self.session).physics_update();
    }

    fn on_time(&self, delta_ms: u64) {
        lock(&self.session).time_update(delta_ms);
    }
}

/// A panicked cycle must not take the session down with it
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
