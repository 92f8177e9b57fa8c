//! Three-cycle scheduler
//!
//! Runs logic and physics at a fixed rate and a millisecond clock, each on its
//! own thread. Waits go through a per-cycle cancel channel so `stop` never
//! sleeps out a full period.

use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crate::error::ConfigError;

/// Time-cycle resolution
const CLOCK_PERIOD: Duration = Duration::from_millis(1);
/// A fixed-rate cycle that falls further behind than this skips ahead
const MAX_LAG: Duration = Duration::from_millis(250);

/// Receiver of scheduler callbacks
///
/// Callbacks arrive concurrently from three threads, so implementors
/// synchronize internally.
pub trait LoopHandler: Send + Sync + 'static {
    /// Logic tick (input, bonuses, effects)
    fn on_update(&self);
    /// Physics tick (ball movement and collisions)
    fn on_physics_update(&self);
    /// Whole milliseconds passed since the previous call
    fn on_time(&self, delta_ms: u64);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Running,
}

struct Cycle {
    name: &'static str,
    cancel: Sender<()>,
    handle: JoinHandle<()>,
}

/// Fixed-rate scheduler driving a `LoopHandler`
pub struct GameLoop {
    interval: Duration,
    state: LoopState,
    elapsed_ms: Arc<AtomicU64>,
    /// Logic, physics, time (stop order)
    cycles: Vec<Cycle>,
}

impl GameLoop {
    /// Scheduler ticking logic and physics `fps` times per second
    pub fn new(fps: i32) -> Result<Self, ConfigError> {
        if fps <= 0 {
            return Err(ConfigError::InvalidFps(fps));
        }
        Ok(Self {
            interval: Duration::from_nanos(1_000_000_000 / fps as u64),
            state: LoopState::Stopped,
            elapsed_ms: Arc::new(AtomicU64::new(0)),
            cycles: Vec::with_capacity(3),
        })
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Milliseconds counted by the time cycle since the last start
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms.load(Ordering::Acquire)
    }

    /// Spawn the three cycles; no-op while already running
    ///
    /// If any cycle fails to spawn, the ones already running are joined and
    /// the loop stays stopped.
    pub fn start<H: LoopHandler>(&mut self, handler: Arc<H>) -> io::Result<()> {
        if self.state == LoopState::Running {
            log::debug!("Loop already running");
            return Ok(());
        }
        self.elapsed_ms.store(0, Ordering::Release);

        if let Err(err) = self.spawn_all(handler) {
            log::error!("Failed to start loop: {err}");
            self.join_cycles();
            return Err(err);
        }

        self.state = LoopState::Running;
        log::info!("Loop started at {:?} per tick", self.interval);
        Ok(())
    }

    /// Cancel and join logic, then physics, then time
    ///
    /// Returns once no callback can run any more. No-op while stopped.
    pub fn stop(&mut self) {
        if self.state == LoopState::Stopped {
            return;
        }
        self.join_cycles();
        self.state = LoopState::Stopped;
        log::info!("Loop stopped after {} ms", self.elapsed_ms());
    }

    fn spawn_all<H: LoopHandler>(&mut self, handler: Arc<H>) -> io::Result<()> {
        let logic = Arc::clone(&handler);
        self.spawn_fixed("logic", move || logic.on_update())?;
        let physics = Arc::clone(&handler);
        self.spawn_fixed("physics", move || physics.on_physics_update())?;
        self.spawn_clock(handler)
    }

    fn join_cycles(&mut self) {
        for cycle in self.cycles.drain(..) {
            // A disconnected receiver means the thread is already gone
            let _ = cycle.cancel.send(());
            if cycle.handle.join().is_err() {
                log::error!("{} cycle panicked", cycle.name);
            }
        }
    }

    fn spawn_fixed<F>(&mut self, name: &'static str, mut tick: F) -> io::Result<()>
    where
        F: FnMut() + Send + 'static,
    {
        let interval = self.interval;
        self.spawn_cycle(name, move |cancel| {
            let mut deadline = Instant::now() + interval;
            loop {
                let wait = deadline.saturating_duration_since(Instant::now());
                if !idle(&cancel, wait) {
                    break;
                }
                tick();

                deadline += interval;
                let now = Instant::now();
                if now.saturating_duration_since(deadline) > MAX_LAG {
                    log::warn!("{name} cycle fell behind, skipping ahead");
                    deadline = now + interval;
                }
            }
        })
    }

    fn spawn_clock<H: LoopHandler>(&mut self, handler: Arc<H>) -> io::Result<()> {
        let elapsed_ms = Arc::clone(&self.elapsed_ms);
        self.spawn_cycle("time", move |cancel| {
            let started = Instant::now();
            let mut reported = 0u64;
            while idle(&cancel, CLOCK_PERIOD) {
                let total = started.elapsed().as_millis() as u64;
                let delta = total - reported;
                if delta == 0 {
                    continue;
                }
                reported = total;
                elapsed_ms.fetch_add(delta, Ordering::AcqRel);
                handler.on_time(delta);
            }
        })
    }

    fn spawn_cycle<F>(&mut self, name: &'static str, body: F) -> io::Result<()>
    where
        F: FnOnce(Receiver<()>) + Send + 'static,
    {
        let (cancel, cancelled) = mpsc::channel();
        let handle = thread::Builder::new()
            .name(format!("brickfall-{name}"))
            .spawn(move || body(cancelled))?;
        self.cycles.push(Cycle {
            name,
            cancel,
            handle,
        });
        Ok(())
    }
}

impl Drop for GameLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Wait up to `timeout`; false once cancellation arrives
fn idle(cancel: &Receiver<()>, timeout: Duration) -> bool {
    matches!(cancel.recv_timeout(timeout), Err(RecvTimeoutError::Timeout))
}
