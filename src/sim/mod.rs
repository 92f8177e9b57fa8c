//! Simulation module
//!
//! All gameplay logic lives here. This module must stay free of threads,
//! clocks and I/O:
//! - Time only advances through `time_step`
//! - Seeded RNG only
//! - Stable iteration order (block collection order)

pub mod collision;
pub mod effects;
pub mod layout;
pub mod state;
pub mod tick;

pub use collision::{BlockOutcome, PaddleOutcome, WallHits};
pub use effects::{EffectManager, EffectOutcome, EffectTarget};
pub use layout::{BlockSpec, Layout, generate};
pub use state::{
    Ball, Block, BlockKind, BlockSide, Bonus, GameEvent, GamePhase, GameState, Paddle, Rect, Wall,
};
pub use tick::{TickInput, logic_step, physics_step, time_step};
