//! Brickfall - simulation core for a paddle-and-ball block breaker
//!
//! Core modules:
//! - `sim`: Simulation (physics, collisions, power-ups, level layouts)
//! - `session`: Game session state machine and frame snapshots
//! - `engine`: Three-cycle fixed-rate scheduler
//! - `persistence`: Binary save/load with atomic replace
//! - `settings`: Runtime configuration

pub mod engine;
pub mod error;
pub mod persistence;
pub mod session;
pub mod settings;
pub mod sim;

pub use engine::{GameLoop, LoopHandler, LoopState};
pub use error::{ConfigError, PersistError};
pub use session::{Frame, GameSession, SharedSession};
pub use settings::Settings;

use serde::{Deserialize, Serialize};

/// Game configuration constants
pub mod consts {
    /// Scene dimensions (pixels, origin top-left, y down)
    pub const SCENE_WIDTH: f64 = 500.0;
    pub const SCENE_HEIGHT: f64 = 700.0;

    /// Default logic/physics rate
    pub const DEFAULT_FPS: i32 = 120;

    /// Paddle defaults
    pub const PADDLE_WIDTH: f64 = 90.0;
    pub const PADDLE_HEIGHT: f64 = 10.0;
    pub const PADDLE_Y: f64 = 680.0;
    pub const PADDLE_MIN_WIDTH: f64 = 20.0;
    /// Pixels per logic tick while a direction is held
    pub const PADDLE_SPEED: f64 = 3.0;

    /// Ball defaults
    pub const BALL_RADIUS: f64 = 10.0;
    /// Speed magnitude after every paddle bounce (pixels per physics tick)
    pub const MAX_VELOCITY: f64 = 3.0;
    /// Horizontal speed at the paddle's outer edge
    pub const MAX_VELOCITY_X: f64 = 2.5;
    /// Horizontal nudge when a direction key is held on contact
    pub const SPIN: f64 = 0.3;
    /// Horizontal speed of a freshly served ball
    pub const SERVE_VELOCITY_X: f64 = 1.0;

    /// Block grid
    pub const GRID_ROWS: u32 = 8;
    pub const GRID_COLUMNS: u32 = 10;
    pub const BLOCK_WIDTH: f64 = 50.0;
    pub const BLOCK_HEIGHT: f64 = 20.0;
    pub const BLOCK_PADDING_TOP: f64 = 60.0;
    pub const BLOCK_PADDING_LEFT: f64 = 0.0;

    /// Falling bonus size
    pub const BONUS_WIDTH: f64 = 30.0;
    pub const BONUS_HEIGHT: f64 = 20.0;

    /// Gold window length (elapsed milliseconds)
    pub const GOLD_DURATION_MS: u64 = 5_000;

    /// Session defaults
    pub const STARTING_LIVES: i32 = 3;
    pub const FINAL_LEVEL: u32 = 12;
}

/// An sRGB block color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Fixed block palette; saved blocks store an index into this table
pub const PALETTE: [Color; 10] = [
    Color::rgb(0xc0, 0x39, 0x2b), // red
    Color::rgb(0xe6, 0x7e, 0x22), // orange
    Color::rgb(0xf1, 0xc4, 0x0f), // yellow
    Color::rgb(0x27, 0xae, 0x60), // green
    Color::rgb(0x16, 0xa0, 0x85), // teal
    Color::rgb(0x29, 0x80, 0xb9), // blue
    Color::rgb(0x8e, 0x44, 0xad), // purple
    Color::rgb(0xe8, 0x43, 0x93), // pink
    Color::rgb(0x7f, 0x8c, 0x8d), // gray
    Color::rgb(0x2c, 0x3e, 0x50), // navy
];

/// Palette color for an index, wrapping out-of-range values
#[inline]
pub fn palette_color(index: u8) -> Color {
    PALETTE[index as usize % PALETTE.len()]
}
