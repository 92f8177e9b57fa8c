//! Game state and core simulation types
//!
//! Everything the physics, logic and time cycles mutate lives in `GameState`.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::effects::{EffectManager, EffectOutcome, EffectTarget};
use super::layout::Layout;
use crate::consts::*;

/// Current phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Cycles keep running but nothing advances
    Paused,
    /// Lives ran out
    GameOver,
    /// Final level cleared
    Won,
}

impl GamePhase {
    /// True once the session can no longer advance
    pub fn is_finished(&self) -> bool {
        matches!(self, GamePhase::GameOver | GamePhase::Won)
    }
}

/// Axis-aligned rectangle (top-left origin)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    /// Closed-interval overlap (touching edges count)
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x <= other.right()
            && other.x <= self.right()
            && self.y <= other.bottom()
            && other.y <= self.bottom()
    }
}

/// Which scene edge the ball bounced off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Wall {
    Top,
    Bottom,
    Left,
    Right,
}

/// Which edge of a block the ball struck
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockSide {
    Top,
    Bottom,
    Left,
    Right,
}

/// The ball
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    /// Center position
    pub pos: DVec2,
    pub radius: f64,
    /// Horizontal speed (unsigned, direction in `go_right`)
    pub vx: f64,
    /// Vertical speed (unsigned, direction in `go_down`)
    pub vy: f64,
    pub go_right: bool,
    pub go_down: bool,
}

impl Default for Ball {
    fn default() -> Self {
        Self::serve()
    }
}

impl Ball {
    /// Fresh ball centered under the block grid, heading down-right
    pub fn serve() -> Self {
        let grid_bottom = BLOCK_PADDING_TOP + GRID_ROWS as f64 * BLOCK_HEIGHT;
        Self {
            pos: DVec2::new(SCENE_WIDTH / 2.0, grid_bottom + BALL_RADIUS * 3.0),
            radius: BALL_RADIUS,
            vx: SERVE_VELOCITY_X,
            vy: vertical_speed_for(SERVE_VELOCITY_X),
            go_right: true,
            go_down: true,
        }
    }

    /// Velocity with direction flags applied
    pub fn velocity(&self) -> DVec2 {
        DVec2::new(
            if self.go_right { self.vx } else { -self.vx },
            if self.go_down { self.vy } else { -self.vy },
        )
    }

    /// Where the ball will be after one more integration step
    pub fn next_pos(&self) -> DVec2 {
        self.pos + self.velocity()
    }

    pub fn advance(&mut self) {
        self.pos += self.velocity();
    }

    #[inline]
    pub fn top(&self) -> f64 {
        self.pos.y - self.radius
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.pos.y + self.radius
    }

    #[inline]
    pub fn left(&self) -> f64 {
        self.pos.x - self.radius
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.pos.x + self.radius
    }

    /// Bounding box of the ball
    pub fn bounds(&self) -> Rect {
        Rect::new(self.left(), self.top(), self.radius * 2.0, self.radius * 2.0)
    }

    /// Keep the whole ball inside the scene for its current radius
    pub fn clamp_to_scene(&mut self) {
        let r = self.radius.min(SCENE_WIDTH / 2.0).min(SCENE_HEIGHT / 2.0);
        self.pos.x = self.pos.x.clamp(r, SCENE_WIDTH - r);
        self.pos.y = self.pos.y.clamp(r, SCENE_HEIGHT - r);
    }
}

/// Vertical speed that brings the total speed to `MAX_VELOCITY`
///
/// Never NaN: a negative remainder from rounding is clamped to zero.
pub fn vertical_speed_for(vx: f64) -> f64 {
    (MAX_VELOCITY * MAX_VELOCITY - vx * vx).max(0.0).sqrt()
}

/// The player's paddle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paddle {
    /// Left edge
    pub x: f64,
    pub width: f64,
}

impl Default for Paddle {
    fn default() -> Self {
        Self {
            x: (SCENE_WIDTH - PADDLE_WIDTH) / 2.0,
            width: PADDLE_WIDTH,
        }
    }
}

impl Paddle {
    /// Top edge (fixed)
    #[inline]
    pub fn y(&self) -> f64 {
        PADDLE_Y
    }

    #[inline]
    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, PADDLE_Y, self.width, PADDLE_HEIGHT)
    }

    /// Shift horizontally, staying inside the scene
    pub fn move_by(&mut self, dx: f64) {
        self.x += dx;
        self.clamp_to_scene();
    }

    /// Resize around the current midpoint
    pub fn set_width_centered(&mut self, width: f64) {
        let center = self.center_x();
        self.width = width.clamp(PADDLE_MIN_WIDTH, SCENE_WIDTH);
        self.x = center - self.width / 2.0;
        self.clamp_to_scene();
    }

    pub fn clamp_to_scene(&mut self) {
        self.x = self.x.clamp(0.0, SCENE_WIDTH - self.width);
    }
}

/// Block types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlockKind {
    #[default]
    Normal,
    /// Drops a bonus when destroyed
    Random,
    /// Starts the gold window when destroyed
    GoldenTime,
    /// Grants a life when destroyed
    Heart,
}

impl BlockKind {
    /// Stable integer used in save records
    pub fn code(&self) -> i32 {
        match self {
            BlockKind::Normal => 0,
            BlockKind::Random => 1,
            BlockKind::GoldenTime => 2,
            BlockKind::Heart => 3,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(BlockKind::Normal),
            1 => Some(BlockKind::Random),
            2 => Some(BlockKind::GoldenTime),
            3 => Some(BlockKind::Heart),
            _ => None,
        }
    }
}

/// A block on the grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub row: u32,
    pub column: u32,
    pub color_index: u8,
    pub kind: BlockKind,
    pub destroyed: bool,
    /// Pixel rectangle derived from the grid cell
    pub rect: Rect,
}

impl Block {
    pub fn new(row: u32, column: u32, color_index: u8, kind: BlockKind) -> Self {
        Self {
            row,
            column,
            color_index,
            kind,
            destroyed: false,
            rect: Rect::new(
                BLOCK_PADDING_LEFT + column as f64 * BLOCK_WIDTH,
                BLOCK_PADDING_TOP + row as f64 * BLOCK_HEIGHT,
                BLOCK_WIDTH,
                BLOCK_HEIGHT,
            ),
        }
    }

    /// Stand-in for a block destroyed before a save; never collides
    pub fn tombstone() -> Self {
        Self {
            destroyed: true,
            ..Self::new(0, 0, 0, BlockKind::Normal)
        }
    }
}

/// A falling pickup dropped by a `Random` block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bonus {
    /// Top-left corner
    pub pos: DVec2,
    pub created_ms: u64,
    pub taken: bool,
}

impl Bonus {
    /// Spawn centered on the block's cell
    pub fn at_block(block: &Block, now_ms: u64) -> Self {
        let x = block.rect.x + (block.rect.w - BONUS_WIDTH) / 2.0;
        let y = block.rect.y + (block.rect.h - BONUS_HEIGHT) / 2.0;
        Self {
            pos: DVec2::new(x, y),
            created_ms: now_ms,
            taken: false,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.pos.x, self.pos.y, BONUS_WIDTH, BONUS_HEIGHT)
    }

    /// Fall one logic tick; speeds up the longer it has been falling
    pub fn fall(&mut self, now_ms: u64) {
        let age_secs = now_ms.saturating_sub(self.created_ms) as f64 / 1000.0;
        self.pos.y += 1.0 + age_secs;
    }

    pub fn is_off_screen(&self) -> bool {
        self.pos.y > SCENE_HEIGHT
    }
}

/// Things the presentation layer may animate or play a sound for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    BlockDestroyed {
        row: u32,
        column: u32,
        kind: BlockKind,
        side: BlockSide,
    },
    BonusSpawned {
        x: f64,
        y: f64,
    },
    BonusCaught {
        effect: EffectOutcome,
    },
    EffectReverted {
        target: EffectTarget,
    },
    WallBounce {
        wall: Wall,
    },
    PaddleHit,
    LifeLost {
        lives: i32,
    },
    HeartGained {
        lives: i32,
    },
    GoldStarted,
    GoldEnded,
    LevelCleared {
        level: u32,
    },
    LevelStarted {
        level: u32,
    },
    GameOver {
        score: i32,
    },
    GameWon {
        score: i32,
    },
}

/// Complete mutable simulation state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Current level (1-based)
    pub level: u32,
    pub score: i32,
    pub lives: i32,
    /// Blocks destroyed this level
    pub destroyed_count: u32,
    pub ball: Ball,
    pub paddle: Paddle,
    /// Every block of the level, destroyed ones included
    pub blocks: Vec<Block>,
    pub bonuses: Vec<Bonus>,
    /// Milliseconds advanced by the time cycle
    pub elapsed_ms: u64,
    /// When the current gold window started
    pub gold_time_ms: u64,
    pub gold_status: bool,
    /// A heart block was placed this level
    pub heart_block_exists: bool,
    /// Side of the most recent block hit
    pub last_block_hit: Option<BlockSide>,
    pub phase: GamePhase,
    pub effects: EffectManager,
}

impl GameState {
    /// Empty board at the given level
    pub fn new(level: u32, lives: i32) -> Self {
        Self {
            level,
            score: 0,
            lives,
            destroyed_count: 0,
            ball: Ball::serve(),
            paddle: Paddle::default(),
            blocks: Vec::new(),
            bonuses: Vec::new(),
            elapsed_ms: 0,
            gold_time_ms: 0,
            gold_status: false,
            heart_block_exists: false,
            last_block_hit: None,
            phase: GamePhase::Playing,
            effects: EffectManager::default(),
        }
    }

    /// Fill the board from a generated layout
    pub fn populate(&mut self, layout: Layout) {
        self.heart_block_exists = layout.has_heart;
        self.blocks = layout
            .blocks
            .into_iter()
            .map(|spec| Block::new(spec.row, spec.column, spec.color_index, spec.kind))
            .collect();
    }

    /// Reset per-level state: ball, paddle, pickups, effects, gold window
    pub fn reset_for_level(&mut self) {
        self.ball = Ball::serve();
        self.paddle = Paddle::default();
        self.bonuses.clear();
        self.effects.clear();
        self.destroyed_count = 0;
        self.gold_status = false;
        self.gold_time_ms = 0;
        self.last_block_hit = None;
        self.phase = GamePhase::Playing;
    }

    /// Every block of the level has been destroyed
    pub fn is_level_clear(&self) -> bool {
        self.destroyed_count as usize == self.blocks.len()
    }

    /// Blocks still standing
    pub fn surviving_blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(|b| !b.destroyed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_velocity_has_max_magnitude() {
        let ball = Ball::serve();
        assert!((ball.velocity().length() - MAX_VELOCITY).abs() < 1e-9);
        assert!(ball.go_down);
    }

    #[test]
    fn test_vertical_speed_never_nan() {
        assert_eq!(vertical_speed_for(MAX_VELOCITY + 1e-12), 0.0);
        assert_eq!(vertical_speed_for(10.0), 0.0);
        assert!(!vertical_speed_for(MAX_VELOCITY).is_nan());
    }

    #[test]
    fn test_paddle_clamped_after_move() {
        let mut paddle = Paddle::default();
        paddle.move_by(-1000.0);
        assert_eq!(paddle.x, 0.0);
        paddle.move_by(1000.0);
        assert_eq!(paddle.x, SCENE_WIDTH - paddle.width);
    }

    #[test]
    fn test_paddle_resize_keeps_center() {
        let mut paddle = Paddle::default();
        let center = paddle.center_x();
        paddle.set_width_centered(paddle.width + 22.0);
        assert!((paddle.center_x() - center).abs() < 1e-9);

        paddle.set_width_centered(1.0);
        assert_eq!(paddle.width, PADDLE_MIN_WIDTH);
    }

    #[test]
    fn test_paddle_resize_at_edge_stays_in_scene() {
        let mut paddle = Paddle { x: 0.0, width: 90.0 };
        paddle.set_width_centered(140.0);
        assert_eq!(paddle.x, 0.0);
        assert!(paddle.x + paddle.width <= SCENE_WIDTH);
    }

    #[test]
    fn test_block_rect_from_grid() {
        let block = Block::new(2, 3, 3, BlockKind::Normal);
        assert_eq!(block.rect.x, 3.0 * BLOCK_WIDTH);
        assert_eq!(block.rect.y, BLOCK_PADDING_TOP + 2.0 * BLOCK_HEIGHT);
    }

    #[test]
    fn test_block_kind_codes() {
        for kind in [
            BlockKind::Normal,
            BlockKind::Random,
            BlockKind::GoldenTime,
            BlockKind::Heart,
        ] {
            assert_eq!(BlockKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(BlockKind::from_code(4), None);
    }

    #[test]
    fn test_bonus_accelerates() {
        let block = Block::new(0, 0, 0, BlockKind::Random);
        let mut bonus = Bonus::at_block(&block, 0);
        let start = bonus.pos.y;
        bonus.fall(0);
        assert!((bonus.pos.y - start - 1.0).abs() < 1e-9);
        let before = bonus.pos.y;
        bonus.fall(2000);
        assert!((bonus.pos.y - before - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_level_clear_is_exact() {
        let mut state = GameState::new(1, 3);
        state.blocks.push(Block::new(0, 0, 0, BlockKind::Normal));
        state.blocks.push(Block::new(0, 1, 1, BlockKind::Normal));
        state.destroyed_count = 1;
        assert!(!state.is_level_clear());
        state.destroyed_count = 2;
        assert!(state.is_level_clear());
    }
}
