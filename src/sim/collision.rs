//! Collision detection and response
//!
//! Every check returns a tagged outcome instead of setting loose flags, so a
//! tick can never act on a stale result from the previous one.

use super::state::{Ball, Block, BlockSide, Paddle, Rect, Wall, vertical_speed_for};
use crate::consts::*;

/// Gap left between the ball and a block edge after repositioning
const SEPARATION: f64 = 0.01;

/// Walls touched this tick; a corner yields one of each axis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WallHits {
    pub vertical: Option<Wall>,
    pub horizontal: Option<Wall>,
}

impl WallHits {
    pub fn any(&self) -> bool {
        self.vertical.is_some() || self.horizontal.is_some()
    }
}

/// How the paddle check concluded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaddleOutcome {
    Miss,
    /// Next step would cross into the paddle
    Swept,
    /// Already overlapping at the current position
    Overlap,
}

impl PaddleOutcome {
    pub fn is_hit(&self) -> bool {
        !matches!(self, PaddleOutcome::Miss)
    }
}

/// Result of the block scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    NoHit,
    Hit { index: usize, side: BlockSide },
}

/// Bounce off scene edges, updating direction flags
///
/// Top sends the ball down, bottom sends it up; the caller decides whether a
/// bottom bounce costs a life.
pub fn resolve_walls(ball: &mut Ball) -> WallHits {
    let mut hits = WallHits::default();

    if ball.top() <= 0.0 {
        ball.go_down = true;
        hits.vertical = Some(Wall::Top);
    } else if ball.bottom() >= SCENE_HEIGHT {
        ball.go_down = false;
        hits.vertical = Some(Wall::Bottom);
    }

    if ball.left() <= 0.0 {
        ball.go_right = true;
        hits.horizontal = Some(Wall::Left);
    } else if ball.right() >= SCENE_WIDTH {
        ball.go_right = false;
        hits.horizontal = Some(Wall::Right);
    }

    hits
}

/// Check the paddle, swept path first so fast balls cannot tunnel through
pub fn check_paddle(ball: &Ball, paddle: &Paddle) -> PaddleOutcome {
    if !ball.go_down {
        return PaddleOutcome::Miss;
    }
    let target = paddle.rect();

    // Leading edge crosses the paddle top between now and the next step
    let next = ball.next_pos();
    let r = ball.radius;
    let crosses_top = ball.bottom() < target.y && next.y + r >= target.y;
    let min_x = ball.pos.x.min(next.x) - r;
    let max_x = ball.pos.x.max(next.x) + r;
    if crosses_top && min_x <= target.right() && max_x >= target.x {
        return PaddleOutcome::Swept;
    }

    if ball.bounds().overlaps(&target) {
        return PaddleOutcome::Overlap;
    }

    PaddleOutcome::Miss
}

/// Send the ball back up with an angle set by where it met the paddle
///
/// `spin` is added to the signed horizontal speed before the vertical speed is
/// derived, so the total speed is always `MAX_VELOCITY`.
pub fn bounce_off_paddle(ball: &mut Ball, paddle: &Paddle, spin: f64) {
    let half = paddle.width / 2.0;
    let offset = ((ball.pos.x - paddle.center_x()) / half).clamp(-1.0, 1.0);
    let vx = offset * MAX_VELOCITY_X + spin;

    ball.go_right = vx >= 0.0;
    ball.vx = vx.abs().min(MAX_VELOCITY);
    ball.vy = vertical_speed_for(ball.vx);
    ball.go_down = false;
    ball.pos.y = ball.pos.y.min(paddle.y() - ball.radius);
}

/// Find the first standing block the ball touches, in collection order
pub fn check_blocks(ball: &Ball, blocks: &[Block]) -> BlockOutcome {
    let bounds = ball.bounds();
    blocks
        .iter()
        .enumerate()
        .filter(|(_, block)| !block.destroyed)
        .find(|(_, block)| bounds.overlaps(&block.rect))
        .map_or(BlockOutcome::NoHit, |(index, block)| BlockOutcome::Hit {
            index,
            side: struck_side(ball, &block.rect),
        })
}

/// Edge of `rect` the ball struck; bottom, top, right, left in that order
pub fn struck_side(ball: &Ball, rect: &Rect) -> BlockSide {
    let pos = ball.pos;
    if ball.top() <= rect.bottom() && pos.y > rect.bottom() {
        BlockSide::Bottom
    } else if ball.bottom() >= rect.y && pos.y < rect.y {
        BlockSide::Top
    } else if ball.left() <= rect.right() && pos.x > rect.right() {
        BlockSide::Right
    } else if ball.right() >= rect.x && pos.x < rect.x {
        BlockSide::Left
    } else if ball.go_down {
        // Center already inside: push back the way it came
        BlockSide::Top
    } else {
        BlockSide::Bottom
    }
}

/// Move the ball clear of the struck edge and point it away
pub fn deflect_off_block(ball: &mut Ball, rect: &Rect, side: BlockSide) {
    let r = ball.radius;
    match side {
        BlockSide::Bottom => {
            ball.pos.y = rect.bottom() + r + SEPARATION;
            ball.go_down = true;
        }
        BlockSide::Top => {
            ball.pos.y = rect.y - r - SEPARATION;
            ball.go_down = false;
        }
        BlockSide::Right => {
            ball.pos.x = rect.right() + r + SEPARATION;
            ball.go_right = true;
        }
        BlockSide::Left => {
            ball.pos.x = rect.x - r - SEPARATION;
            ball.go_right = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::BlockKind;
    use glam::DVec2;
    use proptest::prelude::*;

    fn ball_at(x: f64, y: f64) -> Ball {
        Ball {
            pos: DVec2::new(x, y),
            ..Ball::serve()
        }
    }

    #[test]
    fn test_top_wall_sends_ball_down() {
        let mut ball = ball_at(100.0, 5.0);
        ball.go_down = false;
        let hits = resolve_walls(&mut ball);
        assert_eq!(hits.vertical, Some(Wall::Top));
        assert!(ball.go_down);
    }

    #[test]
    fn test_corner_hits_both_axes() {
        let mut ball = ball_at(SCENE_WIDTH - 2.0, SCENE_HEIGHT - 2.0);
        let hits = resolve_walls(&mut ball);
        assert_eq!(hits.vertical, Some(Wall::Bottom));
        assert_eq!(hits.horizontal, Some(Wall::Right));
        assert!(!ball.go_down);
        assert!(!ball.go_right);
    }

    #[test]
    fn test_no_wall_in_open_space() {
        let mut ball = ball_at(250.0, 350.0);
        assert!(!resolve_walls(&mut ball).any());
    }

    #[test]
    fn test_swept_catches_fast_ball() {
        let paddle = Paddle { x: 205.0, width: 90.0 };
        // Would jump from above the paddle to below it in one step
        let mut ball = ball_at(250.0, 660.0);
        ball.vx = 0.0;
        ball.vy = 50.0;
        assert_eq!(check_paddle(&ball, &paddle), PaddleOutcome::Swept);

        let mut moved = ball.clone();
        moved.advance();
        assert!(!moved.bounds().overlaps(&paddle.rect()));
    }

    #[test]
    fn test_overlap_fallback() {
        let paddle = Paddle { x: 205.0, width: 90.0 };
        let mut ball = ball_at(250.0, 675.0);
        ball.vx = 0.0;
        // Bottom edge already below the paddle top
        assert_eq!(check_paddle(&ball, &paddle), PaddleOutcome::Overlap);

        let beside = Paddle { x: 0.0, width: 90.0 };
        assert_eq!(check_paddle(&ball, &beside), PaddleOutcome::Miss);
    }

    #[test]
    fn test_rising_ball_ignores_paddle() {
        let paddle = Paddle { x: 205.0, width: 90.0 };
        let mut ball = ball_at(250.0, 675.0);
        ball.go_down = false;
        assert_eq!(check_paddle(&ball, &paddle), PaddleOutcome::Miss);
    }

    #[test]
    fn test_paddle_edge_sends_ball_sideways() {
        let paddle = Paddle { x: 205.0, width: 90.0 };
        let mut ball = ball_at(205.0, 672.0);
        bounce_off_paddle(&mut ball, &paddle, 0.0);
        assert!(!ball.go_right);
        assert!((ball.vx - MAX_VELOCITY_X).abs() < 1e-9);
        assert!(!ball.go_down);
        assert!(ball.bottom() <= paddle.y());
    }

    #[test]
    fn test_spin_keeps_speed() {
        let paddle = Paddle { x: 205.0, width: 90.0 };
        let mut ball = ball_at(295.0, 672.0);
        bounce_off_paddle(&mut ball, &paddle, SPIN);
        let v = ball.velocity();
        assert!((v.length() - MAX_VELOCITY).abs() < 1e-9);
        assert!((ball.vx - (MAX_VELOCITY_X + SPIN)).abs() < 1e-9);
    }

    #[test]
    fn test_first_block_wins() {
        let blocks = vec![
            Block::new(0, 0, 0, BlockKind::Normal),
            Block::new(0, 1, 1, BlockKind::Normal),
        ];
        // Straddles the shared edge of both blocks
        let ball = ball_at(BLOCK_WIDTH, BLOCK_PADDING_TOP + BLOCK_HEIGHT + 5.0);
        match check_blocks(&ball, &blocks) {
            BlockOutcome::Hit { index, side } => {
                assert_eq!(index, 0);
                assert_eq!(side, BlockSide::Bottom);
            }
            BlockOutcome::NoHit => panic!("expected a hit"),
        }
    }

    #[test]
    fn test_destroyed_blocks_are_skipped() {
        let mut blocks = vec![Block::new(0, 0, 0, BlockKind::Normal)];
        blocks[0].destroyed = true;
        let ball = ball_at(25.0, BLOCK_PADDING_TOP + BLOCK_HEIGHT + 5.0);
        assert_eq!(check_blocks(&ball, &blocks), BlockOutcome::NoHit);
    }

    #[test]
    fn test_side_priority() {
        let rect = Rect::new(100.0, 100.0, 50.0, 20.0);
        // Below-left corner: bottom outranks left
        let ball = ball_at(95.0, 125.0);
        assert_eq!(struck_side(&ball, &rect), BlockSide::Bottom);
        // Above-right corner: top outranks right
        let ball = ball_at(155.0, 95.0);
        assert_eq!(struck_side(&ball, &rect), BlockSide::Top);
        let ball = ball_at(158.0, 110.0);
        assert_eq!(struck_side(&ball, &rect), BlockSide::Right);
        let ball = ball_at(92.0, 110.0);
        assert_eq!(struck_side(&ball, &rect), BlockSide::Left);
    }

    #[test]
    fn test_deflect_sets_direction() {
        let rect = Rect::new(100.0, 100.0, 50.0, 20.0);
        let mut ball = ball_at(158.0, 110.0);
        ball.go_right = false;
        deflect_off_block(&mut ball, &rect, BlockSide::Right);
        assert!(ball.go_right);
        assert!(!ball.bounds().overlaps(&rect));
    }

    proptest! {
        #[test]
        fn prop_paddle_bounce_has_max_speed(
            x in 150.0f64..350.0,
            paddle_x in 0.0f64..410.0,
            width in 20.0f64..200.0,
        ) {
            let paddle = Paddle { x: paddle_x, width };
            let mut ball = ball_at(x, 670.0);
            bounce_off_paddle(&mut ball, &paddle, 0.0);
            prop_assert!(ball.vx <= MAX_VELOCITY_X + 1e-9);
            let speed_sq = ball.vx * ball.vx + ball.vy * ball.vy;
            prop_assert!((speed_sq - MAX_VELOCITY * MAX_VELOCITY).abs() < 1e-9);
            prop_assert!(!ball.go_down);

            let mut spun = ball_at(x, 670.0);
            bounce_off_paddle(&mut spun, &paddle, -SPIN);
            let speed_sq = spun.vx * spun.vx + spun.vy * spun.vy;
            prop_assert!((speed_sq - MAX_VELOCITY * MAX_VELOCITY).abs() < 1e-9);
        }

        #[test]
        fn prop_block_hit_leaves_ball_outside(
            dx in -14.0f64..64.0,
            dy in -14.0f64..34.0,
            radius in 5.0f64..15.0,
            go_down in any::<bool>(),
        ) {
            let block = Block::new(1, 4, 4, BlockKind::Normal);
            let mut ball = ball_at(block.rect.x + dx, block.rect.y + dy);
            ball.radius = radius;
            ball.go_down = go_down;
            if let BlockOutcome::Hit { side, .. } = check_blocks(&ball, std::slice::from_ref(&block)) {
                deflect_off_block(&mut ball, &block.rect, side);
                prop_assert!(!ball.bounds().overlaps(&block.rect));
            }
        }
    }
}
