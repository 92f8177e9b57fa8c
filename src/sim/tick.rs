//! Per-cycle simulation steps
//!
//! The scheduler runs three cycles against one `GameState`: physics moves the
//! ball and resolves collisions, logic moves the paddle and pickups and expires
//! timed effects, time advances the session clock.

use rand::Rng;

use super::collision::{
    BlockOutcome, bounce_off_paddle, check_blocks, check_paddle, deflect_off_block, resolve_walls,
};
use super::effects::Targets;
use super::state::{BlockKind, BlockSide, Bonus, GameEvent, GamePhase, GameState, Wall};
use crate::consts::*;

/// Held inputs sampled by each tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickInput {
    /// Left direction held
    pub left: bool,
    /// Right direction held
    pub right: bool,
    /// Idle/demo mode - paddle follows the ball
    pub autopilot: bool,
}

impl TickInput {
    /// -1, 0 or 1 from the held direction keys
    pub fn steer(&self) -> f64 {
        match (self.left, self.right) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }
}

/// Advance the ball one step and resolve walls, paddle and at most one block
pub fn physics_step(state: &mut GameState, input: &TickInput, events: &mut Vec<GameEvent>) {
    if state.phase != GamePhase::Playing {
        return;
    }

    state.ball.advance();

    let walls = resolve_walls(&mut state.ball);
    if let Some(wall) = walls.vertical {
        events.push(GameEvent::WallBounce { wall });
        if wall == Wall::Bottom && !state.gold_status {
            lose_life(state, events);
            if state.phase.is_finished() {
                return;
            }
        }
    }
    if let Some(wall) = walls.horizontal {
        events.push(GameEvent::WallBounce { wall });
    }

    let paddle = check_paddle(&state.ball, &state.paddle);
    if paddle.is_hit() {
        bounce_off_paddle(&mut state.ball, &state.paddle, input.steer() * SPIN);
        log::debug!(
            "Paddle hit ({:?}) vx={:.3} vy={:.3}",
            paddle,
            state.ball.vx,
            state.ball.vy
        );
        events.push(GameEvent::PaddleHit);
    }

    if let BlockOutcome::Hit { index, side } = check_blocks(&state.ball, &state.blocks) {
        destroy_block(state, index, side, events);
    }
}

/// Move paddle and pickups, apply caught bonuses, expire timed effects
pub fn logic_step<R: Rng + ?Sized>(
    state: &mut GameState,
    input: &TickInput,
    rng: &mut R,
    events: &mut Vec<GameEvent>,
) {
    if state.phase != GamePhase::Playing {
        return;
    }
    let now = state.elapsed_ms;

    let steer = if input.autopilot {
        autopilot_steer(state)
    } else {
        input.steer()
    };
    if steer != 0.0 {
        state.paddle.move_by(steer * PADDLE_SPEED);
    }

    let paddle_rect = state.paddle.rect();
    let mut caught = 0;
    for bonus in state.bonuses.iter_mut().filter(|b| !b.taken) {
        bonus.fall(now);
        if bonus.rect().overlaps(&paddle_rect) {
            bonus.taken = true;
            caught += 1;
        }
    }
    state.bonuses.retain(|b| !b.taken && !b.is_off_screen());

    for _ in 0..caught {
        let targets = Targets {
            paddle: &mut state.paddle,
            ball: &mut state.ball,
            score: &mut state.score,
        };
        let effect = state.effects.apply_random(rng, targets, now);
        log::debug!("Bonus caught: {:?}", effect);
        events.push(GameEvent::BonusCaught { effect });
    }

    let targets = Targets {
        paddle: &mut state.paddle,
        ball: &mut state.ball,
        score: &mut state.score,
    };
    for target in state.effects.update(now, targets) {
        events.push(GameEvent::EffectReverted { target });
    }

    if state.gold_status && now.saturating_sub(state.gold_time_ms) >= GOLD_DURATION_MS {
        state.gold_status = false;
        events.push(GameEvent::GoldEnded);
    }
}

/// Advance the session clock; frozen unless playing
pub fn time_step(state: &mut GameState, delta_ms: u64) {
    if state.phase == GamePhase::Playing {
        state.elapsed_ms += delta_ms;
    }
}

fn lose_life(state: &mut GameState, events: &mut Vec<GameEvent>) {
    state.lives -= 1;
    log::debug!("Ball missed, {} lives left", state.lives);
    events.push(GameEvent::LifeLost { lives: state.lives });
    if state.lives <= 0 {
        state.lives = 0;
        state.phase = GamePhase::GameOver;
        log::info!("Game over with score {}", state.score);
        events.push(GameEvent::GameOver { score: state.score });
    }
}

fn destroy_block(state: &mut GameState, index: usize, side: BlockSide, events: &mut Vec<GameEvent>) {
    let now = state.elapsed_ms;
    let block = &mut state.blocks[index];
    block.destroyed = true;
    let (row, column, kind, rect) = (block.row, block.column, block.kind, block.rect);

    state.destroyed_count += 1;
    state.score += 1;
    state.last_block_hit = Some(side);
    deflect_off_block(&mut state.ball, &rect, side);
    events.push(GameEvent::BlockDestroyed {
        row,
        column,
        kind,
        side,
    });

    match kind {
        BlockKind::Random => {
            let bonus = Bonus::at_block(&state.blocks[index], now);
            events.push(GameEvent::BonusSpawned {
                x: bonus.pos.x,
                y: bonus.pos.y,
            });
            state.bonuses.push(bonus);
        }
        BlockKind::GoldenTime => {
            state.gold_status = true;
            state.gold_time_ms = now;
            events.push(GameEvent::GoldStarted);
        }
        BlockKind::Heart => {
            state.lives += 1;
            events.push(GameEvent::HeartGained { lives: state.lives });
        }
        BlockKind::Normal => {}
    }
}

/// Direction the demo paddle should move this tick
///
/// Chases the lowest falling bonus while the ball is rising, otherwise lines
/// up under the ball.
fn autopilot_steer(state: &GameState) -> f64 {
    let bonus_target = if state.ball.go_down {
        None
    } else {
        state
            .bonuses
            .iter()
            .filter(|b| !b.taken)
            .max_by(|a, b| a.pos.y.total_cmp(&b.pos.y))
            .map(|b| b.pos.x + BONUS_WIDTH / 2.0)
    };
    let target = bonus_target.unwrap_or(state.ball.pos.x);

    let diff = target - state.paddle.center_x();
    if diff.abs() <= PADDLE_SPEED {
        0.0
    } else {
        diff.signum()
    }
}
