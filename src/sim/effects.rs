//! Power-up effects granted by caught bonuses
//!
//! Timed effects remember the value they replaced and put it back exactly
//! once when their duration has elapsed on the session clock.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::{Ball, Paddle};

/// Paddle growth/shrink range (pixels)
const PADDLE_DELTA: std::ops::RangeInclusive<u32> = 20..=25;
/// Ball radius change range (pixels)
const BALL_DELTA: std::ops::RangeInclusive<i32> = -5..=5;
/// Instant score bonus range
const SCORE_BONUS: std::ops::RangeInclusive<i32> = 3..=8;
/// Timed effect length (elapsed milliseconds)
const DURATION_MS: std::ops::RangeInclusive<u64> = 5_000..=10_000;
/// Radius floor for stacked shrinks
const MIN_BALL_RADIUS: f64 = 2.0;

/// A rolled effect, reported to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EffectOutcome {
    PaddleResize { delta: f64, duration_ms: u64 },
    ScoreBonus { points: i32 },
    BallResize { delta: f64, duration_ms: u64 },
}

/// Which attribute a timed effect changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectTarget {
    PaddleWidth,
    BallRadius,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct TimedEffect {
    /// Value before the first overlapping effect
    original: f64,
    started_ms: u64,
    duration_ms: u64,
}

impl TimedEffect {
    fn expired(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.started_ms) >= self.duration_ms
    }
}

/// Entities an effect may modify
pub struct Targets<'a> {
    pub paddle: &'a mut Paddle,
    pub ball: &'a mut Ball,
    pub score: &'a mut i32,
}

/// Active timed effects
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectManager {
    paddle: Option<TimedEffect>,
    ball: Option<TimedEffect>,
}

impl EffectManager {
    /// Pick one of the three effects uniformly and apply it
    pub fn apply_random<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        targets: Targets<'_>,
        now_ms: u64,
    ) -> EffectOutcome {
        let effect = match rng.random_range(0..3) {
            0 => {
                let size = rng.random_range(PADDLE_DELTA) as f64;
                EffectOutcome::PaddleResize {
                    delta: if rng.random_bool(0.5) { size } else { -size },
                    duration_ms: rng.random_range(DURATION_MS),
                }
            }
            1 => EffectOutcome::ScoreBonus {
                points: rng.random_range(SCORE_BONUS),
            },
            _ => EffectOutcome::BallResize {
                delta: rng.random_range(BALL_DELTA) as f64,
                duration_ms: rng.random_range(DURATION_MS),
            },
        };
        self.apply(effect, targets, now_ms);
        effect
    }

    /// Apply a specific effect
    ///
    /// Re-applying a timed effect while one is active keeps the first
    /// original value and restarts the timer.
    pub fn apply(&mut self, effect: EffectOutcome, targets: Targets<'_>, now_ms: u64) {
        match effect {
            EffectOutcome::PaddleResize { delta, duration_ms } => {
                let paddle = targets.paddle;
                let original = self.paddle.map_or(paddle.width, |active| active.original);
                paddle.set_width_centered(paddle.width + delta);
                self.paddle = Some(TimedEffect {
                    original,
                    started_ms: now_ms,
                    duration_ms,
                });
                log::debug!("Paddle width {:+} -> {}", delta, paddle.width);
            }
            EffectOutcome::ScoreBonus { points } => {
                *targets.score += points;
                log::debug!("Score bonus +{}", points);
            }
            EffectOutcome::BallResize { delta, duration_ms } => {
                let ball = targets.ball;
                let original = self.ball.map_or(ball.radius, |active| active.original);
                resize_ball(ball, (ball.radius + delta).max(MIN_BALL_RADIUS));
                self.ball = Some(TimedEffect {
                    original,
                    started_ms: now_ms,
                    duration_ms,
                });
                log::debug!("Ball radius {:+} -> {}", delta, ball.radius);
            }
        }
    }

    /// Revert every expired effect; returns what was reverted
    pub fn update(&mut self, now_ms: u64, targets: Targets<'_>) -> Vec<EffectTarget> {
        let mut reverted = Vec::new();

        if let Some(active) = self.paddle.filter(|e| e.expired(now_ms)) {
            targets.paddle.set_width_centered(active.original);
            self.paddle = None;
            reverted.push(EffectTarget::PaddleWidth);
        }
        if let Some(active) = self.ball.filter(|e| e.expired(now_ms)) {
            resize_ball(targets.ball, active.original);
            self.ball = None;
            reverted.push(EffectTarget::BallRadius);
        }

        reverted
    }

    /// Drop all effects without reverting
    pub fn clear(&mut self) {
        self.paddle = None;
        self.ball = None;
    }

    pub fn is_active(&self, target: EffectTarget) -> bool {
        match target {
            EffectTarget::PaddleWidth => self.paddle.is_some(),
            EffectTarget::BallRadius => self.ball.is_some(),
        }
    }
}

/// Change the radius, keeping the ball inside the scene before and after
fn resize_ball(ball: &mut Ball, radius: f64) {
    ball.clamp_to_scene();
    ball.radius = radius;
    ball.clamp_to_scene();
}
