// survival_ai_core/ai/src/systems/ai/stuck.rs
use glam::Vec3;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, trace};

use crate::core::config::EnemyConfig;
use crate::core::constants::*;
use crate::core::types::{horizontal, horizontal_distance, rotate_y};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StuckEvent {
    None,
    /// Stuck time just crossed the soft threshold.
    Soft,
    /// Stuck time just crossed the hard-escalation mark.
    Hard,
}

/// Tracks how long a body has been trying to move without getting anywhere.
///
/// Displacement is measured from an anchor that only moves once the body
/// has left a [`STUCK_DISPLACEMENT_THRESHOLD`] radius around it, so slow
/// but steady walking at high frame rates is not mistaken for being stuck.
#[derive(Debug, Clone)]
pub struct StuckDetector {
    anchor: Option<Vec3>,
    stuck_time: f32,
    soft_fired: bool,
    hard_fired: bool,
    soft_threshold: f32,
    hard_threshold: f32,
}

impl StuckDetector {
    pub fn new(soft_threshold: f32, hard_threshold: f32) -> Self {
        StuckDetector {
            anchor: None,
            stuck_time: 0.0,
            soft_fired: false,
            hard_fired: false,
            soft_threshold,
            hard_threshold,
        }
    }

    pub fn from_config(config: &EnemyConfig) -> Self {
        Self::new(config.stuck_threshold_secs, config.hard_stuck_secs)
    }

    pub fn stuck_time(&self) -> f32 {
        self.stuck_time
    }

    pub fn is_stuck(&self) -> bool {
        self.soft_fired
    }

    pub fn reset(&mut self) {
        self.anchor = None;
        self.end_episode();
    }

    fn end_episode(&mut self) {
        if self.soft_fired {
            trace!("Stuck episode ended after {:.2}s", self.stuck_time);
        }
        self.stuck_time = 0.0;
        self.soft_fired = false;
        self.hard_fired = false;
    }

    pub fn update(&mut self, position: Vec3, intended_speed: f32, dt: f32) -> StuckEvent {
        let anchor = match self.anchor {
            Some(anchor) => anchor,
            None => {
                self.anchor = Some(position);
                return StuckEvent::None;
            }
        };

        if horizontal_distance(anchor, position) >= STUCK_DISPLACEMENT_THRESHOLD {
            self.anchor = Some(position);
            self.end_episode();
            return StuckEvent::None;
        }
        if intended_speed <= STUCK_MIN_INTENDED_SPEED {
            self.end_episode();
            return StuckEvent::None;
        }

        self.stuck_time += dt.max(0.0);

        if !self.hard_fired && self.stuck_time > self.hard_threshold {
            self.hard_fired = true;
            self.soft_fired = true;
            debug!("Hard stuck after {:.2}s at {:?}", self.stuck_time, position);
            return StuckEvent::Hard;
        }
        if !self.soft_fired && self.stuck_time > self.soft_threshold {
            self.soft_fired = true;
            debug!("Stuck for {:.2}s at {:?}", self.stuck_time, position);
            return StuckEvent::Soft;
        }
        StuckEvent::None
    }
}

/// Random turn for a soft-stuck escape: 45..180 degrees either way.
pub fn escape_direction<R: Rng>(heading: Vec3, rng: &mut R) -> Vec3 {
    let base = horizontal(heading).normalize_or_zero();
    let base = if base == Vec3::ZERO { Vec3::Z } else { base };
    let degrees = rng.gen_range(AVOID_TURN_MIN_DEG..=AVOID_TURN_MAX_DEG);
    let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
    rotate_y(base, sign * degrees.to_radians()).normalize_or_zero()
}

/// Hard-stuck escape: a flat quarter turn.
pub fn quarter_turn<R: Rng>(heading: Vec3, rng: &mut R) -> Vec3 {
    let base = horizontal(heading).normalize_or_zero();
    let base = if base == Vec3::ZERO { Vec3::Z } else { base };
    let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
    rotate_y(base, sign * std::f32::consts::FRAC_PI_2)
}

/// Reflects `heading` off a wall with the given (possibly estimated)
/// normal and jitters the result.
pub fn wall_bounce_direction<R: Rng>(heading: Vec3, normal: Vec3, rng: &mut R) -> Vec3 {
    let dir = horizontal(heading).normalize_or_zero();
    let mut n = horizontal(normal).normalize_or_zero();
    if n == Vec3::ZERO {
        n = -dir;
    }
    let reflected = dir - 2.0 * dir.dot(n) * n;
    let jitter = rng.gen_range(-WALL_BOUNCE_JITTER_RAD..=WALL_BOUNCE_JITTER_RAD);
    let bounced = rotate_y(reflected, jitter).normalize_or_zero();
    if bounced == Vec3::ZERO {
        n
    } else {
        bounced
    }
}

/// Time-boxed window after a wall bounce during which movement impulses
/// ramp back from a floor to full strength.
#[derive(Debug, Clone, Default)]
pub struct WallRecovery {
    window: Option<(Duration, Duration)>,
}

impl WallRecovery {
    pub fn begin(&mut self, now: Duration, duration: Duration) {
        self.window = Some((now, now + duration));
    }

    pub fn is_active(&self, now: Duration) -> bool {
        matches!(self.window, Some((_, until)) if now < until)
    }

    /// Multiplier for regular movement impulses at `now`.
    pub fn speed_scale(&self, now: Duration, floor: f32) -> f32 {
        match self.window {
            Some((start, until)) if now < until => {
                let total = (until - start).as_secs_f32();
                if total <= 0.0 {
                    return 1.0;
                }
                let elapsed = now.saturating_sub(start).as_secs_f32();
                (elapsed / total).clamp(floor.clamp(0.0, 1.0), 1.0)
            }
            _ => 1.0,
        }
    }

    pub fn clear(&mut self) {
        self.window = None;
    }
}
