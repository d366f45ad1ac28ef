// survival_ai_core/ai/src/systems/ai/steering.rs
use glam::Vec3;

use crate::core::config::EnemyConfig;
use crate::core::constants::CIRCLE_PURSUIT_WEIGHT;
use crate::core::types::{flat_direction, horizontal, rotate_y};

pub fn pursue(from: Vec3, to: Vec3) -> Vec3 {
    flat_direction(from, to)
}

/// Sideways orbit around the target with a pull toward it. `sign` picks
/// the rotational sense.
pub fn circle(from: Vec3, to: Vec3, sign: f32) -> Vec3 {
    let toward = flat_direction(from, to);
    let perpendicular = Vec3::new(-toward.z, 0.0, toward.x) * sign.signum();
    (perpendicular * (1.0 - CIRCLE_PURSUIT_WEIGHT) + toward * CIRCLE_PURSUIT_WEIGHT).normalize_or_zero()
}

/// Push away from neighbours closer than `radius`, stronger the closer
/// they are. Not normalised.
pub fn separation(position: Vec3, neighbors: &[Vec3], radius: f32) -> Vec3 {
    if radius <= 0.0 {
        return Vec3::ZERO;
    }
    neighbors
        .iter()
        .filter_map(|other| {
            let away = horizontal(position - *other);
            let distance = away.length();
            if distance < 1e-4 || distance >= radius {
                return None;
            }
            Some(away / distance * (1.0 - distance / radius))
        })
        .fold(Vec3::ZERO, |acc, push| acc + push)
}

/// Impulse scale: recovery ramp times the far-from-target boost.
pub fn speed_multiplier(distance_to_target: Option<f32>, recovery_scale: f32, config: &EnemyConfig) -> f32 {
    let boost = match distance_to_target {
        Some(distance) if distance > config.far_boost_distance => config.far_boost_factor,
        _ => 1.0,
    };
    recovery_scale * boost
}

/// Turns the applied heading toward the desired direction at a bounded
/// rate. The unsmoothed desired direction is kept for inspection.
#[derive(Debug, Clone)]
pub struct Steering {
    heading: Vec3,
    desired: Vec3,
    turn_rate: f32,
}

impl Steering {
    pub fn new(turn_rate: f32) -> Self {
        Steering { heading: Vec3::ZERO, desired: Vec3::ZERO, turn_rate }
    }

    pub fn heading(&self) -> Vec3 {
        self.heading
    }

    pub fn desired(&self) -> Vec3 {
        self.desired
    }

    /// Snaps the heading, skipping the turn-rate limit.
    pub fn set_heading(&mut self, direction: Vec3) {
        self.heading = horizontal(direction).normalize_or_zero();
        self.desired = self.heading;
    }

    /// Returns the heading to move along this tick (zero means stop).
    pub fn steer(&mut self, desired: Vec3, dt: f32) -> Vec3 {
        let desired = horizontal(desired).normalize_or_zero();
        self.desired = desired;
        if desired == Vec3::ZERO {
            return Vec3::ZERO;
        }
        if self.heading == Vec3::ZERO {
            self.heading = desired;
            return self.heading;
        }

        let max_turn = self.turn_rate * dt.max(0.0);
        let angle = self.heading.angle_between(desired);
        if angle <= max_turn || angle < 1e-4 {
            self.heading = desired;
        } else {
            let cross = self.heading.cross(desired).y;
            let sense = if cross < 0.0 { -1.0 } else { 1.0 };
            self.heading = rotate_y(self.heading, sense * max_turn).normalize_or_zero();
        }
        self.heading
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pursue_is_normalized_and_flat() {
        let dir = pursue(Vec3::ZERO, Vec3::new(6.0, 5.0, 8.0));
        assert_relative_eq!(dir.length(), 1.0, epsilon = 1e-5);
        assert_eq!(dir.y, 0.0);
        assert_relative_eq!(dir.x, 0.6, epsilon = 1e-5);
    }

    #[test]
    fn test_circle_is_mostly_sideways_with_pull() {
        let dir = circle(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), 1.0);
        assert!(dir.x > 0.0);
        assert!(dir.z.abs() > dir.x);
        let other = circle(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), -1.0);
        assert!(other.z * dir.z < 0.0);
    }

    #[test]
    fn test_separation_pushes_away_from_close_neighbors() {
        let push = separation(Vec3::ZERO, &[Vec3::new(1.0, 0.0, 0.0), Vec3::new(50.0, 0.0, 0.0)], 2.0);
        assert!(push.x < 0.0);
        assert_relative_eq!(push.z, 0.0);
    }

    #[test]
    fn test_far_boost_applies() {
        let config = EnemyConfig::default();
        assert_eq!(speed_multiplier(Some(5.0), 1.0, &config), 1.0);
        assert_eq!(speed_multiplier(Some(50.0), 1.0, &config), config.far_boost_factor);
        assert_eq!(speed_multiplier(Some(50.0), 0.5, &config), 0.5 * config.far_boost_factor);
    }

    #[test]
    fn test_steer_limits_turn_rate() {
        let mut steering = Steering::new(std::f32::consts::PI);
        steering.steer(Vec3::X, 0.1);
        let heading = steering.steer(Vec3::Z, 0.1);
        let turned = Vec3::X.angle_between(heading);
        assert!(turned > 0.0 && turned < std::f32::consts::FRAC_PI_2);
        assert_eq!(steering.desired(), Vec3::Z);
    }

    #[test]
    fn test_steer_reverses_without_stalling() {
        let mut steering = Steering::new(1.0);
        steering.steer(Vec3::X, 0.1);
        let heading = steering.steer(Vec3::NEG_X, 0.1);
        assert!(heading.length() > 0.9);
    }
}
