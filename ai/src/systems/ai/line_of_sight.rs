// survival_ai_core/ai/src/systems/ai/line_of_sight.rs
use glam::Vec3;
use tracing::{trace, warn};

use super::obstacle_memory::ObstacleMemory;
use crate::core::config::EnemyConfig;
use crate::core::constants::*;
use crate::core::types::{horizontal_distance, rotate_y, segment_distance};
use crate::world::{BodyHandle, RayCast, SpatialQuery};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LosParams {
    pub max_climb_ratio: f32,
    pub fan_count: usize,
    pub fan_spread_rad: f32,
}

impl LosParams {
    pub fn from_config(config: &EnemyConfig) -> Self {
        LosParams {
            max_climb_ratio: config.max_climb_ratio,
            fan_count: config.ray_fan_count.max(1),
            fan_spread_rad: config.ray_fan_spread_rad,
        }
    }
}

impl Default for LosParams {
    fn default() -> Self {
        LosParams {
            max_climb_ratio: DEFAULT_MAX_CLIMB_RATIO,
            fan_count: DEFAULT_RAY_FAN_COUNT,
            fan_spread_rad: DEFAULT_RAY_FAN_SPREAD_RAD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LosVerdict {
    Clear,
    /// Too steep to climb; `recorded` is the point added to memory, if any.
    TooSteep { recorded: Option<Vec3> },
    /// A remembered obstacle sits on the segment.
    RememberedObstacle { obstacle: Vec3 },
    /// A ray in the fan hit level geometry or another body.
    RayBlocked { point: Vec3, recorded: bool },
    /// The physics query failed; treated as blocked.
    QueryFailed,
}

impl LosVerdict {
    pub fn is_clear(&self) -> bool {
        matches!(self, LosVerdict::Clear)
    }

    /// Point newly written into obstacle memory by this check.
    pub fn recorded_point(&self) -> Option<Vec3> {
        match *self {
            LosVerdict::TooSteep { recorded } => recorded,
            LosVerdict::RayBlocked { point, recorded: true } => Some(point),
            _ => None,
        }
    }
}

/// Straight-path traversability test: slope limit, remembered obstacles,
/// then a fan of ray casts.
pub struct LineOfSight<'w, W: SpatialQuery + ?Sized> {
    world: &'w W,
    params: LosParams,
    caster: Option<BodyHandle>,
    target_body: Option<BodyHandle>,
}

impl<'w, W: SpatialQuery + ?Sized> LineOfSight<'w, W> {
    pub fn new(world: &'w W, params: LosParams) -> Self {
        LineOfSight { world, params, caster: None, target_body: None }
    }

    /// Body the rays start inside and must ignore.
    pub fn with_caster(mut self, caster: Option<BodyHandle>) -> Self {
        self.caster = caster;
        self
    }

    /// Body whose hits count as reaching the target rather than a block.
    pub fn with_target_body(mut self, target_body: Option<BodyHandle>) -> Self {
        self.target_body = target_body;
        self
    }

    pub fn is_path_clear(&self, from: Vec3, to: Vec3, memory: &mut ObstacleMemory) -> bool {
        self.check(from, to, memory).is_clear()
    }

    pub fn check(&self, from: Vec3, to: Vec3, memory: &mut ObstacleMemory) -> LosVerdict {
        let flat = horizontal_distance(from, to);
        let total = from.distance(to);
        if total < 1e-4 {
            return LosVerdict::Clear;
        }

        // 1. Slope
        if flat > SLOPE_CHECK_MIN_HORIZONTAL {
            let rise = (to.y - from.y).abs();
            if rise / flat > self.params.max_climb_ratio {
                let along = SLOPE_CHECK_MIN_HORIZONTAL / flat;
                let projected = from.lerp(to, along);
                let recorded = memory.record(projected);
                trace!("Slope {:.2} too steep from {:?} to {:?}", rise / flat, from, to);
                return LosVerdict::TooSteep { recorded: recorded.then_some(projected) };
            }
        }

        // 2. Remembered obstacles
        for obstacle in memory.iter() {
            let (distance, t) = segment_distance(*obstacle, from, to);
            if t > 0.0 && t < 1.0 && distance < OBSTACLE_SEGMENT_CLEARANCE {
                return LosVerdict::RememberedObstacle { obstacle: *obstacle };
            }
        }

        // 3. Ray fan
        let lift = Vec3::Y * LOS_RAY_HEIGHT_OFFSET;
        let origin = from + lift;
        let direction = ((to + lift) - origin).normalize_or_zero();
        let max_distance = total.min(LOS_RAY_MAX_DISTANCE);
        let count = self.params.fan_count.max(1);
        let centre = (count as f32 - 1.0) * 0.5;

        for i in 0..count {
            let offset = (i as f32 - centre) * self.params.fan_spread_rad;
            let ray = RayCast::new(origin, rotate_y(direction, offset), max_distance).excluding(self.caster);
            match self.world.cast_ray(&ray) {
                Ok(Some(hit)) => {
                    if hit.handle.is_some() && hit.handle == self.target_body {
                        continue;
                    }
                    if hit.distance < max_distance {
                        let point = hit.point - lift;
                        let recorded = memory.record(point);
                        trace!("LOS ray {} blocked at {:?} ({:.2} of {:.2})", i, point, hit.distance, max_distance);
                        return LosVerdict::RayBlocked { point, recorded };
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Line-of-sight ray cast failed, treating path as blocked: {}", e);
                    return LosVerdict::QueryFailed;
                }
            }
        }

        LosVerdict::Clear
    }
}
