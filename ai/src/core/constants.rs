// survival_ai_core/ai/src/core/constants.rs
use std::time::Duration;

pub const SIMULATION_TICK_RATE: u64 = 60;
pub const TICK_DURATION_MS: u64 = 1000 / SIMULATION_TICK_RATE;
pub const TICK_DURATION: Duration = Duration::from_millis(TICK_DURATION_MS);

// Obstacle memory
pub const OBSTACLE_DEDUP_RADIUS: f32 = 2.0;
pub const DEFAULT_PATH_MEMORY_LIMIT: usize = 5;

// Line of sight
pub const OBSTACLE_SEGMENT_CLEARANCE: f32 = 2.5;
pub const LOS_RAY_MAX_DISTANCE: f32 = 10.0;
pub const SLOPE_CHECK_MIN_HORIZONTAL: f32 = 3.0;
pub const DEFAULT_MAX_CLIMB_RATIO: f32 = 0.6;
pub const DEFAULT_RAY_FAN_COUNT: usize = 3;
pub const DEFAULT_RAY_FAN_SPREAD_RAD: f32 = 0.1;
pub const LOS_RAY_HEIGHT_OFFSET: f32 = 0.5; // Rays leave at chest height, not from the feet

// Local planner
pub const PLAN_MIN_DISTANCE: f32 = 5.0;
pub const PLAN_GRID_RADIUS_FACTOR: f32 = 0.7;
pub const DEFAULT_GRID_SIZE: f32 = 3.0;
pub const DEFAULT_MAX_PATH_NODES: usize = 20;
pub const DEFAULT_MAX_NEIGHBORS: usize = 5;
pub const NODE_OBSTACLE_CLEARANCE: f32 = 1.5;
pub const NODE_PROBE_DISTANCE: f32 = 1.0;
pub const GROUND_PROBE_HEIGHT: f32 = 2.0; // highest step a ground sample may climb
pub const PLAN_CLOSED_SET_FACTOR: usize = 3;
pub const PLAN_RELEVANCE_FACTOR: f32 = 2.0; // target drift, in grid cells, that invalidates a plan

// Path following
pub const WAYPOINT_REACHED_RADIUS: f32 = 2.0;
pub const DEFAULT_PATH_UPDATE_INTERVAL_MS: u64 = 500;

// Heuristic fallback
pub const FALLBACK_DIRECTION_SAMPLES: usize = 8;
pub const FALLBACK_PROBE_DISTANCE: f32 = 4.0;

// Stuck detection
pub const STUCK_DISPLACEMENT_THRESHOLD: f32 = 0.1;
pub const STUCK_MIN_INTENDED_SPEED: f32 = 0.5;
pub const DEFAULT_STUCK_THRESHOLD_SECS: f32 = 0.5;
pub const HARD_STUCK_SECS: f32 = 3.0;
pub const HARD_STUCK_IMPULSE_MULTIPLIER: f32 = 2.0;
pub const AVOID_TURN_MIN_DEG: f32 = 45.0;
pub const AVOID_TURN_MAX_DEG: f32 = 180.0;
pub const AVOID_BLEND_PORTION: f32 = 0.4; // final share of the avoid window spent blending back

// Wall contact
pub const WALL_PROBE_DISTANCE: f32 = 1.0;
pub const WALL_BOUNCE_IMPULSE_MULTIPLIER: f32 = 1.8;
pub const WALL_BOUNCE_JITTER_RAD: f32 = 0.35;
pub const DEFAULT_WALL_RECOVERY_MS: u64 = 300;

// Steering
pub const DEFAULT_TURN_RATE_RAD: f32 = 8.0;
pub const CIRCLE_PURSUIT_WEIGHT: f32 = 0.35;
pub const MOVE_ACCELERATION_FACTOR: f32 = 8.0; // fraction of move speed gained per second, times mass
