// survival_ai_core/ai/src/systems/ai/mod.rs
pub mod behavior;
pub mod line_of_sight;
pub mod obstacle_memory;
pub mod path_plan;
pub mod planner;
pub mod steering;
pub mod stuck;

pub use behavior::{BehaviorInput, BehaviorMachine, Decision};
pub use line_of_sight::{LineOfSight, LosParams, LosVerdict};
pub use obstacle_memory::ObstacleMemory;
pub use path_plan::PathPlan;
pub use planner::{fallback_direction, LocalPlanner, PlanError, PlannerParams};
pub use steering::Steering;
pub use stuck::{StuckDetector, StuckEvent, WallRecovery};
