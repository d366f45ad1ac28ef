// survival_ai_core/ai/src/core/types.rs
use glam::{Quat, Vec3};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

use super::config::Species;

pub type EnemyId = Uuid;

// --- Behaviour / lifecycle enums ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BehaviorState {
    Idle,
    Pursue,
    Circle,
    Attack,
    Avoid,
    Pathfind,
}

impl Default for BehaviorState {
    fn default() -> Self {
        BehaviorState::Idle
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum LifecycleState {
    Uninitialized,
    Initializing,
    Active,
    /// Death effect playing; `since` is the simulation time of the killing blow.
    Dying { since: Duration },
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnimationClip {
    Idle,
    Walk,
    Run,
    Attack,
    Death,
}

/// How the physics body of an enemy is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementMode {
    /// Impulses integrated by the physics engine.
    Dynamic,
    /// Hand-positioned every tick through a kinematic target.
    Kinematic,
}

// --- Transform mirrored from the physics body ---
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transform {
    pub position: Vec3,
    pub yaw: f32,
}

impl Transform {
    pub fn new(position: Vec3) -> Self {
        Transform { position, yaw: 0.0 }
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw)
    }

    pub fn forward(&self) -> Vec3 {
        Vec3::new(self.yaw.sin(), 0.0, self.yaw.cos())
    }

    pub fn face(&mut self, direction: Vec3) {
        let flat = horizontal(direction);
        if flat.length_squared() > 1e-6 {
            self.yaw = flat.x.atan2(flat.z);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageOutcome {
    pub applied: f32,
    pub killed: bool,
    pub critical: bool,
}

impl DamageOutcome {
    pub fn ignored() -> Self {
        DamageOutcome { applied: 0.0, killed: false, critical: false }
    }
}

// --- Geometry helpers shared by the navigation code ---

/// Drops the vertical component.
pub fn horizontal(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

pub fn horizontal_distance(a: Vec3, b: Vec3) -> f32 {
    horizontal(b - a).length()
}

/// Normalised horizontal direction from `from` to `to`, zero when they coincide.
pub fn flat_direction(from: Vec3, to: Vec3) -> Vec3 {
    horizontal(to - from).normalize_or_zero()
}

pub fn rotate_y(v: Vec3, angle: f32) -> Vec3 {
    Quat::from_rotation_y(angle) * v
}

/// Shortest distance from `point` to the segment `a -> b`, together with the
/// projection parameter along the segment (unclamped).
pub fn segment_distance(point: Vec3, a: Vec3, b: Vec3) -> (f32, f32) {
    let seg = b - a;
    let len_sq = seg.length_squared();
    if len_sq < 1e-8 {
        return (point.distance(a), 0.0);
    }
    let t = (point - a).dot(seg) / len_sq;
    let closest = a + seg * t.clamp(0.0, 1.0);
    (point.distance(closest), t)
}

// --- Events published for the presentation layer ---
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPriority {
    High,
    Normal,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AiEvent {
    Spawned { enemy: EnemyId, species: Species, position: Vec3 },
    StateChanged { enemy: EnemyId, from: BehaviorState, to: BehaviorState },
    Attacked { enemy: EnemyId, damage: f32 },
    ObstacleRecorded { enemy: EnemyId, point: Vec3 },
    PlanComputed { enemy: EnemyId, waypoints: usize },
    PlanFailed { enemy: EnemyId, reason: String },
    Stuck { enemy: EnemyId, hard: bool, position: Vec3 },
    Killed { enemy: EnemyId, critical: bool },
    Destroyed { enemy: EnemyId },
}

impl AiEvent {
    pub fn enemy(&self) -> EnemyId {
        match self {
            AiEvent::Spawned { enemy, .. }
            | AiEvent::StateChanged { enemy, .. }
            | AiEvent::Attacked { enemy, .. }
            | AiEvent::ObstacleRecorded { enemy, .. }
            | AiEvent::PlanComputed { enemy, .. }
            | AiEvent::PlanFailed { enemy, .. }
            | AiEvent::Stuck { enemy, .. }
            | AiEvent::Killed { enemy, .. }
            | AiEvent::Destroyed { enemy } => *enemy,
        }
    }

    pub fn priority(&self) -> EventPriority {
        match self {
            AiEvent::Killed { .. } | AiEvent::Destroyed { .. } | AiEvent::Attacked { .. } => EventPriority::High,
            AiEvent::Spawned { .. } | AiEvent::StateChanged { .. } | AiEvent::Stuck { .. } => EventPriority::Normal,
            _ => EventPriority::Low,
        }
    }
}
