// survival_ai_core/ai/src/world/mod.rs
//! Collaborator interfaces the AI core is written against.
//!
//! The physics world is shared by every enemy and the player. All access
//! goes through single-shot queries or mutations keyed by [`BodyHandle`];
//! the AI never holds a long-lived lock on the world. A handle is only a
//! lookup key: once the world drops a body every call on that handle
//! returns `None`/`false` instead of failing.

use glam::Vec3;
use serde::Serialize;
use thiserror::Error;

pub mod obstacle_index;
pub mod player_target;
pub mod sim_world;

pub use player_target::PlayerTarget;
pub use sim_world::SimWorld;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BodyHandle(pub u64);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("Physics world unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid ray: {0}")]
    InvalidRay(String),

    #[error("Body creation rejected: {0}")]
    BodyRejected(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayCast {
    pub origin: Vec3,
    /// Expected to be normalised; implementations may reject a zero vector.
    pub direction: Vec3,
    pub max_distance: f32,
    /// Ignore non-solid (sensor) geometry.
    pub solid_only: bool,
    /// Body the ray should pass through, usually the caster's own.
    pub exclude: Option<BodyHandle>,
}

impl RayCast {
    pub fn new(origin: Vec3, direction: Vec3, max_distance: f32) -> Self {
        RayCast { origin, direction, max_distance, solid_only: true, exclude: None }
    }

    pub fn excluding(mut self, handle: Option<BodyHandle>) -> Self {
        self.exclude = handle;
        self
    }

    pub fn point_at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub distance: f32,
    pub point: Vec3,
    pub normal: Vec3,
    /// `None` for static level geometry.
    pub handle: Option<BodyHandle>,
}

pub trait SpatialQuery {
    fn cast_ray(&self, ray: &RayCast) -> Result<Option<RayHit>, QueryError>;

    /// Height of the highest walkable surface under `position`, sampled
    /// from at most `GROUND_PROBE_HEIGHT` above it. `None` over the void.
    fn ground_height(&self, position: Vec3) -> Result<Option<f32>, QueryError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    pub position: Vec3,
    pub radius: f32,
    pub mass: f32,
    pub kinematic: bool,
}

pub trait RigidBodySet {
    fn create_body(&self, desc: &BodyDesc) -> Result<BodyHandle, QueryError>;
    fn remove_body(&self, handle: BodyHandle) -> bool;
    fn position(&self, handle: BodyHandle) -> Option<Vec3>;
    fn linear_velocity(&self, handle: BodyHandle) -> Option<Vec3>;
    fn set_linear_velocity(&self, handle: BodyHandle, velocity: Vec3) -> bool;
    fn apply_impulse(&self, handle: BodyHandle, impulse: Vec3) -> bool;
    fn set_kinematic_target(&self, handle: BodyHandle, position: Vec3) -> bool;

    /// Advances the simulation by `dt`. Engines stepped by their host keep
    /// the default no-op.
    fn advance(&self, _dt: f32) {}
}

pub trait PhysicsWorld: SpatialQuery + RigidBodySet {}

impl<T: SpatialQuery + RigidBodySet> PhysicsWorld for T {}

/// Read-only view of whatever the enemies are hunting.
pub trait TargetProvider {
    /// `None` once the target has despawned.
    fn position(&self) -> Option<Vec3>;

    /// Body of the target, so line-of-sight rays that hit it do not count
    /// as blocked.
    fn body(&self) -> Option<BodyHandle> {
        None
    }
}

pub trait DamageSink {
    fn apply_damage(&self, amount: f32);
}
