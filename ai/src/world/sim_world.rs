// survival_ai_core/ai/src/world/sim_world.rs
//! Small in-memory physics world: static boxes, a ground plane and sphere
//! bodies. Good enough to drive the AI in tests, benchmarks and the demo.

use dashmap::DashMap;
use glam::{Vec2, Vec3};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, trace};

use super::obstacle_index::{ObstacleBox, ObstacleIndex};
use super::{BodyDesc, BodyHandle, QueryError, RayCast, RayHit, RigidBodySet, SpatialQuery};
use crate::core::constants::GROUND_PROBE_HEIGHT;

const STEP_HEIGHT: f32 = 0.5;
const BODY_HEIGHT: f32 = 1.8;
const DEFAULT_LINEAR_DAMPING: f32 = 4.0;

#[derive(Clone, Debug)]
pub struct SimBody {
    pub position: Vec3,
    pub velocity: Vec3,
    pub radius: f32,
    pub mass: f32,
    pub kinematic: bool,
    kinematic_target: Option<Vec3>,
}

impl SimBody {
    fn center(&self) -> Vec3 {
        self.position + Vec3::Y * self.radius
    }
}

pub struct SimWorld {
    obstacles: ObstacleIndex,
    bodies: DashMap<BodyHandle, SimBody>,
    next_handle: AtomicU64,
    ground_y: f32,
    bounds: Option<(Vec2, Vec2)>,
    linear_damping: f32,
    failing: AtomicBool,
    next_obstacle_id: AtomicU64,
}

impl SimWorld {
    pub fn new(ground_y: f32) -> Self {
        SimWorld {
            obstacles: ObstacleIndex::new(),
            bodies: DashMap::new(),
            next_handle: AtomicU64::new(1),
            ground_y,
            bounds: None,
            linear_damping: DEFAULT_LINEAR_DAMPING,
            failing: AtomicBool::new(false),
            next_obstacle_id: AtomicU64::new(1),
        }
    }

    /// Restricts the ground to an XZ rectangle; outside it is void.
    pub fn with_bounds(mut self, min: Vec2, max: Vec2) -> Self {
        self.bounds = Some((min.min(max), min.max(max)));
        self
    }

    pub fn with_linear_damping(mut self, damping: f32) -> Self {
        self.linear_damping = damping.max(0.0);
        self
    }

    pub fn add_box(&self, min: Vec3, max: Vec3) -> u64 {
        let id = self.next_obstacle_id.fetch_add(1, Ordering::Relaxed);
        self.obstacles.insert(ObstacleBox::new(id, min, max));
        id
    }

    pub fn add_sensor(&self, min: Vec3, max: Vec3) -> u64 {
        let id = self.next_obstacle_id.fetch_add(1, Ordering::Relaxed);
        self.obstacles.insert(ObstacleBox::sensor(id, min, max));
        id
    }

    /// Wall standing on the ground between two XZ points.
    pub fn add_wall(&self, from: Vec2, to: Vec2, height: f32, thickness: f32) -> u64 {
        let half = thickness * 0.5;
        let min = from.min(to) - Vec2::splat(half);
        let max = from.max(to) + Vec2::splat(half);
        self.add_box(
            Vec3::new(min.x, self.ground_y, min.y),
            Vec3::new(max.x, self.ground_y + height, max.y),
        )
    }

    pub fn obstacle_count(&self) -> usize {
        self.obstacles.size()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn body(&self, handle: BodyHandle) -> Option<SimBody> {
        self.bodies.get(&handle).map(|entry| entry.value().clone())
    }

    /// Makes every spatial query fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    fn check_available(&self) -> Result<(), QueryError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(QueryError::Unavailable("simulated query failure".to_string()));
        }
        Ok(())
    }

    fn in_bounds(&self, x: f32, z: f32) -> bool {
        match self.bounds {
            Some((min, max)) => x >= min.x && x <= max.x && z >= min.y && z <= max.y,
            None => true,
        }
    }

    fn blocked_at(&self, position: Vec3, radius: f32) -> bool {
        let reach = Vec3::new(radius, 0.0, radius);
        let candidates = self.obstacles.query_aabb(
            position - reach + Vec3::Y * STEP_HEIGHT,
            position + reach + Vec3::Y * BODY_HEIGHT,
        );
        candidates.iter().filter(|b| b.solid).any(|b| {
            if b.max.y <= position.y + STEP_HEIGHT || b.min.y >= position.y + BODY_HEIGHT {
                return false;
            }
            let closest_x = position.x.clamp(b.min.x, b.max.x);
            let closest_z = position.z.clamp(b.min.z, b.max.z);
            let dx = position.x - closest_x;
            let dz = position.z - closest_z;
            dx * dx + dz * dz < radius * radius
        })
    }

    fn surface_height(&self, x: f32, z: f32, from_y: f32) -> Option<f32> {
        if !self.in_bounds(x, z) {
            return None;
        }
        let probe = Vec3::new(x, from_y, z);
        let tops = self
            .obstacles
            .query_aabb(Vec3::new(x, f32::MIN, z), probe)
            .into_iter()
            .filter(|b| b.solid && b.max.y <= from_y)
            .map(|b| b.max.y)
            .fold(self.ground_y, f32::max);
        Some(tops)
    }

    /// Advances every body by `dt`. Dynamic bodies that would move into a
    /// solid box try each axis on its own and otherwise stay where they are.
    pub fn step(&self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let damping = (1.0 - self.linear_damping * dt).max(0.0);
        let handles: Vec<BodyHandle> = self.bodies.iter().map(|entry| *entry.key()).collect();

        for handle in handles {
            let Some(mut body) = self.body(handle) else { continue };

            if body.kinematic {
                match body.kinematic_target.take() {
                    Some(target) => {
                        body.velocity = (target - body.position) / dt;
                        body.position = target;
                    }
                    None => body.velocity = Vec3::ZERO,
                }
            } else {
                let delta = Vec3::new(body.velocity.x, 0.0, body.velocity.z) * dt;
                let candidates = [delta, Vec3::new(delta.x, 0.0, 0.0), Vec3::new(0.0, 0.0, delta.z)];
                let mut moved = false;
                for candidate in candidates {
                    if candidate.length_squared() < 1e-12 {
                        continue;
                    }
                    let next = body.position + candidate;
                    if !self.blocked_at(next, body.radius) {
                        body.position = next;
                        moved = true;
                        break;
                    }
                }
                if !moved && delta.length_squared() > 1e-12 {
                    trace!("Body {:?} blocked at {:?}", handle, body.position);
                }
                if let Some(ground) = self.surface_height(body.position.x, body.position.z, body.position.y + STEP_HEIGHT) {
                    body.position.y = ground;
                }
                body.velocity *= damping;
            }

            if let Some(mut entry) = self.bodies.get_mut(&handle) {
                *entry.value_mut() = body;
            }
        }
    }
}

impl SpatialQuery for SimWorld {
    fn cast_ray(&self, ray: &RayCast) -> Result<Option<RayHit>, QueryError> {
        self.check_available()?;
        if ray.direction.length_squared() < 1e-8 || !ray.direction.is_finite() {
            return Err(QueryError::InvalidRay(format!("direction {:?}", ray.direction)));
        }
        let direction = ray.direction.normalize();
        let ray = RayCast { direction, ..*ray };

        let mut best: Option<RayHit> = None;
        for obstacle in self.obstacles.query_ray(&ray) {
            if ray.solid_only && !obstacle.solid {
                continue;
            }
            if let Some((distance, normal)) = obstacle.intersect_ray(&ray) {
                if distance <= ray.max_distance && best.map_or(true, |hit| distance < hit.distance) {
                    best = Some(RayHit { distance, point: ray.point_at(distance), normal, handle: None });
                }
            }
        }

        for entry in self.bodies.iter() {
            let handle = *entry.key();
            if Some(handle) == ray.exclude {
                continue;
            }
            let body = entry.value();
            let to_center = body.center() - ray.origin;
            let along = to_center.dot(direction);
            let closest_sq = to_center.length_squared() - along * along;
            let radius_sq = body.radius * body.radius;
            if closest_sq > radius_sq {
                continue;
            }
            let half_chord = (radius_sq - closest_sq).sqrt();
            let distance = if to_center.length_squared() <= radius_sq { 0.0 } else { along - half_chord };
            if distance < 0.0 || distance > ray.max_distance {
                continue;
            }
            if best.map_or(true, |hit| distance < hit.distance) {
                let point = ray.point_at(distance);
                let normal = (point - body.center()).normalize_or_zero();
                best = Some(RayHit { distance, point, normal, handle: Some(handle) });
            }
        }

        Ok(best)
    }

    fn ground_height(&self, position: Vec3) -> Result<Option<f32>, QueryError> {
        self.check_available()?;
        Ok(self.surface_height(position.x, position.z, position.y + GROUND_PROBE_HEIGHT))
    }
}

impl RigidBodySet for SimWorld {
    fn create_body(&self, desc: &BodyDesc) -> Result<BodyHandle, QueryError> {
        self.check_available()?;
        if !(desc.radius > 0.0) || !(desc.mass > 0.0) {
            return Err(QueryError::BodyRejected(format!("radius {} mass {}", desc.radius, desc.mass)));
        }
        let handle = BodyHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.bodies.insert(
            handle,
            SimBody {
                position: desc.position,
                velocity: Vec3::ZERO,
                radius: desc.radius,
                mass: desc.mass,
                kinematic: desc.kinematic,
                kinematic_target: None,
            },
        );
        debug!("Created body {:?} at {:?} (kinematic: {})", handle, desc.position, desc.kinematic);
        Ok(handle)
    }

    fn remove_body(&self, handle: BodyHandle) -> bool {
        self.bodies.remove(&handle).is_some()
    }

    fn position(&self, handle: BodyHandle) -> Option<Vec3> {
        self.bodies.get(&handle).map(|entry| entry.value().position)
    }

    fn linear_velocity(&self, handle: BodyHandle) -> Option<Vec3> {
        self.bodies.get(&handle).map(|entry| entry.value().velocity)
    }

    fn set_linear_velocity(&self, handle: BodyHandle, velocity: Vec3) -> bool {
        match self.bodies.get_mut(&handle) {
            Some(mut entry) => {
                entry.value_mut().velocity = velocity;
                true
            }
            None => false,
        }
    }

    fn apply_impulse(&self, handle: BodyHandle, impulse: Vec3) -> bool {
        match self.bodies.get_mut(&handle) {
            Some(mut entry) => {
                let body = entry.value_mut();
                if !body.kinematic {
                    body.velocity += impulse / body.mass;
                }
                true
            }
            None => false,
        }
    }

    fn set_kinematic_target(&self, handle: BodyHandle, position: Vec3) -> bool {
        match self.bodies.get_mut(&handle) {
            Some(mut entry) => {
                entry.value_mut().kinematic_target = Some(position);
                true
            }
            None => false,
        }
    }

    fn advance(&self, dt: f32) {
        self.step(dt);
    }
}
