// survival_ai_core/ai/src/entities/enemy.rs
use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use super::assets::{AssetLoader, ModelHandle};
use crate::concurrent::AiEventQueue;
use crate::core::config::{EnemyConfig, Species};
use crate::core::constants::*;
use crate::core::error::{AiError, AiResult};
use crate::core::types::{
    horizontal, AiEvent, AnimationClip, BehaviorState, DamageOutcome, EnemyId, LifecycleState, MovementMode,
    Transform,
};
use crate::systems::ai::behavior::{BehaviorInput, BehaviorMachine};
use crate::systems::ai::obstacle_memory::ObstacleMemory;
use crate::systems::ai::steering::{self, Steering};
use crate::systems::ai::stuck::{wall_bounce_direction, StuckDetector, StuckEvent, WallRecovery};
use crate::world::{BodyDesc, BodyHandle, DamageSink, PhysicsWorld, RayCast, TargetProvider};

/// Spawner-side notifications. Fire and forget.
pub trait EnemyObserver: Send + Sync {
    /// The enemy took its killing blow.
    fn on_kill(&self, enemy: EnemyId, critical: bool);
    /// The death effect finished and the enemy released its resources.
    fn on_death(&self, enemy: EnemyId);
}

/// Per-tick collaborators handed to [`Enemy::update`].
pub struct TickContext<'a, W: PhysicsWorld + ?Sized> {
    pub world: &'a W,
    pub target: &'a dyn TargetProvider,
    pub damage_sink: Option<&'a dyn DamageSink>,
    /// Positions of the other enemies, read-only.
    pub neighbors: &'a [Vec3],
    pub now: Duration,
}

/// What happened during one active tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub state: BehaviorState,
    pub stuck: StuckEvent,
    /// `Some(true)` when the planner produced a path this tick.
    pub planned: Option<bool>,
    pub attacked: bool,
    pub wall_bounce: bool,
}

pub struct Enemy {
    id: EnemyId,
    species: Species,
    config: EnemyConfig,
    lifecycle: LifecycleState,
    health: f32,
    body: Option<BodyHandle>,
    model: Option<ModelHandle>,
    loader: Option<Arc<dyn AssetLoader>>,
    observer: Option<Arc<dyn EnemyObserver>>,
    events: Option<AiEventQueue>,
    transform: Transform,
    memory: ObstacleMemory,
    stuck: StuckDetector,
    recovery: WallRecovery,
    steering: Steering,
    behavior: BehaviorMachine,
    rng: StdRng,
    commanded_speed: f32,
    last_speed: f32,
}

impl Enemy {
    pub fn new(species: Species, config: EnemyConfig, position: Vec3) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Enemy {
            id: Uuid::new_v4(),
            species,
            lifecycle: LifecycleState::Uninitialized,
            health: config.max_health,
            body: None,
            model: None,
            loader: None,
            observer: None,
            events: None,
            transform: Transform::new(position),
            memory: ObstacleMemory::new(config.path_memory_limit),
            stuck: StuckDetector::from_config(&config),
            recovery: WallRecovery::default(),
            steering: Steering::new(config.turn_rate_rad),
            behavior: BehaviorMachine::new(&config),
            rng,
            commanded_speed: 0.0,
            last_speed: 0.0,
            config,
        }
    }

    /// Species defaults.
    pub fn of_species(species: Species, position: Vec3) -> Self {
        Self::new(species, species.default_config(), position)
    }

    pub fn with_observer(mut self, observer: Arc<dyn EnemyObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_events(mut self, events: AiEventQueue) -> Self {
        self.events = Some(events);
        self
    }

    /// Replaces the random source, e.g. for reproducible tests.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Loads the model and creates the physics body. Calling it on an
    /// active enemy is a no-op. On failure everything acquired so far is
    /// released and the enemy stays uninitialized, so it can be retried.
    pub async fn initialize<W>(&mut self, world: &W, loader: Arc<dyn AssetLoader>) -> AiResult<()>
    where
        W: PhysicsWorld + ?Sized,
    {
        match self.lifecycle {
            LifecycleState::Active => return Ok(()),
            LifecycleState::Dying { .. } | LifecycleState::Destroyed => {
                return Err(AiError::InitializationFailed(format!("enemy {} is already dead", self.id)));
            }
            LifecycleState::Uninitialized | LifecycleState::Initializing => {}
        }
        self.lifecycle = LifecycleState::Initializing;
        debug!("[Enemy {}]: Initializing {:?}", self.id, self.species);

        let model = match loader.load_model(self.species.model_key()).await {
            Ok(model) => model,
            Err(e) => {
                warn!("[Enemy {}]: Model load failed: {}", self.id, e);
                self.lifecycle = LifecycleState::Uninitialized;
                return Err(AiError::Asset(e));
            }
        };

        let mut spawn = self.transform.position;
        match world.ground_height(spawn) {
            Ok(Some(ground)) => spawn.y = ground,
            Ok(None) => {}
            Err(e) => debug!("[Enemy {}]: Ground probe at spawn failed: {}", self.id, e),
        }

        let desc = BodyDesc {
            position: spawn,
            radius: self.config.collider_radius,
            mass: self.config.mass,
            kinematic: self.config.movement_mode == MovementMode::Kinematic,
        };
        let body = match world.create_body(&desc) {
            Ok(body) => body,
            Err(e) => {
                warn!("[Enemy {}]: Physics body creation failed: {}", self.id, e);
                loader.release(model);
                self.lifecycle = LifecycleState::Uninitialized;
                return Err(AiError::InitializationFailed(format!("physics body: {}", e)));
            }
        };

        self.body = Some(body);
        self.model = Some(model);
        self.loader = Some(loader);
        self.transform.position = spawn;
        self.health = self.config.max_health;
        self.lifecycle = LifecycleState::Active;
        info!("[Enemy {}]: Spawned {:?} at {:?} with body {:?}", self.id, self.species, spawn, body);
        self.publish(AiEvent::Spawned { enemy: self.id, species: self.species, position: spawn });
        Ok(())
    }

    /// Runs one simulation tick. Returns `None` when the enemy is not
    /// active or its body has vanished from the world.
    pub fn update<W>(&mut self, dt: f32, ctx: &TickContext<'_, W>) -> Option<TickReport>
    where
        W: PhysicsWorld + ?Sized,
    {
        match self.lifecycle {
            LifecycleState::Active => {}
            LifecycleState::Dying { since } => {
                if ctx.now.saturating_sub(since) >= self.config.death_effect() {
                    self.finish_death(ctx.world);
                }
                return None;
            }
            _ => return None,
        }

        let body = self.body?;
        let Some(position) = ctx.world.position(body) else {
            warn!("[Enemy {}]: Body {:?} no longer in the world, skipping tick", self.id, body);
            return None;
        };
        let velocity = ctx.world.linear_velocity(body).unwrap_or(Vec3::ZERO);
        self.transform.position = position;

        let intended_speed = match self.config.movement_mode {
            MovementMode::Dynamic => horizontal(velocity).length(),
            MovementMode::Kinematic => self.commanded_speed,
        };
        self.last_speed = intended_speed;
        let stuck = self.stuck.update(position, intended_speed, dt);
        if stuck != StuckEvent::None {
            self.publish(AiEvent::Stuck { enemy: self.id, hard: stuck == StuckEvent::Hard, position });
        }

        let input = BehaviorInput {
            world: ctx.world,
            position,
            heading: self.steering.heading(),
            target: ctx.target.position(),
            target_body: ctx.target.body(),
            caster: Some(body),
            now: ctx.now,
            stuck,
        };
        let decision = self.behavior.decide(&input, &mut self.memory, &self.config, &mut self.rng);

        if decision.changed() {
            trace!("[Enemy {}]: {:?} -> {:?}", self.id, decision.previous, decision.state);
            self.publish(AiEvent::StateChanged { enemy: self.id, from: decision.previous, to: decision.state });
        }
        let planned = match &decision.planned {
            Some(Ok(waypoints)) => {
                self.publish(AiEvent::PlanComputed { enemy: self.id, waypoints: *waypoints });
                Some(true)
            }
            Some(Err(e)) => {
                self.publish(AiEvent::PlanFailed { enemy: self.id, reason: e.to_string() });
                Some(false)
            }
            None => None,
        };

        let mut attacked = false;
        if decision.attack {
            let in_range = decision.distance_to_target.map_or(false, |d| d <= self.config.attack_range);
            if let (true, Some(sink)) = (in_range, ctx.damage_sink) {
                sink.apply_damage(self.config.attack_damage);
                attacked = true;
                debug!("[Enemy {}]: Hit target for {:.1}", self.id, self.config.attack_damage);
                self.publish(AiEvent::Attacked { enemy: self.id, damage: self.config.attack_damage });
            }
        }

        let mut desired = decision.direction;
        if desired != Vec3::ZERO
            && matches!(decision.state, BehaviorState::Pursue | BehaviorState::Pathfind | BehaviorState::Circle)
        {
            let push = steering::separation(position, ctx.neighbors, self.config.separation_radius)
                * self.config.separation_weight;
            let blended = (desired + push).normalize_or_zero();
            if blended != Vec3::ZERO {
                desired = blended;
            }
        }

        let mut kick = decision.kick.map(|dir| (dir, HARD_STUCK_IMPULSE_MULTIPLIER));
        if let Some((dir, _)) = kick {
            self.steering.set_heading(dir);
        }
        let heading = if kick.is_some() { self.steering.heading() } else { self.steering.steer(desired, dt) };

        let mut wall_bounce = false;
        if kick.is_none() && heading != Vec3::ZERO && !self.recovery.is_active(ctx.now) {
            if let Some(bounce) = self.probe_wall(ctx, position, heading) {
                self.recovery.begin(ctx.now, self.config.wall_recovery());
                self.steering.set_heading(bounce);
                kick = Some((bounce, WALL_BOUNCE_IMPULSE_MULTIPLIER));
                wall_bounce = true;
            }
        }

        for point in self.memory.drain_recent() {
            self.publish(AiEvent::ObstacleRecorded { enemy: self.id, point });
        }

        let recovery_scale = self.recovery.speed_scale(ctx.now, self.config.wall_recovery_speed_floor);
        let boost = steering::speed_multiplier(decision.distance_to_target, 1.0, &self.config);
        let moving = if kick.is_some() { self.steering.heading() } else { heading };
        self.drive(ctx.world, body, position, moving, kick.map(|(_, f)| f), recovery_scale * boost, boost, dt);

        let facing = if moving != Vec3::ZERO { moving } else { decision.facing };
        self.transform.face(facing);

        Some(TickReport { state: decision.state, stuck, planned, attacked, wall_bounce })
    }

    /// Forward ray for wall contact against static geometry. Bodies (the
    /// target, other enemies) are left to separation and melee.
    fn probe_wall<W>(&mut self, ctx: &TickContext<'_, W>, position: Vec3, heading: Vec3) -> Option<Vec3>
    where
        W: PhysicsWorld + ?Sized,
    {
        let origin = position + Vec3::Y * LOS_RAY_HEIGHT_OFFSET;
        let reach = WALL_PROBE_DISTANCE + self.config.collider_radius;
        let ray = RayCast::new(origin, heading, reach).excluding(self.body);
        match ctx.world.cast_ray(&ray) {
            Ok(Some(hit)) if hit.handle.is_none() => {
                let bounce = wall_bounce_direction(heading, hit.normal, &mut self.rng);
                debug!("[Enemy {}]: Wall contact at {:.2}, bouncing toward {:?}", self.id, hit.distance, bounce);
                Some(bounce)
            }
            Ok(_) => None,
            Err(e) => {
                debug!("[Enemy {}]: Wall probe failed: {}", self.id, e);
                None
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn drive<W>(
        &mut self,
        world: &W,
        body: BodyHandle,
        position: Vec3,
        heading: Vec3,
        kick: Option<f32>,
        multiplier: f32,
        speed_cap_multiplier: f32,
        dt: f32,
    ) where
        W: PhysicsWorld + ?Sized,
    {
        let cfg = &self.config;
        match cfg.movement_mode {
            MovementMode::Dynamic => {
                if heading == Vec3::ZERO {
                    return;
                }
                if let Some(factor) = kick {
                    world.apply_impulse(body, kick_impulse(cfg, heading, factor, dt));
                    return;
                }
                world.apply_impulse(body, movement_impulse(cfg, heading, multiplier, dt));
                if let Some(velocity) = world.linear_velocity(body) {
                    let flat = horizontal(velocity);
                    let cap = cfg.move_speed * speed_cap_multiplier;
                    if flat.length() > cap {
                        let capped = flat.normalize_or_zero() * cap;
                        world.set_linear_velocity(body, Vec3::new(capped.x, velocity.y, capped.z));
                    }
                }
            }
            MovementMode::Kinematic => {
                let speed = match kick {
                    Some(factor) => cfg.move_speed * factor,
                    None => cfg.move_speed * multiplier,
                };
                if heading == Vec3::ZERO {
                    self.commanded_speed = 0.0;
                    return;
                }
                let mut next = position + heading * speed * dt;
                match world.ground_height(next) {
                    Ok(Some(ground)) => next.y = ground,
                    Ok(None) => {}
                    Err(e) => trace!("[Enemy {}]: Ground snap failed: {}", self.id, e),
                }
                if world.set_kinematic_target(body, next) {
                    self.commanded_speed = speed;
                } else {
                    self.commanded_speed = 0.0;
                }
            }
        }
    }

    /// Applies damage if the enemy is active. The killing blow moves it to
    /// Dying exactly once; later calls change nothing.
    pub fn take_damage(&mut self, amount: f32, is_critical: bool, now: Duration) -> DamageOutcome {
        if self.lifecycle != LifecycleState::Active || !(amount > 0.0) {
            return DamageOutcome::ignored();
        }
        let applied = amount.min(self.health);
        self.health = (self.health - amount).max(0.0);
        trace!("[Enemy {}]: Took {:.1} damage (critical: {}), health {:.1}", self.id, amount, is_critical, self.health);

        if self.health > 0.0 {
            return DamageOutcome { applied, killed: false, critical: is_critical };
        }

        self.lifecycle = LifecycleState::Dying { since: now };
        self.behavior.reset();
        self.steering.set_heading(Vec3::ZERO);
        self.commanded_speed = 0.0;
        info!("[Enemy {}]: Killed (critical: {})", self.id, is_critical);
        if let Some(observer) = &self.observer {
            observer.on_kill(self.id, is_critical);
        }
        self.publish(AiEvent::Killed { enemy: self.id, critical: is_critical });
        DamageOutcome { applied, killed: true, critical: is_critical }
    }

    /// Resolves a named hit region and applies its multiplier. Unknown
    /// regions count as a plain torso hit.
    pub fn take_hit(&mut self, region: &str, damage: f32, now: Duration) -> DamageOutcome {
        let (multiplier, critical) = match self.config.hit_region(region) {
            Some(hit) => (hit.damage_multiplier, hit.critical),
            None => {
                trace!("[Enemy {}]: Unknown hit region '{}', treating as torso", self.id, region);
                (1.0, false)
            }
        };
        self.take_damage(damage * multiplier, critical, now)
    }

    fn finish_death<W: PhysicsWorld + ?Sized>(&mut self, world: &W) {
        self.release_resources(world);
        self.lifecycle = LifecycleState::Destroyed;
        debug!("[Enemy {}]: Death effect finished, destroyed", self.id);
        self.publish(AiEvent::Destroyed { enemy: self.id });
        if let Some(observer) = self.observer.take() {
            observer.on_death(self.id);
        }
        self.events = None;
    }

    /// Removes the enemy immediately, whatever it was doing. No death
    /// notification is sent.
    pub fn despawn<W: PhysicsWorld + ?Sized>(&mut self, world: &W) {
        if self.lifecycle == LifecycleState::Destroyed {
            return;
        }
        self.release_resources(world);
        self.behavior.reset();
        self.lifecycle = LifecycleState::Destroyed;
        debug!("[Enemy {}]: Despawned", self.id);
        self.publish(AiEvent::Destroyed { enemy: self.id });
        self.observer = None;
        self.events = None;
    }

    fn release_resources<W: PhysicsWorld + ?Sized>(&mut self, world: &W) {
        if let Some(body) = self.body.take() {
            if !world.remove_body(body) {
                trace!("[Enemy {}]: Body {:?} was already gone", self.id, body);
            }
        }
        if let Some(model) = self.model.take() {
            match &self.loader {
                Some(loader) => loader.release(model),
                None => warn!("[Enemy {}]: Model #{} has no loader to return to", self.id, model.id),
            }
        }
        self.loader = None;
        self.memory.clear();
        self.stuck.reset();
        self.recovery.clear();
    }

    fn publish(&self, event: AiEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }

    pub fn animation(&self) -> AnimationClip {
        match self.lifecycle {
            LifecycleState::Dying { .. } | LifecycleState::Destroyed => AnimationClip::Death,
            LifecycleState::Uninitialized | LifecycleState::Initializing => AnimationClip::Idle,
            LifecycleState::Active => match self.behavior.state() {
                BehaviorState::Idle => AnimationClip::Idle,
                BehaviorState::Attack => AnimationClip::Attack,
                BehaviorState::Pursue | BehaviorState::Pathfind
                    if self.last_speed > self.config.move_speed * 0.75 =>
                {
                    AnimationClip::Run
                }
                _ => AnimationClip::Walk,
            },
        }
    }

    pub fn id(&self) -> EnemyId {
        self.id
    }

    pub fn species(&self) -> Species {
        self.species
    }

    pub fn config(&self) -> &EnemyConfig {
        &self.config
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    pub fn is_alive(&self) -> bool {
        self.lifecycle == LifecycleState::Active
    }

    pub fn is_destroyed(&self) -> bool {
        self.lifecycle == LifecycleState::Destroyed
    }

    pub fn health(&self) -> f32 {
        self.health
    }

    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn state(&self) -> BehaviorState {
        self.behavior.state()
    }

    pub fn behavior(&self) -> &BehaviorMachine {
        &self.behavior
    }

    pub fn obstacle_memory(&self) -> &ObstacleMemory {
        &self.memory
    }

    pub fn stuck_time(&self) -> f32 {
        self.stuck.stuck_time()
    }

    pub fn heading(&self) -> Vec3 {
        self.steering.heading()
    }

    /// Unsmoothed direction the behaviour asked for on the last tick.
    pub fn desired_direction(&self) -> Vec3 {
        self.steering.desired()
    }
}

/// Regular per-tick drive impulse for a dynamic body.
fn movement_impulse(config: &EnemyConfig, heading: Vec3, multiplier: f32, dt: f32) -> Vec3 {
    heading * config.mass * config.move_speed * multiplier * MOVE_ACCELERATION_FACTOR * dt
}

/// Escape impulse: `factor` times a full-strength regular impulse, applied
/// without the speed cap.
fn kick_impulse(config: &EnemyConfig, heading: Vec3, factor: f32, dt: f32) -> Vec3 {
    movement_impulse(config, heading, 1.0, dt) * factor
}
