// survival_ai_core/ai/src/systems/ai/behavior.rs
use glam::Vec3;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, trace};

use super::line_of_sight::{LineOfSight, LosParams};
use super::obstacle_memory::ObstacleMemory;
use super::path_plan::PathPlan;
use super::planner::{fallback_direction, LocalPlanner, PlanError, PlannerParams};
use super::steering;
use super::stuck::{escape_direction, quarter_turn, StuckEvent};
use crate::core::config::EnemyConfig;
use crate::core::constants::*;
use crate::core::types::{flat_direction, BehaviorState};
use crate::world::{BodyHandle, SpatialQuery};

/// Everything the state machine reads about the current tick.
pub struct BehaviorInput<'a, W: SpatialQuery + ?Sized> {
    pub world: &'a W,
    pub position: Vec3,
    pub heading: Vec3,
    pub target: Option<Vec3>,
    pub target_body: Option<BodyHandle>,
    pub caster: Option<BodyHandle>,
    pub now: Duration,
    pub stuck: StuckEvent,
}

/// Outcome of one evaluation. `direction` is the unsmoothed desired
/// heading; zero means stand still.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub state: BehaviorState,
    pub previous: BehaviorState,
    pub direction: Vec3,
    /// Direction the body should face when it is not moving.
    pub facing: Vec3,
    pub attack: bool,
    /// One-shot impulse direction requested by hard-stuck escalation.
    pub kick: Option<Vec3>,
    /// Planner outcome, when the planner ran this tick.
    pub planned: Option<Result<usize, PlanError>>,
    pub distance_to_target: Option<f32>,
}

impl Decision {
    pub fn changed(&self) -> bool {
        self.state != self.previous
    }
}

#[derive(Debug, Clone, Copy)]
struct CircleManeuver {
    sign: f32,
    until: Duration,
}

#[derive(Debug, Clone, Copy)]
struct AvoidManeuver {
    direction: Vec3,
    started: Duration,
    until: Duration,
    blend: bool,
}

impl AvoidManeuver {
    /// Escape heading, bending back toward the target over the last part
    /// of the window when blending is on.
    fn direction_at(&self, now: Duration, to_target: Vec3) -> Vec3 {
        if !self.blend || to_target == Vec3::ZERO {
            return self.direction;
        }
        let total = self.until.saturating_sub(self.started).as_secs_f32();
        if total <= 0.0 {
            return self.direction;
        }
        let blend_span = total * AVOID_BLEND_PORTION;
        let remaining = self.until.saturating_sub(now).as_secs_f32();
        if remaining >= blend_span {
            return self.direction;
        }
        let t = (1.0 - remaining / blend_span).clamp(0.0, 1.0);
        let blended = self.direction.lerp(to_target, t).normalize_or_zero();
        if blended == Vec3::ZERO {
            to_target
        } else {
            blended
        }
    }
}

/// Per-enemy behaviour selection. Priority, highest first: Avoid, Attack,
/// Idle (out of range), Circle, Pursue, Pathfind.
#[derive(Debug, Clone)]
pub struct BehaviorMachine {
    state: BehaviorState,
    circle: Option<CircleManeuver>,
    avoid: Option<AvoidManeuver>,
    plan: PathPlan,
    last_plan_at: Option<Duration>,
    replan_requested: bool,
    heuristic_fallback: bool,
    last_attack_at: Option<Duration>,
    planner_params: PlannerParams,
    los_params: LosParams,
}

impl BehaviorMachine {
    pub fn new(config: &EnemyConfig) -> Self {
        BehaviorMachine {
            state: BehaviorState::Idle,
            circle: None,
            avoid: None,
            plan: PathPlan::new(),
            last_plan_at: None,
            replan_requested: false,
            heuristic_fallback: false,
            last_attack_at: None,
            planner_params: PlannerParams::from_config(config),
            los_params: LosParams::from_config(config),
        }
    }

    pub fn state(&self) -> BehaviorState {
        self.state
    }

    pub fn plan(&self) -> &PathPlan {
        &self.plan
    }

    pub fn is_circling(&self) -> bool {
        self.circle.is_some()
    }

    pub fn last_plan_at(&self) -> Option<Duration> {
        self.last_plan_at
    }

    pub fn replan_requested(&self) -> bool {
        self.replan_requested
    }

    /// Drops every transient maneuver and returns to Idle.
    pub fn reset(&mut self) {
        self.state = BehaviorState::Idle;
        self.circle = None;
        self.avoid = None;
        self.plan.clear();
        self.replan_requested = false;
        self.heuristic_fallback = false;
    }

    pub fn decide<W, R>(
        &mut self,
        input: &BehaviorInput<'_, W>,
        memory: &mut ObstacleMemory,
        config: &EnemyConfig,
        rng: &mut R,
    ) -> Decision
    where
        W: SpatialQuery + ?Sized,
        R: Rng,
    {
        let previous = self.state;
        let mut decision = Decision {
            state: previous,
            previous,
            direction: Vec3::ZERO,
            facing: input.heading,
            attack: false,
            kick: None,
            planned: None,
            distance_to_target: None,
        };

        decision.kick = self.handle_stuck(input, memory, config, rng);

        let Some(target) = input.target else {
            self.circle = None;
            self.avoid = None;
            self.plan.clear();
            self.set_state(BehaviorState::Idle, &mut decision);
            return decision;
        };

        let distance = input.position.distance(target);
        let to_target = flat_direction(input.position, target);
        decision.distance_to_target = Some(distance);
        if to_target != Vec3::ZERO {
            decision.facing = to_target;
        }

        if let Some(avoid) = self.avoid {
            if input.now < avoid.until {
                decision.direction = avoid.direction_at(input.now, to_target);
                decision.facing = decision.direction;
                self.set_state(BehaviorState::Avoid, &mut decision);
                return decision;
            }
            self.avoid = None;
        }

        if distance <= config.melee_range {
            self.circle = None;
            self.plan.clear();
            let ready = self
                .last_attack_at
                .map_or(true, |at| input.now.saturating_sub(at) >= config.attack_cooldown());
            if ready {
                self.last_attack_at = Some(input.now);
                decision.attack = true;
            }
            self.set_state(BehaviorState::Attack, &mut decision);
            return decision;
        }

        if distance > config.detection_range {
            self.circle = None;
            self.plan.clear();
            self.set_state(BehaviorState::Idle, &mut decision);
            return decision;
        }

        if let Some(circle) = self.circle {
            if input.now < circle.until && distance <= config.max_circle_distance {
                decision.direction = steering::circle(input.position, target, circle.sign);
                self.set_state(BehaviorState::Circle, &mut decision);
                return decision;
            }
            self.circle = None;
        }

        if distance <= config.max_circle_distance && rng.gen_bool(config.circle_chance_per_tick) {
            let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            let span_ms = rng.gen_range(config.circle_duration_min_ms..=config.circle_duration_max_ms);
            self.circle = Some(CircleManeuver { sign, until: input.now + Duration::from_millis(span_ms) });
            self.plan.clear();
            decision.direction = steering::circle(input.position, target, sign);
            self.set_state(BehaviorState::Circle, &mut decision);
            return decision;
        }

        let los = LineOfSight::new(input.world, self.los_params)
            .with_caster(input.caster)
            .with_target_body(input.target_body);
        if los.is_path_clear(input.position, target, memory) {
            self.plan.clear();
            self.heuristic_fallback = false;
            decision.direction = steering::pursue(input.position, target);
            self.set_state(BehaviorState::Pursue, &mut decision);
            return decision;
        }

        decision.direction = self.pathfind(input, target, memory, config, &mut decision);
        self.set_state(BehaviorState::Pathfind, &mut decision);
        decision
    }

    fn pathfind<W: SpatialQuery + ?Sized>(
        &mut self,
        input: &BehaviorInput<'_, W>,
        target: Vec3,
        memory: &mut ObstacleMemory,
        config: &EnemyConfig,
        decision: &mut Decision,
    ) -> Vec3 {
        if let Some(last) = self.plan.final_waypoint() {
            if last.distance(target) > PLAN_RELEVANCE_FACTOR * self.planner_params.grid_size {
                trace!("Target drifted away from plan end, dropping plan");
                self.plan.clear();
            }
        }

        let interval_elapsed = self
            .last_plan_at
            .map_or(true, |at| input.now.saturating_sub(at) >= config.path_update_interval());
        let needs_plan = !self.plan.is_active() || self.replan_requested;

        if needs_plan && (interval_elapsed || self.replan_requested) {
            self.replan_requested = false;
            self.last_plan_at = Some(input.now);
            let planner = LocalPlanner::new(input.world, self.planner_params, self.los_params)
                .with_caster(input.caster)
                .with_target_body(input.target_body);
            match planner.find_path(input.position, target, memory) {
                Ok(waypoints) => {
                    debug!("Planned {} waypoints toward target", waypoints.len());
                    decision.planned = Some(Ok(waypoints.len()));
                    self.plan.replace(waypoints);
                    self.heuristic_fallback = false;
                }
                Err(e) => {
                    debug!("Planning failed: {}", e);
                    self.heuristic_fallback = !matches!(e, PlanError::TooClose { .. });
                    decision.planned = Some(Err(e));
                    self.plan.clear();
                }
            }
        }

        if let Some(waypoint) = self.plan.advance(input.position, WAYPOINT_REACHED_RADIUS) {
            let dir = steering::pursue(input.position, waypoint);
            if dir != Vec3::ZERO {
                return dir;
            }
        }

        if self.heuristic_fallback {
            fallback_direction(input.world, input.position, target, memory, input.caster)
        } else {
            steering::pursue(input.position, target)
        }
    }

    fn handle_stuck<W, R>(
        &mut self,
        input: &BehaviorInput<'_, W>,
        memory: &mut ObstacleMemory,
        config: &EnemyConfig,
        rng: &mut R,
    ) -> Option<Vec3>
    where
        W: SpatialQuery + ?Sized,
        R: Rng,
    {
        let heading = if input.heading.length_squared() > 1e-6 {
            input.heading
        } else {
            input.target.map(|t| flat_direction(input.position, t)).unwrap_or(Vec3::Z)
        };

        match input.stuck {
            StuckEvent::None => None,
            StuckEvent::Soft => {
                memory.record(input.position);
                let direction = escape_direction(heading, rng);
                debug!("Soft stuck at {:?}, escaping toward {:?}", input.position, direction);
                self.avoid = Some(AvoidManeuver {
                    direction,
                    started: input.now,
                    until: input.now + config.avoid_duration(),
                    blend: true,
                });
                self.circle = None;
                self.replan_requested = true;
                None
            }
            StuckEvent::Hard => {
                memory.record(input.position);
                let direction = quarter_turn(heading, rng);
                debug!("Hard stuck at {:?}, forcing turn toward {:?}", input.position, direction);
                self.avoid = Some(AvoidManeuver {
                    direction,
                    started: input.now,
                    until: input.now + config.avoid_duration(),
                    blend: false,
                });
                self.circle = None;
                self.replan_requested = true;
                Some(direction)
            }
        }
    }

    fn set_state(&mut self, next: BehaviorState, decision: &mut Decision) {
        if self.state != next {
            debug!("Behavior {:?} -> {:?}", self.state, next);
            if self.state == BehaviorState::Pathfind && next != BehaviorState::Pathfind {
                self.heuristic_fallback = false;
            }
            self.state = next;
        }
        decision.state = next;
    }
}
