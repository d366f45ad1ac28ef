// survival_ai_core/ai/src/systems/ai/planner.rs
//! Local A* over a coarse grid sampled around the start/target midpoint.
//! Only used when the straight line to the target is blocked.

use ahash::AHashSet;
use glam::Vec3;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use thiserror::Error;
use tracing::{debug, trace, warn};

use super::line_of_sight::{LineOfSight, LosParams};
use super::obstacle_memory::ObstacleMemory;
use crate::core::config::EnemyConfig;
use crate::core::constants::*;
use crate::core::types::{flat_direction, horizontal, rotate_y};
use crate::world::{BodyHandle, RayCast, SpatialQuery};

const START_NODE: usize = 0;
const GOAL_NODE: usize = 1;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("Target too close to plan ({distance:.2} units)")]
    TooClose { distance: f32 },

    #[error("No walkable grid nodes around the midpoint")]
    NoCandidates,

    #[error("Search budget exhausted after closing {closed} nodes")]
    Exhausted { closed: usize },

    #[error("Target unreachable through sampled grid")]
    Unreachable,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannerParams {
    pub grid_size: f32,
    pub max_path_nodes: usize,
    pub max_neighbors: usize,
}

impl PlannerParams {
    pub fn from_config(config: &EnemyConfig) -> Self {
        PlannerParams {
            grid_size: config.grid_size,
            max_path_nodes: config.max_path_nodes,
            max_neighbors: config.max_neighbors,
        }
    }
}

impl Default for PlannerParams {
    fn default() -> Self {
        PlannerParams {
            grid_size: DEFAULT_GRID_SIZE,
            max_path_nodes: DEFAULT_MAX_PATH_NODES,
            max_neighbors: DEFAULT_MAX_NEIGHBORS,
        }
    }
}

/// Open-set entry. Ordered so the `BinaryHeap` pops the lowest f first,
/// then the lowest h, then the earliest pushed.
#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    f: f32,
    h: f32,
    seq: u64,
    node: usize,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.h.total_cmp(&self.h))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct LocalPlanner<'w, W: SpatialQuery + ?Sized> {
    world: &'w W,
    params: PlannerParams,
    los_params: LosParams,
    caster: Option<BodyHandle>,
    target_body: Option<BodyHandle>,
}

impl<'w, W: SpatialQuery + ?Sized> LocalPlanner<'w, W> {
    pub fn new(world: &'w W, params: PlannerParams, los_params: LosParams) -> Self {
        LocalPlanner { world, params, los_params, caster: None, target_body: None }
    }

    pub fn with_caster(mut self, caster: Option<BodyHandle>) -> Self {
        self.caster = caster;
        self
    }

    pub fn with_target_body(mut self, target_body: Option<BodyHandle>) -> Self {
        self.target_body = target_body;
        self
    }

    fn line_of_sight(&self) -> LineOfSight<'w, W> {
        LineOfSight::new(self.world, self.los_params)
            .with_caster(self.caster)
            .with_target_body(self.target_body)
    }

    /// Plans from `start` to `target`. On success the waypoints run forward
    /// from the first node after `start` and end at `target`.
    pub fn find_path(&self, start: Vec3, target: Vec3, memory: &mut ObstacleMemory) -> Result<Vec<Vec3>, PlanError> {
        let distance = start.distance(target);
        if distance < PLAN_MIN_DISTANCE {
            return Err(PlanError::TooClose { distance });
        }

        let nodes = self.sample_nodes(start, target, memory);
        if nodes.len() <= 2 {
            debug!("Planner found no walkable grid nodes between {:?} and {:?}", start, target);
            return Err(PlanError::NoCandidates);
        }
        trace!("Planner sampled {} nodes", nodes.len());

        self.search(&nodes, memory)
    }

    /// Node 0 is the start, node 1 the target, the rest are grid samples
    /// that passed the walkability checks.
    fn sample_nodes(&self, start: Vec3, target: Vec3, memory: &ObstacleMemory) -> Vec<Vec3> {
        let grid = self.params.grid_size;
        let distance = start.distance(target);
        let midpoint = (start + target) * 0.5;
        let radius = ((PLAN_GRID_RADIUS_FACTOR * distance / grid).ceil() as usize).min(self.params.max_path_nodes) as i32;

        let mut nodes = Vec::with_capacity(((2 * radius + 1) * (2 * radius + 1)) as usize + 2);
        nodes.push(start);
        nodes.push(target);

        for ix in -radius..=radius {
            for iz in -radius..=radius {
                let sample = midpoint + Vec3::new(ix as f32 * grid, 0.0, iz as f32 * grid);
                let ground = match self.world.ground_height(sample) {
                    Ok(Some(height)) => height,
                    Ok(None) => continue,
                    Err(e) => {
                        trace!("Ground sample failed at {:?}: {}", sample, e);
                        continue;
                    }
                };
                let node = Vec3::new(sample.x, ground, sample.z);
                if self.is_walkable(node, memory) {
                    nodes.push(node);
                }
            }
        }
        nodes
    }

    fn is_walkable(&self, node: Vec3, memory: &ObstacleMemory) -> bool {
        if memory.is_near_any(node, NODE_OBSTACLE_CLEARANCE) {
            return false;
        }
        let origin = node + Vec3::Y * LOS_RAY_HEIGHT_OFFSET;
        [Vec3::X, Vec3::NEG_X, Vec3::Z, Vec3::NEG_Z].iter().all(|dir| {
            let ray = RayCast::new(origin, *dir, NODE_PROBE_DISTANCE).excluding(self.caster);
            match self.world.cast_ray(&ray) {
                Ok(Some(hit)) => hit.handle.is_some() && hit.handle == self.target_body,
                Ok(None) => true,
                Err(_) => false,
            }
        })
    }

    fn search(&self, nodes: &[Vec3], memory: &mut ObstacleMemory) -> Result<Vec<Vec3>, PlanError> {
        let goal = nodes[GOAL_NODE];
        let goal_radius = 0.5 * self.params.grid_size;
        let link_radius = 2.0 * self.params.grid_size;
        let closed_cap = PLAN_CLOSED_SET_FACTOR * self.params.max_path_nodes;
        let los = self.line_of_sight();

        let mut g_score = vec![f32::INFINITY; nodes.len()];
        let mut parent: Vec<Option<usize>> = vec![None; nodes.len()];
        let mut closed: AHashSet<usize> = AHashSet::with_capacity(closed_cap + 1);
        let mut open = BinaryHeap::new();
        let mut seq = 0u64;

        g_score[START_NODE] = 0.0;
        let h0 = nodes[START_NODE].distance(goal);
        open.push(OpenEntry { f: h0, h: h0, seq, node: START_NODE });

        while let Some(entry) = open.pop() {
            let current = entry.node;
            if closed.contains(&current) {
                continue;
            }
            let current_pos = nodes[current];

            if current_pos.distance(goal) <= goal_radius {
                return Ok(Self::reconstruct(nodes, &parent, current));
            }

            closed.insert(current);
            if closed.len() > closed_cap {
                debug!("Planner exhausted its budget ({} closed nodes)", closed.len());
                return Err(PlanError::Exhausted { closed: closed.len() });
            }

            let mut neighbors: SmallVec<[(f32, usize); 16]> = nodes
                .iter()
                .enumerate()
                .filter(|(idx, _)| *idx != current && !closed.contains(idx))
                .map(|(idx, pos)| (current_pos.distance(*pos), idx))
                .filter(|(dist, _)| *dist <= link_radius)
                .collect();
            neighbors.sort_by(|a, b| a.0.total_cmp(&b.0));
            neighbors.truncate(self.params.max_neighbors);

            for (step, next) in neighbors {
                let tentative = g_score[current] + step;
                if tentative >= g_score[next] {
                    continue;
                }
                if !los.is_path_clear(current_pos, nodes[next], memory) {
                    continue;
                }
                g_score[next] = tentative;
                parent[next] = Some(current);
                let h = nodes[next].distance(goal);
                seq += 1;
                open.push(OpenEntry { f: tentative + h, h, seq, node: next });
            }
        }

        Err(PlanError::Unreachable)
    }

    fn reconstruct(nodes: &[Vec3], parent: &[Option<usize>], goal_idx: usize) -> Vec<Vec3> {
        let mut path = Vec::new();
        let mut cursor = Some(goal_idx);
        while let Some(idx) = cursor {
            if idx == START_NODE {
                break;
            }
            path.push(nodes[idx]);
            cursor = parent[idx];
        }
        path.reverse();
        path
    }
}

/// Direction-scoring fallback for when planning fails: pick among evenly
/// spaced headings the one that best trades progress toward the target
/// against nearby blockage.
pub fn fallback_direction<W: SpatialQuery + ?Sized>(
    world: &W,
    from: Vec3,
    target: Vec3,
    memory: &ObstacleMemory,
    caster: Option<BodyHandle>,
) -> Vec3 {
    let to_target = flat_direction(from, target);
    if to_target == Vec3::ZERO {
        return Vec3::ZERO;
    }

    let origin = from + Vec3::Y * LOS_RAY_HEIGHT_OFFSET;
    let step = std::f32::consts::TAU / FALLBACK_DIRECTION_SAMPLES as f32;
    let mut best = (f32::NEG_INFINITY, to_target);

    for i in 0..FALLBACK_DIRECTION_SAMPLES {
        let dir = rotate_y(to_target, i as f32 * step);
        let mut score = dir.dot(to_target);

        let probe = from + dir * FALLBACK_PROBE_DISTANCE;
        if memory.is_near_any(probe, OBSTACLE_SEGMENT_CLEARANCE) {
            score -= 1.0;
        }

        let ray = RayCast::new(origin, dir, FALLBACK_PROBE_DISTANCE).excluding(caster);
        match world.cast_ray(&ray) {
            Ok(Some(hit)) => score -= 1.5 * (1.0 - hit.distance / FALLBACK_PROBE_DISTANCE),
            Ok(None) => {}
            Err(e) => {
                warn!("Fallback probe failed: {}", e);
                score -= 2.0;
            }
        }

        if score > best.0 {
            best = (score, dir);
        }
    }

    horizontal(best.1).normalize_or_zero()
}
