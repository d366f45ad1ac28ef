// survival_ai_core/ai/src/systems/ai/obstacle_memory.rs
use glam::Vec3;
use std::collections::VecDeque;
use tracing::trace;

use crate::core::constants::OBSTACLE_DEDUP_RADIUS;

/// Bounded FIFO of world positions an enemy found blocked.
///
/// Entries never expire by time; they leave only when newer ones push them
/// out. A point within [`OBSTACLE_DEDUP_RADIUS`] of a stored one is dropped.
#[derive(Debug, Clone)]
pub struct ObstacleMemory {
    points: VecDeque<Vec3>,
    limit: usize,
    recent: Vec<Vec3>,
}

impl ObstacleMemory {
    pub fn new(limit: usize) -> Self {
        ObstacleMemory {
            points: VecDeque::with_capacity(limit + 1),
            limit,
            recent: Vec::new(),
        }
    }

    /// Returns `true` when the point was stored.
    pub fn record(&mut self, position: Vec3) -> bool {
        if self.is_near_any(position, OBSTACLE_DEDUP_RADIUS) {
            return false;
        }
        self.points.push_back(position);
        while self.points.len() > self.limit {
            if let Some(evicted) = self.points.pop_front() {
                trace!("Obstacle memory full, evicting {:?}", evicted);
            }
        }
        let stored = self.points.back() == Some(&position);
        if stored {
            self.recent.push(position);
        }
        stored
    }

    /// Points stored since the last call, oldest first.
    pub fn drain_recent(&mut self) -> Vec<Vec3> {
        std::mem::take(&mut self.recent)
    }

    pub fn is_near_any(&self, position: Vec3, radius: f32) -> bool {
        let radius_sq = radius * radius;
        self.points.iter().any(|p| p.distance_squared(position) < radius_sq)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vec3> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.recent.clear();
    }
}
