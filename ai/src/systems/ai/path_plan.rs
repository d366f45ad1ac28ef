use glam::Vec3;
use tracing::trace;

use crate::core::types::horizontal_distance;

/// Waypoint queue with a forward-only cursor.
#[derive(Debug, Clone, Default)]
pub struct PathPlan {
    waypoints: Vec<Vec3>,
    cursor: usize,
}

impl PathPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the plan; the cursor restarts at the first waypoint.
    pub fn replace(&mut self, waypoints: Vec<Vec3>) {
        self.waypoints = waypoints;
        self.cursor = 0;
    }

    pub fn clear(&mut self) {
        self.waypoints.clear();
        self.cursor = 0;
    }

    pub fn is_active(&self) -> bool {
        self.cursor < self.waypoints.len()
    }

    pub fn current(&self) -> Option<Vec3> {
        self.waypoints.get(self.cursor).copied()
    }

    pub fn final_waypoint(&self) -> Option<Vec3> {
        self.waypoints.last().copied()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn waypoints(&self) -> &[Vec3] {
        &self.waypoints
    }

    /// Moves past every waypoint within `radius` of `position`. Passing the
    /// final waypoint clears the plan. Returns the next waypoint to head for.
    pub fn advance(&mut self, position: Vec3, radius: f32) -> Option<Vec3> {
        while let Some(waypoint) = self.current() {
            if horizontal_distance(position, waypoint) > radius {
                return Some(waypoint);
            }
            self.cursor += 1;
            trace!("Waypoint {} reached at {:?}", self.cursor, waypoint);
        }
        if !self.waypoints.is_empty() {
            self.clear();
        }
        None
    }
}
