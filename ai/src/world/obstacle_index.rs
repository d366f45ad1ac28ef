use glam::Vec3;
use parking_lot::RwLock;
use rstar::{RTree, RTreeObject, AABB};
use std::sync::Arc;
use tracing::{debug, trace};

use super::RayCast;

/// Axis-aligned block of static level geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct ObstacleBox {
    pub id: u64,
    pub min: Vec3,
    pub max: Vec3,
    /// Sensors are skipped by `solid_only` ray casts.
    pub solid: bool,
}

impl ObstacleBox {
    pub fn new(id: u64, min: Vec3, max: Vec3) -> Self {
        ObstacleBox { id, min: min.min(max), max: min.max(max), solid: true }
    }

    pub fn sensor(id: u64, min: Vec3, max: Vec3) -> Self {
        ObstacleBox { solid: false, ..Self::new(id, min, max) }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Slab test. Returns the entry distance and face normal; an origin
    /// inside the box hits at distance zero facing back along the ray.
    pub fn intersect_ray(&self, ray: &RayCast) -> Option<(f32, Vec3)> {
        if self.contains(ray.origin) {
            return Some((0.0, -ray.direction));
        }

        let origin = ray.origin.to_array();
        let dir = ray.direction.to_array();
        let min = self.min.to_array();
        let max = self.max.to_array();

        let mut t_enter = 0.0_f32;
        let mut t_exit = ray.max_distance;
        let mut enter_axis = 0usize;

        for axis in 0..3 {
            if dir[axis].abs() < 1e-8 {
                if origin[axis] < min[axis] || origin[axis] > max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / dir[axis];
            let mut t1 = (min[axis] - origin[axis]) * inv;
            let mut t2 = (max[axis] - origin[axis]) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            if t1 > t_enter {
                t_enter = t1;
                enter_axis = axis;
            }
            t_exit = t_exit.min(t2);
            if t_enter > t_exit {
                return None;
            }
        }

        let mut normal = [0.0_f32; 3];
        normal[enter_axis] = -dir[enter_axis].signum();
        Some((t_enter, Vec3::from_array(normal)))
    }
}

impl RTreeObject for ObstacleBox {
    type Envelope = AABB<[f32; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.min.to_array(), self.max.to_array())
    }
}

pub struct ObstacleIndex {
    rtree: Arc<RwLock<RTree<ObstacleBox>>>,
}

impl ObstacleIndex {
    pub fn new() -> Self {
        ObstacleIndex {
            rtree: Arc::new(RwLock::new(RTree::new())),
        }
    }

    /// Build or rebuild the index from a set of boxes
    pub fn rebuild(&self, boxes: Vec<ObstacleBox>) {
        let new_tree = RTree::bulk_load(boxes);
        let mut tree_guard = self.rtree.write();
        *tree_guard = new_tree;
        debug!("Obstacle index rebuilt with {} boxes", tree_guard.size());
    }

    pub fn insert(&self, obstacle: ObstacleBox) {
        trace!("Inserting obstacle box {} ({:?} .. {:?})", obstacle.id, obstacle.min, obstacle.max);
        self.rtree.write().insert(obstacle);
    }

    /// Query boxes intersecting an AABB
    pub fn query_aabb(&self, min: Vec3, max: Vec3) -> Vec<ObstacleBox> {
        let query = AABB::from_corners(min.to_array(), max.to_array());
        let tree_guard = self.rtree.read();
        tree_guard
            .locate_in_envelope_intersecting(&query)
            .cloned()
            .collect()
    }

    /// Boxes the ray segment could touch
    pub fn query_ray(&self, ray: &RayCast) -> Vec<ObstacleBox> {
        let end = ray.point_at(ray.max_distance);
        let buffer = Vec3::splat(0.01);
        self.query_aabb(ray.origin.min(end) - buffer, ray.origin.max(end) + buffer)
    }

    pub fn size(&self) -> usize {
        self.rtree.read().size()
    }

    pub fn clear(&self) {
        let mut tree_guard = self.rtree.write();
        *tree_guard = RTree::new();
    }
}

impl Default for ObstacleIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall(id: u64, x: f32, z: f32) -> ObstacleBox {
        ObstacleBox::new(id, Vec3::new(x, 0.0, z), Vec3::new(x + 10.0, 3.0, z + 10.0))
    }

    #[test]
    fn test_obstacle_index_queries() {
        let index = ObstacleIndex::new();
        index.rebuild(vec![wall(1, 0.0, 0.0), wall(2, 20.0, 20.0)]);
        assert_eq!(index.size(), 2);

        let results = index.query_aabb(Vec3::new(-5.0, 0.0, -5.0), Vec3::new(5.0, 1.0, 5.0));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 1);

        let results = index.query_aabb(Vec3::splat(-5.0), Vec3::splat(35.0));
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_ray_hits_near_face() {
        let block = ObstacleBox::new(7, Vec3::new(5.0, 0.0, -1.0), Vec3::new(6.0, 3.0, 1.0));
        let ray = RayCast::new(Vec3::new(0.0, 1.0, 0.0), Vec3::X, 10.0);
        let (distance, normal) = block.intersect_ray(&ray).unwrap();
        assert!((distance - 5.0).abs() < 1e-5);
        assert_eq!(normal, Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_ray_stops_short() {
        let block = ObstacleBox::new(7, Vec3::new(5.0, 0.0, -1.0), Vec3::new(6.0, 3.0, 1.0));
        let ray = RayCast::new(Vec3::new(0.0, 1.0, 0.0), Vec3::X, 4.0);
        assert!(block.intersect_ray(&ray).is_none());
    }

    #[test]
    fn test_ray_passes_over() {
        let block = ObstacleBox::new(7, Vec3::new(5.0, 0.0, -1.0), Vec3::new(6.0, 3.0, 1.0));
        let ray = RayCast::new(Vec3::new(0.0, 4.0, 0.0), Vec3::X, 10.0);
        assert!(block.intersect_ray(&ray).is_none());
    }
}
