use glam::Vec3;
use parking_lot::RwLock;
use tracing::debug;

use super::{BodyHandle, DamageSink, TargetProvider};

/// Shared view of the player: where it stands and how much health it has
/// left. Enemies read the position and push damage into it.
#[derive(Debug)]
pub struct PlayerTarget {
    position: RwLock<Option<Vec3>>,
    health: RwLock<f32>,
    body: Option<BodyHandle>,
}

impl PlayerTarget {
    pub fn new(position: Vec3, health: f32) -> Self {
        PlayerTarget {
            position: RwLock::new(Some(position)),
            health: RwLock::new(health),
            body: None,
        }
    }

    pub fn with_body(mut self, body: BodyHandle) -> Self {
        self.body = Some(body);
        self
    }

    pub fn set_position(&self, position: Vec3) {
        *self.position.write() = Some(position);
    }

    /// The player left the world; enemies stop pursuing.
    pub fn despawn(&self) {
        *self.position.write() = None;
    }

    pub fn health(&self) -> f32 {
        *self.health.read()
    }
}

impl TargetProvider for PlayerTarget {
    fn position(&self) -> Option<Vec3> {
        *self.position.read()
    }

    fn body(&self) -> Option<BodyHandle> {
        self.body
    }
}

impl DamageSink for PlayerTarget {
    fn apply_damage(&self, amount: f32) {
        let mut health = self.health.write();
        *health = (*health - amount).max(0.0);
        debug!("Player took {:.1} damage, health now {:.1}", amount, *health);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damage_floors_at_zero() {
        let player = PlayerTarget::new(Vec3::ZERO, 15.0);
        player.apply_damage(10.0);
        player.apply_damage(10.0);
        assert_eq!(player.health(), 0.0);
    }

    #[test]
    fn test_despawned_player_has_no_position() {
        let player = PlayerTarget::new(Vec3::ONE, 100.0);
        assert_eq!(TargetProvider::position(&player), Some(Vec3::ONE));
        player.despawn();
        assert_eq!(TargetProvider::position(&player), None);
    }
}
