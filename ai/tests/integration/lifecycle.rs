// survival_ai_core/ai/tests/integration/lifecycle.rs

use survival_ai_core::core::config::{EnemyConfig, Species};
use survival_ai_core::core::error::AiError;
use survival_ai_core::core::types::{AiEvent, AnimationClip, LifecycleState};
use survival_ai_core::entities::{AssetLoader, Enemy, EnemyObserver, MemoryAssetLoader, TickContext};
use survival_ai_core::systems::Horde;
use survival_ai_core::world::{PlayerTarget, SimWorld};
use survival_ai_core::EnemyId;

use glam::Vec3;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct RecordingObserver {
    kills: Mutex<Vec<(EnemyId, bool)>>,
    deaths: Mutex<Vec<EnemyId>>,
}

impl EnemyObserver for RecordingObserver {
    fn on_kill(&self, enemy: EnemyId, critical: bool) {
        self.kills.lock().push((enemy, critical));
    }

    fn on_death(&self, enemy: EnemyId) {
        self.deaths.lock().push(enemy);
    }
}

fn memory_loader() -> Arc<MemoryAssetLoader> {
    Arc::new(
        MemoryAssetLoader::new([Species::Stalker.model_key(), Species::Phantom.model_key()])
            .with_latency(Duration::from_millis(5)),
    )
}

fn seeded_config() -> EnemyConfig {
    EnemyConfig { seed: Some(3), ..EnemyConfig::default() }
}

#[tokio::test]
async fn async_initialization_reaches_active() {
    let world = SimWorld::new(0.0);
    let loader = memory_loader();
    let mut enemy = Enemy::new(Species::Stalker, seeded_config(), Vec3::new(2.0, 0.0, 2.0));
    assert_eq!(enemy.lifecycle(), LifecycleState::Uninitialized);
    assert_eq!(enemy.animation(), AnimationClip::Idle);

    enemy.initialize(&world, loader.clone()).await.unwrap();
    assert_eq!(enemy.lifecycle(), LifecycleState::Active);
    assert!(enemy.body().is_some());
    assert!(enemy.has_model());
    assert_eq!(loader.live_count(), 1);
}

#[tokio::test]
async fn missing_model_fails_without_leaking_a_body() {
    let world = SimWorld::new(0.0);
    let loader: Arc<dyn AssetLoader> = Arc::new(MemoryAssetLoader::new(Vec::<String>::new()));
    let mut enemy = Enemy::new(Species::Phantom, seeded_config(), Vec3::ZERO);

    let err = enemy.initialize(&world, loader).await.unwrap_err();
    assert!(matches!(err, AiError::Asset(_)));
    assert_eq!(enemy.lifecycle(), LifecycleState::Uninitialized);
    assert_eq!(world.body_count(), 0);
    assert!(enemy.body().is_none());
}

#[tokio::test]
async fn physics_failure_releases_the_loaded_model() {
    let world = SimWorld::new(0.0);
    world.set_failing(true);
    let loader = memory_loader();
    let mut enemy = Enemy::new(Species::Stalker, seeded_config(), Vec3::ZERO);

    let err = enemy.initialize(&world, loader.clone()).await.unwrap_err();
    assert!(matches!(err, AiError::InitializationFailed(_)));
    assert_eq!(loader.live_count(), 0);
    assert!(!enemy.has_model());
}

#[tokio::test]
async fn death_is_final_and_reported_once() {
    let world = SimWorld::new(0.0);
    let loader = memory_loader();
    let observer = Arc::new(RecordingObserver::default());
    let mut enemy = Enemy::new(Species::Stalker, seeded_config(), Vec3::ZERO).with_observer(observer.clone());
    enemy.initialize(&world, loader.clone()).await.unwrap();

    let wound = enemy.take_damage(40.0, false, Duration::ZERO);
    assert!(!wound.killed);
    assert_eq!(enemy.health(), 60.0);

    let blow = enemy.take_damage(75.0, true, Duration::from_millis(100));
    assert!(blow.killed);
    assert!(blow.critical);
    assert_eq!(blow.applied, 60.0);
    assert!(!enemy.is_alive());
    assert_eq!(enemy.health(), 0.0);

    let after = enemy.take_damage(30.0, true, Duration::from_millis(200));
    assert!(!after.killed);
    assert_eq!(after.applied, 0.0);
    assert_eq!(enemy.health(), 0.0);
    assert_eq!(observer.kills.lock().as_slice(), &[(enemy.id(), true)]);

    // The death effect plays out before resources go away.
    let target = PlayerTarget::new(Vec3::new(3.0, 0.0, 0.0), 100.0);
    let mut now = Duration::from_millis(100);
    while now < Duration::from_millis(2500) {
        let ctx = TickContext { world: &world, target: &target, damage_sink: Some(&target), neighbors: &[], now };
        assert!(enemy.update(1.0 / 60.0, &ctx).is_none());
        now += Duration::from_millis(16);
    }
    assert_eq!(enemy.lifecycle(), LifecycleState::Destroyed);
    assert_eq!(observer.deaths.lock().len(), 1);
    assert_eq!(world.body_count(), 0);
    assert_eq!(loader.live_count(), 0);
    // A dead enemy never attacks.
    assert_eq!(target.health(), 100.0);

    enemy.take_damage(10.0, false, now);
    assert_eq!(observer.kills.lock().len(), 1);
}

#[tokio::test]
async fn hit_regions_scale_damage() {
    let world = SimWorld::new(0.0);
    let mut enemy = Enemy::new(Species::Stalker, seeded_config(), Vec3::ZERO);
    enemy.initialize(&world, memory_loader()).await.unwrap();

    let limb = enemy.take_hit("limb", 10.0, Duration::ZERO);
    assert!((limb.applied - 6.0).abs() < 1e-4);
    assert!(!limb.critical);

    let unknown = enemy.take_hit("tail", 10.0, Duration::ZERO);
    assert!((unknown.applied - 10.0).abs() < 1e-4);

    let head = enemy.take_hit("head", 10.0, Duration::ZERO);
    assert!((head.applied - 20.0).abs() < 1e-4);
    assert!(head.critical);
    assert!((enemy.health() - 64.0).abs() < 1e-4);
}

#[tokio::test]
async fn horde_reports_lifecycle_events_in_order() {
    let world = Arc::new(SimWorld::new(0.0));
    let horde = Horde::new(world.clone()).with_seed(99);
    let loader: Arc<dyn AssetLoader> = memory_loader();
    let id = horde.spawn(Species::Stalker, Vec3::ZERO, loader).await.unwrap();

    horde.damage(id, "head", 80.0);
    let target = PlayerTarget::new(Vec3::new(30.0, 0.0, 0.0), 100.0);
    for _ in 0..140 {
        horde.update_all(1.0 / 60.0, &target, None);
    }

    let lifecycle: Vec<&'static str> = horde
        .events()
        .drain()
        .into_iter()
        .filter_map(|event| match event {
            AiEvent::Spawned { .. } => Some("spawned"),
            AiEvent::Killed { .. } => Some("killed"),
            AiEvent::Destroyed { .. } => Some("destroyed"),
            _ => None,
        })
        .collect();
    // Killed and Destroyed are high priority and drain ahead of Spawned.
    assert!(lifecycle.contains(&"spawned"));
    assert_eq!(lifecycle.iter().filter(|e| **e == "killed").count(), 1);
    assert_eq!(lifecycle.iter().filter(|e| **e == "destroyed").count(), 1);
    assert!(horde.is_empty());
    assert_eq!(horde.ledger().snapshot().critical_kills, 1);
    assert_eq!(world.body_count(), 0);
}
