// survival_ai_core/ai/tests/performance/horde_stress.rs
use glam::{Vec2, Vec3};
use metrics::histogram;
use std::sync::Arc;
use std::time::Instant;
use survival_ai_core::core::config::Species;
use survival_ai_core::entities::{AssetLoader, MemoryAssetLoader};
use survival_ai_core::systems::Horde;
use survival_ai_core::world::{PlayerTarget, SimWorld};

fn setup_arena() -> Arc<SimWorld> {
    let world = SimWorld::new(0.0).with_bounds(Vec2::splat(-60.0), Vec2::splat(60.0));
    for i in -3..=3 {
        let x = i as f32 * 12.0;
        world.add_wall(Vec2::new(x - 3.0, 10.0), Vec2::new(x + 3.0, 10.0), 3.0, 0.8);
    }
    Arc::new(world)
}

#[tokio::test]
async fn stress_horde_tick() {
    let world = setup_arena();
    let horde = Horde::new(world.clone()).with_seed(2024);
    let loader: Arc<dyn AssetLoader> =
        Arc::new(MemoryAssetLoader::new([Species::Stalker.model_key(), Species::Phantom.model_key()]));

    for i in 0..64 {
        let species = if i % 4 == 0 { Species::Phantom } else { Species::Stalker };
        let position = Vec3::new((i % 16) as f32 * 5.0 - 40.0, 0.0, 25.0 + (i / 16) as f32 * 4.0);
        horde.spawn(species, position, loader.clone()).await.unwrap();
    }
    assert_eq!(horde.alive_count(), 64);

    let player = PlayerTarget::new(Vec3::ZERO, f32::MAX);
    let delta_time = 1.0 / 60.0;
    let mut plans = 0;
    for _ in 0..600 {
        let start = Instant::now();
        let summary = horde.update_all(delta_time, &player, Some(&player));
        histogram!("horde_tick_duration_ms").record(start.elapsed().as_secs_f64() * 1000.0);
        assert_eq!(summary.updated, 64);
        plans += summary.plans;
    }

    // Walls sit between the spawn rows and the player.
    assert!(plans > 0);
    assert_eq!(world.body_count(), 64);
    for (_, _, position) in horde.states() {
        assert!(position.is_finite());
    }
    assert_eq!(horde.despawn_all(), 64);
    assert_eq!(world.body_count(), 0);
}
