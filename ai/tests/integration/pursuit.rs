// survival_ai_core/ai/tests/integration/pursuit.rs

use survival_ai_core::core::config::{EnemyConfig, Species};
use survival_ai_core::core::types::{AiEvent, BehaviorState};
use survival_ai_core::concurrent::AiEventQueue;
use survival_ai_core::entities::{AssetLoader, Enemy, MemoryAssetLoader, TickContext};
use survival_ai_core::systems::ai::{BehaviorInput, BehaviorMachine, LineOfSight, LosParams, ObstacleMemory, StuckEvent};
use survival_ai_core::world::{PlayerTarget, SimWorld};

use approx::assert_relative_eq;
use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;

const DT: f32 = 1.0 / 60.0;

struct TestArena {
    world: SimWorld,
    loader: Arc<dyn AssetLoader>,
    events: AiEventQueue,
}

fn setup_arena() -> TestArena {
    TestArena {
        world: SimWorld::new(0.0),
        loader: Arc::new(MemoryAssetLoader::new([Species::Stalker.model_key(), Species::Phantom.model_key()])),
        events: AiEventQueue::new(),
    }
}

fn calm_config() -> EnemyConfig {
    EnemyConfig { seed: Some(42), circle_chance_per_tick: 0.0, ..EnemyConfig::default() }
}

async fn spawn_enemy(arena: &TestArena, config: EnemyConfig, position: Vec3) -> Enemy {
    let mut enemy = Enemy::new(Species::Stalker, config, position).with_events(arena.events.clone());
    enemy
        .initialize(&arena.world, arena.loader.clone())
        .await
        .expect("enemy should initialize");
    enemy
}

fn tick(enemy: &mut Enemy, arena: &TestArena, target: &PlayerTarget, now_ms: u64) -> BehaviorState {
    let ctx = TickContext {
        world: &arena.world,
        target,
        damage_sink: Some(target),
        neighbors: &[],
        now: Duration::from_millis(now_ms),
    };
    enemy.update(DT, &ctx).map(|report| report.state).unwrap_or(enemy.state())
}

#[tokio::test]
async fn direct_pursuit_heads_straight_for_visible_target() {
    let arena = setup_arena();
    let mut enemy = spawn_enemy(&arena, calm_config(), Vec3::ZERO).await;
    let target = PlayerTarget::new(Vec3::new(6.0, 0.0, 8.0), 100.0);

    let mut memory = ObstacleMemory::new(5);
    let los = LineOfSight::new(&arena.world, LosParams::default()).with_caster(enemy.body());
    assert!(los.is_path_clear(enemy.position(), Vec3::new(6.0, 0.0, 8.0), &mut memory));

    let state = tick(&mut enemy, &arena, &target, 0);
    assert_eq!(state, BehaviorState::Pursue);

    let desired = enemy.desired_direction();
    assert_relative_eq!(desired.x, 0.6, epsilon = 1e-4);
    assert_relative_eq!(desired.z, 0.8, epsilon = 1e-4);
    assert_eq!(desired.y, 0.0);

    let changes: Vec<_> = arena
        .events
        .drain()
        .into_iter()
        .filter(|e| matches!(e, AiEvent::StateChanged { to: BehaviorState::Pursue, .. }))
        .collect();
    assert_eq!(changes.len(), 1);
}

#[tokio::test]
async fn melee_range_overrides_circling_on_the_next_tick() {
    let arena = setup_arena();
    let config = EnemyConfig { circle_chance_per_tick: 1.0, ..calm_config() };
    let mut enemy = spawn_enemy(&arena, config, Vec3::ZERO).await;
    let target = PlayerTarget::new(Vec3::new(5.0, 0.0, 0.0), 100.0);

    assert_eq!(tick(&mut enemy, &arena, &target, 0), BehaviorState::Circle);

    target.set_position(Vec3::new(1.5, 0.0, 0.0));
    assert_eq!(tick(&mut enemy, &arena, &target, 16), BehaviorState::Attack);
    assert!(!enemy.behavior().is_circling());
    assert_eq!(target.health(), 90.0);

    // Cooldown holds the next swing back.
    assert_eq!(tick(&mut enemy, &arena, &target, 32), BehaviorState::Attack);
    assert_eq!(target.health(), 90.0);
}

#[tokio::test]
async fn melee_range_overrides_pathfinding() {
    let arena = setup_arena();
    arena.world.add_wall(Vec2::new(4.0, -5.0), Vec2::new(4.0, 5.0), 3.0, 0.6);
    let mut enemy = spawn_enemy(&arena, calm_config(), Vec3::ZERO).await;
    let target = PlayerTarget::new(Vec3::new(12.0, 0.0, 0.0), 100.0);

    assert_eq!(tick(&mut enemy, &arena, &target, 0), BehaviorState::Pathfind);

    target.set_position(Vec3::new(0.0, 0.0, -1.8));
    assert_eq!(tick(&mut enemy, &arena, &target, 16), BehaviorState::Attack);
    assert!(enemy.behavior().plan().is_empty());
}

#[tokio::test]
async fn missing_target_degrades_to_idle() {
    let arena = setup_arena();
    let mut enemy = spawn_enemy(&arena, calm_config(), Vec3::ZERO).await;
    let target = PlayerTarget::new(Vec3::new(10.0, 0.0, 0.0), 100.0);

    assert_eq!(tick(&mut enemy, &arena, &target, 0), BehaviorState::Pursue);
    target.despawn();
    assert_eq!(tick(&mut enemy, &arena, &target, 16), BehaviorState::Idle);
    assert!(enemy.is_alive());
}

#[test]
fn remembered_obstacle_forces_rate_limited_planning() {
    let world = SimWorld::new(0.0);
    let config = calm_config();
    let mut machine = BehaviorMachine::new(&config);
    let mut memory = ObstacleMemory::new(config.path_memory_limit);
    let mut rng = StdRng::seed_from_u64(5);

    let start = Vec3::ZERO;
    let target = Vec3::new(20.0, 0.0, 0.0);
    memory.record(Vec3::new(10.0, 0.0, 1.0));

    let los = LineOfSight::new(&world, LosParams::from_config(&config));
    assert!(!los.is_path_clear(start, target, &mut memory));

    let mut planned_at = Vec::new();
    for step in 0..90u64 {
        let now = Duration::from_millis(step * 16);
        let input = BehaviorInput {
            world: &world,
            position: start,
            heading: Vec3::X,
            target: Some(target),
            target_body: None,
            caster: None,
            now,
            stuck: StuckEvent::None,
        };
        let decision = machine.decide(&input, &mut memory, &config, &mut rng);
        assert_eq!(decision.state, BehaviorState::Pathfind);
        assert_ne!(decision.direction, Vec3::ZERO);
        if decision.planned.is_some() {
            planned_at.push(now);
        }
    }

    assert!(!planned_at.is_empty());
    assert_eq!(planned_at[0], Duration::ZERO);
    for pair in planned_at.windows(2) {
        assert!(pair[1] - pair[0] >= config.path_update_interval());
    }
}
