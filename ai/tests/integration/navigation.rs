// survival_ai_core/ai/tests/integration/navigation.rs

use survival_ai_core::core::config::{EnemyConfig, Species};
use survival_ai_core::core::types::BehaviorState;
use survival_ai_core::entities::{Enemy, MemoryAssetLoader, TickContext};
use survival_ai_core::systems::ai::{
    fallback_direction, BehaviorInput, BehaviorMachine, LineOfSight, LocalPlanner, LosParams, LosVerdict,
    ObstacleMemory, PlanError, PlannerParams, StuckDetector, StuckEvent,
};
use survival_ai_core::world::{PlayerTarget, SimWorld};

use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const DT: f32 = 1.0 / 60.0;

fn walled_world() -> SimWorld {
    let world = SimWorld::new(0.0);
    world.add_wall(Vec2::new(-3.0, 0.0), Vec2::new(3.0, 0.0), 3.0, 0.8);
    world
}

#[test]
fn stuck_episode_escalates_soft_then_hard_exactly_once() {
    let config = EnemyConfig { circle_chance_per_tick: 0.0, ..EnemyConfig::default() };
    let world = SimWorld::new(0.0);
    let mut detector = StuckDetector::from_config(&config);
    let mut machine = BehaviorMachine::new(&config);
    let mut memory = ObstacleMemory::new(config.path_memory_limit);
    let mut rng = StdRng::seed_from_u64(17);

    let pinned = Vec3::new(3.0, 0.0, 3.0);
    let target = Vec3::new(3.0, 0.0, 30.0);
    let mut soft = Vec::new();
    let mut hard = Vec::new();
    let mut last_stuck_time = 0.0;

    for step in 0..240u64 {
        let event = detector.update(pinned, 2.0, DT);
        assert!(detector.stuck_time() >= last_stuck_time);
        last_stuck_time = detector.stuck_time();

        let input = BehaviorInput {
            world: &world,
            position: pinned,
            heading: Vec3::Z,
            target: Some(target),
            target_body: None,
            caster: None,
            now: Duration::from_millis(step * 16),
            stuck: event,
        };
        let decision = machine.decide(&input, &mut memory, &config, &mut rng);
        match event {
            StuckEvent::Soft => {
                soft.push(step);
                assert_eq!(decision.state, BehaviorState::Avoid);
                assert!(decision.kick.is_none());
            }
            StuckEvent::Hard => {
                hard.push(step);
                assert_eq!(decision.state, BehaviorState::Avoid);
                let kick = decision.kick.expect("hard escalation kicks");
                assert!(kick.dot(Vec3::Z).abs() < 1e-4);
            }
            StuckEvent::None => {}
        }
    }

    assert_eq!(soft.len(), 1);
    assert_eq!(hard.len(), 1);
    assert!(soft[0] < hard[0]);
    // The stuck spot went into memory.
    assert!(memory.is_near_any(pinned, 0.1));
}

#[test]
fn slope_too_steep_is_not_clear_and_remembered() {
    let world = SimWorld::new(0.0);
    let los = LineOfSight::new(&world, LosParams::default());
    let mut memory = ObstacleMemory::new(5);

    let verdict = los.check(Vec3::ZERO, Vec3::new(5.0, 4.0, 0.0), &mut memory);
    assert!(matches!(verdict, LosVerdict::TooSteep { .. }));
    assert_eq!(memory.len(), 1);

    // A gentle ramp is fine.
    assert!(los.is_path_clear(Vec3::ZERO, Vec3::new(8.0, 2.0, 0.0), &mut ObstacleMemory::new(5)));
}

#[test]
fn query_failure_fails_closed_everywhere() {
    let world = SimWorld::new(0.0);
    world.set_failing(true);
    let mut memory = ObstacleMemory::new(5);

    let los = LineOfSight::new(&world, LosParams::default());
    assert!(!los.is_path_clear(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), &mut memory));

    let planner = LocalPlanner::new(&world, PlannerParams::default(), LosParams::default());
    let plan = planner.find_path(Vec3::ZERO, Vec3::new(15.0, 0.0, 0.0), &mut memory);
    assert!(plan.is_err());

    let fallback = fallback_direction(&world, Vec3::ZERO, Vec3::new(15.0, 0.0, 0.0), &memory, None);
    assert!((fallback.length() - 1.0).abs() < 1e-4);
}

#[test]
fn planner_routes_around_a_wall() {
    let world = walled_world();
    let planner = LocalPlanner::new(&world, PlannerParams::default(), LosParams::default());
    let mut memory = ObstacleMemory::new(5);

    let start = Vec3::new(0.0, 0.0, -8.0);
    let goal = Vec3::new(0.0, 0.0, 8.0);
    match planner.find_path(start, goal, &mut memory) {
        Ok(waypoints) => {
            assert!(!waypoints.is_empty());
            // Some waypoint has to clear the wall's end.
            assert!(waypoints.iter().any(|w| w.x.abs() > 3.4));
            let last = waypoints[waypoints.len() - 1];
            assert!(last.distance(goal) <= PlannerParams::default().grid_size * 0.5 + 1e-3);
        }
        Err(PlanError::Exhausted { .. }) | Err(PlanError::Unreachable) | Err(PlanError::NoCandidates) => {
            panic!("a detour around a short wall exists")
        }
        Err(e) => panic!("unexpected planner error: {}", e),
    }
}

#[tokio::test]
async fn enemy_gets_around_a_wall_to_reach_the_player() {
    let world = walled_world();
    let loader = Arc::new(MemoryAssetLoader::new([Species::Stalker.model_key()]));
    let config = EnemyConfig { seed: Some(8), circle_chance_per_tick: 0.0, ..EnemyConfig::default() };
    let mut enemy = Enemy::new(Species::Stalker, config, Vec3::new(0.0, 0.0, -8.0));
    enemy.initialize(&world, loader).await.unwrap();

    let player_at = Vec3::new(0.0, 0.0, 8.0);
    let target = PlayerTarget::new(player_at, 1000.0);
    let mut closest = enemy.position().distance(player_at);
    let mut saw_pathfind = false;

    for step in 0..1200u64 {
        let ctx = TickContext {
            world: &world,
            target: &target,
            damage_sink: Some(&target),
            neighbors: &[],
            now: Duration::from_millis(step * 16),
        };
        if let Some(report) = enemy.update(DT, &ctx) {
            saw_pathfind |= report.state == BehaviorState::Pathfind;
        }
        world.step(DT);
        closest = closest.min(enemy.position().distance(player_at));
        if enemy.state() == BehaviorState::Attack {
            break;
        }
    }

    info!("closest approach {:.2}, memory {}", closest, enemy.obstacle_memory().len());
    assert!(saw_pathfind);
    assert!(closest < 6.0, "enemy stalled behind the wall, closest approach {:.2}", closest);
}
