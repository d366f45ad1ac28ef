// survival_ai_core/ai/src/main.rs
use survival_ai_core::core::config::{EnemyConfig, Species};
use survival_ai_core::core::constants::TICK_DURATION;
use survival_ai_core::core::types::AiEvent;
use survival_ai_core::entities::{AssetLoader, MemoryAssetLoader};
use survival_ai_core::operational::monitoring::init_logging;
use survival_ai_core::systems::Horde;
use survival_ai_core::world::{PlayerTarget, SimWorld};

use anyhow::Context;
use glam::{Vec2, Vec3};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

const DEFAULT_TICKS: u64 = 900;
const ARENA_HALF_EXTENT: f32 = 40.0;

fn build_arena() -> SimWorld {
    let world = SimWorld::new(0.0)
        .with_bounds(Vec2::splat(-ARENA_HALF_EXTENT), Vec2::splat(ARENA_HALF_EXTENT));
    let h = ARENA_HALF_EXTENT - 1.0;
    // Perimeter
    world.add_wall(Vec2::new(-h, -h), Vec2::new(h, -h), 4.0, 1.0);
    world.add_wall(Vec2::new(-h, h), Vec2::new(h, h), 4.0, 1.0);
    world.add_wall(Vec2::new(-h, -h), Vec2::new(-h, h), 4.0, 1.0);
    world.add_wall(Vec2::new(h, -h), Vec2::new(h, h), 4.0, 1.0);
    // Cover between the spawn line and the player
    world.add_wall(Vec2::new(-8.0, 6.0), Vec2::new(8.0, 6.0), 3.0, 0.8);
    world.add_wall(Vec2::new(-20.0, -6.0), Vec2::new(-12.0, -6.0), 3.0, 0.8);
    world.add_wall(Vec2::new(12.0, -6.0), Vec2::new(20.0, -6.0), 3.0, 0.8);
    world.add_box(Vec3::new(-3.0, 0.0, -14.0), Vec3::new(3.0, 1.2, -11.0));
    world
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {:?}", e);
        return Err(e);
    }

    let mut args = std::env::args().skip(1);
    let config = match args.next().map(PathBuf::from) {
        Some(path) => {
            let config = EnemyConfig::load(&path).with_context(|| format!("loading enemy config {}", path.display()))?;
            info!("Loaded enemy config from {}", path.display());
            Some(config)
        }
        None => None,
    };
    let ticks = match args.next() {
        Some(raw) => raw.parse::<u64>().with_context(|| format!("invalid tick count '{}'", raw))?,
        None => DEFAULT_TICKS,
    };

    let world = Arc::new(build_arena());
    info!("Arena ready with {} obstacles", world.obstacle_count());

    let mut horde = Horde::new(world.clone()).with_seed(0x5eed);
    if let Some(config) = config {
        horde = horde.with_config(Species::Stalker, config);
    }

    let loader: Arc<dyn AssetLoader> =
        Arc::new(MemoryAssetLoader::new([Species::Stalker.model_key(), Species::Phantom.model_key()]));
    let spawns = [
        (Species::Stalker, Vec3::new(-10.0, 0.0, 25.0)),
        (Species::Stalker, Vec3::new(0.0, 0.0, 28.0)),
        (Species::Stalker, Vec3::new(10.0, 0.0, 25.0)),
        (Species::Phantom, Vec3::new(-25.0, 0.0, -20.0)),
        (Species::Phantom, Vec3::new(25.0, 0.0, -20.0)),
    ];
    for (species, position) in spawns {
        match horde.spawn(species, position, loader.clone()).await {
            Ok(id) => info!("Spawned {:?} {} at {:?}", species, id, position),
            Err(e) => error!("Failed to spawn {:?} at {:?}: {}", species, position, e),
        }
    }

    let player = PlayerTarget::new(Vec3::ZERO, 250.0);
    let dt = TICK_DURATION.as_secs_f32();
    let mut clock = interval(TICK_DURATION);
    clock.set_missed_tick_behavior(MissedTickBehavior::Skip);

    for tick in 0..ticks {
        clock.tick().await;

        // The player strafes around the arena centre.
        let t = tick as f32 * dt;
        player.set_position(Vec3::new(12.0 * (t * 0.3).cos(), 0.0, 12.0 * (t * 0.3).sin()));

        // Every second the player lands a shot on whoever is closest.
        if tick > 0 && tick % 60 == 0 {
            let here = player_position(&player);
            let closest = horde
                .states()
                .into_iter()
                .min_by(|a, b| a.2.distance(here).total_cmp(&b.2.distance(here)));
            if let Some((id, _, _)) = closest {
                let region = if tick % 180 == 0 { "head" } else { "torso" };
                if let Some(outcome) = horde.damage(id, region, 35.0) {
                    if outcome.killed {
                        info!("Player killed {} ({})", id, region);
                    }
                }
            }
        }

        let summary = horde.update_all(dt, &player, Some(&player));

        for event in horde.events().drain() {
            match event {
                AiEvent::StateChanged { enemy, from, to } => info!("{} {:?} -> {:?}", enemy, from, to),
                AiEvent::Stuck { enemy, hard, position } => info!("{} stuck (hard: {}) at {:?}", enemy, hard, position),
                AiEvent::PlanFailed { enemy, reason } => info!("{} could not plan: {}", enemy, reason),
                other => tracing::debug!("{}", serde_json::to_string(&other).unwrap_or_default()),
            }
        }

        if horde.is_empty() {
            info!("Horde wiped out after {} ticks", tick + 1);
            break;
        }
        if player.health() <= 0.0 {
            info!("Player overrun after {} ticks", tick + 1);
            break;
        }
        if tick % 120 == 0 {
            info!(
                "tick {}: {} alive, {} attacks, {} plans, player health {:.0}",
                tick,
                horde.alive_count(),
                summary.attacks,
                summary.plans,
                player.health()
            );
        }
    }

    let ledger = horde.ledger().snapshot();
    info!("Kill ledger: {}", serde_json::to_string(&ledger)?);
    horde.despawn_all();
    info!("Demo finished; {} bodies left in the world", world.body_count());
    Ok(())
}

fn player_position(player: &PlayerTarget) -> Vec3 {
    use survival_ai_core::world::TargetProvider;
    player.position().unwrap_or(Vec3::ZERO)
}
