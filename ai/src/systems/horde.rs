// survival_ai_core/ai/src/systems/horde.rs
use dashmap::DashMap;
use glam::Vec3;
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use smallvec::SmallVec;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

use crate::concurrent::AiEventQueue;
use crate::core::config::{EnemyConfig, Species};
use crate::core::error::AiResult;
use crate::core::types::{BehaviorState, DamageOutcome, EnemyId};
use crate::entities::{AssetLoader, Enemy, EnemyObserver, TickContext};
use crate::operational::monitoring::AiMetrics;
use crate::systems::ai::stuck::StuckEvent;
use crate::world::{DamageSink, PhysicsWorld, TargetProvider};

/// Kill accounting shared by every enemy of a horde.
#[derive(Default)]
pub struct KillLedger {
    kills: AtomicU64,
    critical_kills: AtomicU64,
    deaths: AtomicU64,
    metrics: AiMetrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KillSnapshot {
    pub kills: u64,
    pub critical_kills: u64,
    pub deaths: u64,
}

impl KillLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> KillSnapshot {
        KillSnapshot {
            kills: self.kills.load(Ordering::Relaxed),
            critical_kills: self.critical_kills.load(Ordering::Relaxed),
            deaths: self.deaths.load(Ordering::Relaxed),
        }
    }
}

impl EnemyObserver for KillLedger {
    fn on_kill(&self, enemy: EnemyId, critical: bool) {
        self.kills.fetch_add(1, Ordering::Relaxed);
        if critical {
            self.critical_kills.fetch_add(1, Ordering::Relaxed);
        }
        self.metrics.record_kill(critical);
        trace!("Kill recorded for {} (critical: {})", enemy, critical);
    }

    fn on_death(&self, enemy: EnemyId) {
        self.deaths.fetch_add(1, Ordering::Relaxed);
        trace!("Death recorded for {}", enemy);
    }
}

/// Summary of one `update_all` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HordeTick {
    pub updated: usize,
    pub attacks: usize,
    pub plans: usize,
    pub plan_failures: usize,
    pub stuck_events: usize,
    pub reaped: usize,
}

/// Owns a group of enemies sharing one physics world and one event queue.
/// Updates are serialized: one `update_all` call walks every enemy in turn
/// and then steps the world.
pub struct Horde<W: PhysicsWorld + Send + Sync> {
    world: Arc<W>,
    enemies: RwLock<Vec<Enemy>>,
    configs: DashMap<Species, EnemyConfig>,
    ledger: Arc<KillLedger>,
    events: AiEventQueue,
    metrics: AiMetrics,
    clock: Mutex<Duration>,
    seeder: Mutex<Option<StdRng>>,
}

impl<W: PhysicsWorld + Send + Sync> Horde<W> {
    pub fn new(world: Arc<W>) -> Self {
        Horde {
            world,
            enemies: RwLock::new(Vec::new()),
            configs: DashMap::new(),
            ledger: Arc::new(KillLedger::new()),
            events: AiEventQueue::new(),
            metrics: AiMetrics::new(),
            clock: Mutex::new(Duration::ZERO),
            seeder: Mutex::new(None),
        }
    }

    /// Derives every spawned enemy's random seed from `seed`, unless the
    /// species config pins one.
    pub fn with_seed(self, seed: u64) -> Self {
        *self.seeder.lock() = Some(StdRng::seed_from_u64(seed));
        self
    }

    /// Overrides the tunables used for new enemies of `species`.
    pub fn with_config(self, species: Species, config: EnemyConfig) -> Self {
        self.configs.insert(species, config);
        self
    }

    pub fn world(&self) -> &Arc<W> {
        &self.world
    }

    pub fn events(&self) -> &AiEventQueue {
        &self.events
    }

    pub fn ledger(&self) -> &Arc<KillLedger> {
        &self.ledger
    }

    pub fn now(&self) -> Duration {
        *self.clock.lock()
    }

    fn config_for(&self, species: Species) -> EnemyConfig {
        let mut config = self
            .configs
            .get(&species)
            .map(|entry| entry.value().clone())
            .unwrap_or_else(|| species.default_config());
        if config.seed.is_none() {
            if let Some(seeder) = self.seeder.lock().as_mut() {
                config.seed = Some(seeder.gen());
            }
        }
        config
    }

    /// Creates and initializes an enemy. It joins the horde only once
    /// initialization succeeded; on failure nothing stays registered.
    pub async fn spawn(&self, species: Species, position: Vec3, loader: Arc<dyn AssetLoader>) -> AiResult<EnemyId> {
        let observer: Arc<dyn EnemyObserver> = self.ledger.clone();
        let mut enemy = Enemy::new(species, self.config_for(species), position)
            .with_observer(observer)
            .with_events(self.events.clone());

        enemy.initialize(self.world.as_ref(), loader).await?;

        let id = enemy.id();
        let mut enemies = self.enemies.write();
        enemies.push(enemy);
        self.metrics.update_enemies_alive(enemies.len());
        debug!("Horde now holds {} enemies", enemies.len());
        Ok(id)
    }

    /// Ticks every enemy, steps the physics world and reaps destroyed
    /// enemies.
    pub fn update_all(&self, dt: f32, target: &dyn TargetProvider, damage_sink: Option<&dyn DamageSink>) -> HordeTick {
        let started = Instant::now();
        let step = match Duration::try_from_secs_f32(dt) {
            Ok(step) => step,
            Err(e) => {
                warn!("Skipping horde tick with invalid dt {}: {}", dt, e);
                return HordeTick::default();
            }
        };
        let now = {
            let mut clock = self.clock.lock();
            *clock = clock.saturating_add(step);
            *clock
        };

        let mut summary = HordeTick::default();
        let mut enemies = self.enemies.write();
        let positions: Vec<(EnemyId, Vec3)> =
            enemies.iter().filter(|e| e.is_alive()).map(|e| (e.id(), e.position())).collect();

        for enemy in enemies.iter_mut() {
            let own = enemy.id();
            let neighbors: SmallVec<[Vec3; 16]> =
                positions.iter().filter(|(id, _)| *id != own).map(|(_, p)| *p).collect();
            let ctx = TickContext {
                world: self.world.as_ref(),
                target,
                damage_sink,
                neighbors: &neighbors,
                now,
            };
            let Some(report) = enemy.update(dt, &ctx) else { continue };
            summary.updated += 1;
            if report.attacked {
                summary.attacks += 1;
            }
            match report.planned {
                Some(true) => {
                    summary.plans += 1;
                    self.metrics.record_plan(true);
                }
                Some(false) => {
                    summary.plan_failures += 1;
                    self.metrics.record_plan(false);
                }
                None => {}
            }
            if report.stuck != StuckEvent::None {
                summary.stuck_events += 1;
                self.metrics.record_stuck(report.stuck == StuckEvent::Hard);
            }
        }

        self.world.advance(dt);

        let before = enemies.len();
        enemies.retain(|e| !e.is_destroyed());
        summary.reaped = before - enemies.len();
        if summary.reaped > 0 {
            debug!("Reaped {} destroyed enemies", summary.reaped);
        }

        self.metrics.update_enemies_alive(enemies.len());
        self.metrics.record_tick_time(started.elapsed().as_secs_f64());
        summary
    }

    /// Routes a weapon hit to one enemy. `None` if the id is unknown.
    pub fn damage(&self, id: EnemyId, region: &str, amount: f32) -> Option<DamageOutcome> {
        let now = self.now();
        let mut enemies = self.enemies.write();
        let enemy = enemies.iter_mut().find(|e| e.id() == id)?;
        Some(enemy.take_hit(region, amount, now))
    }

    /// Removes every enemy immediately.
    pub fn despawn_all(&self) -> usize {
        let mut enemies = self.enemies.write();
        let count = enemies.len();
        for enemy in enemies.iter_mut() {
            enemy.despawn(self.world.as_ref());
        }
        enemies.clear();
        self.metrics.update_enemies_alive(0);
        info!("Despawned {} enemies", count);
        count
    }

    pub fn alive_count(&self) -> usize {
        self.enemies.read().iter().filter(|e| e.is_alive()).count()
    }

    pub fn len(&self) -> usize {
        self.enemies.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.enemies.read().is_empty()
    }

    pub fn ids(&self) -> Vec<EnemyId> {
        self.enemies.read().iter().map(|e| e.id()).collect()
    }

    pub fn states(&self) -> Vec<(EnemyId, BehaviorState, Vec3)> {
        self.enemies.read().iter().map(|e| (e.id(), e.state(), e.position())).collect()
    }

    /// Runs `f` against one enemy under the horde lock.
    pub fn with_enemy<R>(&self, id: EnemyId, f: impl FnOnce(&Enemy) -> R) -> Option<R> {
        self.enemies.read().iter().find(|e| e.id() == id).map(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::MemoryAssetLoader;
    use crate::world::{PlayerTarget, SimWorld};

    fn loader() -> Arc<dyn AssetLoader> {
        Arc::new(MemoryAssetLoader::new([Species::Stalker.model_key(), Species::Phantom.model_key()]))
    }

    #[tokio::test]
    async fn test_spawn_and_kill_reaps_after_death_effect() {
        let horde = Horde::new(Arc::new(SimWorld::new(0.0))).with_seed(11);
        let id = horde.spawn(Species::Stalker, Vec3::ZERO, loader()).await.unwrap();
        horde.spawn(Species::Phantom, Vec3::new(5.0, 0.0, 0.0), loader()).await.unwrap();
        assert_eq!(horde.alive_count(), 2);

        let outcome = horde.damage(id, "torso", 500.0).unwrap();
        assert!(outcome.killed);
        assert_eq!(horde.alive_count(), 1);
        assert_eq!(horde.ledger().snapshot().kills, 1);

        let target = PlayerTarget::new(Vec3::new(40.0, 0.0, 0.0), 100.0);
        let mut reaped = 0;
        for _ in 0..150 {
            reaped += horde.update_all(1.0 / 60.0, &target, Some(&target)).reaped;
        }
        assert_eq!(reaped, 1);
        assert_eq!(horde.len(), 1);
        assert_eq!(horde.ledger().snapshot().deaths, 1);
        assert_eq!(horde.world().body_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_spawn_leaves_nothing_behind() {
        let world = Arc::new(SimWorld::new(0.0));
        world.set_failing(true);
        let horde = Horde::new(world.clone());
        assert!(horde.spawn(Species::Stalker, Vec3::ZERO, loader()).await.is_err());
        assert!(horde.is_empty());
        assert_eq!(world.body_count(), 0);
    }

    #[tokio::test]
    async fn test_despawn_all_clears_world() {
        let world = Arc::new(SimWorld::new(0.0));
        let horde = Horde::new(world.clone());
        for i in 0..3 {
            horde.spawn(Species::Stalker, Vec3::new(i as f32 * 3.0, 0.0, 0.0), loader()).await.unwrap();
        }
        assert_eq!(horde.despawn_all(), 3);
        assert_eq!(horde.alive_count(), 0);
        assert_eq!(world.body_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_dt_skips_the_tick() {
        let horde = Horde::new(Arc::new(SimWorld::new(0.0))).with_seed(5);
        horde.spawn(Species::Stalker, Vec3::ZERO, loader()).await.unwrap();
        let target = PlayerTarget::new(Vec3::new(10.0, 0.0, 0.0), 100.0);

        for dt in [f32::INFINITY, f32::NAN, -1.0 / 60.0, f32::MAX] {
            assert_eq!(horde.update_all(dt, &target, None), HordeTick::default());
        }
        assert_eq!(horde.now(), Duration::ZERO);

        let tick = horde.update_all(1.0 / 60.0, &target, None);
        assert_eq!(tick.updated, 1);
        assert!(horde.now() > Duration::ZERO);
    }

    #[test]
    fn test_ledger_counts_critical_kills() {
        let ledger = KillLedger::new();
        let id = uuid::Uuid::new_v4();
        ledger.on_kill(id, true);
        ledger.on_kill(id, false);
        ledger.on_death(id);
        assert_eq!(ledger.snapshot(), KillSnapshot { kills: 2, critical_kills: 1, deaths: 1 });
    }
}
