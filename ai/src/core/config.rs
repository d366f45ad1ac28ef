// survival_ai_core/ai/src/core/config.rs
// Per-enemy tunables and species presets. Records may be partial: every
// missing field falls back to the default below.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use super::constants::*;
use super::error::{AiError, AiResult};
use super::types::MovementMode;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HitRegion {
    pub name: String,
    pub damage_multiplier: f32,
    #[serde(default)]
    pub critical: bool,
}

impl HitRegion {
    pub fn new(name: &str, damage_multiplier: f32, critical: bool) -> Self {
        HitRegion { name: name.to_string(), damage_multiplier, critical }
    }
}

fn default_hit_regions() -> Vec<HitRegion> {
    vec![
        HitRegion::new("head", 2.0, true),
        HitRegion::new("torso", 1.0, false),
        HitRegion::new("limb", 0.6, false),
    ]
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EnemyConfig {
    pub max_health: f32,
    pub move_speed: f32,
    pub movement_mode: MovementMode,
    pub collider_radius: f32,
    pub mass: f32,

    // Ranges
    pub detection_range: f32,
    pub melee_range: f32,
    pub attack_range: f32,
    pub max_circle_distance: f32,

    // Attack
    pub attack_damage: f32,
    pub attack_cooldown_ms: u64,

    // Circling
    pub circle_chance_per_tick: f64,
    pub circle_duration_min_ms: u64,
    pub circle_duration_max_ms: u64,

    // Navigation
    pub path_memory_limit: usize,
    pub grid_size: f32,
    pub max_path_nodes: usize,
    pub max_neighbors: usize,
    pub path_update_interval_ms: u64,
    pub ray_fan_count: usize,
    pub ray_fan_spread_rad: f32,
    pub max_climb_ratio: f32,

    // Stuck recovery
    pub stuck_threshold_secs: f32,
    pub hard_stuck_secs: f32,
    pub avoid_duration_ms: u64,
    pub wall_recovery_ms: u64,

    // Steering
    pub turn_rate_rad: f32,
    pub separation_radius: f32,
    pub separation_weight: f32,
    pub far_boost_distance: f32,
    pub far_boost_factor: f32,
    pub wall_recovery_speed_floor: f32,

    // Lifecycle
    pub death_effect_ms: u64,
    pub hit_regions: Vec<HitRegion>,

    /// Seed for the enemy's random source. `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        EnemyConfig {
            max_health: 100.0,
            move_speed: 4.0,
            movement_mode: MovementMode::Dynamic,
            collider_radius: 0.5,
            mass: 70.0,
            detection_range: 60.0,
            melee_range: 2.0,
            attack_range: 2.5,
            max_circle_distance: 8.0,
            attack_damage: 10.0,
            attack_cooldown_ms: 1200,
            circle_chance_per_tick: 0.004,
            circle_duration_min_ms: 1500,
            circle_duration_max_ms: 2500,
            path_memory_limit: DEFAULT_PATH_MEMORY_LIMIT,
            grid_size: DEFAULT_GRID_SIZE,
            max_path_nodes: DEFAULT_MAX_PATH_NODES,
            max_neighbors: DEFAULT_MAX_NEIGHBORS,
            path_update_interval_ms: DEFAULT_PATH_UPDATE_INTERVAL_MS,
            ray_fan_count: DEFAULT_RAY_FAN_COUNT,
            ray_fan_spread_rad: DEFAULT_RAY_FAN_SPREAD_RAD,
            max_climb_ratio: DEFAULT_MAX_CLIMB_RATIO,
            stuck_threshold_secs: DEFAULT_STUCK_THRESHOLD_SECS,
            hard_stuck_secs: HARD_STUCK_SECS,
            avoid_duration_ms: 500,
            wall_recovery_ms: DEFAULT_WALL_RECOVERY_MS,
            turn_rate_rad: DEFAULT_TURN_RATE_RAD,
            separation_radius: 2.0,
            separation_weight: 0.5,
            far_boost_distance: 20.0,
            far_boost_factor: 1.3,
            wall_recovery_speed_floor: 0.2,
            death_effect_ms: 2000,
            hit_regions: default_hit_regions(),
            seed: None,
        }
    }
}

impl EnemyConfig {
    pub fn from_yaml_str(raw: &str) -> AiResult<Self> {
        let config: EnemyConfig = serde_yaml::from_str(raw)
            .map_err(|e| AiError::Config(format!("invalid YAML enemy config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(raw: &str) -> AiResult<Self> {
        let config: EnemyConfig = serde_json::from_str(raw)
            .map_err(|e| AiError::Config(format!("invalid JSON enemy config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a config file, picking the format from the extension (`.json`
    /// is JSON, anything else is YAML).
    pub fn load(path: &Path) -> AiResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&raw),
            _ => Self::from_yaml_str(&raw),
        }
    }

    pub fn validate(&self) -> AiResult<()> {
        let positive = [
            ("max_health", self.max_health),
            ("move_speed", self.move_speed),
            ("collider_radius", self.collider_radius),
            ("mass", self.mass),
            ("detection_range", self.detection_range),
            ("melee_range", self.melee_range),
            ("attack_range", self.attack_range),
            ("grid_size", self.grid_size),
            ("stuck_threshold_secs", self.stuck_threshold_secs),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(AiError::Config(format!("{} must be positive, got {}", name, value)));
            }
        }
        if self.melee_range > self.max_circle_distance {
            return Err(AiError::Config(format!(
                "melee_range ({}) exceeds max_circle_distance ({})",
                self.melee_range, self.max_circle_distance
            )));
        }
        if self.hard_stuck_secs <= self.stuck_threshold_secs {
            return Err(AiError::Config("hard_stuck_secs must exceed stuck_threshold_secs".to_string()));
        }
        if self.circle_duration_min_ms > self.circle_duration_max_ms {
            return Err(AiError::Config("circle_duration_min_ms exceeds circle_duration_max_ms".to_string()));
        }
        if !(0.0..=1.0).contains(&self.circle_chance_per_tick) {
            return Err(AiError::Config("circle_chance_per_tick must lie in [0, 1]".to_string()));
        }
        if self.max_path_nodes == 0 || self.max_neighbors == 0 {
            return Err(AiError::Config("max_path_nodes and max_neighbors must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn attack_cooldown(&self) -> Duration {
        Duration::from_millis(self.attack_cooldown_ms)
    }

    pub fn path_update_interval(&self) -> Duration {
        Duration::from_millis(self.path_update_interval_ms)
    }

    pub fn avoid_duration(&self) -> Duration {
        Duration::from_millis(self.avoid_duration_ms)
    }

    pub fn wall_recovery(&self) -> Duration {
        Duration::from_millis(self.wall_recovery_ms)
    }

    pub fn death_effect(&self) -> Duration {
        Duration::from_millis(self.death_effect_ms)
    }

    pub fn hit_region(&self, name: &str) -> Option<&HitRegion> {
        self.hit_regions.iter().find(|region| region.name == name)
    }
}

/// Enemy species. Per-species differences are configuration only; all
/// species share the same behaviour and lifecycle code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    /// Heavy dynamic body pushed around by impulses.
    Stalker,
    /// Light kinematic body placed directly every tick.
    Phantom,
}

impl Species {
    pub fn model_key(&self) -> &'static str {
        match self {
            Species::Stalker => "models/stalker.glb",
            Species::Phantom => "models/phantom.glb",
        }
    }

    pub fn default_config(&self) -> EnemyConfig {
        match self {
            Species::Stalker => EnemyConfig::default(),
            Species::Phantom => EnemyConfig {
                max_health: 60.0,
                move_speed: 5.5,
                movement_mode: MovementMode::Kinematic,
                collider_radius: 0.4,
                mass: 40.0,
                melee_range: 1.8,
                attack_range: 2.2,
                attack_damage: 6.0,
                attack_cooldown_ms: 800,
                circle_chance_per_tick: 0.006,
                ..EnemyConfig::default()
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeciesConfig {
    pub species: Species,
    #[serde(default)]
    pub overrides: Option<EnemyConfig>,
}

impl SpeciesConfig {
    pub fn resolve(&self) -> EnemyConfig {
        self.overrides.clone().unwrap_or_else(|| self.species.default_config())
    }
}
