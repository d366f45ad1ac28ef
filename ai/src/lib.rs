// survival_ai_core/ai/src/lib.rs

pub mod core;
pub mod concurrent;
pub mod entities;
pub mod world;
pub mod operational;
pub mod systems;

pub use crate::core::config::{EnemyConfig, Species, SpeciesConfig};
pub use crate::core::error::{AiError, AiResult};
pub use crate::core::types::{AiEvent, BehaviorState, EnemyId, LifecycleState};
pub use crate::entities::{AssetLoader, Enemy, EnemyObserver, MemoryAssetLoader, TickContext};
pub use crate::systems::{Horde, KillLedger};
pub use crate::world::{PhysicsWorld, PlayerTarget, SimWorld};
