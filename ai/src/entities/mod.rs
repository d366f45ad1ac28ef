// survival_ai_core/ai/src/entities/mod.rs
pub mod assets;
pub mod enemy;

pub use assets::{AssetLoader, MemoryAssetLoader, ModelHandle};
pub use enemy::{Enemy, EnemyObserver, TickContext, TickReport};
