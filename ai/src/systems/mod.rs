// survival_ai_core/ai/src/systems/mod.rs
pub mod ai;
pub mod horde;

pub use horde::{Horde, HordeTick, KillLedger, KillSnapshot};
