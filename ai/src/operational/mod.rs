// survival_ai_core/ai/src/operational/mod.rs
pub mod monitoring;
