// survival_ai_core/ai/src/operational/monitoring/mod.rs
pub mod metrics;

pub use metrics::{init_logging, AiMetrics};
