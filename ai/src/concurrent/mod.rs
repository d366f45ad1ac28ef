// survival_ai_core/ai/src/concurrent/mod.rs
pub mod event_queue;

pub use event_queue::AiEventQueue;
