// survival_ai_core/ai/src/concurrent/event_queue.rs
use crate::core::types::{AiEvent, EventPriority};
use crossbeam_queue::SegQueue;
use std::sync::Arc;

/// Lock-free outbox of AI events, drained high priority first. Clones
/// share the same queues so enemies and the host can hold their own handle.
#[derive(Clone)]
pub struct AiEventQueue {
    high_priority: Arc<SegQueue<AiEvent>>,
    normal_priority: Arc<SegQueue<AiEvent>>,
    low_priority: Arc<SegQueue<AiEvent>>,
}

impl AiEventQueue {
    pub fn new() -> Self {
        AiEventQueue {
            high_priority: Arc::new(SegQueue::new()),
            normal_priority: Arc::new(SegQueue::new()),
            low_priority: Arc::new(SegQueue::new()),
        }
    }

    /// Queues an event at its natural priority.
    pub fn publish(&self, event: AiEvent) {
        let priority = event.priority();
        self.push(event, priority);
    }

    pub fn push(&self, event: AiEvent, priority: EventPriority) {
        match priority {
            EventPriority::High => self.high_priority.push(event),
            EventPriority::Normal => self.normal_priority.push(event),
            EventPriority::Low => self.low_priority.push(event),
        }
    }

    pub fn pop(&self) -> Option<AiEvent> {
        self.high_priority
            .pop()
            .or_else(|| self.normal_priority.pop())
            .or_else(|| self.low_priority.pop())
    }

    pub fn pop_batch(&self, max_count: usize) -> Vec<AiEvent> {
        let mut batch = Vec::with_capacity(max_count.min(self.len()));
        for queue in [&self.high_priority, &self.normal_priority, &self.low_priority] {
            while batch.len() < max_count {
                match queue.pop() {
                    Some(event) => batch.push(event),
                    None => break,
                }
            }
        }
        batch
    }

    pub fn drain(&self) -> Vec<AiEvent> {
        self.pop_batch(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.high_priority.is_empty() && self.normal_priority.is_empty() && self.low_priority.is_empty()
    }

    pub fn len(&self) -> usize {
        self.high_priority.len() + self.normal_priority.len() + self.low_priority.len()
    }
}

impl Default for AiEventQueue {
    fn default() -> Self {
        Self::new()
    }
}
