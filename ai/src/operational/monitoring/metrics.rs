// survival_ai_core/ai/src/operational/monitoring/metrics.rs
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Instant;
use anyhow::{Context, Result};

/// Thin facade over the `metrics` macros. Without an installed recorder
/// every call is a no-op, so hosts opt in by installing their own exporter.
pub struct AiMetrics {
    start_time: Instant,
}

impl AiMetrics {
    pub fn new() -> Self {
        describe_counter!("ai_paths_planned_total", "Local planner runs that produced a path");
        describe_counter!("ai_path_failures_total", "Local planner runs that failed");
        describe_counter!("ai_stuck_events_total", "Stuck escalations, labelled soft or hard");
        describe_counter!("ai_kills_total", "Enemies killed, labelled by critical hit");
        describe_gauge!("ai_enemies_alive", "Enemies currently active or dying");
        describe_histogram!("ai_tick_time_seconds", "Wall time spent updating the whole horde");

        AiMetrics { start_time: Instant::now() }
    }

    pub fn record_tick_time(&self, duration: f64) {
        histogram!("ai_tick_time_seconds").record(duration);
    }

    pub fn record_plan(&self, success: bool) {
        if success {
            counter!("ai_paths_planned_total").increment(1);
        } else {
            counter!("ai_path_failures_total").increment(1);
        }
    }

    pub fn record_stuck(&self, hard: bool) {
        let kind = if hard { "hard" } else { "soft" };
        counter!("ai_stuck_events_total", "kind" => kind).increment(1);
    }

    pub fn record_kill(&self, critical: bool) {
        counter!("ai_kills_total", "critical" => critical.to_string()).increment(1);
    }

    pub fn update_enemies_alive(&self, count: usize) {
        gauge!("ai_enemies_alive").set(count as f64);
    }

    pub fn uptime_secs(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }
}

impl Default for AiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

// Logging setup
pub fn init_logging() -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "survival_ai_core=debug,warn".into()))
        .with(fmt::layer())
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(())
}
