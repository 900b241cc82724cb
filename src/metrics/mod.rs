use crate::logging::{LogEvent, LogFields, LogLevel};
use serde_json::json;
use std::time::Duration;

/// Counters describing how placement trials are being answered.
#[derive(Debug, Default, Clone)]
pub struct PlacementMetrics {
    trials: u64,
    accepted: u64,
    rejected: u64,
    cache_hits: u64,
    resolver_runs: u64,
    iteration_cap_hits: u64,
    commits: u64,
    cancels: u64,
    max_passes_seen: usize,
}

impl PlacementMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_trial(&mut self, accepted: bool, cached: bool, passes: usize) {
        self.trials = self.trials.saturating_add(1);
        if accepted {
            self.accepted = self.accepted.saturating_add(1);
        } else {
            self.rejected = self.rejected.saturating_add(1);
        }
        if cached {
            self.cache_hits = self.cache_hits.saturating_add(1);
        } else {
            self.resolver_runs = self.resolver_runs.saturating_add(1);
        }
        self.max_passes_seen = self.max_passes_seen.max(passes);
    }

    pub fn record_iteration_cap(&mut self) {
        self.iteration_cap_hits = self.iteration_cap_hits.saturating_add(1);
    }

    pub fn record_commit(&mut self) {
        self.commits = self.commits.saturating_add(1);
    }

    pub fn record_cancel(&mut self) {
        self.cancels = self.cancels.saturating_add(1);
    }

    pub fn snapshot(&self, uptime: Duration) -> MetricSnapshot {
        MetricSnapshot {
            uptime_ms: uptime.as_millis() as u64,
            trials: self.trials,
            accepted: self.accepted,
            rejected: self.rejected,
            cache_hits: self.cache_hits,
            resolver_runs: self.resolver_runs,
            iteration_cap_hits: self.iteration_cap_hits,
            commits: self.commits,
            cancels: self.cancels,
            max_passes_seen: self.max_passes_seen as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub uptime_ms: u64,
    pub trials: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub cache_hits: u64,
    pub resolver_runs: u64,
    pub iteration_cap_hits: u64,
    pub commits: u64,
    pub cancels: u64,
    pub max_passes_seen: u64,
}

impl MetricSnapshot {
    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "placement_metrics", self.as_fields())
    }

    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("uptime_ms".to_string(), json!(self.uptime_ms));
        map.insert("trials".to_string(), json!(self.trials));
        map.insert("accepted".to_string(), json!(self.accepted));
        map.insert("rejected".to_string(), json!(self.rejected));
        map.insert("cache_hits".to_string(), json!(self.cache_hits));
        map.insert("resolver_runs".to_string(), json!(self.resolver_runs));
        map.insert(
            "iteration_cap_hits".to_string(),
            json!(self.iteration_cap_hits),
        );
        map.insert("commits".to_string(), json!(self.commits));
        map.insert("cancels".to_string(), json!(self.cancels));
        map.insert("max_passes_seen".to_string(), json!(self.max_passes_seen));
        map
    }
}
