use std::sync::{Arc, Mutex};

use crate::engine::audit::{GridAudit, NullGridAudit};
use crate::logging::Logger;
use crate::metrics::PlacementMetrics;
use crate::resolver::DEFAULT_MAX_PASSES;

/// Configuration knobs for a [`GridEngine`](crate::GridEngine).
#[derive(Clone)]
pub struct EngineConfig {
    /// Minimum resolving passes allowed before a placement is declared
    /// infeasible; the resolver raises it to cover the grid's free rows.
    pub max_passes: usize,
    /// Enforce `max_passes` exactly instead of scaling it with the grid.
    pub fixed_pass_cap: bool,
    /// Cascades needing more passes than this are logged as suspicious.
    pub suspicious_passes: usize,
    /// Optional structured logger used by the engine.
    pub logger: Option<Logger>,
    /// Metrics accumulator shared with the host.
    pub metrics: Option<Arc<Mutex<PlacementMetrics>>>,
    /// Target field used when emitting metrics snapshots.
    pub metrics_target: String,
    /// Receiver for lifecycle audit records.
    pub audit: Arc<dyn GridAudit>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_passes: DEFAULT_MAX_PASSES,
            fixed_pass_cap: false,
            suspicious_passes: 10,
            logger: None,
            metrics: None,
            metrics_target: "widget_grid::metrics".to_string(),
            audit: Arc::new(NullGridAudit),
        }
    }
}

impl EngineConfig {
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    pub fn with_fixed_pass_cap(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self.fixed_pass_cap = true;
        self
    }

    pub fn with_audit<A>(mut self, audit: A) -> Self
    where
        A: GridAudit + 'static,
    {
        self.audit = Arc::new(audit);
        self
    }

    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(PlacementMetrics::new())));
        }
    }

    pub fn disable_metrics(&mut self) {
        self.metrics = None;
    }

    pub fn metrics_handle(&self) -> Option<Arc<Mutex<PlacementMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }
}
