//! Audit hooks for grid lifecycle transitions.
//!
//! Hosts that mirror the layout elsewhere (a renderer, an undo stack, a
//! persistence layer) implement [`GridAudit`] and receive one record per
//! state change, carrying a stage plus structured details.

use std::time::SystemTime;

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridAuditStage {
    WidgetRegistered,
    WidgetUnregistered,
    CapacityResized,
    PlacementAccepted,
    PlacementRejected,
    PlacementCommitted,
    PlacementCancelled,
    GestureStarted,
    GestureEnded,
}

#[derive(Debug, Clone)]
pub struct GridAuditEvent {
    pub timestamp: SystemTime,
    pub stage: GridAuditStage,
    pub details: Vec<(String, Value)>,
}

impl GridAuditEvent {
    fn new(stage: GridAuditStage) -> Self {
        Self {
            timestamp: SystemTime::now(),
            stage,
            details: Vec::new(),
        }
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

pub struct GridAuditEventBuilder {
    event: GridAuditEvent,
}

impl GridAuditEventBuilder {
    pub fn new(stage: GridAuditStage) -> Self {
        Self {
            event: GridAuditEvent::new(stage),
        }
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.event.details.push((key.into(), value.into()));
        self
    }

    pub fn finish(self) -> GridAuditEvent {
        self.event
    }
}

pub trait GridAudit: Send + Sync {
    fn record(&self, event: GridAuditEvent);
}

#[derive(Debug, Default)]
pub struct NullGridAudit;

impl GridAudit for NullGridAudit {
    fn record(&self, _event: GridAuditEvent) {}
}
