use crate::error::{GridError, Result};
use crate::geometry::Rect;
use crate::registry::{GridRegistry, WidgetId};
use crate::resolver::{CascadeResolver, Infeasible, Resolution};

use super::cache::{NegativeCache, PlacementKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementOutcome {
    Accepted,
    Rejected,
}

impl PlacementOutcome {
    pub fn is_accepted(self) -> bool {
        matches!(self, PlacementOutcome::Accepted)
    }
}

/// The accepted trial currently shown as pending shifts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPlacement {
    id: WidgetId,
    rect: Rect,
    affected: Vec<WidgetId>,
}

impl PendingPlacement {
    pub fn id(&self) -> WidgetId {
        self.id
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Widgets carrying a non-zero pending shift, in ascending id order.
    pub fn affected(&self) -> &[WidgetId] {
        &self.affected
    }
}

/// What one call to [`PlacementTransaction::try_place`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialReport {
    pub outcome: PlacementOutcome,
    /// Answered from the negative cache without resolving.
    pub cached: bool,
    pub passes: usize,
    pub reason: Option<Infeasible>,
    pub affected: usize,
}

impl TrialReport {
    fn cache_hit() -> Self {
        Self {
            outcome: PlacementOutcome::Rejected,
            cached: true,
            passes: 0,
            reason: None,
            affected: 0,
        }
    }
}

/// Speculative placement on top of a [`GridRegistry`].
///
/// An accepted trial writes pending shifts onto the displaced widgets and
/// replaces any earlier trial. A rejected trial leaves the earlier one in
/// place, so the last accepted state stays visible.
#[derive(Debug, Clone, Default)]
pub struct PlacementTransaction {
    resolver: CascadeResolver,
    pending: Option<PendingPlacement>,
    cache: NegativeCache,
    resolver_runs: u64,
}

impl PlacementTransaction {
    pub fn new(resolver: CascadeResolver) -> Self {
        Self {
            resolver,
            ..Self::default()
        }
    }

    pub fn resolver(&self) -> &CascadeResolver {
        &self.resolver
    }

    pub fn pending(&self) -> Option<&PendingPlacement> {
        self.pending.as_ref()
    }

    pub fn resolver_runs(&self) -> u64 {
        self.resolver_runs
    }

    pub fn cache(&self) -> &NegativeCache {
        &self.cache
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn try_place(
        &mut self,
        registry: &mut GridRegistry,
        id: WidgetId,
        rect: Rect,
    ) -> Result<TrialReport> {
        registry.widget(id)?;
        if rect.is_empty() {
            return Err(GridError::EmptyRect(rect));
        }
        if rect.overflows() {
            return Err(GridError::RectOverflow(rect));
        }

        let key = PlacementKey::new(id, rect);
        if self.cache.check(&key) {
            return Ok(TrialReport::cache_hit());
        }

        self.resolver_runs = self.resolver_runs.saturating_add(1);
        match self.resolver.resolve(registry, id, rect)? {
            Resolution::Resolved(cascade) => {
                self.cancel(registry);
                let mut affected = Vec::with_capacity(cascade.shifts().len());
                for (widget, shift) in cascade.shifts() {
                    registry.set_pending_shift(*widget, *shift)?;
                    affected.push(*widget);
                }
                let report = TrialReport {
                    outcome: PlacementOutcome::Accepted,
                    cached: false,
                    passes: cascade.passes(),
                    reason: None,
                    affected: affected.len(),
                };
                self.pending = Some(PendingPlacement { id, rect, affected });
                Ok(report)
            }
            Resolution::Infeasible(reason) => {
                self.cache.insert(key);
                Ok(TrialReport {
                    outcome: PlacementOutcome::Rejected,
                    cached: false,
                    passes: reason.passes(),
                    reason: Some(reason),
                    affected: 0,
                })
            }
        }
    }

    /// Make the accepted trial for `(id, rect)` permanent.
    pub fn commit(&mut self, registry: &mut GridRegistry, id: WidgetId, rect: Rect) -> Result<Rect> {
        registry.widget(id)?;
        let matches = self
            .pending
            .as_ref()
            .map(|pending| pending.id == id && pending.rect == rect)
            .unwrap_or(false);
        if !matches {
            return Err(GridError::NotAccepted { id, rect });
        }

        if let Some(pending) = self.pending.as_ref() {
            registry.widget(pending.id)?;
            for widget in &pending.affected {
                registry.widget(*widget)?;
            }
        }

        if let Some(pending) = self.pending.take() {
            registry.set_rect(pending.id, pending.rect)?;
            for widget in pending.affected {
                registry.settle_shift(widget)?;
            }
        }
        self.cache.clear();
        Ok(rect)
    }

    /// Drop the pending trial without touching resting coordinates.
    /// Returns how many widgets had their shift cleared.
    pub fn cancel(&mut self, registry: &mut GridRegistry) -> usize {
        let Some(pending) = self.pending.take() else {
            return 0;
        };
        let mut cleared = 0;
        for widget in pending.affected {
            if registry.set_pending_shift(widget, 0).is_ok() {
                cleared += 1;
            }
        }
        cleared
    }

    /// Cancel and forget cached rejections; the resting layout changed
    /// underneath us.
    pub fn invalidate(&mut self, registry: &mut GridRegistry) -> usize {
        self.cache.clear();
        self.cancel(registry)
    }
}
