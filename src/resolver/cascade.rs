use std::collections::BTreeMap;

use crate::error::{GridError, Result};
use crate::geometry::{Rect, Size};
use crate::registry::{GridRegistry, WidgetId};

use super::edge::TRIPLE;
use super::overlap::SweepState;
use super::priority::PriorityTable;

pub const DEFAULT_MAX_PASSES: usize = 64;

/// Downward displacements that clear every conflict caused by a placement.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cascade {
    shifts: BTreeMap<WidgetId, u32>,
    passes: usize,
}

impl Cascade {
    pub fn shifts(&self) -> &BTreeMap<WidgetId, u32> {
        &self.shifts
    }

    pub fn shift_of(&self, id: WidgetId) -> u32 {
        self.shifts.get(&id).copied().unwrap_or(0)
    }

    /// Number of resolving passes that ran before the fixed point.
    pub fn passes(&self) -> usize {
        self.passes
    }

    pub fn is_empty(&self) -> bool {
        self.shifts.is_empty()
    }
}

/// Why a placement cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Infeasible {
    /// The candidate itself does not fit inside the grid.
    CandidateOutOfBounds { rect: Rect, size: Size },
    /// Clearing a conflict would push `widget` past the bottom of the grid.
    OutOfBounds {
        widget: WidgetId,
        bottom: u32,
        passes: usize,
    },
    /// The pass limit ran out before a fixed point was reached.
    IterationCap { passes: usize },
}

impl Infeasible {
    pub fn passes(&self) -> usize {
        match self {
            Infeasible::CandidateOutOfBounds { .. } => 0,
            Infeasible::OutOfBounds { passes, .. } | Infeasible::IterationCap { passes } => *passes,
        }
    }

    pub fn is_iteration_cap(&self) -> bool {
        matches!(self, Infeasible::IterationCap { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Infeasible::CandidateOutOfBounds { .. } => "candidate_out_of_bounds",
            Infeasible::OutOfBounds { .. } => "out_of_bounds",
            Infeasible::IterationCap { .. } => "iteration_cap",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(Cascade),
    Infeasible(Infeasible),
}

impl Resolution {
    pub fn passes(&self) -> usize {
        match self {
            Resolution::Resolved(cascade) => cascade.passes(),
            Resolution::Infeasible(reason) => reason.passes(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }
}

/// Fixed-point overlap resolver. Widgets are only ever pushed down.
///
/// Every resolving pass moves at least one resident widget down by at least
/// one row, so the free rows below the residents bound how many passes a
/// legal cascade can take. By default the pass limit is the larger of
/// `max_passes` and that bound, and only a cycle can exhaust it.
/// [`CascadeResolver::fixed`] enforces `max_passes` exactly.
#[derive(Debug, Clone, Copy)]
pub struct CascadeResolver {
    max_passes: usize,
    fixed: bool,
}

impl Default for CascadeResolver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PASSES)
    }
}

impl CascadeResolver {
    pub fn new(max_passes: usize) -> Self {
        Self {
            max_passes: max_passes.max(1),
            fixed: false,
        }
    }

    /// A resolver that gives up after exactly `max_passes` passes.
    pub fn fixed(max_passes: usize) -> Self {
        Self {
            fixed: true,
            ..Self::new(max_passes)
        }
    }

    pub fn max_passes(&self) -> usize {
        self.max_passes
    }

    /// Passes allowed when resolving against `registry`.
    pub fn pass_limit(&self, registry: &GridRegistry) -> usize {
        if self.fixed {
            return self.max_passes;
        }
        let height = u64::from(registry.size().height);
        let headroom = registry
            .all()
            .map(|(_, widget)| height.saturating_sub(u64::from(widget.rect().bottom())))
            .fold(0u64, u64::saturating_add);
        let bound = usize::try_from(headroom.saturating_add(1)).unwrap_or(usize::MAX);
        self.max_passes.max(bound)
    }

    /// Work out how the rest of the grid must shift for `moving` to occupy
    /// `candidate`. The registry is only read.
    pub fn resolve(
        &self,
        registry: &GridRegistry,
        moving: WidgetId,
        candidate: Rect,
    ) -> Result<Resolution> {
        registry.widget(moving)?;
        if candidate.is_empty() {
            return Err(GridError::EmptyRect(candidate));
        }
        if candidate.overflows() {
            return Err(GridError::RectOverflow(candidate));
        }
        let size = registry.size();
        if !candidate.fits_within(size) {
            return Ok(Resolution::Infeasible(Infeasible::CandidateOutOfBounds {
                rect: candidate,
                size,
            }));
        }

        let priorities = PriorityTable::new(
            moving,
            registry
                .all()
                .filter(|(id, _)| *id != moving)
                .map(|(id, widget)| (id, widget.rect().y)),
        );
        let mut state = SweepState::from_boxes(registry.all().map(|(id, widget)| {
            if id == moving {
                (id, candidate)
            } else {
                (id, widget.rect())
            }
        }));
        // X spans never move, so one X sweep serves every pass.
        let x_overlaps = state.x_overlaps();
        let floor = i64::from(size.height);
        let limit = self.pass_limit(registry);

        let mut shifts: BTreeMap<WidgetId, u32> = BTreeMap::new();
        let mut passes = 0;

        loop {
            let conflicts = state.conflicts(&x_overlaps);
            if conflicts.is_empty() {
                return Ok(Resolution::Resolved(Cascade { shifts, passes }));
            }
            if passes == limit {
                return Ok(Resolution::Infeasible(Infeasible::IterationCap { passes }));
            }
            passes += 1;

            for pair in conflicts {
                let (keep, mover) = priorities.arbitrate(pair);
                let Some(keep_span) = state.y_span(keep) else {
                    continue;
                };
                let Some(move_span) = state.y_span_mut(mover) else {
                    continue;
                };
                // An earlier pair in this pass may already have cleared it.
                if !keep_span.overlaps(move_span) {
                    continue;
                }

                let cells = ((keep_span.close + 1) - (move_span.open - 1)) / TRIPLE;
                move_span.shift_cells(cells);
                let bottom = move_span.end_cell();

                let total = shifts.entry(mover).or_insert(0);
                *total = total.saturating_add(u32::try_from(cells).unwrap_or(u32::MAX));

                if bottom > floor {
                    return Ok(Resolution::Infeasible(Infeasible::OutOfBounds {
                        widget: mover,
                        bottom: u32::try_from(bottom).unwrap_or(u32::MAX),
                        passes,
                    }));
                }
            }
        }
    }
}
