//! Single entry point a host drives: registry, placement transaction,
//! gesture session and the ambient logging / metrics / audit hooks.

use std::time::Instant;

use serde_json::{Value, json};

use crate::error::{GridError, Result};
use crate::geometry::{Rect, Size};
use crate::logging::{LogLevel, event_with_fields, json_kv};
use crate::metrics::{MetricSnapshot, PlacementMetrics};
use crate::placement::{
    Gesture, GestureKind, GestureStep, PendingPlacement, PlacementOutcome, PlacementTransaction,
    TrialReport,
};
use crate::registry::{GridRegistry, LayoutSnapshot, Widget, WidgetId};
use crate::resolver::CascadeResolver;

pub mod audit;
mod config;

use audit::{GridAuditEventBuilder, GridAuditStage};
pub use config::EngineConfig;

const LOG_TARGET: &str = "widget_grid::engine";
const PLACEMENT_TARGET: &str = "widget_grid::placement";

pub struct GridEngine {
    registry: GridRegistry,
    transaction: PlacementTransaction,
    gesture: Option<Gesture>,
    config: EngineConfig,
    started: Instant,
}

impl GridEngine {
    pub fn new(size: Size) -> Self {
        Self::with_config(size, EngineConfig::default())
    }

    pub fn with_config(size: Size, config: EngineConfig) -> Self {
        Self::from_registry(GridRegistry::new(size), config)
    }

    /// Resume from a persisted layout; the records must describe a valid
    /// resting layout.
    pub fn from_snapshot(snapshot: &LayoutSnapshot, config: EngineConfig) -> Result<Self> {
        let registry = GridRegistry::from_snapshot(snapshot)?;
        let engine = Self::from_registry(registry, config);
        engine.log(
            LogLevel::Info,
            "layout_restored",
            [
                json_kv("widgets", engine.registry.len()),
                json_kv("width", snapshot.width),
                json_kv("height", snapshot.height),
            ],
        );
        Ok(engine)
    }

    fn from_registry(registry: GridRegistry, config: EngineConfig) -> Self {
        let resolver = if config.fixed_pass_cap {
            CascadeResolver::fixed(config.max_passes)
        } else {
            CascadeResolver::new(config.max_passes)
        };
        let transaction = PlacementTransaction::new(resolver);
        Self {
            registry,
            transaction,
            gesture: None,
            config,
            started: Instant::now(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &GridRegistry {
        &self.registry
    }

    pub fn size(&self) -> Size {
        self.registry.size()
    }

    pub fn widget(&self, id: WidgetId) -> Result<&Widget> {
        self.registry.widget(id)
    }

    pub fn widgets(&self) -> impl Iterator<Item = (WidgetId, &Widget)> + '_ {
        self.registry.all()
    }

    pub fn pending(&self) -> Option<&PendingPlacement> {
        self.transaction.pending()
    }

    pub fn gesture(&self) -> Option<&Gesture> {
        self.gesture.as_ref()
    }

    pub fn resolver_runs(&self) -> u64 {
        self.transaction.resolver_runs()
    }

    pub fn register(&mut self, rect: Rect) -> Result<WidgetId> {
        let before = self.registry.size();
        let id = self.registry.register(rect)?;
        self.invalidate();

        let size = self.registry.size();
        self.log(
            LogLevel::Debug,
            "widget_registered",
            [json_kv("widget", id.get()), rect_field(rect)],
        );
        if size != before {
            self.log(
                LogLevel::Info,
                "capacity_grown",
                [json_kv("width", size.width), json_kv("height", size.height)],
            );
        }
        self.audit(
            GridAuditEventBuilder::new(GridAuditStage::WidgetRegistered)
                .detail("widget", id.get())
                .detail("rect", rect_value(rect)),
        );
        Ok(id)
    }

    /// Remove a widget; unknown ids are ignored. Any pending trial is
    /// dropped first, and a gesture on the widget ends without committing.
    pub fn unregister(&mut self, id: WidgetId) -> Option<Widget> {
        if !self.registry.contains(id) {
            return None;
        }
        self.invalidate();
        if self.gesture.as_ref().map(Gesture::id) == Some(id) {
            self.gesture = None;
            self.log(
                LogLevel::Info,
                "gesture_ended",
                [json_kv("widget", id.get()), json_kv("reason", "widget_removed")],
            );
        }

        let removed = self.registry.unregister(id);
        self.log(LogLevel::Debug, "widget_unregistered", [json_kv("widget", id.get())]);
        self.audit(
            GridAuditEventBuilder::new(GridAuditStage::WidgetUnregistered).detail("widget", id.get()),
        );
        removed
    }

    pub fn resize_capacity(&mut self, size: Size) -> Result<()> {
        if let Err(err) = self.registry.resize_capacity(size) {
            self.log(
                LogLevel::Warn,
                "capacity_rejected",
                [
                    json_kv("width", size.width),
                    json_kv("height", size.height),
                    json_kv("error", err.to_string()),
                ],
            );
            return Err(err);
        }
        self.invalidate();
        self.log(
            LogLevel::Info,
            "capacity_resized",
            [json_kv("width", size.width), json_kv("height", size.height)],
        );
        self.audit(
            GridAuditEventBuilder::new(GridAuditStage::CapacityResized)
                .detail("width", size.width)
                .detail("height", size.height),
        );
        Ok(())
    }

    pub fn try_place(&mut self, id: WidgetId, rect: Rect) -> Result<PlacementOutcome> {
        Ok(self.trial(id, rect)?.outcome)
    }

    /// [`try_place`](Self::try_place) with the full report.
    pub fn trial(&mut self, id: WidgetId, rect: Rect) -> Result<TrialReport> {
        let report = self.transaction.try_place(&mut self.registry, id, rect)?;
        // An accepted trial replaces the pending one, so the gesture follows it.
        if report.outcome.is_accepted() {
            if let Some(gesture) = self.gesture.as_mut() {
                if gesture.id() == id {
                    gesture.accept(rect);
                } else {
                    gesture.reset();
                }
            }
        }
        let capped = report
            .reason
            .map(|reason| reason.is_iteration_cap())
            .unwrap_or(false);
        self.with_metrics(|metrics| {
            metrics.record_trial(report.outcome.is_accepted(), report.cached, report.passes);
            if capped {
                metrics.record_iteration_cap();
            }
        });

        if report.passes > self.config.suspicious_passes {
            self.log_placement(
                LogLevel::Warn,
                "cascade_suspicious",
                [
                    json_kv("widget", id.get()),
                    rect_field(rect),
                    json_kv("passes", report.passes),
                ],
            );
        }
        if capped {
            self.log_placement(
                LogLevel::Warn,
                "cascade_iteration_cap",
                [
                    json_kv("widget", id.get()),
                    rect_field(rect),
                    json_kv("pass_limit", self.transaction.resolver().pass_limit(&self.registry)),
                ],
            );
        }

        match report.outcome {
            PlacementOutcome::Accepted => {
                self.log_placement(
                    LogLevel::Debug,
                    "placement_accepted",
                    [
                        json_kv("widget", id.get()),
                        rect_field(rect),
                        json_kv("affected", report.affected),
                        json_kv("passes", report.passes),
                    ],
                );
                self.audit(
                    GridAuditEventBuilder::new(GridAuditStage::PlacementAccepted)
                        .detail("widget", id.get())
                        .detail("rect", rect_value(rect))
                        .detail("affected", report.affected),
                );
            }
            PlacementOutcome::Rejected => {
                let reason = report
                    .reason
                    .map(|reason| reason.label())
                    .unwrap_or("cached");
                self.log_placement(
                    LogLevel::Debug,
                    "placement_rejected",
                    [
                        json_kv("widget", id.get()),
                        rect_field(rect),
                        json_kv("reason", reason),
                        json_kv("cached", report.cached),
                    ],
                );
                self.audit(
                    GridAuditEventBuilder::new(GridAuditStage::PlacementRejected)
                        .detail("widget", id.get())
                        .detail("rect", rect_value(rect))
                        .detail("reason", reason),
                );
            }
        }
        Ok(report)
    }

    pub fn commit(&mut self, id: WidgetId, rect: Rect) -> Result<Rect> {
        let affected = self
            .transaction
            .pending()
            .map(|pending| pending.affected().len())
            .unwrap_or(0);
        let committed = self.transaction.commit(&mut self.registry, id, rect)?;

        if let Some(gesture) = self.gesture.as_mut() {
            let origin = self.registry.widget(gesture.id())?.rect();
            gesture.rebase(origin);
        }
        self.with_metrics(PlacementMetrics::record_commit);
        self.log_placement(
            LogLevel::Info,
            "placement_committed",
            [
                json_kv("widget", id.get()),
                rect_field(committed),
                json_kv("affected", affected),
            ],
        );
        self.audit(
            GridAuditEventBuilder::new(GridAuditStage::PlacementCommitted)
                .detail("widget", id.get())
                .detail("rect", rect_value(committed))
                .detail("affected", affected),
        );
        self.emit_metrics();
        Ok(committed)
    }

    /// Discard the pending trial. Calling it with nothing pending is a no-op.
    pub fn cancel(&mut self) -> usize {
        let Some(pending_id) = self.transaction.pending().map(PendingPlacement::id) else {
            return 0;
        };
        let cleared = self.transaction.cancel(&mut self.registry);
        if let Some(gesture) = self.gesture.as_mut() {
            gesture.reset();
        }
        self.with_metrics(PlacementMetrics::record_cancel);
        self.log_placement(
            LogLevel::Debug,
            "placement_cancelled",
            [json_kv("widget", pending_id.get()), json_kv("cleared", cleared)],
        );
        self.audit(
            GridAuditEventBuilder::new(GridAuditStage::PlacementCancelled)
                .detail("widget", pending_id.get())
                .detail("cleared", cleared),
        );
        cleared
    }

    pub fn begin_drag(&mut self, id: WidgetId) -> Result<()> {
        self.begin_gesture(id, GestureKind::Drag)
    }

    pub fn begin_resize(&mut self, id: WidgetId) -> Result<()> {
        self.begin_gesture(id, GestureKind::Resize)
    }

    /// Feed a candidate origin; it is clamped so the widget stays on the grid.
    pub fn drag_to(&mut self, x: u32, y: u32) -> Result<GestureStep> {
        let gesture = self.gesture.as_ref().ok_or(GridError::NoGesture)?;
        let candidate = gesture.drag_candidate(self.registry.size(), x, y);
        self.step_gesture(candidate)
    }

    /// Feed a candidate size; it is clamped to at least one cell and to the
    /// grid edge.
    pub fn resize_to(&mut self, width: u32, height: u32) -> Result<GestureStep> {
        let gesture = self.gesture.as_ref().ok_or(GridError::NoGesture)?;
        let candidate = gesture.resize_candidate(self.registry.size(), width, height);
        self.step_gesture(candidate)
    }

    /// Commit the last accepted placement of the gesture, if any, and
    /// return the widget's resting rect.
    pub fn end_gesture(&mut self) -> Result<Rect> {
        let gesture = self.gesture.take().ok_or(GridError::NoGesture)?;
        let id = gesture.id();
        let committed = gesture.accepted().is_some();
        if let Some(rect) = gesture.accepted() {
            if let Err(err) = self.commit(id, rect) {
                self.gesture = Some(gesture);
                return Err(err);
            }
        }

        let rest = self.registry.widget(id)?.rect();
        self.finish_gesture(&gesture, rest, if committed { "committed" } else { "unchanged" });
        Ok(rest)
    }

    /// Abandon the gesture; pending shifts are dropped and the widget keeps
    /// its original rect.
    pub fn abort_gesture(&mut self) -> Result<Rect> {
        let gesture = self.gesture.take().ok_or(GridError::NoGesture)?;
        self.cancel();
        let rest = self.registry.widget(gesture.id())?.rect();
        self.finish_gesture(&gesture, rest, "aborted");
        Ok(rest)
    }

    pub fn take_dirty(&mut self) -> Vec<(WidgetId, Widget)> {
        self.registry.take_dirty()
    }

    pub fn snapshot(&self) -> LayoutSnapshot {
        self.registry.snapshot()
    }

    pub fn metrics_snapshot(&self) -> Option<MetricSnapshot> {
        let metrics = self.config.metrics.as_ref()?;
        let guard = metrics.lock().ok()?;
        Some(guard.snapshot(self.started.elapsed()))
    }

    fn begin_gesture(&mut self, id: WidgetId, kind: GestureKind) -> Result<()> {
        if let Some(active) = self.gesture.as_ref() {
            return Err(GridError::GestureActive(active.id()));
        }
        let origin = self.registry.widget(id)?.rect();
        self.gesture = Some(Gesture::new(id, kind, origin));
        self.log(
            LogLevel::Debug,
            "gesture_started",
            [
                json_kv("widget", id.get()),
                json_kv("kind", kind.as_str()),
                rect_field(origin),
            ],
        );
        self.audit(
            GridAuditEventBuilder::new(GridAuditStage::GestureStarted)
                .detail("widget", id.get())
                .detail("kind", kind.as_str()),
        );
        Ok(())
    }

    fn step_gesture(&mut self, candidate: Rect) -> Result<GestureStep> {
        let (id, shown) = match self.gesture.as_ref() {
            Some(gesture) => (gesture.id(), gesture.shown()),
            None => return Err(GridError::NoGesture),
        };
        if candidate == shown {
            return Ok(GestureStep::Unchanged(candidate));
        }

        if self.trial(id, candidate)?.outcome.is_accepted() {
            Ok(GestureStep::Accepted(candidate))
        } else {
            Ok(GestureStep::Rejected(candidate))
        }
    }

    fn finish_gesture(&self, gesture: &Gesture, rest: Rect, outcome: &str) {
        self.log(
            LogLevel::Debug,
            "gesture_ended",
            [
                json_kv("widget", gesture.id().get()),
                json_kv("kind", gesture.kind().as_str()),
                json_kv("outcome", outcome),
                rect_field(rest),
            ],
        );
        self.audit(
            GridAuditEventBuilder::new(GridAuditStage::GestureEnded)
                .detail("widget", gesture.id().get())
                .detail("outcome", outcome)
                .detail("rect", rect_value(rest)),
        );
    }

    /// The resting layout changed: drop pending shifts and cached rejections.
    fn invalidate(&mut self) {
        let dropped = self.transaction.invalidate(&mut self.registry);
        if let Some(gesture) = self.gesture.as_mut() {
            gesture.reset();
        }
        if dropped > 0 {
            self.log_placement(
                LogLevel::Debug,
                "placement_invalidated",
                [json_kv("cleared", dropped)],
            );
        }
    }

    fn with_metrics<F>(&self, record: F)
    where
        F: FnOnce(&mut PlacementMetrics),
    {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                record(&mut *guard);
            }
        }
    }

    fn emit_metrics(&self) {
        if let (Some(logger), Some(snapshot)) =
            (self.config.logger.as_ref(), self.metrics_snapshot())
        {
            let _ = logger.log_event(snapshot.to_log_event(&self.config.metrics_target));
        }
    }

    fn log<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        self.log_to(LOG_TARGET, level, message, fields);
    }

    fn log_placement<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        self.log_to(PLACEMENT_TARGET, level, message, fields);
    }

    fn log_to<I>(&self, target: &str, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        if let Some(logger) = self.config.logger.as_ref() {
            if logger.enabled(level) {
                let event = event_with_fields(level, target, message, fields);
                let _ = logger.log_event(event);
            }
        }
    }

    fn audit(&self, builder: GridAuditEventBuilder) {
        self.config.audit.record(builder.finish());
    }
}

fn rect_value(rect: Rect) -> Value {
    json!([rect.x, rect.y, rect.width, rect.height])
}

fn rect_field(rect: Rect) -> (String, Value) {
    json_kv("rect", rect_value(rect))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::audit::{GridAudit, GridAuditEvent};
    use crate::logging::{Logger, MemorySink};
    use crate::resolver::detect;
    use proptest::prelude::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingAudit {
        events: Arc<Mutex<Vec<GridAuditEvent>>>,
    }

    impl RecordingAudit {
        fn stages(&self) -> Vec<GridAuditStage> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(|event| event.stage)
                .collect()
        }
    }

    impl GridAudit for RecordingAudit {
        fn record(&self, event: GridAuditEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    fn engine_with(rects: &[Rect], config: EngineConfig) -> (GridEngine, Vec<WidgetId>) {
        let mut engine = GridEngine::with_config(Size::new(10, 10), config);
        let ids = rects
            .iter()
            .map(|rect| engine.register(*rect).unwrap())
            .collect();
        (engine, ids)
    }

    fn engine(rects: &[Rect]) -> (GridEngine, Vec<WidgetId>) {
        engine_with(rects, EngineConfig::default())
    }

    fn logged() -> (EngineConfig, MemorySink) {
        let sink = MemorySink::new();
        let mut config = EngineConfig::default().with_logger(Logger::new(sink.clone()));
        config.enable_metrics();
        (config, sink)
    }

    fn resting(engine: &GridEngine) -> Vec<Rect> {
        engine.widgets().map(|(_, widget)| widget.rect()).collect()
    }

    fn assert_valid_layout(engine: &GridEngine) {
        let boxes: Vec<_> = engine
            .widgets()
            .map(|(id, widget)| (id, widget.rect()))
            .collect();
        assert!(detect(boxes.iter().copied()).is_empty(), "overlap in {boxes:?}");
        assert!(
            boxes
                .iter()
                .all(|(_, rect)| rect.fits_within(engine.size()))
        );
    }

    #[test]
    fn moving_down_pushes_the_widget_below() {
        let (mut engine, ids) = engine(&[Rect::new(0, 0, 2, 2), Rect::new(0, 2, 2, 2)]);
        let target = Rect::new(0, 1, 2, 2);

        assert_eq!(
            engine.try_place(ids[0], target).unwrap(),
            PlacementOutcome::Accepted
        );
        engine.commit(ids[0], target).unwrap();

        assert_eq!(engine.widget(ids[0]).unwrap().rect(), target);
        assert_eq!(engine.widget(ids[1]).unwrap().rect(), Rect::new(0, 3, 2, 2));
        assert_valid_layout(&engine);
    }

    #[test]
    fn push_through_the_floor_is_rejected() {
        let (mut engine, ids) = engine(&[Rect::new(0, 0, 2, 2), Rect::new(0, 8, 2, 2)]);
        let before = resting(&engine);

        let outcome = engine.try_place(ids[0], Rect::new(0, 7, 2, 2)).unwrap();
        assert_eq!(outcome, PlacementOutcome::Rejected);
        assert!(engine.pending().is_none());
        assert_eq!(resting(&engine), before);
        assert!(engine.widgets().all(|(_, widget)| widget.pending_shift() == 0));
    }

    #[test]
    fn repeated_rejection_is_answered_from_cache() {
        let (config, _sink) = logged();
        let (mut engine, ids) =
            engine_with(&[Rect::new(0, 0, 2, 2), Rect::new(0, 8, 2, 2)], config);
        let target = Rect::new(0, 7, 2, 2);

        engine.try_place(ids[0], target).unwrap();
        let report = engine.trial(ids[0], target).unwrap();
        assert!(report.cached);
        assert_eq!(engine.resolver_runs(), 1);

        let metrics = engine.metrics_snapshot().unwrap();
        assert_eq!(metrics.trials, 2);
        assert_eq!(metrics.cache_hits, 1);
        assert_eq!(metrics.rejected, 2);
    }

    #[test]
    fn layout_change_forgets_cached_rejections() {
        let (mut engine, ids) = engine(&[Rect::new(0, 0, 2, 2), Rect::new(0, 8, 2, 2)]);
        let target = Rect::new(0, 7, 2, 2);
        engine.try_place(ids[0], target).unwrap();

        engine.unregister(ids[1]);
        assert_eq!(
            engine.try_place(ids[0], target).unwrap(),
            PlacementOutcome::Accepted
        );
        assert_eq!(engine.resolver_runs(), 2);
    }

    #[test]
    fn cancel_round_trips_to_the_original_layout() {
        let (mut engine, ids) = engine(&[
            Rect::new(0, 0, 2, 2),
            Rect::new(0, 2, 2, 2),
            Rect::new(0, 4, 2, 2),
        ]);
        let before = resting(&engine);

        engine.try_place(ids[0], Rect::new(0, 3, 2, 2)).unwrap();
        assert!(engine.pending().is_some());
        assert_eq!(engine.cancel(), 2);
        assert_eq!(engine.cancel(), 0);

        assert_eq!(resting(&engine), before);
        assert!(engine.widgets().all(|(_, widget)| widget.pending_shift() == 0));
    }

    #[test]
    fn commit_without_matching_trial_fails() {
        let (mut engine, ids) = engine(&[Rect::new(0, 0, 2, 2)]);
        let err = engine.commit(ids[0], Rect::new(0, 1, 2, 2)).unwrap_err();
        assert!(matches!(err, GridError::NotAccepted { .. }));
    }

    #[test]
    fn iteration_cap_is_logged_and_counted() {
        let (config, sink) = logged();
        let (mut engine, ids) = engine_with(
            &[
                Rect::new(0, 0, 2, 2),
                Rect::new(0, 2, 2, 2),
                Rect::new(0, 4, 2, 2),
            ],
            config.with_fixed_pass_cap(1),
        );

        let outcome = engine.try_place(ids[0], Rect::new(0, 1, 2, 2)).unwrap();
        assert_eq!(outcome, PlacementOutcome::Rejected);
        assert!(sink.messages().contains(&"cascade_iteration_cap".to_string()));
        assert_eq!(engine.metrics_snapshot().unwrap().iteration_cap_hits, 1);
    }

    #[test]
    fn long_cascades_are_flagged() {
        let (mut config, sink) = logged();
        config.suspicious_passes = 1;
        let (mut engine, ids) = engine_with(
            &[
                Rect::new(0, 0, 2, 2),
                Rect::new(0, 2, 2, 2),
                Rect::new(0, 4, 2, 2),
            ],
            config,
        );

        let report = engine.trial(ids[0], Rect::new(0, 1, 2, 2)).unwrap();
        assert_eq!(report.passes, 2);
        let warning = sink
            .events()
            .into_iter()
            .find(|event| event.message == "cascade_suspicious")
            .unwrap();
        assert_eq!(warning.level, LogLevel::Warn);
        assert_eq!(warning.field("passes"), Some(&json!(2)));
    }

    #[test]
    fn commit_emits_metrics_snapshot() {
        let (config, sink) = logged();
        let (mut engine, ids) =
            engine_with(&[Rect::new(0, 0, 2, 2), Rect::new(0, 2, 2, 2)], config);
        let target = Rect::new(0, 1, 2, 2);
        engine.try_place(ids[0], target).unwrap();
        engine.commit(ids[0], target).unwrap();

        let events = sink.events();
        let committed = events
            .iter()
            .find(|event| event.message == "placement_committed")
            .unwrap();
        assert_eq!(committed.target, "widget_grid::placement");
        assert_eq!(committed.field("affected"), Some(&json!(1)));

        let metrics = events
            .iter()
            .find(|event| event.message == "placement_metrics")
            .unwrap();
        assert_eq!(metrics.target, "widget_grid::metrics");
        assert_eq!(metrics.field("commits"), Some(&json!(1)));
    }

    #[test]
    fn drag_commits_last_accepted_position() {
        let (mut engine, ids) = engine(&[Rect::new(0, 0, 2, 2), Rect::new(0, 2, 2, 6)]);
        engine.begin_drag(ids[0]).unwrap();

        assert_eq!(
            engine.drag_to(0, 1).unwrap(),
            GestureStep::Accepted(Rect::new(0, 1, 2, 2))
        );
        assert_eq!(
            engine.drag_to(0, 1).unwrap(),
            GestureStep::Unchanged(Rect::new(0, 1, 2, 2))
        );
        assert_eq!(
            engine.drag_to(0, 4).unwrap(),
            GestureStep::Rejected(Rect::new(0, 4, 2, 2))
        );
        assert_eq!(engine.widget(ids[1]).unwrap().display_rect(), Rect::new(0, 3, 2, 6));

        let rest = engine.end_gesture().unwrap();
        assert_eq!(rest, Rect::new(0, 1, 2, 2));
        assert_eq!(engine.widget(ids[1]).unwrap().rect(), Rect::new(0, 3, 2, 6));
        assert!(engine.gesture().is_none());
        assert_valid_layout(&engine);
    }

    #[test]
    fn drag_is_clamped_to_the_grid() {
        let (mut engine, ids) = engine(&[Rect::new(0, 0, 2, 2)]);
        engine.begin_drag(ids[0]).unwrap();
        assert_eq!(
            engine.drag_to(40, 40).unwrap(),
            GestureStep::Accepted(Rect::new(8, 8, 2, 2))
        );
        assert_eq!(engine.end_gesture().unwrap(), Rect::new(8, 8, 2, 2));
    }

    #[test]
    fn resize_pushes_neighbours_down() {
        let (mut engine, ids) = engine(&[Rect::new(0, 0, 2, 2), Rect::new(0, 2, 4, 2)]);
        engine.begin_resize(ids[0]).unwrap();
        assert_eq!(
            engine.resize_to(2, 3).unwrap(),
            GestureStep::Accepted(Rect::new(0, 0, 2, 3))
        );
        engine.end_gesture().unwrap();
        assert_eq!(engine.widget(ids[1]).unwrap().rect(), Rect::new(0, 3, 4, 2));
    }

    #[test]
    fn gesture_without_accepted_step_changes_nothing() {
        let (mut engine, ids) = engine(&[Rect::new(0, 0, 2, 2), Rect::new(0, 8, 2, 2)]);
        let before = resting(&engine);
        engine.begin_drag(ids[0]).unwrap();
        assert!(matches!(engine.drag_to(0, 7).unwrap(), GestureStep::Rejected(_)));
        assert_eq!(engine.end_gesture().unwrap(), Rect::new(0, 0, 2, 2));
        assert_eq!(resting(&engine), before);
    }

    #[test]
    fn abort_restores_the_original_layout() {
        let (mut engine, ids) = engine(&[Rect::new(0, 0, 2, 2), Rect::new(0, 2, 2, 2)]);
        let before = resting(&engine);
        engine.begin_drag(ids[0]).unwrap();
        engine.drag_to(0, 1).unwrap();

        assert_eq!(engine.abort_gesture().unwrap(), Rect::new(0, 0, 2, 2));
        assert_eq!(resting(&engine), before);
        assert!(engine.pending().is_none());
    }

    #[test]
    fn only_one_gesture_at_a_time() {
        let (mut engine, ids) = engine(&[Rect::new(0, 0, 2, 2), Rect::new(4, 0, 2, 2)]);
        assert!(matches!(engine.drag_to(1, 1), Err(GridError::NoGesture)));
        assert!(matches!(engine.end_gesture(), Err(GridError::NoGesture)));

        engine.begin_drag(ids[0]).unwrap();
        let err = engine.begin_resize(ids[1]).unwrap_err();
        assert!(matches!(err, GridError::GestureActive(id) if id == ids[0]));
    }

    #[test]
    fn removing_the_dragged_widget_ends_the_gesture() {
        let (mut engine, ids) = engine(&[Rect::new(0, 0, 2, 2), Rect::new(0, 2, 2, 2)]);
        engine.begin_drag(ids[0]).unwrap();
        engine.drag_to(0, 1).unwrap();

        assert!(engine.unregister(ids[0]).is_some());
        assert!(engine.gesture().is_none());
        assert!(engine.pending().is_none());
        assert_eq!(engine.widget(ids[1]).unwrap().pending_shift(), 0);
        assert!(engine.unregister(ids[0]).is_none());
    }

    #[test]
    fn registering_resets_gesture_progress() {
        let (mut engine, ids) = engine(&[Rect::new(0, 0, 2, 2), Rect::new(0, 2, 2, 2)]);
        engine.begin_drag(ids[0]).unwrap();
        engine.drag_to(0, 1).unwrap();

        engine.register(Rect::new(6, 6, 2, 2)).unwrap();
        let gesture = engine.gesture().unwrap();
        assert_eq!(gesture.accepted(), None);
        assert_eq!(gesture.shown(), Rect::new(0, 0, 2, 2));
        assert!(engine.pending().is_none());
    }

    #[test]
    fn capacity_changes_are_validated() {
        let (mut engine, ids) = engine(&[Rect::new(0, 6, 2, 2)]);
        let err = engine.resize_capacity(Size::new(10, 7)).unwrap_err();
        assert!(matches!(err, GridError::Capacity { widget, .. } if widget == ids[0]));
        assert_eq!(engine.size(), Size::new(10, 10));

        engine.resize_capacity(Size::new(4, 8)).unwrap();
        assert_eq!(engine.size(), Size::new(4, 8));
        let outcome = engine.try_place(ids[0], Rect::new(3, 6, 2, 2)).unwrap();
        assert_eq!(outcome, PlacementOutcome::Rejected);
    }

    #[test]
    fn audit_sees_every_transition() {
        let audit = RecordingAudit::default();
        let config = EngineConfig::default().with_audit(audit.clone());
        let (mut engine, ids) =
            engine_with(&[Rect::new(0, 0, 2, 2), Rect::new(0, 8, 2, 2)], config);

        engine.begin_drag(ids[0]).unwrap();
        engine.drag_to(0, 7).unwrap();
        engine.drag_to(0, 1).unwrap();
        engine.end_gesture().unwrap();
        engine.unregister(ids[1]);

        assert_eq!(
            audit.stages(),
            vec![
                GridAuditStage::WidgetRegistered,
                GridAuditStage::WidgetRegistered,
                GridAuditStage::GestureStarted,
                GridAuditStage::PlacementRejected,
                GridAuditStage::PlacementAccepted,
                GridAuditStage::PlacementCommitted,
                GridAuditStage::GestureEnded,
                GridAuditStage::WidgetUnregistered,
            ]
        );
    }

    #[test]
    fn snapshot_restores_an_equivalent_engine() {
        let (mut engine, ids) = engine(&[Rect::new(0, 0, 2, 2), Rect::new(0, 2, 2, 2)]);
        let target = Rect::new(0, 1, 2, 2);
        engine.try_place(ids[0], target).unwrap();
        engine.commit(ids[0], target).unwrap();

        let snapshot = engine.snapshot();
        let restored = GridEngine::from_snapshot(&snapshot, EngineConfig::default()).unwrap();
        assert_eq!(resting(&restored), resting(&engine));
        assert_eq!(restored.snapshot().digest(), snapshot.digest());
    }

    #[test]
    fn dirty_set_reports_moved_widgets() {
        let (mut engine, ids) = engine(&[Rect::new(0, 0, 2, 2), Rect::new(0, 2, 2, 2)]);
        engine.take_dirty();

        let target = Rect::new(0, 1, 2, 2);
        engine.try_place(ids[0], target).unwrap();
        engine.commit(ids[0], target).unwrap();
        let dirty: Vec<_> = engine.take_dirty().into_iter().map(|(id, _)| id).collect();
        assert_eq!(dirty, ids);
        assert!(engine.take_dirty().is_empty());
    }

    #[test]
    fn long_column_resolves_past_the_configured_passes() {
        let mut engine =
            GridEngine::with_config(Size::new(2, 200), EngineConfig::default().with_max_passes(8));
        let ids: Vec<_> = (0..70)
            .map(|row| engine.register(Rect::new(0, row * 2, 2, 2)).unwrap())
            .collect();

        let report = engine.trial(ids[0], Rect::new(0, 1, 2, 2)).unwrap();
        assert_eq!(report.outcome, PlacementOutcome::Accepted);
        assert_eq!(report.passes, 69);
        assert_eq!(report.affected, 69);
    }

    #[test]
    fn commit_of_unknown_widget_reports_unknown_id() {
        let mut engine = GridEngine::new(Size::new(10, 10));
        let err = engine.commit(WidgetId::new(99), Rect::new(0, 0, 1, 1)).unwrap_err();
        assert!(matches!(err, GridError::UnknownId(id) if id.get() == 99));
    }

    #[test]
    fn placing_another_widget_mid_gesture_keeps_the_gesture_usable() {
        let (mut engine, ids) = engine(&[
            Rect::new(0, 0, 2, 2),
            Rect::new(0, 2, 2, 2),
            Rect::new(6, 0, 2, 2),
        ]);
        engine.begin_drag(ids[0]).unwrap();
        engine.drag_to(0, 1).unwrap();

        let other = Rect::new(6, 5, 2, 2);
        assert!(engine.try_place(ids[2], other).unwrap().is_accepted());
        let gesture = engine.gesture().unwrap();
        assert_eq!(gesture.accepted(), None);
        assert_eq!(gesture.shown(), Rect::new(0, 0, 2, 2));

        engine.commit(ids[2], other).unwrap();
        assert_eq!(engine.end_gesture().unwrap(), Rect::new(0, 0, 2, 2));
        assert_eq!(engine.widget(ids[2]).unwrap().rect(), other);
        assert_valid_layout(&engine);
    }

    #[test]
    fn host_trial_on_the_dragged_widget_is_what_the_gesture_commits() {
        let (mut engine, ids) = engine(&[Rect::new(0, 0, 2, 2), Rect::new(0, 2, 2, 2)]);
        engine.begin_drag(ids[0]).unwrap();
        engine.drag_to(3, 0).unwrap();

        let target = Rect::new(0, 1, 2, 2);
        engine.try_place(ids[0], target).unwrap();
        assert_eq!(engine.end_gesture().unwrap(), target);
        assert_eq!(engine.widget(ids[1]).unwrap().rect(), Rect::new(0, 3, 2, 2));
    }

    #[test]
    fn overflowing_rects_are_refused() {
        let (mut engine, ids) = engine(&[Rect::new(0, 0, 2, 2)]);
        assert!(matches!(
            engine.register(Rect::new(0, u32::MAX, 1, 1)),
            Err(GridError::RectOverflow(_))
        ));
        assert!(matches!(
            engine.try_place(ids[0], Rect::new(u32::MAX, 0, 2, 2)),
            Err(GridError::RectOverflow(_))
        ));
        assert_eq!(engine.registry().len(), 1);
    }

    /// Widgets stacked per column so the starting layout is valid.
    fn stacked(columns: &[(u32, u32, u32)]) -> (GridEngine, Vec<WidgetId>) {
        let mut engine = GridEngine::new(Size::new(12, 24));
        let mut fill = [0u32; 4];
        let ids = columns
            .iter()
            .map(|&(column, width, height)| {
                let slot = column as usize;
                let rect = Rect::new(column * 3, fill[slot], width, height);
                fill[slot] += height;
                engine.register(rect).unwrap()
            })
            .collect();
        (engine, ids)
    }

    fn layout_strategy() -> impl Strategy<Value = Vec<(u32, u32, u32)>> {
        prop::collection::vec((0u32..4, 1u32..=3, 1u32..=3), 1..8)
    }

    fn moves_strategy() -> impl Strategy<Value = Vec<(usize, u32, u32, bool)>> {
        prop::collection::vec((0usize..8, 0u32..12, 0u32..24, any::<bool>()), 1..40)
    }

    proptest! {
        #[test]
        fn committed_layouts_never_overlap(
            layout in layout_strategy(),
            moves in moves_strategy(),
        ) {
            let (mut engine, ids) = stacked(&layout);
            for (pick, x, y, commit) in moves {
                let id = ids[pick % ids.len()];
                let target = engine.widget(id).unwrap().rect().with_origin(x, y);
                if engine.try_place(id, target).unwrap().is_accepted() && commit {
                    engine.commit(id, target).unwrap();
                    let boxes: Vec<_> = engine
                        .widgets()
                        .map(|(id, widget)| (id, widget.rect()))
                        .collect();
                    prop_assert!(detect(boxes.iter().copied()).is_empty());
                    prop_assert!(boxes.iter().all(|(_, rect)| rect.fits_within(engine.size())));
                } else {
                    engine.cancel();
                }
            }
        }

        #[test]
        fn trial_then_cancel_leaves_resting_rects_alone(
            layout in layout_strategy(),
            pick in 0usize..8,
            x in 0u32..12,
            y in 0u32..24,
        ) {
            let (mut engine, ids) = stacked(&layout);
            let before = resting(&engine);
            let id = ids[pick % ids.len()];
            let target = engine.widget(id).unwrap().rect().with_origin(x, y);

            engine.try_place(id, target).unwrap();
            engine.cancel();
            engine.cancel();

            prop_assert_eq!(resting(&engine), before);
            prop_assert!(engine.widgets().all(|(_, widget)| widget.pending_shift() == 0));
            prop_assert!(engine.pending().is_none());
        }
    }
}
