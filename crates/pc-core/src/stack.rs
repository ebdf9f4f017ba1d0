//! The layer stack: the single owner of composition state.
//!
//! Holds the ordered set of layers (draw order = index order, later =
//! topmost), the one current selection, and the observer registry. All
//! mutation goes through the methods here — interaction controllers never
//! touch the order or selection directly. Z-order is derived from position
//! in the order on demand, never stored where it could desynchronize.

use crate::config::ComposerConfig;
use crate::event::{ReorderDirection, StackEvent};
use crate::geometry::{Placement, offset_to_percent, percent_to_offset};
use crate::id::LayerId;
use crate::model::{Background, Layer, SourceItem, initial_height};
use kurbo::Vec2;
use smallvec::SmallVec;

/// Handle returned by [`LayerStack::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&StackEvent)>;

/// Owner of the layer order, the current selection, and event fan-out.
pub struct LayerStack {
    layers: Vec<Layer>,
    selection: Option<LayerId>,
    config: ComposerConfig,
    observers: SmallVec<[(SubscriptionId, Observer); 2]>,
    next_subscription: u64,
}

impl LayerStack {
    pub fn new(config: ComposerConfig) -> Self {
        Self {
            layers: Vec::new(),
            selection: None,
            config,
            observers: SmallVec::new(),
            next_subscription: 0,
        }
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    // ─── Observer registry ───────────────────────────────────────────────

    /// Register a fire-and-forget observer for stack events.
    pub fn subscribe(&mut self, observer: impl FnMut(&StackEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Remove a previously registered observer. Unknown ids are ignored.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.observers.retain(|(sub, _)| *sub != id);
    }

    fn emit(&mut self, event: StackEvent) {
        for (_, observer) in self.observers.iter_mut() {
            observer(&event);
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    /// Layers in draw order (first = bottom, last = topmost).
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    fn position(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    /// Derived 1-based z-index of a layer, from its position in the order.
    pub fn z_index(&self, id: LayerId) -> Option<usize> {
        self.position(id).map(|i| i + 1)
    }

    /// The current selection, if it still refers to a live layer.
    pub fn selected(&self) -> Option<LayerId> {
        self.selection
    }

    pub fn selected_layer(&self) -> Option<&Layer> {
        self.selection.and_then(|id| self.layer(id))
    }

    // ─── Creation ────────────────────────────────────────────────────────

    /// Create a layer at a percent position over the background box and
    /// append it to the top of the order.
    ///
    /// Without a measurable background box the offset degrades to `(0, 0)`
    /// (visual center) and the height falls back to the configured default.
    /// Emits `Added`. Width refinement happens later, once the image
    /// decodes, via [`LayerStack::refine_layer_width`].
    pub fn create_layer_at(
        &mut self,
        x_percent: f64,
        y_percent: f64,
        source: &SourceItem,
        background: Option<&Background>,
    ) -> LayerId {
        let offset = background
            .map(|bg| percent_to_offset(x_percent, y_percent, bg.rendered))
            .unwrap_or(Vec2::ZERO);

        let height = initial_height(
            source.physical_height,
            background.and_then(|bg| bg.physical_height),
            background.map(|bg| bg.rendered.height).unwrap_or(0.0),
            &self.config,
        );

        let id = LayerId::generate();
        let placement = Placement {
            offset,
            rotation: 0.0,
        };
        self.layers.push(Layer::new(id, source, placement, height));
        log::debug!("layer {id} created from {} at {height}px", source.handle);

        self.emit(StackEvent::Added {
            layer_id: id,
            src: source.src.clone(),
            handle: source.handle.clone(),
            index: source.index,
            x_percent,
            y_percent,
        });
        id
    }

    /// Deferred second phase of creation: apply the decoded image's aspect
    /// ratio. Safe to call for a layer deleted before decode finished.
    /// Returns true if the layer is live and its width changed.
    pub fn refine_layer_width(&mut self, id: LayerId, aspect_ratio: f64) -> bool {
        match self.layers.iter_mut().find(|l| l.id == id) {
            Some(layer) => layer.refine_width(aspect_ratio),
            None => false,
        }
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// Make `layer` current (or clear with `None`). Selecting an unknown
    /// id clears instead. At most one layer is current at any time.
    pub fn select(&mut self, layer: Option<LayerId>) {
        self.selection = layer.filter(|id| self.position(*id).is_some());
    }

    // ─── Mutation of the current layer ───────────────────────────────────

    /// Delete the current selection. No-op (no event) without one.
    pub fn delete_current(&mut self) -> bool {
        let Some(id) = self.selection else {
            return false;
        };
        let Some(pos) = self.position(id) else {
            self.selection = None;
            return false;
        };
        self.layers.remove(pos);
        self.selection = None;
        log::debug!("layer {id} removed");
        self.emit(StackEvent::Removed { layer_id: id });
        true
    }

    /// Rotate the current selection by `delta` degrees. Returns the new
    /// absolute angle, always in `[0, 360)`. No-op without a selection.
    pub fn rotate_current(&mut self, delta: f64) -> Option<f64> {
        let id = self.selection?;
        let layer = self.layers.iter_mut().find(|l| l.id == id)?;
        let rotation = layer.placement.rotate_by(delta);
        self.emit(StackEvent::Rotated {
            layer_id: id,
            rotation,
        });
        Some(rotation)
    }

    /// Swap the current selection with its neighbor below. No-op without a
    /// selection or when already at the bottom.
    pub fn move_backward(&mut self) -> bool {
        self.swap_current(ReorderDirection::Backward)
    }

    /// Swap the current selection with its neighbor above. No-op without a
    /// selection or when already topmost.
    pub fn move_forward(&mut self) -> bool {
        self.swap_current(ReorderDirection::Forward)
    }

    fn swap_current(&mut self, direction: ReorderDirection) -> bool {
        let Some(id) = self.selection else {
            return false;
        };
        let Some(pos) = self.position(id) else {
            return false;
        };
        let neighbor = match direction {
            ReorderDirection::Backward => {
                if pos == 0 {
                    return false;
                }
                pos - 1
            }
            ReorderDirection::Forward => {
                if pos + 1 >= self.layers.len() {
                    return false;
                }
                pos + 1
            }
        };
        self.layers.swap(pos, neighbor);
        self.emit(StackEvent::Reordered {
            layer_id: id,
            direction,
        });
        true
    }

    // ─── Offset (shared by creation and pointer drag) ────────────────────

    /// Set a layer's offset directly. The single offset write path: pointer
    /// drag and programmatic placement both land here. Silent — live drags
    /// emit no intermediate events.
    pub fn set_layer_offset(&mut self, id: LayerId, offset: Vec2) -> bool {
        match self.layers.iter_mut().find(|l| l.id == id) {
            Some(layer) => {
                layer.placement.set_offset(offset);
                true
            }
            None => false,
        }
    }

    /// End of a move gesture: emit exactly one `Moved` with the final
    /// normalized percent position plus the pixel offset. Percent degrades
    /// to `(50, 50)` when the background box cannot be measured.
    pub fn finish_move(&mut self, id: LayerId, background: Option<&Background>) -> Option<(f64, f64)> {
        let layer = self.layer(id)?;
        let offset = layer.placement.offset;
        let (x_percent, y_percent) = background
            .map(|bg| offset_to_percent(offset, bg.rendered))
            .unwrap_or((50.0, 50.0));
        self.emit(StackEvent::Moved {
            layer_id: id,
            x_percent,
            y_percent,
            offset_x: offset.x,
            offset_y: offset.y,
        });
        Some((x_percent, y_percent))
    }

    /// Emit the `source-dropped` notification for a completed palette drop.
    pub fn notify_source_dropped(&mut self, src: &str, handle: &str, index: &str) {
        self.emit(StackEvent::SourceDropped {
            src: src.to_string(),
            handle: handle.to_string(),
            index: index.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Size;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn background_400() -> Background {
        Background::new(Size::new(400.0, 400.0), Some(10.0))
    }

    fn star() -> SourceItem {
        SourceItem {
            src: "https://cdn.example/star.png".into(),
            handle: "patch-star".into(),
            alt: "Star".into(),
            index: 0,
            physical_height: Some(2.0),
        }
    }

    fn stack_with_events() -> (LayerStack, Rc<RefCell<Vec<StackEvent>>>) {
        let mut stack = LayerStack::new(ComposerConfig::default());
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        stack.subscribe(move |e| sink.borrow_mut().push(e.clone()));
        (stack, events)
    }

    #[test]
    fn create_uses_ratio_sizing_and_emits_added() {
        let (mut stack, events) = stack_with_events();
        let bg = background_400();
        let id = stack.create_layer_at(50.0, 50.0, &star(), Some(&bg));

        let layer = stack.layer(id).expect("layer exists");
        // 400px × 2/10 = 80px, inside [50, 500]
        assert_eq!(layer.height, 80.0);
        assert_eq!(layer.placement.offset, Vec2::ZERO, "center drop → zero offset");

        let events = events.borrow();
        assert_eq!(events.len(), 1);
        match &events[0] {
            StackEvent::Added {
                layer_id,
                handle,
                x_percent,
                ..
            } => {
                assert_eq!(*layer_id, id);
                assert_eq!(handle, "patch-star");
                assert_eq!(*x_percent, 50.0);
            }
            other => panic!("expected Added, got {other:?}"),
        }
    }

    #[test]
    fn create_height_always_within_bounds() {
        let mut stack = LayerStack::new(ComposerConfig::default());
        for (patch, hat, rendered) in [
            (Some(2.0), Some(10.0), 400.0),
            (Some(50.0), Some(1.0), 900.0),
            (Some(0.01), Some(100.0), 400.0),
            (None, None, 400.0),
        ] {
            let mut source = star();
            source.physical_height = patch;
            let bg = Background::new(Size::new(rendered, rendered), hat);
            let id = stack.create_layer_at(50.0, 50.0, &source, Some(&bg));
            let h = stack.layer(id).unwrap().height;
            assert!((50.0..=500.0).contains(&h), "height {h} out of bounds");
        }
    }

    #[test]
    fn create_without_background_defaults_offset_and_height() {
        let mut stack = LayerStack::new(ComposerConfig::default());
        let id = stack.create_layer_at(10.0, 90.0, &star(), None);
        let layer = stack.layer(id).unwrap();
        assert_eq!(layer.placement.offset, Vec2::ZERO);
        assert_eq!(layer.height, 200.0);
    }

    #[test]
    fn new_layers_stack_on_top() {
        let mut stack = LayerStack::new(ComposerConfig::default());
        let bg = background_400();
        let bottom = stack.create_layer_at(50.0, 50.0, &star(), Some(&bg));
        let top = stack.create_layer_at(50.0, 50.0, &star(), Some(&bg));
        assert_eq!(stack.z_index(bottom), Some(1));
        assert_eq!(stack.z_index(top), Some(2));
    }

    #[test]
    fn rotate_accumulates_and_reports_in_range() {
        let (mut stack, events) = stack_with_events();
        let bg = background_400();
        let id = stack.create_layer_at(50.0, 50.0, &star(), Some(&bg));
        stack.select(Some(id));

        assert_eq!(stack.rotate_current(-15.0), Some(345.0));
        assert_eq!(stack.rotate_current(-15.0), Some(330.0));
        assert_eq!(stack.rotate_current(45.0), Some(15.0));

        let events = events.borrow();
        let rotations: Vec<f64> = events
            .iter()
            .filter_map(|e| match e {
                StackEvent::Rotated { rotation, .. } => Some(*rotation),
                _ => None,
            })
            .collect();
        assert_eq!(rotations, vec![345.0, 330.0, 15.0]);
    }

    #[test]
    fn rotate_without_selection_is_noop() {
        let (mut stack, events) = stack_with_events();
        assert_eq!(stack.rotate_current(15.0), None);
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn reorder_roundtrip_restores_order() {
        let mut stack = LayerStack::new(ComposerConfig::default());
        let bg = background_400();
        let a = stack.create_layer_at(50.0, 50.0, &star(), Some(&bg));
        let b = stack.create_layer_at(50.0, 50.0, &star(), Some(&bg));
        let c = stack.create_layer_at(50.0, 50.0, &star(), Some(&bg));

        let original: Vec<LayerId> = stack.layers().iter().map(|l| l.id).collect();
        assert_eq!(original, vec![a, b, c]);

        stack.select(Some(b));
        assert!(stack.move_forward());
        assert_eq!(stack.z_index(b), Some(3));
        assert!(stack.move_backward());

        let restored: Vec<LayerId> = stack.layers().iter().map(|l| l.id).collect();
        assert_eq!(restored, original, "forward then backward must restore order");
    }

    #[test]
    fn reorder_noop_at_extremes() {
        let (mut stack, events) = stack_with_events();
        let bg = background_400();
        let a = stack.create_layer_at(50.0, 50.0, &star(), Some(&bg));
        let b = stack.create_layer_at(50.0, 50.0, &star(), Some(&bg));

        stack.select(Some(b));
        assert!(!stack.move_forward(), "topmost cannot move forward");
        stack.select(Some(a));
        assert!(!stack.move_backward(), "bottom cannot move backward");

        let reorders = events
            .borrow()
            .iter()
            .filter(|e| matches!(e, StackEvent::Reordered { .. }))
            .count();
        assert_eq!(reorders, 0);
    }

    #[test]
    fn delete_clears_selection_and_emits_once() {
        let (mut stack, events) = stack_with_events();
        let bg = background_400();
        let id = stack.create_layer_at(50.0, 50.0, &star(), Some(&bg));
        stack.select(Some(id));

        assert!(stack.delete_current());
        assert_eq!(stack.selected(), None);
        assert!(stack.is_empty());

        // No selection left: a second delete is a silent no-op
        assert!(!stack.delete_current());

        let removed = events
            .borrow()
            .iter()
            .filter(|e| matches!(e, StackEvent::Removed { .. }))
            .count();
        assert_eq!(removed, 1);
    }

    #[test]
    fn selecting_unknown_layer_clears() {
        let mut stack = LayerStack::new(ComposerConfig::default());
        let bg = background_400();
        let id = stack.create_layer_at(50.0, 50.0, &star(), Some(&bg));
        stack.select(Some(id));
        stack.select(Some(LayerId::intern("never_created")));
        assert_eq!(stack.selected(), None);
    }

    #[test]
    fn finish_move_reports_percent_consistent_with_offset() {
        let (mut stack, events) = stack_with_events();
        let bg = background_400();
        let id = stack.create_layer_at(50.0, 50.0, &star(), Some(&bg));

        stack.set_layer_offset(id, Vec2::new(-100.0, 100.0));
        let (x, y) = stack.finish_move(id, Some(&bg)).expect("layer live");
        assert_eq!((x, y), (25.0, 75.0));

        let events = events.borrow();
        match events.last().expect("moved event") {
            StackEvent::Moved {
                offset_x, offset_y, ..
            } => {
                assert_eq!(*offset_x, -100.0);
                assert_eq!(*offset_y, 100.0);
            }
            other => panic!("expected Moved, got {other:?}"),
        }
    }

    #[test]
    fn refine_width_ignored_after_delete() {
        let mut stack = LayerStack::new(ComposerConfig::default());
        let bg = background_400();
        let id = stack.create_layer_at(50.0, 50.0, &star(), Some(&bg));
        stack.select(Some(id));
        stack.delete_current();
        assert!(
            !stack.refine_layer_width(id, 1.5),
            "decode completing after delete must be ignored"
        );
    }

    #[test]
    fn unsubscribed_observers_stop_firing() {
        let mut stack = LayerStack::new(ComposerConfig::default());
        let count = Rc::new(RefCell::new(0u32));
        let sink = count.clone();
        let sub = stack.subscribe(move |_| *sink.borrow_mut() += 1);

        let bg = background_400();
        stack.create_layer_at(50.0, 50.0, &star(), Some(&bg));
        assert_eq!(*count.borrow(), 1);

        stack.unsubscribe(sub);
        stack.create_layer_at(50.0, 50.0, &star(), Some(&bg));
        assert_eq!(*count.borrow(), 1, "no events after unsubscribe");
    }
}
