//! In-place pointer move: drag a layer around the background.
//!
//! A gesture records the pointer's start position and the layer's start
//! offset at pointer-down; every move applies the page-pixel delta to that
//! start offset, clamped so the layer stays fully inside the background.
//! The drag is silent — exactly one `Moved` event fires at pointer-up.

use crate::input::PointerInput;
use pc_core::{Background, LayerId, LayerStack, Point, Size, Vec2, clamp_offset};

/// The single in-flight move gesture. No state accumulates across
/// gestures; high-frequency move samples only ever rewrite the offset.
#[derive(Debug, Clone, Copy)]
struct MoveGesture {
    layer: LayerId,
    pointer_id: i32,
    start_client: Point,
    start_offset: Vec2,
    /// Layer box snapshot taken at gesture start, used for clamping.
    layer_size: Size,
}

/// Translates raw pointer samples into offset writes on the layer stack.
#[derive(Default)]
pub struct MoveController {
    active: Option<MoveGesture>,
}

impl MoveController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a gesture is currently in flight.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// The layer being dragged, if a gesture is in flight.
    pub fn active_layer(&self) -> Option<LayerId> {
        self.active.map(|g| g.layer)
    }

    /// Start a gesture on `layer`. Selects it and records the start state.
    /// Returns true if the caller should capture the pointer; non-primary
    /// input and unknown layers are ignored.
    pub fn pointer_down(
        &mut self,
        stack: &mut LayerStack,
        layer: LayerId,
        input: &PointerInput,
    ) -> bool {
        if !input.primary {
            return false;
        }
        let Some(record) = stack.layer(layer) else {
            return false;
        };
        let start_offset = record.placement.offset;
        let layer_size = record.size();
        stack.select(Some(layer));
        self.active = Some(MoveGesture {
            layer,
            pointer_id: input.pointer_id,
            start_client: input.client,
            start_offset,
            layer_size,
        });
        true
    }

    /// Apply a move sample: delta from the gesture start, clamped per-axis
    /// so the layer's box never crosses the background edge. Samples from
    /// other pointers are ignored; no events fire. Returns true if the
    /// layer's offset was rewritten.
    pub fn pointer_move(
        &mut self,
        stack: &mut LayerStack,
        background: Option<&Background>,
        input: &PointerInput,
    ) -> bool {
        let Some(gesture) = self.active else {
            return false;
        };
        if gesture.pointer_id != input.pointer_id {
            return false;
        }
        let delta = input.client - gesture.start_client;
        let mut offset = gesture.start_offset + delta;
        if let Some(bg) = background {
            offset = clamp_offset(offset, gesture.layer_size, bg.rendered);
        }
        stack.set_layer_offset(gesture.layer, offset)
    }

    /// End the gesture: emits the single `Moved` event with the final
    /// percent position and pixel offset. Returns the moved layer's id so
    /// the caller can release pointer capture.
    pub fn pointer_up(
        &mut self,
        stack: &mut LayerStack,
        background: Option<&Background>,
        input: &PointerInput,
    ) -> Option<LayerId> {
        let gesture = self.active?;
        if gesture.pointer_id != input.pointer_id {
            return None;
        }
        self.active = None;
        stack.finish_move(gesture.layer, background);
        log::debug!("move gesture finished for {}", gesture.layer);
        Some(gesture.layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pc_core::{ComposerConfig, SourceItem, StackEvent};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn background() -> Background {
        Background::new(Size::new(400.0, 300.0), Some(10.0))
    }

    fn source() -> SourceItem {
        SourceItem {
            src: "https://cdn.example/star.png".into(),
            handle: "patch-star".into(),
            alt: "Star".into(),
            index: 0,
            physical_height: Some(2.0),
        }
    }

    fn setup() -> (LayerStack, LayerId, Rc<RefCell<Vec<StackEvent>>>) {
        let mut stack = LayerStack::new(ComposerConfig::default());
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        stack.subscribe(move |e| sink.borrow_mut().push(e.clone()));
        let bg = background();
        // 300px × 2/10 = 60px layer at center
        let id = stack.create_layer_at(50.0, 50.0, &source(), Some(&bg));
        (stack, id, events)
    }

    #[test]
    fn drag_applies_delta_from_start_offset() {
        let (mut stack, id, _) = setup();
        let bg = background();
        let mut ctl = MoveController::new();

        assert!(ctl.pointer_down(&mut stack, id, &PointerInput::new(1, 200.0, 150.0, true)));
        assert_eq!(stack.selected(), Some(id), "pointer-down selects the layer");

        ctl.pointer_move(&mut stack, Some(&bg), &PointerInput::new(1, 230.0, 140.0, true));
        let layer = stack.layer(id).unwrap();
        assert_eq!(layer.placement.offset, Vec2::new(30.0, -10.0));
    }

    #[test]
    fn drag_clamps_to_background_box() {
        let (mut stack, id, _) = setup();
        let bg = background();
        let mut ctl = MoveController::new();

        ctl.pointer_down(&mut stack, id, &PointerInput::new(1, 0.0, 0.0, true));
        // Wildly off the edge on both axes
        ctl.pointer_move(&mut stack, Some(&bg), &PointerInput::new(1, 5000.0, -5000.0, true));

        let layer = stack.layer(id).unwrap();
        // 60px provisional square inside 400×300: |x| ≤ 170, |y| ≤ 120
        assert_eq!(layer.placement.offset, Vec2::new(170.0, -120.0));
    }

    #[test]
    fn foreign_pointer_ids_are_ignored() {
        let (mut stack, id, _) = setup();
        let bg = background();
        let mut ctl = MoveController::new();

        ctl.pointer_down(&mut stack, id, &PointerInput::new(1, 0.0, 0.0, true));
        assert!(!ctl.pointer_move(&mut stack, Some(&bg), &PointerInput::new(2, 50.0, 50.0, true)));
        assert_eq!(stack.layer(id).unwrap().placement.offset, Vec2::ZERO);

        assert!(ctl.pointer_up(&mut stack, Some(&bg), &PointerInput::new(2, 50.0, 50.0, true)).is_none());
        assert!(ctl.is_active(), "gesture survives a foreign pointer-up");
    }

    #[test]
    fn single_moved_event_at_pointer_up() {
        let (mut stack, id, events) = setup();
        let bg = background();
        let mut ctl = MoveController::new();

        ctl.pointer_down(&mut stack, id, &PointerInput::new(1, 0.0, 0.0, true));
        for i in 1..=20 {
            ctl.pointer_move(&mut stack, Some(&bg), &PointerInput::new(1, i as f64, 0.0, true));
        }
        let moved_during_drag = events
            .borrow()
            .iter()
            .filter(|e| matches!(e, StackEvent::Moved { .. }))
            .count();
        assert_eq!(moved_during_drag, 0, "live drag is silent");

        assert_eq!(
            ctl.pointer_up(&mut stack, Some(&bg), &PointerInput::new(1, 20.0, 0.0, true)),
            Some(id)
        );
        let moved = events
            .borrow()
            .iter()
            .filter(|e| matches!(e, StackEvent::Moved { .. }))
            .count();
        assert_eq!(moved, 1);
        assert!(!ctl.is_active());
    }

    #[test]
    fn moved_event_percent_matches_clamped_offset() {
        let (mut stack, id, events) = setup();
        let bg = background();
        let mut ctl = MoveController::new();

        ctl.pointer_down(&mut stack, id, &PointerInput::new(1, 0.0, 0.0, true));
        ctl.pointer_move(&mut stack, Some(&bg), &PointerInput::new(1, 9999.0, 0.0, true));
        ctl.pointer_up(&mut stack, Some(&bg), &PointerInput::new(1, 9999.0, 0.0, true));

        let events = events.borrow();
        match events.last().expect("moved event") {
            StackEvent::Moved {
                x_percent,
                offset_x,
                ..
            } => {
                assert_eq!(*offset_x, 170.0);
                // (200 + 170) / 400 = 92.5%
                assert_eq!(*x_percent, 92.5);
            }
            other => panic!("expected Moved, got {other:?}"),
        }
    }

    #[test]
    fn non_primary_button_does_not_start_gesture() {
        let (mut stack, id, _) = setup();
        let mut ctl = MoveController::new();
        assert!(!ctl.pointer_down(&mut stack, id, &PointerInput::new(1, 0.0, 0.0, false)));
        assert!(!ctl.is_active());
    }

    #[test]
    fn gesture_never_touches_other_layers() {
        let (mut stack, a, _) = setup();
        let bg = background();
        let b = stack.create_layer_at(50.0, 50.0, &source(), Some(&bg));

        let mut ctl = MoveController::new();
        ctl.pointer_down(&mut stack, a, &PointerInput::new(1, 0.0, 0.0, true));
        ctl.pointer_move(&mut stack, Some(&bg), &PointerInput::new(1, 40.0, 0.0, true));

        assert_eq!(stack.layer(b).unwrap().placement.offset, Vec2::ZERO);
        assert_eq!(stack.selected(), Some(a));
    }
}
