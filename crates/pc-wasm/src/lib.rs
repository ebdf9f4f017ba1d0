//! WASM bridge for the patch composer — wires the layer stack and
//! interaction controllers to a host page's DOM.
//!
//! The host supplies a preview container, the background `<img>`, a set of
//! draggable palette buttons, and (optionally) an export button; this
//! crate owns everything inside the preview from there. Compiled via
//! `wasm-pack build --target web`.

mod dom;
mod export;

use dom::DomProjection;
use pc_core::{ComposerConfig, LayerId, LayerStack, SourceItem, StackEvent};
use pc_editor::dnd::{DragPayload, DropController, GhostEffect, MIME_HANDLE, MIME_INDEX};
use pc_editor::gesture::MoveController;
use pc_editor::input::PointerInput;
use pc_editor::toolbar::{ToolbarAction, ToolbarController, anchor_for};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    DragEvent, HtmlButtonElement, HtmlElement, HtmlImageElement, KeyboardEvent, MouseEvent,
    PointerEvent,
};

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

/// Slot the outbound notification callback lives in. Shared with the
/// stack's observer so events reach the host without re-entering the
/// composer's own cell.
type NotifySlot = Rc<RefCell<Option<js_sys::Function>>>;

/// Interior state behind the `PatchComposer` handle. One instance per
/// mounted composer — multiple independent composers per page work.
pub(crate) struct Composer {
    stack: LayerStack,
    move_ctl: MoveController,
    drop_ctl: DropController,
    toolbar: ToolbarController,
    pub(crate) dom: DomProjection,
    /// Palette items in registration order, with their elements for
    /// highlight toggling.
    sources: Vec<(SourceItem, HtmlElement)>,
    notify: NotifySlot,
    /// Cached rasterization entry point — loaded on first export only.
    pub(crate) rasterizer: Option<js_sys::Function>,
    pub(crate) exporting: bool,
    /// Back-reference for closures spawned from within methods (image
    /// decode probes).
    self_ref: Weak<RefCell<Composer>>,
}

impl Composer {
    fn config(&self) -> ComposerConfig {
        self.stack.config().clone()
    }

    // ─── Selection & toolbar ─────────────────────────────────────────────

    fn select(&mut self, layer: Option<LayerId>) {
        self.stack.select(layer);
        self.dom.set_selected(self.stack.selected());
        self.refresh_toolbar();
    }

    /// Re-anchor the toolbar over the current selection, or hide it. A
    /// background box that cannot be measured hides the toolbar rather
    /// than showing it at a wrong position.
    fn refresh_toolbar(&mut self) {
        let anchored = self.stack.selected().and_then(|id| {
            let bg = self.dom.background_rect()?;
            let layer = self.dom.layer_rect(id)?;
            Some((id, anchor_for(layer, bg, self.stack.config())))
        });
        match anchored {
            Some((id, anchor)) => {
                if self.dom.position_toolbar(anchor).is_ok() {
                    self.toolbar.show_for(id);
                } else {
                    self.toolbar.hide();
                    self.dom.hide_toolbar();
                }
            }
            None => {
                self.toolbar.hide();
                self.dom.hide_toolbar();
            }
        }
    }

    fn dispatch_toolbar(&mut self, action: ToolbarAction) {
        let step = self.stack.config().rotate_step_deg;
        match action {
            ToolbarAction::Delete => {
                let deleted = self.stack.selected();
                if self.stack.delete_current()
                    && let Some(id) = deleted
                {
                    self.dom.remove_layer(id);
                    let _ = self.dom.sync_order(&self.stack);
                    self.dom.set_selected(None);
                    self.toolbar.hide();
                    self.dom.hide_toolbar();
                }
            }
            ToolbarAction::RotateLeft | ToolbarAction::RotateRight => {
                let delta = if action == ToolbarAction::RotateLeft {
                    -step
                } else {
                    step
                };
                if self.stack.rotate_current(delta).is_some()
                    && let Some(layer) = self.stack.selected_layer()
                {
                    let _ = self.dom.update_layer(layer);
                }
            }
            ToolbarAction::SendBackward => {
                if self.stack.move_backward() {
                    let _ = self.dom.sync_order(&self.stack);
                    self.refresh_toolbar();
                }
            }
            ToolbarAction::BringForward => {
                if self.stack.move_forward() {
                    let _ = self.dom.sync_order(&self.stack);
                    self.refresh_toolbar();
                }
            }
        }
    }

    // ─── Pointer move gesture ────────────────────────────────────────────

    fn on_layer_pointer_down(&mut self, id: LayerId, event: &PointerEvent) {
        let input = PointerInput::new(
            event.pointer_id(),
            event.client_x() as f64,
            event.client_y() as f64,
            event.button() == 0,
        );
        if !self.move_ctl.pointer_down(&mut self.stack, id, &input) {
            return;
        }
        event.prevent_default();
        self.dom.set_selected(self.stack.selected());
        self.refresh_toolbar();
        if let Some(el) = self.dom.layer_element(id) {
            let _ = el.set_pointer_capture(event.pointer_id());
        }
    }

    fn on_pointer_move(&mut self, event: &PointerEvent) {
        let Some(id) = self.move_ctl.active_layer() else {
            return;
        };
        let input = PointerInput::new(
            event.pointer_id(),
            event.client_x() as f64,
            event.client_y() as f64,
            true,
        );
        let background = self.dom.background_model();
        event.prevent_default();
        if self.move_ctl.pointer_move(&mut self.stack, background.as_ref(), &input)
            && let Some(layer) = self.stack.layer(id)
        {
            let _ = self.dom.update_layer(layer);
        }
    }

    fn on_pointer_up(&mut self, event: &PointerEvent) {
        let input = PointerInput::new(
            event.pointer_id(),
            event.client_x() as f64,
            event.client_y() as f64,
            true,
        );
        let background = self.dom.background_model();
        if let Some(id) = self.move_ctl.pointer_up(&mut self.stack, background.as_ref(), &input) {
            if let Some(el) = self.dom.layer_element(id) {
                let _ = el.release_pointer_capture(event.pointer_id());
            }
            self.refresh_toolbar();
        }
    }

    // ─── Drag-and-drop ───────────────────────────────────────────────────

    fn on_drag_over(&mut self, event: &DragEvent) {
        event.prevent_default();
        self.dom.set_dragover(true);

        let Some(dt) = event.data_transfer() else {
            return;
        };
        let src = dt.get_data("text/plain").unwrap_or_default();
        if src.is_empty() {
            return;
        }
        let handle = dt.get_data(MIME_HANDLE).unwrap_or_default();

        let source = find_source(&self.sources, &src, &handle, "");
        let background = self.dom.background_model();
        let pointer = self
            .dom
            .background_rect()
            .map(|r| {
                (
                    event.client_x() as f64 - r.x0,
                    event.client_y() as f64 - r.y0,
                )
            })
            .unwrap_or((0.0, 0.0));
        let config = self.config();

        let effect = self.drop_ctl.drag_over(
            &src,
            source.as_ref(),
            background.as_ref(),
            pointer,
            &config,
        );
        let Some(ghost) = self.drop_ctl.ghost().cloned() else {
            return;
        };
        match effect {
            GhostEffect::Create => {
                if self.dom.create_ghost(&ghost.src, ghost.height).is_ok() {
                    let _ = self.dom.move_ghost(ghost.offset);
                    self.spawn_ghost_probe(&ghost.src, ghost.height);
                }
            }
            GhostEffect::Move => {
                let _ = self.dom.move_ghost(ghost.offset);
            }
            GhostEffect::None => {}
        }
    }

    fn on_drag_leave(&mut self) {
        self.dom.set_dragover(false);
        self.drop_ctl.clear();
        self.dom.destroy_ghost();
    }

    fn on_drag_end(&mut self) {
        self.dom.set_dragover(false);
        self.drop_ctl.clear();
        self.dom.destroy_ghost();
    }

    fn on_drop(&mut self, event: &DragEvent) {
        event.prevent_default();
        self.dom.set_dragover(false);

        let payload = event.data_transfer().and_then(|dt| {
            DragPayload::resolve(
                &dt.get_data("text/plain").unwrap_or_default(),
                &dt.get_data(MIME_HANDLE).unwrap_or_default(),
                &dt.get_data(MIME_INDEX).unwrap_or_default(),
                &dt.get_data("text/html").unwrap_or_default(),
            )
        });

        let background = self.dom.background_model();
        let pointer = self.dom.background_rect().map(|r| {
            (
                event.client_x() as f64 - r.x0,
                event.client_y() as f64 - r.y0,
            )
        });
        let resolved = self.drop_ctl.drop(background.as_ref(), pointer);
        self.dom.destroy_ghost();

        // Missing payload is "no drop occurred" — a recoverable no-op.
        let Some(payload) = payload else {
            return;
        };
        self.highlight_palette(&payload);
        self.stack
            .notify_source_dropped(&payload.src, &payload.handle, &payload.index);

        if let Some((x_percent, y_percent)) = resolved {
            self.create_layer(x_percent, y_percent, &payload);
        }
    }

    /// Exclusive `is-selected` highlight on the palette button the drop
    /// matched, if any.
    fn highlight_palette(&self, payload: &DragPayload) {
        for (source, el) in &self.sources {
            let matched = source.src == payload.src
                || (!payload.handle.is_empty() && source.handle == payload.handle)
                || (!payload.index.is_empty() && source.index.to_string() == payload.index);
            let _ = el.class_list().toggle_with_force("is-selected", matched);
        }
    }

    // ─── Layer creation ──────────────────────────────────────────────────

    fn create_layer(&mut self, x_percent: f64, y_percent: f64, payload: &DragPayload) -> Option<LayerId> {
        let source = find_source(&self.sources, &payload.src, &payload.handle, &payload.index)
            .unwrap_or_else(|| SourceItem {
                src: payload.src.clone(),
                handle: payload.handle.clone(),
                alt: String::new(),
                index: payload.index.parse().unwrap_or(0),
                physical_height: None,
            });

        let background = self.dom.background_model();
        let id = self
            .stack
            .create_layer_at(x_percent, y_percent, &source, background.as_ref());

        let layer = self.stack.layer(id)?.clone();
        match self.dom.insert_layer(&layer) {
            Ok(wrapper) => {
                if let Some(inner) = self.self_ref.upgrade() {
                    wire_layer_element(&inner, &wrapper, id);
                }
                let _ = self.dom.sync_order(&self.stack);
                self.spawn_layer_probe(id, &layer.src);
                Some(id)
            }
            Err(err) => {
                log::warn!("could not materialize layer {id}: {err:?}");
                Some(id)
            }
        }
    }

    /// Deferred width refinement: decode the image off-DOM and apply its
    /// intrinsic aspect ratio once. Deleted layers ignore the callback.
    fn spawn_layer_probe(&self, id: LayerId, src: &str) {
        let Some(inner) = self.self_ref.upgrade() else {
            return;
        };
        let Ok(probe) = HtmlImageElement::new() else {
            return;
        };
        let probe_ref = probe.clone();
        let onload = Closure::once(move || {
            let (w, h) = (probe_ref.natural_width(), probe_ref.natural_height());
            if h == 0 {
                return;
            }
            let aspect = w as f64 / h as f64;
            let mut composer = inner.borrow_mut();
            if composer.stack.refine_layer_width(id, aspect)
                && let Some(layer) = composer.stack.layer(id)
            {
                let layer = layer.clone();
                let _ = composer.dom.update_layer(&layer);
            }
        });
        probe.set_onload(Some(onload.as_ref().unchecked_ref()));
        onload.forget();
        probe.set_src(src);
    }

    /// Same decode probe for the ghost's width.
    fn spawn_ghost_probe(&self, src: &str, height: f64) {
        let Some(inner) = self.self_ref.upgrade() else {
            return;
        };
        let Ok(probe) = HtmlImageElement::new() else {
            return;
        };
        let probe_ref = probe.clone();
        let src_owned = src.to_string();
        let onload = Closure::once(move || {
            let (w, h) = (probe_ref.natural_width(), probe_ref.natural_height());
            if h == 0 {
                return;
            }
            let width = (height * w as f64 / h as f64).round();
            let composer = inner.borrow();
            let _ = composer.dom.refine_ghost_width(&src_owned, width);
        });
        probe.set_onload(Some(onload.as_ref().unchecked_ref()));
        onload.forget();
        probe.set_src(src);
    }

    fn emitting_stack(notify: NotifySlot, config: ComposerConfig) -> LayerStack {
        let mut stack = LayerStack::new(config);
        let slot = notify.clone();
        stack.subscribe(move |event: &StackEvent| {
            let Some(callback) = slot.borrow().as_ref().cloned() else {
                return;
            };
            let payload = match serde_json::to_string(event) {
                Ok(json) => json,
                Err(err) => {
                    log::warn!("unserializable stack event: {err}");
                    return;
                }
            };
            // Fire-and-forget: a throwing host callback is its problem.
            let _ = callback.call2(
                &JsValue::NULL,
                &JsValue::from_str(event.name()),
                &JsValue::from_str(&payload),
            );
        });
        stack
    }
}

fn find_source(
    sources: &[(SourceItem, HtmlElement)],
    src: &str,
    handle: &str,
    index: &str,
) -> Option<SourceItem> {
    sources
        .iter()
        .find(|(s, _)| {
            s.src == src
                || (!handle.is_empty() && s.handle == handle)
                || (!index.is_empty() && s.index.to_string() == index)
        })
        .map(|(s, _)| s.clone())
}

// ─── Public bridge ───────────────────────────────────────────────────────

/// One composer instance mounted over a host-provided preview subtree.
#[wasm_bindgen]
pub struct PatchComposer {
    inner: Rc<RefCell<Composer>>,
}

#[wasm_bindgen]
impl PatchComposer {
    /// Mount over the preview container and its background image. Builds
    /// the layers container and toolbar, and wires preview/document-level
    /// listeners.
    #[wasm_bindgen(constructor)]
    pub fn new(
        preview: HtmlElement,
        background: HtmlImageElement,
    ) -> Result<PatchComposer, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;

        let notify: NotifySlot = Rc::new(RefCell::new(None));
        let config = ComposerConfig::default();
        let stack = Composer::emitting_stack(notify.clone(), config);
        let dom = DomProjection::new(document, preview, background)?;

        let inner = Rc::new(RefCell::new(Composer {
            stack,
            move_ctl: MoveController::new(),
            drop_ctl: DropController::new(),
            toolbar: ToolbarController::new(),
            dom,
            sources: Vec::new(),
            notify,
            rasterizer: None,
            exporting: false,
            self_ref: Weak::new(),
        }));
        inner.borrow_mut().self_ref = Rc::downgrade(&inner);

        build_toolbar(&inner)?;
        wire_preview(&inner)?;
        wire_window(&inner)?;
        wire_document(&inner)?;

        log::info!("patch composer mounted");
        Ok(PatchComposer { inner })
    }

    /// Register one palette button. Reads `data-src`, `data-handle`,
    /// `data-height`, `data-index` and makes the button a drag source.
    pub fn register_source(&self, button: HtmlElement) -> Result<(), JsValue> {
        let dataset = button.dataset();
        let mut composer = self.inner.borrow_mut();
        let index = dataset
            .get("index")
            .and_then(|v| v.parse().ok())
            .unwrap_or(composer.sources.len());
        dataset.set("index", &index.to_string())?;

        let alt = button
            .query_selector("img")?
            .and_then(|img| img.get_attribute("alt"))
            .unwrap_or_default();
        let source = SourceItem {
            src: dataset.get("src").unwrap_or_default(),
            handle: dataset.get("handle").unwrap_or_default(),
            alt,
            index,
            physical_height: dataset
                .get("height")
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| *v > 0.0),
        };
        button.set_attribute("draggable", "true")?;
        composer.sources.push((source.clone(), button.clone()));
        drop(composer);

        wire_palette_button(&self.inner, &button, source)?;
        Ok(())
    }

    /// Register the export trigger. One click rasterizes the current
    /// composition and downloads it as a PNG.
    pub fn register_export_button(&self, button: HtmlButtonElement) -> Result<(), JsValue> {
        // Marked so the export clone can strip the control itself.
        button.set_attribute("data-pc-export", "true")?;
        let inner = self.inner.clone();
        let button_ref = button.clone();
        let click = Closure::<dyn FnMut(MouseEvent)>::wrap(Box::new(move |_| {
            wasm_bindgen_futures::spawn_local(export::run(inner.clone(), button_ref.clone()));
        }));
        button.add_event_listener_with_callback("click", click.as_ref().unchecked_ref())?;
        click.forget();
        Ok(())
    }

    /// Register the outbound notification callback. Called as
    /// `(eventName, jsonPayload)` for every stack event; fire-and-forget.
    pub fn set_notify(&self, callback: js_sys::Function) {
        *self.inner.borrow().notify.borrow_mut() = Some(callback);
    }

    // ─── Store operations exposed to the host ────────────────────────────

    /// Create a layer at a percent position over the background box.
    /// Returns the new layer's id.
    #[allow(clippy::too_many_arguments)]
    pub fn create_layer_at(
        &self,
        x_percent: f64,
        y_percent: f64,
        src: &str,
        alt: &str,
        handle: &str,
        index: usize,
    ) -> Option<String> {
        let payload = DragPayload {
            src: src.to_string(),
            handle: handle.to_string(),
            index: index.to_string(),
        };
        let mut composer = self.inner.borrow_mut();
        // An explicit alt wins over whatever the palette match carries.
        let id = composer.create_layer(x_percent, y_percent, &payload)?;
        if !alt.is_empty()
            && let Some(el) = composer.dom.layer_element(id)
            && let Ok(Some(img)) = el.query_selector("img")
        {
            let _ = img.set_attribute("alt", alt);
        }
        Some(id.to_string())
    }

    /// Select a layer by id (empty string clears the selection).
    pub fn select_layer(&self, layer_id: &str) -> bool {
        let mut composer = self.inner.borrow_mut();
        if layer_id.is_empty() {
            composer.select(None);
            return true;
        }
        let id = LayerId::intern(layer_id);
        let live = composer.stack.layer(id).is_some();
        composer.select(live.then_some(id));
        live
    }

    /// Currently selected layer id, or empty string.
    pub fn selected_layer_id(&self) -> String {
        self.inner
            .borrow()
            .stack
            .selected()
            .map(|id| id.to_string())
            .unwrap_or_default()
    }

    pub fn layer_count(&self) -> usize {
        self.inner.borrow().stack.len()
    }

    /// Delete the current selection. No-op without one.
    pub fn delete_current(&self) -> bool {
        let mut composer = self.inner.borrow_mut();
        let had = composer.stack.selected().is_some();
        composer.dispatch_toolbar(ToolbarAction::Delete);
        had
    }

    pub fn rotate_left(&self) {
        self.inner
            .borrow_mut()
            .dispatch_toolbar(ToolbarAction::RotateLeft);
    }

    pub fn rotate_right(&self) {
        self.inner
            .borrow_mut()
            .dispatch_toolbar(ToolbarAction::RotateRight);
    }

    pub fn move_backward(&self) {
        self.inner
            .borrow_mut()
            .dispatch_toolbar(ToolbarAction::SendBackward);
    }

    pub fn move_forward(&self) {
        self.inner
            .borrow_mut()
            .dispatch_toolbar(ToolbarAction::BringForward);
    }

    /// Current layers as a JSON array (id, source, geometry, z-order) —
    /// lets a host snapshot the design without scraping the DOM.
    pub fn layers_json(&self) -> String {
        let composer = self.inner.borrow();
        let layers: Vec<serde_json::Value> = composer
            .stack
            .layers()
            .iter()
            .enumerate()
            .map(|(i, layer)| {
                serde_json::json!({
                    "layerId": layer.id.to_string(),
                    "src": layer.src,
                    "handle": layer.handle,
                    "index": layer.source_index,
                    "offsetX": layer.placement.offset.x,
                    "offsetY": layer.placement.offset.y,
                    "rotation": layer.placement.rotation,
                    "height": layer.height,
                    "width": layer.width,
                    "zIndex": i + 1,
                })
            })
            .collect();
        serde_json::to_string(&layers).unwrap_or_else(|_| "[]".to_string())
    }
}

// ─── Event wiring ────────────────────────────────────────────────────────

fn build_toolbar(inner: &Rc<RefCell<Composer>>) -> Result<(), JsValue> {
    let composer = inner.borrow();
    let document = composer.dom.document().clone();
    let preview = composer.dom.preview().clone();
    let toolbar_el = composer.dom.toolbar_el().clone();
    drop(composer);

    for action in ToolbarAction::ALL {
        let button = dom::create_html(&document, "button")?;
        button.set_attribute("type", "button")?;
        button.set_title(action.title());

        let icon_key = match action {
            ToolbarAction::Delete => ("deleteIcon", "./x-icon.svg"),
            ToolbarAction::RotateLeft => ("rotateLeftIcon", "./rotate-left.svg"),
            ToolbarAction::RotateRight => ("rotateRightIcon", "./rotate-right.svg"),
            ToolbarAction::SendBackward => ("backwardIcon", "./send-backward.svg"),
            ToolbarAction::BringForward => ("forwardIcon", "./bring-forward.svg"),
        };
        let icon_url = preview.dataset().get(icon_key.0).unwrap_or_else(|| icon_key.1.to_string());
        button.set_inner_html(&format!(
            r#"<span class="icon" aria-hidden="true"><img src="{icon_url}" width="18" height="18" alt=""></span>"#
        ));

        let inner = inner.clone();
        let click = Closure::<dyn FnMut(MouseEvent)>::wrap(Box::new(move |e: MouseEvent| {
            e.stop_propagation();
            inner.borrow_mut().dispatch_toolbar(action);
        }));
        button.add_event_listener_with_callback("click", click.as_ref().unchecked_ref())?;
        click.forget();

        toolbar_el.append_child(&button)?;
    }
    Ok(())
}

fn wire_preview(inner: &Rc<RefCell<Composer>>) -> Result<(), JsValue> {
    let preview = inner.borrow().dom.preview().clone();

    {
        let inner = inner.clone();
        let dragover = Closure::<dyn FnMut(DragEvent)>::wrap(Box::new(move |e: DragEvent| {
            inner.borrow_mut().on_drag_over(&e);
        }));
        preview.add_event_listener_with_callback("dragover", dragover.as_ref().unchecked_ref())?;
        dragover.forget();
    }
    {
        let inner = inner.clone();
        let dragleave = Closure::<dyn FnMut(DragEvent)>::wrap(Box::new(move |_| {
            inner.borrow_mut().on_drag_leave();
        }));
        preview.add_event_listener_with_callback("dragleave", dragleave.as_ref().unchecked_ref())?;
        dragleave.forget();
    }
    {
        let inner = inner.clone();
        let drop = Closure::<dyn FnMut(DragEvent)>::wrap(Box::new(move |e: DragEvent| {
            inner.borrow_mut().on_drop(&e);
        }));
        preview.add_event_listener_with_callback("drop", drop.as_ref().unchecked_ref())?;
        drop.forget();
    }
    Ok(())
}

fn wire_window(inner: &Rc<RefCell<Composer>>) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;

    {
        let inner = inner.clone();
        let pointermove = Closure::<dyn FnMut(PointerEvent)>::wrap(Box::new(move |e| {
            inner.borrow_mut().on_pointer_move(&e);
        }));
        window
            .add_event_listener_with_callback("pointermove", pointermove.as_ref().unchecked_ref())?;
        pointermove.forget();
    }
    {
        let inner = inner.clone();
        let pointerup = Closure::<dyn FnMut(PointerEvent)>::wrap(Box::new(move |e| {
            inner.borrow_mut().on_pointer_up(&e);
        }));
        window.add_event_listener_with_callback("pointerup", pointerup.as_ref().unchecked_ref())?;
        pointerup.forget();
    }
    {
        let inner = inner.clone();
        let dragend = Closure::<dyn FnMut(DragEvent)>::wrap(Box::new(move |_| {
            inner.borrow_mut().on_drag_end();
        }));
        window.add_event_listener_with_callback("dragend", dragend.as_ref().unchecked_ref())?;
        dragend.forget();
    }
    Ok(())
}

fn wire_document(inner: &Rc<RefCell<Composer>>) -> Result<(), JsValue> {
    let composer = inner.borrow();
    let document = composer.dom.document().clone();
    let preview = composer.dom.preview().clone();
    drop(composer);

    {
        let inner = inner.clone();
        let click = Closure::<dyn FnMut(MouseEvent)>::wrap(Box::new(move |e: MouseEvent| {
            let outside = e
                .target()
                .and_then(|t| t.dyn_into::<web_sys::Node>().ok())
                .map(|node| !preview.contains(Some(&node)))
                .unwrap_or(true);
            if outside {
                inner.borrow_mut().select(None);
            }
        }));
        document.add_event_listener_with_callback("click", click.as_ref().unchecked_ref())?;
        click.forget();
    }
    {
        let inner = inner.clone();
        let keydown = Closure::<dyn FnMut(KeyboardEvent)>::wrap(Box::new(move |e: KeyboardEvent| {
            if e.key() == "Escape" {
                inner.borrow_mut().select(None);
            }
        }));
        document.add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref())?;
        keydown.forget();
    }
    Ok(())
}

fn wire_palette_button(
    inner: &Rc<RefCell<Composer>>,
    button: &HtmlElement,
    source: SourceItem,
) -> Result<(), JsValue> {
    {
        let button_ref = button.clone();
        let source = source.clone();
        let dragstart = Closure::<dyn FnMut(DragEvent)>::wrap(Box::new(move |e: DragEvent| {
            let Some(dt) = e.data_transfer() else {
                return;
            };
            let _ = dt.set_data("text/plain", &source.src);
            // Some environments refuse custom types; the plain URL above
            // is already enough to resolve the drop.
            let _ = dt.set_data(MIME_HANDLE, &source.handle);
            let _ = dt.set_data(MIME_INDEX, &source.index.to_string());
            dt.set_effect_allowed("copy");
            if let Ok(Some(img)) = button_ref.query_selector("img")
                && let Ok(img) = img.dyn_into::<HtmlImageElement>()
            {
                dt.set_drag_image(&img, img.width() as i32 / 2, img.height() as i32 / 2);
            }
        }));
        button.add_event_listener_with_callback("dragstart", dragstart.as_ref().unchecked_ref())?;
        dragstart.forget();
    }
    {
        let inner = inner.clone();
        let index = source.index;
        let click = Closure::<dyn FnMut(MouseEvent)>::wrap(Box::new(move |_| {
            let composer = inner.borrow();
            for (s, el) in &composer.sources {
                let _ = el
                    .class_list()
                    .toggle_with_force("is-selected", s.index == index);
            }
        }));
        button.add_event_listener_with_callback("click", click.as_ref().unchecked_ref())?;
        click.forget();
    }
    Ok(())
}

fn wire_layer_element(inner: &Rc<RefCell<Composer>>, wrapper: &HtmlElement, id: LayerId) {
    {
        let inner = inner.clone();
        let pointerdown = Closure::<dyn FnMut(PointerEvent)>::wrap(Box::new(move |e| {
            inner.borrow_mut().on_layer_pointer_down(id, &e);
        }));
        let _ = wrapper
            .add_event_listener_with_callback("pointerdown", pointerdown.as_ref().unchecked_ref());
        pointerdown.forget();
    }
    {
        let inner = inner.clone();
        let click = Closure::<dyn FnMut(MouseEvent)>::wrap(Box::new(move |e: MouseEvent| {
            e.stop_propagation();
            inner.borrow_mut().select(Some(id));
        }));
        let _ = wrapper.add_event_listener_with_callback("click", click.as_ref().unchecked_ref());
        click.forget();
    }
}
