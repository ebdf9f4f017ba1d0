//! DOM projection of the layer stack.
//!
//! Every element here is a derived view regenerated from the in-memory
//! `Layer` records — geometry is written into the DOM, never read back out
//! of it. The live background `<img>` box is the one thing measured from
//! the viewport, so positions stay correct across resizes.

use pc_core::{Background, Layer, LayerId, LayerStack, Point, Rect, Size, Vec2};
use std::collections::HashMap;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlElement, HtmlImageElement};

const LAYER_CLASS: &str = "pc-layer-wrapper";
const LAYER_IMG_CLASS: &str = "pc-layer-img";
const GHOST_CLASS: &str = "pc-ghost";
const SELECTED_CLASS: &str = "is-selected";
const DRAGOVER_CLASS: &str = "is-dragover";

/// Owns the preview subtree: the layers container, one element per live
/// layer, the optional ghost, and the floating toolbar element.
pub struct DomProjection {
    document: Document,
    preview: HtmlElement,
    background: HtmlImageElement,
    layers_el: HtmlElement,
    toolbar_el: HtmlElement,
    elements: HashMap<LayerId, HtmlElement>,
    ghost_el: Option<HtmlElement>,
}

impl DomProjection {
    pub fn new(
        document: Document,
        preview: HtmlElement,
        background: HtmlImageElement,
    ) -> Result<Self, JsValue> {
        let layers_el = match preview.query_selector(".pc-layers")? {
            Some(el) => el.dyn_into::<HtmlElement>()?,
            None => {
                let el = create_html(&document, "div")?;
                el.set_class_name("pc-layers");
                preview.append_child(&el)?;
                el
            }
        };

        let toolbar_el = create_html(&document, "div")?;
        toolbar_el.set_class_name("pc-toolbar");
        toolbar_el.style().set_property("display", "none")?;
        preview.append_child(&toolbar_el)?;

        Ok(Self {
            document,
            preview,
            background,
            layers_el,
            toolbar_el,
            elements: HashMap::new(),
            ghost_el: None,
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn preview(&self) -> &HtmlElement {
        &self.preview
    }

    pub fn toolbar_el(&self) -> &HtmlElement {
        &self.toolbar_el
    }

    // ─── Background measurement ──────────────────────────────────────────

    /// Measure the background image's live box plus its physical-height
    /// metadata. `None` when the image has no layout yet — callers degrade
    /// per the measurement-failure rules instead of guessing.
    pub fn background_model(&self) -> Option<Background> {
        let rect = self.background.get_bounding_client_rect();
        if rect.width() <= 0.0 || rect.height() <= 0.0 {
            return None;
        }
        let physical = self
            .background
            .dataset()
            .get("height")
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| *v > 0.0);
        Some(Background::new(
            Size::new(rect.width(), rect.height()),
            physical,
        ))
    }

    /// The background box in page coordinates.
    pub fn background_rect(&self) -> Option<Rect> {
        let rect = self.background.get_bounding_client_rect();
        if rect.width() <= 0.0 || rect.height() <= 0.0 {
            return None;
        }
        Some(Rect::new(
            rect.left(),
            rect.top(),
            rect.left() + rect.width(),
            rect.top() + rect.height(),
        ))
    }

    /// A live layer element's box in page coordinates.
    pub fn layer_rect(&self, id: LayerId) -> Option<Rect> {
        let el = self.elements.get(&id)?;
        let rect = el.get_bounding_client_rect();
        Some(Rect::new(
            rect.left(),
            rect.top(),
            rect.left() + rect.width(),
            rect.top() + rect.height(),
        ))
    }

    // ─── Layer elements ──────────────────────────────────────────────────

    /// Materialize a layer record as a wrapper + image element appended to
    /// the top of the layers container. Returns the wrapper for event
    /// wiring.
    pub fn insert_layer(&mut self, layer: &Layer) -> Result<HtmlElement, JsValue> {
        let wrapper = create_html(&self.document, "div")?;
        wrapper.set_class_name(LAYER_CLASS);
        wrapper.dataset().set("layerId", layer.id.as_str())?;
        wrapper.style().set_property("left", "50%")?;
        wrapper.style().set_property("top", "50%")?;
        self.apply_geometry(&wrapper, layer)?;

        let img = create_html(&self.document, "img")?
            .dyn_into::<HtmlImageElement>()
            .map_err(|_| JsValue::from_str("img element"))?;
        img.set_class_name(LAYER_IMG_CLASS);
        img.set_src(&layer.src);
        img.set_alt(&layer.alt);
        wrapper.append_child(&img)?;

        self.layers_el.append_child(&wrapper)?;
        self.elements.insert(layer.id, wrapper.clone());
        Ok(wrapper)
    }

    /// Re-apply a layer's geometry to its element (after a drag sample or
    /// width refinement).
    pub fn update_layer(&self, layer: &Layer) -> Result<(), JsValue> {
        if let Some(el) = self.elements.get(&layer.id) {
            self.apply_geometry(el, layer)?;
        }
        Ok(())
    }

    fn apply_geometry(&self, el: &HtmlElement, layer: &Layer) -> Result<(), JsValue> {
        let style = el.style();
        style.set_property("transform", &layer.placement.to_css_transform())?;
        style.set_property("height", &format!("{}px", layer.height))?;
        match layer.width {
            Some(width) => style.set_property("width", &format!("{width}px"))?,
            None => style.set_property("width", "auto")?,
        }
        Ok(())
    }

    /// Drop a deleted layer's element.
    pub fn remove_layer(&mut self, id: LayerId) {
        if let Some(el) = self.elements.remove(&id) {
            el.remove();
        }
    }

    /// Re-derive DOM order and z-indexes from the stack order. Called
    /// after every structural change so stacking can never desynchronize.
    pub fn sync_order(&self, stack: &LayerStack) -> Result<(), JsValue> {
        for (i, layer) in stack.layers().iter().enumerate() {
            if let Some(el) = self.elements.get(&layer.id) {
                // Re-appending an attached node moves it to the end.
                self.layers_el.append_child(el)?;
                el.style().set_property("z-index", &(i + 1).to_string())?;
            }
        }
        Ok(())
    }

    /// Reflect the stack's single selection as the `is-selected` class.
    pub fn set_selected(&self, selected: Option<LayerId>) {
        for (id, el) in &self.elements {
            let on = Some(*id) == selected;
            let _ = el.class_list().toggle_with_force(SELECTED_CLASS, on);
        }
    }

    // ─── Ghost ───────────────────────────────────────────────────────────

    /// Build the single drag ghost, replacing any previous one.
    pub fn create_ghost(&mut self, src: &str, height: f64) -> Result<HtmlElement, JsValue> {
        self.destroy_ghost();
        let ghost = create_html(&self.document, "div")?;
        ghost.set_class_name(&format!("{LAYER_CLASS} {GHOST_CLASS}"));
        ghost.style().set_property("left", "50%")?;
        ghost.style().set_property("top", "50%")?;
        ghost.style().set_property("height", &format!("{height}px"))?;

        let img = create_html(&self.document, "img")?
            .dyn_into::<HtmlImageElement>()
            .map_err(|_| JsValue::from_str("img element"))?;
        img.set_class_name(LAYER_IMG_CLASS);
        img.set_src(src);
        img.style().set_property("opacity", "0.85")?;
        ghost.append_child(&img)?;

        self.layers_el.append_child(&ghost)?;
        self.ghost_el = Some(ghost.clone());
        Ok(ghost)
    }

    /// Track the pointer: the ghost uses the same center-anchored
    /// transform as a real layer, minus rotation.
    pub fn move_ghost(&self, offset: Vec2) -> Result<(), JsValue> {
        if let Some(ghost) = &self.ghost_el {
            ghost.style().set_property(
                "transform",
                &format!(
                    "translate(-50%, -50%) translate({}px, {}px)",
                    offset.x, offset.y
                ),
            )?;
        }
        Ok(())
    }

    /// Aspect refinement for the ghost, mirroring real layers. Ignored if
    /// the ghost was already destroyed or replaced with another source.
    pub fn refine_ghost_width(&self, src: &str, width: f64) -> Result<(), JsValue> {
        if let Some(ghost) = &self.ghost_el
            && ghost
                .query_selector("img")?
                .and_then(|img| img.get_attribute("src"))
                .is_some_and(|attr| attr == src)
        {
            ghost.style().set_property("width", &format!("{width}px"))?;
        }
        Ok(())
    }

    pub fn destroy_ghost(&mut self) {
        if let Some(ghost) = self.ghost_el.take() {
            ghost.remove();
        }
    }

    pub fn set_dragover(&self, on: bool) {
        let _ = self.preview.class_list().toggle_with_force(DRAGOVER_CLASS, on);
    }

    // ─── Toolbar ─────────────────────────────────────────────────────────

    pub fn position_toolbar(&self, anchor: Point) -> Result<(), JsValue> {
        let style = self.toolbar_el.style();
        style.set_property("left", &format!("{}px", anchor.x))?;
        style.set_property("top", &format!("{}px", anchor.y))?;
        style.set_property("display", "flex")?;
        Ok(())
    }

    pub fn hide_toolbar(&self) {
        let _ = self.toolbar_el.style().set_property("display", "none");
    }

    /// Pointer capture plumbing: the wrapper element for a live layer.
    pub fn layer_element(&self, id: LayerId) -> Option<&HtmlElement> {
        self.elements.get(&id)
    }
}

pub(crate) fn create_html(document: &Document, tag: &str) -> Result<HtmlElement, JsValue> {
    document
        .create_element(tag)?
        .dyn_into::<HtmlElement>()
        .map_err(|_| JsValue::from_str("not an HtmlElement"))
}
