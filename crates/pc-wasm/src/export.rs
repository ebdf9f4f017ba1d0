//! PNG export of the composed preview.
//!
//! Rasterizes a deep clone of the preview subtree with html2canvas,
//! loaded lazily from a CDN on the first export and cached after. The
//! clone is stripped of the toolbar, the ghost, and the export control so
//! only the background and the live layers end up in the image.

use crate::Composer;
use js_sys::{Function, Object, Promise, Reflect};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    Blob, Document, HtmlAnchorElement, HtmlButtonElement, HtmlCanvasElement, HtmlElement,
    HtmlScriptElement, Url,
};

const HTML2CANVAS_URL: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/html2canvas/1.4.1/html2canvas.min.js";

/// Run one export pass: disable the trigger, rasterize, download, restore.
/// Re-entrant clicks while an export is in flight are ignored.
pub(crate) async fn run(inner: Rc<RefCell<Composer>>, button: HtmlButtonElement) {
    {
        let mut composer = inner.borrow_mut();
        if composer.exporting {
            return;
        }
        composer.exporting = true;
    }
    let original_label = button.text_content().unwrap_or_default();
    button.set_disabled(true);
    button.set_text_content(Some("Exporting..."));

    if let Err(err) = export_png(&inner).await {
        log::error!("export failed: {err:?}");
        if let Some(window) = web_sys::window() {
            let _ = window.alert_with_message("Could not export the image. Please try again.");
        }
    }

    button.set_disabled(false);
    button.set_text_content(Some(&original_label));
    inner.borrow_mut().exporting = false;
}

async fn export_png(inner: &Rc<RefCell<Composer>>) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    // Snapshot everything needed up front; the cell must not stay
    // borrowed across an await.
    let (preview, scale, background) = {
        let composer = inner.borrow();
        let config = composer.stack.config();
        (
            composer.dom.preview().clone(),
            config.export_scale,
            config.export_background,
        )
    };

    let cached = inner.borrow().rasterizer.clone();
    let rasterizer = match cached {
        Some(f) => f,
        None => {
            let f = load_rasterizer(&window, &document).await?;
            inner.borrow_mut().rasterizer = Some(f.clone());
            f
        }
    };

    let clone = preview
        .clone_node_with_deep(true)?
        .dyn_into::<HtmlElement>()
        .map_err(|_| JsValue::from_str("clone is not an element"))?;
    for selector in [".pc-toolbar", "[data-pc-export]", ".pc-ghost"] {
        if let Some(el) = clone.query_selector(selector)? {
            el.remove();
        }
    }

    let body = document.body().ok_or_else(|| JsValue::from_str("no body"))?;
    let holder = crate::dom::create_html(&document, "div")?;
    let style = holder.style();
    style.set_property("position", "fixed")?;
    style.set_property("left", "-10000px")?;
    style.set_property("top", "0")?;
    style.set_property("z-index", "-1")?;
    holder.append_child(&clone)?;
    body.append_child(&holder)?;

    let options = Object::new();
    Reflect::set(&options, &"allowTaint".into(), &JsValue::TRUE)?;
    Reflect::set(&options, &"useCORS".into(), &JsValue::TRUE)?;
    Reflect::set(
        &options,
        &"backgroundColor".into(),
        &JsValue::from_str(background),
    )?;
    Reflect::set(&options, &"scale".into(), &JsValue::from_f64(scale))?;

    // The staging holder must come out of the DOM whether or not the
    // rasterizer succeeds.
    let rendered = match rasterizer.call2(&JsValue::NULL, &clone, &options) {
        Ok(value) => match value.dyn_into::<Promise>() {
            Ok(promise) => JsFuture::from(promise).await,
            Err(other) => Err(other),
        },
        Err(err) => Err(err),
    };
    holder.remove();
    let canvas = rendered?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| JsValue::from_str("rasterizer did not produce a canvas"))?;

    let blob = canvas_to_blob(&canvas).await?;
    let url = Url::create_object_url_with_blob(&blob)?;
    let anchor = document
        .create_element("a")?
        .dyn_into::<HtmlAnchorElement>()
        .map_err(|_| JsValue::from_str("anchor element"))?;
    anchor.set_href(&url);
    anchor.set_download(&format!("custom-hat-{}.png", js_sys::Date::now() as u64));
    body.append_child(&anchor)?;
    anchor.click();
    anchor.remove();
    Url::revoke_object_url(&url)?;

    log::info!("exported composition to PNG");
    Ok(())
}

async fn canvas_to_blob(canvas: &HtmlCanvasElement) -> Result<Blob, JsValue> {
    let promise = Promise::new(&mut |resolve, reject| {
        let reject_for_null = reject.clone();
        let callback = Closure::once(move |blob: Option<Blob>| match blob {
            Some(blob) => {
                let _ = resolve.call1(&JsValue::NULL, &blob);
            }
            None => {
                let _ = reject_for_null
                    .call1(&JsValue::NULL, &JsValue::from_str("toBlob returned null"));
            }
        });
        if let Err(err) = canvas.to_blob(callback.as_ref().unchecked_ref()) {
            let _ = reject.call1(&JsValue::NULL, &err);
        }
        callback.forget();
    });
    JsFuture::from(promise)
        .await?
        .dyn_into::<Blob>()
        .map_err(|_| JsValue::from_str("toBlob produced a non-blob"))
}

/// Resolve the html2canvas entry point, injecting its script tag on first
/// use. A global left by a host page's own copy is reused as-is.
async fn load_rasterizer(
    window: &web_sys::Window,
    document: &Document,
) -> Result<Function, JsValue> {
    if let Some(f) = global_rasterizer(window) {
        return Ok(f);
    }

    let script = document
        .create_element("script")?
        .dyn_into::<HtmlScriptElement>()
        .map_err(|_| JsValue::from_str("script element"))?;
    script.set_src(HTML2CANVAS_URL);

    let loaded = Promise::new(&mut |resolve, reject| {
        let on_load = Closure::once(move |_: web_sys::Event| {
            let _ = resolve.call0(&JsValue::NULL);
        });
        let on_error = Closure::once(move |_: web_sys::Event| {
            let _ = reject.call1(
                &JsValue::NULL,
                &JsValue::from_str("rasterizer script failed to load"),
            );
        });
        script.set_onload(Some(on_load.as_ref().unchecked_ref()));
        script.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        on_load.forget();
        on_error.forget();
    });
    document
        .body()
        .ok_or_else(|| JsValue::from_str("no body"))?
        .append_child(&script)?;
    JsFuture::from(loaded).await?;

    global_rasterizer(window).ok_or_else(|| JsValue::from_str("rasterizer global missing after load"))
}

fn global_rasterizer(window: &web_sys::Window) -> Option<Function> {
    Reflect::get(window.as_ref(), &JsValue::from_str("html2canvas"))
        .ok()
        .and_then(|v| v.dyn_into::<Function>().ok())
}
