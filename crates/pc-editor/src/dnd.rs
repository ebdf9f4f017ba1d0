//! External drag-and-drop: palette thumbnail → preview area.
//!
//! The drag payload travels as DataTransfer entries (`text/plain` carries
//! the image URL plus two custom types for handle and palette index). Some
//! environments strip custom types, so resolution falls back to fishing an
//! image URL out of HTML-typed drag data; if that fails too, the drop is a
//! silent no-op.
//!
//! While a drag is over the preview, exactly one ghost — a non-committed
//! preview sized by the same ratio rule as real layers — tracks the
//! pointer. It is destroyed on drop, drag-leave, or drag-end; only a drop
//! commits a real layer.

use pc_core::{Background, ComposerConfig, SourceItem, Vec2, initial_height, percent_to_offset};

/// Custom DataTransfer type carrying the palette handle.
pub const MIME_HANDLE: &str = "text/x-pc-handle";
/// Custom DataTransfer type carrying the palette index.
pub const MIME_INDEX: &str = "text/x-pc-index";

// ─── Payload ─────────────────────────────────────────────────────────────

/// The transferable identity of a dragged palette item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragPayload {
    pub src: String,
    pub handle: String,
    pub index: String,
}

impl DragPayload {
    /// Resolve a payload from the strings read back from a DataTransfer.
    ///
    /// `plain` is the `text/plain` entry, `handle`/`index` the custom
    /// types, `html` the `text/html` entry used as a fallback when the
    /// environment stripped the custom data. Returns `None` when no image
    /// URL can be recovered — the caller treats that as "no drop occurred".
    pub fn resolve(plain: &str, handle: &str, index: &str, html: &str) -> Option<Self> {
        if !plain.is_empty() {
            return Some(Self {
                src: plain.to_string(),
                handle: handle.to_string(),
                index: index.to_string(),
            });
        }
        extract_image_url(html).map(|src| Self {
            src,
            handle: String::new(),
            index: String::new(),
        })
    }
}

/// Best-effort extraction of the first `src="…"` / `src='…'` attribute
/// value from HTML-typed drag data.
pub fn extract_image_url(html: &str) -> Option<String> {
    let start = html.find("src=")? + "src=".len();
    let rest = &html[start..];
    let quote = rest.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let inner = &rest[quote.len_utf8()..];
    let end = inner.find(quote)?;
    let url = &inner[..end];
    if url.is_empty() { None } else { Some(url.to_string()) }
}

// ─── Ghost & drop state machine ──────────────────────────────────────────

/// The ephemeral drag preview. Carries no persisted identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Ghost {
    pub src: String,
    /// Height from the same ratio rule as real layers.
    pub height: f64,
    /// Last tracked pointer position as percent of the background box,
    /// clamped to `[0, 100]` so the ghost's center stays inside.
    pub x_percent: f64,
    pub y_percent: f64,
    /// Center-relative pixel offset derived from the percent position.
    pub offset: Vec2,
}

/// What the DOM projection must do after a drag-over sample.
#[derive(Debug, Clone, PartialEq)]
pub enum GhostEffect {
    /// No usable payload — nothing to show.
    None,
    /// A new ghost (first sight of this source): build its element, then
    /// position it.
    Create,
    /// Same ghost as before: just reposition.
    Move,
}

/// Owns the at-most-one ghost and resolves drops into final coordinates.
#[derive(Default)]
pub struct DropController {
    ghost: Option<Ghost>,
}

impl DropController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ghost(&self) -> Option<&Ghost> {
        self.ghost.as_ref()
    }

    /// Handle a drag-over sample. `pointer` is the pointer position
    /// relative to the background box's top-left corner; `source` is the
    /// palette item matched from the payload, if any (it contributes the
    /// physical height for ghost sizing).
    ///
    /// Idempotent at event frequency: state is only the single ghost.
    pub fn drag_over(
        &mut self,
        payload_src: &str,
        source: Option<&SourceItem>,
        background: Option<&Background>,
        pointer: (f64, f64),
        config: &ComposerConfig,
    ) -> GhostEffect {
        if payload_src.is_empty() {
            return GhostEffect::None;
        }

        let replaced = match &self.ghost {
            Some(ghost) => ghost.src != payload_src,
            None => true,
        };
        if replaced {
            let height = initial_height(
                source.and_then(|s| s.physical_height),
                background.and_then(|bg| bg.physical_height),
                background.map(|bg| bg.rendered.height).unwrap_or(0.0),
                config,
            );
            self.ghost = Some(Ghost {
                src: payload_src.to_string(),
                height,
                x_percent: 50.0,
                y_percent: 50.0,
                offset: Vec2::ZERO,
            });
        }

        if let Some(bg) = background
            && bg.rendered.width > 0.0
            && bg.rendered.height > 0.0
        {
            let x_percent = (pointer.0 / bg.rendered.width).clamp(0.0, 1.0) * 100.0;
            let y_percent = (pointer.1 / bg.rendered.height).clamp(0.0, 1.0) * 100.0;
            let offset = percent_to_offset(x_percent, y_percent, bg.rendered);
            if let Some(ghost) = self.ghost.as_mut() {
                ghost.x_percent = x_percent;
                ghost.y_percent = y_percent;
                ghost.offset = offset;
            }
        }

        if replaced { GhostEffect::Create } else { GhostEffect::Move }
    }

    /// Resolve a drop into final percent coordinates and destroy the
    /// ghost. Prefers the ghost's last tracked position; falls back to the
    /// raw event position when no ghost was ever shown. `None` means no
    /// coordinates could be resolved — no layer is created.
    pub fn drop(
        &mut self,
        background: Option<&Background>,
        pointer: Option<(f64, f64)>,
    ) -> Option<(f64, f64)> {
        if let Some(ghost) = self.ghost.take() {
            log::debug!(
                "drop resolved from ghost at ({:.1}%, {:.1}%)",
                ghost.x_percent,
                ghost.y_percent
            );
            return Some((ghost.x_percent, ghost.y_percent));
        }
        let bg = background?;
        let (px, py) = pointer?;
        if bg.rendered.width <= 0.0 || bg.rendered.height <= 0.0 {
            return None;
        }
        Some((
            (px / bg.rendered.width).clamp(0.0, 1.0) * 100.0,
            (py / bg.rendered.height).clamp(0.0, 1.0) * 100.0,
        ))
    }

    /// Drag left the preview, or the drag ended anywhere without a drop:
    /// destroy the ghost, commit nothing.
    pub fn clear(&mut self) -> bool {
        self.ghost.take().is_some()
    }
}
