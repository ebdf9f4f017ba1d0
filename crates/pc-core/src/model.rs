//! Core data model: the background image, palette source items, and layers.
//!
//! A `Layer` is the in-memory record of one positioned patch; the DOM
//! element a host sees is a derived projection rebuilt from this record,
//! never the other way around.

use crate::config::ComposerConfig;
use crate::geometry::Placement;
use crate::id::LayerId;
use kurbo::Size;
use serde::{Deserialize, Serialize};

// ─── Background ──────────────────────────────────────────────────────────

/// The fixed base image layers are composed over. Owned by the host page;
/// read-only here. `rendered` is measured from the live viewport at each
/// use, so offsets stay correct across resizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Background {
    /// Current rendered pixel size of the background image.
    pub rendered: Size,
    /// Real-world height of the depicted product, if the host supplied it.
    pub physical_height: Option<f64>,
}

impl Background {
    pub fn new(rendered: Size, physical_height: Option<f64>) -> Self {
        Self {
            rendered,
            physical_height,
        }
    }
}

// ─── Source items ────────────────────────────────────────────────────────

/// A palette entry a layer can be instantiated from. Immutable for the
/// session; many layers may share one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceItem {
    /// Image URL of the patch.
    pub src: String,
    /// Display handle (e.g. `"patch-star"`).
    pub handle: String,
    /// Alt text carried onto created layer images.
    pub alt: String,
    /// Position of this item in the palette.
    pub index: usize,
    /// Real-world height of the patch, in the same units as the
    /// background's physical height.
    pub physical_height: Option<f64>,
}

// ─── Sizing ──────────────────────────────────────────────────────────────

/// Initial layer height from the physical-height ratio rule.
///
/// `round(rendered_height × patch/hat)` clamped to
/// `[min_patch_px, max_patch_px]`. Falls back to `default_patch_px` when
/// either physical height is missing or non-positive, or when the
/// background has not been laid out yet (zero rendered height).
pub fn initial_height(
    patch_physical: Option<f64>,
    hat_physical: Option<f64>,
    rendered_height: f64,
    config: &ComposerConfig,
) -> f64 {
    match (patch_physical, hat_physical) {
        (Some(patch), Some(hat)) if patch > 0.0 && hat > 0.0 && rendered_height > 0.0 => {
            let ratio = patch / hat;
            (rendered_height * ratio)
                .max(config.min_patch_px)
                .min(config.max_patch_px)
                .round()
        }
        _ => config.default_patch_px,
    }
}

// ─── Layers ──────────────────────────────────────────────────────────────

/// One positioned, rotatable patch image on top of the background.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: LayerId,

    /// Provenance: which palette item this layer came from. Host-side
    /// bookkeeping only — geometry never reads these.
    pub src: String,
    pub handle: String,
    pub alt: String,
    pub source_index: usize,

    /// Stored geometry (center-relative offset + rotation).
    pub placement: Placement,

    /// Height in pixels, fixed at creation.
    pub height: f64,

    /// Width in pixels once the image has decoded. `None` is the
    /// provisional phase — the layer renders square-ish until then.
    pub width: Option<f64>,
}

impl Layer {
    pub fn new(id: LayerId, source: &SourceItem, placement: Placement, height: f64) -> Self {
        Self {
            id,
            src: source.src.clone(),
            handle: source.handle.clone(),
            alt: source.alt.clone(),
            source_index: source.index,
            placement,
            height,
            width: None,
        }
    }

    /// Apply the intrinsic aspect ratio once the image has decoded.
    ///
    /// Second phase of the two-phase creation protocol: applied at most
    /// once, ignored if a width is already set or the ratio is unusable.
    /// Returns true if the width changed.
    pub fn refine_width(&mut self, aspect_ratio: f64) -> bool {
        if self.width.is_some() || !aspect_ratio.is_finite() || aspect_ratio <= 0.0 {
            return false;
        }
        self.width = Some((self.height * aspect_ratio).round());
        true
    }

    /// The layer's current box. While provisional the width is assumed
    /// equal to the height, matching the square-ish render.
    pub fn size(&self) -> Size {
        Size::new(self.width.unwrap_or(self.height), self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> ComposerConfig {
        ComposerConfig::default()
    }

    fn star_source() -> SourceItem {
        SourceItem {
            src: "https://cdn.example/star.png".into(),
            handle: "patch-star".into(),
            alt: "Star patch".into(),
            index: 0,
            physical_height: Some(2.0),
        }
    }

    #[test]
    fn ratio_sizing_scales_with_rendered_height() {
        // 2-unit patch on a 10-unit hat rendered at 400px → 80px.
        let h = initial_height(Some(2.0), Some(10.0), 400.0, &config());
        assert_eq!(h, 80.0);
    }

    #[test]
    fn sizing_clamps_to_bounds() {
        let cfg = config();
        assert_eq!(initial_height(Some(9.0), Some(10.0), 1000.0, &cfg), 500.0);
        assert_eq!(initial_height(Some(0.5), Some(10.0), 400.0, &cfg), 50.0);
    }

    #[test]
    fn sizing_defaults_without_physical_metadata() {
        let cfg = config();
        assert_eq!(initial_height(None, Some(10.0), 400.0, &cfg), 200.0);
        assert_eq!(initial_height(Some(2.0), None, 400.0, &cfg), 200.0);
        assert_eq!(initial_height(Some(2.0), Some(0.0), 400.0, &cfg), 200.0);
        // Background not laid out yet
        assert_eq!(initial_height(Some(2.0), Some(10.0), 0.0, &cfg), 200.0);
    }

    #[test]
    fn refine_width_applies_exactly_once() {
        let source = star_source();
        let mut layer = Layer::new(LayerId::generate(), &source, Placement::centered(), 80.0);
        assert_eq!(layer.size(), Size::new(80.0, 80.0), "provisional square");

        assert!(layer.refine_width(1.5));
        assert_eq!(layer.width, Some(120.0));

        // Later decode callbacks must not overwrite the refined width
        assert!(!layer.refine_width(2.0));
        assert_eq!(layer.width, Some(120.0));
    }

    #[test]
    fn refine_width_rejects_unusable_ratios() {
        let source = star_source();
        let mut layer = Layer::new(LayerId::generate(), &source, Placement::centered(), 80.0);
        assert!(!layer.refine_width(0.0));
        assert!(!layer.refine_width(f64::NAN));
        assert_eq!(layer.width, None);
    }
}
