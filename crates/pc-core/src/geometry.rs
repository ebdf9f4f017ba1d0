//! Placement math for layers over the background image.
//!
//! A layer's geometry is stored as a pixel offset from the background's
//! center plus a rotation in degrees. The rendered transform composes
//! center-anchor → offset → rotate, in that fixed order, so rotation always
//! happens about the layer's own center regardless of where it sits.

use kurbo::{Size, Vec2};

/// A layer's stored geometry: center-relative pixel offset + rotation.
///
/// Offset and rotation are independent fields. Each setter read-modify-
/// writes only its own field; the full transform is recomputed from both.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Placement {
    /// Pixel offset of the layer's center from the background's center.
    /// Relative to the background's rendered size, not its container.
    pub offset: Vec2,
    /// Rotation in degrees, always normalized to `[0, 360)`.
    pub rotation: f64,
}

impl Placement {
    /// Placement at the background center, unrotated.
    pub fn centered() -> Self {
        Self::default()
    }

    /// Replace the offset, leaving rotation untouched.
    pub fn set_offset(&mut self, offset: Vec2) {
        self.offset = offset;
    }

    /// Add `delta` degrees, normalizing the result into `[0, 360)`.
    /// Returns the new absolute angle.
    pub fn rotate_by(&mut self, delta: f64) -> f64 {
        self.rotation = (self.rotation + delta).rem_euclid(360.0);
        self.rotation
    }

    /// The CSS transform for this placement.
    ///
    /// `translate(-50%, -50%)` anchors the element's center on its
    /// `left/top: 50%` position, then the pixel offset moves it, then the
    /// rotation spins it about its own center.
    pub fn to_css_transform(&self) -> String {
        format!(
            "translate(-50%, -50%) translate({}px, {}px) rotate({}deg)",
            self.offset.x, self.offset.y, self.rotation
        )
    }
}

/// Convert a percent position over the background box to a center-relative
/// pixel offset. `(50, 50)` maps to `(0, 0)`. Rounded to whole pixels.
pub fn percent_to_offset(x_percent: f64, y_percent: f64, background: Size) -> Vec2 {
    let left_px = (x_percent / 100.0) * background.width;
    let top_px = (y_percent / 100.0) * background.height;
    Vec2::new(
        (left_px - background.width / 2.0).round(),
        (top_px - background.height / 2.0).round(),
    )
}

/// Convert a center-relative pixel offset back to a percent position over
/// the background box. Inverse of [`percent_to_offset`] up to rounding.
pub fn offset_to_percent(offset: Vec2, background: Size) -> (f64, f64) {
    if background.width <= 0.0 || background.height <= 0.0 {
        return (50.0, 50.0);
    }
    let center_x = background.width / 2.0 + offset.x;
    let center_y = background.height / 2.0 + offset.y;
    (
        (center_x / background.width) * 100.0,
        (center_y / background.height) * 100.0,
    )
}

/// Clamp an offset so the layer's box stays fully inside the background.
///
/// Per axis the offset is kept within `[half - bgHalf, bgHalf - half]`
/// where `half` is the layer's half-extent. The upper bound is applied
/// first, so a layer larger than the background resolves to the lower
/// bound rather than oscillating.
pub fn clamp_offset(offset: Vec2, layer: Size, background: Size) -> Vec2 {
    let half_w = layer.width / 2.0;
    let half_h = layer.height / 2.0;
    let bg_half_w = background.width / 2.0;
    let bg_half_h = background.height / 2.0;

    let min_x = half_w - bg_half_w;
    let max_x = bg_half_w - half_w;
    let min_y = half_h - bg_half_h;
    let max_y = bg_half_h - half_h;

    Vec2::new(
        offset.x.min(max_x).max(min_x),
        offset.y.min(max_y).max(min_y),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn transform_composes_anchor_offset_rotation_in_order() {
        let mut p = Placement::centered();
        p.set_offset(Vec2::new(12.0, -30.0));
        p.rotate_by(45.0);
        assert_eq!(
            p.to_css_transform(),
            "translate(-50%, -50%) translate(12px, -30px) rotate(45deg)"
        );
    }

    #[test]
    fn offset_and_rotation_are_independent() {
        let mut p = Placement::centered();
        p.rotate_by(90.0);
        p.set_offset(Vec2::new(5.0, 5.0));
        assert_eq!(p.rotation, 90.0, "setting offset must not reset rotation");
        p.rotate_by(15.0);
        assert_eq!(p.offset, Vec2::new(5.0, 5.0), "rotating must not reset offset");
    }

    #[test]
    fn rotation_stays_in_range() {
        let mut p = Placement::centered();
        assert_eq!(p.rotate_by(-15.0), 345.0);
        assert_eq!(p.rotate_by(30.0), 15.0);
        assert_eq!(p.rotate_by(360.0), 15.0);
        assert_eq!(p.rotate_by(-360.0 * 3.0), 15.0);
    }

    #[test]
    fn rotate_accumulates_mod_360() {
        let mut p = Placement::centered();
        for _ in 0..30 {
            let r = p.rotate_by(15.0);
            assert!((0.0..360.0).contains(&r), "angle {r} out of [0, 360)");
        }
        assert_eq!(p.rotation, (30.0 * 15.0_f64).rem_euclid(360.0));
    }

    #[test]
    fn center_percent_maps_to_zero_offset() {
        let bg = Size::new(300.0, 300.0);
        let off = percent_to_offset(50.0, 50.0, bg);
        assert_eq!(off, Vec2::ZERO);
        assert_eq!(offset_to_percent(off, bg), (50.0, 50.0));
    }

    #[test]
    fn percent_roundtrip_off_center() {
        let bg = Size::new(400.0, 200.0);
        let off = percent_to_offset(25.0, 75.0, bg);
        assert_eq!(off, Vec2::new(-100.0, 50.0));
        let (x, y) = offset_to_percent(off, bg);
        assert_eq!((x, y), (25.0, 75.0));
    }

    #[test]
    fn offset_to_percent_degrades_to_center_without_box() {
        assert_eq!(
            offset_to_percent(Vec2::new(40.0, 40.0), Size::ZERO),
            (50.0, 50.0)
        );
    }

    #[test]
    fn clamp_keeps_layer_inside_background() {
        let bg = Size::new(400.0, 300.0);
        let layer = Size::new(100.0, 80.0);
        // Far outside on both axes
        let clamped = clamp_offset(Vec2::new(500.0, -500.0), layer, bg);
        assert_eq!(clamped, Vec2::new(150.0, -110.0));
        // Already inside: untouched
        let inside = Vec2::new(10.0, -20.0);
        assert_eq!(clamp_offset(inside, layer, bg), inside);
    }

    #[test]
    fn clamp_oversized_layer_resolves_to_lower_bound() {
        let bg = Size::new(100.0, 100.0);
        let layer = Size::new(300.0, 300.0);
        let clamped = clamp_offset(Vec2::ZERO, layer, bg);
        assert_eq!(clamped, Vec2::new(100.0, 100.0));
    }
}
