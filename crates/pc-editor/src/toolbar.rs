//! Floating contextual toolbar for the current selection.
//!
//! Pure view state: the toolbar holds no composition data, only which
//! layer it is currently shown for. Anchor positions are computed against
//! the background image's bounding box so the toolbar stays correctly
//! placed regardless of page scroll or zoom.

use pc_core::{ComposerConfig, LayerId, Point, Rect};

/// The five actions the toolbar exposes, wired to stack operations by the
/// bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarAction {
    Delete,
    RotateLeft,
    RotateRight,
    SendBackward,
    BringForward,
}

impl ToolbarAction {
    pub const ALL: [ToolbarAction; 5] = [
        ToolbarAction::Delete,
        ToolbarAction::RotateLeft,
        ToolbarAction::RotateRight,
        ToolbarAction::SendBackward,
        ToolbarAction::BringForward,
    ];

    /// Hover title for the action's button.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Delete => "Delete layer",
            Self::RotateLeft => "Rotate left",
            Self::RotateRight => "Rotate right",
            Self::SendBackward => "Send backward",
            Self::BringForward => "Bring forward",
        }
    }
}

/// Anchor position (relative to the preview) for a toolbar floating above
/// `layer_rect`. Horizontally centered on the layer, vertically one gap
/// above it, clamped to the configured margin so it never leaves the
/// preview at the top or left edge.
pub fn anchor_for(layer_rect: Rect, background_rect: Rect, config: &ComposerConfig) -> Point {
    let left = (layer_rect.x0 - background_rect.x0 + layer_rect.width() / 2.0
        - config.toolbar_gap_px)
        .max(config.toolbar_margin_px);
    let top =
        (layer_rect.y0 - background_rect.y0 - config.toolbar_gap_px).max(config.toolbar_margin_px);
    Point::new(left, top)
}

/// Tracks which layer the toolbar is shown for, if any.
///
/// Invariant kept by the bridge: shown ⇔ the stack has a current
/// selection that is still attached.
#[derive(Debug, Default)]
pub struct ToolbarController {
    shown_for: Option<LayerId>,
}

impl ToolbarController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the toolbar shown for `layer`. The caller must have resolved a
    /// valid anchor first — if the background box cannot be measured, call
    /// [`ToolbarController::hide`] instead of showing at a wrong position.
    pub fn show_for(&mut self, layer: LayerId) {
        self.shown_for = Some(layer);
    }

    /// Unconditionally hide and forget what the toolbar was shown for.
    pub fn hide(&mut self) {
        self.shown_for = None;
    }

    pub fn shown_for(&self) -> Option<LayerId> {
        self.shown_for
    }

    pub fn is_visible(&self) -> bool {
        self.shown_for.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> ComposerConfig {
        ComposerConfig::default()
    }

    #[test]
    fn anchor_centers_above_the_layer() {
        let bg = Rect::new(100.0, 100.0, 500.0, 400.0);
        // 80×60 layer whose top-left sits at (300, 250) on the page
        let layer = Rect::new(300.0, 250.0, 380.0, 310.0);
        let anchor = anchor_for(layer, bg, &config());
        // left = 300 - 100 + 40 - 40 = 200; top = 250 - 100 - 40 = 110
        assert_eq!(anchor, Point::new(200.0, 110.0));
    }

    #[test]
    fn anchor_clamps_near_edges() {
        let bg = Rect::new(100.0, 100.0, 500.0, 400.0);
        // Layer hugging the background's top-left corner
        let layer = Rect::new(100.0, 100.0, 140.0, 130.0);
        let anchor = anchor_for(layer, bg, &config());
        assert_eq!(anchor, Point::new(6.0, 6.0), "clamped to the margin");
    }

    #[test]
    fn controller_tracks_shown_layer() {
        let mut toolbar = ToolbarController::new();
        assert!(!toolbar.is_visible());

        let id = LayerId::intern("layer_toolbar_test");
        toolbar.show_for(id);
        assert_eq!(toolbar.shown_for(), Some(id));

        toolbar.hide();
        assert!(!toolbar.is_visible());
        assert_eq!(toolbar.shown_for(), None);
    }

    #[test]
    fn all_actions_have_titles() {
        for action in ToolbarAction::ALL {
            assert!(!action.title().is_empty());
        }
    }
}
