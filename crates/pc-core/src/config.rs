//! Composer configuration.

/// Tunable parameters for a composer instance.
///
/// Defaults match the storefront widget's shipped behavior; hosts can
/// override individual fields before mounting.
#[derive(Debug, Clone)]
pub struct ComposerConfig {
    /// Smallest height a patch layer may be created at, in pixels.
    pub min_patch_px: f64,

    /// Largest height a patch layer may be created at, in pixels.
    pub max_patch_px: f64,

    /// Fallback height when physical-height metadata is missing.
    pub default_patch_px: f64,

    /// Degrees applied per toolbar rotate click (left = negative).
    pub rotate_step_deg: f64,

    /// Vertical gap between a selected layer and its floating toolbar,
    /// also half the toolbar's width for horizontal centering.
    pub toolbar_gap_px: f64,

    /// Minimum distance the toolbar keeps from the preview's edges.
    pub toolbar_margin_px: f64,

    /// Supersampling factor used when rasterizing the composition.
    pub export_scale: f64,

    /// Fallback background painted behind the export raster.
    pub export_background: &'static str,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            min_patch_px: 50.0,
            max_patch_px: 500.0,
            default_patch_px: 200.0,
            rotate_step_deg: 15.0,
            toolbar_gap_px: 40.0,
            toolbar_margin_px: 6.0,
            export_scale: 2.0,
            export_background: "#ffffff",
        }
    }
}
