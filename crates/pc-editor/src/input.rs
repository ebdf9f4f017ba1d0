//! Input abstraction layer.
//!
//! Normalizes browser pointer events into a plain value consumed by the
//! gesture controller, so the controller stays testable without a DOM.

use pc_core::Point;

/// A normalized pointer sample (down, move, or up — the controller method
/// called determines which).
#[derive(Debug, Clone, Copy)]
pub struct PointerInput {
    /// Browser pointer id, used to ignore samples from foreign pointers
    /// mid-gesture.
    pub pointer_id: i32,
    /// Position in page (client) coordinates.
    pub client: Point,
    /// Whether this is the primary button / contact. Only primary input
    /// starts a gesture.
    pub primary: bool,
}

impl PointerInput {
    pub fn new(pointer_id: i32, client_x: f64, client_y: f64, primary: bool) -> Self {
        Self {
            pointer_id,
            client: Point::new(client_x, client_y),
            primary,
        }
    }
}
