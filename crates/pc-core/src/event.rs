//! Outbound notifications from the layer stack.
//!
//! Fire-and-forget, one-way: subscribers may react (persist the design,
//! update host UI) but the stack never awaits a response.

use crate::id::LayerId;
use serde::Serialize;

/// Direction of a z-order swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReorderDirection {
    Backward,
    Forward,
}

/// A notification emitted after a stack mutation commits.
///
/// Payload field names serialize in camelCase to match what host pages
/// historically received from the widget's DOM events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged, rename_all = "camelCase")]
pub enum StackEvent {
    #[serde(rename_all = "camelCase")]
    Added {
        layer_id: LayerId,
        src: String,
        handle: String,
        index: usize,
        x_percent: f64,
        y_percent: f64,
    },
    #[serde(rename_all = "camelCase")]
    Moved {
        layer_id: LayerId,
        x_percent: f64,
        y_percent: f64,
        offset_x: f64,
        offset_y: f64,
    },
    #[serde(rename_all = "camelCase")]
    Rotated { layer_id: LayerId, rotation: f64 },
    #[serde(rename_all = "camelCase")]
    Reordered {
        layer_id: LayerId,
        direction: ReorderDirection,
    },
    #[serde(rename_all = "camelCase")]
    Removed { layer_id: LayerId },
    #[serde(rename_all = "camelCase")]
    SourceDropped {
        src: String,
        handle: String,
        index: String,
    },
}

impl StackEvent {
    /// Stable event name a host subscribes on.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Added { .. } => "layer-added",
            Self::Moved { .. } => "layer-moved",
            Self::Rotated { .. } => "layer-rotated",
            Self::Reordered { .. } => "layer-reordered",
            Self::Removed { .. } => "layer-removed",
            Self::SourceDropped { .. } => "source-dropped",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payloads_serialize_in_camel_case() {
        let event = StackEvent::Moved {
            layer_id: LayerId::intern("layer_7"),
            x_percent: 25.0,
            y_percent: 75.0,
            offset_x: -100.0,
            offset_y: 50.0,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""layerId":"layer_7""#), "got {json}");
        assert!(json.contains(r#""xPercent":25.0"#), "got {json}");
        assert!(json.contains(r#""offsetY":50.0"#), "got {json}");
    }

    #[test]
    fn event_names_are_stable() {
        let removed = StackEvent::Removed {
            layer_id: LayerId::intern("layer_9"),
        };
        assert_eq!(removed.name(), "layer-removed");
        let dropped = StackEvent::SourceDropped {
            src: "a.png".into(),
            handle: "patch".into(),
            index: "0".into(),
        };
        assert_eq!(dropped.name(), "source-dropped");
    }

    #[test]
    fn reorder_direction_serializes_lowercase() {
        let event = StackEvent::Reordered {
            layer_id: LayerId::intern("layer_3"),
            direction: ReorderDirection::Forward,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""direction":"forward""#), "got {json}");
    }
}
