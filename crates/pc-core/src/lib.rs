pub mod config;
pub mod event;
pub mod geometry;
pub mod id;
pub mod model;
pub mod stack;

pub use config::ComposerConfig;
pub use event::{ReorderDirection, StackEvent};
pub use geometry::{Placement, clamp_offset, offset_to_percent, percent_to_offset};
pub use id::LayerId;
pub use model::{Background, Layer, SourceItem, initial_height};
pub use stack::{LayerStack, SubscriptionId};

// Re-export kurbo's geometry primitives so downstream crates don't need a
// direct dependency.
pub use kurbo::{Point, Rect, Size, Vec2};
