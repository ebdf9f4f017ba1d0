pub mod dnd;
pub mod gesture;
pub mod input;
pub mod toolbar;

pub use dnd::{DragPayload, DropController, Ghost, GhostEffect, MIME_HANDLE, MIME_INDEX};
pub use gesture::MoveController;
pub use input::PointerInput;
pub use toolbar::{ToolbarAction, ToolbarController, anchor_for};
