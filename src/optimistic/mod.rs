//! Optimistic mutation core: the pure reducer, the per-view actor that owns
//! its state, and the delayed delete controller.

mod reducer;
mod undo;
mod view;

pub use reducer::{Entity, MutationIntent, VisibleState};
pub use undo::{ArmedDelete, DeleteController};
pub use view::{Notice, ViewHandle, ViewSnapshot};
