//! Data models for the directory admin dashboard.
//!
//! Field names match the store's column names so records decode directly.

mod metrics;
mod product;
mod session;
mod taxonomy;
mod user;

pub use metrics::*;
pub use product::*;
pub use session::*;
pub use taxonomy::*;
pub use user::*;
