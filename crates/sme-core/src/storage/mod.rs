//! SQLite persistence for conversations, webhook events and system logs

mod layer;
mod store;
mod types;

pub use layer::SystemLogLayer;
pub use store::{DatabaseStatus, LogStore};
pub use types::*;
