//! In-memory conversation sessions
//!
//! Keyed by LINE user id; idle sessions are dropped by a periodic cleanup task.

mod store;
mod types;

pub use store::InMemorySessionStore;
pub use types::{Exchange, Session};
