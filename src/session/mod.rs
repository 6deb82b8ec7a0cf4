pub mod store;
pub mod types;

pub use store::{MemorySessionStore, SessionStore};
pub use types::{Role, Session, Turn};
