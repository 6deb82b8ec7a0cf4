#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::new_without_default
)]

pub mod channels;
pub mod config;
pub mod error;
pub mod gateway;
pub mod generate;
pub mod limiter;
pub mod session;
pub mod sweeper;

pub use config::Config;
pub use error::{GatewayError, RelayError, Result};
pub use gateway::ConversationGateway;
pub use limiter::{RateLimiter, Scope};
pub use session::{MemorySessionStore, SessionStore};
pub use sweeper::{Sweeper, SweeperHandle};
