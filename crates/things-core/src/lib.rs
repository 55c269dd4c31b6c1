//! things-core library.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums per boundary, each mapping to an
//!   [`error::ErrorCode`]. `anyhow::Result` only where files are read for
//!   configuration.
//! - **Logging**: use `tracing` macros (`info!`, `warn!`, `debug!`, `trace!`).
//!   The library never installs a subscriber.

pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod lock;
pub mod log;
pub mod model;
pub mod observe;
pub mod state;
pub mod storage;
pub mod store;
pub mod validate;
pub mod view;

pub use command::CommandError;
pub use engine::Engine;
pub use event::{Event, EventType};
pub use model::context::Context;
pub use model::id::{Id, IdKind};
pub use model::task::Task;
pub use state::State;
pub use store::Store;
