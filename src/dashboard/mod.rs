//! Dashboard synchronization: keeps the console's picture of the remote bot
//! service current under polling, manual refresh and start/stop commands.

pub mod api;
mod command;
pub mod controller;
pub mod error;
mod fetch;
pub mod poll;
pub mod render;
pub mod store;
pub mod types;

pub use api::{Command, CommandAck, DashboardApi, Endpoint, ServiceHealth};
pub use controller::{SyncController, SyncSettings};
pub use error::{ApiError, ErrorClass, Operation, SyncError};
pub use poll::PollScheduler;
pub use store::StateStore;
pub use types::*;
