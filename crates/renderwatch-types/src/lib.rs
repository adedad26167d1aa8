//! Shared types for the renderwatch job monitor.

mod channel;
mod job;
mod log;

pub use channel::*;
pub use job::*;
pub use log::*;
