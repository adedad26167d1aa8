//! renderwatch CLI library - config, logging, and subprocess management
//! for the `renderwatch` binary, separated from main.rs so they are
//! testable.

pub mod config;
pub mod logging;
pub mod process;
