//! Error types for renderwatch.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderWatchError {
    #[error("invalid classifier rules: {0}")]
    InvalidRules(String),

    #[error("ingest channel closed")]
    ChannelClosed,
}
