//! Error types for the terrain engine

use thiserror::Error;

use crate::core::grid::PageCoord;

/// Main error type for the engine
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Height field must be 2^n+1 on each axis, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Height field size {actual} does not match page size {expected}")]
    PageSizeMismatch { expected: u32, actual: u32 },

    #[error("Unsupported height image channel count: {0}")]
    UnsupportedChannels(u8),

    #[error("Renderable pool exhausted: needed {requested}, {available} available")]
    PoolExhausted { requested: usize, available: usize },

    #[error("Page {0} is not preloaded")]
    PageNotPreloaded(PageCoord),

    #[error("Page {0} lies outside the world grid")]
    OutOfWorld(PageCoord),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the controller can recover by re-queueing the request
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::PageNotPreloaded(_))
    }
}
