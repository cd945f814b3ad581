//! Error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FieldError {
    /// The tile field has no usable viewport yet
    #[error("tile field surface is not ready")]
    SurfaceNotReady,

    #[error("gave up after {attempts} attempts")]
    RetryExhausted { attempts: u32 },

    /// A GPU or canvas context could not be created
    #[error("rendering context unavailable: {0}")]
    ContextUnavailable(String),

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("invalid settings: {0}")]
    Config(#[from] serde_json::Error),
}
