//! Error types for the trellis runtime

use thiserror::Error;

/// Main error type for the runtime
#[derive(Debug, Error)]
pub enum Error {
    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("Window error: {0}")]
    Window(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Thread error: {0}")]
    Thread(String),

    /// A blocking call was made against a worker whose thread is not alive.
    #[error("{0} thread is not running")]
    NotRunning(&'static str),

    #[error("Bindless error: {0}")]
    Bindless(String),

    #[error("Streaming error: {0}")]
    Streaming(String),
}
