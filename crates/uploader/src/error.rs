//! Upload error types.

/// Errors produced by the upload engine.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("validation failed: {0}")]
    Validation(#[from] brandup_transfer::TransferError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint returned status {0}")]
    Status(u16),

    #[error("chunk {index} rejected by server")]
    ChunkRejected { index: u32 },

    #[error("chunk {index} timed out")]
    ChunkTimeout { index: u32 },

    #[error("upload cancelled")]
    Cancelled,

    #[error("file cap reached ({cap} files)")]
    FileCapReached { cap: usize },

    #[error("session is not in a retryable state")]
    NotRetryable,

    #[error("upload finished without a result path")]
    MissingPath,
}
