//! Wire types for the admin console's chunked upload API.
//!
//! The backend accepts one request per chunk (header fields + raw payload)
//! and responds with a [`ChunkAck`]. Once every chunk has arrived it
//! reassembles the file by chunk index and returns the server-relative
//! asset path on the final acknowledgment.

pub mod types;

pub use types::{CancelRequest, ChunkAck, ChunkRequest, UploadProgress, UploadResult, UploadState};
