//! Chunked upload engine for the Walking Brands admin console.
//!
//! This crate implements the client-side upload pipeline behind the
//! console's image and video upload widgets. It is a library crate with no
//! UI dependencies; the UI layer is a thin renderer over [`UploadHandle`]
//! and its event stream.
//!
//! # Pipeline
//!
//! 1. **Validate**: size cap, zero-byte rejection, extension allow-list
//! 2. **Slice**: fixed-size chunks with SHA-256 checksums
//! 3. **Dispatch**: bounded-concurrency sends with per-chunk timeout and
//!    exponential-backoff retry
//! 4. **Track**: acked-chunk bitmap, monotone progress, state machine
//! 5. **Finish**: server-relative path handed to the owning form
//!
//! Pause stops dispatch of new chunks (in-flight requests finish); resume
//! and retry continue from the unacknowledged chunks rather than
//! restarting. Abort cancels in-flight requests, notifies the backend
//! once, and suppresses all further events.

pub mod endpoint;
pub mod engine;
pub mod error;
pub mod gallery;
pub mod handle;
pub mod multi;
pub mod retry;
pub mod session;

#[cfg(test)]
mod test_support;

pub use endpoint::{HttpEndpoint, UploadEndpoint};
pub use engine::{UploadOptions, Uploader};
pub use error::UploadError;
pub use gallery::{Gallery, GalleryItem};
pub use handle::{UploadEvent, UploadHandle};
pub use multi::MultiUploader;
pub use retry::RetryPolicy;
pub use session::UploadSession;
