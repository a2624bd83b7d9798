use serde::{Deserialize, Serialize};

/// States an upload session moves through.
///
/// `Completed` and `Cancelled` are terminal. `Error` is recoverable via
/// retry; cancellation removes the session entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadState {
    #[serde(rename = "idle")]
    Idle,
    #[serde(rename = "uploading")]
    Uploading,
    #[serde(rename = "paused")]
    Paused,
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "cancelled")]
    Cancelled,
}

impl UploadState {
    /// Returns `true` for states no session ever leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Completed | UploadState::Cancelled)
    }
}

/// Header fields sent alongside one chunk payload.
///
/// The backend reassembles chunks positionally by `chunk_index`, so the
/// order chunks arrive in does not matter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkRequest {
    pub upload_id: String,
    pub file_name: String,
    pub chunk_index: u32,
    pub total_chunks: u32,
    /// Byte offset of this chunk within the file.
    pub offset: u64,
    pub total_bytes: u64,
    /// SHA-256 hex digest of the payload (empty means no verification).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub checksum: String,
}

/// Backend response to a single chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkAck {
    pub received: bool,
    /// Server-relative asset path, present once all chunks have arrived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Final result of a completed upload.
///
/// The path is an opaque reference; the rest of the application resolves
/// it to a URL through the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    pub path: String,
}

/// Request to discard a partially uploaded session server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub upload_id: String,
}

/// Snapshot of an upload session's progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgress {
    pub upload_id: String,
    pub state: UploadState,
    pub total_bytes: u64,
    pub confirmed_bytes: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

impl UploadProgress {
    /// Returns the upload progress as a percentage (0-100).
    pub fn percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.confirmed_bytes as f64 / self.total_bytes as f64 * 100.0
    }
}
