//! Per-upload session bookkeeping and state machine.

use std::sync::RwLock;
use std::time::Duration;

use brandup_protocol::{UploadProgress, UploadState};
use brandup_transfer::{SpeedCalculator, chunk_count};
use uuid::Uuid;

/// Bookkeeping record for one in-progress file upload (thread-safe).
///
/// Transitions are total-ordered per session: each transition method
/// returns `true` only when the move is legal from the current state, and
/// is a no-op otherwise. `Completed` and `Cancelled` are never left.
pub struct UploadSession {
    inner: RwLock<SessionInner>,
    speed: SpeedCalculator,
}

struct SessionInner {
    id: String,
    file_name: String,
    total_bytes: u64,
    chunk_size: u64,
    total_chunks: u32,
    /// One flag per chunk index; `true` once the server acknowledged it.
    acked: Vec<bool>,
    confirmed_bytes: u64,
    state: UploadState,
    error: String,
    result_path: Option<String>,
}

impl UploadSession {
    /// Creates a new idle session for a file of `total_bytes` bytes.
    pub fn new(file_name: String, total_bytes: u64, chunk_size: u64) -> Self {
        let total_chunks = chunk_count(total_bytes, chunk_size);
        Self {
            inner: RwLock::new(SessionInner {
                id: Uuid::new_v4().to_string(),
                file_name,
                total_bytes,
                chunk_size,
                total_chunks,
                acked: vec![false; total_chunks as usize],
                confirmed_bytes: 0,
                state: UploadState::Idle,
                error: String::new(),
                result_path: None,
            }),
            speed: SpeedCalculator::default(),
        }
    }

    // -- transitions --------------------------------------------------------

    /// `idle -> uploading` (file selected).
    pub fn begin(&self) -> bool {
        let mut s = self.inner.write().unwrap();
        if s.state != UploadState::Idle {
            return false;
        }
        s.state = UploadState::Uploading;
        true
    }

    /// `uploading -> paused`.
    pub fn pause(&self) -> bool {
        let mut s = self.inner.write().unwrap();
        if s.state != UploadState::Uploading {
            return false;
        }
        s.state = UploadState::Paused;
        true
    }

    /// `paused -> uploading`.
    pub fn resume(&self) -> bool {
        let mut s = self.inner.write().unwrap();
        if s.state != UploadState::Paused {
            return false;
        }
        s.state = UploadState::Uploading;
        true
    }

    /// `uploading | paused -> error`. Progress is retained for retry.
    pub fn fail(&self, err: &str) -> bool {
        let mut s = self.inner.write().unwrap();
        if !matches!(s.state, UploadState::Uploading | UploadState::Paused) {
            return false;
        }
        s.state = UploadState::Error;
        s.error = err.to_string();
        true
    }

    /// `uploading | paused -> completed` with the server-relative path.
    ///
    /// Pause is allowed here because the last in-flight chunk may land
    /// while the session is paused.
    pub fn complete(&self, path: &str) -> bool {
        let mut s = self.inner.write().unwrap();
        if !matches!(s.state, UploadState::Uploading | UploadState::Paused) {
            return false;
        }
        s.state = UploadState::Completed;
        s.result_path = Some(path.to_string());
        true
    }

    /// Any non-terminal state `-> cancelled`. Idempotent; cancel after
    /// complete is a no-op.
    pub fn cancel(&self) -> bool {
        let mut s = self.inner.write().unwrap();
        if s.state.is_terminal() {
            return false;
        }
        s.state = UploadState::Cancelled;
        true
    }

    /// `error -> uploading`. Tracking restarts internally but the acked
    /// bitmap is retained, so only unacknowledged chunks are re-sent.
    pub fn retry(&self) -> bool {
        let mut s = self.inner.write().unwrap();
        if s.state != UploadState::Error {
            return false;
        }
        s.state = UploadState::Uploading;
        s.error.clear();
        self.speed.reset();
        true
    }

    // -- acks and progress --------------------------------------------------

    /// Records a server acknowledgment for chunk `index`.
    ///
    /// Idempotent per index; bytes are only counted once, so confirmed
    /// bytes never exceed the total and progress never regresses. Returns
    /// a progress snapshot while the session is uploading or paused, and
    /// `None` otherwise (late acks after failure or cancel still update
    /// the bitmap but must not surface to callers).
    pub fn record_ack(&self, index: u32, bytes: u64, path: Option<String>) -> Option<UploadProgress> {
        let mut s = self.inner.write().unwrap();
        if let Some(flag) = s.acked.get_mut(index as usize)
            && !*flag
        {
            *flag = true;
            s.confirmed_bytes += bytes;
            self.speed.record(bytes);
        }
        if let Some(p) = path {
            s.result_path = Some(p);
        }
        if matches!(s.state, UploadState::Uploading | UploadState::Paused) {
            Some(Self::snapshot(&s))
        } else {
            None
        }
    }

    /// Indices of chunks the server has not acknowledged, in order.
    pub fn unacked_chunks(&self) -> Vec<u32> {
        let s = self.inner.read().unwrap();
        s.acked
            .iter()
            .enumerate()
            .filter(|(_, acked)| !**acked)
            .map(|(i, _)| i as u32)
            .collect()
    }

    /// `true` once every chunk has been acknowledged.
    pub fn is_fully_acked(&self) -> bool {
        let s = self.inner.read().unwrap();
        s.acked.iter().all(|a| *a)
    }

    /// Average confirmed-byte rate over the recent window, in bytes/s.
    pub fn bytes_per_second(&self) -> f64 {
        self.speed.bytes_per_second()
    }

    /// Estimated time until the remaining bytes are confirmed, from the
    /// current rate. `None` while the rate is unknown or zero.
    pub fn eta(&self) -> Option<Duration> {
        let remaining = {
            let s = self.inner.read().unwrap();
            s.total_bytes.saturating_sub(s.confirmed_bytes)
        };
        self.speed.eta(remaining)
    }

    /// Returns the current progress snapshot.
    pub fn progress(&self) -> UploadProgress {
        let s = self.inner.read().unwrap();
        Self::snapshot(&s)
    }

    fn snapshot(s: &SessionInner) -> UploadProgress {
        UploadProgress {
            upload_id: s.id.clone(),
            state: s.state,
            total_bytes: s.total_bytes,
            confirmed_bytes: s.confirmed_bytes,
            error: s.error.clone(),
        }
    }

    // -- accessors ----------------------------------------------------------

    pub fn id(&self) -> String {
        self.inner.read().unwrap().id.clone()
    }

    pub fn file_name(&self) -> String {
        self.inner.read().unwrap().file_name.clone()
    }

    pub fn state(&self) -> UploadState {
        self.inner.read().unwrap().state
    }

    pub fn total_bytes(&self) -> u64 {
        self.inner.read().unwrap().total_bytes
    }

    pub fn chunk_size(&self) -> u64 {
        self.inner.read().unwrap().chunk_size
    }

    pub fn total_chunks(&self) -> u32 {
        self.inner.read().unwrap().total_chunks
    }

    pub fn confirmed_bytes(&self) -> u64 {
        self.inner.read().unwrap().confirmed_bytes
    }

    /// Server-relative path once the backend has reported one.
    pub fn result_path(&self) -> Option<String> {
        self.inner.read().unwrap().result_path.clone()
    }

    pub fn error_message(&self) -> String {
        self.inner.read().unwrap().error.clone()
    }
}
