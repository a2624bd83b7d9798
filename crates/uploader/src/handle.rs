//! Caller-facing control handle for a single upload.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use brandup_protocol::{UploadProgress, UploadState};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::endpoint::UploadEndpoint;
use crate::engine::{DispatchCtx, UploadOptions, run_dispatch};
use crate::error::UploadError;
use crate::session::UploadSession;

/// Event emitted by the engine while an upload runs.
///
/// Host forms subscribe to disable submission while uploading or paused;
/// after an abort no further events fire.
#[derive(Debug, Clone)]
pub enum UploadEvent {
    /// The session moved to a new state.
    StateChanged { state: UploadState },
    /// A chunk was acknowledged.
    Progress {
        percent: f64,
        confirmed_bytes: u64,
        total_bytes: u64,
    },
    /// All chunks acknowledged; `path` is the server-relative asset path.
    Completed { path: String },
    /// The session failed. Fires at most once per dispatch run.
    Failed { error: String },
}

/// Shared control surface between a handle and its dispatch task.
pub(crate) struct Controls {
    /// Pause gate observed by the dispatch loop.
    pub(crate) pause: watch::Sender<bool>,
    /// Abort signal; once cancelled no events are emitted.
    pub(crate) cancel: CancellationToken,
    /// Guards the single best-effort cancel request to the backend.
    pub(crate) cancel_sent: AtomicBool,
}

/// Emits a progress-class event unless the session was aborted. These are
/// high-frequency and lossy: when the receiver lags, the event is dropped
/// (with a debug log) and the next ack carries fresher numbers anyway.
pub(crate) fn emit(ctrl: &Controls, tx: &mpsc::Sender<UploadEvent>, event: UploadEvent) {
    if ctrl.cancel.is_cancelled() {
        return;
    }
    if let Err(e) = tx.try_send(event) {
        debug!("dropping upload event: {e}");
    }
}

/// Emits an event that must not be lost (state changes and terminal
/// outcomes), waiting for channel capacity if a slow consumer filled it
/// with progress events. A send error means the receiver is gone.
pub(crate) async fn emit_reliable(
    ctrl: &Controls,
    tx: &mpsc::Sender<UploadEvent>,
    event: UploadEvent,
) {
    if ctrl.cancel.is_cancelled() {
        return;
    }
    if tx.send(event).await.is_err() {
        debug!("upload event receiver dropped");
    }
}

/// Control handle for one upload session.
///
/// Returned by [`Uploader::start`](crate::engine::Uploader::start). The
/// handle does not cancel the upload when dropped; call
/// [`abort`](Self::abort) for teardown.
pub struct UploadHandle {
    pub(crate) session: Arc<UploadSession>,
    pub(crate) ctrl: Arc<Controls>,
    pub(crate) events_rx: Option<mpsc::Receiver<UploadEvent>>,
    pub(crate) events_tx: mpsc::Sender<UploadEvent>,
    pub(crate) endpoint: Arc<dyn UploadEndpoint>,
    pub(crate) options: UploadOptions,
    pub(crate) path: PathBuf,
}

impl UploadHandle {
    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<UploadEvent>> {
        self.events_rx.take()
    }

    /// The session this handle controls.
    pub fn session(&self) -> &Arc<UploadSession> {
        &self.session
    }

    pub fn id(&self) -> String {
        self.session.id()
    }

    pub fn state(&self) -> UploadState {
        self.session.state()
    }

    pub fn progress(&self) -> UploadProgress {
        self.session.progress()
    }

    /// Stops dispatch of new chunks. Requests already in flight finish and
    /// still count toward progress. Returns `false` when not uploading.
    pub fn pause(&self) -> bool {
        if !self.session.pause() {
            return false;
        }
        self.ctrl.pause.send_replace(true);
        debug!(upload_id = %self.session.id(), "upload paused");
        emit(
            &self.ctrl,
            &self.events_tx,
            UploadEvent::StateChanged {
                state: UploadState::Paused,
            },
        );
        true
    }

    /// Resumes dispatch from the next unacknowledged chunk. Progress is
    /// retained; it never resets across pause/resume.
    pub fn resume(&self) -> bool {
        if !self.session.resume() {
            return false;
        }
        self.ctrl.pause.send_replace(false);
        debug!(upload_id = %self.session.id(), "upload resumed");
        emit(
            &self.ctrl,
            &self.events_tx,
            UploadEvent::StateChanged {
                state: UploadState::Uploading,
            },
        );
        true
    }

    /// Aborts the upload: cancels in-flight requests, asks the backend to
    /// discard partial data (once), and suppresses all further events.
    ///
    /// Idempotent; abort after completion is a no-op.
    pub async fn abort(&self) {
        if !self.session.cancel() {
            return;
        }
        self.ctrl.cancel.cancel();
        self.ctrl.pause.send_replace(false);

        if !self.ctrl.cancel_sent.swap(true, Ordering::SeqCst) {
            let id = self.session.id();
            info!(upload_id = %id, "upload aborted");
            if let Err(e) = self.endpoint.cancel(id.clone()).await {
                warn!(upload_id = %id, error = %e, "cancel request failed");
            }
        }
    }

    /// Retries a failed upload, re-dispatching only the chunks the server
    /// never acknowledged. Progress is retained.
    pub fn retry(&self) -> Result<(), UploadError> {
        if self.session.state() == UploadState::Cancelled {
            return Err(UploadError::Cancelled);
        }
        if !self.session.retry() {
            return Err(UploadError::NotRetryable);
        }
        self.ctrl.pause.send_replace(false);
        info!(upload_id = %self.session.id(), "retrying upload");

        tokio::spawn(run_dispatch(DispatchCtx {
            endpoint: Arc::clone(&self.endpoint),
            session: Arc::clone(&self.session),
            ctrl: Arc::clone(&self.ctrl),
            events_tx: self.events_tx.clone(),
            options: self.options.clone(),
            path: self.path.clone(),
        }));
        Ok(())
    }

    /// Waits until the session settles in `completed`, `error`, or
    /// `cancelled`.
    pub async fn settled(&self) -> UploadState {
        loop {
            let state = self.session.state();
            if matches!(
                state,
                UploadState::Completed | UploadState::Error | UploadState::Cancelled
            ) {
                return state;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}
