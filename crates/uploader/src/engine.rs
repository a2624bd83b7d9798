//! Chunk dispatch engine.
//!
//! `Uploader::start` validates the file, creates a session, and spawns a
//! dispatch task that walks the unacknowledged chunk indices: each chunk
//! is read off the runtime thread, then sent under a semaphore so at most
//! `simultaneous_uploads` requests are in flight. Completion order is
//! unspecified; the backend reassembles by chunk index.
//!
//! Pausing gates dispatch of new chunks without aborting requests already
//! in flight. The first chunk that exhausts its retries fails the session
//! exactly once and halts further dispatch.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use brandup_protocol::{ChunkRequest, UploadState};
use brandup_transfer::{ChunkReader, DEFAULT_CHUNK_SIZE, FileConstraints, TransferError, validate_file};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::endpoint::UploadEndpoint;
use crate::error::UploadError;
use crate::handle::{Controls, UploadEvent, UploadHandle, emit, emit_reliable};
use crate::retry::{DEFAULT_CHUNK_TIMEOUT, RetryPolicy};
use crate::session::UploadSession;

/// Tuning knobs for one uploader instance.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Chunk size in bytes (0 falls back to the transfer default).
    pub chunk_size: usize,
    /// Upper bound on concurrent chunk requests per session (min 1).
    pub simultaneous_uploads: usize,
    pub retry: RetryPolicy,
    /// Bound on a single chunk request.
    pub chunk_timeout: Duration,
    pub constraints: FileConstraints,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            simultaneous_uploads: 3,
            retry: RetryPolicy::default(),
            chunk_timeout: DEFAULT_CHUNK_TIMEOUT,
            constraints: FileConstraints::default(),
        }
    }
}

/// Starts uploads against a fixed endpoint.
pub struct Uploader {
    endpoint: Arc<dyn UploadEndpoint>,
    options: UploadOptions,
}

impl Uploader {
    pub fn new(endpoint: Arc<dyn UploadEndpoint>) -> Self {
        Self {
            endpoint,
            options: UploadOptions::default(),
        }
    }

    pub fn with_options(endpoint: Arc<dyn UploadEndpoint>, options: UploadOptions) -> Self {
        Self { endpoint, options }
    }

    pub fn options(&self) -> &UploadOptions {
        &self.options
    }

    /// Validates `path` and begins uploading it.
    ///
    /// Validation failures (empty file, size cap, extension) are returned
    /// before any network request is made. Must be called within a Tokio
    /// runtime; the dispatch task runs until the session settles or is
    /// aborted via the returned handle.
    pub fn start(&self, path: impl Into<PathBuf>) -> Result<UploadHandle, UploadError> {
        let path: PathBuf = path.into();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_owned)
            .ok_or_else(|| {
                UploadError::Validation(TransferError::InvalidFileName(
                    path.display().to_string(),
                ))
            })?;

        let size = std::fs::metadata(&path)?.len();
        validate_file(&file_name, size, &self.options.constraints)?;

        let chunk_size = if self.options.chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            self.options.chunk_size
        };

        let session = Arc::new(UploadSession::new(file_name, size, chunk_size as u64));
        session.begin();
        info!(
            upload_id = %session.id(),
            bytes = size,
            chunks = session.total_chunks(),
            "upload started"
        );

        let (events_tx, events_rx) = mpsc::channel(256);
        let (pause_tx, _) = watch::channel(false);
        let ctrl = Arc::new(Controls {
            pause: pause_tx,
            cancel: CancellationToken::new(),
            cancel_sent: AtomicBool::new(false),
        });

        tokio::spawn(run_dispatch(DispatchCtx {
            endpoint: Arc::clone(&self.endpoint),
            session: Arc::clone(&session),
            ctrl: Arc::clone(&ctrl),
            events_tx: events_tx.clone(),
            options: self.options.clone(),
            path: path.clone(),
        }));

        Ok(UploadHandle {
            session,
            ctrl,
            events_rx: Some(events_rx),
            events_tx,
            endpoint: Arc::clone(&self.endpoint),
            options: self.options.clone(),
            path,
        })
    }
}

/// Everything a dispatch run needs. Avoids threading six parameters
/// through every helper.
pub(crate) struct DispatchCtx {
    pub(crate) endpoint: Arc<dyn UploadEndpoint>,
    pub(crate) session: Arc<UploadSession>,
    pub(crate) ctrl: Arc<Controls>,
    pub(crate) events_tx: mpsc::Sender<UploadEvent>,
    pub(crate) options: UploadOptions,
    pub(crate) path: PathBuf,
}

/// Waits while the pause gate is up. Returns `false` when dispatch should
/// stop instead (abort or halt).
async fn wait_while_paused(
    pause_rx: &mut watch::Receiver<bool>,
    cancel: &CancellationToken,
    halt: &CancellationToken,
) -> bool {
    while *pause_rx.borrow() {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return false,
            _ = halt.cancelled() => return false,
            changed = pause_rx.changed() => {
                if changed.is_err() {
                    return false;
                }
            }
        }
    }
    true
}

/// Runs one dispatch pass over the session's unacknowledged chunks.
///
/// Used for the initial upload and again for retry, which is what makes
/// retry resume instead of restart.
pub(crate) async fn run_dispatch(ctx: DispatchCtx) {
    let DispatchCtx {
        endpoint,
        session,
        ctrl,
        events_tx,
        options,
        path,
    } = ctx;

    emit_reliable(
        &ctrl,
        &events_tx,
        UploadEvent::StateChanged {
            state: UploadState::Uploading,
        },
    )
    .await;

    let halt = CancellationToken::new();

    let chunk_size = session.chunk_size() as usize;
    let opened = tokio::task::spawn_blocking(move || ChunkReader::new(&path, chunk_size)).await;
    let mut reader = match opened {
        Ok(Ok(r)) => r,
        Ok(Err(e)) => {
            fail_once(&session, &ctrl, &events_tx, &halt, &e.to_string()).await;
            return;
        }
        Err(e) => {
            fail_once(&session, &ctrl, &events_tx, &halt, &format!("task join error: {e}")).await;
            return;
        }
    };

    let pending = session.unacked_chunks();
    let total_chunks = session.total_chunks();
    let upload_id = session.id();
    debug!(
        upload_id = %upload_id,
        pending = pending.len(),
        total = total_chunks,
        "chunk dispatch started"
    );

    let semaphore = Arc::new(Semaphore::new(options.simultaneous_uploads.max(1)));
    let mut join = JoinSet::new();
    let mut pause_rx = ctrl.pause.subscribe();

    'dispatch: for index in pending {
        if !wait_while_paused(&mut pause_rx, &ctrl.cancel, &halt).await {
            break;
        }

        let permit = tokio::select! {
            biased;
            _ = ctrl.cancel.cancelled() => break 'dispatch,
            _ = halt.cancelled() => break 'dispatch,
            permit = Arc::clone(&semaphore).acquire_owned() => {
                match permit {
                    Ok(p) => p,
                    Err(_) => break 'dispatch,
                }
            }
        };

        // Re-check after the acquire: a pause that landed while we waited
        // for a slot must gate this chunk too.
        if !wait_while_paused(&mut pause_rx, &ctrl.cancel, &halt).await {
            break;
        }

        let read = tokio::task::spawn_blocking(move || {
            let chunk = reader.chunk_at(index);
            (reader, chunk)
        })
        .await;
        let chunk = match read {
            Ok((r, Ok(Some(chunk)))) => {
                reader = r;
                chunk
            }
            Ok((_, Ok(None))) => break,
            Ok((_, Err(e))) => {
                fail_once(&session, &ctrl, &events_tx, &halt, &format!("chunk read failed: {e}"))
                    .await;
                break;
            }
            Err(e) => {
                fail_once(&session, &ctrl, &events_tx, &halt, &format!("task join error: {e}"))
                    .await;
                break;
            }
        };

        let header = ChunkRequest {
            upload_id: upload_id.clone(),
            file_name: session.file_name(),
            chunk_index: chunk.index,
            total_chunks,
            offset: chunk.offset,
            total_bytes: session.total_bytes(),
            checksum: chunk.checksum.clone(),
        };

        let send_ctx = SendCtx {
            endpoint: Arc::clone(&endpoint),
            session: Arc::clone(&session),
            ctrl: Arc::clone(&ctrl),
            events_tx: events_tx.clone(),
            retry: options.retry.clone(),
            chunk_timeout: options.chunk_timeout,
            halt: halt.clone(),
        };
        join.spawn(send_chunk(send_ctx, header, chunk.data, permit));
    }

    // Let in-flight requests finish before deciding the outcome.
    while join.join_next().await.is_some() {}

    if ctrl.cancel.is_cancelled() {
        debug!(upload_id = %upload_id, "dispatch ended after abort");
        return;
    }
    if session.state() == UploadState::Error {
        return;
    }
    if session.is_fully_acked() {
        match session.result_path() {
            Some(p) => {
                if session.complete(&p) {
                    info!(upload_id = %upload_id, path = %p, "upload completed");
                    emit_reliable(
                        &ctrl,
                        &events_tx,
                        UploadEvent::StateChanged {
                            state: UploadState::Completed,
                        },
                    )
                    .await;
                    emit_reliable(&ctrl, &events_tx, UploadEvent::Completed { path: p }).await;
                }
            }
            None => {
                fail_once(
                    &session,
                    &ctrl,
                    &events_tx,
                    &halt,
                    &UploadError::MissingPath.to_string(),
                )
                .await;
            }
        }
    }
}

struct SendCtx {
    endpoint: Arc<dyn UploadEndpoint>,
    session: Arc<UploadSession>,
    ctrl: Arc<Controls>,
    events_tx: mpsc::Sender<UploadEvent>,
    retry: RetryPolicy,
    chunk_timeout: Duration,
    halt: CancellationToken,
}

/// Sends one chunk with timeout and backoff. Holds its concurrency permit
/// for the whole attempt sequence.
async fn send_chunk(
    ctx: SendCtx,
    header: ChunkRequest,
    data: Vec<u8>,
    _permit: OwnedSemaphorePermit,
) {
    let index = header.chunk_index;
    let bytes = data.len() as u64;
    let attempts = ctx.retry.max_attempts.max(1);
    let mut last_err = String::new();

    for attempt in 0..attempts {
        let send = ctx.endpoint.send_chunk(header.clone(), data.clone());
        let result = tokio::select! {
            biased;
            _ = ctx.ctrl.cancel.cancelled() => return,
            r = tokio::time::timeout(ctx.chunk_timeout, send) => r,
        };

        match result {
            Ok(Ok(ack)) if ack.received => {
                if let Some(progress) = ctx.session.record_ack(index, bytes, ack.path) {
                    emit(
                        &ctx.ctrl,
                        &ctx.events_tx,
                        UploadEvent::Progress {
                            percent: progress.percentage(),
                            confirmed_bytes: progress.confirmed_bytes,
                            total_bytes: progress.total_bytes,
                        },
                    );
                }
                return;
            }
            Ok(Ok(_)) => last_err = UploadError::ChunkRejected { index }.to_string(),
            Ok(Err(e)) => last_err = e.to_string(),
            Err(_) => last_err = UploadError::ChunkTimeout { index }.to_string(),
        }

        warn!(chunk = index, attempt = attempt + 1, error = %last_err, "chunk send failed");

        if attempt + 1 < attempts {
            tokio::select! {
                biased;
                _ = ctx.ctrl.cancel.cancelled() => return,
                _ = tokio::time::sleep(ctx.retry.delay_for(attempt)) => {}
            }
        }
    }

    fail_once(&ctx.session, &ctx.ctrl, &ctx.events_tx, &ctx.halt, &last_err).await;
}

/// Fails the session exactly once and stops further dispatch. Partial
/// progress is retained so retry resumes rather than restarts.
async fn fail_once(
    session: &UploadSession,
    ctrl: &Controls,
    events_tx: &mpsc::Sender<UploadEvent>,
    halt: &CancellationToken,
    msg: &str,
) {
    halt.cancel();
    if session.fail(msg) {
        error!(upload_id = %session.id(), error = %msg, "upload failed");
        emit_reliable(
            ctrl,
            events_tx,
            UploadEvent::StateChanged {
                state: UploadState::Error,
            },
        )
        .await;
        emit_reliable(
            ctrl,
            events_tx,
            UploadEvent::Failed {
                error: msg.to_string(),
            },
        )
        .await;
    }
}
