//! Scripted endpoint used by the engine and manager tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use brandup_protocol::{ChunkAck, ChunkRequest};
use tokio::sync::Semaphore;

use crate::endpoint::{EndpointFuture, UploadEndpoint};
use crate::error::UploadError;

/// In-memory endpoint that records every chunk it sees and can be
/// scripted to fail, stall, or withhold the final path.
pub(crate) struct MockEndpoint {
    sent: Mutex<Vec<(ChunkRequest, usize)>>,
    received: Mutex<HashSet<(String, u32)>>,
    fail_forever: HashSet<u32>,
    fail_times: Mutex<HashMap<u32, u32>>,
    gate_index: Option<u32>,
    gate: Semaphore,
    cancels: AtomicUsize,
    delay: Option<Duration>,
    jitter: bool,
    omit_paths: bool,
}

impl MockEndpoint {
    pub(crate) fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            received: Mutex::new(HashSet::new()),
            fail_forever: HashSet::new(),
            fail_times: Mutex::new(HashMap::new()),
            gate_index: None,
            gate: Semaphore::new(0),
            cancels: AtomicUsize::new(0),
            delay: None,
            jitter: false,
            omit_paths: false,
        }
    }

    /// Every send of `index` fails with a 500.
    pub(crate) fn failing_forever(mut self, index: u32) -> Self {
        self.fail_forever.insert(index);
        self
    }

    /// The first `times` sends of `index` fail, later ones succeed.
    pub(crate) fn failing_times(self, index: u32, times: u32) -> Self {
        self.fail_times.lock().unwrap().insert(index, times);
        self
    }

    /// Sends of `index` block until `release` grants a permit.
    pub(crate) fn gating(mut self, index: u32) -> Self {
        self.gate_index = Some(index);
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Staggers responses by chunk index so later chunks can land first.
    pub(crate) fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }

    /// Acks every chunk but never returns a stored path.
    pub(crate) fn without_paths(mut self) -> Self {
        self.omit_paths = true;
        self
    }

    pub(crate) fn release(&self, permits: usize) {
        self.gate.add_permits(permits);
    }

    pub(crate) fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub(crate) fn sent_sizes(&self) -> Vec<usize> {
        self.sent.lock().unwrap().iter().map(|(_, n)| *n).collect()
    }

    pub(crate) fn sent_indices(&self) -> Vec<u32> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(h, _)| h.chunk_index)
            .collect()
    }

    pub(crate) fn sent_headers(&self) -> Vec<ChunkRequest> {
        self.sent.lock().unwrap().iter().map(|(h, _)| h.clone()).collect()
    }

    pub(crate) fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    /// Polls until at least `count` sends have been recorded.
    pub(crate) async fn wait_for_sends(&self, count: usize) {
        for _ in 0..500 {
            if self.sent_count() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {count} sends, saw {}", self.sent_count());
    }
}

impl UploadEndpoint for MockEndpoint {
    fn send_chunk(&self, header: ChunkRequest, data: Vec<u8>) -> EndpointFuture<'_, ChunkAck> {
        Box::pin(async move {
            self.sent.lock().unwrap().push((header.clone(), data.len()));

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.jitter {
                let stagger = u64::from(7 - header.chunk_index % 8) * 3;
                tokio::time::sleep(Duration::from_millis(stagger)).await;
            }
            if self.gate_index == Some(header.chunk_index) {
                let permit = self
                    .gate
                    .acquire()
                    .await
                    .map_err(|_| UploadError::Cancelled)?;
                permit.forget();
            }

            if self.fail_forever.contains(&header.chunk_index) {
                return Err(UploadError::Status(500));
            }
            {
                let mut times = self.fail_times.lock().unwrap();
                if let Some(remaining) = times.get_mut(&header.chunk_index) {
                    if *remaining > 0 {
                        *remaining -= 1;
                        return Err(UploadError::Status(500));
                    }
                }
            }

            let mut received = self.received.lock().unwrap();
            received.insert((header.upload_id.clone(), header.chunk_index));
            let have = received
                .iter()
                .filter(|(id, _)| *id == header.upload_id)
                .count() as u32;
            let path = (!self.omit_paths && have == header.total_chunks)
                .then(|| format!("/uploads/{}", header.file_name));

            Ok(ChunkAck {
                received: true,
                path,
            })
        })
    }

    fn cancel(&self, _upload_id: String) -> EndpointFuture<'_, ()> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }
}
