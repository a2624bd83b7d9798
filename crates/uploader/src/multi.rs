//! Multi-file upload manager.
//!
//! Wraps an [`Uploader`] with a fixed number of slots, one per file. The
//! cap is enforced up front: an add beyond it is rejected without touching
//! the uploads already running. Slot order is stable, so galleries can map
//! slot indices onto their pending items.

use std::path::PathBuf;
use std::sync::Mutex;

use brandup_protocol::{UploadProgress, UploadState};
use tokio::sync::mpsc;
use tracing::info;

use crate::engine::Uploader;
use crate::error::UploadError;
use crate::handle::{UploadEvent, UploadHandle};

pub struct MultiUploader {
    uploader: Uploader,
    max_files: usize,
    slots: Mutex<Vec<UploadHandle>>,
}

impl MultiUploader {
    pub fn new(uploader: Uploader, max_files: usize) -> Self {
        Self {
            uploader,
            max_files: max_files.max(1),
            slots: Mutex::new(Vec::new()),
        }
    }

    pub fn max_files(&self) -> usize {
        self.max_files
    }

    pub fn len(&self) -> usize {
        self.slots.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().unwrap().is_empty()
    }

    /// Starts uploading `path` in the next free slot.
    ///
    /// Returns the slot index, or [`UploadError::FileCapReached`] when all
    /// slots are taken. A rejected add leaves the running uploads alone.
    pub fn add_file(&self, path: impl Into<PathBuf>) -> Result<usize, UploadError> {
        let mut slots = self.slots.lock().unwrap();
        if slots.len() >= self.max_files {
            return Err(UploadError::FileCapReached {
                cap: self.max_files,
            });
        }
        let handle = self.uploader.start(path)?;
        info!(upload_id = %handle.id(), slot = slots.len(), "file added");
        slots.push(handle);
        Ok(slots.len() - 1)
    }

    /// Aborts the upload in `index` and frees its slot. Later slots shift
    /// down by one. Returns `false` for an unknown index.
    pub async fn remove(&self, index: usize) -> bool {
        let handle = {
            let mut slots = self.slots.lock().unwrap();
            if index < slots.len() {
                Some(slots.remove(index))
            } else {
                None
            }
        };
        match handle {
            Some(h) => {
                h.abort().await;
                true
            }
            None => false,
        }
    }

    /// Takes the event receiver for one slot. Each slot's receiver can be
    /// taken once, same as [`UploadHandle::take_events`].
    pub fn take_events(&self, index: usize) -> Option<mpsc::Receiver<UploadEvent>> {
        self.slots.lock().unwrap().get_mut(index)?.take_events()
    }

    pub fn state(&self, index: usize) -> Option<UploadState> {
        self.slots.lock().unwrap().get(index).map(|h| h.state())
    }

    pub fn states(&self) -> Vec<UploadState> {
        self.slots.lock().unwrap().iter().map(|h| h.state()).collect()
    }

    pub fn progress(&self, index: usize) -> Option<UploadProgress> {
        self.slots.lock().unwrap().get(index).map(|h| h.progress())
    }

    pub fn pause(&self, index: usize) -> bool {
        self.slots
            .lock()
            .unwrap()
            .get(index)
            .is_some_and(|h| h.pause())
    }

    pub fn resume(&self, index: usize) -> bool {
        self.slots
            .lock()
            .unwrap()
            .get(index)
            .is_some_and(|h| h.resume())
    }

    pub fn retry(&self, index: usize) -> Result<(), UploadError> {
        match self.slots.lock().unwrap().get(index) {
            Some(h) => h.retry(),
            None => Err(UploadError::NotRetryable),
        }
    }

    /// Server paths in slot order; `None` for slots that have not
    /// completed.
    pub fn completed_paths(&self) -> Vec<Option<String>> {
        self.slots
            .lock()
            .unwrap()
            .iter()
            .map(|h| h.session().result_path())
            .collect()
    }

    /// Waits until every slot has settled, in slot order.
    pub async fn settled_all(&self) -> Vec<UploadState> {
        let mut states = Vec::new();
        let mut index = 0;
        loop {
            // Clone the handle's session out so the lock is not held
            // across an await.
            let session = {
                let slots = self.slots.lock().unwrap();
                match slots.get(index) {
                    Some(h) => std::sync::Arc::clone(h.session()),
                    None => break,
                }
            };
            loop {
                let state = session.state();
                if state.is_terminal() || state == UploadState::Error {
                    states.push(state);
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
            index += 1;
        }
        states
    }
}
