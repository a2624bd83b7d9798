//! Upload endpoint trait and the HTTP implementation.
//!
//! `UploadEndpoint` is the seam between the engine and the backend. The
//! engine only ever sends chunks and cancel requests through it, which
//! keeps the dispatch logic testable with scripted mocks.

use std::future::Future;
use std::pin::Pin;

use brandup_protocol::{CancelRequest, ChunkAck, ChunkRequest};

use crate::error::UploadError;

/// Boxed future returned by endpoint methods.
pub type EndpointFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, UploadError>> + Send + 'a>>;

/// Abstract connection to the admin backend's upload API.
pub trait UploadEndpoint: Send + Sync {
    /// Sends one chunk and waits for its acknowledgment.
    fn send_chunk(&self, header: ChunkRequest, data: Vec<u8>) -> EndpointFuture<'_, ChunkAck>;

    /// Asks the backend to discard partially uploaded data (best effort).
    fn cancel(&self, upload_id: String) -> EndpointFuture<'_, ()>;
}

/// HTTP implementation of [`UploadEndpoint`].
///
/// Chunk metadata travels as query parameters, the payload as a raw
/// `application/octet-stream` body; the backend answers with a JSON
/// [`ChunkAck`]. Cancellation posts a JSON [`CancelRequest`].
pub struct HttpEndpoint {
    client: reqwest::Client,
    upload_url: String,
    cancel_url: String,
}

impl HttpEndpoint {
    pub fn new(upload_url: impl Into<String>, cancel_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            upload_url: upload_url.into(),
            cancel_url: cancel_url.into(),
        }
    }

    /// Uses a preconfigured client (custom timeouts, proxies, headers).
    pub fn with_client(
        client: reqwest::Client,
        upload_url: impl Into<String>,
        cancel_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            upload_url: upload_url.into(),
            cancel_url: cancel_url.into(),
        }
    }
}

impl UploadEndpoint for HttpEndpoint {
    fn send_chunk(&self, header: ChunkRequest, data: Vec<u8>) -> EndpointFuture<'_, ChunkAck> {
        Box::pin(async move {
            let query = [
                ("uploadId", header.upload_id),
                ("fileName", header.file_name),
                ("chunkIndex", header.chunk_index.to_string()),
                ("totalChunks", header.total_chunks.to_string()),
                ("offset", header.offset.to_string()),
                ("totalBytes", header.total_bytes.to_string()),
                ("checksum", header.checksum),
            ];

            let resp = self
                .client
                .post(&self.upload_url)
                .query(&query)
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .body(data)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                return Err(UploadError::Status(status.as_u16()));
            }

            let ack: ChunkAck = resp.json().await?;
            Ok(ack)
        })
    }

    fn cancel(&self, upload_id: String) -> EndpointFuture<'_, ()> {
        Box::pin(async move {
            let resp = self
                .client
                .post(&self.cancel_url)
                .json(&CancelRequest { upload_id })
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                return Err(UploadError::Status(status.as_u16()));
            }
            Ok(())
        })
    }
}
