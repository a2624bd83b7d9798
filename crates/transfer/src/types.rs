/// A contiguous byte-range slice of a file, sent in one request.
///
/// Derived on demand from the file and chunk size; never persisted.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Zero-based position within the file's chunk sequence.
    pub index: u32,
    /// Byte offset of this chunk within the file.
    pub offset: u64,
    /// Size of this chunk in bytes.
    pub size: usize,
    /// Raw chunk data.
    pub data: Vec<u8>,
    /// SHA-256 hex checksum of `data`.
    pub checksum: String,
}
