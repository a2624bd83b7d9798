use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::types::Chunk;
use crate::{DEFAULT_CHUNK_SIZE, TransferError, chunk_count};

// ---------------------------------------------------------------------------
// Checksum helpers
// ---------------------------------------------------------------------------

/// Computes SHA-256 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Computes SHA-256 of an entire file and returns the hex-encoded digest.
pub fn calculate_file_checksum(path: &Path) -> Result<String, TransferError> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Reads a file as fixed-size indexed chunks with SHA-256 checksums.
///
/// Supports both sequential reading ([`next_chunk`](Self::next_chunk)) and
/// random access by index ([`chunk_at`](Self::chunk_at)), so a retry can
/// re-read exactly the chunks the server never acknowledged.
pub struct ChunkReader {
    file: std::fs::File,
    chunk_size: usize,
    next_index: u32,
    total_chunks: u32,
    file_size: u64,
}

impl ChunkReader {
    /// Opens `path` for chunked reading.
    ///
    /// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] is used.
    pub fn new(path: &Path, chunk_size: usize) -> Result<Self, TransferError> {
        let file = std::fs::File::open(path)?;
        let file_size = file.metadata()?.len();
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Ok(Self {
            file,
            chunk_size,
            next_index: 0,
            total_chunks: chunk_count(file_size, chunk_size as u64),
            file_size,
        })
    }

    /// Reads the chunk at `index`. Returns `None` when `index` is past the
    /// last chunk.
    pub fn chunk_at(&mut self, index: u32) -> Result<Option<Chunk>, TransferError> {
        if index >= self.total_chunks {
            return Ok(None);
        }

        let offset = index as u64 * self.chunk_size as u64;
        let size = (self.file_size - offset).min(self.chunk_size as u64) as usize;

        self.file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; size];
        self.file.read_exact(&mut buf)?;

        let checksum = checksum_bytes(&buf);
        Ok(Some(Chunk {
            index,
            offset,
            size,
            data: buf,
            checksum,
        }))
    }

    /// Reads the next chunk in sequence. Returns `None` at EOF.
    pub fn next_chunk(&mut self) -> Result<Option<Chunk>, TransferError> {
        let chunk = self.chunk_at(self.next_index)?;
        if chunk.is_some() {
            self.next_index += 1;
        }
        Ok(chunk)
    }

    /// Total file size in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Number of chunks covering the file.
    pub fn total_chunks(&self) -> u32 {
        self.total_chunks
    }

    /// Chunk size in bytes after normalization.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(data).unwrap();
        path
    }

    #[test]
    fn checksum_bytes_deterministic() {
        let c1 = checksum_bytes(b"hello world");
        let c2 = checksum_bytes(b"hello world");
        assert_eq!(c1, c2);
        assert_eq!(c1.len(), 64); // SHA-256 = 64 hex chars.
    }

    #[test]
    fn checksum_bytes_different_data() {
        assert_ne!(checksum_bytes(b"hello"), checksum_bytes(b"world"));
    }

    #[test]
    fn calculate_file_checksum_matches_bytes() {
        let dir = TempDir::new().unwrap();
        let data = b"test content for checksum";
        let path = create_test_file(dir.path(), "test.bin", data);

        let file_cs = calculate_file_checksum(&path).unwrap();
        assert_eq!(file_cs, checksum_bytes(data));
    }

    #[test]
    fn reader_reads_all_chunks_in_order() {
        let dir = TempDir::new().unwrap();
        let data = b"AABBCCDDEE"; // 10 bytes.
        let path = create_test_file(dir.path(), "test.bin", data);

        let mut reader = ChunkReader::new(&path, 4).unwrap();
        assert_eq!(reader.file_size(), 10);
        assert_eq!(reader.total_chunks(), 3);

        let c1 = reader.next_chunk().unwrap().unwrap();
        assert_eq!(c1.index, 0);
        assert_eq!(c1.offset, 0);
        assert_eq!(&c1.data, b"AABB");
        assert!(!c1.checksum.is_empty());

        let c2 = reader.next_chunk().unwrap().unwrap();
        assert_eq!(c2.index, 1);
        assert_eq!(c2.offset, 4);
        assert_eq!(&c2.data, b"CCDD");

        let c3 = reader.next_chunk().unwrap().unwrap();
        assert_eq!(c3.index, 2);
        assert_eq!(c3.offset, 8);
        assert_eq!(c3.size, 2);
        assert_eq!(&c3.data, b"EE");

        assert!(reader.next_chunk().unwrap().is_none());
    }

    #[test]
    fn chunk_at_random_access() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "test.bin", b"0123456789");

        let mut reader = ChunkReader::new(&path, 4).unwrap();
        let c = reader.chunk_at(1).unwrap().unwrap();
        assert_eq!(c.offset, 4);
        assert_eq!(&c.data, b"4567");

        // Reading an earlier chunk afterwards still works.
        let c = reader.chunk_at(0).unwrap().unwrap();
        assert_eq!(&c.data, b"0123");
    }

    #[test]
    fn chunk_at_past_end_is_none() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "test.bin", b"0123456789");

        let mut reader = ChunkReader::new(&path, 4).unwrap();
        assert!(reader.chunk_at(3).unwrap().is_none());
    }

    #[test]
    fn chunk_sizes_for_trailing_partial_chunk() {
        // 2.5 "MB" file at 1 "MB" chunks, scaled down 1024x:
        // 2560 bytes at 1024 -> chunks of 1024, 1024, 512.
        let dir = TempDir::new().unwrap();
        let data = vec![7u8; 2560];
        let path = create_test_file(dir.path(), "video.mp4", &data);

        let mut reader = ChunkReader::new(&path, 1024).unwrap();
        assert_eq!(reader.total_chunks(), 3);

        let sizes: Vec<usize> = (0..3)
            .map(|i| reader.chunk_at(i).unwrap().unwrap().size)
            .collect();
        assert_eq!(sizes, vec![1024, 1024, 512]);
    }

    #[test]
    fn empty_file_has_no_chunks() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "empty.bin", b"");

        let mut reader = ChunkReader::new(&path, 4).unwrap();
        assert_eq!(reader.total_chunks(), 0);
        assert!(reader.next_chunk().unwrap().is_none());
    }

    #[test]
    fn zero_chunk_size_uses_default() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "test.bin", b"x");
        let reader = ChunkReader::new(&path, 0).unwrap();
        assert_eq!(reader.chunk_size(), DEFAULT_CHUNK_SIZE);
        assert_eq!(reader.total_chunks(), 1);
    }
}
