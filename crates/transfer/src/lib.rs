//! File slicing and validation for the admin console's chunked uploads.

mod chunked;
mod progress;
mod types;
mod validation;

pub use chunked::{ChunkReader, calculate_file_checksum, checksum_bytes};
pub use progress::SpeedCalculator;
pub use types::Chunk;
pub use validation::{FileConstraints, validate_file};

/// Default chunk size: 1 MiB.
///
/// Matches the backend's per-request body limit with headroom. The engine
/// can override this per upload.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Number of chunks needed to cover `total_bytes` at `chunk_size`.
///
/// A `chunk_size` of 0 falls back to [`DEFAULT_CHUNK_SIZE`]. Zero-byte
/// files yield zero chunks; callers reject those at validation.
pub fn chunk_count(total_bytes: u64, chunk_size: u64) -> u32 {
    let chunk_size = if chunk_size == 0 {
        DEFAULT_CHUNK_SIZE as u64
    } else {
        chunk_size
    };
    total_bytes.div_ceil(chunk_size) as u32
}

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file is empty")]
    EmptyFile,

    #[error("file is {size} bytes, limit is {max}")]
    FileTooLarge { size: u64, max: u64 },

    #[error("file type not allowed: {0}")]
    UnsupportedType(String),

    #[error("invalid file name: {0}")]
    InvalidFileName(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_count_exact_multiple() {
        assert_eq!(chunk_count(4096, 1024), 4);
    }

    #[test]
    fn chunk_count_with_remainder() {
        // 2.5 MiB at 1 MiB chunks -> 3 chunks.
        assert_eq!(chunk_count(2_621_440, 1_048_576), 3);
    }

    #[test]
    fn chunk_count_file_smaller_than_chunk() {
        assert_eq!(chunk_count(10, 1024), 1);
    }

    #[test]
    fn chunk_count_single_byte() {
        assert_eq!(chunk_count(1, 1), 1);
    }

    #[test]
    fn chunk_count_zero_bytes() {
        assert_eq!(chunk_count(0, 1024), 0);
    }

    #[test]
    fn chunk_count_zero_chunk_size_uses_default() {
        assert_eq!(chunk_count(DEFAULT_CHUNK_SIZE as u64 + 1, 0), 2);
    }
}
