use std::io::Read;
use std::path::Path;

use uplift_protocol::constants::DEFAULT_CHUNK_SIZE;

use crate::TransferError;

/// One fixed-size piece of the source file.
///
/// `chunk_id` is 1-based and strictly increasing; it is the identifier
/// used in logs and failure reports. `byte_count` equals `data.len()`
/// and is only shorter than the chunk size for the final chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct FileChunk {
    pub chunk_id: u64,
    pub byte_count: usize,
    pub data: Vec<u8>,
}

/// Number of chunks a file of `file_size` bytes splits into.
pub fn total_chunks(file_size: u64, chunk_size: usize) -> u64 {
    if chunk_size == 0 {
        return 0;
    }
    file_size.div_ceil(chunk_size as u64)
}

/// Reads a file sequentially in fixed-size chunks.
pub struct ChunkReader {
    file: std::fs::File,
    chunk_size: usize,
    offset: u64,
    file_size: u64,
    next_chunk_id: u64,
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
            offset: 0,
            file_size,
            next_chunk_id: 1,
        })
    }

    /// Reads the next chunk. Returns `None` at EOF.
    pub fn next_chunk(&mut self) -> Result<Option<FileChunk>, TransferError> {
        let remaining = self.file_size.saturating_sub(self.offset);
        if remaining == 0 {
            return Ok(None);
        }

        let read_size = remaining.min(self.chunk_size as u64) as usize;
        let mut buf = vec![0u8; read_size];
        let n = self.file.read(&mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);

        let chunk = FileChunk {
            chunk_id: self.next_chunk_id,
            byte_count: n,
            data: buf,
        };
        self.offset += n as u64;
        self.next_chunk_id += 1;
        Ok(Some(chunk))
    }

    /// Current byte offset.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Total file size in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Chunks this file splits into at the configured chunk size.
    pub fn total_chunks(&self) -> u64 {
        total_chunks(self.file_size, self.chunk_size)
    }

    /// Bytes remaining to read.
    pub fn remaining(&self) -> u64 {
        self.file_size.saturating_sub(self.offset)
    }
}
