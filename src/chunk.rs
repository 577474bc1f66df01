//! Chunked reader over a fixed-size-record file.

use std::fs;
use std::io;
use std::io::prelude::*;

use crate::record::RECORD_SIZE;

/// Sequential chunked reader over the live records of a file.
///
/// Each chunk is produced by a single positioned bulk read at
/// `record_index * RECORD_SIZE` and holds `min(chunk_capacity, remaining)`
/// records as raw bytes. Chunk capacity is the read-memory budget divided by
/// the record size and stays constant for the reader's whole lifetime, so
/// read-side memory is one chunk buffer regardless of file size. The reader
/// never touches bytes past `total_records * RECORD_SIZE`; a dangling
/// partial record at the file tail is invisible to it.
pub struct ChunkReader<'a> {
    file: &'a mut fs::File,
    buf: Vec<u8>,
    chunk_records: u64,
    next_record: u64,
    total_records: u64,
}

impl<'a> ChunkReader<'a> {
    /// Creates a reader positioned at record `0`.
    ///
    /// # Arguments
    /// * `file` - File to read records from
    /// * `read_mem` - Read-memory budget in bytes; the chunk buffer is sized
    ///   to the largest whole number of records fitting the budget (at least one)
    /// * `total_records` - Number of live records the reader may consume
    pub fn new(file: &'a mut fs::File, read_mem: usize, total_records: u64) -> Self {
        let chunk_records = (read_mem / RECORD_SIZE).max(1);

        ChunkReader {
            file,
            buf: vec![0u8; chunk_records * RECORD_SIZE],
            chunk_records: chunk_records as u64,
            next_record: 0,
            total_records,
        }
    }

    /// Reads the next chunk, returning `None` once all records are consumed.
    ///
    /// The returned slice length is always a multiple of [`RECORD_SIZE`];
    /// the final chunk may be shorter than the configured capacity.
    pub fn next_chunk(&mut self) -> io::Result<Option<&[u8]>> {
        if self.next_record >= self.total_records {
            return Ok(None);
        }

        let records = (self.total_records - self.next_record).min(self.chunk_records);
        let bytes = records as usize * RECORD_SIZE;

        self.file
            .seek(io::SeekFrom::Start(self.next_record * RECORD_SIZE as u64))?;
        self.file.read_exact(&mut self.buf[..bytes])?;
        self.next_record += records;

        Ok(Some(&self.buf[..bytes]))
    }
}
