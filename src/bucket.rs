//! Bucket staging buffers and output position planning.

use std::fs;
use std::io;
use std::io::prelude::*;

use crate::record::{RADIX, RECORD_SIZE};

/// Converts per-bucket record counts into per-bucket starting byte offsets,
/// in place: `offsets[i] = RECORD_SIZE * sum(counts[0..i])`.
///
/// The exclusive prefix sum gives every bucket a disjoint, contiguous region
/// of the output file sized exactly to its count, which is what makes each
/// pass a stable partition.
pub fn plan_offsets(counts: &mut [u64; RADIX]) {
    let mut total = 0u64;
    for slot in counts.iter_mut() {
        let count = *slot;
        *slot = total * RECORD_SIZE as u64;
        total += count;
    }
}

/// Buffered writer routing records into 256 bucket regions of an output file.
///
/// Each bucket owns a bounded staging buffer and a cursor into the output
/// file. Records are appended to their bucket's buffer; a buffer is flushed
/// to the file as soon as one more record would not fit, and once more at
/// pass end via [`BucketWriter::drain`]. Write-side memory is therefore
/// fixed at `RADIX` buffers of the configured capacity, independent of how
/// many records flow through.
pub struct BucketWriter {
    buffers: Vec<Vec<u8>>,
    cursors: [u64; RADIX],
    bucket_capacity: usize,
}

impl BucketWriter {
    /// Creates a writer whose per-bucket buffer capacity is the write-memory
    /// budget split evenly across all buckets, rounded down to a whole
    /// number of records (at least one).
    pub fn new(write_mem: usize) -> Self {
        let bucket_capacity = (write_mem / RADIX / RECORD_SIZE).max(1) * RECORD_SIZE;

        BucketWriter {
            buffers: (0..RADIX).map(|_| Vec::with_capacity(bucket_capacity)).collect(),
            cursors: [0; RADIX],
            bucket_capacity,
        }
    }

    /// Arms the writer for a new pass: cursors take the planned base offsets
    /// and all staging buffers are emptied.
    pub fn start_pass(&mut self, offsets: &[u64; RADIX]) {
        self.cursors = *offsets;
        for buf in &mut self.buffers {
            buf.clear();
        }
    }

    /// Appends one record to its bucket's staging buffer, flushing the
    /// bucket to `output` if the buffer cannot take another record after it.
    pub fn push(&mut self, output: &mut fs::File, digit: usize, record: &[u8]) -> io::Result<()> {
        debug_assert_eq!(record.len(), RECORD_SIZE);

        self.buffers[digit].extend_from_slice(record);
        if self.buffers[digit].len() + RECORD_SIZE > self.bucket_capacity {
            self.flush(output, digit)?;
        }

        Ok(())
    }

    /// Flushes every bucket's residual buffer content.
    ///
    /// Must be called exactly once at the end of a pass: a bucket holding
    /// fewer records than its buffer capacity never flushes on its own.
    pub fn drain(&mut self, output: &mut fs::File) -> io::Result<()> {
        for digit in 0..RADIX {
            self.flush(output, digit)?;
        }

        Ok(())
    }

    /// Writes a bucket's buffer at its cursor and advances the cursor by the
    /// bytes written. An empty buffer is a no-op, never a zero-length write.
    fn flush(&mut self, output: &mut fs::File, digit: usize) -> io::Result<()> {
        let buf = &mut self.buffers[digit];
        if buf.is_empty() {
            return Ok(());
        }

        output.seek(io::SeekFrom::Start(self.cursors[digit]))?;
        output.write_all(buf)?;

        self.cursors[digit] += buf.len() as u64;
        buf.clear();

        Ok(())
    }
}
