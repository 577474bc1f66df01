//! External radix sorter.

use log;
use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::fs;
use std::io;
use std::io::prelude::*;
use std::mem;
use std::path::Path;

use crate::bucket::{plan_offsets, BucketWriter};
use crate::chunk::ChunkReader;
use crate::record::{pass_divisor, Record, NUM_PASSES, RADIX, RECORD_SIZE};

/// Default read-memory budget: one chunk buffer of this many bytes.
pub const DEFAULT_READ_MEM: usize = 300_000;
/// Default write-memory budget, split evenly across the 256 bucket buffers.
pub const DEFAULT_WRITE_MEM: usize = 600_000;

/// Sorting error.
#[derive(Debug)]
pub enum SortError {
    /// Scratch file creation error.
    Scratch(io::Error),
    /// Common I/O error.
    IO(io::Error),
}

impl Error for SortError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(match &self {
            SortError::Scratch(err) => err,
            SortError::IO(err) => err,
        })
    }
}

impl Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            SortError::Scratch(err) => write!(f, "scratch file not created: {}", err),
            SortError::IO(err) => write!(f, "I/O operation failed: {}", err),
        }
    }
}

/// Orchestrator phase within one sort run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Counting,
    Planning,
    Writing,
    Swapping,
    Finalizing,
    Done,
}

fn advance(phase: &mut Phase, next: Phase, pass: usize) {
    log::debug!("pass {}: {:?} -> {:?}", pass, phase, next);
    *phase = next;
}

/// Radix sorter builder. Provides methods for [`RadixSorter`] initialization.
#[derive(Clone)]
pub struct RadixSorterBuilder {
    /// Read-memory budget in bytes (chunk buffer size).
    read_mem: Option<usize>,
    /// Write-memory budget in bytes (sum of all bucket staging buffers).
    write_mem: Option<usize>,
    /// Directory to be used to store the scratch file.
    tmp_dir: Option<Box<Path>>,
}

impl RadixSorterBuilder {
    /// Creates an instance of a builder with default parameters.
    pub fn new() -> Self {
        RadixSorterBuilder::default()
    }

    /// Builds a [`RadixSorter`] instance using provided configuration.
    pub fn build(self) -> RadixSorter {
        RadixSorter {
            read_mem: self.read_mem.unwrap_or(DEFAULT_READ_MEM),
            write_mem: self.write_mem.unwrap_or(DEFAULT_WRITE_MEM),
            tmp_dir: self.tmp_dir,
        }
    }

    /// Sets the read-memory budget in bytes.
    pub fn with_read_mem(mut self, read_mem: usize) -> RadixSorterBuilder {
        self.read_mem = Some(read_mem);
        return self;
    }

    /// Sets the write-memory budget in bytes.
    pub fn with_write_mem(mut self, write_mem: usize) -> RadixSorterBuilder {
        self.write_mem = Some(write_mem);
        return self;
    }

    /// Sets directory to be used to store the scratch file.
    pub fn with_tmp_dir(mut self, path: &Path) -> RadixSorterBuilder {
        self.tmp_dir = Some(path.into());
        return self;
    }
}

impl Default for RadixSorterBuilder {
    fn default() -> Self {
        RadixSorterBuilder {
            read_mem: None,
            write_mem: None,
            tmp_dir: None,
        }
    }
}

/// External LSD radix sorter for files of fixed-size records.
///
/// Sorts a record file in place by the 32-bit key, stably, in exactly
/// [`NUM_PASSES`] counting passes that ping-pong between the original file
/// and one scratch file. Memory usage is bounded by the configured read and
/// write budgets no matter how many records the file holds.
pub struct RadixSorter {
    read_mem: usize,
    write_mem: usize,
    tmp_dir: Option<Box<Path>>,
}

impl RadixSorter {
    /// Sorts the record file at `path` in place.
    ///
    /// On success the file contains the same records in ascending key order,
    /// equal keys keeping their original relative order, and the file length
    /// is exactly `record_count * RECORD_SIZE` (a dangling partial record at
    /// the tail is dropped, not sorted). On error the file may be left in an
    /// intermediate state; passes are not transactional.
    pub fn sort<P: AsRef<Path>>(&self, path: P) -> Result<(), SortError> {
        let path = path.as_ref();

        let original = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(SortError::IO)?;

        let file_len = original.metadata().map_err(SortError::IO)?.len();
        let num_records = file_len / RECORD_SIZE as u64;
        log::info!(
            "sorting {} ({} records, {} trailing bytes ignored)",
            path.display(),
            num_records,
            file_len % RECORD_SIZE as u64
        );

        let scratch = self.create_scratch()?;
        self.run_passes(original, scratch, num_records).map_err(SortError::IO)?;

        log::info!("sorting {} done", path.display());
        return Ok(());
    }

    fn create_scratch(&self) -> Result<fs::File, SortError> {
        // Anonymous temp file: deleted as soon as the handle drops and can
        // never alias the input path.
        let scratch = match &self.tmp_dir {
            Some(dir) => tempfile::tempfile_in(dir),
            None => tempfile::tempfile(),
        }
        .map_err(SortError::Scratch)?;

        return Ok(scratch);
    }

    /// Runs the 4 counting passes over the file pair and finalizes the
    /// result into `original`.
    ///
    /// `input` and `output` are role bindings, not identities: the handles
    /// swap after every pass so that no pass ever writes over its own input.
    fn run_passes(&self, original: fs::File, scratch: fs::File, num_records: u64) -> io::Result<()> {
        let mut phase = Phase::Idle;

        let mut input = original;
        let mut output = scratch;
        // whether the latest pass output (and initially the unsorted data)
        // lives in the original file
        let mut sorted_in_original = true;

        let mut writer = BucketWriter::new(self.write_mem);

        for pass in 0..NUM_PASSES {
            let divisor = pass_divisor(pass);

            advance(&mut phase, Phase::Counting, pass);
            let mut counts = self.count_digits(&mut input, num_records, divisor)?;

            advance(&mut phase, Phase::Planning, pass);
            plan_offsets(&mut counts);

            advance(&mut phase, Phase::Writing, pass);
            self.route_records(&mut input, &mut output, &mut writer, &counts, divisor, num_records)?;

            advance(&mut phase, Phase::Swapping, pass);
            mem::swap(&mut input, &mut output);
            sorted_in_original = !sorted_in_original;
        }

        advance(&mut phase, Phase::Finalizing, NUM_PASSES);
        // after the final swap the sorted data sits in `input`
        self.finalize(input, output, sorted_in_original, num_records)?;

        advance(&mut phase, Phase::Done, NUM_PASSES);
        return Ok(());
    }

    /// Counting sub-step: tallies how many records carry each digit value in
    /// the current pass. Reads the whole input in chunks, mutates nothing.
    fn count_digits(
        &self,
        input: &mut fs::File,
        num_records: u64,
        divisor: u32,
    ) -> io::Result<[u64; RADIX]> {
        let mut counts = [0u64; RADIX];

        let mut reader = ChunkReader::new(input, self.read_mem, num_records);
        while let Some(chunk) = reader.next_chunk()? {
            for record in chunk.chunks_exact(RECORD_SIZE) {
                counts[Record::from_bytes(record).digit(divisor)] += 1;
            }
        }

        return Ok(counts);
    }

    /// Routing sub-step: re-reads the input in the same order as the count
    /// scan and distributes every record into its bucket region of the
    /// output file. The re-read is inherent to counting passes: destinations
    /// are unknowable before the global count completes.
    fn route_records(
        &self,
        input: &mut fs::File,
        output: &mut fs::File,
        writer: &mut BucketWriter,
        offsets: &[u64; RADIX],
        divisor: u32,
        num_records: u64,
    ) -> io::Result<()> {
        writer.start_pass(offsets);

        let mut reader = ChunkReader::new(input, self.read_mem, num_records);
        while let Some(chunk) = reader.next_chunk()? {
            for record in chunk.chunks_exact(RECORD_SIZE) {
                let digit = Record::from_bytes(record).digit(divisor);
                writer.push(output, digit, record)?;
            }
        }

        // mandatory drain: buckets smaller than their buffer never flush on
        // their own
        return writer.drain(output);
    }

    /// Ensures the sorted data ends up in the original file, trimmed to a
    /// whole number of records.
    ///
    /// `sorted` is the handle holding the final pass output; `other` is its
    /// ping-pong partner. With an even pass count `sorted` is the original
    /// file itself and only the length fixup applies, but the copy-back path
    /// keeps the finalizer correct for any role outcome.
    fn finalize(
        &self,
        mut sorted: fs::File,
        mut other: fs::File,
        sorted_in_original: bool,
        num_records: u64,
    ) -> io::Result<()> {
        let data_len = num_records * RECORD_SIZE as u64;

        if sorted_in_original {
            // stale bytes past the live records (a partial trailing record,
            // or leftovers from a shrunk earlier state) must not survive
            sorted.set_len(data_len)?;
            return Ok(());
        }

        log::debug!("copying {} sorted bytes back into the original file", data_len);

        sorted.seek(io::SeekFrom::Start(0))?;
        other.set_len(0)?;
        other.seek(io::SeekFrom::Start(0))?;

        // single reusable buffer, forward sequential copy
        let mut buf = vec![0u8; self.read_mem.max(RECORD_SIZE)];
        let mut remaining = data_len;
        while remaining > 0 {
            let want = remaining.min(buf.len() as u64) as usize;
            sorted.read_exact(&mut buf[..want])?;
            other.write_all(&buf[..want])?;
            remaining -= want as u64;
        }

        return Ok(());
    }
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::io::prelude::*;
    use std::path::Path;

    use rand::prelude::*;
    use rstest::*;

    use super::{RadixSorter, RadixSorterBuilder};
    use crate::record::{Record, RECORD_SIZE};

    fn write_records(path: &Path, records: &[(u32, u32)]) {
        let mut file = fs::File::create(path).unwrap();
        for &(key, value) in records {
            file.write_all(&Record { key, value }.to_bytes()).unwrap();
        }
    }

    fn read_records(path: &Path) -> Vec<(u32, u32)> {
        let data = fs::read(path).unwrap();
        assert_eq!(data.len() % RECORD_SIZE, 0);
        data.chunks_exact(RECORD_SIZE)
            .map(|raw| {
                let record = Record::from_bytes(raw);
                (record.key, record.value)
            })
            .collect()
    }

    fn sorter() -> RadixSorter {
        RadixSorterBuilder::new().build()
    }

    #[fixture]
    fn tmp_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[rstest]
    // equal keys keep their input order
    #[case(
        vec![(5, 100), (3, 200), (5, 50)],
        vec![(3, 200), (5, 100), (5, 50)],
    )]
    // empty file stays empty
    #[case(vec![], vec![])]
    // single record is untouched
    #[case(vec![(42, 7)], vec![(42, 7)])]
    // all keys equal: output order is input order
    #[case(
        vec![(9, 1), (9, 2), (9, 3), (9, 4)],
        vec![(9, 1), (9, 2), (9, 3), (9, 4)],
    )]
    // keys differing only in the most significant byte exercise pass 3
    #[case(
        vec![(0xFF000000, 1), (0x01000000, 2), (0, 3)],
        vec![(0, 3), (0x01000000, 2), (0xFF000000, 1)],
    )]
    fn test_sort_scenarios(
        tmp_dir: tempfile::TempDir,
        #[case] input: Vec<(u32, u32)>,
        #[case] expected: Vec<(u32, u32)>,
    ) {
        let path = tmp_dir.path().join("records.bin");
        write_records(&path, &input);

        sorter().sort(&path).unwrap();

        assert_eq!(read_records(&path), expected);
    }

    #[rstest]
    fn test_partial_trailing_record_dropped(tmp_dir: tempfile::TempDir) {
        let path = tmp_dir.path().join("records.bin");
        write_records(&path, &[(3, 0), (1, 0), (2, 0)]);

        // 5 dangling bytes past the last whole record
        let mut file = fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&[0xAA; 5]).unwrap();
        drop(file);

        sorter().sort(&path).unwrap();

        assert_eq!(fs::metadata(&path).unwrap().len(), 3 * RECORD_SIZE as u64);
        assert_eq!(read_records(&path), vec![(1, 0), (2, 0), (3, 0)]);
    }

    #[rstest]
    fn test_short_file_truncated_to_zero_records(tmp_dir: tempfile::TempDir) {
        let path = tmp_dir.path().join("records.bin");
        fs::write(&path, [0xAA; 5]).unwrap();

        sorter().sort(&path).unwrap();

        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[rstest]
    // budgets small enough to force many chunks and per-record flushes
    #[case(1000, 4 * RECORD_SIZE, 1)]
    // budgets holding everything at once
    #[case(1000, 1 << 20, 1 << 20)]
    // default-ish budgets on a larger file
    #[case(20_000, 300_000, 600_000)]
    fn test_sort_matches_stable_std_sort(
        tmp_dir: tempfile::TempDir,
        #[case] count: usize,
        #[case] read_mem: usize,
        #[case] write_mem: usize,
    ) {
        let mut rng = rand::thread_rng();
        // few distinct keys so stability is actually exercised
        let input: Vec<(u32, u32)> =
            (0..count).map(|i| (rng.gen_range(0..64), i as u32)).collect();

        let path = tmp_dir.path().join("records.bin");
        write_records(&path, &input);

        let sorter = RadixSorterBuilder::new()
            .with_read_mem(read_mem)
            .with_write_mem(write_mem)
            .with_tmp_dir(tmp_dir.path())
            .build();
        sorter.sort(&path).unwrap();

        let mut expected = input;
        expected.sort_by_key(|&(key, _)| key); // stable

        assert_eq!(read_records(&path), expected);
    }

    #[rstest]
    fn test_sort_full_key_range(tmp_dir: tempfile::TempDir) {
        let mut rng = rand::thread_rng();
        let input: Vec<(u32, u32)> = (0..5000).map(|i| (rng.gen::<u32>(), i)).collect();

        let path = tmp_dir.path().join("records.bin");
        write_records(&path, &input);

        sorter().sort(&path).unwrap();

        let mut expected = input;
        expected.sort_by_key(|&(key, _)| key);

        assert_eq!(read_records(&path), expected);
    }

    #[rstest]
    fn test_sort_is_idempotent(tmp_dir: tempfile::TempDir) {
        let mut rng = rand::thread_rng();
        let input: Vec<(u32, u32)> = (0..1000).map(|i| (rng.gen::<u32>(), i)).collect();

        let path = tmp_dir.path().join("records.bin");
        write_records(&path, &input);

        sorter().sort(&path).unwrap();
        let first = fs::read(&path).unwrap();

        sorter().sort(&path).unwrap();
        let second = fs::read(&path).unwrap();

        assert_eq!(first, second);
    }

    #[rstest]
    fn test_missing_file_is_an_error(tmp_dir: tempfile::TempDir) {
        let result = sorter().sort(tmp_dir.path().join("absent.bin"));
        assert!(result.is_err());
    }
}
