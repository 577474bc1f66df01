//! Post-sort verification utilities.

use std::fs;
use std::io;
use std::path::Path;

use crate::chunk::ChunkReader;
use crate::record::{Record, RECORD_SIZE};
use crate::sort::DEFAULT_READ_MEM;

/// Returns the number of whole records in a record file.
///
/// A dangling partial record at the tail does not count.
pub fn record_count(file: &fs::File) -> io::Result<u64> {
    Ok(file.metadata()?.len() / RECORD_SIZE as u64)
}

/// Checks that the record file at `path` is sorted by key in ascending
/// order, streaming it in bounded memory. An empty file is sorted.
pub fn is_sorted<P: AsRef<Path>>(path: P) -> io::Result<bool> {
    let mut file = fs::File::open(path)?;
    let num_records = record_count(&file)?;

    let mut prev_key: Option<u32> = None;
    let mut reader = ChunkReader::new(&mut file, DEFAULT_READ_MEM, num_records);
    while let Some(chunk) = reader.next_chunk()? {
        for record in chunk.chunks_exact(RECORD_SIZE) {
            let key = Record::from_bytes(record).key;
            if prev_key.map_or(false, |prev| prev > key) {
                return Ok(false);
            }
            prev_key = Some(key);
        }
    }

    return Ok(true);
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::io::prelude::*;

    use rstest::*;

    use super::is_sorted;
    use crate::record::Record;

    #[fixture]
    fn tmp_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    fn write_keys(path: &std::path::Path, keys: &[u32]) {
        let mut file = fs::File::create(path).unwrap();
        for &key in keys {
            file.write_all(&Record { key, value: 0 }.to_bytes()).unwrap();
        }
    }

    #[rstest]
    #[case(vec![], true)]
    #[case(vec![1], true)]
    #[case(vec![1, 2, 2, 3], true)]
    #[case(vec![2, 1], false)]
    #[case(vec![1, 2, 3, 0], false)]
    fn test_is_sorted(tmp_dir: tempfile::TempDir, #[case] keys: Vec<u32>, #[case] expected: bool) {
        let path = tmp_dir.path().join("records.bin");
        write_keys(&path, &keys);

        assert_eq!(is_sorted(&path).unwrap(), expected);
    }

    #[rstest]
    fn test_order_checked_across_chunk_boundaries(tmp_dir: tempfile::TempDir) {
        // descending pair far enough into the file to span default chunks
        let mut keys: Vec<u32> = (0..100_000).collect();
        keys.push(0);

        let path = tmp_dir.path().join("records.bin");
        write_keys(&path, &keys);

        assert!(!is_sorted(&path).unwrap());
    }
}
