//! `ext-radix` is an external LSD radix sort for files of fixed-size binary records.
//!
//! External sorting is required when the data being sorted does not fit into the main
//! memory (RAM) of a computer and instead must reside in slower external memory, usually
//! a hard disk drive. `ext-radix` sorts a file of 8-byte records (a 4-byte unsigned key
//! followed by a 4-byte opaque value) by key, stably, in four counting passes over the
//! data, one per key byte from least to most significant. Each pass streams the file in
//! bounded chunks, counts the 256 digit values, turns the counts into a stable partition
//! plan, and routes every record through a bounded staging buffer into its bucket region
//! of the output file. Passes ping-pong between the original file and one scratch file,
//! so a pass never overwrites its own input.
//!
//! # Overview
//!
//! * **In-place result:**
//!   on completion the original file holds the sorted records; the scratch file never
//!   outlives the sort.
//! * **Bounded memory:**
//!   total memory use is the configured read budget (one chunk buffer) plus the write
//!   budget (256 bucket buffers), independent of record count.
//! * **Stable order:**
//!   records with equal keys keep their original relative order.
//! * **Tolerant input:**
//!   a dangling partial record at the file tail is excluded from the sort and dropped
//!   from the output.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use ext_radix::{check, RadixSorter, RadixSorterBuilder};
//!
//! fn main() {
//!     env_logger::Builder::new().filter_level(log::LevelFilter::Debug).init();
//!
//!     let sorter: RadixSorter = RadixSorterBuilder::new()
//!         .with_read_mem(300_000)
//!         .with_write_mem(600_000)
//!         .with_tmp_dir(Path::new("./"))
//!         .build();
//!
//!     sorter.sort("records.bin").unwrap();
//!
//!     assert!(check::is_sorted("records.bin").unwrap());
//! }
//! ```

pub mod bucket;
pub mod check;
pub mod chunk;
pub mod record;
pub mod sort;

pub use bucket::BucketWriter;
pub use chunk::ChunkReader;
pub use record::{Record, NUM_PASSES, RADIX, RECORD_SIZE};
pub use sort::{RadixSorter, RadixSorterBuilder, SortError};
