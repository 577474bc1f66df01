//! Fixed-size record model and per-pass digit extraction.

/// Size of one record on disk: a 4-byte key followed by a 4-byte value.
pub const RECORD_SIZE: usize = 8;

/// Radix of one sorting pass: one byte, 256 bucket values.
pub const RADIX: usize = 256;

/// Number of passes needed to cover a 32-bit key at 8 bits per pass.
pub const NUM_PASSES: usize = 4;

/// An 8-byte record: an unsigned 32-bit key and an opaque 32-bit value.
///
/// The key is the only field that participates in ordering; the value is
/// payload carried alongside it. Records are stored big-endian with no
/// padding, so byte offset of record `i` in a file is always `i * 8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    pub key: u32,
    pub value: u32,
}

impl Record {
    /// Decodes a record from its on-disk representation.
    pub fn from_bytes(buf: &[u8]) -> Self {
        debug_assert_eq!(buf.len(), RECORD_SIZE);

        Record {
            key: u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
            value: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
        }
    }

    /// Encodes the record into its on-disk representation.
    pub fn to_bytes(self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        buf[..4].copy_from_slice(&self.key.to_be_bytes());
        buf[4..].copy_from_slice(&self.value.to_be_bytes());
        buf
    }

    /// Extracts the radix digit of the key for the pass whose divisor is
    /// `divisor` (see [`pass_divisor`]): `(key / divisor) % RADIX`.
    ///
    /// Keys are unsigned, so the division form is exactly byte extraction.
    pub fn digit(self, divisor: u32) -> usize {
        ((self.key / divisor) % RADIX as u32) as usize
    }
}

/// Returns the digit divisor for a pass: `RADIX` raised to the pass index.
///
/// Pass 0 extracts the least significant byte, pass 3 the most significant.
pub fn pass_divisor(pass: usize) -> u32 {
    (RADIX as u32).pow(pass as u32)
}
