//! CRC32 integrity checking
//!
//! Uses the common IEEE/reflected polynomial (0xEDB88320), the same
//! checksum `crc32fast` implements, so a single pass over a buffer and an
//! incremental multi-call computation always agree regardless of how the
//! buffer is split.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Bounded read buffer used by [`crc32_file`] so hashing a large file
/// never requires loading it whole.
const READ_BUF_SIZE: usize = 64 * 1024;

/// Incremental CRC32 state. Opaque wrapper so callers don't depend on
/// `crc32fast`'s type directly.
#[derive(Clone, Default)]
pub struct Crc32State(crc32fast::Hasher);

/// CRC32 of a single buffer.
pub fn crc32(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}

/// Fold another buffer into an in-progress CRC32 computation.
///
/// `crc32_update(crc32_update(Crc32State::default(), a), b)` then
/// `crc32_finalize` equals `crc32(a ++ b)` for any split of the
/// concatenation.
pub fn crc32_update(mut state: Crc32State, bytes: &[u8]) -> Crc32State {
    state.0.update(bytes);
    state
}

/// Finalize an incremental computation into the CRC32 value.
pub fn crc32_finalize(state: Crc32State) -> u32 {
    state.0.finalize()
}

/// Stream a file's contents through CRC32 in bounded-size reads.
pub fn crc32_file(path: impl AsRef<Path>) -> io::Result<u32> {
    let mut file = File::open(path)?;
    let mut hasher = crc32fast::Hasher::new();
    let mut buf = [0u8; READ_BUF_SIZE];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer_matches_crc32fast_constant() {
        assert_eq!(crc32(&[]), 0);
    }

    #[test]
    fn incremental_matches_one_shot() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let whole = crc32(data);

        let state = crc32_update(Crc32State::default(), data);
        assert_eq!(crc32_finalize(state), whole);
    }

    #[test]
    fn associative_under_any_split() {
        let data = b"0123456789abcdefghijklmnopqrstuvwxyz";
        let whole = crc32(data);

        for split in 0..=data.len() {
            let (a, b) = data.split_at(split);
            let state = crc32_update(crc32_update(Crc32State::default(), a), b);
            assert_eq!(crc32_finalize(state), whole, "split at {split}");
        }
    }

    #[test]
    fn file_hash_matches_buffer_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        let payload = vec![0xABu8; READ_BUF_SIZE * 3 + 17];
        std::fs::write(&path, &payload).unwrap();

        assert_eq!(crc32_file(&path).unwrap(), crc32(&payload));
    }

    #[test]
    fn file_hash_propagates_io_error() {
        let result = crc32_file("/nonexistent/path/does/not/exist.bin");
        assert!(result.is_err());
    }
}
