//! Snapshot wire layer
//!
//! Pure encode/decode, independent of the live store, so the persistence
//! format round-trips in tests without a channel. Layout:
//!
//! ```text
//! clipslot.active   → u32 scalar       charged active entries
//! clipslot.cursor   → u32 scalar       current slot index
//! clipslot.lengths  → capacity × u32   per-slot lengths, little-endian
//! clipslot.pair.N   → blob             slot[N] bytes ++ slot[N+1] bytes,
//!                                      even N, omitted when both empty
//! ```
//!
//! The split point inside a pair blob is implicit: exactly `lengths[N]`
//! bytes in. That is only recoverable because the length blob travels
//! separately, which is what lets two slots share one key.

use crate::error::{Error, Result};
use bytes::{Bytes, BytesMut};

/// Scalar key holding the active-entry count
pub const KEY_ACTIVE: &str = "clipslot.active";

/// Scalar key holding the cursor
pub const KEY_CURSOR: &str = "clipslot.cursor";

/// Blob key holding the per-slot length array
pub const KEY_LENGTHS: &str = "clipslot.lengths";

/// Blob key for the pair anchored at even slot index `index`
pub fn pair_key(index: usize) -> String {
    format!("clipslot.pair.{}", index)
}

/// Encode the per-slot length array as little-endian u32s
pub fn encode_lengths(lengths: &[u32]) -> Bytes {
    let mut buf = BytesMut::with_capacity(lengths.len() * 4);
    for &len in lengths {
        buf.extend_from_slice(&len.to_le_bytes());
    }
    buf.freeze()
}

/// Decode a length blob for a store of `capacity` slots
pub fn decode_lengths(bytes: &[u8], capacity: usize) -> Result<Vec<u32>> {
    if bytes.len() != capacity * 4 {
        return Err(Error::SnapshotCorrupt(format!(
            "length blob is {} bytes, expected {} for {} slots",
            bytes.len(),
            capacity * 4,
            capacity
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Concatenate a pair of slot payloads into one blob.
///
/// Empty and zero-length slots contribute nothing; the caller only packs
/// pairs whose combined length is nonzero.
pub fn pack_pair(first: Option<&[u8]>, second: Option<&[u8]>) -> Bytes {
    let first = first.unwrap_or_default();
    let second = second.unwrap_or_default();
    let mut buf = BytesMut::with_capacity(first.len() + second.len());
    buf.extend_from_slice(first);
    buf.extend_from_slice(second);
    buf.freeze()
}

/// Split a pair blob at the implicit offset `len_first`.
///
/// A zero-length half comes back as `None`, left empty rather than
/// allocated.
pub fn split_pair(
    blob: &[u8],
    len_first: usize,
    len_second: usize,
) -> Result<(Option<Vec<u8>>, Option<Vec<u8>>)> {
    if blob.len() != len_first + len_second {
        return Err(Error::SnapshotCorrupt(format!(
            "pair blob is {} bytes, expected {} + {}",
            blob.len(),
            len_first,
            len_second
        )));
    }
    let first = (len_first > 0).then(|| blob[..len_first].to_vec());
    let second = (len_second > 0).then(|| blob[len_first..].to_vec());
    Ok((first, second))
}
