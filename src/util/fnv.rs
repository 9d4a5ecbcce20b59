//! FNV-1a-32, used for per-item tamper detection (spec.md §6 "FNV-1a-32").

const FNV_PRIME: u32 = 0x0100_0193;
const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;

/// Compute the 32-bit FNV-1a hash over `data`.
pub fn fnv1a32(data: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in data {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Render an FNV-1a-32 value as 8 lowercase hex characters, the on-disk
/// representation used by P2L entries and revision-file footers.
pub fn to_hex(checksum: u32) -> String {
    format!("{:08x}", checksum)
}

/// Parse the 8 lowercase hex character representation back into a checksum.
pub fn from_hex(s: &str) -> crate::Result<u32> {
    err_at!(MalformedIndex, u32::from_str_radix(s, 16), "fnv1a hex {:?}", s)
}

#[cfg(test)]
#[path = "fnv_test.rs"]
mod fnv_test;
