//! Size limits and overflow-checked arithmetic for values read off disk.
//!
//! A corrupt or hostile VHD/VMDK can claim an arbitrarily large block size,
//! BAT entry count, or extent size; these helpers stop that from turning
//! into an allocation that exhausts memory or an integer overflow that
//! turns into a short read.

use crate::Error;

/// Largest block size a dynamic VHD's header is allowed to declare.
pub const MAX_BLOCK_SIZE: u32 = 256 * 1024 * 1024;

/// Largest file we'll memory-map in one window (16 GB — matches the
/// teacher's `MmapPipeline` cap).
pub const MAX_MMAP_SIZE: u64 = 16 * 1024 * 1024 * 1024;

/// Largest single allocation this crate will make for a BAT, bitmap, or
/// descriptor buffer.
pub const MAX_ALLOCATION_SIZE: usize = 256 * 1024 * 1024;

/// Validate that a size read from an image header is within allocation
/// limits before it's used to size a `Vec` or a read buffer.
pub fn validate_allocation_size(size: u64, limit: usize, context: &str) -> crate::Result<usize> {
    if size > limit as u64 {
        return Err(Error::file_not_supported(format!(
            "{context} size {size} exceeds limit {limit}"
        )));
    }

    size.try_into()
        .map_err(|_| Error::file_not_supported(format!("{context} size exceeds platform limits")))
}

/// Multiply two `u64` values read from disk, rejecting overflow instead of
/// silently wrapping.
pub fn checked_multiply_u64(a: u64, b: u64, context: &str) -> crate::Result<u64> {
    a.checked_mul(b)
        .ok_or_else(|| Error::file_not_supported(format!("{context}: multiplication overflow")))
}

/// Multiply two `u32` values and widen to `u64`, rejecting overflow.
pub fn checked_multiply_u32_to_u64(a: u32, b: u32, context: &str) -> crate::Result<u64> {
    (a as u64)
        .checked_mul(b as u64)
        .ok_or_else(|| Error::file_not_supported(format!("{context}: multiplication overflow")))
}

/// Convert a `u64` offset/size to `usize`, rejecting values that would
/// truncate on a 32-bit target.
pub fn u64_to_usize(value: u64, context: &str) -> crate::Result<usize> {
    value.try_into().map_err(|_| {
        Error::file_not_supported(format!("{context}: value {value} exceeds platform usize limit"))
    })
}
