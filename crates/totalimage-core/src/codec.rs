//! Big-endian primitive codec and the additive checksum used by VHD.
//!
//! VHD footers and dynamic headers are all big-endian on disk regardless of
//! host byte order, so every field read here goes through these helpers
//! instead of ad-hoc `from_be_bytes` calls scattered across `vhd::types`.

use uuid::Uuid;

/// Read a big-endian `u16` at `buf[offset..offset+2]`.
pub fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes(buf[offset..offset + 2].try_into().unwrap())
}

/// Read a big-endian `u32` at `buf[offset..offset+4]`.
pub fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes(buf[offset..offset + 4].try_into().unwrap())
}

/// Read a big-endian `i32` at `buf[offset..offset+4]`.
pub fn read_i32(buf: &[u8], offset: usize) -> i32 {
    i32::from_be_bytes(buf[offset..offset + 4].try_into().unwrap())
}

/// Read a big-endian `u64` at `buf[offset..offset+8]`.
pub fn read_u64(buf: &[u8], offset: usize) -> u64 {
    u64::from_be_bytes(buf[offset..offset + 8].try_into().unwrap())
}

/// Write a big-endian `u16` at `buf[offset..offset+2]`.
pub fn write_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
}

/// Write a big-endian `u32` at `buf[offset..offset+4]`.
pub fn write_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

/// Write a big-endian `i32` at `buf[offset..offset+4]`.
pub fn write_i32(buf: &mut [u8], offset: usize, value: i32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

/// Write a big-endian `u64` at `buf[offset..offset+8]`.
pub fn write_u64(buf: &mut [u8], offset: usize, value: u64) {
    buf[offset..offset + 8].copy_from_slice(&value.to_be_bytes());
}

/// Read an 8-byte ASCII cookie/signature field (not NUL-terminated).
pub fn read_chars(buf: &[u8], offset: usize, len: usize) -> [u8; 8] {
    let mut out = [0u8; 8];
    out[..len].copy_from_slice(&buf[offset..offset + len]);
    out
}

/// Write an ASCII cookie/signature field, space-free, left-justified.
pub fn write_chars(buf: &mut [u8], offset: usize, value: &[u8]) {
    buf[offset..offset + value.len()].copy_from_slice(value);
}

/// A VHD "version" field: major.minor packed as two big-endian `u16`s.
pub fn read_version(buf: &[u8], offset: usize) -> (u16, u16) {
    (read_u16(buf, offset), read_u16(buf, offset + 2))
}

pub fn write_version(buf: &mut [u8], offset: usize, major: u16, minor: u16) {
    write_u16(buf, offset, major);
    write_u16(buf, offset + 2, minor);
}

/// Read a 16-byte UUID in big-endian (network) byte order.
pub fn read_uuid(buf: &[u8], offset: usize) -> Uuid {
    let bytes: [u8; 16] = buf[offset..offset + 16].try_into().unwrap();
    Uuid::from_bytes(bytes)
}

pub fn write_uuid(buf: &mut [u8], offset: usize, value: &Uuid) {
    buf[offset..offset + 16].copy_from_slice(value.as_bytes());
}

/// Read a single-byte boolean: exactly `1` is true, matching `read_bool`'s
/// `*(uint8_t*)source == 1` rather than a generic nonzero test.
pub fn read_bool(buf: &[u8], offset: usize) -> bool {
    buf[offset] == 1
}

pub fn write_bool(buf: &mut [u8], offset: usize, value: bool) {
    buf[offset] = value as u8;
}

/// The additive ones'-complement checksum VHD footers and dynamic headers
/// use: sum every byte of the structure with the checksum field itself
/// zeroed out, then take the ones' complement of that sum.
///
/// Mirrors `checksum_uint8_array` plus the per-field wrappers in
/// `vhdchecksum.c`: those wrappers all reduce to summing the serialized
/// bytes, so a single byte-sum accumulator is all that is needed here.
pub fn checksum(buf: &[u8]) -> u32 {
    let sum: u32 = buf.iter().fold(0u32, |acc, &b| acc.wrapping_add(b as u32));
    !sum
}
