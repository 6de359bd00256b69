//! On-disk layout for the VHD footer, dynamic header, and block allocation
//! table.
//!
//! Decoding never fails on out-of-range field values — a VHD footer with a
//! garbage checksum or an unrecognised disk type still decodes; callers
//! inspect [`FooterStatus`]/[`VhdType`] to learn that. This mirrors the
//! original `vhd_footer_new`/`vhd_header_new`, which only ever fail on
//! allocation, never on the bytes they're given.

use totalimage_core::codec;
use uuid::Uuid;

/// How a footer's `disk_type` field is interpreted once decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VhdType {
    None,
    Reserved1,
    Fixed,
    Dynamic,
    Differencing,
    Reserved5,
    Reserved6,
    /// Any value outside the seven defined by the format.
    Unrecognized(u32),
}

impl VhdType {
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => VhdType::None,
            1 => VhdType::Reserved1,
            2 => VhdType::Fixed,
            3 => VhdType::Dynamic,
            4 => VhdType::Differencing,
            5 => VhdType::Reserved5,
            6 => VhdType::Reserved6,
            other => VhdType::Unrecognized(other),
        }
    }

    pub fn to_u32(self) -> u32 {
        match self {
            VhdType::None => 0,
            VhdType::Reserved1 => 1,
            VhdType::Fixed => 2,
            VhdType::Dynamic => 3,
            VhdType::Differencing => 4,
            VhdType::Reserved5 => 5,
            VhdType::Reserved6 => 6,
            VhdType::Unrecognized(v) => v,
        }
    }
}

/// CHS geometry stored in the footer. Not trusted for anything beyond
/// round-tripping — `Non-goals` excludes CHS fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskGeometry {
    pub cylinders: u16,
    pub heads: u8,
    pub sectors: u8,
}

impl DiskGeometry {
    pub fn parse(bytes: &[u8]) -> Self {
        Self {
            cylinders: codec::read_u16(bytes, 0),
            heads: bytes[2],
            sectors: bytes[3],
        }
    }

    pub fn to_bytes(self) -> [u8; 4] {
        let c = self.cylinders.to_be_bytes();
        [c[0], c[1], self.heads, self.sectors]
    }
}

/// The bits `status()` can report about a decoded footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FooterStatus {
    pub bad_cookie: bool,
    pub bad_checksum: bool,
}

impl FooterStatus {
    pub fn is_ok(self) -> bool {
        !self.bad_cookie && !self.bad_checksum
    }
}

/// The 512-byte footer every VHD file ends with.
#[derive(Debug, Clone)]
pub struct VhdFooter {
    pub cookie: [u8; 8],
    pub features: u32,
    pub file_format_version: (u16, u16),
    pub data_offset: u64,
    pub time_stamp: i32,
    pub creator_app: [u8; 4],
    pub creator_version: (u16, u16),
    pub creator_host_os: u32,
    pub original_size: u64,
    pub current_size: u64,
    pub geometry: DiskGeometry,
    pub disk_type: VhdType,
    /// Checksum as read off disk — compare against [`VhdFooter::calculated_checksum`].
    pub checksum: u32,
    pub unique_id: Uuid,
    pub saved_state: bool,
    /// Bytes 85..512, required to be zero by the format but kept verbatim
    /// so a footer with stray reserved bytes round-trips byte-exact instead
    /// of spuriously failing its checksum on migration.
    pub reserved: [u8; 427],
}

impl VhdFooter {
    pub const COOKIE: &'static [u8; 8] = b"conectix";
    pub const SIZE: usize = 512;
    pub const FIXED_DATA_OFFSET: u64 = u64::MAX;

    const CHECKSUM_OFFSET: usize = 64;

    pub fn parse(bytes: &[u8]) -> Self {
        let cookie = codec::read_chars(bytes, 0, 8);
        Self {
            cookie,
            features: codec::read_u32(bytes, 8),
            file_format_version: codec::read_version(bytes, 12),
            data_offset: codec::read_u64(bytes, 16),
            time_stamp: codec::read_i32(bytes, 24),
            creator_app: codec::read_chars(bytes, 28, 4)[..4].try_into().unwrap(),
            creator_version: codec::read_version(bytes, 32),
            creator_host_os: codec::read_u32(bytes, 36),
            original_size: codec::read_u64(bytes, 40),
            current_size: codec::read_u64(bytes, 48),
            geometry: DiskGeometry::parse(&bytes[56..60]),
            disk_type: VhdType::from_u32(codec::read_u32(bytes, 60)),
            checksum: codec::read_u32(bytes, 64),
            unique_id: codec::read_uuid(bytes, 68),
            saved_state: codec::read_bool(bytes, 84),
            reserved: bytes[85..512].try_into().unwrap(),
        }
    }

    /// Serialize with the checksum field zeroed, then checksum that buffer.
    /// This is recomputed fresh every time rather than cached, so it always
    /// reflects the footer's current field values.
    pub fn calculated_checksum(&self) -> u32 {
        let mut buf = [0u8; Self::SIZE];
        self.write_fields(&mut buf);
        buf[Self::CHECKSUM_OFFSET..Self::CHECKSUM_OFFSET + 4].copy_from_slice(&[0, 0, 0, 0]);
        codec::checksum(&buf)
    }

    pub fn status(&self) -> FooterStatus {
        FooterStatus {
            bad_cookie: &self.cookie != Self::COOKIE,
            bad_checksum: self.checksum != self.calculated_checksum(),
        }
    }

    pub fn disksize(&self) -> u64 {
        self.current_size
    }

    fn write_fields(&self, bytes: &mut [u8; Self::SIZE]) {
        codec::write_chars(bytes, 0, &self.cookie);
        codec::write_u32(bytes, 8, self.features);
        codec::write_version(bytes, 12, self.file_format_version.0, self.file_format_version.1);
        codec::write_u64(bytes, 16, self.data_offset);
        codec::write_i32(bytes, 24, self.time_stamp);
        codec::write_chars(bytes, 28, &self.creator_app);
        codec::write_version(bytes, 32, self.creator_version.0, self.creator_version.1);
        codec::write_u32(bytes, 36, self.creator_host_os);
        codec::write_u64(bytes, 40, self.original_size);
        codec::write_u64(bytes, 48, self.current_size);
        bytes[56..60].copy_from_slice(&self.geometry.to_bytes());
        codec::write_u32(bytes, 60, self.disk_type.to_u32());
        codec::write_u32(bytes, 64, self.checksum);
        codec::write_uuid(bytes, 68, &self.unique_id);
        codec::write_bool(bytes, 84, self.saved_state);
        bytes[85..512].copy_from_slice(&self.reserved);
    }

    /// Re-encode the footer. The checksum slot carries the *calculated*
    /// checksum, not whatever was read from disk, so a write always leaves
    /// a self-consistent footer behind even if the source was corrupt.
    pub fn write(&self, bytes: &mut [u8; Self::SIZE]) {
        let mut with_self_checksum = self.clone();
        with_self_checksum.checksum = self.calculated_checksum();
        with_self_checksum.write_fields(bytes);
    }
}

/// The 1024-byte sparse header of a dynamic (or differencing) VHD.
#[derive(Debug, Clone)]
pub struct VhdDynamicHeader {
    pub cookie: [u8; 8],
    pub data_offset: u64,
    pub table_offset: u64,
    pub header_version: (u16, u16),
    pub max_table_entries: u32,
    pub block_size: u32,
    pub checksum: u32,
    pub parent_unique_id: Uuid,
    pub parent_time_stamp: i32,
    pub parent_unicode_name: [u8; 512],
    /// Opaque to this core — differencing VHDs are out of scope, so these
    /// are kept only so a round-trip write reproduces the original bytes.
    pub parent_locator_entries: [[u8; 24]; 8],
}

impl VhdDynamicHeader {
    pub const COOKIE: &'static [u8; 8] = b"cxsparse";
    pub const SIZE: usize = 1024;

    const CHECKSUM_OFFSET: usize = 36;

    pub fn parse(bytes: &[u8]) -> Self {
        let cookie = codec::read_chars(bytes, 0, 8);
        let mut parent_unicode_name = [0u8; 512];
        parent_unicode_name.copy_from_slice(&bytes[64..576]);

        let mut parent_locator_entries = [[0u8; 24]; 8];
        for (i, entry) in parent_locator_entries.iter_mut().enumerate() {
            let offset = 576 + i * 24;
            entry.copy_from_slice(&bytes[offset..offset + 24]);
        }

        Self {
            cookie,
            data_offset: codec::read_u64(bytes, 8),
            table_offset: codec::read_u64(bytes, 16),
            header_version: codec::read_version(bytes, 24),
            max_table_entries: codec::read_u32(bytes, 28),
            block_size: codec::read_u32(bytes, 32),
            checksum: codec::read_u32(bytes, 36),
            parent_unique_id: codec::read_uuid(bytes, 40),
            parent_time_stamp: codec::read_i32(bytes, 56),
            parent_unicode_name,
            parent_locator_entries,
        }
    }

    pub fn calculated_checksum(&self) -> u32 {
        let mut buf = [0u8; Self::SIZE];
        self.write_fields(&mut buf);
        buf[Self::CHECKSUM_OFFSET..Self::CHECKSUM_OFFSET + 4].copy_from_slice(&[0, 0, 0, 0]);
        codec::checksum(&buf)
    }

    pub fn is_valid(&self) -> bool {
        &self.cookie == Self::COOKIE && self.checksum == self.calculated_checksum()
    }

    fn write_fields(&self, bytes: &mut [u8; Self::SIZE]) {
        codec::write_chars(bytes, 0, &self.cookie);
        codec::write_u64(bytes, 8, self.data_offset);
        codec::write_u64(bytes, 16, self.table_offset);
        codec::write_version(bytes, 24, self.header_version.0, self.header_version.1);
        codec::write_u32(bytes, 28, self.max_table_entries);
        codec::write_u32(bytes, 32, self.block_size);
        codec::write_u32(bytes, 36, self.checksum);
        codec::write_uuid(bytes, 40, &self.parent_unique_id);
        codec::write_i32(bytes, 56, self.parent_time_stamp);
        bytes[64..576].copy_from_slice(&self.parent_unicode_name);
        for (i, entry) in self.parent_locator_entries.iter().enumerate() {
            let offset = 576 + i * 24;
            bytes[offset..offset + 24].copy_from_slice(entry);
        }
    }

    pub fn write(&self, bytes: &mut [u8; Self::SIZE]) {
        let mut with_self_checksum = self.clone();
        with_self_checksum.checksum = self.calculated_checksum();
        with_self_checksum.write_fields(bytes);
    }
}

/// Sentinel BAT entry meaning "this block has never been written".
pub const BAT_UNALLOCATED: u32 = 0xFFFF_FFFF;

/// The block allocation table: one big-endian `u32` sector offset per
/// block, decoded/encoded as a flat array.
#[derive(Debug, Clone)]
pub struct BlockAllocationTable {
    entries: Vec<u32>,
}

impl BlockAllocationTable {
    pub fn parse(bytes: &[u8], num_blocks: usize) -> Self {
        let entries = (0..num_blocks)
            .map(|i| codec::read_u32(bytes, i * 4))
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sector offset for `block`, or `None` if unallocated.
    pub fn get(&self, block: usize) -> Option<u32> {
        match self.entries[block] {
            BAT_UNALLOCATED => None,
            sector => Some(sector),
        }
    }

    pub fn set(&mut self, block: usize, sector_offset: u32) {
        self.entries[block] = sector_offset;
    }

    pub fn write(&self, bytes: &mut [u8]) {
        for (i, &entry) in self.entries.iter().enumerate() {
            codec::write_u32(bytes, i * 4, entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_footer_bytes() -> [u8; VhdFooter::SIZE] {
        let mut bytes = [0u8; VhdFooter::SIZE];
        bytes[0..8].copy_from_slice(VhdFooter::COOKIE);
        codec::write_u32(&mut bytes, 60, VhdType::Fixed.to_u32());
        codec::write_u64(&mut bytes, 48, 10 * 1024 * 1024);
        let footer = VhdFooter::parse(&bytes);
        let checksum = footer.calculated_checksum();
        codec::write_u32(&mut bytes, 64, checksum);
        bytes
    }

    #[test]
    fn footer_round_trip_checksum() {
        let bytes = sample_footer_bytes();
        let footer = VhdFooter::parse(&bytes);
        assert!(footer.status().is_ok());

        let mut rewritten = [0u8; VhdFooter::SIZE];
        footer.write(&mut rewritten);
        let reparsed = VhdFooter::parse(&rewritten);
        assert_eq!(reparsed.checksum, reparsed.calculated_checksum());
    }

    #[test]
    fn footer_status_flags_bad_checksum() {
        let mut bytes = sample_footer_bytes();
        codec::write_u32(&mut bytes, 64, 0xFFFF_FFFF);
        let footer = VhdFooter::parse(&bytes);
        let status = footer.status();
        assert!(status.bad_checksum);
        assert!(!status.bad_cookie);
    }

    #[test]
    fn footer_status_flags_bad_cookie() {
        let mut bytes = sample_footer_bytes();
        bytes[0..8].copy_from_slice(b"notmagic");
        let footer = VhdFooter::parse(&bytes);
        assert!(footer.status().bad_cookie);
    }

    #[test]
    fn footer_disksize_reads_current_size() {
        let bytes = sample_footer_bytes();
        let footer = VhdFooter::parse(&bytes);
        assert_eq!(footer.disksize(), 10 * 1024 * 1024);
    }

    #[test]
    fn disk_type_round_trips_through_u32() {
        for (value, expected) in [
            (0u32, VhdType::None),
            (2, VhdType::Fixed),
            (3, VhdType::Dynamic),
            (4, VhdType::Differencing),
        ] {
            assert_eq!(VhdType::from_u32(value), expected);
            assert_eq!(expected.to_u32(), value);
        }
        assert_eq!(VhdType::from_u32(99), VhdType::Unrecognized(99));
    }

    #[test]
    fn dynamic_header_checksum_round_trip() {
        let mut bytes = [0u8; VhdDynamicHeader::SIZE];
        bytes[0..8].copy_from_slice(VhdDynamicHeader::COOKIE);
        codec::write_u32(&mut bytes, 28, 100);
        codec::write_u32(&mut bytes, 32, 2 * 1024 * 1024);
        let header = VhdDynamicHeader::parse(&bytes);
        let checksum = header.calculated_checksum();
        codec::write_u32(&mut bytes, 36, checksum);

        let header = VhdDynamicHeader::parse(&bytes);
        assert!(header.is_valid());
    }

    #[test]
    fn bat_decode_encode_round_trip() {
        let mut bytes = vec![0u8; 12];
        codec::write_u32(&mut bytes, 0, 0x1000);
        codec::write_u32(&mut bytes, 4, BAT_UNALLOCATED);
        codec::write_u32(&mut bytes, 8, 0x2000);

        let bat = BlockAllocationTable::parse(&bytes, 3);
        assert_eq!(bat.get(0), Some(0x1000));
        assert_eq!(bat.get(1), None);
        assert_eq!(bat.get(2), Some(0x2000));

        let mut out = vec![0u8; 12];
        bat.write(&mut out);
        assert_eq!(out, bytes);
    }

    #[test]
    fn bat_set_updates_entry() {
        let mut bytes = vec![0u8; 8];
        codec::write_u32(&mut bytes, 0, BAT_UNALLOCATED);
        codec::write_u32(&mut bytes, 4, BAT_UNALLOCATED);
        let mut bat = BlockAllocationTable::parse(&bytes, 2);

        bat.set(0, 42);
        assert_eq!(bat.get(0), Some(42));
        assert_eq!(bat.get(1), None);
    }
}
