//! The public facade: open an image by format name, then read/write it
//! with bounds checking. Direct counterpart of `diskimage_open`/
//! `diskimage_read` in the original.

use std::path::Path;

use totalimage_core::{DiskInfo, Error, ImageDriver, Logger, Result};

use crate::registry::Registry;

/// An opened disk image: a driver plus its cached [`DiskInfo`].
pub struct Image {
    driver: Box<dyn ImageDriver>,
    diskinfo: DiskInfo,
}

impl Image {
    /// Looks up `format` in `registry`, constructs the driver, and caches
    /// its `diskinfo` so every `read`/`write` bounds check is a comparison
    /// against memory, not a fresh driver call.
    pub fn open(
        registry: &Registry,
        path: impl AsRef<Path>,
        format: &str,
        logger: Logger,
    ) -> Result<Self> {
        let driver = registry.open(format, path.as_ref(), logger)?;
        let diskinfo = driver.diskinfo();
        Ok(Self { driver, diskinfo })
    }

    pub fn info(&self) -> DiskInfo {
        self.diskinfo
    }

    fn check_bounds(&self, nbytes: u64, offset: u64) -> Result<()> {
        let in_range = matches!(
            offset.checked_add(nbytes),
            Some(end) if end <= self.diskinfo.disksize
        );
        if !in_range {
            return Err(Error::out_of_range(offset, nbytes, self.diskinfo.disksize));
        }
        Ok(())
    }

    pub fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<()> {
        self.check_bounds(buf.len() as u64, offset)?;
        self.driver.read(buf, offset)
    }

    pub fn write(&mut self, buf: &[u8], offset: u64) -> Result<()> {
        self.check_bounds(buf.len() as u64, offset)?;
        self.driver.write(buf, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use totalimage_core::Logger;

    fn fixed_vhd_bytes(data_size: usize) -> Vec<u8> {
        use crate::vhd::types::{DiskGeometry, VhdFooter, VhdType};

        let data: Vec<u8> = (0..data_size).map(|i| (i % 256) as u8).collect();
        let mut vhd = data;

        let footer = VhdFooter {
            cookie: *VhdFooter::COOKIE,
            features: 2,
            file_format_version: (1, 0),
            data_offset: VhdFooter::FIXED_DATA_OFFSET,
            time_stamp: 0,
            creator_app: *b"test",
            creator_version: (1, 0),
            creator_host_os: 0,
            original_size: data_size as u64,
            current_size: data_size as u64,
            geometry: DiskGeometry {
                cylinders: 0,
                heads: 0,
                sectors: 0,
            },
            disk_type: VhdType::Fixed,
            checksum: 0,
            unique_id: uuid::Uuid::nil(),
            saved_state: false,
            reserved: [0u8; 427],
        };
        let mut footer_bytes = [0u8; VhdFooter::SIZE];
        footer.write(&mut footer_bytes);
        vhd.extend_from_slice(&footer_bytes);
        vhd
    }

    #[test]
    fn read_past_end_is_out_of_range() {
        let vhd_data = fixed_vhd_bytes(10 * 1024 * 1024);
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(&vhd_data).unwrap();
        tmp.flush().unwrap();

        let registry = Registry::standard();
        let mut image = Image::open(&registry, tmp.path(), "vhd", Logger::noop()).unwrap();

        let mut buf = vec![0u8; 1024];
        let result = image.read(&mut buf, 10 * 1024 * 1024 - 512);
        assert!(matches!(result, Err(Error::OutOfRange { .. })));
    }

    #[test]
    fn read_within_bounds_succeeds() {
        let vhd_data = fixed_vhd_bytes(4096);
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(&vhd_data).unwrap();
        tmp.flush().unwrap();

        let registry = Registry::standard();
        let mut image = Image::open(&registry, tmp.path(), "vhd", Logger::noop()).unwrap();

        let mut buf = vec![0u8; 512];
        image.read(&mut buf, 0).unwrap();
        assert_eq!(&buf[..4], &[0, 1, 2, 3]);
    }

    #[test]
    fn unknown_format_name_fails_at_open() {
        let registry = Registry::standard();
        let result = Image::open(&registry, "/nonexistent", "nhd", Logger::noop());
        assert!(matches!(result, Err(Error::FormatUnknown(_))));
    }
}
