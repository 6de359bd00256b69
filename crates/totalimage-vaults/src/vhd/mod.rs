//! Microsoft VHD (Virtual Hard Disk) format driver.
//!
//! ## Supported Formats
//!
//! - **Fixed VHD**: data stored contiguously, with a 512-byte footer at the
//!   end of the file.
//! - **Dynamic VHD**: sparse format using a Block Allocation Table (BAT) to
//!   map virtual blocks onto physical sectors, allocated on first write.
//!
//! Differencing VHDs decode (the footer/header never fail to parse) but
//! opening one as an instance returns `FileNotSupported` — parent-chain
//! resolution is out of scope.

pub mod instance;
pub mod types;

use std::path::Path;

use totalimage_core::{DiskInfo, ImageDriver, Logger, Result};

use instance::VhdInstance;

/// Opened VHD image, dispatching to fixed or dynamic handling under the
/// hood via [`VhdInstance`].
pub struct VhdDriver {
    instance: VhdInstance,
}

impl VhdDriver {
    pub fn open(path: impl AsRef<Path>, logger: Logger) -> Result<Self> {
        Ok(Self {
            instance: VhdInstance::open(path, logger)?,
        })
    }
}

impl ImageDriver for VhdDriver {
    fn name(&self) -> &'static str {
        "vhd"
    }

    fn diskinfo(&self) -> DiskInfo {
        self.instance.diskinfo()
    }

    fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<()> {
        self.instance.read(buf, offset)
    }

    fn write(&mut self, buf: &[u8], offset: u64) -> Result<()> {
        self.instance.write(buf, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use types::{DiskGeometry, VhdFooter, VhdType};

    fn fixed_vhd_bytes(data_size: usize) -> Vec<u8> {
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
                cylinders: 1024,
                heads: 16,
                sectors: 63,
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
    fn opens_fixed_vhd_and_reports_length() {
        let vhd_data = fixed_vhd_bytes(1024);
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(&vhd_data).unwrap();
        tmp.flush().unwrap();

        let driver = VhdDriver::open(tmp.path(), Logger::noop()).unwrap();
        assert_eq!(driver.name(), "vhd");
        assert_eq!(driver.diskinfo().disksize, 1024);
    }

    #[test]
    fn reads_fixed_vhd_content() {
        let vhd_data = fixed_vhd_bytes(1024);
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(&vhd_data).unwrap();
        tmp.flush().unwrap();

        let mut driver = VhdDriver::open(tmp.path(), Logger::noop()).unwrap();
        let mut buf = [0u8; 10];
        driver.read(&mut buf, 0).unwrap();
        assert_eq!(buf, [0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn rejects_differencing_vhd() {
        let mut tmp = NamedTempFile::new().unwrap();
        let footer = VhdFooter {
            cookie: *VhdFooter::COOKIE,
            features: 2,
            file_format_version: (1, 0),
            data_offset: 512,
            time_stamp: 0,
            creator_app: *b"test",
            creator_version: (1, 0),
            creator_host_os: 0,
            original_size: 1024,
            current_size: 1024,
            geometry: DiskGeometry {
                cylinders: 0,
                heads: 0,
                sectors: 0,
            },
            disk_type: VhdType::Differencing,
            checksum: 0,
            unique_id: uuid::Uuid::nil(),
            saved_state: false,
            reserved: [0u8; 427],
        };
        let mut footer_bytes = [0u8; VhdFooter::SIZE];
        footer.write(&mut footer_bytes);
        tmp.write_all(&footer_bytes).unwrap();
        tmp.flush().unwrap();

        let result = VhdDriver::open(tmp.path(), Logger::noop());
        assert!(result.is_err());
    }
}
