//! VMware VMDK format driver: a text descriptor file pointing at one or
//! more extent files.
//!
//! Only the first extent is opened for data access; further extents are
//! kept in the parsed [`descriptor::VmdkDescriptor`] for fidelity but are
//! not consulted by read/write, matching monolithic (single-extent) VMDKs.
//! Writes are accepted and silently discarded — see `DESIGN.md` for why
//! this stays a no-op rather than being "fixed".

pub mod descriptor;
pub mod extent;

use std::path::Path;

use totalimage_core::security::checked_multiply_u64;
use totalimage_core::{DiskInfo, Error, ImageDriver, Logger, Result};
use totalimage_pipeline::ManagedFile;

use descriptor::VmdkDescriptor;

const SECTOR_SIZE: u64 = 512;

pub struct VmdkDriver {
    data_file: ManagedFile,
    descriptor: VmdkDescriptor,
    disksize: u64,
    logger: Logger,
}

impl VmdkDriver {
    pub fn open(path: impl AsRef<Path>, logger: Logger) -> Result<Self> {
        let path = path.as_ref();
        let descriptor_file = ManagedFile::open(path)?;
        let size = descriptor_file.size()?;
        let text = {
            let map = descriptor_file.map(0, size)?;
            String::from_utf8_lossy(map.as_slice()).into_owned()
        };

        let descriptor = VmdkDescriptor::parse(&text)?;
        let first_extent = descriptor
            .extents
            .first()
            .ok_or_else(|| Error::parse_error("VMDK descriptor has no extents"))?;

        let data_path = descriptor_file.directory().join(&first_extent.filename);
        let data_file = ManagedFile::open(&data_path)?;
        let disksize = checked_multiply_u64(first_extent.sectors, SECTOR_SIZE, "VMDK extent size")?;

        logger.info(format!(
            "opened VMDK descriptor {:?}, data file {:?}, disksize={disksize}",
            path, data_path
        ));

        Ok(Self {
            data_file,
            descriptor,
            disksize,
            logger,
        })
    }

    pub fn descriptor(&self) -> &VmdkDescriptor {
        &self.descriptor
    }
}

impl ImageDriver for VmdkDriver {
    fn name(&self) -> &'static str {
        "vmdk"
    }

    fn diskinfo(&self) -> DiskInfo {
        DiskInfo::new(self.disksize)
    }

    fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<()> {
        let map = self.data_file.map(offset, buf.len() as u64)?;
        buf.copy_from_slice(map.as_slice());
        Ok(())
    }

    fn write(&mut self, _buf: &[u8], _offset: u64) -> Result<()> {
        self.logger
            .warning("write to VMDK accepted and discarded (unsupported in this revision)");
        Ok(())
    }
}
