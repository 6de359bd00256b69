//! The VHD instance engine: open, read, write, and dynamic block
//! allocation.
//!
//! This is the direct Rust counterpart of `vhdinstance.c` — same open
//! sequence, same per-block read/write loop, same `extend_file` dance of
//! growing the file, migrating the footer, and zeroing the old footer
//! location.

use std::path::Path;

use totalimage_core::security::{
    checked_multiply_u32_to_u64, validate_allocation_size, MAX_ALLOCATION_SIZE, MAX_BLOCK_SIZE,
};
use totalimage_core::{DiskInfo, Error, ImageDriver, Logger, Result};
use totalimage_pipeline::ManagedFile;

use super::types::{BlockAllocationTable, VhdDynamicHeader, VhdFooter, VhdType};

const SECTOR_SIZE: u64 = 512;

fn block_bitmap_size(block_size: u32) -> u64 {
    let sectors_per_block = block_size as u64 / SECTOR_SIZE;
    let raw = sectors_per_block / 8;
    raw + (SECTOR_SIZE - raw % SECTOR_SIZE) % SECTOR_SIZE
}

/// Marks every sector in a block as present. Sets byte `0xF` (not `0xFF`)
/// every eight sectors — preserved byte-exact from the original
/// `update_block_bitmap`, which only ever touched the low nibble.
fn update_block_bitmap(bytes: &mut [u8], mut sectors_in_block: i64) {
    let mut i = 0;
    while sectors_in_block > 0 {
        bytes[i] = 0xF;
        i += 1;
        sectors_in_block -= 8;
    }
}

/// An opened VHD file: fixed or dynamic.
pub struct VhdInstance {
    file: ManagedFile,
    disk_type: VhdType,
    footer: VhdFooter,
    header: Option<VhdDynamicHeader>,
    bat: Option<BlockAllocationTable>,
    filesize: u64,
    logger: Logger,
}

impl VhdInstance {
    pub fn open(path: impl AsRef<Path>, logger: Logger) -> Result<Self> {
        let file = ManagedFile::open(path)?;
        let filesize = file.size()?;

        let footer = {
            let map = file.map(filesize - SECTOR_SIZE, SECTOR_SIZE)?;
            VhdFooter::parse(map.as_slice())
        };
        let disk_type = footer.disk_type;
        tracing::debug!(?disk_type, disksize = footer.disksize(), "opened VHD footer");

        let (header, bat) = match disk_type {
            VhdType::Fixed => (None, None),
            VhdType::Dynamic => {
                let header = {
                    let map = file.map(footer.data_offset, VhdDynamicHeader::SIZE as u64)?;
                    VhdDynamicHeader::parse(map.as_slice())
                };
                if header.block_size > MAX_BLOCK_SIZE {
                    let msg = format!(
                        "dynamic VHD block_size {} exceeds limit {MAX_BLOCK_SIZE}",
                        header.block_size
                    );
                    logger.error(&msg);
                    return Err(Error::file_not_supported(msg));
                }
                let bat_len = checked_multiply_u32_to_u64(header.max_table_entries, 4, "VHD BAT size")?;
                validate_allocation_size(bat_len, MAX_ALLOCATION_SIZE, "VHD BAT")?;
                let bat = {
                    let map = file.map(header.table_offset, bat_len)?;
                    BlockAllocationTable::parse(map.as_slice(), header.max_table_entries as usize)
                };
                (Some(header), Some(bat))
            }
            other => {
                let msg = format!("VHD disk type {other:?} is not supported");
                logger.error(&msg);
                return Err(Error::file_not_supported(msg));
            }
        };

        logger.info(format!("opened VHD, disksize={}", footer.disksize()));
        Ok(Self {
            file,
            disk_type,
            footer,
            header,
            bat,
            filesize,
            logger,
        })
    }

    fn read_fixed(&mut self, buf: &mut [u8], offset: u64) -> Result<()> {
        let map = self.file.map(offset, buf.len() as u64)?;
        buf.copy_from_slice(map.as_slice());
        Ok(())
    }

    fn read_dynamic(&mut self, buf: &mut [u8], offset: u64) -> Result<()> {
        let header = self.header.as_ref().expect("dynamic VHD has a header");
        let block_size = header.block_size as u64;
        let bitmap_size = block_bitmap_size(header.block_size);

        let mut offset = offset;
        let mut remaining = buf.len() as u64;
        let mut written = 0usize;

        while remaining > 0 {
            let block = (offset / block_size) as usize;
            let bytes_left_in_block = block_size - offset % block_size;
            let to_read = bytes_left_in_block.min(remaining) as usize;

            match self.bat.as_ref().unwrap().get(block) {
                None => {
                    buf[written..written + to_read].fill(0);
                }
                Some(block_offset) => {
                    let file_offset = block_offset as u64 * SECTOR_SIZE
                        + bitmap_size
                        + offset % block_size;
                    let map = self.file.map(file_offset, to_read as u64)?;
                    buf[written..written + to_read].copy_from_slice(map.as_slice());
                }
            }

            written += to_read;
            offset += to_read as u64;
            remaining -= to_read as u64;
        }
        Ok(())
    }

    fn write_fixed(&mut self, buf: &[u8], offset: u64) -> Result<()> {
        let mut map = self.file.map_mut(offset, buf.len() as u64)?;
        map.as_mut_slice().copy_from_slice(buf);
        map.flush()
    }

    /// Grows the file by `block_size + bitmap_size`, migrates the footer to
    /// the new end of file, and zeroes the region the old footer occupied.
    /// Does not touch the BAT — the caller registers the new block.
    fn extend_file(&mut self) -> Result<()> {
        let header = self.header.as_ref().expect("dynamic VHD has a header");
        let old_size = self.filesize;
        let extension = header.block_size as u64 + block_bitmap_size(header.block_size);
        let new_size = old_size + extension;

        self.file.set_size(new_size)?;

        {
            let mut map = self.file.map_mut(new_size - SECTOR_SIZE, SECTOR_SIZE)?;
            let mut footer_bytes = [0u8; VhdFooter::SIZE];
            self.footer.write(&mut footer_bytes);
            map.as_mut_slice().copy_from_slice(&footer_bytes);
            map.flush()?;
        }

        {
            let mut map = self.file.map_mut(old_size - SECTOR_SIZE, SECTOR_SIZE)?;
            map.as_mut_slice().fill(0);
            map.flush()?;
        }

        self.filesize = self.file.size()?;
        self.logger
            .verbose(format!("extended VHD from {old_size} to {new_size} bytes"));
        Ok(())
    }

    fn write_bat_to_disk(&mut self) -> Result<()> {
        let header = self.header.as_ref().expect("dynamic VHD has a header");
        let bat_len = header.max_table_entries as u64 * 4;
        let mut map = self.file.map_mut(header.table_offset, bat_len)?;
        self.bat.as_ref().unwrap().write(map.as_mut_slice());
        map.flush()
    }

    fn write_dynamic(&mut self, buf: &[u8], offset: u64) -> Result<()> {
        let block_size = self.header.as_ref().unwrap().block_size as u64;
        let bitmap_size = block_bitmap_size(self.header.as_ref().unwrap().block_size);

        let mut offset = offset;
        let mut remaining = buf.len() as u64;
        let mut consumed = 0usize;

        while remaining > 0 {
            let block = (offset / block_size) as usize;
            let bytes_left_in_block = block_size - offset % block_size;
            let to_write = bytes_left_in_block.min(remaining) as usize;

            let block_offset = match self.bat.as_ref().unwrap().get(block) {
                Some(existing) => existing,
                None => {
                    let original_file_size = self.filesize;
                    self.extend_file()?;
                    let new_block_offset = (original_file_size / SECTOR_SIZE - 1) as u32;
                    self.bat.as_mut().unwrap().set(block, new_block_offset);
                    self.write_bat_to_disk()?;
                    new_block_offset
                }
            };

            let offset_in_block = offset % block_size;
            {
                let file_offset = block_offset as u64 * SECTOR_SIZE + bitmap_size + offset_in_block;
                let mut map = self.file.map_mut(file_offset, to_write as u64)?;
                map.as_mut_slice()
                    .copy_from_slice(&buf[consumed..consumed + to_write]);
                map.flush()?;
            }

            {
                let mut map = self
                    .file
                    .map_mut(block_offset as u64 * SECTOR_SIZE, bitmap_size)?;
                let sectors_per_block = (block_size / SECTOR_SIZE) as i64;
                update_block_bitmap(map.as_mut_slice(), sectors_per_block);
                map.flush()?;
            }

            consumed += to_write;
            offset += to_write as u64;
            remaining -= to_write as u64;
        }
        Ok(())
    }
}

impl ImageDriver for VhdInstance {
    fn name(&self) -> &'static str {
        "vhd"
    }

    fn diskinfo(&self) -> DiskInfo {
        DiskInfo::new(self.footer.disksize())
    }

    fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<()> {
        match self.disk_type {
            VhdType::Fixed => self.read_fixed(buf, offset),
            VhdType::Dynamic => self.read_dynamic(buf, offset),
            other => Err(Error::file_not_supported(format!(
                "VHD disk type {other:?} is not supported"
            ))),
        }
    }

    fn write(&mut self, buf: &[u8], offset: u64) -> Result<()> {
        match self.disk_type {
            VhdType::Fixed => self.write_fixed(buf, offset),
            VhdType::Dynamic => self.write_dynamic(buf, offset),
            other => Err(Error::file_not_supported(format!(
                "VHD disk type {other:?} is not supported"
            ))),
        }
    }
}
