//! `ManagedFile`: an opened disk-image file plus its path.
//!
//! Every format driver works through one of these instead of a bare
//! `std::fs::File` so that resizing and directory lookup (needed for VMDK
//! descriptors, whose extent files are named relative to the descriptor's
//! own directory) are in one place.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use totalimage_core::Result;

use crate::filemap::{FileMap, FileMapMut};

/// Zero-fill writes are done in chunks this large, mirroring the original
/// `write_zeros` helper, which streams through a single 512-byte buffer
/// rather than allocating one big zero buffer up front.
const ZERO_CHUNK: usize = 512;

/// An open file backing a disk image, read-write, with its path retained
/// so a driver can resolve sibling files (VMDK extents) by directory.
pub struct ManagedFile {
    file: File,
    path: PathBuf,
}

impl ManagedFile {
    /// Open `path` read-write. The image must already exist; this engine
    /// attaches to existing VHD/VMDK files, it doesn't create them.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory containing this file, for resolving sibling paths.
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Current size of the file in bytes.
    pub fn size(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Resize the file to `new_size`. Growing zero-fills the new region in
    /// `ZERO_CHUNK`-byte writes (matching `write_zeros`/`file_setsize`);
    /// shrinking truncates.
    pub fn set_size(&mut self, new_size: u64) -> Result<()> {
        let old_size = self.size()?;
        if new_size > old_size {
            self.write_zeros(old_size, new_size - old_size)?;
        } else {
            self.file.set_len(new_size)?;
        }
        Ok(())
    }

    fn write_zeros(&mut self, mut pos: u64, mut nbytes: u64) -> Result<()> {
        use std::io::{Seek, SeekFrom};
        let zeros = [0u8; ZERO_CHUNK];
        self.file.seek(SeekFrom::Start(pos))?;
        while nbytes > 0 {
            let chunk = nbytes.min(ZERO_CHUNK as u64) as usize;
            self.file.write_all(&zeros[..chunk])?;
            pos += chunk as u64;
            nbytes -= chunk as u64;
        }
        self.file.sync_all()?;
        Ok(())
    }

    /// Map `[offset, offset+length)` read-only.
    pub fn map(&self, offset: u64, length: u64) -> Result<FileMap> {
        FileMap::new(&self.file, offset, length)
    }

    /// Map `[offset, offset+length)` read-write.
    pub fn map_mut(&self, offset: u64, length: u64) -> Result<FileMapMut> {
        FileMapMut::new(&self.file, offset, length)
    }

    /// Flush any buffered writer state and fsync the underlying fd.
    pub fn sync(&self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}
