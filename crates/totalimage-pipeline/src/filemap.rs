//! Page-aligned scoped memory-mapped windows into a file.
//!
//! `mmap(2)` requires the mapping offset to be page-aligned; callers don't
//! want to think about that, so these widen the requested range to the
//! nearest page boundary and remember how much padding was added at the
//! front so slice access can hide it again.

use std::fs::File;

use memmap2::{Mmap, MmapMut, MmapOptions};
use totalimage_core::Error;
use totalimage_core::Result;

/// Most common page size; used to widen mapping requests to a page
/// boundary. A mismatch with the real page size only costs a slightly
/// larger mapping, never correctness, since the requested window is still
/// addressed relative to `padding_start`.
const PAGE_SIZE: u64 = 4096;

fn align(offset: u64, length: u64) -> (u64, u64, u64) {
    let end = offset + length;
    let padding_start = offset % PAGE_SIZE;
    let padding_end = (PAGE_SIZE - (end % PAGE_SIZE)) % PAGE_SIZE;
    let aligned_offset = offset - padding_start;
    let aligned_length = length + padding_start + padding_end;
    (aligned_offset, aligned_length, padding_start)
}

/// A read-only window into a file, page-aligned under the hood.
pub struct FileMap {
    mmap: Mmap,
    padding_start: u64,
    length: u64,
}

impl FileMap {
    pub(crate) fn new(file: &File, offset: u64, length: u64) -> Result<Self> {
        let (aligned_offset, aligned_length, padding_start) = align(offset, length);
        let mmap = unsafe {
            MmapOptions::new()
                .offset(aligned_offset)
                .len(aligned_length as usize)
                .map(file)
                .map_err(|e| Error::unknown(format!("failed to map memory: {e}")))?
        };
        Ok(Self {
            mmap,
            padding_start,
            length,
        })
    }

    /// The requested (unaligned) window as a slice.
    pub fn as_slice(&self) -> &[u8] {
        let start = self.padding_start as usize;
        &self.mmap[start..start + self.length as usize]
    }

    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// A read-write window into a file, page-aligned under the hood.
pub struct FileMapMut {
    mmap: MmapMut,
    padding_start: u64,
    length: u64,
}

impl FileMapMut {
    pub(crate) fn new(file: &File, offset: u64, length: u64) -> Result<Self> {
        let (aligned_offset, aligned_length, padding_start) = align(offset, length);
        let mmap = unsafe {
            MmapOptions::new()
                .offset(aligned_offset)
                .len(aligned_length as usize)
                .map_mut(file)
                .map_err(|e| Error::unknown(format!("failed to map memory: {e}")))?
        };
        Ok(Self {
            mmap,
            padding_start,
            length,
        })
    }

    pub fn as_slice(&self) -> &[u8] {
        let start = self.padding_start as usize;
        &self.mmap[start..start + self.length as usize]
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        let start = self.padding_start as usize;
        &mut self.mmap[start..start + self.length as usize]
    }

    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Flush dirty pages back to disk.
    pub fn flush(&self) -> Result<()> {
        self.mmap
            .flush()
            .map_err(|e| Error::unknown(format!("failed to flush mapping: {e}")))
    }
}
