//! The seam every format driver plugs into.

use crate::error::Result;
use crate::types::DiskInfo;

/// A format driver: construct from an opened file, report geometry, and
/// service reads/writes at arbitrary byte offsets.
///
/// Mirrors the `construct`/`diskinfo`/`read`/`write` slots of the original
/// `ldi_parser` vtable. There is no explicit `destruct` slot — `Drop`
/// fills that role, since every driver owns its file handle directly.
pub trait ImageDriver: Send {
    /// The name this driver is registered under (e.g. `"vhd"`, `"vmdk"`).
    fn name(&self) -> &'static str;

    /// Geometry of the opened image.
    fn diskinfo(&self) -> DiskInfo;

    /// Read `buf.len()` bytes starting at `offset` into `buf`.
    ///
    /// Implementations may assume the caller has already bounds-checked
    /// `offset + buf.len()` against `diskinfo().disksize` — the facade
    /// does this once so every driver doesn't have to repeat it.
    fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<()>;

    /// Write `buf` at `offset`. Some formats (read-only VMDK extents, for
    /// instance) accept this silently without persisting anything; that is
    /// a deliberate, documented behavior of those drivers, not a bug here.
    fn write(&mut self, buf: &[u8], offset: u64) -> Result<()>;
}
