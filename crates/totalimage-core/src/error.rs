//! Error model shared by every image driver.

use thiserror::Error;

/// The error kinds a driver or the facade can raise.
///
/// Mirrors the tagged `LDI_ERROR` union from the format the engine is
/// ported from: one kind, plus whatever the OS reported for I/O failures.
#[derive(Error, Debug)]
pub enum Error {
    /// Allocation failed.
    #[error("out of memory")]
    NoMem,

    /// `Image::open` was asked for a driver name nobody registered.
    #[error("unknown image format: {0}")]
    FormatUnknown(String),

    /// The format was recognised but this variant of it isn't handled
    /// (differencing VHD, an unrecognised VMDK `createType`, ...).
    #[error("unsupported format variant: {0}")]
    FileNotSupported(String),

    /// A read or write fell outside `[0, disksize]`.
    #[error("requested range is out of bounds: offset={offset} len={len} disksize={disksize}")]
    OutOfRange {
        offset: u64,
        len: u64,
        disksize: u64,
    },

    /// The VMDK descriptor or an extent line was malformed.
    #[error("parse error: {0}")]
    ParseError(String),

    /// A syscall failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A memory mapping could not be created.
    #[error("mmap failed: {0}")]
    Unknown(String),
}

/// Result type alias used throughout the engine.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn format_unknown(name: impl Into<String>) -> Self {
        Error::FormatUnknown(name.into())
    }

    pub fn file_not_supported(msg: impl Into<String>) -> Self {
        Error::FileNotSupported(msg.into())
    }

    pub fn parse_error(msg: impl Into<String>) -> Self {
        Error::ParseError(msg.into())
    }

    pub fn unknown(msg: impl Into<String>) -> Self {
        Error::Unknown(msg.into())
    }

    pub fn out_of_range(offset: u64, len: u64, disksize: u64) -> Self {
        Error::OutOfRange {
            offset,
            len,
            disksize,
        }
    }
}
