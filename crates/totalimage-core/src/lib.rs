//! # totalimage-core
//!
//! Foundational types shared by every image driver: the error model, the
//! big-endian binary codec, the `Logger`/`DiskInfo` pair, size-limit
//! helpers, and the `ImageDriver` trait drivers plug into.

pub mod codec;
pub mod error;
pub mod security;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::ImageDriver;
pub use types::{DiskInfo, LogLevel, Logger};
