//! Name-keyed driver registry: maps a format name to the function that
//! opens it.
//!
//! The original's `SET_FOREACH(iter, parsers)` walks a linker-generated
//! set of statically registered `ldi_parser` vtables; there's no Rust
//! equivalent to a linker set, so this registry is just a small table
//! built once at startup and handed to [`crate::image::Image::open`] by
//! reference. Lookup is case-insensitive, matching `strcasecmp`.

use std::path::Path;

use totalimage_core::{Error, ImageDriver, Logger, Result};

use crate::vhd::VhdDriver;
use crate::vmdk::VmdkDriver;

type OpenFn = fn(&Path, Logger) -> Result<Box<dyn ImageDriver>>;

struct DriverEntry {
    name: &'static str,
    open: OpenFn,
}

/// A registry of named format drivers. Construct once with [`Registry::standard`]
/// and share by reference across opens.
pub struct Registry {
    entries: Vec<DriverEntry>,
}

impl Registry {
    /// Empty registry; drivers must be added with [`Registry::register`].
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// The registry of built-in drivers: `vhd` and `vmdk`.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register("vhd", |path, logger| {
            Ok(Box::new(VhdDriver::open(path, logger)?))
        });
        registry.register("vmdk", |path, logger| {
            Ok(Box::new(VmdkDriver::open(path, logger)?))
        });
        registry
    }

    pub fn register(&mut self, name: &'static str, open: OpenFn) {
        self.entries.push(DriverEntry { name, open });
    }

    /// Looks up `format` case-insensitively and opens `path` with it.
    pub fn open(&self, format: &str, path: &Path, logger: Logger) -> Result<Box<dyn ImageDriver>> {
        let entry = self
            .entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(format))
            .ok_or_else(|| Error::format_unknown(format))?;
        (entry.open)(path, logger)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}
