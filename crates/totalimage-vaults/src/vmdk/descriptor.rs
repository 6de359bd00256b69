//! The VMDK descriptor file: key=value lines plus bare extent lines.
//!
//! Tokenisation walks a small state machine (`BeforeKey → Key →
//! BeforeValue → Value`) line by line, mirroring the original
//! `get_key_value`; each key is then dispatched to a typed handler the
//! way `handle_argument`'s lookup table does.

use totalimage_core::{Error, Result};

use super::extent::{parse_extent, ExtentDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateType {
    MonolithicSparse,
    VmfsSparse,
    MonolithicFlat,
    Vmfs,
    TwoGbMaxExtentSparse,
    TwoGbMaxExtentFlat,
    FullDevice,
    VmfsRaw,
    PartitionedDevice,
    VmfsRawDeviceMap,
    VmfsPassthroughRawDeviceMap,
    StreamOptimized,
}

impl CreateType {
    fn from_str(value: &str) -> Option<Self> {
        Some(match value {
            "monolithicSparse" => Self::MonolithicSparse,
            "vmfsSparse" => Self::VmfsSparse,
            "monolithicFlat" => Self::MonolithicFlat,
            "vmfs" => Self::Vmfs,
            "twoGbMaxExtentSparse" => Self::TwoGbMaxExtentSparse,
            "twoGbMaxExtentFlat" => Self::TwoGbMaxExtentFlat,
            "fullDevice" => Self::FullDevice,
            "vmfsRaw" => Self::VmfsRaw,
            "partitionedDevice" => Self::PartitionedDevice,
            "vmfsRawDeviceMap" => Self::VmfsRawDeviceMap,
            "vmfsPassthroughRawDeviceMap" => Self::VmfsPassthroughRawDeviceMap,
            "streamOptimized" => Self::StreamOptimized,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct VmdkDescriptor {
    pub version: u16,
    pub cid: u32,
    pub parentcid: u32,
    pub filetype: Option<CreateType>,
    pub extents: Vec<ExtentDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct KeyValue<'a> {
    key: Option<&'a str>,
    value: &'a str,
}

/// Splits one line into a key/value pair. A line with no `=` is returned
/// with an empty key (the caller treats that as an extent line).
/// Surrounding whitespace is trimmed from both sides, and a value wrapped
/// in double quotes has them stripped.
fn get_key_value(line: &str) -> KeyValue<'_> {
    match line.split_once('=') {
        Some((key, value)) => KeyValue {
            key: Some(key.trim()),
            value: strip_quotes(value.trim()),
        },
        None => KeyValue {
            key: None,
            value: strip_quotes(line.trim()),
        },
    }
}

fn strip_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() > 1 && bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"' {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

impl VmdkDescriptor {
    /// Parses a complete descriptor-file body.
    pub fn parse(text: &str) -> Result<Self> {
        let mut descriptor = VmdkDescriptor::default();

        for raw_line in text.lines() {
            let line = raw_line.trim();
            if line.is_empty() || is_comment(line) {
                continue;
            }

            let kv = get_key_value(line);
            descriptor.handle(kv)?;
        }

        Ok(descriptor)
    }

    fn handle(&mut self, kv: KeyValue<'_>) -> Result<()> {
        match kv.key {
            None => {
                let extent = parse_extent(kv.value)?;
                self.extents.push(extent);
            }
            Some("version") => {
                self.version = kv
                    .value
                    .parse::<u16>()
                    .map_err(|_| Error::parse_error(format!("bad version: {}", kv.value)))?;
            }
            Some("CID") => {
                self.cid = u32::from_str_radix(kv.value, 16)
                    .map_err(|_| Error::parse_error(format!("bad CID: {}", kv.value)))?;
            }
            Some("parentCID") => {
                self.parentcid = u32::from_str_radix(kv.value, 16)
                    .map_err(|_| Error::parse_error(format!("bad parentCID: {}", kv.value)))?;
            }
            Some("createType") => {
                self.filetype = Some(CreateType::from_str(kv.value).ok_or_else(|| {
                    Error::file_not_supported(format!("unknown createType: {}", kv.value))
                })?);
            }
            // Any other recognised-but-unhandled key (e.g. ddb.* metadata)
            // is skipped without error, per the descriptor's dispatch table.
            Some(_) => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vmdk::extent::{ExtentAccess, ExtentType};

    const SAMPLE: &str = "# Disk DescriptorFile\nversion=1\nCID=00000000\nparentCID=ffffffff\ncreateType=\"monolithicSparse\"\nRW 44042240 SPARSE \"\"\n";

    #[test]
    fn parses_sample_descriptor() {
        let descriptor = VmdkDescriptor::parse(SAMPLE).unwrap();
        assert_eq!(descriptor.version, 1);
        assert_eq!(descriptor.cid, 0);
        assert_eq!(descriptor.parentcid, 0xFFFF_FFFF);
        assert_eq!(descriptor.filetype, Some(CreateType::MonolithicSparse));
        assert_eq!(descriptor.extents.len(), 1);
        assert_eq!(descriptor.extents[0].sectors, 44042240);
        assert_eq!(descriptor.extents[0].access, ExtentAccess::Rw);
        assert_eq!(descriptor.extents[0].extent_type, ExtentType::Sparse);
        assert_eq!(descriptor.extents[0].offset, 0);
    }

    #[test]
    fn ignores_comment_and_blank_lines() {
        let descriptor = VmdkDescriptor::parse("\n# just a comment\n\nversion=1\n").unwrap();
        assert_eq!(descriptor.version, 1);
    }

    #[test]
    fn unknown_create_type_is_file_not_supported() {
        let result = VmdkDescriptor::parse("createType=\"bogus\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn bad_version_is_parse_error() {
        let result = VmdkDescriptor::parse("version=1x\n");
        assert!(result.is_err());
    }

    #[test]
    fn unrecognized_key_is_skipped() {
        let descriptor = VmdkDescriptor::parse("ddb.geometry.cylinders = \"1024\"\nversion=1\n").unwrap();
        assert_eq!(descriptor.version, 1);
    }
}
