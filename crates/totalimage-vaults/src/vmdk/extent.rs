//! The extent-description grammar: `ACCESS SIZE TYPE "FILENAME" [OFFSET]`.

use totalimage_core::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtentAccess {
    Rw,
    Rdonly,
    Noaccess,
}

impl ExtentAccess {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "RW" => Some(Self::Rw),
            "RDONLY" => Some(Self::Rdonly),
            "NOACCESS" => Some(Self::Noaccess),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtentType {
    Flat,
    Sparse,
    Zero,
    Vmfs,
    VmfsSparse,
    VmfsRdm,
    VmfsRaw,
}

impl ExtentType {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "FLAT" => Some(Self::Flat),
            "SPARSE" => Some(Self::Sparse),
            "ZERO" => Some(Self::Zero),
            "VMFS" => Some(Self::Vmfs),
            "VMFSSPARSE" => Some(Self::VmfsSparse),
            "VMFSRDM" => Some(Self::VmfsRdm),
            "VMFSRAW" => Some(Self::VmfsRaw),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtentDescriptor {
    pub access: ExtentAccess,
    pub sectors: u64,
    pub extent_type: ExtentType,
    pub filename: String,
    pub offset: u64,
}

/// Parses one extent line: `ACCESS SIZE TYPE "FILENAME"[ OFFSET]`.
///
/// This is a straight tokenizer rather than a regex, since Rust's std
/// library doesn't ship one and the grammar is simple enough to walk by
/// hand: four whitespace-delimited fields, the third of which is wrapped
/// in double quotes, with an optional fifth numeric field.
pub fn parse_extent(line: &str) -> Result<ExtentDescriptor> {
    let line = line.trim();
    let quote_start = line
        .find('"')
        .ok_or_else(|| Error::parse_error(format!("extent line has no quoted filename: {line}")))?;

    let head = line[..quote_start].trim();
    let mut head_tokens = head.split_whitespace();

    let access_token = head_tokens
        .next()
        .ok_or_else(|| Error::parse_error("extent line missing access field"))?;
    let access = ExtentAccess::from_token(access_token)
        .ok_or_else(|| Error::parse_error(format!("unrecognized extent access: {access_token}")))?;

    let size_token = head_tokens
        .next()
        .ok_or_else(|| Error::parse_error("extent line missing size field"))?;
    let sectors: u64 = size_token
        .parse()
        .map_err(|_| Error::parse_error(format!("extent size is not an integer: {size_token}")))?;

    let type_token = head_tokens
        .next()
        .ok_or_else(|| Error::parse_error("extent line missing type field"))?;
    let extent_type = ExtentType::from_token(type_token)
        .ok_or_else(|| Error::parse_error(format!("unrecognized extent type: {type_token}")))?;

    if head_tokens.next().is_some() {
        return Err(Error::parse_error(format!(
            "extent line has unexpected tokens before filename: {line}"
        )));
    }

    let rest = &line[quote_start + 1..];
    let quote_end = rest
        .find('"')
        .ok_or_else(|| Error::parse_error(format!("extent filename quote not closed: {line}")))?;
    let filename = rest[..quote_end].to_string();

    let tail = rest[quote_end + 1..].trim();
    let offset = if tail.is_empty() {
        0
    } else {
        tail.parse()
            .map_err(|_| Error::parse_error(format!("extent offset is not an integer: {tail}")))?
    };

    Ok(ExtentDescriptor {
        access,
        sectors,
        extent_type,
        filename,
        offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_extent_line() {
        let extent = parse_extent("RW 44042240 SPARSE \"\"").unwrap();
        assert_eq!(extent.access, ExtentAccess::Rw);
        assert_eq!(extent.sectors, 44042240);
        assert_eq!(extent.extent_type, ExtentType::Sparse);
        assert_eq!(extent.filename, "");
        assert_eq!(extent.offset, 0);
    }

    #[test]
    fn parses_extent_with_filename_and_offset() {
        let extent = parse_extent("RDONLY 2048 FLAT \"disk-f001.vmdk\" 512").unwrap();
        assert_eq!(extent.access, ExtentAccess::Rdonly);
        assert_eq!(extent.extent_type, ExtentType::Flat);
        assert_eq!(extent.filename, "disk-f001.vmdk");
        assert_eq!(extent.offset, 512);
    }

    #[test]
    fn rejects_garbage_size_field() {
        let result = parse_extent("RW 4404X2240 SPARSE \"\" 1");
        assert!(result.is_err());
    }

    #[test]
    fn rejects_unknown_access() {
        assert!(parse_extent("MAYBE 10 FLAT \"x\"").is_err());
    }

    #[test]
    fn rejects_unknown_type() {
        assert!(parse_extent("RW 10 WEIRD \"x\"").is_err());
    }

    #[test]
    fn rejects_missing_filename_quotes() {
        assert!(parse_extent("RW 10 FLAT x").is_err());
    }
}
