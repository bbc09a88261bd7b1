use core::fmt;

use crate::region::RegionKind;

/// Failure reported by a host primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoError {
    /// Nothing decodes the address in this space.
    Unmapped,
    /// The target rejected the access (bus error, bad width, ...).
    Rejected,
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoError::Unmapped => write!(f, "address not mapped"),
            IoError::Rejected => write!(f, "access rejected by target"),
        }
    }
}

impl core::error::Error for IoError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionError {
    MapFailed { address: u64, length: usize },
    /// A namespace property needed to address the region is missing.
    MissingAddressInfo(&'static str),
    /// A namespace property holds a value that cannot address the region.
    InvalidAddressInfo { name: &'static str, value: u64 },
    IoFailed {
        kind: RegionKind,
        address: u64,
        width: u32,
        cause: IoError,
    },
}

impl fmt::Display for RegionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionError::MapFailed { address, length } => {
                write!(f, "could not map {length} bytes at 0x{address:08x}")
            }
            RegionError::MissingAddressInfo(name) => write!(f, "cannot locate {name}"),
            RegionError::InvalidAddressInfo { name, value } => {
                write!(f, "{name} value 0x{value:x} is out of range")
            }
            RegionError::IoFailed {
                kind,
                address,
                width,
                cause,
            } => write!(
                f,
                "{width}-byte access to {kind:?} at 0x{address:08x} failed ({cause})"
            ),
        }
    }
}

impl core::error::Error for RegionError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    InvalidAccessType(u8),
    InvalidUpdateRule(u8),
    InvalidRegionKind(u8),
    ZeroLength,
    /// Field values are carried in a `u64`.
    TooWide(u32),
    /// The field touches bytes outside its backing store.
    OutOfBounds {
        bit_offset: u32,
        bit_length: u32,
        limit: u64,
    },
    Region(RegionError),
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::InvalidAccessType(t) => write!(f, "illegal access type: {t}"),
            FieldError::InvalidUpdateRule(r) => write!(f, "illegal update rule: {r}"),
            FieldError::InvalidRegionKind(k) => write!(f, "illegal region space: {k}"),
            FieldError::ZeroLength => write!(f, "field has zero length"),
            FieldError::TooWide(len) => write!(f, "field of {len} bits does not fit an integer"),
            FieldError::OutOfBounds {
                bit_offset,
                bit_length,
                limit,
            } => write!(
                f,
                "field [{bit_offset}+{bit_length}] exceeds backing store of {limit} bytes"
            ),
            FieldError::Region(e) => write!(f, "{e}"),
        }
    }
}

impl core::error::Error for FieldError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            FieldError::Region(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RegionError> for FieldError {
    fn from(e: RegionError) -> Self {
        FieldError::Region(e)
    }
}
