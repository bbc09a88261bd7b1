//! Address spaces that back region fields
//!
//! A field declared in an operation region is accessed through a
//! [`RegionHandle`] that lives for one field access. Each region space kind
//! has its own [`RegionSpace`] implementation which decides what opening the
//! handle acquires and how a single access unit reaches the host.

mod handle;
mod space;

use core::ptr::NonNull;

pub use handle::{PciAddress, RegionHandle};
pub use space::{PciConfig, PortSpace, SystemMemory};

use crate::error::{FieldError, IoError, RegionError};

/// Region space identifiers, numbered as in the bytecode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    SystemMemory,
    SystemIo,
    PciConfig,
    EmbeddedControl,
    SmBus,
    Cmos,
    PciBarTarget,
}

impl TryFrom<u8> for RegionKind {
    type Error = FieldError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RegionKind::SystemMemory),
            1 => Ok(RegionKind::SystemIo),
            2 => Ok(RegionKind::PciConfig),
            3 => Ok(RegionKind::EmbeddedControl),
            4 => Ok(RegionKind::SmBus),
            5 => Ok(RegionKind::Cmos),
            6 => Ok(RegionKind::PciBarTarget),
            _ => Err(FieldError::InvalidRegionKind(value)),
        }
    }
}

/// A declared operation region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpRegion {
    pub kind: RegionKind,
    pub base: u64,
    /// Length in bytes.
    pub length: u64,
}

/// Property value as seen through the namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value<'a> {
    Integer(u64),
    String(&'a str),
    Buffer(&'a [u8]),
}

/// Name lookup in the scope enclosing the region.
pub trait Namespace {
    fn lookup_property(&self, name: &str) -> Option<Value<'_>>;
}

/// Raw access primitives provided by the host.
pub trait Platform {
    fn read_unit(&mut self, kind: RegionKind, address: u64, width: u32) -> Result<u64, IoError>;

    fn write_unit(&mut self, kind: RegionKind, address: u64, width: u32, value: u64) -> Result<(), IoError>;

    /// Makes `[address, address + length)` of system memory accessible.
    fn map(&mut self, address: u64, length: usize) -> Result<NonNull<u8>, IoError>;

    fn unmap(&mut self, ptr: NonNull<u8>, length: usize);
}

/// Capability set of one region space kind.
pub trait RegionSpace {
    /// Acquires whatever the handle needs for the duration of the access.
    fn open(&mut self, handle: &mut RegionHandle, scope: &dyn Namespace) -> Result<(), RegionError> {
        let _ = (handle, scope);
        Ok(())
    }

    fn close(&mut self, handle: &mut RegionHandle) {
        let _ = handle;
    }

    fn read_unit(&mut self, handle: &RegionHandle, address: u64) -> Result<u64, RegionError>;

    fn write_unit(&mut self, handle: &RegionHandle, address: u64, value: u64) -> Result<(), RegionError>;
}
