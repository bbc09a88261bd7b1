//! Hook for hardware-specific value corrections

use crate::region::RegionKind;

/// One access-unit-sized interaction, as seen by a [`ValueTransform`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitAccess {
    pub kind: RegionKind,
    /// Address of the unit in its space.
    pub address: u64,
    pub unit_size: u32,
    /// Part of the field that lives in this unit.
    pub bit_offset: u32,
    pub bit_length: u32,
}

/// Applied to field values on their way out of (read) and into (write) an
/// access unit. The default leaves values alone.
pub trait ValueTransform {
    fn transform_read(&mut self, access: &UnitAccess, value: u64) -> u64 {
        let _ = access;
        value
    }

    fn transform_write(&mut self, access: &UnitAccess, value: u64) -> u64 {
        let _ = access;
        value
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl ValueTransform for Passthrough {}
