use core::ptr::NonNull;

use super::{Namespace, OpRegion, RegionKind, RegionSpace};
use crate::error::FieldError;
use crate::flags::FieldSpec;

/// Bus/device/function of a PCI configuration space region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PciAddress {
    pub bus: u8,
    pub device: u16,
    pub function: u16,
}

impl PciAddress {
    /// Splits an `_ADR` value: device in the high word, function in the low.
    pub fn from_adr(bus: u8, adr: u64) -> Self {
        Self {
            bus,
            device: ((adr >> 16) & 0xffff) as u16,
            function: (adr & 0xffff) as u16,
        }
    }

    /// ECAM offset of `register` in this function's configuration space.
    pub fn ecam(&self, register: u16) -> u64 {
        (u64::from(self.bus) << 20)
            | (u64::from(self.device & 0x1f) << 15)
            | (u64::from(self.function & 0x07) << 12)
            | u64::from(register & 0x0fff)
    }
}

/// Per-access view of a region: unit size, aligned start, and whatever the
/// space acquired on open.
#[derive(Debug)]
pub struct RegionHandle {
    pub kind: RegionKind,
    /// Access unit in bytes: 1, 2, 4 or 8.
    pub unit_size: u32,
    pub aligned_address: u64,
    pub byte_length: u64,
    pub mapped_base: Option<NonNull<u8>>,
    pub pci: Option<PciAddress>,
}

impl RegionHandle {
    /// Computes the access window of `spec` in `region`.
    pub fn new(region: &OpRegion, spec: &FieldSpec) -> Result<Self, FieldError> {
        let out_of_bounds = FieldError::OutOfBounds {
            bit_offset: spec.bit_offset,
            bit_length: spec.bit_length,
            limit: region.length,
        };

        let unit_size = spec.granularity.unit_size(spec.bit_length);
        let unit = u64::from(unit_size);
        let byte_offset = u64::from(spec.bit_offset) / 8;
        let byte_end = (u64::from(spec.bit_offset) + u64::from(spec.bit_length)).div_ceil(8);

        // Every unit touched, not just every byte of the field, must lie in
        // the region.
        let first_unit = unit * (byte_offset / unit);
        let byte_length = byte_end - first_unit;
        let span_end = first_unit + byte_length.next_multiple_of(unit);
        if span_end > region.length {
            return Err(out_of_bounds);
        }

        let aligned_address = region.base.checked_add(first_unit).ok_or(out_of_bounds)?;
        region.base.checked_add(span_end).ok_or(out_of_bounds)?;

        Ok(Self {
            kind: region.kind,
            unit_size,
            aligned_address,
            byte_length,
            mapped_base: None,
            pci: None,
        })
    }

    pub fn open<S: RegionSpace + ?Sized>(
        space: &mut S,
        scope: &dyn Namespace,
        region: &OpRegion,
        spec: &FieldSpec,
    ) -> Result<Self, FieldError> {
        let mut handle = Self::new(region, spec)?;
        space.open(&mut handle, scope)?;
        log::debug!(
            "Opened {:?} handle at 0x{:08x} ({} bytes, {}-byte units)",
            handle.kind,
            handle.aligned_address,
            handle.byte_length,
            handle.unit_size
        );
        Ok(handle)
    }

    pub fn close<S: RegionSpace + ?Sized>(mut self, space: &mut S) {
        space.close(&mut self);
    }

    /// Bytes covered by whole units, starting at the aligned address.
    pub fn span(&self) -> u64 {
        self.byte_length.next_multiple_of(u64::from(self.unit_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{AccessGranularity, UpdateRule};

    const REGION: OpRegion = OpRegion {
        kind: RegionKind::SystemIo,
        base: 0x1000,
        length: 0x20,
    };

    #[test]
    fn aligns_down_to_unit() {
        let spec = FieldSpec::new(44, 8, AccessGranularity::DWord, UpdateRule::Preserve);
        let h = RegionHandle::new(&REGION, &spec).unwrap();
        assert_eq!(h.unit_size, 4);
        assert_eq!(h.aligned_address, 0x1004);
        assert_eq!(h.byte_length, 3);
        assert_eq!(h.span(), 4);
    }

    #[test]
    fn any_picks_unit_from_length() {
        let spec = FieldSpec::new(20, 12, AccessGranularity::Any, UpdateRule::Preserve);
        let h = RegionHandle::new(&REGION, &spec).unwrap();
        assert_eq!(h.unit_size, 2);
        assert_eq!(h.aligned_address, 0x1002);
        assert_eq!(h.byte_length, 2);
    }

    #[test]
    fn partial_last_byte_counts() {
        let spec = FieldSpec::new(3, 6, AccessGranularity::Byte, UpdateRule::Preserve);
        let h = RegionHandle::new(&REGION, &spec).unwrap();
        assert_eq!(h.aligned_address, 0x1000);
        assert_eq!(h.byte_length, 2);
    }

    #[test]
    fn field_past_region_end() {
        let spec = FieldSpec::new(0xf8, 9, AccessGranularity::Byte, UpdateRule::Preserve);
        assert_eq!(
            RegionHandle::new(&REGION, &spec).unwrap_err(),
            FieldError::OutOfBounds {
                bit_offset: 0xf8,
                bit_length: 9,
                limit: 0x20
            }
        );
    }

    #[test]
    fn last_unit_past_region_end() {
        let region = OpRegion {
            kind: RegionKind::SystemIo,
            base: 0x10,
            length: 3,
        };
        let spec = FieldSpec::new(0, 8, AccessGranularity::DWord, UpdateRule::Preserve);
        assert!(matches!(
            RegionHandle::new(&region, &spec),
            Err(FieldError::OutOfBounds { limit: 3, .. })
        ));

        let spec = FieldSpec::new(16, 8, AccessGranularity::Word, UpdateRule::Preserve);
        assert!(matches!(
            RegionHandle::new(&region, &spec),
            Err(FieldError::OutOfBounds { .. })
        ));

        let spec = FieldSpec::new(0, 16, AccessGranularity::Word, UpdateRule::Preserve);
        assert_eq!(RegionHandle::new(&region, &spec).unwrap().span(), 2);
    }

    #[test]
    fn pci_address_encoding() {
        let pci = PciAddress::from_adr(2, 0x001f_0003);
        assert_eq!(pci.device, 0x1f);
        assert_eq!(pci.function, 3);
        assert_eq!(pci.ecam(0x40), (2 << 20) | (0x1f << 15) | (3 << 12) | 0x40);
    }
}
