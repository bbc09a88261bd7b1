use core::ptr::NonNull;

use super::{Namespace, PciAddress, Platform, RegionHandle, RegionKind, RegionSpace, Value};
use crate::error::{IoError, RegionError};

fn io_failed(handle: &RegionHandle, address: u64, cause: IoError) -> RegionError {
    RegionError::IoFailed {
        kind: handle.kind,
        address,
        width: handle.unit_size,
        cause,
    }
}

/// System memory, accessed through a mapping held for the handle's lifetime.
pub struct SystemMemory<'p, P: Platform + ?Sized> {
    platform: &'p mut P,
}

impl<'p, P: Platform + ?Sized> SystemMemory<'p, P> {
    pub fn new(platform: &'p mut P) -> Self {
        Self { platform }
    }

    /// Pointer to `address` if the whole unit lies inside the mapping.
    fn unit_ptr(&self, handle: &RegionHandle, address: u64) -> Result<NonNull<u8>, RegionError> {
        let base = handle.mapped_base.ok_or(RegionError::MapFailed {
            address: handle.aligned_address,
            length: handle.span() as usize,
        })?;

        match address.checked_sub(handle.aligned_address) {
            Some(offset) if offset + u64::from(handle.unit_size) <= handle.span() => {
                // SAFETY: offset is within the mapping established in open().
                Ok(unsafe { base.add(offset as usize) })
            }
            _ => Err(io_failed(handle, address, IoError::Unmapped)),
        }
    }
}

/// # Safety
/// `ptr` must be valid for reads of `width` bytes.
unsafe fn read_volatile_unit(ptr: NonNull<u8>, width: u32) -> u64 {
    let ptr = ptr.as_ptr();
    unsafe {
        match width {
            2 if ptr.cast::<u16>().is_aligned() => u64::from(ptr.cast::<u16>().read_volatile()),
            4 if ptr.cast::<u32>().is_aligned() => u64::from(ptr.cast::<u32>().read_volatile()),
            8 if ptr.cast::<u64>().is_aligned() => ptr.cast::<u64>().read_volatile(),
            // Byte units, or a misaligned unit assembled little-endian.
            _ => (0..width as usize).fold(0u64, |acc, i| {
                acc | (u64::from(ptr.add(i).read_volatile()) << (8 * i))
            }),
        }
    }
}

/// # Safety
/// `ptr` must be valid for writes of `width` bytes.
unsafe fn write_volatile_unit(ptr: NonNull<u8>, width: u32, value: u64) {
    let ptr = ptr.as_ptr();
    unsafe {
        match width {
            2 if ptr.cast::<u16>().is_aligned() => ptr.cast::<u16>().write_volatile(value as u16),
            4 if ptr.cast::<u32>().is_aligned() => ptr.cast::<u32>().write_volatile(value as u32),
            8 if ptr.cast::<u64>().is_aligned() => ptr.cast::<u64>().write_volatile(value),
            _ => {
                for i in 0..width as usize {
                    ptr.add(i).write_volatile((value >> (8 * i)) as u8);
                }
            }
        }
    }
}

impl<P: Platform + ?Sized> RegionSpace for SystemMemory<'_, P> {
    fn open(&mut self, handle: &mut RegionHandle, _scope: &dyn Namespace) -> Result<(), RegionError> {
        let length = handle.span() as usize;
        log::debug!("Mapping 0x{:08x} ({} bytes)", handle.aligned_address, length);

        let ptr = self
            .platform
            .map(handle.aligned_address, length)
            .map_err(|_| RegionError::MapFailed {
                address: handle.aligned_address,
                length,
            })?;
        handle.mapped_base = Some(ptr);
        Ok(())
    }

    fn close(&mut self, handle: &mut RegionHandle) {
        if let Some(ptr) = handle.mapped_base.take() {
            log::debug!("Unmapping 0x{:08x}", handle.aligned_address);
            self.platform.unmap(ptr, handle.span() as usize);
        }
    }

    fn read_unit(&mut self, handle: &RegionHandle, address: u64) -> Result<u64, RegionError> {
        let ptr = self.unit_ptr(handle, address)?;
        // SAFETY: unit_ptr() checked the unit is inside the live mapping.
        Ok(unsafe { read_volatile_unit(ptr, handle.unit_size) })
    }

    fn write_unit(&mut self, handle: &RegionHandle, address: u64, value: u64) -> Result<(), RegionError> {
        let ptr = self.unit_ptr(handle, address)?;
        // SAFETY: unit_ptr() checked the unit is inside the live mapping.
        unsafe { write_volatile_unit(ptr, handle.unit_size, value) };
        Ok(())
    }
}

/// PCI configuration space of the function named by the enclosing scope.
pub struct PciConfig<'p, P: Platform + ?Sized> {
    platform: &'p mut P,
}

impl<'p, P: Platform + ?Sized> PciConfig<'p, P> {
    pub fn new(platform: &'p mut P) -> Self {
        Self { platform }
    }

    fn config_address(handle: &RegionHandle, address: u64) -> Result<u64, RegionError> {
        let pci = handle.pci.ok_or(RegionError::MissingAddressInfo("_ADR"))?;
        // The whole unit must fall inside the function's 4 KiB window.
        let register = u16::try_from(address)
            .ok()
            .filter(|r| u32::from(*r) + handle.unit_size <= 0x1000)
            .ok_or(io_failed(handle, address, IoError::Unmapped))?;
        Ok(pci.ecam(register))
    }
}

impl<P: Platform + ?Sized> RegionSpace for PciConfig<'_, P> {
    fn open(&mut self, handle: &mut RegionHandle, scope: &dyn Namespace) -> Result<(), RegionError> {
        let bus = match scope.lookup_property("_BBN") {
            Some(Value::Integer(bbn)) => {
                log::debug!("found _BBN: {bbn}");
                (bbn & 0xff) as u8
            }
            _ => {
                log::warn!("Cannot locate _BBN, using default bus 0");
                0
            }
        };

        let adr = match scope.lookup_property("_ADR") {
            Some(Value::Integer(adr)) => adr,
            _ => return Err(RegionError::MissingAddressInfo("_ADR")),
        };

        let pci = PciAddress::from_adr(bus, adr);
        if pci.device > 0x1f || pci.function > 0x07 {
            return Err(RegionError::InvalidAddressInfo { name: "_ADR", value: adr });
        }
        log::debug!("PCI {:02x}:{:02x}.{:x}", pci.bus, pci.device, pci.function);
        handle.pci = Some(pci);
        Ok(())
    }

    fn close(&mut self, handle: &mut RegionHandle) {
        handle.pci = None;
    }

    fn read_unit(&mut self, handle: &RegionHandle, address: u64) -> Result<u64, RegionError> {
        let config = Self::config_address(handle, address)?;
        self.platform
            .read_unit(RegionKind::PciConfig, config, handle.unit_size)
            .map_err(|e| io_failed(handle, address, e))
    }

    fn write_unit(&mut self, handle: &RegionHandle, address: u64, value: u64) -> Result<(), RegionError> {
        let config = Self::config_address(handle, address)?;
        self.platform
            .write_unit(RegionKind::PciConfig, config, handle.unit_size, value)
            .map_err(|e| io_failed(handle, address, e))
    }
}

/// Any space that needs nothing beyond the raw unit primitives: system I/O,
/// embedded controller, SMBus, CMOS, PCI BAR targets.
pub struct PortSpace<'p, P: Platform + ?Sized> {
    kind: RegionKind,
    platform: &'p mut P,
}

impl<'p, P: Platform + ?Sized> PortSpace<'p, P> {
    pub fn new(kind: RegionKind, platform: &'p mut P) -> Self {
        Self { kind, platform }
    }
}

impl<P: Platform + ?Sized> RegionSpace for PortSpace<'_, P> {
    fn read_unit(&mut self, handle: &RegionHandle, address: u64) -> Result<u64, RegionError> {
        self.platform
            .read_unit(self.kind, address, handle.unit_size)
            .map_err(|e| io_failed(handle, address, e))
    }

    fn write_unit(&mut self, handle: &RegionHandle, address: u64, value: u64) -> Result<(), RegionError> {
        self.platform
            .write_unit(self.kind, address, handle.unit_size, value)
            .map_err(|e| io_failed(handle, address, e))
    }
}
