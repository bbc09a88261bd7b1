use std::collections::HashMap;
use std::ptr::NonNull;

use fieldio::{IoError, Platform, RegionKind};

use crate::peripherals::*;

/// Address window decoded by one peripheral.
#[derive(Debug, Clone, Copy)]
struct Window {
    kind: RegionKind,
    base: u64,
    size: u64,
    index: usize,
}

impl Window {
    fn contains(&self, kind: RegionKind, address: u64, length: u64) -> bool {
        self.kind == kind
            && address >= self.base
            && address
                .checked_add(length)
                .is_some_and(|end| end <= self.base + self.size)
    }
}

struct DirectWindow {
    base: u64,
    size: u64,
    ptr: *mut u8,
}

/// A set of simulated peripherals behind the host access primitives.
pub struct Machine {
    peripherals: Vec<Box<dyn Peripheral>>,
    windows: Vec<Window>,
    memory: Vec<DirectWindow>,
    live_maps: HashMap<usize, usize>,
}

impl Machine {
    pub fn new(mut peripherals: Vec<Box<dyn Peripheral>>) -> Result<Self, String> {
        let mut windows: Vec<Window> = Vec::new();
        let mut memory: Vec<DirectWindow> = Vec::new();

        for (index, p) in peripherals.iter_mut().enumerate() {
            p.reset();
            for m in p.mappings() {
                let (kind, base, size) = match m {
                    Mapping::Decoded { kind, base, size } => (kind, base, size),
                    Mapping::Direct { base, size, .. } => (RegionKind::SystemMemory, base, size),
                };
                log::debug!("{}: {:?} 0x{:08x} ({} bytes)", p.name(), kind, base, size);

                let end = base
                    .checked_add(size)
                    .ok_or_else(|| format!("{}: window at 0x{base:x} wraps", p.name()))?;
                let overlaps = windows
                    .iter()
                    .filter(|w| w.kind == kind)
                    .any(|w| base < w.base + w.size && w.base < end);
                if overlaps {
                    return Err(format!("{}: {kind:?} window at 0x{base:08x} overlaps", p.name()));
                }

                windows.push(Window {
                    kind,
                    base,
                    size,
                    index,
                });
                if let Mapping::Direct { base, ptr, size } = m {
                    memory.push(DirectWindow { base, size, ptr });
                }
            }
        }

        Ok(Self {
            peripherals,
            windows,
            memory,
            live_maps: HashMap::new(),
        })
    }

    fn window(&self, kind: RegionKind, address: u64, length: u64) -> Result<Window, IoError> {
        self.windows
            .iter()
            .find(|w| w.contains(kind, address, length))
            .copied()
            .ok_or_else(|| {
                log::warn!("Nothing decodes {kind:?} 0x{address:08x} ({length} bytes)");
                IoError::Unmapped
            })
    }

    /// Mappings handed out by `map` and not yet returned.
    pub fn live_maps(&self) -> usize {
        self.live_maps.len()
    }
}

impl Platform for Machine {
    fn read_unit(&mut self, kind: RegionKind, address: u64, width: u32) -> Result<u64, IoError> {
        let w = self.window(kind, address, u64::from(width))?;
        let p = &mut self.peripherals[w.index];
        p.unit_read(kind, w.base, address - w.base, width).map_err(|e| {
            log::error!("{}: read failed: {e}", p.name());
            IoError::Rejected
        })
    }

    fn write_unit(&mut self, kind: RegionKind, address: u64, width: u32, value: u64) -> Result<(), IoError> {
        let w = self.window(kind, address, u64::from(width))?;
        let p = &mut self.peripherals[w.index];
        p.unit_write(kind, w.base, address - w.base, width, value).map_err(|e| {
            log::error!("{}: write failed: {e}", p.name());
            IoError::Rejected
        })
    }

    fn map(&mut self, address: u64, length: usize) -> Result<NonNull<u8>, IoError> {
        let m = self
            .memory
            .iter()
            .find(|m| {
                address >= m.base
                    && address
                        .checked_add(length as u64)
                        .is_some_and(|end| end <= m.base + m.size)
            })
            .ok_or(IoError::Unmapped)?;

        // SAFETY: the offset is inside the peripheral's backing store, which
        // lives as long as the machine.
        let ptr = unsafe { m.ptr.add((address - m.base) as usize) };
        let ptr = NonNull::new(ptr).ok_or(IoError::Unmapped)?;
        self.live_maps.insert(ptr.as_ptr() as usize, length);
        Ok(ptr)
    }

    fn unmap(&mut self, ptr: NonNull<u8>, length: usize) {
        match self.live_maps.remove(&(ptr.as_ptr() as usize)) {
            Some(n) if n == length => (),
            Some(n) => log::warn!("Unmapping {length} bytes at {ptr:p}, mapped {n}"),
            None => log::warn!("Unmapping {ptr:p}, which is not mapped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peripherals::ec::EmbeddedController;
    use crate::peripherals::generic::Sram;

    fn machine() -> Machine {
        Machine::new(vec![
            Box::new(Sram::new(RegionKind::SystemMemory, 0x1000, 0x100, Some("RAM"))),
            Box::new(Sram::new(RegionKind::SystemIo, 0x80, 0x10, Some("PORTS"))),
            Box::new(EmbeddedController::new(0, None)),
        ])
        .unwrap()
    }

    #[test]
    fn routes_by_kind_and_address() {
        let mut m = machine();
        m.write_unit(RegionKind::SystemIo, 0x84, 2, 0xbeef).unwrap();
        assert_eq!(m.read_unit(RegionKind::SystemIo, 0x84, 2), Ok(0xbeef));
        assert_eq!(m.read_unit(RegionKind::SystemIo, 0x85, 1), Ok(0xbe));
        assert_eq!(m.read_unit(RegionKind::EmbeddedControl, 0x10, 1), Ok(0x2e));
        assert_eq!(m.read_unit(RegionKind::Cmos, 0x84, 1), Err(IoError::Unmapped));
        assert_eq!(m.read_unit(RegionKind::SystemIo, 0x8f, 2), Err(IoError::Unmapped));
    }

    #[test]
    fn peripheral_errors_become_rejections() {
        let mut m = machine();
        assert_eq!(m.read_unit(RegionKind::EmbeddedControl, 0x02, 1), Err(IoError::Rejected));
    }

    #[test]
    fn maps_only_direct_memory() {
        let mut m = machine();
        let ptr = m.map(0x1010, 8).unwrap();
        assert_eq!(m.live_maps(), 1);
        m.unmap(ptr, 8);
        assert_eq!(m.live_maps(), 0);

        assert_eq!(m.map(0x10f8, 16), Err(IoError::Unmapped));
        assert_eq!(m.map(0x84, 1), Err(IoError::Unmapped));
    }

    #[test]
    fn overlapping_windows_rejected() {
        let r = Machine::new(vec![
            Box::new(Sram::new(RegionKind::SystemIo, 0x80, 0x10, Some("A"))),
            Box::new(Sram::new(RegionKind::SystemIo, 0x88, 0x10, Some("B"))),
        ]);
        assert!(r.is_err());

        let r = Machine::new(vec![
            Box::new(Sram::new(RegionKind::SystemIo, 0x80, 0x10, Some("A"))),
            Box::new(Sram::new(RegionKind::Cmos, 0x80, 0x10, Some("B"))),
        ]);
        assert!(r.is_ok());
    }
}
