pub mod ec;
pub mod generic;
pub mod pci;

use fieldio::RegionKind;

#[derive(Debug, Clone)]
pub enum Mapping {
    /// Register-level decoding through `unit_read`/`unit_write`.
    Decoded {
        kind: RegionKind,
        base: u64,
        size: u64,
    },
    /// Plain system memory, handed out directly by `Platform::map`.
    Direct { base: u64, ptr: *mut u8, size: u64 },
}

pub trait Peripheral {
    fn name(&self) -> &str;

    /// Power-on state.
    fn reset(&mut self) {}

    fn mappings(&mut self) -> Vec<Mapping>;

    fn unit_read(&mut self, _kind: RegionKind, _base: u64, _offset: u64, _width: u32) -> Result<u64, String> {
        Err(String::from("not implemented"))
    }

    fn unit_write(
        &mut self,
        _kind: RegionKind,
        _base: u64,
        _offset: u64,
        _width: u32,
        _value: u64,
    ) -> Result<(), String> {
        Err(String::from("not implemented"))
    }
}

#[derive(Debug)]
pub struct Register {
    pub name: &'static str,
    pub value: u64,
    pub read_only: bool,
}

/// A bank of equally wide registers, usually derived with `RegBlock`.
///
/// Accesses may be narrower than a register or straddle two of them; they are
/// assembled byte by byte, little-endian.
pub trait RegisterBlock {
    fn width(&self) -> u32;

    fn get(&self, offset: u64) -> Option<&Register>;

    fn get_mut(&mut self, offset: u64) -> Option<&mut Register>;

    fn read_registers(&self, offset: u64, size: u32) -> Result<u64, String> {
        let width = u64::from(self.width());
        let mut value = 0;
        for i in 0..u64::from(size) {
            let at = offset + i;
            let reg = self
                .get(at)
                .ok_or_else(|| format!("No register at 0x{at:04x}"))?;
            let byte = (reg.value >> (8 * (at % width))) & 0xff;
            value |= byte << (8 * i);
        }
        Ok(value)
    }

    fn write_registers(&mut self, offset: u64, size: u32, value: u64) -> Result<(), String> {
        let width = u64::from(self.width());
        for i in 0..u64::from(size) {
            let at = offset + i;
            let reg = self
                .get_mut(at)
                .ok_or_else(|| format!("No register at 0x{at:04x}"))?;
            if reg.read_only {
                log::debug!("Ignoring write to read-only {}", reg.name);
                continue;
            }
            let shift = 8 * (at % width);
            let byte = (value >> (8 * i)) & 0xff;
            reg.value = (reg.value & !(0xff << shift)) | (byte << shift);
        }
        Ok(())
    }
}
