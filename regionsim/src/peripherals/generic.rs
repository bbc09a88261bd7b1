use byteorder::{ByteOrder, LittleEndian};
use fieldio::RegionKind;

use super::*;

/// Byte-addressable memory, placed in any region space.
pub struct Sram {
    name: String,
    kind: RegionKind,
    base: u64,
    data: Box<[u8]>,
}

impl Sram {
    pub fn new(kind: RegionKind, base: u64, size: u64, name: Option<&str>) -> Self {
        let name = name.unwrap_or("SRAM").to_string();
        let data = vec![0; size as usize].into_boxed_slice();
        Self {
            name,
            kind,
            base,
            data,
        }
    }

    /// Copies `bytes` in at `offset`.
    pub fn preload(&mut self, offset: u64, bytes: &[u8]) -> Result<(), String> {
        let start = offset as usize;
        let end = start
            .checked_add(bytes.len())
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| format!("{}: preload of {} bytes at 0x{offset:x} does not fit", self.name, bytes.len()))?;
        self.data[start..end].copy_from_slice(bytes);
        Ok(())
    }

    fn unit(&mut self, offset: u64, width: u32) -> Result<&mut [u8], String> {
        if !matches!(width, 1 | 2 | 4 | 8) {
            return Err(format!("{}: unsupported access width {width}", self.name));
        }
        let start = offset as usize;
        self.data
            .get_mut(start..start + width as usize)
            .ok_or_else(|| format!("{width}-byte access at 0x{offset:x} past end of {}", self.name))
    }
}

impl Peripheral for Sram {
    fn name(&self) -> &str {
        &self.name
    }

    fn mappings(&mut self) -> Vec<Mapping> {
        let mm = match self.kind {
            RegionKind::SystemMemory => Mapping::Direct {
                base: self.base,
                ptr: self.data.as_mut_ptr(),
                size: self.data.len() as u64,
            },
            kind => Mapping::Decoded {
                kind,
                base: self.base,
                size: self.data.len() as u64,
            },
        };
        vec![mm]
    }

    fn unit_read(&mut self, _kind: RegionKind, _base: u64, offset: u64, width: u32) -> Result<u64, String> {
        let bytes = self.unit(offset, width)?;
        Ok(LittleEndian::read_uint(bytes, bytes.len()))
    }

    fn unit_write(&mut self, _kind: RegionKind, _base: u64, offset: u64, width: u32, value: u64) -> Result<(), String> {
        let bytes = self.unit(offset, width)?;
        let n = bytes.len();
        let value = match n {
            8 => value,
            _ => value & ((1 << (8 * n)) - 1),
        };
        LittleEndian::write_uint(bytes, value, n);
        Ok(())
    }
}
