use fieldio::region::PciAddress;
use regionsim_macros::RegBlock;

use super::*;

/// Type 0 configuration header, first 0x40 bytes.
#[derive(Debug, RegBlock)]
#[width(4)]
pub struct PciHeader {
    #[read_only]
    id: Register,
    command_status: Register,
    #[read_only]
    class_revision: Register,
    misc: Register,
    bar0: Register,
    bar1: Register,
    bar2: Register,
    bar3: Register,
    bar4: Register,
    bar5: Register,
    #[read_only]
    cardbus_cis: Register,
    #[read_only]
    subsystem: Register,
    rom_base: Register,
    #[read_only]
    capabilities: Register,
    reserved: Register,
    interrupt: Register,
}

/// One PCI function, decoded at its ECAM window.
pub struct PciFunction {
    name: String,
    address: PciAddress,
    vendor: u16,
    device: u16,
    class: u32,
    header: PciHeader,
}

impl PciFunction {
    pub fn new(address: PciAddress, vendor: u16, device: u16, class: u32, name: Option<&str>) -> Self {
        let mut f = Self {
            name: name.unwrap_or("PCI").to_string(),
            address,
            vendor,
            device,
            class,
            header: PciHeader::new(),
        };
        f.reset();
        f
    }
}

impl Peripheral for PciFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn reset(&mut self) {
        self.header.reset();
        self.header.id.value = (u64::from(self.device) << 16) | u64::from(self.vendor);
        self.header.class_revision.value = u64::from(self.class) << 8;
    }

    fn mappings(&mut self) -> Vec<Mapping> {
        vec![Mapping::Decoded {
            kind: RegionKind::PciConfig,
            base: self.address.ecam(0),
            size: 0x1000,
        }]
    }

    fn unit_read(&mut self, _kind: RegionKind, _base: u64, offset: u64, width: u32) -> Result<u64, String> {
        match self.header.read_registers(offset, width) {
            // Unimplemented config space reads as ones.
            Err(_) if offset >= 0x40 => Ok(match width {
                8 => u64::MAX,
                w => (1 << (8 * w)) - 1,
            }),
            r => r,
        }
    }

    fn unit_write(&mut self, _kind: RegionKind, _base: u64, offset: u64, width: u32, value: u64) -> Result<(), String> {
        if offset >= 0x40 {
            log::debug!("{}: dropping write to 0x{offset:03x}", self.name);
            return Ok(());
        }
        self.header.write_registers(offset, width, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function() -> PciFunction {
        PciFunction::new(PciAddress::from_adr(0, 0x0003_0000), 0x8086, 0x1234, 0x0c0330, None)
    }

    #[test]
    fn header_identity() {
        let mut f = function();
        let kind = RegionKind::PciConfig;
        assert_eq!(f.unit_read(kind, 0, 0, 4), Ok(0x1234_8086));
        assert_eq!(f.unit_read(kind, 0, 2, 2), Ok(0x1234));
        assert_eq!(f.unit_read(kind, 0, 0x0b, 1), Ok(0x0c));
        assert_eq!(f.unit_read(kind, 0, 0x100, 2), Ok(0xffff));
    }

    #[test]
    fn narrow_writes_merge_into_register() {
        let mut f = function();
        let kind = RegionKind::PciConfig;
        f.unit_write(kind, 0, 0x3c, 1, 0x0b).unwrap();
        f.unit_write(kind, 0, 0x3d, 1, 0x01).unwrap();
        assert_eq!(f.unit_read(kind, 0, 0x3c, 4), Ok(0x010b));

        f.unit_write(kind, 0, 0x00, 2, 0xffff).unwrap();
        assert_eq!(f.unit_read(kind, 0, 0, 2), Ok(0x8086));
    }

    #[test]
    fn mapped_at_ecam_window() {
        let mut f = function();
        match f.mappings().as_slice() {
            [Mapping::Decoded { kind, base, size }] => {
                assert_eq!(*kind, RegionKind::PciConfig);
                assert_eq!(*base, 3 << 15);
                assert_eq!(*size, 0x1000);
            }
            m => panic!("unexpected mappings {m:?}"),
        }
    }
}
