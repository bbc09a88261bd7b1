use regionsim_macros::RegBlock;

use super::*;

#[derive(Debug, RegBlock)]
#[width(1)]
pub struct EcRegisters {
    #[reset(0x12)]
    #[read_only]
    revision: Register,
    control: Register,

    #[offset(0x10)]
    #[reset(0x2e)]
    temperature: Register,
    fan_low: Register,
    fan_high: Register,

    #[offset(0x20)]
    #[reset(0x01)]
    battery_state: Register,
    battery_rate_low: Register,
    battery_rate_high: Register,
    battery_capacity: Register,
}

/// Embedded controller RAM as seen through an EmbeddedControl region.
pub struct EmbeddedController {
    name: String,
    base: u64,
    regs: EcRegisters,
}

impl EmbeddedController {
    pub fn new(base: u64, name: Option<&str>) -> Self {
        Self {
            name: name.unwrap_or("EC").to_string(),
            base,
            regs: EcRegisters::new(),
        }
    }
}

impl Peripheral for EmbeddedController {
    fn name(&self) -> &str {
        &self.name
    }

    fn reset(&mut self) {
        self.regs.reset();
    }

    fn mappings(&mut self) -> Vec<Mapping> {
        vec![Mapping::Decoded {
            kind: RegionKind::EmbeddedControl,
            base: self.base,
            size: 0x100,
        }]
    }

    fn unit_read(&mut self, _kind: RegionKind, _base: u64, offset: u64, width: u32) -> Result<u64, String> {
        self.regs.read_registers(offset, width)
    }

    fn unit_write(&mut self, _kind: RegionKind, _base: u64, offset: u64, width: u32, value: u64) -> Result<(), String> {
        self.regs.write_registers(offset, width, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_follow_declared_offsets() {
        let mut ec = EmbeddedController::new(0, None);
        let ec_kind = RegionKind::EmbeddedControl;
        assert_eq!(ec.unit_read(ec_kind, 0, 0x00, 1), Ok(0x12));
        assert_eq!(ec.unit_read(ec_kind, 0, 0x10, 1), Ok(0x2e));
        assert_eq!(ec.unit_read(ec_kind, 0, 0x21, 2), Ok(0));
        assert!(ec.unit_read(ec_kind, 0, 0x02, 1).is_err());
    }

    #[test]
    fn wide_access_spans_byte_registers() {
        let mut ec = EmbeddedController::new(0, None);
        let ec_kind = RegionKind::EmbeddedControl;
        ec.unit_write(ec_kind, 0, 0x11, 2, 0x0bb8).unwrap();
        assert_eq!(ec.regs.fan_low.value, 0xb8);
        assert_eq!(ec.regs.fan_high.value, 0x0b);
        assert_eq!(ec.unit_read(ec_kind, 0, 0x10, 4), Err(String::from("No register at 0x0013")));
        assert_eq!(ec.unit_read(ec_kind, 0, 0x20, 4), Ok(0x0000_0001));
    }

    #[test]
    fn read_only_and_reset() {
        let mut ec = EmbeddedController::new(0, None);
        let ec_kind = RegionKind::EmbeddedControl;
        ec.unit_write(ec_kind, 0, 0x00, 1, 0xff).unwrap();
        ec.unit_write(ec_kind, 0, 0x10, 1, 0x40).unwrap();
        assert_eq!(ec.unit_read(ec_kind, 0, 0x00, 1), Ok(0x12));
        ec.reset();
        assert_eq!(ec.unit_read(ec_kind, 0, 0x10, 1), Ok(0x2e));
    }
}
