use std::collections::HashMap;

use fieldio::mask::low_bits;
use fieldio::{RegionKind, UnitAccess, ValueTransform};

use crate::config::{QuirkAction, QuirkConfig};

/// Per-unit value corrections keyed by region space and unit address.
#[derive(Debug, Default)]
pub struct QuirkTable {
    quirks: HashMap<(RegionKind, u64), (QuirkAction, u64)>,
}

impl QuirkTable {
    pub fn new(quirks: &[QuirkConfig]) -> Self {
        let quirks = quirks
            .iter()
            .map(|q| ((RegionKind::from(q.space), q.address), (q.action, q.amount)))
            .collect();
        Self { quirks }
    }

    fn lookup(&self, access: &UnitAccess) -> Option<(QuirkAction, u64)> {
        self.quirks.get(&(access.kind, access.address)).copied()
    }
}

impl ValueTransform for QuirkTable {
    fn transform_read(&mut self, access: &UnitAccess, value: u64) -> u64 {
        let field = low_bits(access.bit_length);
        let fixed = match self.lookup(access) {
            Some((QuirkAction::Invert, _)) => !value,
            Some((QuirkAction::Offset, amount)) => value.wrapping_add(amount),
            None => return value,
        } & field;
        log::debug!("Quirk at {:?} 0x{:x}: read {value:x} -> {fixed:x}", access.kind, access.address);
        fixed
    }

    fn transform_write(&mut self, access: &UnitAccess, value: u64) -> u64 {
        let field = low_bits(access.bit_length);
        let fixed = match self.lookup(access) {
            Some((QuirkAction::Invert, _)) => !value,
            Some((QuirkAction::Offset, amount)) => value.wrapping_sub(amount),
            None => return value,
        } & field;
        log::debug!("Quirk at {:?} 0x{:x}: write {value:x} -> {fixed:x}", access.kind, access.address);
        fixed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Space;

    fn access(address: u64, bit_length: u32) -> UnitAccess {
        UnitAccess {
            kind: RegionKind::EmbeddedControl,
            address,
            unit_size: 1,
            bit_offset: 0,
            bit_length,
        }
    }

    fn table() -> QuirkTable {
        QuirkTable::new(&[
            QuirkConfig {
                space: Space::EmbeddedControl,
                address: 0x10,
                action: QuirkAction::Offset,
                amount: 5,
            },
            QuirkConfig {
                space: Space::EmbeddedControl,
                address: 0x20,
                action: QuirkAction::Invert,
                amount: 0,
            },
        ])
    }

    #[test]
    fn offset_wraps_within_field() {
        let mut t = table();
        assert_eq!(t.transform_read(&access(0x10, 8), 0x2e), 0x33);
        assert_eq!(t.transform_read(&access(0x10, 8), 0xfe), 0x03);
        assert_eq!(t.transform_write(&access(0x10, 8), 0x33), 0x2e);
    }

    #[test]
    fn invert_is_limited_to_field() {
        let mut t = table();
        assert_eq!(t.transform_read(&access(0x20, 4), 0b0101), 0b1010);
        assert_eq!(t.transform_write(&access(0x20, 4), 0b0011), 0b1100);
    }

    #[test]
    fn other_units_pass_through() {
        let mut t = table();
        assert_eq!(t.transform_read(&access(0x11, 8), 0x2e), 0x2e);
        let mut io = access(0x10, 8);
        io.kind = RegionKind::SystemIo;
        assert_eq!(t.transform_write(&io, 0x2e), 0x2e);
    }
}
