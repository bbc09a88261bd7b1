//! Extracting a field from, and merging it into, a raw access unit

use crate::flags::{AccessGranularity, UpdateRule};
use crate::mask::{compute_mask, low_bits, shl, shr};

/// Field value held in `raw`, right-aligned.
pub fn extract_field(granularity: AccessGranularity, bit_offset: u32, bit_length: u32, raw: u64) -> u64 {
    let mask = compute_mask(granularity, bit_length);
    shr(raw, bit_offset) & !shl(mask, bit_length) & mask
}

/// New unit value with `value` stored in the field and the other bits of the
/// unit set according to `rule`.
///
/// Bits above the access mask are always cleared.
pub fn merge_field(
    granularity: AccessGranularity,
    rule: UpdateRule,
    bit_offset: u32,
    bit_length: u32,
    raw: u64,
    value: u64,
) -> u64 {
    let mask = compute_mask(granularity, bit_length);
    let span = shl(low_bits(bit_length), bit_offset);

    let rest = match rule {
        UpdateRule::Preserve => raw & !span & mask,
        UpdateRule::WriteAsOnes => !span & mask,
        UpdateRule::WriteAsZeros => 0,
    };

    rest | (shl(value & low_bits(bit_length), bit_offset) & mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_in_byte() {
        assert_eq!(extract_field(AccessGranularity::Byte, 2, 3, 0b1011_0100), 0b101);
        assert_eq!(extract_field(AccessGranularity::Byte, 0, 8, 0x1a5), 0xa5);
    }

    #[test]
    fn extract_full_dword() {
        assert_eq!(
            extract_field(AccessGranularity::Any, 0, 32, 0x1_dead_beef),
            0xdead_beef
        );
    }

    #[test]
    fn extract_qword() {
        assert_eq!(
            extract_field(AccessGranularity::QWord, 4, 60, 0x1234_5678_9abc_def0),
            0x0123_4567_89ab_cdef
        );
    }

    #[test]
    fn merge_preserve_keeps_neighbours() {
        let v = merge_field(AccessGranularity::Word, UpdateRule::Preserve, 4, 8, 0xf00f, 0xab);
        assert_eq!(v, 0xfabf);
    }

    #[test]
    fn merge_write_as_ones() {
        let v = merge_field(AccessGranularity::Byte, UpdateRule::WriteAsOnes, 2, 3, 0x00, 0b010);
        assert_eq!(v, 0b1110_1011);
    }

    #[test]
    fn merge_write_as_zeros() {
        let v = merge_field(AccessGranularity::Byte, UpdateRule::WriteAsZeros, 2, 3, 0xff, 0b111);
        assert_eq!(v, 0b0001_1100);
    }

    #[test]
    fn merge_drops_excess_value_bits() {
        let v = merge_field(AccessGranularity::Byte, UpdateRule::Preserve, 0, 4, 0xa0, 0xff);
        assert_eq!(v, 0xaf);
    }

    #[test]
    fn merge_clears_bits_above_mask() {
        let v = merge_field(AccessGranularity::Byte, UpdateRule::Preserve, 0, 4, 0xff00, 0x3);
        assert_eq!(v, 0x03);
    }

    #[test]
    fn merge_then_extract() {
        for rule in [UpdateRule::Preserve, UpdateRule::WriteAsOnes, UpdateRule::WriteAsZeros] {
            let unit = merge_field(AccessGranularity::DWord, rule, 7, 13, 0x5555_5555, 0x1abc);
            assert_eq!(extract_field(AccessGranularity::DWord, 7, 13, unit), 0x1abc);
        }
    }
}
