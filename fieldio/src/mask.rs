//! Access-unit bitmasks

use crate::flags::AccessGranularity;

/// `bits` low-order ones; saturates at 64.
pub fn low_bits(bits: u32) -> u64 {
    match bits {
        0 => 0,
        1..=63 => (1u64 << bits) - 1,
        _ => u64::MAX,
    }
}

pub(crate) fn shl(value: u64, bits: u32) -> u64 {
    value.checked_shl(bits).unwrap_or(0)
}

pub(crate) fn shr(value: u64, bits: u32) -> u64 {
    value.checked_shr(bits).unwrap_or(0)
}

/// Mask of the bits of one access unit that the access may touch.
///
/// Fixed granularities always yield the full unit width, however few of
/// those bits the field uses. Fields of exactly 16, 32 or 64 bits always get
/// a mask at least that wide.
pub fn compute_mask(granularity: AccessGranularity, bit_length: u32) -> u64 {
    let mask = match granularity {
        AccessGranularity::Any if bit_length <= 8 => 0x0000_00ff,
        AccessGranularity::Any if bit_length <= 16 => 0x0000_ffff,
        AccessGranularity::Any => 0xffff_ffff,
        AccessGranularity::Byte => 0x0000_00ff,
        AccessGranularity::Word => 0x0000_ffff,
        AccessGranularity::DWord => 0xffff_ffff,
        AccessGranularity::QWord => u64::MAX,
    };

    match bit_length {
        16 => mask | 0x0000_ffff,
        32 => mask | 0xffff_ffff,
        64 => u64::MAX,
        _ => mask,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [AccessGranularity; 5] = [
        AccessGranularity::Any,
        AccessGranularity::Byte,
        AccessGranularity::Word,
        AccessGranularity::DWord,
        AccessGranularity::QWord,
    ];

    #[test]
    fn any_follows_field_size() {
        assert_eq!(compute_mask(AccessGranularity::Any, 1), 0xff);
        assert_eq!(compute_mask(AccessGranularity::Any, 8), 0xff);
        assert_eq!(compute_mask(AccessGranularity::Any, 9), 0xffff);
        assert_eq!(compute_mask(AccessGranularity::Any, 17), 0xffff_ffff);
        assert_eq!(compute_mask(AccessGranularity::Any, 48), 0xffff_ffff);
    }

    #[test]
    fn fixed_granularity_ignores_field_size() {
        assert_eq!(compute_mask(AccessGranularity::Byte, 1), 0xff);
        assert_eq!(compute_mask(AccessGranularity::Word, 3), 0xffff);
        assert_eq!(compute_mask(AccessGranularity::DWord, 2), 0xffff_ffff);
        assert_eq!(compute_mask(AccessGranularity::QWord, 5), u64::MAX);
    }

    #[test]
    fn exact_widths_widen() {
        assert_eq!(compute_mask(AccessGranularity::Byte, 16), 0xffff);
        assert_eq!(compute_mask(AccessGranularity::Byte, 32), 0xffff_ffff);
        assert_eq!(compute_mask(AccessGranularity::Word, 32), 0xffff_ffff);
        assert_eq!(compute_mask(AccessGranularity::Any, 64), u64::MAX);
    }

    #[test]
    fn width_is_a_power_of_two_of_bytes() {
        for g in ALL {
            for len in 1..=64 {
                let width = 64 - compute_mask(g, len).leading_zeros();
                assert!(
                    matches!(width, 8 | 16 | 32 | 64),
                    "{g:?}/{len}: {width}"
                );
                assert_eq!(compute_mask(g, len).count_ones(), width);
            }
        }
    }

    #[test]
    fn shifts_saturate() {
        assert_eq!(low_bits(64), u64::MAX);
        assert_eq!(low_bits(12), 0xfff);
        assert_eq!(shl(1, 64), 0);
        assert_eq!(shr(u64::MAX, 64), 0);
    }
}
