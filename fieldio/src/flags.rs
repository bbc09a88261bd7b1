//! Field descriptors and decoding of the AML field flags byte

use crate::error::FieldError;

/// Unit the backing store has to be touched with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessGranularity {
    /// Smallest unit that holds the field.
    Any,
    Byte,
    Word,
    DWord,
    QWord,
}

impl AccessGranularity {
    /// Unit size in bytes for a field of `bit_length` bits.
    pub fn unit_size(self, bit_length: u32) -> u32 {
        match self {
            AccessGranularity::Any if bit_length <= 8 => 1,
            AccessGranularity::Any if bit_length <= 16 => 2,
            AccessGranularity::Any => 4,
            AccessGranularity::Byte => 1,
            AccessGranularity::Word => 2,
            AccessGranularity::DWord => 4,
            AccessGranularity::QWord => 8,
        }
    }

    /// Fixed granularity matching a unit size.
    pub fn from_unit_size(unit_size: u32) -> Self {
        match unit_size {
            1 => AccessGranularity::Byte,
            2 => AccessGranularity::Word,
            8 => AccessGranularity::QWord,
            _ => AccessGranularity::DWord,
        }
    }
}

impl TryFrom<u8> for AccessGranularity {
    type Error = FieldError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AccessGranularity::Any),
            1 => Ok(AccessGranularity::Byte),
            2 => Ok(AccessGranularity::Word),
            3 => Ok(AccessGranularity::DWord),
            4 => Ok(AccessGranularity::QWord),
            _ => Err(FieldError::InvalidAccessType(value)),
        }
    }
}

/// What the bits of an access unit outside the field become on a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateRule {
    Preserve,
    WriteAsOnes,
    WriteAsZeros,
}

impl TryFrom<u8> for UpdateRule {
    type Error = FieldError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(UpdateRule::Preserve),
            1 => Ok(UpdateRule::WriteAsOnes),
            2 => Ok(UpdateRule::WriteAsZeros),
            _ => Err(FieldError::InvalidUpdateRule(value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockRule {
    NoLock,
    Lock,
}

/// Raw field flags as encoded in the bytecode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldFlags(pub u8);

impl FieldFlags {
    pub fn access_type(self) -> Result<AccessGranularity, FieldError> {
        AccessGranularity::try_from(self.0 & 0x0f)
    }

    pub fn lock_rule(self) -> LockRule {
        if self.0 & 0x10 != 0 {
            LockRule::Lock
        } else {
            LockRule::NoLock
        }
    }

    pub fn update_rule(self) -> Result<UpdateRule, FieldError> {
        UpdateRule::try_from((self.0 >> 5) & 0x03)
    }
}

/// A logical bit-field.
///
/// `bit_offset` counts from the start of the region or buffer the field is
/// resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub bit_offset: u32,
    pub bit_length: u32,
    pub granularity: AccessGranularity,
    pub update_rule: UpdateRule,
}

impl FieldSpec {
    pub fn new(
        bit_offset: u32,
        bit_length: u32,
        granularity: AccessGranularity,
        update_rule: UpdateRule,
    ) -> Self {
        Self {
            bit_offset,
            bit_length,
            granularity,
            update_rule,
        }
    }

    pub fn from_flags(bit_offset: u32, bit_length: u32, flags: FieldFlags) -> Result<Self, FieldError> {
        Ok(Self {
            bit_offset,
            bit_length,
            granularity: flags.access_type()?,
            update_rule: flags.update_rule()?,
        })
    }

    pub(crate) fn check_length(&self) -> Result<(), FieldError> {
        match self.bit_length {
            0 => Err(FieldError::ZeroLength),
            1..=64 => Ok(()),
            n => Err(FieldError::TooWide(n)),
        }
    }

    /// Number of bytes from the byte holding the first bit up to and
    /// including the byte holding the last bit.
    pub fn byte_span(&self) -> u64 {
        let first = u64::from(self.bit_offset) / 8;
        let end = u64::from(self.bit_offset) + u64::from(self.bit_length);
        end.div_ceil(8) - first
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_flags() {
        let flags = FieldFlags(0x01 | 0x10 | (2 << 5));
        assert_eq!(flags.access_type(), Ok(AccessGranularity::Byte));
        assert_eq!(flags.lock_rule(), LockRule::Lock);
        assert_eq!(flags.update_rule(), Ok(UpdateRule::WriteAsZeros));
    }

    #[test]
    fn reject_illegal_update_rule() {
        let flags = FieldFlags(0x03 | (3 << 5));
        assert_eq!(flags.update_rule(), Err(FieldError::InvalidUpdateRule(3)));
        assert_eq!(
            FieldSpec::from_flags(0, 8, flags),
            Err(FieldError::InvalidUpdateRule(3))
        );
    }

    #[test]
    fn reject_buffer_access() {
        assert_eq!(
            FieldFlags(0x05).access_type(),
            Err(FieldError::InvalidAccessType(5))
        );
    }

    #[test]
    fn unit_sizes() {
        assert_eq!(AccessGranularity::Any.unit_size(1), 1);
        assert_eq!(AccessGranularity::Any.unit_size(9), 2);
        assert_eq!(AccessGranularity::Any.unit_size(17), 4);
        assert_eq!(AccessGranularity::Any.unit_size(40), 4);
        assert_eq!(AccessGranularity::Byte.unit_size(32), 1);
        assert_eq!(AccessGranularity::QWord.unit_size(3), 8);
    }

    #[test]
    fn byte_span_counts_straddled_bytes() {
        let spec = FieldSpec::new(6, 12, AccessGranularity::Any, UpdateRule::Preserve);
        assert_eq!(spec.byte_span(), 3);
        let spec = FieldSpec::new(4, 12, AccessGranularity::Any, UpdateRule::Preserve);
        assert_eq!(spec.byte_span(), 2);
    }
}
