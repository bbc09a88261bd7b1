//! Fields backed by a caller-owned byte buffer

use core::ops::Range;

use byteorder::{ByteOrder, LittleEndian};

use crate::adjust::{extract_field, merge_field};
use crate::error::FieldError;
use crate::flags::{AccessGranularity, UpdateRule};
use crate::mask::low_bits;

/// Bytes touched by the field, checked against the buffer.
fn locate(limit: usize, bit_offset: u32, bit_length: u32) -> Result<Range<usize>, FieldError> {
    match bit_length {
        0 => return Err(FieldError::ZeroLength),
        n if n > 64 => return Err(FieldError::TooWide(n)),
        _ => (),
    }

    let start = (bit_offset / 8) as usize;
    let span = (bit_offset % 8 + bit_length).div_ceil(8) as usize;

    match start.checked_add(span) {
        Some(end) if end <= limit => Ok(start..end),
        _ => Err(FieldError::OutOfBounds {
            bit_offset,
            bit_length,
            limit: limit as u64,
        }),
    }
}

/// Width of the single load/store that covers the field, if one does.
fn single_unit(bit_offset: u32, bit_length: u32) -> Option<usize> {
    let bytes = match bit_length {
        1..=8 => 1,
        16 => 2,
        32 => 4,
        _ => return None,
    };
    (bit_offset % 8 + bit_length <= 8 * bytes).then_some(bytes as usize)
}

fn load(bytes: &[u8]) -> u64 {
    match bytes.len() {
        1 => u64::from(bytes[0]),
        2 => u64::from(LittleEndian::read_u16(bytes)),
        _ => u64::from(LittleEndian::read_u32(bytes)),
    }
}

fn store(bytes: &mut [u8], value: u64) {
    match bytes.len() {
        1 => bytes[0] = value as u8,
        2 => LittleEndian::write_u16(bytes, value as u16),
        _ => LittleEndian::write_u32(bytes, value as u32),
    }
}

pub fn buffer_field_read(buffer: &[u8], bit_offset: u32, bit_length: u32) -> Result<u64, FieldError> {
    let range = locate(buffer.len(), bit_offset, bit_length)?;
    let offset_low = bit_offset % 8;
    let bytes = &buffer[range];

    if let Some(width) = single_unit(bit_offset, bit_length) {
        let raw = load(&bytes[..width]);
        return Ok(extract_field(AccessGranularity::Byte, offset_low, bit_length, raw));
    }

    let offset_high = (offset_low + bit_length) % 8;
    let mask_low = 0xffu8 << offset_low;
    let mask_high = match offset_high {
        0 => 0xff,
        n => 0xffu8 >> (8 - n),
    };

    let last = bytes.len() - 1;
    let mut acc = 0u128;
    for (i, byte) in bytes.iter().enumerate() {
        let mut b = *byte;
        if i == 0 {
            b &= mask_low;
        }
        if i == last {
            b &= mask_high;
        }
        acc |= u128::from(b) << (8 * i);
    }

    Ok((acc >> offset_low) as u64 & low_bits(bit_length))
}

/// Stores `value` in the field. Bits of the touched bytes outside the field
/// keep their value; bytes outside the field are not touched.
pub fn buffer_field_write(
    buffer: &mut [u8],
    bit_offset: u32,
    bit_length: u32,
    value: u64,
) -> Result<(), FieldError> {
    let range = locate(buffer.len(), bit_offset, bit_length)?;
    let offset_low = bit_offset % 8;
    let bytes = &mut buffer[range];

    if let Some(width) = single_unit(bit_offset, bit_length) {
        let unit = &mut bytes[..width];
        let merged = merge_field(
            AccessGranularity::Byte,
            UpdateRule::Preserve,
            offset_low,
            bit_length,
            load(unit),
            value,
        );
        store(unit, merged);
        return Ok(());
    }

    let mut pending = value & low_bits(bit_length);
    let mut left = bit_length;
    for (i, byte) in bytes.iter_mut().enumerate() {
        let shift = if i == 0 { offset_low } else { 0 };
        let take = (8 - shift).min(left);
        let field_bits = (low_bits(take) << shift) as u8;

        *byte = (*byte & !field_bits) | ((pending << shift) as u8 & field_bits);

        pending >>= take;
        left -= take;
    }

    Ok(())
}

/// A field over a borrowed buffer, with offsets relative to its start.
pub struct BufferField<'a> {
    origin: &'a mut [u8],
    bit_offset: u32,
    bit_length: u32,
}

impl<'a> BufferField<'a> {
    pub fn new(origin: &'a mut [u8], bit_offset: u32, bit_length: u32) -> Result<Self, FieldError> {
        locate(origin.len(), bit_offset, bit_length)?;
        Ok(Self {
            origin,
            bit_offset,
            bit_length,
        })
    }

    pub fn read(&self) -> Result<u64, FieldError> {
        buffer_field_read(self.origin, self.bit_offset, self.bit_length)
    }

    pub fn write(&mut self, value: u64) -> Result<(), FieldError> {
        buffer_field_write(self.origin, self.bit_offset, self.bit_length, value)
    }
}
