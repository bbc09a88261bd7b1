//! Field reads and writes against region spaces
//!
//! A field is moved through its region one access unit at a time. Fields that
//! cross a unit boundary are split; a failure part way through a write leaves
//! the units already written in place.

use crate::adjust::{extract_field, merge_field};
use crate::error::{FieldError, RegionError};
use crate::flags::{AccessGranularity, FieldSpec, UpdateRule};
use crate::mask::{low_bits, shl, shr};
use crate::quirk::{UnitAccess, ValueTransform};
use crate::region::{
    Namespace, OpRegion, PciConfig, Platform, PortSpace, RegionHandle, RegionKind, RegionSpace,
    SystemMemory,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// Moves the part of a field that lives in one access unit.
pub fn io_one_unit<S, T>(
    space: &mut S,
    hook: &mut T,
    handle: &RegionHandle,
    rule: UpdateRule,
    access: &UnitAccess,
    direction: Direction,
    value: &mut u64,
) -> Result<(), RegionError>
where
    S: RegionSpace + ?Sized,
    T: ValueTransform + ?Sized,
{
    let granularity = AccessGranularity::from_unit_size(handle.unit_size);

    let raw = if direction == Direction::Read || rule != UpdateRule::WriteAsZeros {
        space.read_unit(handle, access.address)?
    } else {
        0
    };

    match direction {
        Direction::Read => {
            let field = extract_field(granularity, access.bit_offset, access.bit_length, raw);
            *value = hook.transform_read(access, field);
            log::trace!(
                "[{:?}:0x{:x}+{}:{}] {:x} -> {:x}",
                access.kind,
                access.address,
                access.bit_offset,
                access.bit_length,
                raw,
                *value
            );
        }
        Direction::Write => {
            let field = hook.transform_write(access, *value);
            let unit = merge_field(
                granularity,
                rule,
                access.bit_offset,
                access.bit_length,
                raw,
                field,
            );
            log::trace!(
                "[{:?}:0x{:x}+{}:{}] {:x} <- {:x}",
                access.kind,
                access.address,
                access.bit_offset,
                access.bit_length,
                unit,
                field
            );
            space.write_unit(handle, access.address, unit)?;
        }
    }
    Ok(())
}

/// Moves a whole field, splitting it over as many units as it touches.
pub fn io_field<S, T>(
    space: &mut S,
    hook: &mut T,
    handle: &RegionHandle,
    spec: &FieldSpec,
    direction: Direction,
    value: &mut u64,
) -> Result<(), RegionError>
where
    S: RegionSpace + ?Sized,
    T: ValueTransform + ?Sized,
{
    let unit_bits = handle.unit_size * 8;
    let mut offset = spec.bit_offset % unit_bits;
    let mut address = handle.aligned_address;
    let mut done = 0;
    let mut acc = 0;

    while done < spec.bit_length {
        let chunk = (unit_bits - offset).min(spec.bit_length - done);
        let access = UnitAccess {
            kind: handle.kind,
            address,
            unit_size: handle.unit_size,
            bit_offset: offset,
            bit_length: chunk,
        };

        let mut part = match direction {
            Direction::Read => 0,
            Direction::Write => shr(*value, done) & low_bits(chunk),
        };
        io_one_unit(space, hook, handle, spec.update_rule, &access, direction, &mut part)?;
        if direction == Direction::Read {
            acc |= shl(part & low_bits(chunk), done);
        }

        done += chunk;
        offset = 0;
        address += u64::from(handle.unit_size);
    }

    if direction == Direction::Read {
        *value = acc;
    }
    Ok(())
}

fn access<S, T>(
    space: &mut S,
    scope: &dyn Namespace,
    hook: &mut T,
    region: &OpRegion,
    spec: &FieldSpec,
    direction: Direction,
    value: &mut u64,
) -> Result<(), FieldError>
where
    S: RegionSpace + ?Sized,
    T: ValueTransform + ?Sized,
{
    spec.check_length()?;
    let handle = RegionHandle::open(space, scope, region, spec)?;
    let result = io_field(space, hook, &handle, spec, direction, value);
    handle.close(space);
    Ok(result?)
}

fn dispatch<P, T>(
    platform: &mut P,
    scope: &dyn Namespace,
    hook: &mut T,
    region: &OpRegion,
    spec: &FieldSpec,
    direction: Direction,
    value: &mut u64,
) -> Result<(), FieldError>
where
    P: Platform + ?Sized,
    T: ValueTransform + ?Sized,
{
    match region.kind {
        RegionKind::SystemMemory => access(
            &mut SystemMemory::new(platform),
            scope,
            hook,
            region,
            spec,
            direction,
            value,
        ),
        RegionKind::PciConfig => access(
            &mut PciConfig::new(platform),
            scope,
            hook,
            region,
            spec,
            direction,
            value,
        ),
        kind => access(
            &mut PortSpace::new(kind, platform),
            scope,
            hook,
            region,
            spec,
            direction,
            value,
        ),
    }
}

/// Reads a field declared in `region`; `scope` is the namespace scope that
/// encloses the region declaration.
pub fn region_field_read<P, T>(
    platform: &mut P,
    scope: &dyn Namespace,
    hook: &mut T,
    region: &OpRegion,
    spec: &FieldSpec,
) -> Result<u64, FieldError>
where
    P: Platform + ?Sized,
    T: ValueTransform + ?Sized,
{
    let mut value = 0;
    dispatch(platform, scope, hook, region, spec, Direction::Read, &mut value)?;
    Ok(value)
}

/// Writes a field declared in `region`. Partial writes are possible on error.
pub fn region_field_write<P, T>(
    platform: &mut P,
    scope: &dyn Namespace,
    hook: &mut T,
    region: &OpRegion,
    spec: &FieldSpec,
    value: u64,
) -> Result<(), FieldError>
where
    P: Platform + ?Sized,
    T: ValueTransform + ?Sized,
{
    let mut value = value;
    dispatch(platform, scope, hook, region, spec, Direction::Write, &mut value)
}
