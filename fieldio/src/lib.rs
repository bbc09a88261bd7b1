#![no_std]

pub mod adjust;
pub mod buffer;
pub mod error;
pub mod flags;
pub mod io;
pub mod mask;
pub mod quirk;
pub mod region;

pub use adjust::{extract_field, merge_field};
pub use buffer::{BufferField, buffer_field_read, buffer_field_write};
pub use error::{FieldError, IoError, RegionError};
pub use flags::{AccessGranularity, FieldFlags, FieldSpec, LockRule, UpdateRule};
pub use io::{region_field_read, region_field_write};
pub use mask::compute_mask;
pub use quirk::{Passthrough, UnitAccess, ValueTransform};
pub use region::{Namespace, OpRegion, Platform, RegionKind, Value};
