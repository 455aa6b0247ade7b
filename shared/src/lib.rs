//! Shared types for the work-group kernels and their host-side drivers
#![cfg_attr(not(test), no_std)]

pub mod element;
pub mod params;

pub use element::{CombineOp, DeviceElement, ElementKind};
pub use params::{
    BitonicParams, RadixParams, ReduceParams, ScanMode, ScanParams, TransposeParams,
};

use core::fmt::{self, Display};
use glam::UVec2;

/// Default work-group width for the 1-D kernels
pub const WORKGROUP_SIZE: u32 = 256;
/// Default tile edge for the 2-D transpose kernel
pub const TILE_SIZE: u32 = 16;
/// Default number of key bits consumed per radix pass
pub const RADIX_BITS: u32 = 2;
/// Widest supported radix digit; the count buffer grows as `n << RADIX_BITS`
pub const MAX_RADIX_BITS: u32 = 8;
/// Bit width of the radix sort keys
pub const KEY_BITS: u32 = u32::BITS;

#[inline]
pub const fn div_ceil_u32(n: u32, d: u32) -> u32 {
    // Precondition: d > 0
    n / d + ((n % d) != 0) as u32
}

/// Smallest multiple of `d` that is `>= n`, or `None` past `u32::MAX`
#[inline]
pub const fn round_up_u32(n: u32, d: u32) -> Option<u32> {
    div_ceil_u32(n, d).checked_mul(d)
}

pub fn num_workgroups_2d(extent: UVec2, tile: UVec2) -> [u32; 3] {
    [
        div_ceil_u32(extent.x, tile.x),
        div_ceil_u32(extent.y, tile.y),
        1,
    ]
}

/// Newtype wrapper for thread IDs to ensure type safety
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ThreadId(u32);

impl ThreadId {
    #[inline]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

/// Sort order
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum SortOrder {
    Ascending = 0,
    Descending = 1,
}

impl SortOrder {
    /// Padding value that lands after every real element for this order
    #[inline]
    pub fn sentinel<T: DeviceElement>(self) -> T {
        match self {
            SortOrder::Ascending => T::highest(),
            SortOrder::Descending => T::lowest(),
        }
    }
}

impl Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Ascending => write!(f, "ascending"),
            SortOrder::Descending => write!(f, "descending"),
        }
    }
}

impl TryFrom<u32> for SortOrder {
    type Error = &'static str;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SortOrder::Ascending),
            1 => Ok(SortOrder::Descending),
            _ => Err("Invalid SortOrder value"),
        }
    }
}

impl From<SortOrder> for u32 {
    fn from(order: SortOrder) -> u32 {
        match order {
            SortOrder::Ascending => 0,
            SortOrder::Descending => 1,
        }
    }
}
