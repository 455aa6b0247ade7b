//! Element types that can live in a device array

use bytemuck::{Pod, Zeroable};
use core::fmt::{self, Debug, Display};

/// Runtime tag for the element type of a device allocation
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ElementKind {
    U32 = 0,
    I32 = 1,
    F32 = 2,
}

impl ElementKind {
    /// All supported elements are 32 bits wide
    pub const WIDTH: usize = 4;

    pub fn name(self) -> &'static str {
        match self {
            ElementKind::U32 => "u32",
            ElementKind::I32 => "i32",
            ElementKind::F32 => "f32",
        }
    }
}

impl Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Trait for fixed-width numeric types the kernels operate on.
///
/// Every implementor is exactly one 32-bit word so device memory can be kept
/// as untyped words and reinterpreted with `bytemuck`.
pub trait DeviceElement: Copy + Pod + Zeroable + PartialOrd + Debug + Send + Sync + 'static {
    const KIND: ElementKind;

    fn zero() -> Self;

    /// Lower bound of the type; identity of a max reduction
    fn lowest() -> Self;

    /// Upper bound of the type
    fn highest() -> Self;

    /// Addition used by sums and scans. Wraps on integer overflow.
    fn accumulate(self, rhs: Self) -> Self;

    #[inline]
    fn max_of(self, rhs: Self) -> Self {
        if rhs > self {
            rhs
        } else {
            self
        }
    }
}

impl DeviceElement for u32 {
    const KIND: ElementKind = ElementKind::U32;

    #[inline]
    fn zero() -> Self {
        0
    }

    #[inline]
    fn lowest() -> Self {
        u32::MIN
    }

    #[inline]
    fn highest() -> Self {
        u32::MAX
    }

    #[inline]
    fn accumulate(self, rhs: Self) -> Self {
        self.wrapping_add(rhs)
    }
}

impl DeviceElement for i32 {
    const KIND: ElementKind = ElementKind::I32;

    #[inline]
    fn zero() -> Self {
        0
    }

    #[inline]
    fn lowest() -> Self {
        i32::MIN
    }

    #[inline]
    fn highest() -> Self {
        i32::MAX
    }

    #[inline]
    fn accumulate(self, rhs: Self) -> Self {
        self.wrapping_add(rhs)
    }
}

impl DeviceElement for f32 {
    const KIND: ElementKind = ElementKind::F32;

    #[inline]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn lowest() -> Self {
        f32::NEG_INFINITY
    }

    #[inline]
    fn highest() -> Self {
        f32::INFINITY
    }

    #[inline]
    fn accumulate(self, rhs: Self) -> Self {
        self + rhs
    }
}

/// Combine operator of a block reduction
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum CombineOp {
    Sum = 0,
    Max = 1,
}

impl CombineOp {
    /// Value used for padding lanes past the end of the array
    #[inline]
    pub fn identity<T: DeviceElement>(self) -> T {
        match self {
            CombineOp::Sum => T::zero(),
            CombineOp::Max => T::lowest(),
        }
    }

    #[inline]
    pub fn combine<T: DeviceElement>(self, a: T, b: T) -> T {
        match self {
            CombineOp::Sum => a.accumulate(b),
            CombineOp::Max => a.max_of(b),
        }
    }

    /// Kernel entry point implementing this operator
    pub fn entry_point(self) -> &'static str {
        match self {
            CombineOp::Sum => "sum",
            CombineOp::Max => "max",
        }
    }
}

impl Display for CombineOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entry_point())
    }
}
