//! Push constants shared between the host drivers and the kernels
//!
//! Each struct is bound to a launch as raw bytes (`bytemuck::bytes_of`) and
//! decoded on the kernel side, so field order is part of the launch contract.

use bytemuck::{Pod, Zeroable};

/// Parameters for one block-reduction pass
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct ReduceParams {
    pub num_elements: u32,
}

/// Which half of the two-phase scan a `prefix_sum` launch performs
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum ScanMode {
    /// Per-work-group inclusive scan plus one total per work-group
    LocalScan = 0,
    /// Add the scanned total of block `k - 1` to every element of block `k`
    ApplyOffsets = 1,
}

impl TryFrom<u32> for ScanMode {
    type Error = &'static str;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ScanMode::LocalScan),
            1 => Ok(ScanMode::ApplyOffsets),
            _ => Err("Invalid ScanMode value"),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct ScanParams {
    pub num_elements: u32,
    pub mode: u32,
}

impl ScanParams {
    pub fn new(num_elements: u32, mode: ScanMode) -> Self {
        Self {
            num_elements,
            mode: mode as u32,
        }
    }
}

/// Parameters for GPU bitonic sorting
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct BitonicParams {
    pub num_elements: u32,
    /// Comparison distance of the first sub-stage this launch performs
    pub cur_size: u32,
    /// Size of the bitonic sequences being merged
    pub size: u32,
    pub sort_order: u32, // Sort order as u32 (0 = Ascending, 1 = Descending)
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct RadixParams {
    pub num_elements: u32,
    /// Bit offset of the digit handled by this pass
    pub start: u32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct TransposeParams {
    /// Rows of the input matrix
    pub rows: u32,
    /// Columns of the input matrix
    pub cols: u32,
}
