use glam::UVec2;
use shared::{num_workgroups_2d, round_up_u32, ElementKind};
use std::fmt;

/// Launch grid: work-group shape plus the logical extent to cover.
///
/// The backend runs `global()` lanes, which rounds the extent up to whole
/// work-groups; kernels mask the tail themselves.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WorkDescriptor {
    pub local: UVec2,
    pub extent: UVec2,
}

impl WorkDescriptor {
    pub fn linear(work_group_size: u32, num_elements: u32) -> Self {
        Self {
            local: UVec2::new(work_group_size, 1),
            extent: UVec2::new(num_elements, 1),
        }
    }

    pub fn tiled(tile: u32, extent_x: u32, extent_y: u32) -> Self {
        Self {
            local: UVec2::splat(tile),
            extent: UVec2::new(extent_x, extent_y),
        }
    }

    /// Padded global extent actually launched, `None` when padding to whole
    /// work-groups does not fit in `u32`
    pub fn global(&self) -> Option<UVec2> {
        Some(UVec2::new(
            round_up_u32(self.extent.x, self.local.x)?,
            round_up_u32(self.extent.y, self.local.y)?,
        ))
    }

    pub fn num_workgroups(&self) -> [u32; 3] {
        num_workgroups_2d(self.extent, self.local)
    }

    pub fn group_count(&self) -> usize {
        self.num_workgroups().iter().map(|&n| n as usize).product()
    }
}

/// Kernel sources known to the backends, one per algorithm family
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum KernelModule {
    Reduce,
    Scan,
    Bitonic,
    Radix,
    Transpose,
}

impl KernelModule {
    pub fn name(self) -> &'static str {
        match self {
            KernelModule::Reduce => "reduce",
            KernelModule::Scan => "scan",
            KernelModule::Bitonic => "bitonic",
            KernelModule::Radix => "radix",
            KernelModule::Transpose => "transpose",
        }
    }

    pub fn entry_points(self) -> &'static [&'static str] {
        match self {
            KernelModule::Reduce => &["sum", "max"],
            KernelModule::Scan => &["prefix_sum"],
            KernelModule::Bitonic => &["bitonic_large_array", "bitonic_small_array"],
            KernelModule::Radix => &["fill_bit_count", "move_numbers"],
            KernelModule::Transpose => &["matrix_transpose"],
        }
    }
}

impl fmt::Display for KernelModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compile-time constants baked into a kernel instance
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CompileFlags {
    pub work_group_size: u32,
    pub radix_bits: Option<u32>,
    pub element: ElementKind,
}

impl CompileFlags {
    pub fn new(work_group_size: u32, element: ElementKind) -> Self {
        Self {
            work_group_size,
            radix_bits: None,
            element,
        }
    }

    pub fn with_radix_bits(mut self, radix_bits: u32) -> Self {
        self.radix_bits = Some(radix_bits);
        self
    }
}

impl fmt::Display for CompileFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-DWORK_GROUP_SIZE={}", self.work_group_size)?;
        if let Some(bits) = self.radix_bits {
            write!(f, " -DRADIX_BITS={bits}")?;
        }
        write!(f, " -DELEMENT={}", self.element)
    }
}
