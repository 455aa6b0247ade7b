//! Bitonic sorting network driven from the host.
//!
//! Every merge of the network is a run of compare-exchange sub-stages at
//! halving distances. Distances wider than a work-group need one
//! `bitonic_large_array` launch each; once a pair fits in one work-group the
//! rest of the merge runs in a single `bitonic_small_array` launch.

use crate::{
    config::ComputeConfig,
    device::{extent, CompileFlags, ComputeDevice, DeviceArray, KernelModule, WorkDescriptor},
    error::{ComputeError, Result},
};
use shared::{BitonicParams, DeviceElement, SortOrder};
use std::marker::PhantomData;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BitonicVariant {
    /// One sub-stage whose pairs straddle work-groups
    LargeArray,
    /// All remaining sub-stages of a merge, inside each work-group
    SmallArray,
}

/// One launch of the network
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BitonicPass {
    pub variant: BitonicVariant,
    pub cur_size: u32,
    pub size: u32,
}

impl BitonicPass {
    fn large(cur_size: u32, size: u32) -> Self {
        Self {
            variant: BitonicVariant::LargeArray,
            cur_size,
            size,
        }
    }

    fn small(cur_size: u32, size: u32) -> Self {
        Self {
            variant: BitonicVariant::SmallArray,
            cur_size,
            size,
        }
    }
}

/// Full launch sequence for sorting `n` elements with work-groups of
/// `work_group_size` lanes. Empty for `n <= 1`.
///
/// Fails with [`ComputeError::NotPowerOfTwo`] when `n` has no power of two
/// at or above it within `u32`.
pub fn bitonic_passes(n: u32, work_group_size: u32) -> Result<Vec<BitonicPass>> {
    let mut passes = Vec::new();
    if n <= 1 {
        return Ok(passes);
    }
    let max_size = n
        .checked_next_power_of_two()
        .ok_or(ComputeError::NotPowerOfTwo(n as usize))?;

    let mut size = 2u32;
    loop {
        let mut cur_size = size / 2;
        while cur_size > work_group_size / 2 {
            passes.push(BitonicPass::large(cur_size, size));
            cur_size /= 2;
        }
        passes.push(BitonicPass::small(cur_size, size));
        match size.checked_mul(2) {
            Some(next) if next <= max_size => size = next,
            _ => break,
        }
    }
    Ok(passes)
}

pub struct BitonicSorter<'d, D: ComputeDevice, T> {
    device: &'d D,
    large_array: D::Kernel,
    small_array: D::Kernel,
    work_group_size: u32,
    _element: PhantomData<T>,
}

impl<'d, D: ComputeDevice, T: DeviceElement> BitonicSorter<'d, D, T> {
    pub fn new(device: &'d D, config: &ComputeConfig) -> Result<Self> {
        crate::config::validate_work_group_size(config.work_group_size)?;
        let flags = CompileFlags::new(config.work_group_size, T::KIND);
        Ok(Self {
            device,
            large_array: device.compile(KernelModule::Bitonic, "bitonic_large_array", &flags)?,
            small_array: device.compile(KernelModule::Bitonic, "bitonic_small_array", &flags)?,
            work_group_size: config.work_group_size,
            _element: PhantomData,
        })
    }

    /// Sorts a device array whose length is a power of two.
    #[tracing::instrument(skip_all, fields(n = array.len(), order = %order))]
    pub fn sort_in_place(&self, array: &DeviceArray<D, T>, order: SortOrder) -> Result<()> {
        let n = array.len();
        if n <= 1 {
            return Ok(());
        }
        if !n.is_power_of_two() {
            return Err(ComputeError::NotPowerOfTwo(n));
        }

        let num_elements = extent(n)?;
        let work = WorkDescriptor::linear(self.work_group_size, num_elements);
        for pass in bitonic_passes(num_elements, self.work_group_size)? {
            let kernel = match pass.variant {
                BitonicVariant::LargeArray => &self.large_array,
                BitonicVariant::SmallArray => &self.small_array,
            };
            let params = BitonicParams {
                num_elements,
                cur_size: pass.cur_size,
                size: pass.size,
                sort_order: order.into(),
            };
            tracing::debug!(
                variant = ?pass.variant,
                cur_size = pass.cur_size,
                size = pass.size,
                "bitonic pass"
            );
            self.device
                .launch(kernel, &work, &[array.memory()], bytemuck::bytes_of(&params))?;
        }
        Ok(())
    }

    /// Sorts a host slice of any length. The device copy is padded to the
    /// next power of two with values that sort last.
    pub fn sort(&self, data: &mut [T], order: SortOrder) -> Result<()> {
        let n = data.len();
        if n <= 1 {
            return Ok(());
        }

        let mut padded = Vec::with_capacity(n.next_power_of_two());
        padded.extend_from_slice(data);
        padded.resize(n.next_power_of_two(), order.sentinel());

        let array = self.device.to_device(&padded)?;
        self.sort_in_place(&array, order)?;
        self.device.download(&array, &mut padded)?;
        data.copy_from_slice(&padded[..n]);
        Ok(())
    }
}

/// Sorts a host slice through the device
pub fn bitonic_sort<D: ComputeDevice, T: DeviceElement>(
    device: &D,
    data: &mut [T],
    order: SortOrder,
    config: &ComputeConfig,
) -> Result<()> {
    BitonicSorter::new(device, config)?.sort(data, order)
}
