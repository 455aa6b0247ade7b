//! Block reduction: shrink N elements to one by repeated work-group passes.

use crate::{
    config::ComputeConfig,
    device::{extent, CompileFlags, ComputeDevice, DeviceArray, KernelModule, WorkDescriptor},
    error::Result,
};
use shared::{CombineOp, DeviceElement, ReduceParams};
use std::marker::PhantomData;

/// Drives a `reduce` kernel until a single value remains.
pub struct BlockReducer<'d, D: ComputeDevice, T> {
    device: &'d D,
    kernel: D::Kernel,
    op: CombineOp,
    work_group_size: u32,
    _element: PhantomData<T>,
}

impl<'d, D: ComputeDevice, T: DeviceElement> BlockReducer<'d, D, T> {
    pub fn new(device: &'d D, op: CombineOp, config: &ComputeConfig) -> Result<Self> {
        crate::config::validate_work_group_size(config.work_group_size)?;
        let flags = CompileFlags::new(config.work_group_size, T::KIND);
        let kernel = device.compile(KernelModule::Reduce, op.entry_point(), &flags)?;
        Ok(Self {
            device,
            kernel,
            op,
            work_group_size: config.work_group_size,
            _element: PhantomData,
        })
    }

    pub fn op(&self) -> CombineOp {
        self.op
    }

    /// Combines every element of `input`. An empty array yields the
    /// operator identity without launching anything.
    #[tracing::instrument(skip_all, fields(op = %self.op, n = input.len()))]
    pub fn reduce(&self, input: &DeviceArray<D, T>) -> Result<T> {
        if input.is_empty() {
            return Ok(self.op.identity());
        }

        let w = self.work_group_size as usize;
        let mut current: Option<DeviceArray<D, T>> = None;
        let mut len = input.len();

        // N < W still takes one padded pass
        while len > 1 {
            let next_len = len.div_ceil(w);
            let next = self.device.allocate::<T>(next_len)?;
            let source = current.as_ref().unwrap_or(input);
            let params = ReduceParams {
                num_elements: extent(len)?,
            };

            tracing::debug!(len, next_len, "reduce pass");
            self.device.launch(
                &self.kernel,
                &WorkDescriptor::linear(self.work_group_size, params.num_elements),
                &[source.memory(), next.memory()],
                bytemuck::bytes_of(&params),
            )?;

            // the previous partials are released here
            current = Some(next);
            len = next_len;
        }

        let result = current.as_ref().unwrap_or(input);
        let mut value = [T::zero()];
        self.device.download(result, &mut value)?;
        Ok(value[0])
    }
}

/// Sum of a host array, staged through the device
pub fn sum<D: ComputeDevice, T: DeviceElement>(
    device: &D,
    data: &[T],
    config: &ComputeConfig,
) -> Result<T> {
    let input = device.to_device(data)?;
    BlockReducer::new(device, CombineOp::Sum, config)?.reduce(&input)
}

/// Maximum of a host array, staged through the device
pub fn max<D: ComputeDevice, T: DeviceElement>(
    device: &D,
    data: &[T],
    config: &ComputeConfig,
) -> Result<T> {
    let input = device.to_device(data)?;
    BlockReducer::new(device, CombineOp::Max, config)?.reduce(&input)
}
