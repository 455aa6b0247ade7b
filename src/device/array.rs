use super::ComputeDevice;
use std::fmt;
use std::marker::PhantomData;

/// A typed, fixed-length array resident on a device.
///
/// The handle owns its allocation; dropping it releases the memory.
/// [`ComputeDevice::swap`] exchanges two handles' allocations.
pub struct DeviceArray<D: ComputeDevice, T> {
    memory: D::Memory,
    len: usize,
    _element: PhantomData<T>,
}

impl<D: ComputeDevice, T> DeviceArray<D, T> {
    pub(crate) fn new(memory: D::Memory, len: usize) -> Self {
        Self {
            memory,
            len,
            _element: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Raw allocation, for binding to a launch
    #[inline]
    pub fn memory(&self) -> &D::Memory {
        &self.memory
    }
}

impl<D: ComputeDevice, T> fmt::Debug for DeviceArray<D, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceArray")
            .field("element", &std::any::type_name::<T>())
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}
