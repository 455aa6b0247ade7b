//! The execution backend as seen by the orchestrators.
//!
//! A [`ComputeDevice`] owns memory, compiles kernels, and runs one launch at
//! a time in program order. The orchestrators in [`crate::algorithms`] only
//! talk to this trait, so any backend that can host the `kernel` crate's
//! work-group bodies can drive them.

mod array;
mod work;

pub use array::DeviceArray;
pub use work::{CompileFlags, KernelModule, WorkDescriptor};

use crate::error::{ComputeError, Result};
use shared::{DeviceElement, ElementKind};
use std::fmt;

/// Identification of a backend, for logs and benchmark output
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendInfo {
    pub backend: &'static str,
    pub api: Option<&'static str>,
    pub adapter: Option<String>,
    pub driver: Option<String>,
}

impl fmt::Display for BackendInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.backend)?;
        if let Some(api) = self.api {
            write!(f, " ({api})")?;
        }
        if let Some(adapter) = &self.adapter {
            write!(f, " on {adapter}")?;
        }
        if let Some(driver) = &self.driver {
            write!(f, ", driver {driver}")?;
        }
        Ok(())
    }
}

/// Device execution service.
///
/// Memory is untyped 32-bit words; [`DeviceArray`] adds the element type on
/// the host side. Launches are synchronous: when `launch` returns, every
/// later launch or read observes its writes.
pub trait ComputeDevice: Sized {
    /// One device allocation
    type Memory: Send + Sync;
    /// A compiled entry point
    type Kernel;

    fn backend_info(&self) -> BackendInfo;

    fn allocate_memory(&self, kind: ElementKind, len: usize) -> Result<Self::Memory>;

    fn write_memory(&self, memory: &Self::Memory, words: &[u32]) -> Result<()>;

    fn read_memory(&self, memory: &Self::Memory, words: &mut [u32]) -> Result<()>;

    fn compile(
        &self,
        module: KernelModule,
        entry_point: &str,
        flags: &CompileFlags,
    ) -> Result<Self::Kernel>;

    /// Runs `kernel` over `work`. `buffers` and `push_constants` are bound
    /// in the order the entry point documents.
    fn launch(
        &self,
        kernel: &Self::Kernel,
        work: &WorkDescriptor,
        buffers: &[&Self::Memory],
        push_constants: &[u8],
    ) -> Result<()>;

    fn allocate<T: DeviceElement>(&self, len: usize) -> Result<DeviceArray<Self, T>> {
        tracing::trace!(len, element = %T::KIND, "allocate");
        let memory = self.allocate_memory(T::KIND, len)?;
        Ok(DeviceArray::new(memory, len))
    }

    fn upload<T: DeviceElement>(&self, array: &DeviceArray<Self, T>, data: &[T]) -> Result<()> {
        if data.len() != array.len() {
            return Err(ComputeError::LengthMismatch {
                expected: array.len(),
                actual: data.len(),
            });
        }
        self.write_memory(array.memory(), bytemuck::cast_slice(data))
    }

    fn download<T: DeviceElement>(
        &self,
        array: &DeviceArray<Self, T>,
        out: &mut [T],
    ) -> Result<()> {
        if out.len() != array.len() {
            return Err(ComputeError::LengthMismatch {
                expected: array.len(),
                actual: out.len(),
            });
        }
        self.read_memory(array.memory(), bytemuck::cast_slice_mut(out))
    }

    fn to_device<T: DeviceElement>(&self, data: &[T]) -> Result<DeviceArray<Self, T>> {
        let array = self.allocate(data.len())?;
        self.upload(&array, data)?;
        Ok(array)
    }

    fn to_host<T: DeviceElement>(&self, array: &DeviceArray<Self, T>) -> Result<Vec<T>> {
        let mut out = vec![T::zero(); array.len()];
        self.download(array, &mut out)?;
        Ok(out)
    }

    /// Exchanges which allocation each handle owns. O(1); no data moves.
    fn swap<T: DeviceElement>(
        &self,
        a: &mut DeviceArray<Self, T>,
        b: &mut DeviceArray<Self, T>,
    ) -> Result<()> {
        if a.len() != b.len() {
            return Err(ComputeError::LengthMismatch {
                expected: a.len(),
                actual: b.len(),
            });
        }
        std::mem::swap(a, b);
        Ok(())
    }
}

/// Converts a host length to a kernel extent
pub(crate) fn extent(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| ComputeError::BufferSizeOverflow(len, ElementKind::WIDTH))
}
