//! Multi-pass data-parallel algorithms over a work-group device.
//!
//! Block reduction, inclusive scan, max prefix sum, bitonic sort, radix sort
//! and tiled transpose, each driven from the host as a sequence of kernel
//! launches on a [`ComputeDevice`]. The kernel bodies live in the `kernel`
//! crate; [`runners::CpuDevice`] hosts them on a thread pool.
//!
//! ```no_run
//! use workgroup_passes::{algorithms, ComputeConfig, CpuDevice};
//!
//! # fn main() -> workgroup_passes::Result<()> {
//! let config = ComputeConfig::default();
//! let device = CpuDevice::new(&config)?;
//! let best = algorithms::max_prefix_sum(&device, &[3, -1, 4, 1, -5, 9, 2, -8], &config)?;
//! assert_eq!(best, 13);
//! # Ok(())
//! # }
//! ```

pub mod algorithms;
pub mod config;
pub mod device;
pub mod error;
pub mod runners;

pub use config::ComputeConfig;
pub use device::{ComputeDevice, DeviceArray};
pub use error::{ComputeError, Result};
pub use runners::CpuDevice;
pub use shared::{CombineOp, DeviceElement, ElementKind, SortOrder};

/// Checks that `data` is ordered according to `order`
pub fn verify_sorted<T: PartialOrd>(data: &[T], order: SortOrder) -> bool {
    data.windows(2).all(|w| match order {
        SortOrder::Ascending => w[0] <= w[1],
        SortOrder::Descending => w[0] >= w[1],
    })
}
