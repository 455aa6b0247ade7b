//! Host-side orchestration of the multi-pass algorithms.
//!
//! Each orchestrator compiles its kernels once in `new` and then issues the
//! launches of one call in program order on a [`ComputeDevice`]. The free
//! functions stage a host slice through the device for one-off use.
//!
//! [`ComputeDevice`]: crate::device::ComputeDevice

pub mod bitonic;
pub mod max_prefix;
pub mod radix;
pub mod reduce;
pub mod scan;
pub mod transpose;

pub use self::bitonic::{bitonic_passes, bitonic_sort, BitonicPass, BitonicSorter, BitonicVariant};
pub use self::max_prefix::{max_prefix_sum, MaxPrefixSum};
pub use self::radix::{digit_starts, radix_sort, RadixSorter};
pub use self::reduce::{max, sum, BlockReducer};
pub use self::scan::{inclusive_scan, level_lengths, PrefixScanner, ScanOutput};
pub use self::transpose::{transpose, MatrixTranspose};
