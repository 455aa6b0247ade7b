//! Inclusive prefix sum over arrays of any length.
//!
//! A single `prefix_sum` launch scans within work-groups and emits one total
//! per work-group. Those totals are themselves scanned the same way, level by
//! level, until a level fits in one work-group. The scanned totals of each
//! level are then added back into the level below, top to bottom.
//!
//! ```text
//! level 0   input (n)            -> prefix (n),        totals[0] (n / W)
//! level 1   totals[0] (n / W)    -> offsets[0],        totals[1] (n / W^2)
//! ...
//! level L   fits one work-group: its local scan is already global
//! ```
//!
//! The buffers of every level are allocated up front in a [`ScanArena`]
//! and released together once the scan returns.

use crate::{
    config::ComputeConfig,
    device::{extent, CompileFlags, ComputeDevice, DeviceArray, KernelModule, WorkDescriptor},
    error::Result,
};
use shared::{DeviceElement, ScanMode, ScanParams};
use std::marker::PhantomData;

/// Result of a scan
pub struct ScanOutput<D: ComputeDevice, T> {
    /// `prefix[i]` is the sum of `input[0..=i]`
    pub prefix: DeviceArray<D, T>,
    /// Total of each top-level work-group, `ceil(n / W)` entries
    pub block_totals: DeviceArray<D, T>,
}

/// Lengths of every scan level: `n`, `ceil(n / W)`, ... down to the first
/// length that fits in one work-group.
pub fn level_lengths(n: usize, work_group_size: usize) -> Vec<usize> {
    let mut lengths = vec![n];
    let mut len = n;
    while len > work_group_size {
        len = len.div_ceil(work_group_size);
        lengths.push(len);
    }
    lengths
}

/// Transient buffers of one scan.
///
/// `totals[d]` receives the work-group totals of level `d`; `offsets[d]`
/// holds the same totals once scanned and exists for every level but the
/// deepest.
struct ScanArena<D: ComputeDevice, T> {
    totals: Vec<DeviceArray<D, T>>,
    offsets: Vec<DeviceArray<D, T>>,
}

impl<D: ComputeDevice, T: DeviceElement> ScanArena<D, T> {
    fn new(device: &D, lengths: &[usize], work_group_size: usize) -> Result<Self> {
        let blocks = lengths.iter().map(|len| len.div_ceil(work_group_size));
        let totals = blocks
            .clone()
            .map(|len| device.allocate(len))
            .collect::<Result<Vec<_>>>()?;
        let offsets = blocks
            .take(lengths.len() - 1)
            .map(|len| device.allocate(len))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { totals, offsets })
    }
}

/// Drives the `prefix_sum` kernel over arbitrarily long arrays.
pub struct PrefixScanner<'d, D: ComputeDevice, T> {
    device: &'d D,
    kernel: D::Kernel,
    work_group_size: u32,
    _element: PhantomData<T>,
}

impl<'d, D: ComputeDevice, T: DeviceElement> PrefixScanner<'d, D, T> {
    pub fn new(device: &'d D, config: &ComputeConfig) -> Result<Self> {
        crate::config::validate_work_group_size(config.work_group_size)?;
        let flags = CompileFlags::new(config.work_group_size, T::KIND);
        let kernel = device.compile(KernelModule::Scan, "prefix_sum", &flags)?;
        Ok(Self {
            device,
            kernel,
            work_group_size: config.work_group_size,
            _element: PhantomData,
        })
    }

    #[tracing::instrument(skip_all, fields(n = input.len()))]
    pub fn scan(&self, input: &DeviceArray<D, T>) -> Result<ScanOutput<D, T>> {
        let n = input.len();
        let prefix = self.device.allocate::<T>(n)?;
        if n == 0 {
            return Ok(ScanOutput {
                prefix,
                block_totals: self.device.allocate(0)?,
            });
        }

        let w = self.work_group_size as usize;
        let lengths = level_lengths(n, w);
        let mut arena = ScanArena::new(self.device, &lengths, w)?;

        // up-sweep: local scans, shallowest level first
        for (depth, &len) in lengths.iter().enumerate() {
            let (source, target) = match depth.checked_sub(1) {
                None => (input, &prefix),
                Some(parent) => (&arena.totals[parent], &arena.offsets[parent]),
            };
            self.local_scan(source, target, &arena.totals[depth], len)?;
        }

        // down-sweep: add block offsets, deepest level first
        for depth in (0..lengths.len() - 1).rev() {
            let target = match depth.checked_sub(1) {
                None => &prefix,
                Some(parent) => &arena.offsets[parent],
            };
            self.apply_offsets(&arena.offsets[depth], target, lengths[depth])?;
        }

        let block_totals = arena.totals.swap_remove(0);
        Ok(ScanOutput {
            prefix,
            block_totals,
        })
    }

    fn local_scan(
        &self,
        source: &DeviceArray<D, T>,
        target: &DeviceArray<D, T>,
        totals: &DeviceArray<D, T>,
        len: usize,
    ) -> Result<()> {
        let params = ScanParams::new(extent(len)?, ScanMode::LocalScan);
        tracing::debug!(len, "local scan pass");
        self.device.launch(
            &self.kernel,
            &WorkDescriptor::linear(self.work_group_size, params.num_elements),
            &[source.memory(), target.memory(), totals.memory()],
            bytemuck::bytes_of(&params),
        )
    }

    fn apply_offsets(
        &self,
        offsets: &DeviceArray<D, T>,
        target: &DeviceArray<D, T>,
        len: usize,
    ) -> Result<()> {
        let params = ScanParams::new(extent(len)?, ScanMode::ApplyOffsets);
        tracing::debug!(len, "apply offsets pass");
        self.device.launch(
            &self.kernel,
            &WorkDescriptor::linear(self.work_group_size, params.num_elements),
            &[offsets.memory(), target.memory()],
            bytemuck::bytes_of(&params),
        )
    }
}

/// Inclusive prefix sum of a host array, staged through the device
pub fn inclusive_scan<D: ComputeDevice, T: DeviceElement>(
    device: &D,
    data: &[T],
    config: &ComputeConfig,
) -> Result<Vec<T>> {
    let input = device.to_device(data)?;
    let output = PrefixScanner::new(device, config)?.scan(&input)?;
    device.to_host(&output.prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runners::CpuDevice;
    use pretty_assertions::assert_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn setup(work_group_size: u32) -> (CpuDevice, ComputeConfig) {
        let config = ComputeConfig::default()
            .with_work_group_size(work_group_size)
            .with_threads(2);
        (CpuDevice::new(&config).unwrap(), config)
    }

    fn cpu_scan(data: &[i32]) -> Vec<i32> {
        data.iter()
            .scan(0i32, |acc, v| {
                *acc = acc.wrapping_add(*v);
                Some(*acc)
            })
            .collect()
    }

    #[test]
    fn test_level_lengths() {
        assert_eq!(level_lengths(100, 256), vec![100]);
        assert_eq!(level_lengths(256, 256), vec![256]);
        assert_eq!(level_lengths(257, 256), vec![257, 2]);
        assert_eq!(level_lengths(1000, 4), vec![1000, 250, 63, 16, 4]);
    }

    #[test]
    fn test_scan_single_work_group() {
        let (device, config) = setup(256);
        let data = [3i32, -1, 4, 1, -5, 9, 2, -8];
        assert_eq!(
            inclusive_scan(&device, &data, &config).unwrap(),
            vec![3, 2, 6, 7, 2, 11, 13, 5]
        );
        assert_eq!(device.count_launches("prefix_sum"), 1);
    }

    #[test]
    fn test_scan_two_levels() {
        let (device, config) = setup(4);
        let data = [3i32, -1, 4, 1, -5, 9, 2, -8];
        assert_eq!(
            inclusive_scan(&device, &data, &config).unwrap(),
            vec![3, 2, 6, 7, 2, 11, 13, 5]
        );
        // local scan on both levels, one offset pass
        assert_eq!(device.count_launches("prefix_sum"), 3);
    }

    #[test]
    fn test_scan_deep_recursion_non_power_of_two() {
        let (device, config) = setup(4);
        let mut rng = StdRng::seed_from_u64(7);
        let data: Vec<i32> = (0..1000).map(|_| rng.gen_range(-1023..=1023)).collect();
        assert_eq!(inclusive_scan(&device, &data, &config).unwrap(), cpu_scan(&data));
        // five local scans and four offset passes
        assert_eq!(device.count_launches("prefix_sum"), 9);
    }

    #[test]
    fn test_block_totals_side_artifact() {
        let (device, config) = setup(4);
        let input = device.to_device(&[1u32, 2, 3, 4, 5, 6, 7, 8, 9, 10]).unwrap();
        let scanner = PrefixScanner::new(&device, &config).unwrap();
        let output = scanner.scan(&input).unwrap();
        assert_eq!(device.to_host(&output.block_totals).unwrap(), vec![10, 26, 19]);
        assert_eq!(
            device.to_host(&output.prefix).unwrap(),
            vec![1, 3, 6, 10, 15, 21, 28, 36, 45, 55]
        );
    }

    #[test]
    fn test_scan_empty_and_single() {
        let (device, config) = setup(256);
        assert!(inclusive_scan::<_, i32>(&device, &[], &config).unwrap().is_empty());
        assert_eq!(device.launch_count(), 0);
        assert_eq!(inclusive_scan(&device, &[42u32], &config).unwrap(), vec![42]);
    }

    #[test]
    fn test_scan_is_deterministic() {
        let (device, config) = setup(8);
        let data: Vec<f32> = (0..500).map(|i| (i as f32).sin()).collect();
        let first = inclusive_scan(&device, &data, &config).unwrap();
        let second = inclusive_scan(&device, &data, &config).unwrap();
        assert_eq!(
            first.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            second.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        );
    }
}
