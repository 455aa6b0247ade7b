//! Largest running sum of an integer array, measured from index 0.

use super::{reduce::BlockReducer, scan::PrefixScanner};
use crate::{
    config::ComputeConfig,
    device::{ComputeDevice, DeviceArray},
    error::Result,
};
use shared::CombineOp;

/// Scan followed by a max reduction over the scanned array.
///
/// The result is clamped at 0, so an empty prefix counts: an array whose
/// running sums are all negative yields 0.
pub struct MaxPrefixSum<'d, D: ComputeDevice> {
    scanner: PrefixScanner<'d, D, i32>,
    reducer: BlockReducer<'d, D, i32>,
}

impl<'d, D: ComputeDevice> MaxPrefixSum<'d, D> {
    pub fn new(device: &'d D, config: &ComputeConfig) -> Result<Self> {
        Ok(Self {
            scanner: PrefixScanner::new(device, config)?,
            reducer: BlockReducer::new(device, CombineOp::Max, config)?,
        })
    }

    #[tracing::instrument(skip_all, fields(n = input.len()))]
    pub fn run(&self, input: &DeviceArray<D, i32>) -> Result<i32> {
        let scanned = self.scanner.scan(input)?;
        let best = self.reducer.reduce(&scanned.prefix)?;
        tracing::debug!(best, "max prefix before clamp");
        Ok(best.max(0))
    }
}

/// Max prefix sum of a host array, staged through the device
pub fn max_prefix_sum<D: ComputeDevice>(
    device: &D,
    data: &[i32],
    config: &ComputeConfig,
) -> Result<i32> {
    let input = device.to_device(data)?;
    MaxPrefixSum::new(device, config)?.run(&input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runners::CpuDevice;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn setup(work_group_size: u32) -> (CpuDevice, ComputeConfig) {
        let config = ComputeConfig::default()
            .with_work_group_size(work_group_size)
            .with_threads(2);
        (CpuDevice::new(&config).unwrap(), config)
    }

    fn cpu_max_prefix(data: &[i32]) -> i32 {
        let mut sum = 0i32;
        let mut best = 0;
        for v in data {
            sum += v;
            best = best.max(sum);
        }
        best
    }

    #[test]
    fn test_max_prefix_scenario() {
        for work_group_size in [2, 4, 256] {
            let (device, config) = setup(work_group_size);
            let data = [3, -1, 4, 1, -5, 9, 2, -8];
            assert_eq!(max_prefix_sum(&device, &data, &config).unwrap(), 13);
        }
    }

    #[test]
    fn test_all_negative_clamps_to_zero() {
        let (device, config) = setup(4);
        assert_eq!(max_prefix_sum(&device, &[-3, -1, -4, -1, -5], &config).unwrap(), 0);
    }

    #[test]
    fn test_empty_input() {
        let (device, config) = setup(256);
        assert_eq!(max_prefix_sum(&device, &[], &config).unwrap(), 0);
        assert_eq!(device.launch_count(), 0);
    }

    #[test]
    fn test_random_matches_cpu() {
        let (device, config) = setup(16);
        let mut rng = StdRng::seed_from_u64(3);
        let data: Vec<i32> = (0..5000).map(|_| rng.gen_range(-100..=100)).collect();
        assert_eq!(
            max_prefix_sum(&device, &data, &config).unwrap(),
            cpu_max_prefix(&data)
        );
    }
}
