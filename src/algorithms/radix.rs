//! LSD radix sort of `u32` keys.
//!
//! Each digit pass runs three steps on the device:
//!
//! 1. `fill_bit_count` writes a one-hot count buffer of `n << RADIX_BITS`
//!    slots, digit-major.
//! 2. The count buffer is scanned, which turns every slot into one past the
//!    destination of its element.
//! 3. `move_numbers` scatters the keys into the spare buffer, and the two
//!    buffers trade places.
//!
//! Passes go from the least significant digit up, so the last pass leaves
//! the array fully ordered.

use super::scan::PrefixScanner;
use crate::{
    config::{validate_radix_bits, ComputeConfig},
    device::{extent, CompileFlags, ComputeDevice, DeviceArray, KernelModule, WorkDescriptor},
    error::{ComputeError, Result},
};
use shared::{ElementKind, RadixParams, KEY_BITS};

/// Bit offsets of the digits of a `key_bits` wide key, least significant first
pub fn digit_starts(key_bits: u32, radix_bits: u32) -> Vec<u32> {
    (0..key_bits).step_by(radix_bits.max(1) as usize).collect()
}

pub struct RadixSorter<'d, D: ComputeDevice> {
    device: &'d D,
    fill_bit_count: D::Kernel,
    move_numbers: D::Kernel,
    scanner: PrefixScanner<'d, D, u32>,
    work_group_size: u32,
    radix_bits: u32,
    key_bits: u32,
}

impl<'d, D: ComputeDevice> RadixSorter<'d, D> {
    pub fn new(device: &'d D, config: &ComputeConfig) -> Result<Self> {
        validate_radix_bits(config.radix_bits)?;
        if config.key_bits == 0 || config.key_bits > KEY_BITS {
            return Err(ComputeError::InvalidConfig(format!(
                "key width {} bits is outside 1..={KEY_BITS}",
                config.key_bits
            )));
        }
        let scanner = PrefixScanner::new(device, config)?;
        let flags = CompileFlags::new(config.work_group_size, ElementKind::U32)
            .with_radix_bits(config.radix_bits);

        Ok(Self {
            device,
            fill_bit_count: device.compile(KernelModule::Radix, "fill_bit_count", &flags)?,
            move_numbers: device.compile(KernelModule::Radix, "move_numbers", &flags)?,
            scanner,
            work_group_size: config.work_group_size,
            radix_bits: config.radix_bits,
            key_bits: config.key_bits,
        })
    }

    /// Number of digit passes a sort of more than one key runs
    pub fn num_passes(&self) -> usize {
        digit_starts(self.key_bits, self.radix_bits).len()
    }

    /// Sorts `array` ascending and returns the number of digit passes run.
    ///
    /// On return `array` holds the allocation the last pass scattered into;
    /// the one it held before is released.
    #[tracing::instrument(skip_all, fields(n = array.len(), radix_bits = self.radix_bits))]
    pub fn sort_in_place(&self, array: &mut DeviceArray<D, u32>) -> Result<usize> {
        let n = array.len();
        if n <= 1 {
            return Ok(0);
        }

        let digits = 1usize << self.radix_bits;
        let slots = n
            .checked_mul(digits)
            .ok_or(ComputeError::BufferSizeOverflow(n, digits))?;
        let num_elements = extent(n)?;
        let work = WorkDescriptor::linear(self.work_group_size, num_elements);

        let counts = self.device.allocate::<u32>(slots)?;
        let mut scratch = self.device.allocate::<u32>(n)?;

        let starts = digit_starts(self.key_bits, self.radix_bits);
        for &start in &starts {
            let params = RadixParams {
                num_elements,
                start,
            };
            tracing::debug!(start, "radix digit pass");

            self.device.launch(
                &self.fill_bit_count,
                &work,
                &[array.memory(), counts.memory()],
                bytemuck::bytes_of(&params),
            )?;
            let scanned = self.scanner.scan(&counts)?;
            self.device.launch(
                &self.move_numbers,
                &work,
                &[array.memory(), scratch.memory(), scanned.prefix.memory()],
                bytemuck::bytes_of(&params),
            )?;

            self.device.swap(array, &mut scratch)?;
        }
        Ok(starts.len())
    }

    /// Sorts a host slice through the device
    pub fn sort(&self, data: &mut [u32]) -> Result<usize> {
        if data.len() <= 1 {
            return Ok(0);
        }
        let mut array = self.device.to_device(data)?;
        let passes = self.sort_in_place(&mut array)?;
        self.device.download(&array, data)?;
        Ok(passes)
    }
}

/// Radix sort of a host slice with the widths in `config`
pub fn radix_sort<D: ComputeDevice>(
    device: &D,
    data: &mut [u32],
    config: &ComputeConfig,
) -> Result<usize> {
    RadixSorter::new(device, config)?.sort(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{runners::CpuDevice, verify_sorted};
    use pretty_assertions::assert_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use shared::SortOrder;

    fn setup(config: ComputeConfig) -> (CpuDevice, ComputeConfig) {
        let config = config.with_threads(2);
        (CpuDevice::new(&config).unwrap(), config)
    }

    #[test]
    fn test_digit_starts() {
        assert_eq!(digit_starts(4, 2), vec![0, 2]);
        assert_eq!(digit_starts(32, 2).len(), 16);
        // the last digit is narrower than the radix
        assert_eq!(digit_starts(32, 3).last(), Some(&30));
        assert_eq!(digit_starts(32, 3).len(), 11);
        assert_eq!(digit_starts(32, 8), vec![0, 8, 16, 24]);
    }

    #[test]
    fn test_radix_four_bit_keys() {
        let (device, config) = setup(
            ComputeConfig::default()
                .with_work_group_size(4)
                .with_radix_bits(2)
                .with_key_bits(4),
        );
        let mut data = vec![5u32, 3, 8, 1];
        assert_eq!(radix_sort(&device, &mut data, &config).unwrap(), 2);
        assert_eq!(data, vec![1, 3, 5, 8]);
        assert_eq!(device.count_launches("fill_bit_count"), 2);
        assert_eq!(device.count_launches("move_numbers"), 2);
    }

    #[test]
    fn test_radix_full_width_random() {
        let (device, config) = setup(ComputeConfig::default().with_work_group_size(64));
        let mut rng = StdRng::seed_from_u64(5);
        let mut data: Vec<u32> = (0..1500).map(|_| rng.gen()).collect();
        let mut expected = data.clone();
        expected.sort_unstable();

        let passes = radix_sort(&device, &mut data, &config).unwrap();
        assert_eq!(passes, 16);
        assert!(verify_sorted(&data, SortOrder::Ascending));
        assert_eq!(data, expected);
    }

    #[test]
    fn test_radix_uneven_digit_width() {
        let (device, config) = setup(
            ComputeConfig::default()
                .with_work_group_size(16)
                .with_radix_bits(3),
        );
        let mut data = vec![u32::MAX, 0, 1 << 31, 7, 1 << 30, 42, 42, u32::MAX - 1, 9];
        let mut expected = data.clone();
        expected.sort_unstable();
        assert_eq!(radix_sort(&device, &mut data, &config).unwrap(), 11);
        assert_eq!(data, expected);
    }

    #[test]
    fn test_radix_trivial_lengths() {
        let (device, config) = setup(ComputeConfig::default());
        let mut empty: Vec<u32> = vec![];
        assert_eq!(radix_sort(&device, &mut empty, &config).unwrap(), 0);
        let mut single = vec![17u32];
        assert_eq!(radix_sort(&device, &mut single, &config).unwrap(), 0);
        assert_eq!(single, vec![17]);
        assert_eq!(device.launch_count(), 0);
    }

    #[test]
    fn test_radix_rejects_bad_widths() {
        let device = CpuDevice::new(&ComputeConfig::default().with_threads(1)).unwrap();
        let config = ComputeConfig::default().with_radix_bits(0);
        assert!(matches!(
            RadixSorter::new(&device, &config),
            Err(ComputeError::InvalidRadixBits(0))
        ));
        let config = ComputeConfig::default().with_key_bits(0);
        assert!(matches!(
            RadixSorter::new(&device, &config),
            Err(ComputeError::InvalidConfig(_))
        ));
    }
}
