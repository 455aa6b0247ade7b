#![allow(dead_code)]

use rand::{rngs::StdRng, Rng, SeedableRng};
use workgroup_passes::{ComputeConfig, CpuDevice};

pub fn device(config: &ComputeConfig) -> CpuDevice {
    CpuDevice::new(config).unwrap()
}

/// Small work-groups so modest inputs still take several passes
pub fn small_config() -> ComputeConfig {
    ComputeConfig::default()
        .with_work_group_size(4)
        .with_tile_size(3)
        .with_threads(2)
}

pub fn random_i32(len: usize, seed: u64) -> Vec<i32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(-1000..=1000)).collect()
}

pub fn random_u32(len: usize, seed: u64) -> Vec<u32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen()).collect()
}

pub fn cpu_inclusive_scan(data: &[i32]) -> Vec<i32> {
    data.iter()
        .scan(0i32, |acc, v| {
            *acc = acc.wrapping_add(*v);
            Some(*acc)
        })
        .collect()
}

pub fn cpu_max_prefix(data: &[i32]) -> i32 {
    cpu_inclusive_scan(data).into_iter().fold(0, i32::max)
}

pub fn cpu_transpose<T: Copy + Default>(data: &[T], rows: usize, cols: usize) -> Vec<T> {
    let mut out = vec![T::default(); data.len()];
    for r in 0..rows {
        for c in 0..cols {
            out[c * rows + r] = data[r * cols + c];
        }
    }
    out
}
