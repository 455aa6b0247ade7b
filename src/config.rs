//! Tunables shared by the device and the orchestrators

use crate::error::{ComputeError, Result};
use shared::{KEY_BITS, MAX_RADIX_BITS, RADIX_BITS, TILE_SIZE, WORKGROUP_SIZE};
use std::str::FromStr;

pub const ENV_WORK_GROUP_SIZE: &str = "PASSES_WORK_GROUP_SIZE";
pub const ENV_TILE_SIZE: &str = "PASSES_TILE_SIZE";
pub const ENV_RADIX_BITS: &str = "PASSES_RADIX_BITS";
pub const ENV_KEY_BITS: &str = "PASSES_KEY_BITS";
pub const ENV_THREADS: &str = "PASSES_THREADS";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComputeConfig {
    /// Width of every 1-D work-group; compiled into the kernels
    pub work_group_size: u32,
    /// Edge of the square transpose tile
    pub tile_size: u32,
    /// Key bits consumed per radix pass
    pub radix_bits: u32,
    /// Bit width of radix sort keys
    pub key_bits: u32,
    /// Worker threads of the software device
    pub threads: usize,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            work_group_size: WORKGROUP_SIZE,
            tile_size: TILE_SIZE,
            radix_bits: RADIX_BITS,
            key_bits: KEY_BITS,
            threads: num_cpus::get(),
        }
    }
}

impl ComputeConfig {
    /// Defaults overridden by any `PASSES_*` variable present in the environment
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            work_group_size: env_or(ENV_WORK_GROUP_SIZE, defaults.work_group_size)?,
            tile_size: env_or(ENV_TILE_SIZE, defaults.tile_size)?,
            radix_bits: env_or(ENV_RADIX_BITS, defaults.radix_bits)?,
            key_bits: env_or(ENV_KEY_BITS, defaults.key_bits)?,
            threads: env_or(ENV_THREADS, defaults.threads)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_work_group_size(mut self, work_group_size: u32) -> Self {
        self.work_group_size = work_group_size;
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_radix_bits(mut self, radix_bits: u32) -> Self {
        self.radix_bits = radix_bits;
        self
    }

    pub fn with_key_bits(mut self, key_bits: u32) -> Self {
        self.key_bits = key_bits;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_work_group_size(self.work_group_size)?;
        if self.tile_size == 0 {
            return Err(ComputeError::InvalidConfig(
                "tile size must be at least 1".into(),
            ));
        }
        validate_radix_bits(self.radix_bits)?;
        if self.key_bits == 0 || self.key_bits > KEY_BITS {
            return Err(ComputeError::InvalidConfig(format!(
                "key width {} bits is outside 1..={KEY_BITS}",
                self.key_bits
            )));
        }
        if self.threads == 0 {
            return Err(ComputeError::InvalidConfig(
                "at least one worker thread is required".into(),
            ));
        }
        Ok(())
    }
}

pub(crate) fn validate_work_group_size(work_group_size: u32) -> Result<()> {
    if work_group_size < 2 || !work_group_size.is_power_of_two() {
        return Err(ComputeError::InvalidWorkGroupSize(work_group_size));
    }
    Ok(())
}

pub(crate) fn validate_radix_bits(radix_bits: u32) -> Result<()> {
    if radix_bits == 0 || radix_bits > MAX_RADIX_BITS {
        return Err(ComputeError::InvalidRadixBits(radix_bits));
    }
    Ok(())
}

fn env_or<T: FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ComputeError::InvalidConfig(format!("{name}={raw} is not a valid value"))),
        Err(std::env::VarError::NotPresent) => Ok(default),
        Err(e) => Err(e.into()),
    }
}
