//! Tiled matrix transpose, a single 2-D launch.

use crate::{
    config::ComputeConfig,
    device::{extent, CompileFlags, ComputeDevice, DeviceArray, KernelModule, WorkDescriptor},
    error::{ComputeError, Result},
};
use shared::{DeviceElement, TransposeParams};
use std::marker::PhantomData;

pub struct MatrixTranspose<'d, D: ComputeDevice, T> {
    device: &'d D,
    kernel: D::Kernel,
    tile_size: u32,
    _element: PhantomData<T>,
}

impl<'d, D: ComputeDevice, T: DeviceElement> MatrixTranspose<'d, D, T> {
    pub fn new(device: &'d D, config: &ComputeConfig) -> Result<Self> {
        if config.tile_size == 0 {
            return Err(ComputeError::InvalidConfig("tile size must be at least 1".into()));
        }
        // the tile edge is the work-group width of this kernel
        let flags = CompileFlags::new(config.tile_size, T::KIND);
        Ok(Self {
            device,
            kernel: device.compile(KernelModule::Transpose, "matrix_transpose", &flags)?,
            tile_size: config.tile_size,
            _element: PhantomData,
        })
    }

    /// Transposes a row-major `rows x cols` array into a new `cols x rows` one.
    #[tracing::instrument(skip_all, fields(rows = rows, cols = cols))]
    pub fn transpose(
        &self,
        input: &DeviceArray<D, T>,
        rows: usize,
        cols: usize,
    ) -> Result<DeviceArray<D, T>> {
        let len = input.len();
        if rows.checked_mul(cols) != Some(len) {
            return Err(ComputeError::ShapeMismatch { rows, cols, len });
        }
        let output = self.device.allocate::<T>(len)?;
        if len == 0 {
            return Ok(output);
        }

        let params = TransposeParams {
            rows: extent(rows)?,
            cols: extent(cols)?,
        };
        let work = WorkDescriptor::tiled(self.tile_size, params.cols, params.rows);
        tracing::debug!(workgroups = ?work.num_workgroups(), "transpose pass");
        self.device.launch(
            &self.kernel,
            &work,
            &[input.memory(), output.memory()],
            bytemuck::bytes_of(&params),
        )?;
        Ok(output)
    }
}

/// Transposes a host matrix through the device
pub fn transpose<D: ComputeDevice, T: DeviceElement>(
    device: &D,
    data: &[T],
    rows: usize,
    cols: usize,
    config: &ComputeConfig,
) -> Result<Vec<T>> {
    let input = device.to_device(data)?;
    let output = MatrixTranspose::new(device, config)?.transpose(&input, rows, cols)?;
    device.to_host(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runners::CpuDevice;
    use pretty_assertions::assert_eq;

    fn setup(tile_size: u32) -> (CpuDevice, ComputeConfig) {
        let config = ComputeConfig::default()
            .with_tile_size(tile_size)
            .with_threads(2);
        (CpuDevice::new(&config).unwrap(), config)
    }

    #[test]
    fn test_transpose_2x3() {
        let (device, config) = setup(16);
        let data = [1i32, 2, 3, 4, 5, 6];
        assert_eq!(
            transpose(&device, &data, 2, 3, &config).unwrap(),
            vec![1, 4, 2, 5, 3, 6]
        );
        assert_eq!(device.count_launches("matrix_transpose"), 1);
    }

    #[test]
    fn test_transpose_ragged_tiles() {
        let (device, config) = setup(4);
        let (rows, cols) = (7, 10);
        let data: Vec<f32> = (0..rows * cols).map(|v| v as f32).collect();
        let output = transpose(&device, &data, rows, cols, &config).unwrap();
        for r in 0..rows {
            for c in 0..cols {
                assert_eq!(output[c * rows + r], data[r * cols + c]);
            }
        }
        assert_eq!(device.launch_log()[0].workgroups, [3, 2, 1]);
    }

    #[test]
    fn test_transpose_twice_is_identity() {
        let (device, config) = setup(3);
        let data: Vec<u32> = (0..5 * 8).collect();
        let op = MatrixTranspose::new(&device, &config).unwrap();
        let input = device.to_device(&data).unwrap();
        let once = op.transpose(&input, 5, 8).unwrap();
        let twice = op.transpose(&once, 8, 5).unwrap();
        assert_eq!(device.to_host(&twice).unwrap(), data);
    }

    #[test]
    fn test_transpose_shape_mismatch() {
        let (device, config) = setup(16);
        assert!(matches!(
            transpose(&device, &[1u32, 2, 3], 2, 2, &config),
            Err(ComputeError::ShapeMismatch { rows: 2, cols: 2, len: 3 })
        ));
        assert!(transpose::<_, u32>(&device, &[], 0, 5, &config).unwrap().is_empty());
        assert_eq!(device.launch_count(), 0);
    }
}
