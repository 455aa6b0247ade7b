//! Tiled matrix transpose.

use shared::DeviceElement;

/// Transposes one band of output rows through a `tile x tile` local buffer.
///
/// `input` is `rows x cols` row-major and the output is `cols x rows`.
/// `band` indexes groups of `tile` output rows; `out_band` is that slice of
/// the output and may be shorter than `tile` rows at the bottom edge.
pub fn matrix_transpose_band<T: DeviceElement>(
    input: &[T],
    rows: usize,
    cols: usize,
    band: usize,
    tile: usize,
    local: &mut [T],
    out_band: &mut [T],
) {
    let band_rows = out_band.len() / rows;
    let col0 = band * tile;

    for tile_y in 0..rows.div_ceil(tile) {
        let row0 = tile_y * tile;

        for ly in 0..tile {
            for lx in 0..tile {
                let (r, c) = (row0 + ly, col0 + lx);
                if r < rows && c < cols {
                    local[ly * tile + lx] = input[r * cols + c];
                }
            }
        }
        // barrier(CLK_LOCAL_MEM_FENCE)
        for lx in 0..band_rows {
            for ly in 0..tile {
                let r = row0 + ly;
                if r < rows {
                    out_band[lx * rows + r] = local[ly * tile + lx];
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ragged_tiles() {
        // 3 x 5 input, tile 2: output is 5 x 3 in bands of two rows
        let input: Vec<u32> = (0..15).collect();
        let mut output = vec![0u32; 15];
        let mut local = vec![0u32; 4];
        for (band, out_band) in output.chunks_mut(2 * 3).enumerate() {
            matrix_transpose_band(&input, 3, 5, band, 2, &mut local, out_band);
        }
        assert_eq!(
            output,
            vec![0, 5, 10, 1, 6, 11, 2, 7, 12, 3, 8, 13, 4, 9, 14]
        );
    }
}
