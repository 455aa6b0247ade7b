//! Both phases of the work-group prefix sum.

use shared::DeviceElement;

/// Inclusive prefix sum of one work-group's elements into `output`.
/// Returns the work-group total, which the host scans in the next level.
pub fn local_inclusive_scan<T: DeviceElement>(input: &[T], output: &mut [T]) -> T {
    let mut running = T::zero();
    for (src, dst) in input.iter().zip(output.iter_mut()) {
        running = running.accumulate(*src);
        *dst = running;
    }
    running
}

/// Adds the scanned total of every preceding work-group to one block.
pub fn apply_block_offset<T: DeviceElement>(block: &mut [T], offset: T) {
    for value in block.iter_mut() {
        *value = offset.accumulate(*value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn local_scan_returns_total() {
        let input = [3i32, -1, 4, 1];
        let mut output = [0i32; 4];
        let total = local_inclusive_scan(&input, &mut output);
        assert_eq!(output, [3, 2, 6, 7]);
        assert_eq!(total, 7);
    }

    #[test]
    fn offsets_shift_a_block() {
        let mut block = [-5i32, 4, 6, -2];
        apply_block_offset(&mut block, 7);
        assert_eq!(block, [2, 11, 13, 5]);
    }
}
