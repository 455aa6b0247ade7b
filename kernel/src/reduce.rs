//! Block reduction: one work-group in, one value out.

use shared::{CombineOp, DeviceElement};

/// Reduces the work-group `group_id` of `input` to a single value.
///
/// `local` is the work-group's local memory with one slot per lane, so its
/// length is the work-group width. Lanes past the end of `input` load the
/// operator identity.
pub fn block_reduce<T: DeviceElement>(
    input: &[T],
    group_id: usize,
    local: &mut [T],
    op: CombineOp,
) -> T {
    let start = group_id * local.len();
    for (lane, slot) in local.iter_mut().enumerate() {
        *slot = input
            .get(start + lane)
            .copied()
            .unwrap_or_else(|| op.identity());
    }

    // Tree reduction; each round folds the upper half onto the lower half.
    let mut active = local.len();
    while active > 1 {
        let half = active.div_ceil(2);
        for lane in 0..active - half {
            local[lane] = op.combine(local[lane], local[lane + half]);
        }
        active = half;
    }

    local.first().copied().unwrap_or_else(|| op.identity())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_each_group() {
        let input: Vec<u32> = (1..=10).collect();
        let mut local = vec![0u32; 4];
        assert_eq!(block_reduce(&input, 0, &mut local, CombineOp::Sum), 10);
        assert_eq!(block_reduce(&input, 1, &mut local, CombineOp::Sum), 26);
        // tail group only has 9 and 10
        assert_eq!(block_reduce(&input, 2, &mut local, CombineOp::Sum), 19);
    }

    #[test]
    fn max_pads_with_lowest() {
        let input = [-5i32, -9, -2];
        let mut local = vec![0i32; 8];
        assert_eq!(block_reduce(&input, 0, &mut local, CombineOp::Max), -2);
    }

    #[test]
    fn odd_width_tree() {
        let input = [3.0f32, 1.0, 4.0, 1.0, 5.0];
        let mut local = vec![0.0f32; 5];
        assert_eq!(block_reduce(&input, 0, &mut local, CombineOp::Max), 5.0);
        assert_eq!(block_reduce(&input, 0, &mut local, CombineOp::Sum), 14.0);
    }
}
