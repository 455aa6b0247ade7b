//! Compare-exchange kernels for the bitonic sorting network.

use shared::{DeviceElement, SortOrder, ThreadId};

/// Newtype wrapper for comparison distance
#[derive(Copy, Clone, Debug)]
pub struct ComparisonDistance(u32);

impl ComparisonDistance {
    #[inline]
    pub fn new(cur_size: u32) -> Self {
        Self(cur_size)
    }

    #[inline]
    fn find_partner(&self, thread_id: ThreadId) -> ThreadId {
        ThreadId::new(thread_id.as_u32() ^ self.0)
    }
}

/// Represents a comparison pair in the bitonic network
#[derive(Copy, Clone, Debug)]
pub struct ComparisonPair {
    lower: ThreadId,
    upper: ThreadId,
}

impl ComparisonPair {
    /// Only the lane with the lower index of a pair does the exchange
    #[inline]
    fn try_new(thread_id: ThreadId, partner: ThreadId) -> Option<Self> {
        (partner.as_u32() > thread_id.as_u32()).then_some(Self {
            lower: thread_id,
            upper: partner,
        })
    }

    #[inline]
    fn is_in_bounds(&self, block_base: u32, block_len: usize) -> bool {
        ((self.upper.as_u32() - block_base) as usize) < block_len
    }
}

/// Encapsulates the bitonic sort direction logic
#[derive(Copy, Clone, Debug)]
pub struct BitonicDirection {
    block_ascending: bool,
}

impl BitonicDirection {
    /// Sequences of length `size` alternate direction; the last merge
    /// (`size` covering the whole array) is uniformly in `global_order`.
    #[inline]
    fn from_position(thread_id: ThreadId, size: u32, global_order: SortOrder) -> Self {
        let block_ascending = thread_id.as_u32() & size == 0;

        Self {
            block_ascending: match global_order {
                SortOrder::Ascending => block_ascending,
                SortOrder::Descending => !block_ascending,
            },
        }
    }

    #[inline]
    fn should_swap<T: PartialOrd>(&self, val_i: T, val_j: T) -> bool {
        if self.block_ascending {
            val_i > val_j
        } else {
            val_i < val_j
        }
    }
}

#[inline]
fn compare_and_swap<T>(
    block: &mut [T],
    block_base: u32,
    pair: ComparisonPair,
    direction: BitonicDirection,
) where
    T: Copy + PartialOrd,
{
    let i = (pair.lower.as_u32() - block_base) as usize;
    let j = (pair.upper.as_u32() - block_base) as usize;

    let val_i = block[i];
    let val_j = block[j];

    if direction.should_swap(val_i, val_j) {
        block[i] = val_j;
        block[j] = val_i;
    }
}

/// One lane of one compare-exchange sub-stage.
///
/// `block` is the slice of the array starting at global index `block_base`
/// that contains both this lane and its partner.
#[inline]
pub fn bitonic_sort_step<T: DeviceElement>(
    thread_id: ThreadId,
    block: &mut [T],
    block_base: u32,
    distance: ComparisonDistance,
    size: u32,
    sort_order: SortOrder,
) {
    let partner = distance.find_partner(thread_id);

    if let Some(pair) = ComparisonPair::try_new(thread_id, partner) {
        if pair.is_in_bounds(block_base, block.len()) {
            let direction = BitonicDirection::from_position(thread_id, size, sort_order);
            compare_and_swap(block, block_base, pair, direction);
        }
    }
}

/// A single sub-stage at distance `cur_size`, for distances too wide to fit
/// in one work-group. `block` holds `2 * cur_size` elements so every pair it
/// touches is local to it.
pub fn bitonic_large_array<T: DeviceElement>(
    block: &mut [T],
    block_base: u32,
    cur_size: u32,
    size: u32,
    sort_order: SortOrder,
) {
    let distance = ComparisonDistance::new(cur_size);
    for lane in 0..block.len() as u32 {
        bitonic_sort_step(
            ThreadId::new(block_base + lane),
            block,
            block_base,
            distance,
            size,
            sort_order,
        );
    }
}

/// Every remaining sub-stage `cur_size, cur_size / 2, ..., 1` of a merge,
/// run inside one work-group. Requires `2 * cur_size <= block.len()` and a
/// block aligned to its own length.
pub fn bitonic_small_array<T: DeviceElement>(
    block: &mut [T],
    block_base: u32,
    cur_size: u32,
    size: u32,
    sort_order: SortOrder,
) {
    let mut distance = cur_size;
    while distance > 0 {
        let step = ComparisonDistance::new(distance);
        for lane in 0..block.len() as u32 {
            bitonic_sort_step(
                ThreadId::new(block_base + lane),
                block,
                block_base,
                step,
                size,
                sort_order,
            );
        }
        // barrier(CLK_LOCAL_MEM_FENCE)
        distance /= 2;
    }
}
