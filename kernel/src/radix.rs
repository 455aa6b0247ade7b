//! Digit histogram and scatter kernels for LSD radix sort.
//!
//! The count buffer is digit-major: slot `digit * n + i` is 1 when element
//! `i` carries `digit` at the current position. An inclusive scan over the
//! whole buffer therefore yields, at that slot, one past the element's
//! destination, with equal digits kept in input order.

#[inline]
pub fn digit(value: u32, start: u32, radix_bits: u32) -> u32 {
    let mask = (1u32 << radix_bits) - 1;
    value.checked_shr(start).unwrap_or(0) & mask
}

/// Fills the count row of one digit value.
pub fn fill_bit_count(
    input: &[u32],
    row: &mut [u32],
    digit_value: u32,
    start: u32,
    radix_bits: u32,
) {
    for (value, count) in input.iter().zip(row.iter_mut()) {
        *count = (digit(*value, start, radix_bits) == digit_value) as u32;
    }
}

/// Destination of element `index` after the current digit pass, read from
/// the scanned count buffer. `None` if the scan does not cover the slot.
#[inline]
pub fn scatter_slot(
    value: u32,
    index: usize,
    num_elements: usize,
    scanned_counts: &[u32],
    start: u32,
    radix_bits: u32,
) -> Option<usize> {
    let d = digit(value, start, radix_bits) as usize;
    scanned_counts
        .get(d * num_elements + index)
        .and_then(|&end| (end as usize).checked_sub(1))
}
