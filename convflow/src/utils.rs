//! Utilities.

use std::cmp::Ordering;

/// Returns ceiling log2.
pub const fn clog2(value: usize) -> usize {
    if value == 0 {
        0
    } else {
        (usize::BITS - (value - 1).leading_zeros()) as usize
    }
}

/// Returns the minimum two's complement width that can hold `value`.
///
/// ### Example
/// ```
/// use convflow::required_bits;
///
/// assert_eq!(required_bits(127), 8);
/// assert_eq!(required_bits(128), 9);
/// assert_eq!(required_bits(-128), 8);
/// assert_eq!(required_bits(-129), 9);
/// ```
pub fn required_bits(value: i128) -> u32 {
    match value.cmp(&0) {
        Ordering::Greater => i128::BITS - value.leading_zeros() + 1,
        Ordering::Less => {
            let magnitude = value.unsigned_abs();
            let clog2 = if magnitude == 1 { 0 } else { u128::BITS - (magnitude - 1).leading_zeros() };
            clog2 + 1
        }
        Ordering::Equal => 1,
    }
}

/// Truncates `value` to `width` bits and sign-extends the result, like a `width`-bit signed register does.
pub fn wrap_signed(value: i128, width: u32) -> i128 {
    assert!((1..=i128::BITS).contains(&width), "Width {} is not representable", width);
    let shift = i128::BITS - width;
    (value << shift) >> shift
}

/// Returns the smallest value of a `width`-bit signed integer.
pub fn min_signed(width: u32) -> i128 {
    assert!((1..i128::BITS).contains(&width), "Width {} is not representable", width);
    -(1i128 << (width - 1))
}

/// Returns the largest value of a `width`-bit signed integer.
pub fn max_signed(width: u32) -> i128 { -min_signed(width) - 1 }
