//! Reference models.
//!
//! Whole-frame computations that the streaming stages must reproduce exactly.

use itertools::iproduct;

use crate::*;

/// Valid-mode 2-D correlation: `out[y][x] = sum(image[y + r][x + c] * kernel[r][c])`.
///
/// # Panics
///
/// Panics if the kernel is larger than the image.
pub fn correlate_valid(image: &Matrix<i64>, kernel: &Matrix<i64>) -> Matrix<i64> {
    assert!(kernel.rows() <= image.rows() && kernel.cols() <= image.cols(), "kernel larger than image");
    let rows = image.rows() - kernel.rows() + 1;
    let cols = image.cols() - kernel.cols() + 1;
    Matrix::from_fn(rows, cols, |y, x| {
        kernel.indexes().map(|(r, c)| i128::from(image[(y + r, x + c)]) * i128::from(kernel[(r, c)])).sum::<i128>() as i64
    })
}

/// Valid-mode 2-D convolution: correlation with the kernel rotated by 180 degrees.
pub fn convolve_valid(image: &Matrix<i64>, kernel: &Matrix<i64>) -> Matrix<i64> { correlate_valid(image, &kernel.rotated()) }

/// Non-overlapping `n` x `n` pooling.
///
/// # Panics
///
/// Panics if `n` does not divide both image dimensions.
pub fn pool(image: &Matrix<i64>, n: usize, op: TreeOp) -> Matrix<i64> {
    assert!(n > 0 && image.rows() % n == 0 && image.cols() % n == 0, "{} does not divide the image", n);
    Matrix::from_fn(image.rows() / n, image.cols() / n, |y, x| {
        iproduct!(0..n, 0..n).map(|(r, c)| image[(y * n + r, x * n + c)]).reduce(|acc, v| op.apply(acc, v)).unwrap_or(0)
    })
}

/// Leaky ReLU on a `width`-bit value: negatives are divided by `2^(width - leak)` rounding down, or zeroed if
/// `leak` is 0.
pub fn relu(value: i64, width: u32, leak: u32) -> i64 {
    if value >= 0 {
        value
    } else if leak == 0 {
        0
    } else {
        value.div_euclid(1 << (width - leak))
    }
}

/// Top-left aligned resize: pixels outside the image read as `fill_value`.
pub fn resize(image: &Matrix<i64>, shape: ImageShape, fill_value: i64) -> Matrix<i64> {
    Matrix::from_fn(shape.height, shape.width, |y, x| image.get(y, x).copied().unwrap_or(fill_value))
}

/// Wraps every pixel to a `width`-bit signed value.
pub fn wrap_image(image: &Matrix<i64>, width: u32) -> Matrix<i64> {
    image.map(|value| wrap_signed(i128::from(*value), width) as i64)
}
