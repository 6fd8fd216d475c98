//! Pipelined multiply-accumulate unit.

use static_assertions::const_assert;

use crate::*;

/// Enabled cycles between issuing a pair of operands and its product reaching the accumulator.
pub const MAC_LATENCY: usize = 5;

const_assert!(MAC_LATENCY >= 2);

/// Multiply-accumulate pipeline.
///
/// Stages, in order: operand capture, operand registration, multiply, product registration, accumulate. Every
/// stage advances only on an enabled cycle, and `clear` resets all of them.
#[derive(Debug, Clone)]
pub struct Mac {
    input_width: u32,
    coeff_width: u32,
    output_width: u32,
    captured: (i128, i128),
    operands: (i128, i128),
    product: i128,
    product_r: i128,
    accumulator: i128,
    valid: [bool; MAC_LATENCY],
}

impl Mac {
    /// Creates a cleared MAC.
    pub fn new(input_width: u32, coeff_width: u32, output_width: u32) -> Result<Self, ConfigError> {
        let input_width = check_width(input_width)?;
        let coeff_width = check_width(coeff_width)?;
        if !(1..=MAX_OUTPUT_WIDTH).contains(&output_width) {
            return Err(ConfigError::InvalidWidth { width: output_width, max: MAX_OUTPUT_WIDTH });
        }

        Ok(Self {
            input_width,
            coeff_width,
            output_width,
            captured: (0, 0),
            operands: (0, 0),
            product: 0,
            product_r: 0,
            accumulator: 0,
            valid: [false; MAC_LATENCY],
        })
    }

    /// Width of the product register.
    pub fn product_width(&self) -> u32 { self.input_width + self.coeff_width + 1 }

    /// Accumulator width.
    pub fn output_width(&self) -> u32 { self.output_width }

    /// Current accumulator value.
    pub fn accumulator(&self) -> i64 { self.accumulator as i64 }

    /// Whether the accumulator includes the product issued `MAC_LATENCY` enabled cycles ago.
    pub fn valid_o(&self) -> bool { self.valid[MAC_LATENCY - 1] }

    /// Commits one cycle.
    pub fn tick(&mut self, a: i64, b: i64, clear: bool, enable: bool) {
        if clear {
            self.captured = (0, 0);
            self.operands = (0, 0);
            self.product = 0;
            self.product_r = 0;
            self.accumulator = 0;
            self.valid = [false; MAC_LATENCY];
            return;
        }
        if !enable {
            return;
        }

        self.accumulator = wrap_signed(self.accumulator + self.product_r, self.output_width);
        self.product_r = self.product;
        self.product = wrap_signed(self.operands.0 * self.operands.1, self.product_width());
        self.operands = self.captured;
        self.captured = (wrap_signed(i128::from(a), self.input_width), wrap_signed(i128::from(b), self.coeff_width));

        self.valid.rotate_right(1);
        self.valid[0] = true;
    }
}
