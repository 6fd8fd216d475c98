//! Window assembler.
//!
//! [`RowFifos`] produce one column per pixel; [`SubmatrixRegisters`] shift the columns into an `n` x `n` register
//! file; [`MatrixFeeder`] hides the windows that straddle a row boundary or fall between strides.

use tracing::debug;

use crate::*;

/// Window register file.
#[derive(Debug, Clone)]
pub struct SubmatrixRegisters {
    invert: bool,
    grid: Matrix<i64>,
    valid: bool,
    last: bool,
}

impl SubmatrixRegisters {
    /// Creates an empty `n` x `n` register file.
    pub fn new(n: usize, invert: bool) -> Self { Self { invert, grid: Matrix::filled(n, n, 0), valid: false, last: false } }

    fn shift_in(&mut self, column: &Matrix<i64>) {
        let n = self.grid.cols();
        for row in 0..n {
            if self.invert {
                for col in (1..n).rev() {
                    self.grid[(row, col)] = self.grid[(row, col - 1)];
                }
                self.grid[(row, 0)] = column[(row, 0)];
            } else {
                for col in 0..n - 1 {
                    self.grid[(row, col)] = self.grid[(row, col + 1)];
                }
                self.grid[(row, n - 1)] = column[(row, 0)];
            }
        }
    }
}

impl Module for SubmatrixRegisters {
    type I = AxisChannel<Matrix<i64>>;
    type O = AxisChannel<Matrix<i64>>;

    fn fwd(&self, _ingress: &Valid<AxisValue<Matrix<i64>>>) -> Valid<AxisValue<Matrix<i64>>> {
        Valid::new(self.valid, AxisValue::new(self.grid.clone(), self.valid && self.last))
    }

    fn bwd(&self, _ingress: &Valid<AxisValue<Matrix<i64>>>, egress: &Ready) -> Ready {
        Ready::new(egress.ready || !self.valid)
    }

    fn tick(&mut self, ingress: &Valid<AxisValue<Matrix<i64>>>, egress: &Ready) {
        let out_accepted = self.valid && egress.ready;
        if ingress.accepted(self.bwd(ingress, egress)) {
            self.shift_in(&ingress.inner.payload);
            self.valid = true;
            self.last = ingress.inner.tlast;
        } else if out_accepted {
            self.valid = false;
        }
    }
}

/// Configuration of [`MatrixFeeder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixFeederConfig {
    /// Pixel width.
    pub width: u32,
    /// Pixels per image row.
    pub row_length: usize,
    /// Window size.
    pub n: usize,
    /// Rotate windows by 180 degrees.
    pub invert: bool,
    /// Distance between emitted windows, in both directions.
    pub stride: usize,
}

/// Sliding-window assembler: pixel stream in, `n` x `n` window stream out.
///
/// With `invert` unset, window `[r][c]` is `image[y + r][x + c]`, so a dot product with a kernel is a correlation.
/// With `invert` set the window is rotated by 180 degrees, which turns the same dot product into a convolution.
#[derive(Debug, Clone)]
pub struct MatrixFeeder {
    config: MatrixFeederConfig,
    row_fifos: RowFifos,
    registers: SubmatrixRegisters,
    col: WrapCounter,
    tap_row: usize,
}

impl MatrixFeeder {
    /// Creates a new feeder.
    pub fn new(config: MatrixFeederConfig) -> Result<Self, ConfigError> {
        if config.stride == 0 {
            return Err(ConfigError::InvalidStride);
        }
        let row_fifos = RowFifos::new(config.width, config.row_length, config.n, config.invert)?;

        debug!(?config, "matrix feeder");
        Ok(Self {
            config,
            row_fifos,
            registers: SubmatrixRegisters::new(config.n, config.invert),
            col: WrapCounter::new(config.row_length),
            tap_row: 0,
        })
    }

    /// Configuration.
    pub fn config(&self) -> &MatrixFeederConfig { &self.config }

    /// Whether the window currently in the register file is hidden.
    fn suppressed(&self) -> bool {
        let MatrixFeederConfig { n, stride, .. } = self.config;
        let col = self.col.value();
        col < n - 1 || (col - (n - 1)) % stride != 0 || self.tap_row % stride != 0
    }

    fn registers_ready(&self, egress: &Ready) -> Ready {
        if self.suppressed() {
            Ready::new(true)
        } else {
            *egress
        }
    }
}

impl Module for MatrixFeeder {
    type I = AxisChannel<i64>;
    type O = AxisChannel<Matrix<i64>>;

    fn fwd(&self, ingress: &Valid<AxisValue<i64>>) -> Valid<AxisValue<Matrix<i64>>> {
        let window = self.registers.fwd(&self.row_fifos.fwd(ingress));
        if self.suppressed() {
            Valid::invalid()
        } else {
            window
        }
    }

    fn bwd(&self, ingress: &Valid<AxisValue<i64>>, egress: &Ready) -> Ready {
        let column = self.row_fifos.fwd(ingress);
        let column_ready = self.registers.bwd(&column, &self.registers_ready(egress));
        self.row_fifos.bwd(ingress, &column_ready)
    }

    fn tick(&mut self, ingress: &Valid<AxisValue<i64>>, egress: &Ready) {
        let column = self.row_fifos.fwd(ingress);
        let window = self.registers.fwd(&column);
        let window_ready = self.registers_ready(egress);
        let column_ready = self.registers.bwd(&column, &window_ready);

        if window.is_last(window_ready) {
            self.col.clear();
            self.tap_row = 0;
        } else if window.accepted(window_ready) && self.col.step(true) {
            self.tap_row += 1;
        }

        self.row_fifos.tick(ingress, &column_ready);
        self.registers.tick(&column, &window_ready);
    }
}
