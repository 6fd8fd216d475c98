//! Dot-product unit.
//!
//! Streams a window and a coefficient matrix of the same shape through one [`Mac`], one element pair per cycle.
//!
//! # Note
//!
//! The data flow is controlled by `input_a` only. `input_b` is assumed valid on every cycle and its ready is
//! `input_a.accepted()`, so the ready of `input_a` never waits on the valid of `input_b`.

use tracing::{debug, warn};

use crate::*;

/// Configuration of [`DotProduct`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DotProductConfig {
    /// Width of the window elements.
    pub input_width: u32,
    /// Width of the coefficients.
    pub coeff_width: u32,
    /// Shape of the window and of the coefficient matrix, as `(rows, cols)`.
    pub shape: (usize, usize),
    /// Width of the result.
    pub output_width: OutputWidth,
}

impl DotProductConfig {
    /// Number of elements per window.
    pub fn n_elements(&self) -> usize { self.shape.0 * self.shape.1 }

    /// Narrowest result width that holds every possible dot product.
    ///
    /// The worst case is every element at its most negative value, since `min_a * min_b` is the largest product.
    pub fn required_width(&self) -> u32 {
        let worst = min_signed(self.input_width) * min_signed(self.coeff_width) * self.n_elements() as i128;
        required_bits(worst)
    }
}

/// State of the dot-product FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for a window.
    Idle,
    /// Streaming a captured window through the MAC.
    Busy,
}

impl Phase {
    /// Next state, given whether a window was accepted and whether the running product finished.
    pub fn next(self, accepted: bool, finished: bool) -> Self {
        match self {
            Self::Idle if accepted => Self::Busy,
            Self::Busy if finished => Self::Idle,
            phase => phase,
        }
    }
}

/// Dot-product unit.
#[derive(Debug, Clone)]
pub struct DotProduct {
    config: DotProductConfig,
    output_width: u32,
    warnings: Vec<ConfigWarning>,
    mac: Mac,
    phase: Phase,
    a: Vec<i64>,
    b: Vec<i64>,
    captured_last: bool,
    counter: usize,
    feed: usize,
    out: AxisValue<i64>,
    out_valid: bool,
}

impl DotProduct {
    /// Creates a new dot-product unit.
    pub fn new(config: DotProductConfig) -> Result<Self, ConfigError> {
        check_width(config.input_width)?;
        check_width(config.coeff_width)?;
        if config.n_elements() == 0 {
            return Err(ConfigError::InvalidKernel);
        }

        let (output_width, warning) = config.output_width.resolve(config.required_width())?;
        if let Some(warning) = warning {
            warn!(%warning, "dot product");
        }
        debug!(?config, output_width, "dot product");

        Ok(Self {
            config,
            output_width,
            warnings: warning.into_iter().collect(),
            mac: Mac::new(config.input_width, config.coeff_width, output_width)?,
            phase: Phase::Idle,
            a: vec![],
            b: vec![],
            captured_last: false,
            counter: 0,
            feed: 0,
            out: AxisValue::default(),
            out_valid: false,
        })
    }

    /// Configuration.
    pub fn config(&self) -> &DotProductConfig { &self.config }

    /// Width of the result.
    pub fn output_width(&self) -> u32 { self.output_width }

    /// Warnings raised at construction.
    pub fn warnings(&self) -> &[ConfigWarning] { &self.warnings }

    /// Current FSM state.
    pub fn phase(&self) -> Phase { self.phase }

    fn a_ready(&self, egress: &Ready) -> bool { self.phase == Phase::Idle && (egress.ready || !self.out_valid) }
}

impl Module for DotProduct {
    type I = (AxisChannel<Matrix<i64>>, AxisChannel<Matrix<i64>>);
    type O = AxisChannel<i64>;

    fn fwd(&self, _ingress: &Fwd<Self::I>) -> Valid<AxisValue<i64>> { Valid::new(self.out_valid, self.out.clone()) }

    fn bwd(&self, ingress: &Fwd<Self::I>, egress: &Ready) -> (Ready, Ready) {
        let a_ready = self.a_ready(egress);
        (Ready::new(a_ready), Ready::new(ingress.0.valid && a_ready))
    }

    fn tick(&mut self, ingress: &Fwd<Self::I>, egress: &Ready) {
        let out_accepted = self.out_valid && egress.ready;
        let (input_a, input_b) = ingress;

        match self.phase {
            Phase::Idle => {
                let accepted = input_a.accepted(Ready::new(self.a_ready(egress)));
                self.mac.tick(0, 0, true, false);

                if out_accepted {
                    self.out_valid = false;
                    self.out = AxisValue::default();
                }
                if accepted {
                    self.a = input_a.inner.payload.as_slice().to_vec();
                    self.b = input_b.inner.payload.as_slice().to_vec();
                    self.captured_last = input_a.inner.tlast;
                    self.counter = 0;
                    self.feed = 0;
                }
                self.phase = self.phase.next(accepted, false);
            }
            Phase::Busy => {
                let fired = self.mac.valid_o();
                let finished = fired && self.counter == self.config.n_elements() - 1;

                let a = self.a.get(self.feed).copied().unwrap_or(0);
                let b = self.b.get(self.feed).copied().unwrap_or(0);
                self.mac.tick(a, b, false, true);
                self.feed += 1;

                if finished {
                    self.out = AxisValue::new(self.mac.accumulator(), self.captured_last);
                    self.out_valid = true;
                } else if fired {
                    self.counter += 1;
                }
                self.phase = self.phase.next(false, finished);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use convflow::sim::*;

    use super::*;

    fn config(input_width: u32, shape: (usize, usize), output_width: OutputWidth) -> DotProductConfig {
        DotProductConfig { input_width, coeff_width: input_width, shape, output_width }
    }

    #[test]
    fn output_width_policy() {
        let auto = DotProduct::new(config(8, (3, 3), OutputWidth::Auto)).unwrap();
        assert_eq!(auto.output_width(), 19);
        assert!(auto.warnings().is_empty());

        let narrow = OutputWidth::Explicit { width: 16, allow_overflow: false };
        assert_eq!(
            DotProduct::new(config(8, (3, 3), narrow)).unwrap_err(),
            ConfigError::OutputWidthTooNarrow { requested: 16, required: 19 }
        );

        let wrapping = OutputWidth::Explicit { width: 16, allow_overflow: true };
        let allowed = DotProduct::new(config(8, (3, 3), wrapping)).unwrap();
        assert_eq!(allowed.output_width(), 16);
        assert_eq!(allowed.warnings(), &[ConfigWarning::NarrowOutput { requested: 16, required: 19 }]);

        assert_eq!(DotProduct::new(config(8, (0, 3), OutputWidth::Auto)).unwrap_err(), ConfigError::InvalidKernel);
    }

    #[test]
    fn phase_transitions() {
        assert_eq!(Phase::Idle.next(false, false), Phase::Idle);
        assert_eq!(Phase::Idle.next(true, false), Phase::Busy);
        assert_eq!(Phase::Busy.next(false, false), Phase::Busy);
        assert_eq!(Phase::Busy.next(false, true), Phase::Idle);
    }

    #[test]
    fn throughput_and_results() {
        let kernel = Matrix::from_rows(&[[1i64, -2], [3, -4]]);
        let windows = [Matrix::from_rows(&[[1i64, 1], [1, 1]]), Matrix::from_rows(&[[-128i64, 127], [0, 5]])];
        let mut source = Source::new(Burps::Never);
        source.push_frame(windows.iter().cloned());

        let dot = DotProduct::new(config(8, (2, 2), OutputWidth::Auto)).unwrap();
        let mut bench = Testbench::new((source, Constant::new(kernel.clone())), dot, Sink::new(Burps::Never));
        let cycles = bench.run_until(|_, _, sink| sink.len() == 2, 100).unwrap();

        assert_eq!(bench.receiver().payloads(), vec![1 - 2 + 3 - 4, -128 - 254 - 20]);
        assert_eq!(bench.receiver().frames().len(), 1);

        // Each window takes `n + MAC_LATENCY + 1` cycles; the last result is collected one cycle later.
        assert_eq!(cycles, 2 * (4 + MAC_LATENCY as u64 + 1) + 1);
        assert_eq!(bench.driver().1.accepted(), 2);
    }
}
