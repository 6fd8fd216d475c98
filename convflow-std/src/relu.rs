//! Rectified linear unit.

use tracing::debug;

use crate::*;

/// Configuration of [`Relu`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReluConfig {
    /// Data width.
    pub width: u32,
    /// Bits of a negative value that leak through. 0 clamps negatives to 0; `width` passes them unchanged.
    pub leak: u32,
}

/// Stateless (leaky) ReLU stage.
///
/// A negative value is shifted arithmetically right by `width - leak`.
#[derive(Debug, Clone)]
pub struct Relu {
    config: ReluConfig,
}

impl Relu {
    /// Creates a new ReLU stage.
    pub fn new(config: ReluConfig) -> Result<Self, ConfigError> {
        let width = config.width;
        if !(1..=MAX_OUTPUT_WIDTH).contains(&width) {
            return Err(ConfigError::InvalidWidth { width, max: MAX_OUTPUT_WIDTH });
        }
        if config.leak > width {
            return Err(ConfigError::LeakOutOfRange { leak: config.leak, width });
        }

        debug!(?config, "relu");
        Ok(Self { config })
    }

    /// Applies the activation to one value.
    pub fn activate(&self, value: i64) -> i64 {
        let ReluConfig { width, leak } = self.config;
        let value = wrap_signed(i128::from(value), width) as i64;
        match (value < 0, leak) {
            (false, _) => value,
            (true, 0) => 0,
            (true, leak) => value >> (width - leak),
        }
    }
}

impl Module for Relu {
    type I = AxisChannel<i64>;
    type O = AxisChannel<i64>;

    fn fwd(&self, ingress: &Valid<AxisValue<i64>>) -> Valid<AxisValue<i64>> {
        ingress.clone().map_inner(|beat| AxisValue::new(self.activate(beat.payload), beat.tlast))
    }

    fn bwd(&self, _ingress: &Valid<AxisValue<i64>>, egress: &Ready) -> Ready { *egress }

    fn tick(&mut self, _ingress: &Valid<AxisValue<i64>>, _egress: &Ready) {}
}
