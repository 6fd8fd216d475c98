//! Pooling.
//!
//! Non-overlapping `n` x `n` windows are reduced to one value each: a [`MatrixFeeder`] with stride `n` feeds a
//! [`TreeReduction`] wrapped into a stream stage.

use tracing::debug;

use crate::*;

/// Configuration of [`Pooling`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolingConfig {
    /// Pixel width.
    pub width: u32,
    /// Shape of each input frame.
    pub image_shape: ImageShape,
    /// Pooling window size and stride.
    pub n: usize,
    /// Reduction applied to each window.
    pub mode: TreeOp,
}

/// Pooling stage.
///
/// Both image dimensions are multiples of `n`, so the final window of a frame is always emitted and carries `last`.
#[derive(Debug, Clone)]
pub struct Pooling {
    config: PoolingConfig,
    feeder: MatrixFeeder,
    reduction: StreamWrapper<TreeReduction>,
}

impl Pooling {
    /// Creates a new pooling stage.
    pub fn new(config: PoolingConfig) -> Result<Self, ConfigError> {
        let PoolingConfig { width, image_shape, n, mode } = config;
        if n == 0 {
            return Err(ConfigError::InvalidKernel);
        }
        if image_shape.width % n != 0 {
            return Err(ConfigError::NotMultiple { what: "image width", length: image_shape.width, n });
        }
        if image_shape.height % n != 0 {
            return Err(ConfigError::NotMultiple { what: "image height", length: image_shape.height, n });
        }

        let feeder = MatrixFeeder::new(MatrixFeederConfig { width, row_length: image_shape.width, n, invert: false, stride: n })?;
        let n_stages = clog2(n * n).max(1);
        let tree = TreeReduction::new(TreeConfig { input_width: width, n_stages, op: mode, reg_in: false, reg_out: false })?;

        debug!(?config, latency = tree.latency(), "pooling");
        Ok(Self { config, feeder, reduction: StreamWrapper::new(tree) })
    }

    /// Configuration.
    pub fn config(&self) -> &PoolingConfig { &self.config }

    /// Shape of each output frame.
    pub fn output_shape(&self) -> ImageShape {
        let PoolingConfig { image_shape, n, .. } = self.config;
        ImageShape::new(image_shape.height / n, image_shape.width / n)
    }

    /// Width of the results.
    pub fn output_width(&self) -> u32 {
        match self.config.mode {
            TreeOp::Sum => self.reduction.core().output_width(),
            TreeOp::Max | TreeOp::Min => self.config.width,
        }
    }

    fn flat_window(&self, ingress: &Valid<AxisValue<i64>>) -> Valid<AxisValue<Vec<i64>>> {
        self.feeder.fwd(ingress).map_inner(|beat| AxisValue::new(beat.payload.into_vec(), beat.tlast))
    }
}

impl Module for Pooling {
    type I = AxisChannel<i64>;
    type O = AxisChannel<i64>;

    fn fwd(&self, ingress: &Valid<AxisValue<i64>>) -> Valid<AxisValue<i64>> {
        self.reduction.fwd(&self.flat_window(ingress))
    }

    fn bwd(&self, ingress: &Valid<AxisValue<i64>>, egress: &Ready) -> Ready {
        let window_ready = self.reduction.bwd(&self.flat_window(ingress), egress);
        self.feeder.bwd(ingress, &window_ready)
    }

    fn tick(&mut self, ingress: &Valid<AxisValue<i64>>, egress: &Ready) {
        let window = self.flat_window(ingress);
        let window_ready = self.reduction.bwd(&window, egress);
        self.feeder.tick(ingress, &window_ready);
        self.reduction.tick(&window, egress);
    }
}
