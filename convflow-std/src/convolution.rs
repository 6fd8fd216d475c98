//! Streaming 2-D convolution.
//!
//! ```text
//! pixels ──> MatrixFeeder ──> Farm ──> results
//!                               ^
//! coefficients ─────────────────┘
//! ```

use tracing::debug;

use crate::*;

/// Configuration of [`Convolution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvolutionConfig {
    /// Pixel width.
    pub input_width: u32,
    /// Coefficient width.
    pub coeff_width: u32,
    /// Pixels per image row.
    pub row_length: usize,
    /// Kernel size.
    pub n: usize,
    /// Number of dot-product cores.
    pub n_cores: usize,
    /// Convolve instead of correlate, i.e. rotate the kernel by 180 degrees.
    pub invert: bool,
    /// Width of the results.
    pub output_width: OutputWidth,
}

impl ConvolutionConfig {
    /// Pixels and coefficients of the same width, with an overflow-safe result width.
    pub fn new(width: u32, row_length: usize, n: usize, n_cores: usize) -> Self {
        Self { input_width: width, coeff_width: width, row_length, n, n_cores, invert: false, output_width: OutputWidth::Auto }
    }
}

/// Streaming convolution engine.
///
/// Ingress is a pair of a pixel stream and a coefficient stream; the coefficient stream must hold an `n` x `n`
/// matrix valid on every cycle. Results come out in raster order of the valid windows, one frame of
/// `(height - n + 1) * (width - n + 1)` results per input frame.
#[derive(Debug, Clone)]
pub struct Convolution {
    config: ConvolutionConfig,
    feeder: MatrixFeeder,
    farm: Farm,
}

impl Convolution {
    /// Creates a new convolution engine.
    pub fn new(config: ConvolutionConfig) -> Result<Self, ConfigError> {
        let feeder = MatrixFeeder::new(MatrixFeederConfig {
            width: config.input_width,
            row_length: config.row_length,
            n: config.n,
            invert: config.invert,
            stride: 1,
        })?;
        let dot_product = DotProductConfig {
            input_width: config.input_width,
            coeff_width: config.coeff_width,
            shape: (config.n, config.n),
            output_width: config.output_width,
        };
        let farm = Farm::new(FarmConfig { dot_product, n_cores: config.n_cores })?;

        debug!(?config, output_width = farm.output_width(), "convolution");
        Ok(Self { config, feeder, farm })
    }

    /// Configuration.
    pub fn config(&self) -> &ConvolutionConfig { &self.config }

    /// Width of the results.
    pub fn output_width(&self) -> u32 { self.farm.output_width() }

    /// Warnings raised at construction.
    pub fn warnings(&self) -> &[ConfigWarning] { self.farm.warnings() }

    /// The dot-product farm.
    pub fn farm(&self) -> &Farm { &self.farm }
}

impl Module for Convolution {
    type I = (AxisChannel<i64>, AxisChannel<Matrix<i64>>);
    type O = AxisChannel<i64>;

    fn fwd(&self, ingress: &Fwd<Self::I>) -> Valid<AxisValue<i64>> {
        let (pixels, coeffs) = ingress;
        self.farm.fwd(&(self.feeder.fwd(pixels), coeffs.clone()))
    }

    fn bwd(&self, ingress: &Fwd<Self::I>, egress: &Ready) -> (Ready, Ready) {
        let (pixels, coeffs) = ingress;
        let (window_ready, coeffs_ready) = self.farm.bwd(&(self.feeder.fwd(pixels), coeffs.clone()), egress);
        (self.feeder.bwd(pixels, &window_ready), coeffs_ready)
    }

    fn tick(&mut self, ingress: &Fwd<Self::I>, egress: &Ready) {
        let (pixels, coeffs) = ingress;
        let farm_ingress = (self.feeder.fwd(pixels), coeffs.clone());
        let (window_ready, _) = self.farm.bwd(&farm_ingress, egress);

        self.feeder.tick(pixels, &window_ready);
        self.farm.tick(&farm_ingress, egress);
    }
}
