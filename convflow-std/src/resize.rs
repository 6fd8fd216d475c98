//! Image resizer.
//!
//! Pads or crops a frame to a new shape, keeping the top-left corner, and regenerates `last` on the final pixel of
//! every output frame.

use tracing::debug;

use crate::*;

/// Configuration of [`Resizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizerConfig {
    /// Pixel width.
    pub width: u32,
    /// Shape of each input frame.
    pub input_shape: ImageShape,
    /// Shape of each output frame.
    pub output_shape: ImageShape,
    /// Pixel value of the padding.
    pub fill_value: i64,
}

/// What a resizer does to each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    /// Same shape; only `last` is regenerated.
    PassThrough,
    /// Grows the frame; new pixels hold the fill value.
    Pad,
    /// Shrinks the frame; pixels outside the output are drained.
    Crop,
}

impl ResizeMode {
    /// Chooses the mode that maps `input` onto `output`.
    pub fn select(input: ImageShape, output: ImageShape) -> Result<Self, ConfigError> {
        if input == output {
            Ok(Self::PassThrough)
        } else if input.height <= output.height && input.width <= output.width {
            Ok(Self::Pad)
        } else if input.height >= output.height && input.width >= output.width {
            Ok(Self::Crop)
        } else {
            Err(ConfigError::MixedResize { input, output })
        }
    }
}

/// Raster position within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Position {
    row: usize,
    col: usize,
}

impl Position {
    fn advance(&mut self, shape: ImageShape) {
        self.col += 1;
        if self.col == shape.width {
            self.col = 0;
            self.row += 1;
            if self.row == shape.height {
                self.row = 0;
            }
        }
    }

    fn inside(&self, shape: ImageShape) -> bool { self.row < shape.height && self.col < shape.width }

    fn is_final(&self, shape: ImageShape) -> bool { self.row + 1 == shape.height && self.col + 1 == shape.width }
}

/// Pads, crops or passes through a pixel stream.
#[derive(Debug, Clone)]
pub struct Resizer {
    config: ResizerConfig,
    mode: ResizeMode,
    position: Position,
}

impl Resizer {
    /// Creates a new resizer.
    pub fn new(config: ResizerConfig) -> Result<Self, ConfigError> {
        check_width(config.width)?;
        for shape in [config.input_shape, config.output_shape] {
            if shape.n_pixels() == 0 {
                return Err(ConfigError::EmptyImage { shape });
            }
        }
        let mode = ResizeMode::select(config.input_shape, config.output_shape)?;

        debug!(?config, ?mode, "resizer");
        Ok(Self { config, mode, position: Position { row: 0, col: 0 } })
    }

    /// Selected mode.
    pub fn mode(&self) -> ResizeMode { self.mode }

    /// Shape whose raster the position counter follows.
    fn counted_shape(&self) -> ImageShape {
        match self.mode {
            ResizeMode::PassThrough | ResizeMode::Pad => self.config.output_shape,
            ResizeMode::Crop => self.config.input_shape,
        }
    }

    /// Whether the current position is backed by an input pixel and emitted.
    fn passes(&self) -> bool {
        match self.mode {
            ResizeMode::PassThrough => true,
            ResizeMode::Pad => self.position.inside(self.config.input_shape),
            ResizeMode::Crop => self.position.inside(self.config.output_shape),
        }
    }
}

impl Module for Resizer {
    type I = AxisChannel<i64>;
    type O = AxisChannel<i64>;

    fn fwd(&self, ingress: &Valid<AxisValue<i64>>) -> Valid<AxisValue<i64>> {
        let last = self.position.is_final(self.config.output_shape);
        match (self.passes(), self.mode) {
            (true, _) => Valid::new(ingress.valid, AxisValue::new(ingress.inner.payload, ingress.valid && last)),
            (false, ResizeMode::Pad) => Valid::beat(self.config.fill_value, last),
            (false, _) => Valid::invalid(),
        }
    }

    fn bwd(&self, _ingress: &Valid<AxisValue<i64>>, egress: &Ready) -> Ready {
        match (self.passes(), self.mode) {
            (true, _) => *egress,
            (false, ResizeMode::Pad) => Ready::new(false),
            (false, _) => Ready::new(true),
        }
    }

    fn tick(&mut self, ingress: &Valid<AxisValue<i64>>, egress: &Ready) {
        let counted = match self.mode {
            ResizeMode::PassThrough | ResizeMode::Pad => self.fwd(ingress).accepted(*egress),
            ResizeMode::Crop => ingress.accepted(self.bwd(ingress, egress)),
        };
        if counted {
            self.position.advance(self.counted_shape());
        }
    }
}
