//! Construction-time configuration checks.

use std::fmt;

use static_assertions::const_assert;
use thiserror::Error;

use crate::*;

/// Widest pixel or coefficient supported.
pub const MAX_DATA_WIDTH: u32 = 32;

/// Widest accumulator supported.
pub const MAX_OUTPUT_WIDTH: u32 = 64;

// Products of two data values are computed exactly in `i128`.
const_assert!(2 * MAX_DATA_WIDTH + 1 < i128::BITS);

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("width {width} is outside 1..={max}")]
    InvalidWidth { width: u32, max: u32 },
    #[error("kernel size must be at least 1")]
    InvalidKernel,
    #[error("row length {row_length} is shorter than the kernel size {n}")]
    RowTooShort { row_length: usize, n: usize },
    #[error("{what} {length} is not a multiple of {n}")]
    NotMultiple { what: &'static str, length: usize, n: usize },
    #[error("output width {requested} cannot hold the worst case, which needs {required} bits")]
    OutputWidthTooNarrow { requested: u32, required: u32 },
    #[error("output width {width} exceeds {max} bits")]
    OutputWidthTooWide { width: u32, max: u32 },
    #[error("a farm needs at least one core")]
    NoCores,
    #[error("stride must be at least 1")]
    InvalidStride,
    #[error("cannot grow one dimension and shrink the other ({input:?} to {output:?})")]
    MixedResize { input: ImageShape, output: ImageShape },
    #[error("leak {leak} exceeds the data width {width}")]
    LeakOutOfRange { leak: u32, width: u32 },
    #[error("tree needs 1..={max} stages, got {n_stages}")]
    InvalidTree { n_stages: usize, max: usize },
    #[error("image shape {shape:?} has no pixels")]
    EmptyImage { shape: ImageShape },
}

/// Non-fatal configuration finding, kept on the instance that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigWarning {
    /// The output is narrower than the worst case needs, so results may wrap.
    NarrowOutput {
        /// Width asked for.
        requested: u32,
        /// Width that never overflows.
        required: u32,
    },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NarrowOutput { requested, required } => {
                write!(f, "output width {} is narrower than the overflow-safe {} bits; results may wrap", requested, required)
            }
        }
    }
}

/// Width of an accumulating output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputWidth {
    /// The narrowest width that never overflows.
    #[default]
    Auto,

    /// A caller-chosen width.
    Explicit {
        /// Width in bits.
        width: u32,
        /// Accept a width narrower than the worst case needs.
        allow_overflow: bool,
    },
}

impl OutputWidth {
    /// Resolves the width against the overflow-safe `required` width.
    pub fn resolve(self, required: u32) -> Result<(u32, Option<ConfigWarning>), ConfigError> {
        match self {
            Self::Auto if required > MAX_OUTPUT_WIDTH => {
                Err(ConfigError::OutputWidthTooWide { width: required, max: MAX_OUTPUT_WIDTH })
            }
            Self::Auto => Ok((required, None)),
            Self::Explicit { width: 0, .. } => Err(ConfigError::InvalidWidth { width: 0, max: MAX_OUTPUT_WIDTH }),
            Self::Explicit { width, .. } if width > MAX_OUTPUT_WIDTH => {
                Err(ConfigError::OutputWidthTooWide { width, max: MAX_OUTPUT_WIDTH })
            }
            Self::Explicit { width, .. } if width >= required => Ok((width, None)),
            Self::Explicit { width, allow_overflow: true } => {
                Ok((width, Some(ConfigWarning::NarrowOutput { requested: width, required })))
            }
            Self::Explicit { width, allow_overflow: false } => {
                Err(ConfigError::OutputWidthTooNarrow { requested: width, required })
            }
        }
    }
}

/// Checks that `width` is a supported pixel or coefficient width.
pub fn check_width(width: u32) -> Result<u32, ConfigError> {
    if (1..=MAX_DATA_WIDTH).contains(&width) {
        Ok(width)
    } else {
        Err(ConfigError::InvalidWidth { width, max: MAX_DATA_WIDTH })
    }
}
