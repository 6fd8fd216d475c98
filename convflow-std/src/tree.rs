//! Tree reduction.
//!
//! A balanced binary tree that reduces `2^n_stages` signed values with one pipelined stage per level.

use arrayvec::ArrayVec;
use tracing::debug;

use crate::*;

/// Deepest supported tree.
pub const MAX_TREE_STAGES: usize = 16;

/// Reduction operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeOp {
    /// Sum.
    Sum,
    /// Maximum.
    Max,
    /// Minimum.
    Min,
}

impl TreeOp {
    /// Combines two values.
    pub fn apply(self, lhs: i64, rhs: i64) -> i64 {
        match self {
            Self::Sum => lhs + rhs,
            Self::Max => lhs.max(rhs),
            Self::Min => lhs.min(rhs),
        }
    }

    /// Value that leaves the other operand unchanged, among `width`-bit signed values.
    pub fn identity(self, width: u32) -> i64 {
        match self {
            Self::Sum => 0,
            Self::Max => min_signed(width) as i64,
            Self::Min => max_signed(width) as i64,
        }
    }
}

/// Configuration of [`TreeReduction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfig {
    /// Width of the inputs.
    pub input_width: u32,
    /// Number of levels; the tree takes `2^n_stages` inputs.
    pub n_stages: usize,
    /// Reduction operator.
    pub op: TreeOp,
    /// Register the inputs of each stage.
    pub reg_in: bool,
    /// Register the outputs of each stage.
    pub reg_out: bool,
}

/// One level of the tree.
#[derive(Debug, Clone)]
struct TreeStage {
    output_width: u32,
    input_r: Option<Vec<i64>>,
    op_r: Vec<i64>,
    output_r: Option<Vec<i64>>,
}

impl TreeStage {
    fn new(n_inputs: usize, output_width: u32, reg_in: bool, reg_out: bool) -> Self {
        Self {
            output_width,
            input_r: reg_in.then(|| vec![0; n_inputs]),
            op_r: vec![0; n_inputs / 2],
            output_r: reg_out.then(|| vec![0; n_inputs / 2]),
        }
    }

    fn latency(&self) -> usize { usize::from(self.input_r.is_some()) + 1 + usize::from(self.output_r.is_some()) }

    fn output(&self) -> &[i64] { self.output_r.as_ref().unwrap_or(&self.op_r) }

    fn tick(&mut self, input: &[i64], op: TreeOp) {
        let operands = self.input_r.clone().unwrap_or_else(|| input.to_vec());
        if let Some(output_r) = self.output_r.as_mut() {
            output_r.clone_from(&self.op_r);
        }
        self.op_r = operands
            .chunks(2)
            .map(|pair| wrap_signed(i128::from(op.apply(pair[0], pair[1])), self.output_width) as i64)
            .collect();
        if let Some(input_r) = self.input_r.as_mut() {
            input_r.clone_from_slice(input);
        }
    }
}

/// Pipelined reduction tree.
#[derive(Debug, Clone)]
pub struct TreeReduction {
    config: TreeConfig,
    stages: ArrayVec<TreeStage, MAX_TREE_STAGES>,
}

impl TreeReduction {
    /// Creates a new tree.
    pub fn new(config: TreeConfig) -> Result<Self, ConfigError> {
        check_width(config.input_width)?;
        if !(1..=MAX_TREE_STAGES).contains(&config.n_stages) {
            return Err(ConfigError::InvalidTree { n_stages: config.n_stages, max: MAX_TREE_STAGES });
        }

        let stages = (0..config.n_stages)
            .map(|stage| {
                let n_inputs = 1 << (config.n_stages - stage);
                TreeStage::new(n_inputs, config.input_width + stage as u32 + 1, config.reg_in, config.reg_out)
            })
            .collect();

        debug!(?config, "tree reduction");
        Ok(Self { config, stages })
    }

    /// Configuration.
    pub fn config(&self) -> &TreeConfig { &self.config }

    /// Number of inputs.
    pub fn n_inputs(&self) -> usize { 1 << self.config.n_stages }

    /// Width of the result.
    pub fn output_width(&self) -> u32 { self.config.input_width + self.config.n_stages as u32 }
}

impl Pipelined for TreeReduction {
    type Input = Vec<i64>;
    type Output = i64;

    fn latency(&self) -> usize { self.stages.iter().map(TreeStage::latency).sum() }

    fn output(&self) -> i64 { self.stages.last().map_or(0, |stage| stage.output()[0]) }

    /// Missing inputs read as the identity of the operator.
    fn tick(&mut self, input: &Vec<i64>, clken: bool) {
        if !clken {
            return;
        }

        let identity = self.config.op.identity(self.config.input_width);
        let input = (0..self.n_inputs())
            .map(|i| input.get(i).map_or(identity, |value| wrap_signed(i128::from(*value), self.config.input_width) as i64))
            .collect::<Vec<_>>();

        // Every stage reads what the previous stage drove before this edge.
        let mut stage_inputs = vec![input];
        stage_inputs.extend(self.stages.iter().map(|stage| stage.output().to_vec()));
        for (stage, stage_input) in self.stages.iter_mut().zip(stage_inputs.iter()) {
            stage.tick(stage_input, self.config.op);
        }
    }
}
