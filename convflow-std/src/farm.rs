//! Farm of dot-product units.
//!
//! Windows are dealt to the cores round-robin and results are collected round-robin in the same order, so the output
//! sequence is the same for any number of cores.

use tracing::debug;

use crate::*;

/// Configuration of [`Farm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FarmConfig {
    /// Configuration shared by every core.
    pub dot_product: DotProductConfig,
    /// Number of cores.
    pub n_cores: usize,
}

/// Round-robin farm of [`DotProduct`] cores.
///
/// Coefficients on `input_b` are broadcast to every core on every cycle.
#[derive(Debug, Clone)]
pub struct Farm {
    cores: Vec<DotProduct>,
    sink: WrapCounter,
    source: WrapCounter,
}

impl Farm {
    /// Creates a new farm.
    pub fn new(config: FarmConfig) -> Result<Self, ConfigError> {
        if config.n_cores == 0 {
            return Err(ConfigError::NoCores);
        }
        let core = DotProduct::new(config.dot_product)?;

        debug!(n_cores = config.n_cores, "farm");
        Ok(Self { cores: vec![core; config.n_cores], sink: WrapCounter::new(config.n_cores), source: WrapCounter::new(config.n_cores) })
    }

    /// Number of cores.
    pub fn n_cores(&self) -> usize { self.cores.len() }

    /// The cores.
    pub fn cores(&self) -> &[DotProduct] { &self.cores }

    /// Width of the results.
    pub fn output_width(&self) -> u32 { self.cores[0].output_width() }

    /// Warnings raised at construction.
    pub fn warnings(&self) -> &[ConfigWarning] { self.cores[0].warnings() }

    /// Core that takes the next window.
    pub fn sink_idx(&self) -> usize { self.sink.value() }

    /// Core that delivers the next result.
    pub fn source_idx(&self) -> usize { self.source.value() }

    fn core_ingress(&self, core: usize, ingress: &Fwd<<Self as Module>::I>) -> Fwd<<Self as Module>::I> {
        if core == self.sink.value() {
            ingress.clone()
        } else {
            (Valid::invalid(), ingress.1.clone())
        }
    }

    fn core_egress(&self, core: usize, egress: &Ready) -> Ready {
        if core == self.source.value() {
            *egress
        } else {
            Ready::new(false)
        }
    }
}

impl Module for Farm {
    type I = (AxisChannel<Matrix<i64>>, AxisChannel<Matrix<i64>>);
    type O = AxisChannel<i64>;

    fn fwd(&self, ingress: &Fwd<Self::I>) -> Valid<AxisValue<i64>> {
        let source = self.source.value();
        self.cores[source].fwd(&self.core_ingress(source, ingress))
    }

    fn bwd(&self, ingress: &Fwd<Self::I>, egress: &Ready) -> (Ready, Ready) {
        let sink = self.sink.value();
        self.cores[sink].bwd(ingress, &self.core_egress(sink, egress))
    }

    fn tick(&mut self, ingress: &Fwd<Self::I>, egress: &Ready) {
        let out_accepted = self.fwd(ingress).accepted(*egress);
        let in_accepted = ingress.0.accepted(self.bwd(ingress, egress).0);

        for core in 0..self.cores.len() {
            let core_ingress = self.core_ingress(core, ingress);
            let core_egress = self.core_egress(core, egress);
            self.cores[core].tick(&core_ingress, &core_egress);
        }

        let _ = self.sink.step(in_accepted);
        let _ = self.source.step(out_accepted);
    }
}
