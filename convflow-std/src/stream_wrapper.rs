//! Stream wrapper for fixed-latency pipelines.

use std::collections::VecDeque;
use std::fmt::Debug;

use crate::*;

/// Clock-enabled pipeline with a fixed latency.
///
/// The output reflects the input presented `latency()` enabled cycles earlier.
pub trait Pipelined: Debug {
    /// Input data.
    type Input: Signal;

    /// Output data.
    type Output: Signal;

    /// Enabled cycles from input to output.
    fn latency(&self) -> usize;

    /// Current output.
    fn output(&self) -> Self::Output;

    /// Commits one cycle. Nothing moves unless `clken`.
    fn tick(&mut self, input: &Self::Input, clken: bool);
}

/// Turns a [`Pipelined`] core into a stream stage.
///
/// Valid and last flags travel alongside the data through delay lines as long as the core. The whole pipeline
/// stalls while the output holds a beat that is not accepted.
#[derive(Debug, Clone)]
pub struct StreamWrapper<P> {
    core: P,
    flags: VecDeque<(bool, bool)>,
}

impl<P: Pipelined> StreamWrapper<P> {
    /// Wraps `core`.
    ///
    /// # Panics
    ///
    /// Panics if the core has no latency.
    pub fn new(core: P) -> Self {
        let latency = core.latency();
        assert!(latency > 0, "a wrapped pipeline needs at least one register");
        Self { core, flags: VecDeque::from(vec![(false, false); latency]) }
    }

    /// The wrapped core.
    pub fn core(&self) -> &P { &self.core }

    fn out_flags(&self) -> (bool, bool) { self.flags.back().copied().unwrap_or_default() }

    fn clken(&self, egress: &Ready) -> bool { egress.ready || !self.out_flags().0 }
}

impl<P: Pipelined> Module for StreamWrapper<P> {
    type I = AxisChannel<P::Input>;
    type O = AxisChannel<P::Output>;

    fn fwd(&self, _ingress: &Valid<AxisValue<P::Input>>) -> Valid<AxisValue<P::Output>> {
        let (valid, last) = self.out_flags();
        Valid::new(valid, AxisValue::new(self.core.output(), valid && last))
    }

    fn bwd(&self, _ingress: &Valid<AxisValue<P::Input>>, egress: &Ready) -> Ready { Ready::new(self.clken(egress)) }

    fn tick(&mut self, ingress: &Valid<AxisValue<P::Input>>, egress: &Ready) {
        let clken = self.clken(egress);
        self.core.tick(&ingress.inner.payload, clken);
        if clken {
            let accepted = ingress.valid;
            let _ = self.flags.pop_back();
            self.flags.push_front((accepted, accepted && ingress.inner.tlast));
        }
    }
}
