//! Module.

use std::fmt::Debug;

use crate::*;

/// Synchronous module evaluated once per clock cycle.
///
/// Each cycle is evaluated in two phases. First the combinational network settles: [`Module::fwd`] computes the
/// egress forward signals and [`Module::bwd`] the ingress backward signals. Then [`Module::tick`] commits the
/// registers using the settled signals.
///
/// `fwd` sees only the registers and the ingress forward signals, so an egress `valid` never depends on the egress
/// `ready` of the same cycle.
pub trait Module: Debug {
    /// Ingress interface.
    type I: Interface;

    /// Egress interface.
    type O: Interface;

    /// Computes the egress forward signals.
    fn fwd(&self, ingress: &Fwd<Self::I>) -> Fwd<Self::O>;

    /// Computes the ingress backward signals.
    fn bwd(&self, ingress: &Fwd<Self::I>, egress: &Bwd<Self::O>) -> Bwd<Self::I>;

    /// Commits the registers for the next cycle.
    fn tick(&mut self, ingress: &Fwd<Self::I>, egress: &Bwd<Self::O>);

    /// Feeds the egress of `self` into `other`.
    fn chain<M: Module<I = Self::O>>(self, other: M) -> Chain<Self, M>
    where Self: Sized {
        Chain::new(self, other)
    }
}

/// Two modules connected back to back.
#[derive(Debug)]
pub struct Chain<A, B> {
    first: A,
    second: B,
}

impl<A: Module, B: Module<I = A::O>> Chain<A, B> {
    /// Connects the egress of `first` to the ingress of `second`.
    pub fn new(first: A, second: B) -> Self { Self { first, second } }

    /// Returns the upstream module.
    pub fn first(&self) -> &A { &self.first }

    /// Returns the downstream module.
    pub fn second(&self) -> &B { &self.second }
}

impl<A: Module, B: Module<I = A::O>> Module for Chain<A, B> {
    type I = A::I;
    type O = B::O;

    fn fwd(&self, ingress: &Fwd<A::I>) -> Fwd<B::O> { self.second.fwd(&self.first.fwd(ingress)) }

    fn bwd(&self, ingress: &Fwd<A::I>, egress: &Bwd<B::O>) -> Bwd<A::I> {
        let mid_fwd = self.first.fwd(ingress);
        let mid_bwd = self.second.bwd(&mid_fwd, egress);
        self.first.bwd(ingress, &mid_bwd)
    }

    fn tick(&mut self, ingress: &Fwd<A::I>, egress: &Bwd<B::O>) {
        let mid_fwd = self.first.fwd(ingress);
        let mid_bwd = self.second.bwd(&mid_fwd, egress);
        self.first.tick(ingress, &mid_bwd);
        self.second.tick(&mid_fwd, egress);
    }
}
