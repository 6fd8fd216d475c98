//! Cycle-level simulation harness.
//!
//! A [`Testbench`] drives a [`Module`] from a [`Driver`] and drains it into a [`Receiver`], evaluating the whole
//! system one clock cycle at a time.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::trace;

use crate::*;

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("simulation did not finish within {cycles} cycles")]
    Timeout { cycles: u64 },
}

/// Stall pattern of a producer or consumer.
#[derive(Debug, Clone)]
pub enum Burps {
    /// Never stalls.
    Never,

    /// Stalls on each cycle with the given probability.
    Random {
        /// Stall probability in `[0, 1)`.
        probability: f64,
        /// Random source.
        rng: Box<StdRng>,
    },

    /// Replays `pattern` cyclically; `true` stalls.
    Pattern {
        /// Stall pattern.
        pattern: Vec<bool>,
        /// Current position in `pattern`.
        position: usize,
    },
}

impl Burps {
    /// Random stalls with a reproducible seed.
    ///
    /// # Panics
    ///
    /// Panics if `probability` is not in `[0, 1)`.
    pub fn random(probability: f64, seed: u64) -> Self {
        assert!((0.0..1.0).contains(&probability), "stall probability {} is not in [0, 1)", probability);
        Self::Random { probability, rng: Box::new(StdRng::seed_from_u64(seed)) }
    }

    /// Cyclic stall pattern.
    pub fn pattern(pattern: Vec<bool>) -> Self { Self::Pattern { pattern, position: 0 } }

    /// Draws whether the next cycle stalls.
    pub fn stall(&mut self) -> bool {
        match self {
            Self::Never => false,
            Self::Random { probability, rng } => rng.gen_bool(*probability),
            Self::Pattern { pattern, position } => {
                if pattern.is_empty() {
                    return false;
                }
                let stall = pattern[*position];
                *position = (*position + 1) % pattern.len();
                stall
            }
        }
    }
}

/// Drives the ingress of a module under test.
pub trait Driver: std::fmt::Debug {
    /// Driven interface.
    type I: Interface;

    /// Forward signals of this cycle. Depends only on the driver's state.
    fn fwd(&self) -> Fwd<Self::I>;

    /// Commits the cycle.
    fn tick(&mut self, fwd: &Fwd<Self::I>, bwd: &Bwd<Self::I>);
}

/// Drains the egress of a module under test.
pub trait Receiver: std::fmt::Debug {
    /// Drained interface.
    type O: Interface;

    /// Backward signals of this cycle. Depends only on the receiver's state.
    fn bwd(&self) -> Bwd<Self::O>;

    /// Commits the cycle.
    fn tick(&mut self, fwd: &Fwd<Self::O>, bwd: &Bwd<Self::O>);
}

impl<D1: Driver, D2: Driver> Driver for (D1, D2) {
    type I = (D1::I, D2::I);

    fn fwd(&self) -> Fwd<Self::I> { (self.0.fwd(), self.1.fwd()) }

    fn tick(&mut self, fwd: &Fwd<Self::I>, bwd: &Bwd<Self::I>) {
        self.0.tick(&fwd.0, &bwd.0);
        self.1.tick(&fwd.1, &bwd.1);
    }
}

/// Stream producer replaying queued beats.
///
/// Once a beat is presented it stays valid and unchanged until accepted.
#[derive(Debug)]
pub struct Source<P> {
    queue: VecDeque<AxisValue<P>>,
    presenting: bool,
    burps: Burps,
    sent: usize,
}

impl<P: Signal> Source<P> {
    /// Creates an empty source.
    pub fn new(mut burps: Burps) -> Self {
        let presenting = !burps.stall();
        Self { queue: VecDeque::new(), presenting, burps, sent: 0 }
    }

    /// Queues one beat.
    pub fn push(&mut self, payload: P, tlast: bool) { self.queue.push_back(AxisValue::new(payload, tlast)); }

    /// Queues a frame, raising `last` on its final beat.
    pub fn push_frame<I: IntoIterator<Item = P>>(&mut self, frame: I) {
        let start = self.queue.len();
        self.queue.extend(frame.into_iter().map(|payload| AxisValue::new(payload, false)));
        if self.queue.len() > start {
            if let Some(last) = self.queue.back_mut() {
                last.tlast = true;
            }
        }
    }

    /// Returns whether every queued beat was sent.
    pub fn is_empty(&self) -> bool { self.queue.is_empty() }

    /// Number of beats sent so far.
    pub fn sent(&self) -> usize { self.sent }
}

impl<P: Signal> Driver for Source<P> {
    type I = AxisChannel<P>;

    fn fwd(&self) -> Valid<AxisValue<P>> {
        match self.queue.front() {
            Some(beat) if self.presenting => Valid::valid(beat.clone()),
            _ => Valid::invalid(),
        }
    }

    fn tick(&mut self, fwd: &Valid<AxisValue<P>>, bwd: &Ready) {
        if fwd.accepted(*bwd) {
            trace!(sent = self.sent, tlast = fwd.inner.tlast, "source transfer");
            let _ = self.queue.pop_front();
            self.sent += 1;
            self.presenting = !self.burps.stall();
        } else if !self.presenting {
            self.presenting = !self.burps.stall();
        }
    }
}

/// Always-valid producer of one fixed payload, such as a coefficient matrix.
#[derive(Debug)]
pub struct Constant<P> {
    payload: P,
    accepted: usize,
}

impl<P: Signal> Constant<P> {
    /// Creates a new constant source.
    pub fn new(payload: P) -> Self { Self { payload, accepted: 0 } }

    /// Number of cycles the payload was accepted.
    pub fn accepted(&self) -> usize { self.accepted }
}

impl<P: Signal> Driver for Constant<P> {
    type I = AxisChannel<P>;

    fn fwd(&self) -> Valid<AxisValue<P>> { Valid::beat(self.payload.clone(), false) }

    fn tick(&mut self, fwd: &Valid<AxisValue<P>>, bwd: &Ready) {
        if fwd.accepted(*bwd) {
            self.accepted += 1;
        }
    }
}

/// Stream consumer recording every accepted beat.
///
/// The sink also checks the handshake of the channel it drains.
#[derive(Debug)]
pub struct Sink<P> {
    received: Vec<AxisValue<P>>,
    ready: bool,
    burps: Burps,
    checker: ProtocolChecker<P>,
}

impl<P: Signal> Sink<P> {
    /// Creates an empty sink.
    pub fn new(mut burps: Burps) -> Self {
        let ready = !burps.stall();
        Self { received: Vec::new(), ready, burps, checker: ProtocolChecker::new() }
    }

    /// Beats accepted so far.
    pub fn received(&self) -> &[AxisValue<P>] { &self.received }

    /// Number of beats accepted so far.
    pub fn len(&self) -> usize { self.received.len() }

    /// Returns whether no beat was accepted yet.
    pub fn is_empty(&self) -> bool { self.received.is_empty() }

    /// Payloads accepted so far.
    pub fn payloads(&self) -> Vec<P> { self.received.iter().map(|beat| beat.payload.clone()).collect() }

    /// Payloads grouped into frames. A trailing unfinished frame is included.
    pub fn frames(&self) -> Vec<Vec<P>> {
        let mut frames = vec![];
        let mut frame = vec![];
        for beat in &self.received {
            frame.push(beat.payload.clone());
            if beat.tlast {
                frames.push(std::mem::take(&mut frame));
            }
        }
        if !frame.is_empty() {
            frames.push(frame);
        }
        frames
    }
}

impl<P: Signal> Receiver for Sink<P> {
    type O = AxisChannel<P>;

    fn bwd(&self) -> Ready { Ready::new(self.ready) }

    fn tick(&mut self, fwd: &Valid<AxisValue<P>>, bwd: &Ready) {
        let checked = self.checker.observe(fwd, *bwd);
        debug_assert!(checked.is_ok(), "sink observed a protocol violation: {:?}", checked);

        if fwd.accepted(*bwd) {
            trace!(received = self.received.len(), tlast = fwd.inner.tlast, "sink transfer");
            self.received.push(fwd.inner.clone());
        }
        self.ready = !self.burps.stall();
    }
}

/// Closed system of a driver, a module under test and a receiver.
#[derive(Debug)]
pub struct Testbench<D, M, R> {
    driver: D,
    dut: M,
    receiver: R,
    cycle: u64,
}

impl<D, M, R> Testbench<D, M, R>
where
    D: Driver,
    R: Receiver,
    M: Module<I = D::I, O = R::O>,
{
    /// Creates a new testbench at cycle 0.
    pub fn new(driver: D, dut: M, receiver: R) -> Self { Self { driver, dut, receiver, cycle: 0 } }

    /// Simulates one clock cycle.
    pub fn tick(&mut self) {
        let ingress_fwd = self.driver.fwd();
        let egress_bwd = self.receiver.bwd();
        let egress_fwd = self.dut.fwd(&ingress_fwd);
        let ingress_bwd = self.dut.bwd(&ingress_fwd, &egress_bwd);

        self.driver.tick(&ingress_fwd, &ingress_bwd);
        self.dut.tick(&ingress_fwd, &egress_bwd);
        self.receiver.tick(&egress_fwd, &egress_bwd);
        self.cycle += 1;
    }

    /// Simulates until `done` holds, for at most `max_cycles` cycles. Returns the elapsed cycles.
    pub fn run_until<F: FnMut(&D, &M, &R) -> bool>(&mut self, mut done: F, max_cycles: u64) -> Result<u64, SimError> {
        let start = self.cycle;
        while !done(&self.driver, &self.dut, &self.receiver) {
            if self.cycle - start >= max_cycles {
                return Err(SimError::Timeout { cycles: max_cycles });
            }
            self.tick();
        }
        Ok(self.cycle - start)
    }

    /// Simulates exactly `cycles` cycles.
    pub fn run(&mut self, cycles: u64) {
        for _ in 0..cycles {
            self.tick();
        }
    }

    /// Settled signals of the current cycle, named under `input` and `output`.
    pub fn ports(&self) -> Ports {
        let ingress_fwd = self.driver.fwd();
        let egress_bwd = self.receiver.bwd();
        let egress_fwd = self.dut.fwd(&ingress_fwd);
        let ingress_bwd = self.dut.bwd(&ingress_fwd, &egress_bwd);

        let mut ports = Ports::new();
        ingress_fwd.ports("input", &mut ports);
        ingress_bwd.ports("input", &mut ports);
        egress_fwd.ports("output", &mut ports);
        egress_bwd.ports("output", &mut ports);
        ports
    }

    /// Cycles simulated so far.
    pub fn cycle(&self) -> u64 { self.cycle }

    /// The driver.
    pub fn driver(&self) -> &D { &self.driver }

    /// The driver, mutably.
    pub fn driver_mut(&mut self) -> &mut D { &mut self.driver }

    /// The module under test.
    pub fn dut(&self) -> &M { &self.dut }

    /// The receiver.
    pub fn receiver(&self) -> &R { &self.receiver }

    /// Splits the testbench into its parts.
    pub fn into_parts(self) -> (D, M, R) { (self.driver, self.dut, self.receiver) }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One-deep pipeline register, enough to exercise the testbench.
    #[derive(Debug, Default)]
    struct Register {
        slot: Valid<AxisValue<i64>>,
    }

    impl Module for Register {
        type I = AxisChannel<i64>;
        type O = AxisChannel<i64>;

        fn fwd(&self, _ingress: &Valid<AxisValue<i64>>) -> Valid<AxisValue<i64>> { self.slot.clone() }

        fn bwd(&self, _ingress: &Valid<AxisValue<i64>>, egress: &Ready) -> Ready {
            Ready::new(egress.ready || !self.slot.valid)
        }

        fn tick(&mut self, ingress: &Valid<AxisValue<i64>>, egress: &Ready) {
            if ingress.accepted(self.bwd(ingress, egress)) {
                self.slot = ingress.clone();
            } else if self.slot.accepted(*egress) {
                self.slot = Valid::invalid();
            }
        }
    }

    #[test]
    fn burps_are_reproducible() {
        let mut a = Burps::random(0.5, 7);
        let mut b = Burps::random(0.5, 7);
        let a = (0..64).map(|_| a.stall()).collect::<Vec<_>>();
        let b = (0..64).map(|_| b.stall()).collect::<Vec<_>>();
        assert_eq!(a, b);
        assert!(a.iter().any(|stall| *stall) && a.iter().any(|stall| !*stall));

        let mut pattern = Burps::pattern(vec![true, false]);
        assert_eq!((0..4).map(|_| pattern.stall()).collect::<Vec<_>>(), vec![true, false, true, false]);
    }

    #[test]
    fn register_passes_frames_under_stalls() {
        let mut source = Source::new(Burps::random(0.3, 1));
        source.push_frame(0..10);
        source.push_frame(10..13);
        let mut bench = Testbench::new(source, Register::default(), Sink::new(Burps::random(0.4, 2)));

        bench.run_until(|_, _, sink| sink.len() == 13, 1000).unwrap();
        assert_eq!(bench.receiver().frames(), vec![(0..10).collect::<Vec<_>>(), (10..13).collect()]);
        assert!(bench.driver().is_empty());
        assert_eq!(bench.driver().sent(), 13);
    }

    #[test]
    fn timeout() {
        let source = Source::<i64>::new(Burps::Never);
        let mut bench = Testbench::new(source, Register::default(), Sink::new(Burps::Never));
        assert_eq!(bench.run_until(|_, _, sink| !sink.is_empty(), 20), Err(SimError::Timeout { cycles: 20 }));
        assert_eq!(bench.cycle(), 20);

        // Beats queued after the fact are still delivered.
        bench.driver_mut().push_frame(vec![5, 6]);
        assert_eq!(bench.run_until(|_, _, sink| sink.len() == 2, 20), Ok(3));
        let (source, _, sink) = bench.into_parts();
        assert!(source.is_empty());
        assert_eq!(sink.frames(), vec![vec![5, 6]]);
    }

    #[test]
    fn ports_name_both_sides() {
        let mut source = Source::new(Burps::Never);
        source.push(3, true);
        let bench = Testbench::new(source, Register::default(), Sink::<i64>::new(Burps::Never));
        let ports = bench.ports();
        assert_eq!(ports["input_data"], 3);
        assert_eq!(ports["input_ready"], 1);
        assert_eq!(ports["output_valid"], 0);
    }
}
