//! Utilities for valid-ready channels.

use std::marker::PhantomData;

use thiserror::Error;

use crate::*;

/// Valid-ready channel.
///
/// A transfer happens in a cycle iff both `valid` and `ready` are high. Once a producer raises `valid` it keeps
/// `valid` and the payload stable until the transfer happens.
#[derive(Debug)]
pub struct VrChannel<V: Signal> {
    _marker: PhantomData<V>,
}

impl<V: Signal> Interface for VrChannel<V> {
    type Bwd = Ready;
    type Fwd = Valid<V>;
}

/// Valid/ready channel's forward signals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Valid<V> {
    /// Inner data
    pub inner: V,

    /// Valid bit
    pub valid: bool,
}

impl<V: Signal> Signal for Valid<V> {
    fn ports(&self, prefix: &str, ports: &mut Ports) {
        self.inner.ports(prefix, ports);
        self.valid.ports(&port_name(prefix, "valid"), ports);
    }
}

impl<V: Signal> Valid<V> {
    /// Creates new forward signals.
    pub fn new(valid: bool, inner: V) -> Self { Self { inner, valid } }

    /// Creates invalid forward signals. The data is left at its reset value.
    pub fn invalid() -> Self { Self::new(false, V::default()) }

    /// Creates valid forward signals.
    pub fn valid(inner: V) -> Self { Self::new(true, inner) }

    /// Maps the inner value.
    pub fn map_inner<W: Signal, F: FnOnce(V) -> W>(self, f: F) -> Valid<W> { Valid { inner: f(self.inner), valid: self.valid } }

    /// Returns whether a transfer happens under the given backward signal.
    pub fn accepted(&self, bwd: Ready) -> bool { self.valid && bwd.ready }
}

/// Ready signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ready {
    /// Ready bit
    pub ready: bool,
}

impl Signal for Ready {
    fn ports(&self, prefix: &str, ports: &mut Ports) { self.ready.ports(&port_name(prefix, "ready"), ports); }
}

impl Ready {
    /// Creates a new backward signal.
    pub const fn new(ready: bool) -> Self { Self { ready } }
}

/// AXI4-Stream inner data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AxisValue<P> {
    /// AXI4-Stream TDATA
    pub payload: P,

    /// AXI4-Stream TLAST
    pub tlast: bool,
}

impl<P: Signal> Signal for AxisValue<P> {
    fn ports(&self, prefix: &str, ports: &mut Ports) {
        self.payload.ports(&port_name(prefix, "data"), ports);
        self.tlast.ports(&port_name(prefix, "last"), ports);
    }
}

impl<P> AxisValue<P> {
    /// Creates a new stream value.
    pub fn new(payload: P, tlast: bool) -> Self { Self { payload, tlast } }
}

/// Stream channel: a valid-ready channel whose payload carries an end-of-frame flag.
pub type AxisChannel<P> = VrChannel<AxisValue<P>>;

impl<P: Signal> Valid<AxisValue<P>> {
    /// Creates a valid stream beat.
    pub fn beat(payload: P, tlast: bool) -> Self { Self::valid(AxisValue::new(payload, tlast)) }

    /// Returns whether the frame's final beat is transferred under the given backward signal.
    pub fn is_last(&self, bwd: Ready) -> bool { self.accepted(bwd) && self.inner.tlast }
}

/// Misuse of the valid/ready contract observed on a channel.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("valid was retracted before the pending beat was accepted")]
    Retracted,
    #[error("payload changed while waiting for ready")]
    PayloadChanged,
    #[error("last was raised without valid")]
    LastWithoutValid,
}

/// Watches one stream channel cycle by cycle and reports handshake violations.
#[derive(Debug, Clone, Default)]
pub struct ProtocolChecker<P> {
    pending: Option<AxisValue<P>>,
}

impl<P: Signal> ProtocolChecker<P> {
    /// Creates a new checker.
    pub fn new() -> Self { Self { pending: None } }

    /// Observes the channel's settled signals of one cycle.
    pub fn observe(&mut self, fwd: &Valid<AxisValue<P>>, bwd: Ready) -> Result<(), ProtocolViolation> {
        let pending = self.pending.take();
        self.pending = if fwd.valid && !bwd.ready { Some(fwd.inner.clone()) } else { None };

        if fwd.inner.tlast && !fwd.valid {
            return Err(ProtocolViolation::LastWithoutValid);
        }
        match pending {
            Some(_) if !fwd.valid => Err(ProtocolViolation::Retracted),
            Some(pending) if pending != fwd.inner => Err(ProtocolViolation::PayloadChanged),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake() {
        let beat = Valid::beat(7i64, true);
        assert!(beat.accepted(Ready::new(true)));
        assert!(beat.is_last(Ready::new(true)));
        assert!(!beat.is_last(Ready::new(false)));
        assert!(!Valid::<AxisValue<i64>>::invalid().accepted(Ready::new(true)));
    }

    #[test]
    fn stream_ports() {
        let ports = Valid::beat(5i64, false).to_ports("in");
        assert_eq!(ports.keys().cloned().collect::<Vec<_>>(), vec!["in_data", "in_last", "in_valid"]);
    }

    #[test]
    fn checker_accepts_stalled_beats() {
        let mut checker = ProtocolChecker::new();
        let beat = Valid::beat(1i64, false);
        assert_eq!(checker.observe(&beat, Ready::new(false)), Ok(()));
        assert_eq!(checker.observe(&beat, Ready::new(false)), Ok(()));
        assert_eq!(checker.observe(&beat, Ready::new(true)), Ok(()));
        assert_eq!(checker.observe(&Valid::invalid(), Ready::new(true)), Ok(()));
    }

    #[test]
    fn checker_reports_violations() {
        let mut checker = ProtocolChecker::new();
        assert_eq!(checker.observe(&Valid::beat(1i64, false), Ready::new(false)), Ok(()));
        assert_eq!(checker.observe(&Valid::invalid(), Ready::new(false)), Err(ProtocolViolation::Retracted));

        assert_eq!(checker.observe(&Valid::beat(1i64, false), Ready::new(false)), Ok(()));
        assert_eq!(checker.observe(&Valid::beat(2i64, false), Ready::new(true)), Err(ProtocolViolation::PayloadChanged));

        let last_only = Valid::new(false, AxisValue::new(0i64, true));
        assert_eq!(checker.observe(&last_only, Ready::new(true)), Err(ProtocolViolation::LastWithoutValid));
    }
}
