//! Interfaces.

use std::fmt::Debug;

use crate::*;

/// Interface of channels.
///
/// An interface only names the signal types flowing in each direction. Values of the signals are passed to
/// [`Module`]s every cycle.
pub trait Interface: 'static + Sized + Debug {
    /// Forward signals, from producer to consumer.
    type Fwd: Signal;

    /// Backward signals, from consumer to producer.
    type Bwd: Signal;
}

/// Forward signals of an interface.
pub type Fwd<I> = <I as Interface>::Fwd;

/// Backward signals of an interface.
pub type Bwd<I> = <I as Interface>::Bwd;

impl Interface for () {
    type Bwd = ();
    type Fwd = ();
}

macro_rules! impl_interface_tuple {
    ($($a:ident)+) => {
        impl<$($a: Interface,)+> Interface for ($($a,)+) {
            type Bwd = ($($a::Bwd,)+);
            type Fwd = ($($a::Fwd,)+);
        }
    };
}

impl_interface_tuple! { B1 B2 }
impl_interface_tuple! { B1 B2 B3 }
