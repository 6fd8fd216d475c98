//! Signals.

use std::fmt::Debug;

use linked_hash_map::LinkedHashMap;

/// Named port values, in declaration order.
pub type Ports = LinkedHashMap<String, i64>;

/// Values carried by wires and registers.
///
/// `Default` is the reset value. A signal can enumerate its ports by name for tracing.
pub trait Signal: 'static + Debug + Clone + Default + PartialEq {
    /// Appends the ports of `self` to `ports`, named under `prefix`.
    fn ports(&self, prefix: &str, ports: &mut Ports);

    /// Collects the ports of `self` named under `prefix`.
    fn to_ports(&self, prefix: &str) -> Ports {
        let mut ports = Ports::new();
        self.ports(prefix, &mut ports);
        ports
    }
}

/// Joins a prefix and a member name with `_`. Empty parts are skipped.
pub fn port_name(prefix: &str, name: &str) -> String {
    match (prefix.is_empty(), name.is_empty()) {
        (true, _) => name.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{}_{}", prefix, name),
    }
}

impl Signal for () {
    fn ports(&self, _prefix: &str, _ports: &mut Ports) {}
}

impl Signal for bool {
    fn ports(&self, prefix: &str, ports: &mut Ports) { ports.insert(prefix.to_string(), i64::from(*self)); }
}

impl Signal for i64 {
    fn ports(&self, prefix: &str, ports: &mut Ports) { ports.insert(prefix.to_string(), *self); }
}

impl<V: Signal> Signal for Vec<V> {
    fn ports(&self, prefix: &str, ports: &mut Ports) {
        for (i, elt) in self.iter().enumerate() {
            elt.ports(&port_name(prefix, &i.to_string()), ports);
        }
    }
}

macro_rules! impl_signal_tuple {
    ($($a:ident $i:tt)+) => {
        impl<$($a: Signal,)+> Signal for ($($a,)+) {
            fn ports(&self, prefix: &str, ports: &mut Ports) {
                $(self.$i.ports(&port_name(prefix, stringify!($i)), ports);)+
            }
        }
    };
}

impl_signal_tuple! { A 0 B 1 }
impl_signal_tuple! { A 0 B 1 C 2 }
