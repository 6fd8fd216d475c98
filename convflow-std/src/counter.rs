//! Counters.

/// Circular counter over `0..modulus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapCounter {
    value: usize,
    modulus: usize,
}

impl WrapCounter {
    /// Creates a counter at 0.
    ///
    /// # Panics
    ///
    /// Panics if `modulus` is 0.
    pub fn new(modulus: usize) -> Self {
        assert!(modulus > 0, "counter modulus must be positive");
        Self { value: 0, modulus }
    }

    /// Current value.
    pub fn value(&self) -> usize { self.value }

    /// Value after one increment.
    pub fn next(&self) -> usize {
        if self.value + 1 == self.modulus {
            0
        } else {
            self.value + 1
        }
    }

    /// Increments if `up`. Returns whether the counter wrapped around.
    pub fn step(&mut self, up: bool) -> bool {
        if !up {
            return false;
        }
        self.value = self.next();
        self.value == 0
    }

    /// Decrements if `down`. Returns whether the counter wrapped around.
    pub fn step_back(&mut self, down: bool) -> bool {
        if !down {
            return false;
        }
        let wrapped = self.value == 0;
        self.value = if wrapped { self.modulus - 1 } else { self.value - 1 };
        wrapped
    }

    /// Resets to 0.
    pub fn clear(&mut self) { self.value = 0; }
}
