//! # Bootstrap Phase Controller
//!
//! A kernel starts on one core and brings up the others exactly once. Until
//! then there is nobody to race with, and the allocator's lock must not be
//! used; afterwards every free-list access goes through it.
//!
//! ```text
//!   ┌───────────┐  enter_multicore()  ┌───────────┐
//!   │ Bootstrap │ ──────────────────► │ Multicore │
//!   └───────────┘    (exactly once)   └───────────┘
//! ```

use core::sync::atomic::{AtomicBool, Ordering};

/// Whether free-list access must be serialized by the lock.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    /// One execution context, no locking.
    Bootstrap,
    /// Several execution contexts, locking mandatory.
    Multicore,
}

/// One-way switch from [`Phase::Bootstrap`] to [`Phase::Multicore`].
///
/// [`enter_multicore`](Self::enter_multicore) is the only writer of the flag.
pub struct PhaseGate {
    multicore: AtomicBool,
}

impl PhaseGate {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            multicore: AtomicBool::new(false),
        }
    }

    #[inline]
    #[must_use]
    pub fn current(&self) -> Phase {
        if self.multicore.load(Ordering::Acquire) {
            Phase::Multicore
        } else {
            Phase::Bootstrap
        }
    }

    /// Flip to [`Phase::Multicore`].
    ///
    /// # Panics
    /// If the gate already is in [`Phase::Multicore`]; the transition happens
    /// once per boot.
    pub fn enter_multicore(&self) {
        let was_multicore = self.multicore.swap(true, Ordering::AcqRel);
        assert!(!was_multicore, "multicore transition requested twice");
    }
}

impl Default for PhaseGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_bootstrap() {
        assert_eq!(PhaseGate::new().current(), Phase::Bootstrap);
    }

    #[test]
    fn transition_is_sticky() {
        let gate = PhaseGate::new();
        gate.enter_multicore();
        assert_eq!(gate.current(), Phase::Multicore);
        assert_eq!(gate.current(), Phase::Multicore);
    }

    #[test]
    #[should_panic(expected = "multicore transition requested twice")]
    fn second_transition_panics() {
        let gate = PhaseGate::new();
        gate.enter_multicore();
        gate.enter_multicore();
    }
}
