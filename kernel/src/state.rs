// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2020-2023 Andre Richter <andre.o.richter@gmail.com>

//! Kernel boot phase.
//!
//! Registries behind an `InitStateLock` may only be written while the kernel is bootstrapping.
//! Once `kernel_init()` hands over to the terminal, the phase is `Running` and stays there.

use core::sync::atomic::{AtomicU8, Ordering};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// The phases of a boot.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Phase {
    /// Single core, IRQs masked, drivers coming up.
    Bootstrap = 0,

    /// `kernel_main()` and everything after it.
    Running = 1,
}

/// Tracks the current phase.
pub struct StateManager {
    phase: AtomicU8,
}

//--------------------------------------------------------------------------------------------------
// Global instances
//--------------------------------------------------------------------------------------------------

static STATE_MANAGER: StateManager = StateManager::new();

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// Return a reference to the global StateManager.
pub fn state_manager() -> &'static StateManager {
    &STATE_MANAGER
}

impl StateManager {
    /// Create an instance in the `Bootstrap` phase.
    pub const fn new() -> Self {
        Self {
            phase: AtomicU8::new(Phase::Bootstrap as u8),
        }
    }

    /// The current phase.
    pub fn phase(&self) -> Phase {
        if self.phase.load(Ordering::Acquire) == Phase::Running as u8 {
            Phase::Running
        } else {
            Phase::Bootstrap
        }
    }

    /// Whether the kernel is still bootstrapping.
    pub fn is_bootstrapping(&self) -> bool {
        self.phase() == Phase::Bootstrap
    }

    /// Leave the bootstrap phase. Allowed exactly once.
    pub fn transition_to_running(&self) {
        let swapped = self.phase.compare_exchange(
            Phase::Bootstrap as u8,
            Phase::Running as u8,
            Ordering::AcqRel,
            Ordering::Relaxed,
        );

        if swapped.is_err() {
            panic!("Kernel is already running");
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use test_macros::kernel_test;

    /// Unit tests run before kernel_main(), so the global manager is still bootstrapping.
    #[kernel_test]
    fn tests_run_during_bootstrap() {
        assert!(state_manager().is_bootstrapping());
    }

    #[kernel_test]
    fn transition_is_one_way() {
        let manager = StateManager::new();

        manager.transition_to_running();
        assert_eq!(manager.phase(), Phase::Running);
        assert!(!manager.is_bootstrapping());
    }
}
