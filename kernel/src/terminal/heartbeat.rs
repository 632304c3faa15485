// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2023 Andre Richter <andre.o.richter@gmail.com>

//! Heartbeat on the board's status LED.

use crate::{
    config,
    synchronization::{self, InitStateLock},
    time::time_manager,
    warn,
};
use term_core::{
    cancel::CancelToken,
    heartbeat::{interface::StatusIndicator, Heartbeat, HeartbeatState},
    timer::{interface::TimerScheduler, TimerHandle},
};

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

struct NullIndicator;

//--------------------------------------------------------------------------------------------------
// Global instances
//--------------------------------------------------------------------------------------------------

static HEARTBEAT: Heartbeat = Heartbeat::new(config::HEARTBEAT_PERIOD);

static NULL_INDICATOR: NullIndicator = NullIndicator;

static CUR_INDICATOR: InitStateLock<&'static (dyn StatusIndicator + Sync)> =
    InitStateLock::new(&NULL_INDICATOR);

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

impl StatusIndicator for NullIndicator {
    fn set_lit(&self, _lit: bool) {}
}

/// Timer callback. Toggles and re-arms itself.
fn on_heartbeat(_handle: TimerHandle, _param: usize, _context: usize) {
    if let Err(x) = HEARTBEAT.beat(status_indicator(), time_manager(), on_heartbeat) {
        warn!("Heartbeat stopped: {}", x);
    }
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------
use synchronization::interface::ReadWriteEx;

/// Register the output the heartbeat drives.
pub fn register_status_indicator(new_indicator: &'static (dyn StatusIndicator + Sync)) {
    CUR_INDICATOR.write(|indicator| *indicator = new_indicator);
}

/// Return a reference to the currently registered status indicator.
pub fn status_indicator() -> &'static dyn StatusIndicator {
    CUR_INDICATOR.read(|indicator| *indicator)
}

/// Current heartbeat state.
pub fn state() -> HeartbeatState {
    HEARTBEAT.state()
}

/// Schedule the first timer-driven toggle, one period from now.
pub fn arm() -> Result<TimerHandle, &'static str> {
    time_manager().register_timer(HEARTBEAT.period(), on_heartbeat, 0, 0)
}

/// The blocking variant. Occupies the caller until `cancel` is cancelled.
pub fn run_blocking(cancel: &CancelToken) {
    HEARTBEAT.run_blocking(
        status_indicator(),
        time_manager(),
        config::HEARTBEAT_BLOCKING_THRESHOLD,
        cancel,
    )
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use test_macros::kernel_test;

    #[kernel_test]
    fn arm_registers_one_timer() {
        let before = time_manager().armed_timers();

        arm().unwrap();
        assert_eq!(time_manager().armed_timers(), before + 1);
    }

    /// Callbacks fired in the foreground keep the heartbeat alive.
    #[kernel_test]
    fn callback_toggles_and_rearms() {
        let initial = state();
        let handle = arm().unwrap();
        let before = time_manager().armed_timers();

        on_heartbeat(handle, 0, 0);

        assert_ne!(state(), initial);
        assert_eq!(time_manager().armed_timers(), before + 1);
    }
}
