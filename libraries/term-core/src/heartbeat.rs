// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2023 Andre Richter <andre.o.richter@gmail.com>

//! Heartbeat.
//!
//! Toggles a status indicator at a fixed rate to show the system is alive. Two mutually exclusive
//! drivers exist: [`Heartbeat::beat`] is called from a timer callback and re-arms itself, while
//! [`Heartbeat::run_blocking`] takes over the foreground and polls a clock.

use crate::{
    cancel::CancelToken,
    interface::MonotonicClock,
    timer::{interface::TimerScheduler, TimerCallback},
};
use core::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Heartbeat interfaces.
pub mod interface {
    /// A single on/off output.
    pub trait StatusIndicator {
        /// Drive the output.
        fn set_lit(&self, lit: bool);
    }
}

/// Elapsed time after which the blocking variant toggles.
pub const BLOCKING_THRESHOLD: Duration = Duration::from_micros(500_000);

/// Indicator state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HeartbeatState {
    /// Indicator off. The initial state.
    Unlit,

    /// Indicator on.
    Lit,
}

/// The heartbeat state machine.
pub struct Heartbeat {
    lit: AtomicBool,
    period: Duration,
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl From<bool> for HeartbeatState {
    fn from(lit: bool) -> Self {
        if lit {
            Self::Lit
        } else {
            Self::Unlit
        }
    }
}

impl Heartbeat {
    /// Create an instance in the `Unlit` state.
    pub const fn new(period: Duration) -> Self {
        Self {
            lit: AtomicBool::new(false),
            period,
        }
    }

    /// Period between two timer-driven toggles.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Current state.
    pub fn state(&self) -> HeartbeatState {
        self.lit.load(Ordering::Relaxed).into()
    }

    /// Flip the indicator and the state.
    pub fn toggle(&self, indicator: &dyn interface::StatusIndicator) -> HeartbeatState {
        let lit = !self.lit.load(Ordering::Relaxed);

        indicator.set_lit(lit);
        self.lit.store(lit, Ordering::Relaxed);

        lit.into()
    }

    /// One timer firing: toggle, then schedule `callback` again after one period.
    pub fn beat(
        &self,
        indicator: &dyn interface::StatusIndicator,
        scheduler: &dyn TimerScheduler,
        callback: TimerCallback,
    ) -> Result<HeartbeatState, &'static str> {
        let state = self.toggle(indicator);

        scheduler.register_timer(self.period, callback, 0, 0)?;

        Ok(state)
    }

    /// Occupy the caller, toggling whenever more than `threshold` has passed since the last
    /// toggle. Returns only once `cancel` is cancelled.
    pub fn run_blocking(
        &self,
        indicator: &dyn interface::StatusIndicator,
        clock: &dyn MonotonicClock,
        threshold: Duration,
        cancel: &CancelToken,
    ) {
        let mut last_toggle = Duration::ZERO;

        while !cancel.is_cancelled() {
            let now = clock.uptime();

            if now.saturating_sub(last_toggle) > threshold {
                self.toggle(indicator);
                last_toggle = now;
            }
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{interface::StatusIndicator, *};
    use crate::{
        test_support::ManualClock,
        timer::{TimerHandle, TimerRegistry},
    };
    use core::cell::{Cell, RefCell};
    use std::vec::Vec;

    const PERIOD: Duration = Duration::from_millis(250);

    #[derive(Default)]
    struct RecordingLed {
        lit: Cell<bool>,
        writes: Cell<usize>,
    }

    impl StatusIndicator for RecordingLed {
        fn set_lit(&self, lit: bool) {
            self.lit.set(lit);
            self.writes.set(self.writes.get() + 1);
        }
    }

    /// Scheduler over a plain registry, driven by a simulated clock.
    struct SimScheduler<'a> {
        clock: &'a ManualClock,
        registry: RefCell<TimerRegistry<4>>,
    }

    impl TimerScheduler for SimScheduler<'_> {
        fn register_timer(
            &self,
            delay: Duration,
            callback: TimerCallback,
            param: usize,
            context: usize,
        ) -> Result<TimerHandle, &'static str> {
            self.registry
                .borrow_mut()
                .register(self.clock.uptime(), delay, callback, param, context)
        }
    }

    static HEARTBEAT: Heartbeat = Heartbeat::new(PERIOD);

    fn on_tick(_: TimerHandle, _: usize, _: usize) {}

    #[test]
    fn toggle_alternates_states() {
        let heartbeat = Heartbeat::new(PERIOD);
        let led = RecordingLed::default();

        assert_eq!(heartbeat.state(), HeartbeatState::Unlit);
        assert_eq!(heartbeat.toggle(&led), HeartbeatState::Lit);
        assert!(led.lit.get());
        assert_eq!(heartbeat.toggle(&led), HeartbeatState::Unlit);
        assert!(!led.lit.get());
    }

    #[test]
    fn beat_rearms_at_fixed_period() {
        let clock = ManualClock::new();
        let scheduler = SimScheduler {
            clock: &clock,
            registry: RefCell::new(TimerRegistry::new()),
        };
        let led = RecordingLed::default();

        HEARTBEAT.beat(&led, &scheduler, on_tick).unwrap();

        // Step the clock in 1 ms increments and record when the armed entry becomes due.
        let mut toggles = Vec::new();
        for _ in 0..2000 {
            clock.advance(Duration::from_millis(1));
            let fired = scheduler.registry.borrow_mut().take_due(clock.uptime());
            if fired.is_some() {
                toggles.push(clock.uptime());
                HEARTBEAT.beat(&led, &scheduler, on_tick).unwrap();
            }
        }

        assert_eq!(toggles.len(), 8);
        for pair in toggles.windows(2) {
            assert_eq!(pair[1] - pair[0], PERIOD);
        }
        assert_eq!(scheduler.registry.borrow().active(), 1);
        assert_eq!(led.writes.get(), 9);
    }

    #[test]
    fn beat_reports_rearm_failure() {
        let clock = ManualClock::new();
        let scheduler = SimScheduler {
            clock: &clock,
            registry: RefCell::new(TimerRegistry::new()),
        };
        for _ in 0..4 {
            scheduler.register_timer(PERIOD, on_tick, 0, 0).unwrap();
        }
        let heartbeat = Heartbeat::new(PERIOD);
        let led = RecordingLed::default();

        assert_eq!(
            heartbeat.beat(&led, &scheduler, on_tick),
            Err("Timer registry full")
        );
        // The toggle itself still happened.
        assert_eq!(heartbeat.state(), HeartbeatState::Lit);
    }

    #[test]
    fn blocking_variant_toggles_after_threshold() {
        use std::{sync::Arc, thread};

        struct ThreadClock(std::time::Instant);
        impl MonotonicClock for ThreadClock {
            fn uptime(&self) -> Duration {
                // Fast-forwarded so the test completes quickly.
                self.0.elapsed() * 1000
            }
        }

        struct AtomicLed(std::sync::atomic::AtomicUsize);
        impl StatusIndicator for AtomicLed {
            fn set_lit(&self, _lit: bool) {
                self.0.fetch_add(1, Ordering::Relaxed);
            }
        }

        let heartbeat = Arc::new(Heartbeat::new(PERIOD));
        let led = Arc::new(AtomicLed(std::sync::atomic::AtomicUsize::new(0)));
        let cancel = Arc::new(CancelToken::new());

        let worker = {
            let (heartbeat, led, cancel) = (heartbeat.clone(), led.clone(), cancel.clone());
            thread::spawn(move || {
                let clock = ThreadClock(std::time::Instant::now());
                heartbeat.run_blocking(&*led, &clock, BLOCKING_THRESHOLD, &cancel);
            })
        };

        // 50 ms of real time are 50 s of simulated time, i.e. about 100 toggles.
        thread::sleep(std::time::Duration::from_millis(50));
        cancel.cancel();
        worker.join().unwrap();

        assert!(led.0.load(Ordering::Relaxed) >= 10);
    }
}
