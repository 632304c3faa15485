// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2020-2023 Andre Richter <andre.o.richter@gmail.com>

//! Timer primitives.
//!
//! The [`TimeManager`] is the kernel's single timer scheduler. Due callbacks are fired from two
//! places: the timeout IRQ handler, and [`TimeManager::poll`], which the terminal loop calls once
//! per iteration. In both cases the callback runs while the registry lock is not held, because it
//! is expected to register timers itself.
//!
//! # Resources
//!
//! - <https://stackoverflow.com/questions/41081240/idiomatic-callbacks-in-rust>

#[cfg(target_arch = "aarch64")]
#[path = "_arch/aarch64/time.rs"]
mod arch_time;

use crate::{
    config, driver, exception,
    exception::asynchronous::IRQNumber,
    synchronization::{interface::Mutex, IRQSafeNullLock},
    warn,
};
use core::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};
use term_core::{
    interface::MonotonicClock,
    timer::{interface::TimerScheduler, TimerCallback, TimerHandle, TimerRegistry},
};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Provides time management functions.
pub struct TimeManager {
    registry: IRQSafeNullLock<TimerRegistry<{ config::TIMER_SLOTS }>>,
}

//--------------------------------------------------------------------------------------------------
// Global instances
//--------------------------------------------------------------------------------------------------

static TIME_MANAGER: TimeManager = TimeManager::new();

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

impl TimeManager {
    /// Program the hardware for the earliest remaining entry, or disarm it.
    fn rearm(registry: &TimerRegistry<{ config::TIMER_SLOTS }>) {
        match registry.next_due() {
            Some(due_time) => arch_time::set_timeout_irq(due_time),
            None => arch_time::conclude_timeout_irq(),
        }
    }

    /// Fire everything that is due now. Returns the number of callbacks that ran.
    fn fire_due(&self) -> usize {
        let now = self.uptime();
        let mut fired = 0;

        // Bounded, so that a callback re-registering itself with a zero delay cannot starve the
        // caller.
        while fired < config::TIMER_SLOTS {
            // The hardware is re-programmed under the same lock, so a compare condition for an
            // entry taken here never outlives the lock.
            let Some(timer) = self.registry.lock(|registry| {
                let timer = registry.take_due(now)?;
                Self::rearm(registry);

                Some(timer)
            }) else {
                break;
            };

            // Important: Call the callback while not holding any lock, because the callback might
            // attempt to register a new timer.
            timer.fire();
            fired += 1;
        }

        self.registry.lock(|registry| Self::rearm(registry));

        fired
    }
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// Return a reference to the global TimeManager.
pub fn time_manager() -> &'static TimeManager {
    &TIME_MANAGER
}

impl TimeManager {
    /// Compatibility string.
    pub const COMPATIBLE: &'static str = "ARM Architectural Timer";

    /// Create an instance.
    pub const fn new() -> Self {
        Self {
            registry: IRQSafeNullLock::new(TimerRegistry::new()),
        }
    }

    /// The timer's resolution.
    pub fn resolution(&self) -> Duration {
        arch_time::resolution()
    }

    /// The uptime since power-on of the device.
    ///
    /// This includes time consumed by firmware and bootloaders.
    pub fn uptime(&self) -> Duration {
        arch_time::uptime()
    }

    /// Spin for a given duration.
    pub fn spin_for(&self, duration: Duration) {
        arch_time::spin_for(duration)
    }

    /// Number of armed timers.
    pub fn armed_timers(&self) -> usize {
        self.registry.lock(|registry| registry.active())
    }

    /// Whether the timeout IRQ is asserted right now.
    pub fn timeout_irq_pending(&self) -> bool {
        arch_time::timeout_irq_asserted()
    }

    /// Foreground service point. Fires due callbacks, if any.
    pub fn poll(&self) -> usize {
        let due = self.registry.lock(|registry| registry.next_due());

        match due {
            Some(due_time) if due_time <= self.uptime() => self.fire_due(),
            _ => 0,
        }
    }
}

impl TimerScheduler for TimeManager {
    fn register_timer(
        &self,
        delay: Duration,
        callback: TimerCallback,
        param: usize,
        context: usize,
    ) -> Result<TimerHandle, &'static str> {
        self.registry.lock(|registry| {
            let handle = registry.register(self.uptime(), delay, callback, param, context)?;
            Self::rearm(registry);

            Ok(handle)
        })
    }
}

impl MonotonicClock for TimeManager {
    fn uptime(&self) -> Duration {
        arch_time::uptime()
    }
}

/// Initialize the timer subsystem.
pub fn init() -> Result<(), &'static str> {
    static INIT_DONE: AtomicBool = AtomicBool::new(false);
    if INIT_DONE.load(Ordering::Relaxed) {
        return Err("Init already done");
    }

    let timer_descriptor =
        driver::DeviceDriverDescriptor::new(time_manager(), None, Some(arch_time::timeout_irq()));
    driver::driver_manager().register_driver(timer_descriptor);

    INIT_DONE.store(true, Ordering::Relaxed);
    Ok(())
}

//------------------------------------------------------------------------------
// OS Interface Code
//------------------------------------------------------------------------------

impl driver::interface::DeviceDriver for TimeManager {
    type IRQNumberType = IRQNumber;

    fn compatible(&self) -> &'static str {
        Self::COMPATIBLE
    }

    fn register_and_enable_irq_handler(
        &'static self,
        irq_number: &Self::IRQNumberType,
    ) -> Result<(), &'static str> {
        use exception::asynchronous::{irq_manager, IRQHandlerDescriptor};

        let descriptor = IRQHandlerDescriptor::new(*irq_number, Self::COMPATIBLE, self);

        irq_manager().register_handler(descriptor)?;
        irq_manager().enable(irq_number);

        Ok(())
    }
}

impl exception::asynchronous::interface::IRQHandler for TimeManager {
    fn handle(&self) -> Result<(), &'static str> {
        arch_time::conclude_timeout_irq();

        if self.fire_due() == 0 {
            warn!("Spurious timeout IRQ");
        }

        Ok(())
    }
}
