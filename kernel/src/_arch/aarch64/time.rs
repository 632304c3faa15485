// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2023 Andre Richter <andre.o.richter@gmail.com>

//! Architectural timer primitives.
//!
//! The monotonic clock is the physical counter `CNTPCT_EL0`. Timeouts are signalled through the
//! non-secure EL1 physical timer, whose compare register is always programmed with the due time of
//! the earliest armed timer.
//!
//! # Orientation
//!
//! Since arch modules are imported into generic modules using the path attribute, the path of this
//! file is:
//!
//! crate::time::arch_time

use crate::{bsp, exception, warn};
use aarch64_cpu::{asm::barrier, registers::*};
use core::{num::NonZeroU32, time::Duration};
use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

const NANOSEC_PER_SEC: u64 = 1_000_000_000;

#[derive(Copy, Clone, PartialOrd, PartialEq)]
struct GenericTimerCounterValue(u64);

//--------------------------------------------------------------------------------------------------
// Global instances
//--------------------------------------------------------------------------------------------------

/// Written by `boot.s` from CNTFRQ_EL0 before Rust code runs. The initializer only keeps the type
/// valid.
#[no_mangle]
static ARCH_TIMER_COUNTER_FREQUENCY: NonZeroU32 = NonZeroU32::MIN;

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

fn arch_timer_counter_frequency() -> u64 {
    // The compiler cannot see the store in boot.s and would fold the initializer otherwise.
    let frequency = unsafe { core::ptr::read_volatile(&ARCH_TIMER_COUNTER_FREQUENCY) };

    u64::from(frequency.get())
}

impl From<GenericTimerCounterValue> for Duration {
    fn from(counter_value: GenericTimerCounterValue) -> Self {
        if counter_value.0 == 0 {
            return Duration::ZERO;
        }

        let frequency = arch_timer_counter_frequency();
        let secs = counter_value.0 / frequency;

        // frequency fits into u32, so the remainder times NANOSEC_PER_SEC fits into u64, and the
        // quotient is below NANOSEC_PER_SEC.
        let sub_second_counter_value = counter_value.0 % frequency;
        let nanos = (sub_second_counter_value * NANOSEC_PER_SEC / frequency) as u32;

        Duration::new(secs, nanos)
    }
}

impl TryFrom<Duration> for GenericTimerCounterValue {
    type Error = &'static str;

    fn try_from(duration: Duration) -> Result<Self, Self::Error> {
        if duration < resolution() {
            return Ok(GenericTimerCounterValue(0));
        }

        let frequency = u128::from(arch_timer_counter_frequency());
        let counter_value = duration
            .as_nanos()
            .checked_mul(frequency)
            .map(|v| v / u128::from(NANOSEC_PER_SEC))
            .ok_or("Conversion error. Duration too big")?;

        u64::try_from(counter_value)
            .map(GenericTimerCounterValue)
            .map_err(|_| "Conversion error. Duration too big")
    }
}

/// Counter read that cannot be hoisted above earlier instructions.
#[inline(always)]
fn read_cntpct() -> GenericTimerCounterValue {
    barrier::isb(barrier::SY);

    GenericTimerCounterValue(CNTPCT_EL0.get())
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// One counter tick.
pub fn resolution() -> Duration {
    Duration::from(GenericTimerCounterValue(1))
}

/// Time since power-on, firmware included.
pub fn uptime() -> Duration {
    read_cntpct().into()
}

/// Busy-wait for `duration`.
pub fn spin_for(duration: Duration) {
    let start = read_cntpct();

    let delta: GenericTimerCounterValue = match duration.try_into() {
        Ok(delta) => delta,
        Err(msg) => {
            warn!("spin_for: {}. Skipping", msg);
            return;
        }
    };
    let target = start.0.saturating_add(delta.0);

    // Ordering does not matter inside the loop, so no ISB here.
    while CNTPCT_EL0.get() < target {}
}

/// The IRQ number of the timeout interrupt.
pub fn timeout_irq() -> exception::asynchronous::IRQNumber {
    bsp::exception::asynchronous::irq_map::ARM_NS_PHYSICAL_TIMER
}

/// Program the timer to raise its IRQ at `due_time` (absolute uptime).
///
/// A due time in the past fires right away.
pub fn set_timeout_irq(due_time: Duration) {
    let counter_value: GenericTimerCounterValue = match due_time.try_into() {
        Err(msg) => {
            warn!("set_timeout_irq: {}. Skipping", msg);
            return;
        }
        Ok(val) => val,
    };

    CNTP_CVAL_EL0.set(counter_value.0);
    CNTP_CTL_EL0.modify(CNTP_CTL_EL0::IMASK::CLEAR + CNTP_CTL_EL0::ENABLE::SET);
}

/// Acknowledge and disarm the timeout IRQ.
pub fn conclude_timeout_irq() {
    CNTP_CTL_EL0.modify(CNTP_CTL_EL0::IMASK::SET + CNTP_CTL_EL0::ENABLE::CLEAR);
}

/// Whether the timeout IRQ line is currently asserted.
pub fn timeout_irq_asserted() -> bool {
    CNTP_CTL_EL0.matches_all(
        CNTP_CTL_EL0::ENABLE::SET + CNTP_CTL_EL0::IMASK::CLEAR + CNTP_CTL_EL0::ISTATUS::SET,
    )
}
