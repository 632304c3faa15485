// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2023 Andre Richter <andre.o.richter@gmail.com>

//! Fixed-size registry of one-shot timer callbacks.
//!
//! Entries fire once. A callback that wants to run again registers itself anew, which is how the
//! heartbeat keeps going. The registry does no locking of its own; the kernel keeps it behind an
//! IRQ-safe lock and calls the fired callbacks after releasing it.

use core::time::Duration;

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Timer interfaces.
pub mod interface {
    use super::{TimerCallback, TimerHandle};
    use core::time::Duration;

    /// Schedules one-shot callbacks.
    pub trait TimerScheduler {
        /// Call `callback(handle, param, context)` once, `delay` from now.
        fn register_timer(
            &self,
            delay: Duration,
            callback: TimerCallback,
            param: usize,
            context: usize,
        ) -> Result<TimerHandle, &'static str>;
    }
}

/// Signature of timer callbacks.
pub type TimerCallback = fn(handle: TimerHandle, param: usize, context: usize);

/// Identifies a registration. Never reused.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// One registry slot.
#[derive(Copy, Clone)]
struct TimerEntry {
    handle: TimerHandle,
    due_time: Duration,
    callback: TimerCallback,
    param: usize,
    context: usize,
    active: bool,
}

/// An entry that was taken out of the registry because it is due.
#[derive(Copy, Clone)]
pub struct FiredTimer {
    handle: TimerHandle,
    callback: TimerCallback,
    param: usize,
    context: usize,
}

/// The registry.
pub struct TimerRegistry<const N: usize> {
    entries: [TimerEntry; N],
    next_handle: u64,
}

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

fn unarmed(_handle: TimerHandle, _param: usize, _context: usize) {}

impl TimerEntry {
    const INACTIVE: Self = Self {
        handle: TimerHandle(0),
        due_time: Duration::ZERO,
        callback: unarmed,
        param: 0,
        context: 0,
        active: false,
    };
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl TimerHandle {
    /// The raw handle value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl FiredTimer {
    /// The handle the entry was registered under.
    pub fn handle(&self) -> TimerHandle {
        self.handle
    }

    /// Run the callback.
    pub fn fire(self) {
        (self.callback)(self.handle, self.param, self.context)
    }
}

impl<const N: usize> TimerRegistry<N> {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            entries: [TimerEntry::INACTIVE; N],
            next_handle: 1,
        }
    }

    /// Add an entry that becomes due at `now + delay`.
    pub fn register(
        &mut self,
        now: Duration,
        delay: Duration,
        callback: TimerCallback,
        param: usize,
        context: usize,
    ) -> Result<TimerHandle, &'static str> {
        let slot = self
            .entries
            .iter_mut()
            .find(|e| !e.active)
            .ok_or("Timer registry full")?;

        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;

        *slot = TimerEntry {
            handle,
            due_time: now.saturating_add(delay),
            callback,
            param,
            context,
            active: true,
        };

        Ok(handle)
    }

    /// Due time of the entry that fires next.
    pub fn next_due(&self) -> Option<Duration> {
        self.entries
            .iter()
            .filter(|e| e.active)
            .map(|e| e.due_time)
            .min()
    }

    /// Remove and return the earliest entry that is due at `now`.
    ///
    /// Ties are broken by registration order.
    pub fn take_due(&mut self, now: Duration) -> Option<FiredTimer> {
        let entry = self
            .entries
            .iter_mut()
            .filter(|e| e.active && e.due_time <= now)
            .min_by_key(|e| (e.due_time, e.handle))?;

        entry.active = false;

        Some(FiredTimer {
            handle: entry.handle,
            callback: entry.callback,
            param: entry.param,
            context: entry.context,
        })
    }

    /// Number of armed entries.
    pub fn active(&self) -> usize {
        self.entries.iter().filter(|e| e.active).count()
    }
}

impl<const N: usize> Default for TimerRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Mutex, vec::Vec};

    const MS: Duration = Duration::from_millis(1);

    static FIRED: Mutex<Vec<(u64, usize, usize)>> = Mutex::new(Vec::new());

    fn record(handle: TimerHandle, param: usize, context: usize) {
        FIRED.lock().unwrap().push((handle.get(), param, context));
    }

    fn noop(_: TimerHandle, _: usize, _: usize) {}

    #[test]
    fn nothing_fires_before_due_time() {
        let mut registry: TimerRegistry<4> = TimerRegistry::new();
        registry.register(Duration::ZERO, 10 * MS, noop, 0, 0).unwrap();

        assert!(registry.take_due(9 * MS).is_none());
        assert_eq!(registry.next_due(), Some(10 * MS));
        assert!(registry.take_due(10 * MS).is_some());
        assert_eq!(registry.active(), 0);
        assert_eq!(registry.next_due(), None);
    }

    #[test]
    fn earliest_due_entry_fires_first() {
        let mut registry: TimerRegistry<4> = TimerRegistry::new();
        let late = registry.register(Duration::ZERO, 30 * MS, noop, 0, 0).unwrap();
        let early = registry.register(Duration::ZERO, 5 * MS, noop, 0, 0).unwrap();

        assert_eq!(registry.take_due(40 * MS).unwrap().handle(), early);
        assert_eq!(registry.take_due(40 * MS).unwrap().handle(), late);
        assert!(registry.take_due(40 * MS).is_none());
    }

    #[test]
    fn full_registry_is_an_error() {
        let mut registry: TimerRegistry<2> = TimerRegistry::new();
        registry.register(Duration::ZERO, MS, noop, 0, 0).unwrap();
        registry.register(Duration::ZERO, MS, noop, 0, 0).unwrap();

        assert_eq!(
            registry.register(Duration::ZERO, MS, noop, 0, 0),
            Err("Timer registry full")
        );

        // A fired entry frees its slot.
        registry.take_due(MS).unwrap();
        assert!(registry.register(MS, MS, noop, 0, 0).is_ok());
    }

    #[test]
    fn handles_are_unique_and_callbacks_get_their_arguments() {
        let mut registry: TimerRegistry<4> = TimerRegistry::new();
        let a = registry.register(Duration::ZERO, MS, record, 7, 8).unwrap();
        registry.take_due(MS).unwrap().fire();
        let b = registry.register(MS, MS, record, 9, 10).unwrap();

        assert_ne!(a, b);
        assert!(FIRED.lock().unwrap().contains(&(a.get(), 7, 8)));
    }

    #[test]
    fn handles_increase_across_slot_reuse() {
        let mut registry: TimerRegistry<1> = TimerRegistry::new();
        let mut last = None;

        for i in 0..100 {
            let now = Duration::from_millis(i);
            let handle = registry.register(now, Duration::ZERO, noop, 0, 0).unwrap();
            assert!(last.map_or(true, |prev| handle > prev));
            last = Some(handle);

            registry.take_due(now).unwrap();
        }

        assert_eq!(last.map(TimerHandle::get), Some(100));
    }
}
