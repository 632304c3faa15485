// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2023 Andre Richter <andre.o.richter@gmail.com>

//! Backspace echo suppression.
//!
//! Some remote terminals answer a DEL with an echo sequence that would be drawn as two separate
//! glyphs. After a local DEL, the next two inbound bytes rendered within [`SUPPRESSION_WINDOW`]
//! are replaced by a single DEL rendering.
//!
//! The keyboard context only posts "DEL pressed at T" into a [`BackspaceMailbox`]. The counter
//! itself lives in a [`BackspaceFilter`] that only the drain loop owns.

use core::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// The DEL byte.
pub const DEL: u8 = 0x7F;

/// How long after a press the echo is expected.
pub const SUPPRESSION_WINDOW: Duration = Duration::from_micros(50_000);

/// Number of inbound renderings covered by one press.
pub const SUPPRESSED_ECHOES: u8 = 2;

/// Single-slot, lock-free event channel from the keyboard context to the drain loop.
///
/// Only the most recent unconsumed press is kept.
pub struct BackspaceMailbox {
    /// Press time in microseconds plus one. Zero means "no event".
    pressed_at: AtomicU64,
}

/// Suppression state. Owned by the drain loop.
#[derive(Debug)]
pub struct BackspaceFilter {
    remaining: u8,
    armed_at: Duration,
    window: Duration,
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl BackspaceMailbox {
    /// Create an empty mailbox.
    pub const fn new() -> Self {
        Self {
            pressed_at: AtomicU64::new(0),
        }
    }

    /// Record a press. Replaces an event the drain loop has not picked up yet.
    pub fn post(&self, at: Duration) {
        let micros = u64::try_from(at.as_micros()).unwrap_or(u64::MAX);

        self.pressed_at.store(micros.saturating_add(1), Ordering::Release);
    }

    /// Take the pending press, if any.
    pub fn take(&self) -> Option<Duration> {
        match self.pressed_at.swap(0, Ordering::Acquire) {
            0 => None,
            v => Some(Duration::from_micros(v - 1)),
        }
    }
}

impl Default for BackspaceMailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl BackspaceFilter {
    /// Create an idle filter.
    pub const fn new(window: Duration) -> Self {
        Self {
            remaining: 0,
            armed_at: Duration::ZERO,
            window,
        }
    }

    /// Start a suppression window. A press inside a running window restarts it.
    pub fn arm(&mut self, at: Duration) {
        self.remaining = SUPPRESSED_ECHOES;
        self.armed_at = at;
    }

    /// Whether renderings are currently being counted.
    pub fn is_armed(&self) -> bool {
        self.remaining > 0
    }

    /// Decide what to render for an inbound `byte` at time `now`.
    ///
    /// `None` means render nothing.
    pub fn filter(&mut self, byte: u8, now: Duration) -> Option<u8> {
        if self.remaining > 0 && now.saturating_sub(self.armed_at) > self.window {
            self.remaining = 0;
        }

        if self.remaining == 0 {
            return Some(byte);
        }

        self.remaining -= 1;
        if self.remaining == 0 {
            Some(DEL)
        } else {
            None
        }
    }
}

impl Default for BackspaceFilter {
    fn default() -> Self {
        Self::new(SUPPRESSION_WINDOW)
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn mailbox_hands_out_each_press_once() {
        let mailbox = BackspaceMailbox::new();
        assert_eq!(mailbox.take(), None);

        mailbox.post(Duration::ZERO);
        assert_eq!(mailbox.take(), Some(Duration::ZERO));
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn mailbox_keeps_latest_press() {
        let mailbox = BackspaceMailbox::new();

        mailbox.post(3 * MS);
        mailbox.post(7 * MS);
        assert_eq!(mailbox.take(), Some(7 * MS));
    }

    #[test]
    fn mailbox_accepts_far_future_press_times() {
        let mailbox = BackspaceMailbox::new();

        mailbox.post(Duration::from_micros(u64::MAX));
        assert_eq!(mailbox.take(), Some(Duration::from_micros(u64::MAX - 1)));

        mailbox.post(Duration::MAX);
        assert_eq!(mailbox.take(), Some(Duration::from_micros(u64::MAX - 1)));
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn idle_filter_passes_bytes_through() {
        let mut filter = BackspaceFilter::default();

        assert_eq!(filter.filter(b'x', 10 * MS), Some(b'x'));
        assert!(!filter.is_armed());
    }

    #[test]
    fn two_echoes_collapse_into_one_del() {
        let mut filter = BackspaceFilter::default();
        filter.arm(100 * MS);

        assert_eq!(filter.filter(0x08, 101 * MS), None);
        assert_eq!(filter.filter(b' ', 102 * MS), Some(DEL));
        assert_eq!(filter.filter(b'z', 103 * MS), Some(b'z'));
    }

    #[test]
    fn window_expiry_restores_normal_rendering() {
        let mut filter = BackspaceFilter::default();
        filter.arm(100 * MS);

        assert_eq!(filter.filter(b'a', 100 * MS + SUPPRESSION_WINDOW + MS), Some(b'a'));
        assert!(!filter.is_armed());
    }

    #[test]
    fn rearm_inside_window_restarts_count() {
        let mut filter = BackspaceFilter::default();
        filter.arm(Duration::ZERO);
        assert_eq!(filter.filter(b'1', MS), None);

        filter.arm(2 * MS);
        assert_eq!(filter.filter(b'2', 3 * MS), None);
        assert_eq!(filter.filter(b'3', 4 * MS), Some(DEL));
    }
}
