// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2023 Andre Richter <andre.o.richter@gmail.com>

//! Cancellation token for the otherwise endless loops.

use core::sync::atomic::{AtomicBool, Ordering};

/// Once cancelled, stays cancelled.
pub struct CancelToken {
    cancelled: AtomicBool,
}

impl CancelToken {
    /// Create a token that is not cancelled.
    pub const fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
        }
    }

    /// Request loops observing this token to return.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release)
    }

    /// Whether [`Self::cancel`] was called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
