// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2020-2023 Andre Richter <andre.o.richter@gmail.com>

//! Locks for the single-core kernel.
//!
//! Two execution contexts exist on the boot core: the foreground and IRQ handlers. Neither lock
//! here spins. The registries are written only while bootstrapping, and everything the IRQ
//! handlers share with the foreground is touched with IRQs masked.
//!
//! # Resources
//!
//!   - <https://doc.rust-lang.org/book/ch16-04-extensible-concurrency-sync-and-send.html>
//!   - <https://doc.rust-lang.org/std/cell/index.html>

use core::cell::UnsafeCell;

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Synchronization interfaces.
pub mod interface {

    /// Exclusive access for the duration of a closure.
    pub trait Mutex {
        /// The protected data.
        type Data;

        /// Run `f` with exclusive access to the data.
        fn lock<'a, R>(&'a self, f: impl FnOnce(&'a mut Self::Data) -> R) -> R;
    }

    /// Shared reads, plus writes under conditions the implementor checks.
    pub trait ReadWriteEx {
        /// The protected data.
        type Data;

        /// Run `f` with mutable access to the data.
        fn write<'a, R>(&'a self, f: impl FnOnce(&'a mut Self::Data) -> R) -> R;

        /// Run `f` with shared access to the data.
        fn read<'a, R>(&'a self, f: impl FnOnce(&'a Self::Data) -> R) -> R;
    }
}

/// Writable while bootstrapping, read-only afterwards.
///
/// Holds the collaborator registries. They are filled in by the BSP before any IRQ is unmasked, so
/// reads never race with a write.
pub struct InitStateLock<T: ?Sized> {
    data: UnsafeCell<T>,
}

/// Masks IRQs on the boot core while the data is borrowed.
///
/// Only sound as long as a single core runs. It is what keeps the UART's ring producer with one
/// writer at a time, whether the UART IRQ handler or the foreground drain loop ingests.
pub struct IRQSafeNullLock<T: ?Sized> {
    data: UnsafeCell<T>,
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

unsafe impl<T: ?Sized + Send> Send for InitStateLock<T> {}
unsafe impl<T: ?Sized + Send> Sync for InitStateLock<T> {}

unsafe impl<T: ?Sized + Send> Send for IRQSafeNullLock<T> {}
unsafe impl<T: ?Sized + Send> Sync for IRQSafeNullLock<T> {}

impl<T> InitStateLock<T> {
    /// Create an instance.
    pub const fn new(data: T) -> Self {
        Self {
            data: UnsafeCell::new(data),
        }
    }
}

impl<T> IRQSafeNullLock<T> {
    /// Create an instance.
    pub const fn new(data: T) -> Self {
        Self {
            data: UnsafeCell::new(data),
        }
    }
}

//------------------------------------------------------------------------------
// OS Interface Code
//------------------------------------------------------------------------------
use crate::{exception, state};

impl<T> interface::ReadWriteEx for InitStateLock<T> {
    type Data = T;

    fn write<'a, R>(&'a self, f: impl FnOnce(&'a mut Self::Data) -> R) -> R {
        assert!(
            state::state_manager().is_bootstrapping(),
            "Registry written after bootstrap"
        );
        assert!(
            exception::asynchronous::is_local_irq_masked(),
            "Registry written with IRQs unmasked"
        );

        // Single core, IRQs masked, no readers can run concurrently.
        f(unsafe { &mut *self.data.get() })
    }

    fn read<'a, R>(&'a self, f: impl FnOnce(&'a Self::Data) -> R) -> R {
        f(unsafe { &*self.data.get() })
    }
}

impl<T> interface::Mutex for IRQSafeNullLock<T> {
    type Data = T;

    fn lock<'a, R>(&'a self, f: impl FnOnce(&'a mut Self::Data) -> R) -> R {
        exception::asynchronous::exec_with_irq_masked(|| {
            // Nothing else runs on this core until the closure returns.
            f(unsafe { &mut *self.data.get() })
        })
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use interface::{Mutex, ReadWriteEx};
    use test_macros::kernel_test;

    /// The lock masks IRQs for the duration of the closure and restores them afterwards.
    #[kernel_test]
    fn irq_safe_lock_masks_irqs() {
        let lock = IRQSafeNullLock::new(0_u32);

        exception::asynchronous::local_irq_unmask();
        let masked_inside = lock.lock(|v| {
            *v += 1;
            exception::asynchronous::is_local_irq_masked()
        });
        let masked_after = exception::asynchronous::is_local_irq_masked();
        exception::asynchronous::local_irq_mask();

        assert!(masked_inside);
        assert!(!masked_after);
        assert_eq!(lock.lock(|v| *v), 1);
    }

    /// Writes during init are visible to subsequent reads.
    #[kernel_test]
    fn init_state_lock_write_then_read() {
        let lock = InitStateLock::new([0_u8; 4]);

        lock.write(|buf| buf[2] = 7);
        assert_eq!(lock.read(|buf| buf[2]), 7);
    }
}
