// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2020-2023 Andre Richter <andre.o.richter@gmail.com>

//! Asynchronous exception handling.
//!
//! Two interrupt lines matter to the terminal: the PL011 UART (received bytes) and the ARM
//! physical timer (timer callbacks). Both go through the IRQ manager registered here, which the
//! architectural IRQ vector calls into.

#[cfg(target_arch = "aarch64")]
#[path = "../_arch/aarch64/exception/asynchronous.rs"]
mod arch_asynchronous;
mod null_irq_manager;

use crate::{bsp, synchronization};
use core::marker::PhantomData;

//--------------------------------------------------------------------------------------------------
// Architectural Public Reexports
//--------------------------------------------------------------------------------------------------
pub use arch_asynchronous::{
    is_local_irq_masked, local_irq_mask, local_irq_mask_save, local_irq_restore, local_irq_unmask,
    print_state,
};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// The board's interrupt number type.
pub type IRQNumber = bsp::exception::asynchronous::IRQNumber;

/// Binds a handler to an interrupt line.
#[derive(Copy, Clone)]
pub struct IRQHandlerDescriptor<T: Copy> {
    number: T,
    name: &'static str,
    handler: &'static (dyn interface::IRQHandler + Sync),
}

/// Proof of running in IRQ context.
///
/// Only the IRQ vector can create one, so functions that take it cannot be called from the
/// foreground by accident. The idea is the `CriticalSection` token of
/// <https://github.com/rust-embedded/bare-metal>.
#[derive(Clone, Copy)]
pub struct IRQContext<'irq_context> {
    _0: PhantomData<&'irq_context ()>,
}

/// Asynchronous exception handling interfaces.
pub mod interface {

    /// A device that raises interrupts.
    pub trait IRQHandler {
        /// Service the device. Errors are logged by the dispatcher and do not stop it.
        fn handle(&self) -> Result<(), &'static str>;
    }

    /// The interrupt controller, as seen by the kernel.
    pub trait IRQManager {
        /// The controller's interrupt number type.
        type IRQNumberType: Copy;

        /// Bind a handler to a line. A line can be bound once.
        fn register_handler(
            &self,
            irq_handler_descriptor: super::IRQHandlerDescriptor<Self::IRQNumberType>,
        ) -> Result<(), &'static str>;

        /// Let the line through to the core.
        fn enable(&self, irq_number: &Self::IRQNumberType);

        /// Call the handler of every line that is pending.
        ///
        /// Runs from the IRQ vector with further IRQs masked, start to finish.
        #[allow(clippy::trivially_copy_pass_by_ref)]
        fn handle_pending_irqs<'irq_context>(
            &'irq_context self,
            ic: &super::IRQContext<'irq_context>,
        );

        /// Log the bound handlers.
        fn print_handler(&self) {}
    }
}

//--------------------------------------------------------------------------------------------------
// Global instances
//--------------------------------------------------------------------------------------------------

static CUR_IRQ_MANAGER: InitStateLock<
    &'static (dyn interface::IRQManager<IRQNumberType = IRQNumber> + Sync),
> = InitStateLock::new(&null_irq_manager::NULL_IRQ_MANAGER);

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------
use synchronization::{interface::ReadWriteEx, InitStateLock};

impl<T: Copy> IRQHandlerDescriptor<T> {
    /// Create an instance.
    pub const fn new(
        number: T,
        name: &'static str,
        handler: &'static (dyn interface::IRQHandler + Sync),
    ) -> Self {
        Self {
            number,
            name,
            handler,
        }
    }

    /// The line.
    pub const fn number(&self) -> T {
        self.number
    }

    /// The name shown in the handler list.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The handler.
    pub const fn handler(&self) -> &'static (dyn interface::IRQHandler + Sync) {
        self.handler
    }
}

impl<'irq_context> IRQContext<'irq_context> {
    /// Create the token.
    ///
    /// # Safety
    ///
    /// - Only the IRQ vector may call this, and the token must not outlive the vector.
    /// - The lifetime is picked by the caller. It must stay local to the vector function.
    #[inline(always)]
    pub unsafe fn new() -> Self {
        IRQContext { _0: PhantomData }
    }
}

/// Run `f` with IRQs masked on this core, then restore the previous mask.
#[inline(always)]
pub fn exec_with_irq_masked<T>(f: impl FnOnce() -> T) -> T {
    let saved = local_irq_mask_save();
    let ret = f();
    local_irq_restore(saved);

    ret
}

/// Register the board's interrupt controller.
pub fn register_irq_manager(
    new_manager: &'static (dyn interface::IRQManager<IRQNumberType = IRQNumber> + Sync),
) {
    CUR_IRQ_MANAGER.write(|manager| *manager = new_manager);
}

/// The interrupt controller the IRQ vector dispatches to.
pub fn irq_manager() -> &'static dyn interface::IRQManager<IRQNumberType = IRQNumber> {
    CUR_IRQ_MANAGER.read(|manager| *manager)
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use test_macros::kernel_test;

    /// Nested critical sections leave IRQs masked until the outermost one ends.
    #[kernel_test]
    fn nested_masking_restores_outer_state() {
        local_irq_unmask();

        let inner_masked = exec_with_irq_masked(|| {
            exec_with_irq_masked(|| ());
            is_local_irq_masked()
        });

        assert!(inner_masked);
        assert!(!is_local_irq_masked());

        local_irq_mask();
    }
}
