// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2023 Andre Richter <andre.o.richter@gmail.com>

//! Stand-in until the BSP registers the interrupt controller.
//!
//! Reaching any of these functions means the boot order is broken, so they panic.

use super::{interface, IRQContext, IRQHandlerDescriptor, IRQNumber};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

pub struct NullIRQManager;

//--------------------------------------------------------------------------------------------------
// Global instances
//--------------------------------------------------------------------------------------------------

pub static NULL_IRQ_MANAGER: NullIRQManager = NullIRQManager;

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

fn unregistered(operation: &str) -> ! {
    panic!("IRQ {} before the interrupt controller was registered", operation)
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl interface::IRQManager for NullIRQManager {
    type IRQNumberType = IRQNumber;

    fn register_handler(
        &self,
        _descriptor: IRQHandlerDescriptor<Self::IRQNumberType>,
    ) -> Result<(), &'static str> {
        unregistered("registration")
    }

    fn enable(&self, irq_number: &Self::IRQNumberType) {
        panic!("IRQ {} enabled before the interrupt controller was registered", irq_number)
    }

    fn handle_pending_irqs<'irq_context>(&'irq_context self, _ic: &IRQContext<'irq_context>) {
        unregistered("dispatch")
    }
}
