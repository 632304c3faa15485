// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2021-2023 Andre Richter <andre.o.richter@gmail.com>

//! Architectural boot code.
//!
//! # Orientation
//!
//! Since arch modules are imported into generic modules using the path attribute, the path of this
//! file is:
//!
//! crate::cpu::boot::arch_boot

use aarch64_cpu::{asm, registers::*};
use core::arch::global_asm;
use tock_registers::interfaces::Writeable;

// Assembly counterpart to this file.
global_asm!(
    include_str!("boot.s"),
    CONST_CURRENTEL_EL2 = const 0x8,
    CONST_CORE_ID_MASK = const 0b11
);

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

/// Configure EL1 and the fake exception frame that `eret` consumes.
///
/// # Safety
///
/// - `.bss` is already zeroed, but nothing else is initialized.
#[inline(always)]
unsafe fn prepare_el2_to_el1_transition(stack_end: u64) {
    // The timer heartbeat programs the physical timer from EL1.
    CNTHCTL_EL2.write(CNTHCTL_EL2::EL1PCEN::SET + CNTHCTL_EL2::EL1PCTEN::SET);
    CNTVOFF_EL2.set(0);

    HCR_EL2.write(HCR_EL2::RW::EL1IsAarch64);

    // Arrive in EL1h with everything masked. kernel_init() unmasks IRQs as its last step.
    SPSR_EL2.write(
        SPSR_EL2::D::Masked
            + SPSR_EL2::A::Masked
            + SPSR_EL2::I::Masked
            + SPSR_EL2::F::Masked
            + SPSR_EL2::M::EL1h,
    );
    ELR_EL2.set(crate::kernel_init as *const () as u64);

    // EL2 is never re-entered, so EL1 keeps using the boot stack.
    SP_EL1.set(stack_end);
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// Called by `_start` in `boot.s`. Drops to EL1 and continues in `kernel_init()`.
///
/// # Safety
///
/// - Must only be called once, from `_start`.
#[no_mangle]
pub unsafe extern "C" fn _start_rust(stack_end: u64) -> ! {
    prepare_el2_to_el1_transition(stack_end);

    asm::eret()
}
