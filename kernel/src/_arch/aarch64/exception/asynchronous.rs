// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2023 Andre Richter <andre.o.richter@gmail.com>

//! IRQ masking through PSTATE.DAIF.
//!
//! Writes to the DAIF bits take effect in program order (ARMv8-A ARM, C5.1.3), so no barrier
//! follows the `msr`.
//!
//! # Orientation
//!
//! Since arch modules are imported into generic modules using the path attribute, the path of this
//! file is:
//!
//! crate::exception::asynchronous::arch_asynchronous

use aarch64_cpu::registers::*;
use core::arch::asm;
use tock_registers::interfaces::{Readable, Writeable};

/// The I bit in the immediate form of `msr DAIFSet`/`msr DAIFClr`.
const DAIF_IMM_IRQ: u8 = 0b0010;

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// Whether the executing core ignores IRQs right now.
pub fn is_local_irq_masked() -> bool {
    DAIF.is_set(DAIF::I)
}

/// Let IRQs through on the executing core.
#[inline(always)]
pub fn local_irq_unmask() {
    unsafe {
        asm!("msr DAIFClr, {i}", i = const DAIF_IMM_IRQ, options(nomem, nostack, preserves_flags));
    }
}

/// Hold IRQs off on the executing core.
#[inline(always)]
pub fn local_irq_mask() {
    unsafe {
        asm!("msr DAIFSet, {i}", i = const DAIF_IMM_IRQ, options(nomem, nostack, preserves_flags));
    }
}

/// Mask IRQs and return the DAIF value from before, for [`local_irq_restore`].
#[inline(always)]
pub fn local_irq_mask_save() -> u64 {
    let saved = DAIF.get();
    local_irq_mask();

    saved
}

/// Write back a value obtained from [`local_irq_mask_save`]. The value is not checked.
#[inline(always)]
pub fn local_irq_restore(saved: u64) {
    DAIF.set(saved);
}

/// Log which exception classes are masked.
pub fn print_state() {
    use crate::info;

    let state = |masked: bool| if masked { "Masked" } else { "Unmasked" };

    info!("      Debug:  {}", state(DAIF.is_set(DAIF::D)));
    info!("      SError: {}", state(DAIF.is_set(DAIF::A)));
    info!("      IRQ:    {}", state(DAIF.is_set(DAIF::I)));
    info!("      FIQ:    {}", state(DAIF.is_set(DAIF::F)));
}
