// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2023 Andre Richter <andre.o.richter@gmail.com>

//! Architectural synchronous and asynchronous exception handling.
//!
//! The kernel runs in EL1 on SP_EL1 and never drops to a lower level. The only vector that does
//! real work is therefore "IRQ, current EL with SP_ELx", which hands over to the registered IRQ
//! manager. Every other vector dumps the saved context and panics.
//!
//! # Orientation
//!
//! Since arch modules are imported into generic modules using the path attribute, the path of this
//! file is:
//!
//! crate::exception::arch_exception

use crate::exception::{self, PrivilegeLevel};
use aarch64_cpu::{asm::barrier, registers::*};
use core::{arch::global_asm, cell::UnsafeCell, fmt};
use tock_registers::{
    interfaces::{Readable, Writeable},
    registers::InMemoryRegister,
};

// Assembly counterpart to this file.
global_asm!(include_str!("exception.s"));

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

/// What `exception.s` pushes onto the stack before calling into Rust.
#[repr(C)]
struct ExceptionContext {
    /// x0 to x29.
    gpr: [u64; 30],

    /// x30.
    lr: u64,

    /// Where the interrupted code resumes.
    elr_el1: u64,

    spsr_el1: InMemoryRegister<u64, SPSR_EL1::Register>,

    esr_el1: InMemoryRegister<u64, ESR_EL1::Register>,
}

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

/// Vectors that must never be taken. Each one panics with the saved context.
macro_rules! fatal_vectors {
    ($($vector:ident => $origin:literal),+ $(,)?) => {
        $(
            #[no_mangle]
            extern "C" fn $vector(e: &mut ExceptionContext) {
                panic!("Unexpected CPU exception ({})\n\n{}", $origin, e);
            }
        )+
    };
}

fatal_vectors! {
    current_el0_synchronous   => "synchronous, SP_EL0",
    current_el0_irq           => "IRQ, SP_EL0",
    current_el0_serror        => "SError, SP_EL0",
    current_elx_synchronous   => "synchronous, current EL",
    current_elx_serror        => "SError, current EL",
    lower_aarch64_synchronous => "synchronous, lower EL, AArch64",
    lower_aarch64_irq         => "IRQ, lower EL, AArch64",
    lower_aarch64_serror      => "SError, lower EL, AArch64",
    lower_aarch32_synchronous => "synchronous, lower EL, AArch32",
    lower_aarch32_irq         => "IRQ, lower EL, AArch32",
    lower_aarch32_serror      => "SError, lower EL, AArch32",
}

#[no_mangle]
extern "C" fn current_elx_irq(_e: &mut ExceptionContext) {
    let token = unsafe { &exception::asynchronous::IRQContext::new() };
    exception::asynchronous::irq_manager().handle_pending_irqs(token);
}

fn exception_class_name(esr: &InMemoryRegister<u64, ESR_EL1::Register>) -> &'static str {
    use ESR_EL1::EC::Value;

    match esr.read_as_enum(ESR_EL1::EC) {
        Some(Value::DataAbortCurrentEL) => "Data Abort, current EL",
        Some(Value::DataAbortLowerEL) => "Data Abort, lower EL",
        Some(Value::InstrAbortCurrentEL) => "Instruction Abort, current EL",
        Some(Value::InstrAbortLowerEL) => "Instruction Abort, lower EL",
        Some(Value::SVC64) => "SVC from AArch64",
        Some(Value::PCAlignmentFault) => "PC alignment fault",
        Some(Value::SPAlignmentFault) => "SP alignment fault",
        Some(Value::Brk64) => "BRK instruction",
        _ => "unknown",
    }
}

#[rustfmt::skip]
impl fmt::Display for ExceptionContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let esr = &self.esr_el1;
        let spsr = &self.spsr_el1;
        let masked = |set: bool| if set { "masked" } else { "unmasked" };

        writeln!(f, "ESR_EL1: {:#010x} (EC {:#x}: {}, ISS {:#x})",
            esr.get(), esr.read(ESR_EL1::EC), exception_class_name(esr), esr.read(ESR_EL1::ISS))?;
        writeln!(f, "FAR_EL1: {:#018x}", FAR_EL1.get())?;
        writeln!(f, "ELR_EL1: {:#018x}", self.elr_el1)?;
        writeln!(f, "SPSR_EL1: {:#010x} (IRQ {}, FIQ {}, SError {}, Debug {})",
            spsr.get(),
            masked(spsr.is_set(SPSR_EL1::I)),
            masked(spsr.is_set(SPSR_EL1::F)),
            masked(spsr.is_set(SPSR_EL1::A)),
            masked(spsr.is_set(SPSR_EL1::D)))?;
        writeln!(f)?;

        for (i, pair) in self.gpr.chunks(2).enumerate() {
            writeln!(f, "      x{:<2}: {:#018x}   x{:<2}: {:#018x}",
                2 * i, pair[0], 2 * i + 1, pair[1])?;
        }
        write!(f, "      lr : {:#018x}", self.lr)
    }
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// The processing element's current privilege level.
pub fn current_privilege_level() -> (PrivilegeLevel, &'static str) {
    use CurrentEL::EL::Value;

    match CurrentEL.read_as_enum(CurrentEL::EL) {
        Some(Value::EL2) => (PrivilegeLevel::Hypervisor, "EL2"),
        Some(Value::EL1) => (PrivilegeLevel::Kernel, "EL1"),
        Some(Value::EL0) => (PrivilegeLevel::User, "EL0"),
        _ => (PrivilegeLevel::Unknown, "Unknown"),
    }
}

/// Point VBAR_EL1 at the vector table of `exception.s`.
///
/// # Safety
///
/// - Changes the HW state of the executing core.
/// - The table must be 2 KiB aligned, which `exception.s` takes care of.
pub unsafe fn handling_init() {
    extern "Rust" {
        static __exception_vector_start: UnsafeCell<()>;
    }

    VBAR_EL1.set(__exception_vector_start.get() as u64);

    // The next exception must already see the new table.
    barrier::isb(barrier::SY);
}
