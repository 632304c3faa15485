// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2023 Andre Richter <andre.o.richter@gmail.com>

//! AArch64 MMU.
//!
//! 64 KiB granule, TTBR0 only, identity mapped. Enabling the MMU is what makes the data cache
//! usable, which in turn is needed for the exclusive loads and stores behind atomics.
//!
//! # Orientation
//!
//! Since arch modules are imported into generic modules using the path attribute, the path of this
//! file is:
//!
//! crate::memory::mmu::arch_mmu

#[path = "mmu/translation_table.rs"]
mod translation_table;

use crate::{
    bsp, memory,
    memory::mmu::{MMUEnableError, TranslationGranule},
};
use aarch64_cpu::{asm::barrier, registers::*};
use core::ptr::addr_of_mut;
use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use translation_table::KernelTranslationTable;

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

struct MemoryManagementUnit;

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Span of one level 2 entry.
pub type Granule512MiB = TranslationGranule<{ 512 * 1024 * 1024 }>;

/// Span of one level 3 entry.
pub type Granule64KiB = TranslationGranule<{ 64 * 1024 }>;

/// MAIR_EL1 attribute slots.
pub mod mair {
    /// nGnRE device memory.
    pub const DEVICE: u64 = 0;

    /// Write-back cacheable DRAM.
    pub const NORMAL: u64 = 1;
}

//--------------------------------------------------------------------------------------------------
// Global instances
//--------------------------------------------------------------------------------------------------

/// All initial bits are zero, so this lands in `.bss` and costs nothing in the image.
static mut KERNEL_TABLES: KernelTranslationTable = KernelTranslationTable::new();

static MMU: MemoryManagementUnit = MemoryManagementUnit;

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

impl<const AS_SIZE: usize> memory::mmu::AddressSpace<AS_SIZE> {
    /// Whole level 2 entries, and no more than 48 bits of input address.
    pub const fn arch_address_space_size_sanity_checks() {
        assert!((AS_SIZE % Granule512MiB::SIZE) == 0);
        assert!(AS_SIZE <= (1 << 48));
    }
}

impl MemoryManagementUnit {
    fn program_registers(&self, table_base: u64) {
        MAIR_EL1.write(
            MAIR_EL1::Attr0_Device::nonGathering_nonReordering_EarlyWriteAck
                + MAIR_EL1::Attr1_Normal_Outer::WriteBack_NonTransient_ReadWriteAlloc
                + MAIR_EL1::Attr1_Normal_Inner::WriteBack_NonTransient_ReadWriteAlloc,
        );

        TTBR0_EL1.set_baddr(table_base);

        let t0sz = (64 - bsp::memory::mmu::KernelAddrSpace::SIZE_SHIFT) as u64;
        TCR_EL1.write(
            TCR_EL1::T0SZ.val(t0sz)
                + TCR_EL1::TG0::KiB_64
                + TCR_EL1::IPS::Bits_40
                + TCR_EL1::TBI0::Used
                + TCR_EL1::SH0::Inner
                + TCR_EL1::IRGN0::WriteBack_ReadAlloc_WriteAlloc_Cacheable
                + TCR_EL1::ORGN0::WriteBack_ReadAlloc_WriteAlloc_Cacheable
                + TCR_EL1::A1::TTBR0
                + TCR_EL1::EPD0::EnableTTBR0Walks
                + TCR_EL1::EPD1::DisableTTBR1Walks,
        );
    }
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// The MMU.
pub fn mmu() -> &'static impl memory::mmu::interface::MMU {
    &MMU
}

//------------------------------------------------------------------------------
// OS Interface Code
//------------------------------------------------------------------------------

impl memory::mmu::interface::MMU for MemoryManagementUnit {
    unsafe fn enable_mmu_and_caching(&self) -> Result<(), MMUEnableError> {
        if self.is_enabled() {
            return Err(MMUEnableError::AlreadyEnabled);
        }

        if !ID_AA64MMFR0_EL1.matches_all(ID_AA64MMFR0_EL1::TGran64::Supported) {
            return Err(MMUEnableError::Other("64 KiB translation granule not supported"));
        }

        let tables = &mut *addr_of_mut!(KERNEL_TABLES);
        tables
            .populate_identity(bsp::memory::mmu::virt_mem_layout())
            .map_err(MMUEnableError::Other)?;

        self.program_registers(tables.phys_base_address());

        // Register writes must be visible to the table walker before it is switched on.
        barrier::isb(barrier::SY);
        SCTLR_EL1.modify(SCTLR_EL1::M::Enable + SCTLR_EL1::C::Cacheable + SCTLR_EL1::I::Cacheable);
        barrier::isb(barrier::SY);

        Ok(())
    }

    #[inline(always)]
    fn is_enabled(&self) -> bool {
        SCTLR_EL1.matches_all(SCTLR_EL1::M::Enable)
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::mmu::interface::MMU;
    use core::cell::UnsafeCell;
    use test_macros::kernel_test;

    /// The boot code zeroes `.bss`, which the empty tables rely on.
    #[kernel_test]
    fn kernel_tables_in_bss() {
        extern "Rust" {
            static __bss_start: UnsafeCell<u64>;
            static __bss_end_exclusive: UnsafeCell<u64>;
        }

        let bss = unsafe { __bss_start.get() as usize..__bss_end_exclusive.get() as usize };
        let tables = unsafe { addr_of_mut!(KERNEL_TABLES) as usize };

        assert!(bss.contains(&tables));
    }

    /// `memory::init()` ran before the tests.
    #[kernel_test]
    fn mmu_is_on_and_refuses_second_enable() {
        assert!(mmu().is_enabled());

        let second = unsafe { mmu().enable_mmu_and_caching() };
        assert!(matches!(second, Err(MMUEnableError::AlreadyEnabled)));
    }
}
