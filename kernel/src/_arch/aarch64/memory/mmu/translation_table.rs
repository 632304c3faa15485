// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2021-2023 Andre Richter <andre.o.richter@gmail.com>

//! Identity translation tables.
//!
//! Two levels with the 64 KiB granule: every level 2 entry points at one level 3 table, and every
//! level 3 entry maps one page onto itself. Page attributes come from the board's layout.
//!
//! # Orientation
//!
//! The path of this file is:
//!
//! crate::memory::mmu::arch_mmu::translation_table

use super::{mair, Granule512MiB, Granule64KiB};
use crate::{
    bsp,
    memory::mmu::{AccessPermissions, AttributeFields, KernelVirtualLayout, MemAttributes},
};
use tock_registers::{
    fields::FieldValue,
    interfaces::{Readable, Writeable},
    register_bitfields,
    registers::InMemoryRegister,
};

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

// Stage 1 descriptor bits with the 64 KiB granule (ARMv8-A ARM, D5.3). Table descriptors only use
// VALID, TYPE and OUTPUT_ADDR. Page descriptors use all of them.
register_bitfields! {u64,
    DESCRIPTOR [
        UXN         OFFSET(54) NUMBITS(1) [],
        PXN         OFFSET(53) NUMBITS(1) [],

        /// Bits [47:16] of the next table or of the page.
        OUTPUT_ADDR OFFSET(16) NUMBITS(32) [],

        AF          OFFSET(10) NUMBITS(1) [],

        SH          OFFSET(8) NUMBITS(2) [
            OuterShareable = 0b10,
            InnerShareable = 0b11
        ],

        AP          OFFSET(6) NUMBITS(2) [
            RW_EL1 = 0b00,
            RO_EL1 = 0b10
        ],

        /// Index into MAIR_EL1.
        ATTR_INDX   OFFSET(2) NUMBITS(3) [],

        /// Set for table descriptors at level 2 and for page descriptors at level 3.
        TYPE        OFFSET(1) NUMBITS(1) [],
        VALID       OFFSET(0) NUMBITS(1) []
    ]
}

type DescriptorValue = FieldValue<u64, DESCRIPTOR::Register>;

/// One 64 bit entry of either level.
#[derive(Copy, Clone)]
#[repr(transparent)]
struct Descriptor(u64);

const PAGES_PER_TABLE: usize = Granule512MiB::SIZE >> Granule64KiB::SHIFT;

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// All tables of the kernel in one block. Each level 3 table is 64 KiB in size, so putting them
/// first keeps every table at a granule boundary.
#[repr(C)]
#[repr(align(65536))]
pub struct FixedSizeTranslationTable<const NUM_TABLES: usize> {
    pages: [[Descriptor; PAGES_PER_TABLE]; NUM_TABLES],
    tables: [Descriptor; NUM_TABLES],
}

/// Tables covering the kernel's address space.
pub type KernelTranslationTable =
    FixedSizeTranslationTable<{ bsp::memory::mmu::KernelAddrSpace::SIZE >> Granule512MiB::SHIFT }>;

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

fn page_attributes(attributes: AttributeFields) -> DescriptorValue {
    let memory = match attributes.mem_attributes {
        MemAttributes::CacheableDRAM => {
            DESCRIPTOR::SH::InnerShareable + DESCRIPTOR::ATTR_INDX.val(mair::NORMAL)
        }
        MemAttributes::Device => {
            DESCRIPTOR::SH::OuterShareable + DESCRIPTOR::ATTR_INDX.val(mair::DEVICE)
        }
    };

    let access = match attributes.acc_perms {
        AccessPermissions::ReadOnly => DESCRIPTOR::AP::RO_EL1,
        AccessPermissions::ReadWrite => DESCRIPTOR::AP::RW_EL1,
    };

    // Nothing runs at EL0.
    memory + access + DESCRIPTOR::PXN.val(attributes.execute_never as u64) + DESCRIPTOR::UXN::SET
}

impl Descriptor {
    const INVALID: Self = Self(0);

    fn encode(value: DescriptorValue) -> Self {
        let reg = InMemoryRegister::<u64, DESCRIPTOR::Register>::new(0);
        reg.write(value);

        Self(reg.get())
    }

    fn table(next_table_addr: usize) -> Self {
        Self::encode(
            DESCRIPTOR::OUTPUT_ADDR.val((next_table_addr >> Granule64KiB::SHIFT) as u64)
                + DESCRIPTOR::TYPE::SET
                + DESCRIPTOR::VALID::SET,
        )
    }

    fn identity_page(addr: usize, attributes: AttributeFields) -> Self {
        Self::encode(
            DESCRIPTOR::OUTPUT_ADDR.val((addr >> Granule64KiB::SHIFT) as u64)
                + DESCRIPTOR::AF::SET
                + DESCRIPTOR::TYPE::SET
                + DESCRIPTOR::VALID::SET
                + page_attributes(attributes),
        )
    }
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl<const NUM_TABLES: usize> FixedSizeTranslationTable<NUM_TABLES> {
    /// All entries invalid. Zero bits only, so the instance can live in `.bss`.
    #[allow(clippy::assertions_on_constants)]
    pub const fn new() -> Self {
        assert!(NUM_TABLES > 0);

        Self {
            pages: [[Descriptor::INVALID; PAGES_PER_TABLE]; NUM_TABLES],
            tables: [Descriptor::INVALID; NUM_TABLES],
        }
    }

    /// Fill in every entry so that each page maps onto itself with the attributes `layout`
    /// assigns to it.
    ///
    /// The code runs identity mapped, so the tables' own addresses are physical addresses.
    pub fn populate_identity<const N: usize>(
        &mut self,
        layout: &KernelVirtualLayout<N>,
    ) -> Result<(), &'static str> {
        for (table_nr, pages) in self.pages.iter_mut().enumerate() {
            self.tables[table_nr] = Descriptor::table(pages.as_ptr() as usize);

            let table_base = table_nr << Granule512MiB::SHIFT;
            for (page_nr, page) in pages.iter_mut().enumerate() {
                let addr = table_base + (page_nr << Granule64KiB::SHIFT);

                *page = Descriptor::identity_page(addr, layout.virt_addr_properties(addr)?);
            }
        }

        Ok(())
    }

    /// Value for TTBR0_EL1.
    pub fn phys_base_address(&self) -> u64 {
        self.tables.as_ptr() as u64
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use test_macros::kernel_test;

    fn decode(d: Descriptor) -> InMemoryRegister<u64, DESCRIPTOR::Register> {
        InMemoryRegister::new(d.0)
    }

    #[kernel_test]
    fn descriptor_is_one_u64() {
        assert_eq!(core::mem::size_of::<Descriptor>(), core::mem::size_of::<u64>());
    }

    /// Device pages must not be executable or cacheable.
    #[kernel_test]
    fn device_page_uses_device_attributes() {
        let attr = AttributeFields {
            mem_attributes: MemAttributes::Device,
            acc_perms: AccessPermissions::ReadWrite,
            execute_never: true,
        };
        let reg = decode(Descriptor::identity_page(0x3F20_0000, attr));

        assert_eq!(reg.read(DESCRIPTOR::ATTR_INDX), mair::DEVICE);
        assert!(reg.is_set(DESCRIPTOR::PXN));
        assert!(reg.is_set(DESCRIPTOR::AF));
        assert_eq!(reg.read(DESCRIPTOR::OUTPUT_ADDR) << Granule64KiB::SHIFT, 0x3F20_0000);
    }

    #[kernel_test]
    fn code_page_is_read_only_and_executable() {
        let attr = AttributeFields {
            mem_attributes: MemAttributes::CacheableDRAM,
            acc_perms: AccessPermissions::ReadOnly,
            execute_never: false,
        };
        let reg = decode(Descriptor::identity_page(0x8_0000, attr));

        assert_eq!(reg.read(DESCRIPTOR::ATTR_INDX), mair::NORMAL);
        assert!(reg.matches_all(DESCRIPTOR::AP::RO_EL1));
        assert!(!reg.is_set(DESCRIPTOR::PXN));
    }
}
