// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2023 Andre Richter <andre.o.richter@gmail.com>

//! Board support. The Raspberry Pi 3 is the only board.

mod device_driver;

#[cfg(feature = "bsp_rpi3")]
mod raspberrypi;

#[cfg(feature = "bsp_rpi3")]
pub use raspberrypi::*;

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use test_macros::kernel_test;

    /// No address may belong to two special ranges.
    #[kernel_test]
    fn virt_mem_layout_has_no_overlaps() {
        let mut ranges: alloc::vec::Vec<_> = memory::mmu::virt_mem_layout()
            .inner()
            .iter()
            .map(|d| (d.virtual_range)())
            .collect();
        ranges.sort_by_key(|r| *r.start());

        for pair in ranges.windows(2) {
            assert!(pair[0].end() < pair[1].start());
        }
    }
}
