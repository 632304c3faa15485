// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2023 Andre Richter <andre.o.richter@gmail.com>

//! BCM driver top level.

mod bcm2xxx_dma;
mod bcm2xxx_gpio;
mod bcm2xxx_interrupt_controller;
mod bcm2xxx_mailbox;
mod bcm2xxx_pl011_uart;

pub use bcm2xxx_dma::*;
pub use bcm2xxx_gpio::*;
pub use bcm2xxx_interrupt_controller::*;
pub use bcm2xxx_mailbox::*;
pub use bcm2xxx_pl011_uart::*;
