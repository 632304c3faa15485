// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2023 Andre Richter <andre.o.richter@gmail.com>

//! Device driver.

#[cfg(feature = "bsp_rpi3")]
mod bcm;
mod common;

#[cfg(feature = "bsp_rpi3")]
pub use bcm::*;
