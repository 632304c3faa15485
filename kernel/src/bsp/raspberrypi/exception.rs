// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2020-2023 Andre Richter <andre.o.richter@gmail.com>

//! BSP synchronous and asynchronous exception handling.

pub mod asynchronous;
