// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2019-2023 Andre Richter <andre.o.richter@gmail.com>

//! Types for the `custom_test_frameworks` implementation.

#![no_std]

/// Unit test container.
pub struct UnitTest {
    /// Name of the test.
    pub name: &'static str,

    /// Module path of the test, relative to the crate root.
    pub module: &'static str,

    /// Function pointer to the test.
    pub test_func: fn(),
}

impl UnitTest {
    /// Module path with the leading crate name stripped.
    pub fn short_module(&self) -> &'static str {
        match self.module.split_once("::") {
            Some((_, rest)) => rest,
            None => "",
        }
    }
}
