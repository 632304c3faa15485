// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2019-2023 Andre Richter <andre.o.richter@gmail.com>

//! `#[kernel_test]` attribute for the kernel's custom test framework.

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{parse_macro_input, Ident, ItemFn};

/// Turn a plain `fn()` into a `#[test_case]` constant of type `test_types::UnitTest`.
///
/// Test functions must not take arguments. Failing tests are expected to panic.
#[proc_macro_attribute]
pub fn kernel_test(_attr: TokenStream, input: TokenStream) -> TokenStream {
    let f = parse_macro_input!(input as ItemFn);

    if !f.sig.inputs.is_empty() {
        return syn::Error::new_spanned(&f.sig.inputs, "kernel tests take no arguments")
            .to_compile_error()
            .into();
    }

    let test_name = &format!("{}", f.sig.ident);
    let test_ident = Ident::new(
        &format!("{}_TEST_CONTAINER", f.sig.ident.to_string().to_uppercase()),
        Span::call_site(),
    );
    let test_attrs = &f.attrs;
    let test_code_block = f.block;

    quote!(
        #(#test_attrs)*
        #[test_case]
        const #test_ident: test_types::UnitTest = test_types::UnitTest {
            name: #test_name,
            module: module_path!(),
            test_func: || #test_code_block,
        };
    )
    .into()
}
