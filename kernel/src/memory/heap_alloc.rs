// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2023 Andre Richter <andre.o.richter@gmail.com>

//! Kernel arena allocation.
//!
//! The arena is a [`linked_list_allocator::Heap`] over the linker-provided `.heap` section,
//! installed once during bring-up. Memory is handed out for the lifetime of the kernel and never
//! returned, so `dealloc` only leaves a trace under `debug_prints`.

use crate::{bsp, common, debug, info, synchronization, synchronization::IRQSafeNullLock, warn};
use alloc::alloc::{GlobalAlloc, Layout};
use core::sync::atomic::{AtomicBool, Ordering};
use linked_list_allocator::Heap as LinkedListHeap;

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// The global allocator. Lazily receives its region.
pub struct ArenaAllocator {
    inner: IRQSafeNullLock<LinkedListHeap>,
}

//--------------------------------------------------------------------------------------------------
// Global instances
//--------------------------------------------------------------------------------------------------

#[global_allocator]
static KERNEL_HEAP_ALLOCATOR: ArenaAllocator = ArenaAllocator::new();

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

#[inline(always)]
fn debug_print_alloc_dealloc(operation: &'static str, ptr: *mut u8, layout: Layout) {
    let size = layout.size();
    let (size_h, size_unit) = common::size_human_readable_ceil(size);

    debug!(
        "Kernel Heap: {}\n      \
        Size:     {:#x} ({} {})\n      \
        Start:    {:#018x}\n      \
        Align:    {:#x}",
        operation,
        size,
        size_h,
        size_unit,
        ptr as usize,
        layout.align()
    );
}

fn print_bytes(label: &str, bytes: usize) {
    if bytes >= 1024 {
        let (h, unit) = common::size_human_readable_ceil(bytes);
        info!("      {}: {} Byte ({} {})", label, bytes, h, unit);
    } else {
        info!("      {}: {} Byte", label, bytes);
    }
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------
use synchronization::interface::Mutex;

/// Return a reference to the kernel's heap allocator.
pub fn kernel_heap_allocator() -> &'static ArenaAllocator {
    &KERNEL_HEAP_ALLOCATOR
}

impl ArenaAllocator {
    /// Create an instance.
    pub const fn new() -> Self {
        Self {
            inner: IRQSafeNullLock::new(LinkedListHeap::empty()),
        }
    }

    /// Bytes handed out so far and bytes left.
    pub fn usage(&self) -> (usize, usize) {
        self.inner.lock(|inner| (inner.used(), inner.free()))
    }

    /// Size of the installed region. Zero before [`kernel_init_heap_allocator`].
    pub fn size(&self) -> usize {
        self.inner.lock(|inner| inner.size())
    }

    /// Print the current heap usage.
    pub fn print_usage(&self) {
        let (used, free) = self.usage();

        print_bytes("Used", used);
        print_bytes("Free", free);
    }
}

unsafe impl GlobalAlloc for ArenaAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        match self.inner.lock(|inner| inner.allocate_first_fit(layout).ok()) {
            None => core::ptr::null_mut(),
            Some(allocation) => {
                let ptr = allocation.as_ptr();

                debug_print_alloc_dealloc("Allocation", ptr, layout);

                ptr
            }
        }
    }

    // Nothing is given back to the free list.
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        debug_print_alloc_dealloc("Free (not reclaimed)", ptr, layout);
    }
}

/// Query the BSP for the heap region and hand it to the kernel's arena.
pub fn kernel_init_heap_allocator() {
    static INIT_DONE: AtomicBool = AtomicBool::new(false);
    if INIT_DONE.load(Ordering::Relaxed) {
        warn!("Already initialized");
        return;
    }

    let (start, size) = bsp::memory::heap_region();
    if size == 0 {
        panic!("Kernel heap: Empty heap region");
    }

    KERNEL_HEAP_ALLOCATOR
        .inner
        .lock(|inner| unsafe { inner.init(start as *mut u8, size) });

    INIT_DONE.store(true, Ordering::Relaxed);
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::{boxed::Box, vec::Vec};
    use test_macros::kernel_test;

    /// Allocations come out of the linker-provided heap region.
    #[kernel_test]
    fn allocations_land_in_heap_region() {
        let (start, size) = bsp::memory::heap_region();
        let x = Box::new(0xdead_beef_u32);
        let addr = &*x as *const u32 as usize;

        assert!(addr >= start && addr < start + size);
    }

    /// The installed region is the whole `.heap` section.
    #[kernel_test]
    fn arena_spans_heap_section() {
        let (_, size) = bsp::memory::heap_region();
        let (used, free) = kernel_heap_allocator().usage();

        assert_eq!(kernel_heap_allocator().size(), size);
        assert_eq!(used + free, size);
    }

    /// A second init leaves the running arena alone.
    #[kernel_test]
    fn second_init_is_ignored() {
        let (used_before, _) = kernel_heap_allocator().usage();

        kernel_init_heap_allocator();

        let (used_after, _) = kernel_heap_allocator().usage();
        assert_eq!(used_before, used_after);
    }

    /// Freed memory is not handed out again.
    #[kernel_test]
    fn dealloc_does_not_reclaim() {
        let (used_before, _) = kernel_heap_allocator().usage();

        let v: Vec<u8> = Vec::with_capacity(256);
        let first = v.as_ptr() as usize;
        drop(v);

        let (used_after, _) = kernel_heap_allocator().usage();
        assert!(used_after >= used_before + 256);

        let w: Vec<u8> = Vec::with_capacity(256);
        assert_ne!(w.as_ptr() as usize, first);
    }
}
