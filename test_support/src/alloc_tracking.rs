//! A counting global allocator for leak checks.
//!
//! Install it in a test binary with
//! `#[global_allocator] static ALLOCATOR: CountingAllocator = CountingAllocator;`.
//! Counts are kept per thread, so allocations made by the test harness or by other tests running
//! in parallel don't show up in the calling thread's balance.

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

thread_local! {
    static LIVE_ALLOCATIONS: Cell<isize> = const { Cell::new(0) };
}

/// [`System`] allocator wrapper that tracks live allocations made by each thread.
pub struct CountingAllocator;

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            adjust(1);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
        adjust(-1);
    }
}

fn adjust(delta: isize) {
    // the thread-local may already be gone while a thread is exiting
    let _ = LIVE_ALLOCATIONS.try_with(|live| live.set(live.get() + delta));
}

/// Allocations made by the current thread that have not been freed by it.
pub fn live_allocations() -> isize {
    LIVE_ALLOCATIONS.with(Cell::get)
}
