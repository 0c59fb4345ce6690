// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! An implementation of `GlobalAlloc` that tracks memory usage.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::Ordering;
use synthra_core::memory::*;

/// Wraps a `GlobalAlloc` implementation and keeps the counters in
/// `synthra_core::memory` up to date.
///
/// Registered as the `#[global_allocator]`, it lets the allocator-backed memory
/// probe measure exactly the bytes the pipeline holds, independent of how the
/// OS accounts resident pages.
///
/// The hooks never log: logging allocates, and allocating from inside the
/// allocator recurses.
///
/// ```rust,ignore
/// use synthra_data::allocators::TrackingAllocator;
///
/// #[global_allocator]
/// static GLOBAL: TrackingAllocator = TrackingAllocator::new(std::alloc::System);
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct TrackingAllocator<A = System> {
    inner: A,
}

impl<A> TrackingAllocator<A> {
    /// Creates a tracking allocator around `inner`.
    pub const fn new(inner: A) -> Self {
        Self { inner }
    }
}

fn record_alloc(size: usize) {
    let previous = CURRENTLY_ALLOCATED_BYTES.fetch_add(size, Ordering::Relaxed);
    PEAK_ALLOCATED_BYTES.fetch_max(previous.saturating_add(size) as u64, Ordering::Relaxed);
    TOTAL_ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
    if size >= LARGE_ALLOCATION_THRESHOLD {
        LARGE_ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
        LARGE_ALLOCATION_BYTES.fetch_add(size as u64, Ordering::Relaxed);
    }
}

fn record_dealloc(size: usize) {
    // Saturate instead of wrapping: blocks allocated before the allocator was
    // observed can still be freed through it.
    let _ = CURRENTLY_ALLOCATED_BYTES.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| {
        Some(c.saturating_sub(size))
    });
    TOTAL_DEALLOCATIONS.fetch_add(1, Ordering::Relaxed);
}

unsafe impl<A: GlobalAlloc> GlobalAlloc for TrackingAllocator<A> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = self.inner.alloc(layout);
        if !ptr.is_null() {
            record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        record_dealloc(layout.size());
        self.inner.dealloc(ptr, layout);
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = self.inner.alloc_zeroed(layout);
        if !ptr.is_null() {
            record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let old_size = layout.size();
        let new_ptr = self.inner.realloc(ptr, layout, new_size);
        if !new_ptr.is_null() {
            match new_size.cmp(&old_size) {
                std::cmp::Ordering::Greater => {
                    let grown = new_size - old_size;
                    let previous = CURRENTLY_ALLOCATED_BYTES.fetch_add(grown, Ordering::Relaxed);
                    PEAK_ALLOCATED_BYTES
                        .fetch_max(previous.saturating_add(grown) as u64, Ordering::Relaxed);
                }
                std::cmp::Ordering::Less => {
                    let shrunk = old_size - new_size;
                    let _ = CURRENTLY_ALLOCATED_BYTES.fetch_update(
                        Ordering::Relaxed,
                        Ordering::Relaxed,
                        |c| Some(c.saturating_sub(shrunk)),
                    );
                }
                std::cmp::Ordering::Equal => {}
            }
        }
        new_ptr
    }
}
