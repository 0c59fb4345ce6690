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

//! Process-wide allocation counters.
//!
//! A tracking global allocator (see `synthra-data`) increments these counters;
//! anything else may read them. When no tracking allocator is registered every
//! counter stays at zero, which the allocator-backed memory probe reports as
//! "unavailable".

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Bytes currently allocated through the tracking allocator.
pub static CURRENTLY_ALLOCATED_BYTES: AtomicUsize = AtomicUsize::new(0);

/// Highest value [`CURRENTLY_ALLOCATED_BYTES`] has ever reached.
pub static PEAK_ALLOCATED_BYTES: AtomicU64 = AtomicU64::new(0);

/// Number of allocation calls.
pub static TOTAL_ALLOCATIONS: AtomicU64 = AtomicU64::new(0);

/// Number of deallocation calls.
pub static TOTAL_DEALLOCATIONS: AtomicU64 = AtomicU64::new(0);

/// Number of allocations of at least [`LARGE_ALLOCATION_THRESHOLD`] bytes.
pub static LARGE_ALLOCATIONS: AtomicU64 = AtomicU64::new(0);

/// Cumulative bytes handed out by large allocations.
pub static LARGE_ALLOCATION_BYTES: AtomicU64 = AtomicU64::new(0);

/// Allocations at or above this size are counted as large. Full-resolution
/// frame buffers land here.
pub const LARGE_ALLOCATION_THRESHOLD: usize = 1024 * 1024;

/// A snapshot of the allocation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocationStats {
    /// Bytes in use at snapshot time.
    pub current_bytes: usize,
    /// Peak bytes in use.
    pub peak_bytes: u64,
    /// Allocation calls so far.
    pub allocations: u64,
    /// Deallocation calls so far.
    pub deallocations: u64,
    /// Large allocation calls so far.
    pub large_allocations: u64,
    /// Bytes handed out by large allocations.
    pub large_allocation_bytes: u64,
}

impl AllocationStats {
    /// Allocations not yet matched by a deallocation.
    pub fn live_allocations(&self) -> i64 {
        self.allocations as i64 - self.deallocations as i64
    }

    /// `true` when a tracking allocator has recorded at least one allocation.
    pub fn is_tracking(&self) -> bool {
        self.allocations > 0
    }
}

/// Reads all counters with relaxed ordering.
pub fn allocation_stats() -> AllocationStats {
    AllocationStats {
        current_bytes: CURRENTLY_ALLOCATED_BYTES.load(Ordering::Relaxed),
        peak_bytes: PEAK_ALLOCATED_BYTES.load(Ordering::Relaxed),
        allocations: TOTAL_ALLOCATIONS.load(Ordering::Relaxed),
        deallocations: TOTAL_DEALLOCATIONS.load(Ordering::Relaxed),
        large_allocations: LARGE_ALLOCATIONS.load(Ordering::Relaxed),
        large_allocation_bytes: LARGE_ALLOCATION_BYTES.load(Ordering::Relaxed),
    }
}

/// Bytes currently allocated through the tracking allocator.
pub fn currently_allocated_bytes() -> usize {
    CURRENTLY_ALLOCATED_BYTES.load(Ordering::Relaxed)
}
