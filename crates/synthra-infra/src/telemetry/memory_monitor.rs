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

//! Allocator-backed memory probe.
//!
//! Reads the counters maintained by the tracking global allocator. Only
//! meaningful in binaries that register it with `#[global_allocator]`.

use std::borrow::Cow;
use std::sync::Mutex;

use synthra_core::memory::{allocation_stats, AllocationStats};
use synthra_core::telemetry::{MemoryProbe, MemorySource, MemoryUsage};

/// Memory probe over the tracking allocator's live byte counter.
#[derive(Debug)]
pub struct TrackingMemoryProbe {
    id: String,
    last_stats: Mutex<AllocationStats>,
}

impl TrackingMemoryProbe {
    /// Creates a probe and takes a first reading.
    pub fn new(id: impl Into<String>) -> Self {
        let stats = allocation_stats();
        if !stats.is_tracking() {
            log::warn!(
                "TrackingMemoryProbe: no tracking allocator is registered, readings will stay at zero"
            );
        }
        Self {
            id: id.into(),
            last_stats: Mutex::new(stats),
        }
    }

    /// The allocator counters as of the last refresh.
    pub fn last_stats(&self) -> AllocationStats {
        *self.last_stats.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for TrackingMemoryProbe {
    fn default() -> Self {
        Self::new("allocator")
    }
}

impl MemoryProbe for TrackingMemoryProbe {
    fn probe_id(&self) -> Cow<'static, str> {
        Cow::Owned(self.id.clone())
    }

    fn source(&self) -> MemorySource {
        MemorySource::Allocator
    }

    fn usage(&self) -> MemoryUsage {
        let stats = self.last_stats();
        MemoryUsage {
            current_bytes: stats.current_bytes as u64,
            peak_bytes: Some(stats.peak_bytes),
        }
    }

    fn refresh(&self) {
        let stats = allocation_stats();
        *self.last_stats.lock().unwrap_or_else(|e| e.into_inner()) = stats;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_probe_identity() {
        let probe = TrackingMemoryProbe::new("heap");
        assert_eq!(probe.probe_id(), "heap");
        assert_eq!(probe.source(), MemorySource::Allocator);
    }

    #[test]
    fn usage_reflects_last_refresh() {
        let probe = TrackingMemoryProbe::default();
        probe.refresh();
        let stats = probe.last_stats();
        let usage = probe.usage();
        assert_eq!(usage.current_bytes, stats.current_bytes as u64);
        assert_eq!(usage.peak_bytes, Some(stats.peak_bytes));
    }
}
