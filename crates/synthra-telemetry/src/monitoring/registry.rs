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

//! Registry for managing memory probes.

use std::sync::{Arc, Mutex, MutexGuard};
use synthra_core::telemetry::{MemoryProbe, MemorySource, MemoryUsage};

/// A thread-safe registry for memory probes.
#[derive(Debug, Clone)]
pub struct ProbeRegistry {
    probes: Arc<Mutex<Vec<Arc<dyn MemoryProbe>>>>,
}

impl ProbeRegistry {
    /// Creates a new, empty probe registry.
    pub fn new() -> Self {
        Self {
            probes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    // A panic while holding the lock leaves the list itself intact.
    fn guard(&self) -> MutexGuard<'_, Vec<Arc<dyn MemoryProbe>>> {
        self.probes.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers a new probe.
    pub fn register(&self, probe: Arc<dyn MemoryProbe>) {
        let probe_id = probe.probe_id().to_string();
        self.guard().push(probe);
        log::info!("Registered memory probe: {}", probe_id);
    }

    /// Calls `refresh` on every registered probe.
    pub fn refresh_all(&self) {
        for probe in self.guard().iter() {
            probe.refresh();
        }
    }

    /// The first registered probe reading `source`.
    pub fn find(&self, source: MemorySource) -> Option<Arc<dyn MemoryProbe>> {
        self.guard().iter().find(|p| p.source() == source).cloned()
    }

    /// Returns a clone of all registered probes.
    pub fn all(&self) -> Vec<Arc<dyn MemoryProbe>> {
        self.guard().clone()
    }

    /// The last reading of every probe, keyed by probe id.
    pub fn snapshot(&self) -> Vec<(String, MemoryUsage)> {
        self.guard()
            .iter()
            .map(|p| (p.probe_id().into_owned(), p.usage()))
            .collect()
    }

    /// Number of registered probes.
    pub fn len(&self) -> usize {
        self.guard().len()
    }

    /// `true` if no probe is registered.
    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }
}

impl Default for ProbeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
