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

//! Service for managing memory probes.

use crate::monitoring::{CleanupPolicy, ProbeRegistry, ResourceMonitor};
use std::sync::Arc;
use std::time::{Duration, Instant};
use synthra_core::{MemoryProbe, MemorySource, MemoryUsage};

/// Owns the registered probes and hands out resource monitors.
#[derive(Debug)]
pub struct TelemetryService {
    probes: ProbeRegistry,
    last_update: Instant,
    update_interval: Duration,
}

impl TelemetryService {
    /// Creates a new telemetry service with the given refresh interval.
    pub fn new(update_interval: Duration) -> Self {
        Self {
            probes: ProbeRegistry::new(),
            last_update: Instant::now(),
            update_interval,
        }
    }

    /// Registers a probe.
    pub fn register(&self, probe: Arc<dyn MemoryProbe>) {
        self.probes.register(probe);
    }

    /// Refreshes every probe if the interval has passed. Returns `true` when
    /// a refresh happened.
    pub fn tick(&mut self) -> bool {
        if self.last_update.elapsed() >= self.update_interval {
            log::trace!("Refreshing all memory probes...");
            self.probes.refresh_all();
            self.last_update = Instant::now();
            true
        } else {
            false
        }
    }

    /// Builds a monitor over the first probe reading `source`.
    pub fn monitor_for(
        &self,
        source: MemorySource,
        policy: CleanupPolicy,
    ) -> Option<ResourceMonitor> {
        self.probes
            .find(source)
            .map(|probe| ResourceMonitor::new(probe, policy))
    }

    /// Refreshes every probe and returns their readings.
    pub fn snapshot(&self) -> Vec<(String, MemoryUsage)> {
        self.probes.refresh_all();
        self.probes.snapshot()
    }

    /// Returns a reference to the probe registry.
    pub fn probe_registry(&self) -> &ProbeRegistry {
        &self.probes
    }
}

impl Default for TelemetryService {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
