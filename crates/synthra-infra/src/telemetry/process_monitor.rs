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

//! sysinfo-based memory probe for the current process.

use anyhow::{anyhow, Result};
use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

use synthra_core::telemetry::{MemoryProbe, MemorySource, MemoryUsage};

/// Reads the resident set size of the current process through `sysinfo`.
#[derive(Debug)]
pub struct ProcessMemoryProbe {
    pid: Pid,
    system: Mutex<System>,
    current_bytes: AtomicU64,
    peak_bytes: AtomicU64,
}

impl ProcessMemoryProbe {
    /// Creates a probe for the current process and takes a first reading.
    pub fn new() -> Result<Self> {
        let pid = sysinfo::get_current_pid()
            .map_err(|e| anyhow!("cannot resolve the current process id: {e}"))?;
        let probe = Self {
            pid,
            system: Mutex::new(System::new()),
            current_bytes: AtomicU64::new(0),
            peak_bytes: AtomicU64::new(0),
        };
        probe.refresh();
        if probe.current_bytes.load(Ordering::Relaxed) == 0 {
            return Err(anyhow!(
                "process {pid} reports no resident memory on this platform"
            ));
        }
        Ok(probe)
    }

    /// The monitored process.
    pub fn pid(&self) -> Pid {
        self.pid
    }
}

impl MemoryProbe for ProcessMemoryProbe {
    fn probe_id(&self) -> Cow<'static, str> {
        Cow::Owned(format!("process-{}", self.pid))
    }

    fn source(&self) -> MemorySource {
        MemorySource::ProcessResident
    }

    fn usage(&self) -> MemoryUsage {
        MemoryUsage {
            current_bytes: self.current_bytes.load(Ordering::Relaxed),
            peak_bytes: Some(self.peak_bytes.load(Ordering::Relaxed)),
        }
    }

    fn refresh(&self) {
        let mut system = self.system.lock().unwrap_or_else(|e| e.into_inner());
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );
        match system.process(self.pid) {
            Some(process) => {
                let rss = process.memory();
                self.current_bytes.store(rss, Ordering::Relaxed);
                self.peak_bytes.fetch_max(rss, Ordering::Relaxed);
            }
            None => log::warn!("ProcessMemoryProbe: process {} not found", self.pid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_probe_reads_resident_memory() {
        let probe = match ProcessMemoryProbe::new() {
            Ok(probe) => probe,
            // Platforms without process information.
            Err(_) => return,
        };
        let usage = probe.read();
        assert!(usage.current_bytes > 0);
        assert!(usage.peak_bytes.unwrap_or(0) >= usage.current_bytes);
        assert_eq!(probe.source(), MemorySource::ProcessResident);
        assert!(probe.probe_id().starts_with("process-"));
    }
}
