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

//! Active memory probing.
//!
//! A probe polls a memory source on demand. It is distinct from the sample
//! timeline, which records what the probes reported at checkpoints.

use std::borrow::Cow;
use std::fmt::Debug;

/// Where a probe reads its numbers from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemorySource {
    /// Resident set size of the current process, as seen by the OS.
    ProcessResident,
    /// Live bytes counted by the tracking global allocator.
    Allocator,
}

impl MemorySource {
    /// A short, stable name for logs and run metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemorySource::ProcessResident => "process",
            MemorySource::Allocator => "allocator",
        }
    }
}

/// A point-in-time memory reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryUsage {
    /// Bytes in use.
    pub current_bytes: u64,
    /// Highest value observed by the probe itself, if it tracks one.
    pub peak_bytes: Option<u64>,
}

/// A stateful object that knows how to read one memory source.
///
/// Concrete probes live in `synthra-infra`. Reading is split into
/// [`refresh`](MemoryProbe::refresh), which may poll the OS, and
/// [`usage`](MemoryProbe::usage), which returns the last polled value.
pub trait MemoryProbe: Send + Sync + Debug + 'static {
    /// Unique, human-readable identifier of the probe.
    fn probe_id(&self) -> Cow<'static, str>;

    /// The source the probe reads.
    fn source(&self) -> MemorySource;

    /// The last polled reading.
    fn usage(&self) -> MemoryUsage;

    /// Polls the source. The default does nothing, for passive probes.
    fn refresh(&self) {}

    /// Polls the source and returns the fresh reading.
    fn read(&self) -> MemoryUsage {
        self.refresh();
        self.usage()
    }
}
