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

//! Resource telemetry contracts: memory probes, samples and cleanup decisions.

pub mod monitoring;

pub use self::monitoring::{MemoryProbe, MemorySource, MemoryUsage};

use crate::frame::BufferKind;
use crate::scene::EngineResourceCounts;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry of the run's resource timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSample {
    /// Accepted frames at sampling time.
    pub frame_count: u64,
    /// Process memory in bytes.
    pub memory_bytes: u64,
    /// Large objects held by the engine.
    pub resources: EngineResourceCounts,
    /// Milliseconds since the run started.
    pub elapsed_ms: u64,
}

/// The outcome of a checkpoint.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CleanupAction {
    /// Nothing to do.
    #[default]
    None,
    /// Release per-frame buffers and run one collection pass.
    Standard,
    /// Release buffers largest first, run three collection passes and purge
    /// orphaned engine objects.
    Aggressive,
}

impl CleanupAction {
    /// A short, stable name for logs and CSV files.
    pub fn as_str(&self) -> &'static str {
        match self {
            CleanupAction::None => "none",
            CleanupAction::Standard => "standard",
            CleanupAction::Aggressive => "aggressive",
        }
    }

    /// Number of collection passes this action runs.
    pub fn collection_passes(&self) -> u32 {
        match self {
            CleanupAction::None => 0,
            CleanupAction::Standard => 1,
            CleanupAction::Aggressive => 3,
        }
    }
}

impl fmt::Display for CleanupAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a cleanup run reclaimed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// The action that was executed.
    pub action: CleanupAction,
    /// Buffers released, in release order, with the bytes each freed.
    pub released: Vec<(BufferKind, usize)>,
    /// Collection passes run.
    pub collection_passes: u32,
    /// Objects freed by the collection passes.
    pub objects_collected: u64,
    /// Orphaned engine objects purged.
    pub orphans_purged: EngineResourceCounts,
}

impl CleanupReport {
    /// Bytes freed by released buffers.
    pub fn bytes_released(&self) -> usize {
        self.released.iter().map(|(_, bytes)| bytes).sum()
    }
}
