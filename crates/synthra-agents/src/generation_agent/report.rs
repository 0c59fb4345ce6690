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

//! What a generation run hands back.

use serde::Serialize;
use synthra_core::DatasetManifest;
use synthra_telemetry::ResourceTimeline;

/// A slot that ran out of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SkippedSlot {
    /// The slot index.
    pub slot: usize,
    /// Attempts made before giving up.
    pub attempts: u32,
}

/// Why a run ended before filling every slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StopReason {
    /// Cancellation was requested.
    Cancelled,
    /// Memory stayed above the hard ceiling after an aggressive cleanup.
    MemoryCeiling {
        /// Memory after the cleanup.
        memory_bytes: u64,
        /// The configured ceiling.
        ceiling_bytes: u64,
    },
}

/// Final run summary, persisted as `generation_summary.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// Slots requested.
    pub target_count: usize,
    /// Frames accepted and persisted.
    pub accepted_frames: usize,
    /// Slots abandoned after every top-up pass.
    pub skipped_slots: usize,
    /// Scene builds attempted.
    pub attempts: u64,
    /// Attempts discarded for lack of detections.
    pub empty_attempts: u64,
    /// Detections written.
    pub detections: u64,
    /// Checkpoints evaluated.
    pub checkpoints: u64,
    /// Standard cleanups executed.
    pub standard_cleanups: u64,
    /// Aggressive cleanups executed.
    pub aggressive_cleanups: u64,
    /// Peak memory seen by the resource monitor.
    pub peak_memory_bytes: u64,
    /// Wall-clock duration of the run.
    pub elapsed_secs: f64,
    /// Set when the run ended early.
    pub stop_reason: Option<StopReason>,
}

impl RunSummary {
    /// Peak memory in megabytes.
    pub fn peak_memory_mb(&self) -> f64 {
        self.peak_memory_bytes as f64 / (1024.0 * 1024.0)
    }

    /// Accepted frames per second.
    pub fn frames_per_second(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.accepted_frames as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }
}

/// Everything a completed run produced.
#[derive(Debug)]
pub struct GenerationReport {
    /// The assembled dataset.
    pub manifest: DatasetManifest,
    /// Counters and timings.
    pub summary: RunSummary,
    /// Slots still abandoned at the end of the run.
    pub skipped: Vec<SkippedSlot>,
    /// The resource history.
    pub timeline: ResourceTimeline,
}
