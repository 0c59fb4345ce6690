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

//! Progress hooks for the generation loop.

use super::report::{RunSummary, SkippedSlot};
use synthra_telemetry::CheckpointDecision;

/// Receives progress notifications from the generation loop.
///
/// Every method defaults to a no-op. The CLI implements it with a progress bar.
pub trait RunObserver {
    /// The run is starting.
    fn on_run_start(&mut self, _target_count: usize) {}

    /// An attempt is about to build a scene.
    fn on_attempt(&mut self, _slot: usize, _attempt: u32) {}

    /// A frame was accepted and persisted.
    fn on_accepted(&mut self, _frame_index: u64, _detections: usize) {}

    /// A slot was abandoned.
    fn on_skipped(&mut self, _skipped: SkippedSlot) {}

    /// A checkpoint was evaluated.
    fn on_checkpoint(&mut self, _decision: &CheckpointDecision) {}

    /// The run finished.
    fn on_run_end(&mut self, _summary: &RunSummary) {}
}

/// An observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}
