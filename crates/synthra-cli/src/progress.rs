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

//! Terminal progress for long runs.

use indicatif::{ProgressBar, ProgressStyle};
use synthra_agents::{RunObserver, RunSummary, SkippedSlot};
use synthra_core::CleanupAction;
use synthra_telemetry::CheckpointDecision;

/// Drives an `indicatif` bar from generation loop events.
pub struct ProgressObserver {
    bar: ProgressBar,
    skipped: usize,
    last_memory_mb: f64,
}

impl ProgressObserver {
    /// A bar drawn on stderr.
    pub fn new() -> Self {
        Self::with_bar(ProgressBar::new(0))
    }

    /// A bar that never draws, for tests and quiet runs.
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}/{len} frames ({percent}%) {elapsed_precise} {msg}")
        {
            bar.set_style(style.progress_chars("█▉▊▋▌▍▎▏ "));
        }
        Self {
            bar,
            skipped: 0,
            last_memory_mb: 0.0,
        }
    }

    fn refresh_message(&self) {
        self.bar.set_message(format!(
            "{} abandoned, {:.0} MB",
            self.skipped, self.last_memory_mb
        ));
    }
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl RunObserver for ProgressObserver {
    fn on_run_start(&mut self, target_count: usize) {
        self.bar.set_length(target_count as u64);
        self.refresh_message();
    }

    fn on_accepted(&mut self, _frame_index: u64, _detections: usize) {
        self.bar.inc(1);
    }

    fn on_skipped(&mut self, _skipped: SkippedSlot) {
        self.skipped += 1;
        self.refresh_message();
    }

    fn on_checkpoint(&mut self, decision: &CheckpointDecision) {
        self.last_memory_mb = decision.memory_bytes as f64 / (1024.0 * 1024.0);
        self.refresh_message();
        if decision.action == CleanupAction::Aggressive {
            self.bar
                .println(format!("aggressive cleanup at {:.0} MB", self.last_memory_mb));
        }
    }

    fn on_run_end(&mut self, summary: &RunSummary) {
        self.bar.finish_with_message(format!(
            "{} frames, {} skipped, peak {:.0} MB",
            summary.accepted_frames,
            summary.skipped_slots,
            summary.peak_memory_mb()
        ));
    }
}
