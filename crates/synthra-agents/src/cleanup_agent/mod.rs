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

//! The agent responsible for resource checkpoints.
//!
//! It samples memory through the [`ResourceMonitor`], asks it for a decision,
//! dispatches the work to a maintenance lane and, after an aggressive cleanup,
//! checks the hard ceiling.

use synthra_core::lane::{Lane, MaintenanceLane};
use synthra_core::{CleanupAction, CleanupReport, EngineResourceCounts, ResourceReclaimer};
use synthra_lanes::CleanupLane;
use synthra_telemetry::{CeilingVerdict, CheckpointDecision, ResourceMonitor, TimelineError};

/// What one checkpoint did.
#[derive(Debug, Clone)]
pub struct CheckpointOutcome {
    /// The monitor's decision.
    pub decision: CheckpointDecision,
    /// What the lane reclaimed.
    pub report: CleanupReport,
    /// Memory measured after cleanup.
    pub memory_after: u64,
    /// Ceiling check result. Always `Within` unless the action was aggressive.
    pub verdict: CeilingVerdict,
}

impl CheckpointOutcome {
    /// `true` when the run must stop.
    pub fn must_abort(&self) -> bool {
        matches!(self.verdict, CeilingVerdict::Exceeded { .. })
    }
}

/// Runs checkpoints and tallies what they did.
pub struct CleanupAgent {
    lane: Box<dyn MaintenanceLane>,
    checkpoints: u64,
    standard: u64,
    aggressive: u64,
}

impl CleanupAgent {
    /// Creates an agent driving the default [`CleanupLane`].
    pub fn new() -> Self {
        Self::with_lane(Box::new(CleanupLane::new()))
    }

    /// Creates an agent driving a custom lane.
    pub fn with_lane(lane: Box<dyn MaintenanceLane>) -> Self {
        Self {
            lane,
            checkpoints: 0,
            standard: 0,
            aggressive: 0,
        }
    }

    /// Samples, records, decides and cleans.
    ///
    /// The sample taken here is appended to the monitor's timeline, so
    /// `frame_count` must be larger than any previously recorded one.
    pub fn checkpoint(
        &mut self,
        monitor: &mut ResourceMonitor,
        target: &mut dyn ResourceReclaimer,
        frame_count: u64,
        resources: EngineResourceCounts,
    ) -> Result<CheckpointOutcome, TimelineError> {
        let sample = monitor.sample(frame_count, resources);
        monitor.record(sample)?;
        let decision = monitor.checkpoint(&sample);
        self.checkpoints += 1;

        log::info!(
            "CleanupAgent: checkpoint at frame {}: memory {:.1} MB, growth {:+.1} MB since last, \
             {:+.1} MB since start, peak {:.1} MB -> {}",
            frame_count,
            mb(decision.memory_bytes as i64),
            mb(decision.growth_since_checkpoint),
            mb(decision.growth_since_start),
            mb(decision.peak_bytes as i64),
            decision.action
        );

        let report = self.lane.run(decision.action, target);
        let memory_after = match decision.action {
            CleanupAction::None => decision.memory_bytes,
            CleanupAction::Standard => {
                self.standard += 1;
                monitor.memory_now()
            }
            CleanupAction::Aggressive => {
                self.aggressive += 1;
                monitor.memory_now()
            }
        };
        monitor.complete_checkpoint(&sample, &decision, &report, memory_after);

        if decision.action != CleanupAction::None {
            log::info!(
                "CleanupAgent: {} cleanup freed {:.1} MB of buffers and {} engine objects, memory now {:.1} MB",
                decision.action,
                mb(report.bytes_released() as i64),
                report.objects_collected + report.orphans_purged.total(),
                mb(memory_after as i64)
            );
        }

        let verdict = if decision.action == CleanupAction::Aggressive {
            monitor.verify_ceiling(memory_after)
        } else {
            CeilingVerdict::Within
        };

        Ok(CheckpointOutcome {
            decision,
            report,
            memory_after,
            verdict,
        })
    }

    /// Checkpoints evaluated so far.
    pub fn checkpoints(&self) -> u64 {
        self.checkpoints
    }

    /// Standard cleanups executed so far.
    pub fn standard_cleanups(&self) -> u64 {
        self.standard
    }

    /// Aggressive cleanups executed so far.
    pub fn aggressive_cleanups(&self) -> u64 {
        self.aggressive
    }

    /// Strategy name of the lane in use.
    pub fn strategy_name(&self) -> &'static str {
        self.lane.strategy_name()
    }
}

impl Default for CleanupAgent {
    fn default() -> Self {
        Self::new()
    }
}

fn mb(bytes: i64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}
