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

//! The resource monitor: sampling, checkpoint decisions and the hard ceiling.
//!
//! At each checkpoint the monitor compares the current reading against two
//! references, the reading left by the previous checkpoint and the first
//! sample of the run:
//!
//! | condition | action |
//! |---|---|
//! | growth since checkpoint ≤ standard threshold | `None` |
//! | growth since checkpoint ≥ fraction × peak | `Aggressive` |
//! | previous checkpoint cleaned, growth since start ≥ fraction × peak | `Aggressive` |
//! | otherwise | `Standard` |
//!
//! The hard ceiling is only consulted after an aggressive cleanup.

use crate::storage::{CleanupEvent, ResourceTimeline, TimelineError};
use std::sync::Arc;
use std::time::Instant;
use synthra_core::{
    CleanupAction, CleanupReport, EngineResourceCounts, MemoryProbe, ResourceSample,
};

/// Thresholds driving checkpoint decisions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CleanupPolicy {
    /// Growth since the previous checkpoint, in bytes, above which any cleanup runs.
    pub standard_growth_bytes: u64,
    /// Fraction of peak memory that escalates to an aggressive cleanup.
    pub aggressive_growth_fraction: f64,
    /// Memory that must not be exceeded after an aggressive cleanup.
    pub hard_ceiling_bytes: Option<u64>,
}

impl Default for CleanupPolicy {
    fn default() -> Self {
        Self {
            standard_growth_bytes: 0,
            aggressive_growth_fraction: 0.10,
            hard_ceiling_bytes: None,
        }
    }
}

/// The outcome of a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckpointDecision {
    /// What to do.
    pub action: CleanupAction,
    /// Memory at the checkpoint.
    pub memory_bytes: u64,
    /// Growth since the previous checkpoint.
    pub growth_since_checkpoint: i64,
    /// Growth since the first sample.
    pub growth_since_start: i64,
    /// Peak memory at decision time.
    pub peak_bytes: u64,
}

/// Result of checking memory against the hard ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CeilingVerdict {
    /// No ceiling, or memory is below it.
    Within,
    /// Memory is still above the ceiling.
    Exceeded {
        /// Current memory.
        memory_bytes: u64,
        /// The configured ceiling.
        ceiling_bytes: u64,
    },
}

/// Samples memory, keeps the timeline and decides cleanups.
#[derive(Debug)]
pub struct ResourceMonitor {
    probe: Arc<dyn MemoryProbe>,
    policy: CleanupPolicy,
    timeline: ResourceTimeline,
    checkpoint_reference: Option<u64>,
    last_action: CleanupAction,
    started: Instant,
}

impl ResourceMonitor {
    /// Creates a monitor reading `probe`. The run clock starts now.
    pub fn new(probe: Arc<dyn MemoryProbe>, policy: CleanupPolicy) -> Self {
        Self {
            probe,
            policy,
            timeline: ResourceTimeline::new(),
            checkpoint_reference: None,
            last_action: CleanupAction::None,
            started: Instant::now(),
        }
    }

    /// The active policy.
    pub fn policy(&self) -> &CleanupPolicy {
        &self.policy
    }

    /// The probe being read.
    pub fn probe(&self) -> &Arc<dyn MemoryProbe> {
        &self.probe
    }

    /// Reads the probe. Does not touch the timeline.
    pub fn sample(&self, frame_count: u64, resources: EngineResourceCounts) -> ResourceSample {
        ResourceSample {
            frame_count,
            memory_bytes: self.probe.read().current_bytes,
            resources,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
        }
    }

    /// Current memory, without building a sample.
    pub fn memory_now(&self) -> u64 {
        self.probe.read().current_bytes
    }

    /// Appends a sample to the timeline.
    pub fn record(&mut self, sample: ResourceSample) -> Result<(), TimelineError> {
        self.timeline.push(sample)
    }

    /// Decides what to do given the current sample and the recorded history.
    ///
    /// Pure with respect to the monitor: the decision is not remembered until
    /// [`complete_checkpoint`](Self::complete_checkpoint) is called.
    pub fn checkpoint(&self, current: &ResourceSample) -> CheckpointDecision {
        let memory = current.memory_bytes;
        let start = self
            .timeline
            .first()
            .map(|s| s.memory_bytes)
            .unwrap_or(memory);
        let reference = self.checkpoint_reference.unwrap_or(start);
        let peak = self.timeline.peak_memory().max(memory);

        let growth_since_checkpoint = memory as i64 - reference as i64;
        let growth_since_start = memory as i64 - start as i64;
        let escalation = self.policy.aggressive_growth_fraction * peak as f64;

        let action = if growth_since_checkpoint <= self.policy.standard_growth_bytes as i64 {
            CleanupAction::None
        } else if growth_since_checkpoint as f64 >= escalation
            || (self.last_action != CleanupAction::None && growth_since_start as f64 >= escalation)
        {
            CleanupAction::Aggressive
        } else {
            CleanupAction::Standard
        };

        CheckpointDecision {
            action,
            memory_bytes: memory,
            growth_since_checkpoint,
            growth_since_start,
            peak_bytes: peak,
        }
    }

    /// Records the outcome of a checkpoint. `memory_after` becomes the
    /// reference for the next checkpoint's growth.
    pub fn complete_checkpoint(
        &mut self,
        current: &ResourceSample,
        decision: &CheckpointDecision,
        report: &CleanupReport,
        memory_after: u64,
    ) {
        self.checkpoint_reference = Some(memory_after);
        self.last_action = decision.action;
        if decision.action != CleanupAction::None {
            self.timeline.push_event(CleanupEvent {
                frame_count: current.frame_count,
                action: decision.action,
                memory_before: decision.memory_bytes,
                memory_after,
                growth_since_checkpoint: decision.growth_since_checkpoint,
                growth_since_start: decision.growth_since_start,
                bytes_released: report.bytes_released() as u64,
                objects_freed: report.objects_collected + report.orphans_purged.total(),
            });
        }
    }

    /// Checks `memory_bytes` against the hard ceiling.
    pub fn verify_ceiling(&self, memory_bytes: u64) -> CeilingVerdict {
        match self.policy.hard_ceiling_bytes {
            Some(ceiling) if memory_bytes > ceiling => CeilingVerdict::Exceeded {
                memory_bytes,
                ceiling_bytes: ceiling,
            },
            _ => CeilingVerdict::Within,
        }
    }

    /// Peak memory observed during the run.
    pub fn peak_memory(&self) -> u64 {
        self.timeline.peak_memory()
    }

    /// Milliseconds since the monitor was created.
    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// The recorded history.
    pub fn timeline(&self) -> &ResourceTimeline {
        &self.timeline
    }

    /// Consumes the monitor, returning the recorded history.
    pub fn into_timeline(self) -> ResourceTimeline {
        self.timeline
    }
}
