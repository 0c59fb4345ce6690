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

//! The agent that drives dataset generation.
//!
//! For each slot it builds a scene, renders it, extracts detections through an
//! annotation lane and lets a [`RetryController`] decide. Accepted frames are
//! persisted immediately through the [`FrameSink`], so an interrupted run
//! leaves a valid, smaller dataset behind. Every `cleanup_interval` accepted
//! frames the [`CleanupAgent`] runs a resource checkpoint.

use super::observer::{NoopObserver, RunObserver};
use super::report::{GenerationReport, RunSummary, SkippedSlot, StopReason};
use super::retry::{AttemptVerdict, RetryController};
use super::GenerationError;
use crate::cleanup_agent::CleanupAgent;
use std::time::Instant;
use synthra_core::lane::{AnnotationLane, Lane};
use synthra_core::{
    AnnotationSettings, CancellationToken, FrameBuffers, FrameRecord, FrameSink,
    GenerationSettings, SceneRenderer, SceneRequest, SplitRatios,
};
use synthra_data::{AssemblyError, DatasetAssembler};
use synthra_lanes::MaskBoundsLane;
use synthra_telemetry::{CeilingVerdict, ResourceMonitor};

/// Everything the loop needs to know about a run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunPlan {
    /// Loop parameters.
    pub generation: GenerationSettings,
    /// Extraction thresholds.
    pub annotation: AnnotationSettings,
    /// Split ratios applied at assembly.
    pub split_ratios: SplitRatios,
}

enum SlotOutcome {
    Accepted,
    Abandoned(SkippedSlot),
    Cancelled,
}

/// The generation loop.
pub struct GenerationAgent<S, K> {
    scene: S,
    sink: K,
    annotation_lane: Box<dyn AnnotationLane>,
    cleanup: CleanupAgent,
    monitor: ResourceMonitor,
    assembler: DatasetAssembler,
    settings: GenerationSettings,
    cancel: CancellationToken,
    observer: Box<dyn RunObserver>,
    accepted: u64,
    attempts: u64,
    empty_attempts: u64,
    detections: u64,
}

impl<S: SceneRenderer, K: FrameSink> GenerationAgent<S, K> {
    /// Creates an agent with the default lanes. Fails on invalid split ratios.
    pub fn new(
        scene: S,
        sink: K,
        monitor: ResourceMonitor,
        plan: RunPlan,
    ) -> Result<Self, GenerationError> {
        let assembler = DatasetAssembler::new(plan.split_ratios)?;
        Ok(Self {
            scene,
            sink,
            annotation_lane: Box::new(MaskBoundsLane::new(plan.annotation)),
            cleanup: CleanupAgent::new(),
            monitor,
            assembler,
            settings: plan.generation,
            cancel: CancellationToken::new(),
            observer: Box::new(NoopObserver),
            accepted: 0,
            attempts: 0,
            empty_attempts: 0,
            detections: 0,
        })
    }

    /// Replaces the annotation lane.
    pub fn with_annotation_lane(mut self, lane: Box<dyn AnnotationLane>) -> Self {
        self.annotation_lane = lane;
        self
    }

    /// Replaces the cleanup agent.
    pub fn with_cleanup_agent(mut self, cleanup: CleanupAgent) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// Attaches a progress observer.
    pub fn with_observer(mut self, observer: Box<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Uses `token` for cancellation.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// A clone of the cancellation token, for use from another thread.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the loop to completion, early stop or fatal error.
    pub fn run(mut self) -> Result<GenerationReport, GenerationError> {
        let started = Instant::now();
        let target = self.settings.target_count;

        log::info!(
            "GenerationAgent: starting run of {} frames ({} attempts per slot, checkpoint every {} accepted frames, lanes {}/{})",
            target,
            self.settings.attempts_per_slot(),
            self.settings.cleanup_interval,
            self.annotation_lane.strategy_name(),
            self.cleanup.strategy_name(),
        );
        self.observer.on_run_start(target);

        let baseline = self.monitor.sample(0, self.scene.resource_counts());
        self.monitor.record(baseline)?;

        let mut skipped: Vec<SkippedSlot> = Vec::new();
        let mut stop: Option<StopReason> = None;

        for slot in 0..target {
            match self.fill_slot(slot, 0)? {
                SlotOutcome::Accepted => stop = self.maybe_checkpoint()?,
                SlotOutcome::Abandoned(s) => skipped.push(s),
                SlotOutcome::Cancelled => stop = Some(StopReason::Cancelled),
            }
            if stop.is_some() {
                break;
            }
        }

        for pass in 1..=self.settings.top_up_passes {
            if stop.is_some() || skipped.is_empty() {
                break;
            }
            log::info!(
                "GenerationAgent: top-up pass {}/{} over {} abandoned slots",
                pass,
                self.settings.top_up_passes,
                skipped.len()
            );

            let mut pending = std::mem::take(&mut skipped).into_iter();
            while let Some(previous) = pending.next() {
                match self.fill_slot(previous.slot, pass)? {
                    SlotOutcome::Accepted => stop = self.maybe_checkpoint()?,
                    SlotOutcome::Abandoned(again) => skipped.push(SkippedSlot {
                        slot: again.slot,
                        attempts: previous.attempts + again.attempts,
                    }),
                    SlotOutcome::Cancelled => {
                        skipped.push(previous);
                        stop = Some(StopReason::Cancelled);
                    }
                }
                if stop.is_some() {
                    skipped.extend(pending.by_ref());
                    break;
                }
            }
        }

        let resources = self.scene.resource_counts();
        self.scene.teardown();
        let needs_final_sample = self
            .monitor
            .timeline()
            .last()
            .map_or(true, |last| last.frame_count < self.accepted);
        if needs_final_sample {
            let last = self.monitor.sample(self.accepted, resources);
            self.monitor.record(last)?;
        }

        let manifest = self.assembler.finalize(self.scene.class_table())?;
        let summary = RunSummary {
            target_count: target,
            accepted_frames: manifest.total(),
            skipped_slots: skipped.len(),
            attempts: self.attempts,
            empty_attempts: self.empty_attempts,
            detections: self.detections,
            checkpoints: self.cleanup.checkpoints(),
            standard_cleanups: self.cleanup.standard_cleanups(),
            aggressive_cleanups: self.cleanup.aggressive_cleanups(),
            peak_memory_bytes: self.monitor.peak_memory(),
            elapsed_secs: started.elapsed().as_secs_f64(),
            stop_reason: stop,
        };

        log_summary(&summary);
        self.observer.on_run_end(&summary);

        Ok(GenerationReport {
            manifest,
            summary,
            skipped,
            timeline: self.monitor.into_timeline(),
        })
    }

    fn fill_slot(&mut self, slot: usize, pass: u32) -> Result<SlotOutcome, GenerationError> {
        let mut retry = RetryController::new(slot, self.settings.retry_budget_per_frame);

        loop {
            if self.cancel.is_cancelled() {
                log::warn!("GenerationAgent: cancellation requested, stopping before slot {slot}");
                return Ok(SlotOutcome::Cancelled);
            }

            let attempt = retry.next_attempt();
            self.observer.on_attempt(slot, attempt);
            self.attempts += 1;

            let frame = self.render_attempt(SceneRequest {
                slot,
                attempt,
                pass,
            })?;
            let detections = self.annotation_lane.extract(&frame);

            match retry.evaluate(detections) {
                AttemptVerdict::Accepted(detections) => {
                    let index = self.accepted;
                    let persisted = self.sink.persist(index, &frame, &detections);
                    self.discard(frame);
                    let image_path = persisted?;

                    let count = detections.len();
                    let record = FrameRecord::new(index, image_path, detections)
                        .ok_or(AssemblyError::EmptyRecord { frame_index: index })?;
                    self.assembler.push(record)?;

                    self.accepted += 1;
                    self.detections += count as u64;
                    log::debug!(
                        "GenerationAgent: frame {index} accepted (slot {slot}, attempt {}, {count} detections)",
                        attempt + 1
                    );
                    self.observer.on_accepted(index, count);
                    return Ok(SlotOutcome::Accepted);
                }
                AttemptVerdict::Retry {
                    attempts,
                    remaining,
                } => {
                    self.empty_attempts += 1;
                    self.discard(frame);
                    log::warn!(
                        "GenerationAgent: slot {slot} attempt {attempts}/{} produced no valid detections, retrying ({remaining} left)",
                        retry.max_attempts()
                    );
                }
                AttemptVerdict::Abandoned { slot, attempts } => {
                    self.empty_attempts += 1;
                    self.discard(frame);
                    log::error!(
                        "GenerationAgent: slot {slot} abandoned after {attempts} attempts without valid detections"
                    );
                    let skipped = SkippedSlot { slot, attempts };
                    self.observer.on_skipped(skipped);
                    return Ok(SlotOutcome::Abandoned(skipped));
                }
            }
        }
    }

    fn render_attempt(&mut self, request: SceneRequest) -> Result<FrameBuffers, GenerationError> {
        let rendered = self
            .scene
            .build(request)
            .and_then(|_| self.scene.render());

        let frame = match rendered {
            Ok(frame) => frame,
            Err(e) => {
                log::error!(
                    "GenerationAgent: collaborator failed on slot {} attempt {}: {e}",
                    request.slot,
                    request.attempt + 1
                );
                self.scene.teardown();
                return Err(e.into());
            }
        };

        if let Err(e) = frame.validate() {
            self.discard(frame);
            return Err(e.into());
        }
        Ok(frame)
    }

    /// Releases the frame field by field, then the scene.
    fn discard(&mut self, frame: FrameBuffers) {
        let (_, freed) = frame.release();
        self.scene.teardown();
        log::trace!("GenerationAgent: released {freed} bytes of frame buffers");
    }

    fn maybe_checkpoint(&mut self) -> Result<Option<StopReason>, GenerationError> {
        let interval = self.settings.cleanup_interval as u64;
        if interval == 0 || self.accepted % interval != 0 {
            return Ok(None);
        }

        let resources = self.scene.resource_counts();
        let outcome =
            self.cleanup
                .checkpoint(&mut self.monitor, &mut self.scene, self.accepted, resources)?;
        self.observer.on_checkpoint(&outcome.decision);

        if let CeilingVerdict::Exceeded {
            memory_bytes,
            ceiling_bytes,
        } = outcome.verdict
        {
            log::error!(
                "GenerationAgent: memory at {:.1} MB is still above the {:.1} MB ceiling after aggressive cleanup, stopping after {} frames",
                to_mb(memory_bytes),
                to_mb(ceiling_bytes),
                self.accepted
            );
            return Ok(Some(StopReason::MemoryCeiling {
                memory_bytes,
                ceiling_bytes,
            }));
        }
        Ok(None)
    }
}

fn to_mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

fn log_summary(summary: &RunSummary) {
    log::info!("GenerationAgent: ===== generation summary =====");
    log::info!(
        "GenerationAgent: accepted {}/{} frames, {} skipped slots, {} detections",
        summary.accepted_frames,
        summary.target_count,
        summary.skipped_slots,
        summary.detections
    );
    log::info!(
        "GenerationAgent: {} attempts ({} empty), {} checkpoints ({} standard, {} aggressive cleanups)",
        summary.attempts,
        summary.empty_attempts,
        summary.checkpoints,
        summary.standard_cleanups,
        summary.aggressive_cleanups
    );
    log::info!(
        "GenerationAgent: peak memory {:.1} MB, elapsed {:.1}s ({:.2} frames/s)",
        summary.peak_memory_mb(),
        summary.elapsed_secs,
        summary.frames_per_second()
    );
    match summary.stop_reason {
        Some(StopReason::Cancelled) => log::warn!("GenerationAgent: run was cancelled"),
        Some(StopReason::MemoryCeiling { .. }) => {
            log::warn!("GenerationAgent: run stopped early on the memory ceiling")
        }
        None => {}
    }
}
