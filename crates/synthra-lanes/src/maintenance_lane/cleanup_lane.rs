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

//! A lane for reclaiming renderer buffers and engine objects between frames.

use synthra_core::frame::largest_first;
use synthra_core::lane::{LaneKind, MaintenanceLane};
use synthra_core::{CleanupAction, CleanupReport, EngineResourceCounts, ResourceReclaimer};

/// Executes cleanup decisions against a [`ResourceReclaimer`].
#[derive(Debug, Default)]
pub struct CleanupLane;

impl CleanupLane {
    /// Creates a new `CleanupLane`.
    pub fn new() -> Self {
        Self
    }

    fn standard(target: &mut dyn ResourceReclaimer, report: &mut CleanupReport) {
        for buffer in target.retained_buffers() {
            let freed = target.release_buffer(buffer.kind);
            report.released.push((buffer.kind, freed));
        }
        report.objects_collected += target.collect_pass();
        report.collection_passes = 1;
    }

    fn aggressive(target: &mut dyn ResourceReclaimer, report: &mut CleanupReport) {
        let sizes = target
            .retained_buffers()
            .into_iter()
            .map(|b| (b.kind, b.bytes))
            .collect();
        for kind in largest_first(sizes) {
            let freed = target.release_buffer(kind);
            report.released.push((kind, freed));
        }

        let passes = CleanupAction::Aggressive.collection_passes();
        for _ in 0..passes {
            report.objects_collected += target.collect_pass();
        }
        report.collection_passes = passes;

        report.orphans_purged = target.purge_orphans();
    }
}

impl synthra_core::lane::Lane for CleanupLane {
    fn strategy_name(&self) -> &'static str {
        "Cleanup"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Cleanup
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl MaintenanceLane for CleanupLane {
    fn run(&self, action: CleanupAction, target: &mut dyn ResourceReclaimer) -> CleanupReport {
        let mut report = CleanupReport {
            action,
            ..Default::default()
        };

        match action {
            CleanupAction::None => {}
            CleanupAction::Standard => Self::standard(target, &mut report),
            CleanupAction::Aggressive => Self::aggressive(target, &mut report),
        }

        if action != CleanupAction::None {
            let EngineResourceCounts {
                meshes,
                materials,
                textures,
                images,
            } = report.orphans_purged;
            log::debug!(
                "CleanupLane: {action} released {} bytes in {} buffers, {} objects over {} passes, \
                 purged {meshes} meshes / {materials} materials / {textures} textures / {images} images",
                report.bytes_released(),
                report.released.len(),
                report.objects_collected,
                report.collection_passes,
            );
        }

        report
    }
}
