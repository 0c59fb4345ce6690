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

//! Runs the real procedural scene under the tracking allocator and checks that
//! standard cleanups actually give scratch memory back.
//!
//! Kept alone in its own test binary: the allocator counters are process-wide.

use std::sync::Arc;
use synthra_agents::{GenerationAgent, RunPlan};
use synthra_core::{CleanupAction, GenerationSettings};
use synthra_data::allocators::TrackingAllocator;
use synthra_infra::{ProceduralScene, ProceduralSceneSettings, TrackingMemoryProbe};
use synthra_telemetry::{CleanupPolicy, ResourceMonitor};

mod common;

#[global_allocator]
static GLOBAL: TrackingAllocator = TrackingAllocator::new(std::alloc::System);

const TOLERANCE_BYTES: u64 = 256 * 1024;

#[test]
fn test_standard_cleanup_does_not_increase_the_next_sample() {
    // --- 1. ARRANGE ---
    let scene = ProceduralScene::new(ProceduralSceneSettings {
        width: 256,
        height: 256,
        object_size: (32, 96),
        seed: 7,
        ..Default::default()
    })
    .unwrap();
    // An escalation fraction of 1.0 keeps every cleanup at the standard level.
    let monitor = ResourceMonitor::new(
        Arc::new(TrackingMemoryProbe::new("churn")),
        CleanupPolicy {
            standard_growth_bytes: 0,
            aggressive_growth_fraction: 1.0,
            hard_ceiling_bytes: None,
        },
    );
    let plan = RunPlan {
        generation: GenerationSettings {
            target_count: 40,
            retry_budget_per_frame: 4,
            cleanup_interval: 10,
            top_up_passes: 0,
        },
        ..Default::default()
    };
    let agent = GenerationAgent::new(scene, common::MemorySink::default(), monitor, plan).unwrap();

    // --- 2. ACT ---
    let report = agent.run().unwrap();

    // --- 3. ASSERT ---
    let timeline = &report.timeline;
    assert!(timeline.samples().iter().all(|s| s.memory_bytes > 0));

    let standard: Vec<_> = timeline
        .events()
        .iter()
        .filter(|e| e.action == CleanupAction::Standard)
        .collect();
    assert!(!standard.is_empty(), "the first checkpoint must clean up");

    for event in standard {
        assert!(event.bytes_released > 0);
        assert!(event.memory_after < event.memory_before);

        let next = timeline
            .samples()
            .iter()
            .find(|s| s.frame_count > event.frame_count);
        if let Some(next) = next {
            assert!(
                next.memory_bytes <= event.memory_before + TOLERANCE_BYTES,
                "sample at frame {} grew to {} bytes after a standard cleanup at {} bytes",
                next.frame_count,
                next.memory_bytes,
                event.memory_before
            );
        }
    }
}
