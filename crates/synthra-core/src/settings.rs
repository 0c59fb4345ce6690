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

//! Run parameters consumed by the pipeline, already validated by the
//! configuration layer.

use serde::{Deserialize, Serialize};

/// Parameters of the generation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Number of slots to fill.
    pub target_count: usize,
    /// Extra attempts allowed per slot after the first.
    pub retry_budget_per_frame: u32,
    /// Accepted frames between two resource checkpoints. `0` disables checkpoints.
    pub cleanup_interval: usize,
    /// Extra passes over abandoned slots once the main pass is done.
    pub top_up_passes: u32,
}

impl GenerationSettings {
    /// Attempts allowed per slot, i.e. `retry_budget_per_frame + 1`.
    pub fn attempts_per_slot(&self) -> u32 {
        self.retry_budget_per_frame.saturating_add(1)
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            target_count: 100,
            retry_budget_per_frame: 4,
            cleanup_interval: 10,
            top_up_passes: 0,
        }
    }
}

/// Parameters of annotation extraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnnotationSettings {
    /// Instances with fewer pixels are ignored.
    pub min_visible_pixels: u32,
    /// Instances whose attribute-table visibility is below this are ignored.
    /// Instances without a visibility value are always kept.
    pub min_visibility: f32,
}

impl Default for AnnotationSettings {
    fn default() -> Self {
        Self {
            min_visible_pixels: 10,
            min_visibility: 0.0,
        }
    }
}
