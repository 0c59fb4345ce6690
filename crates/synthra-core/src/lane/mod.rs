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

//! # Lane Abstraction
//!
//! A **Lane** is a swappable processing strategy owned by an agent. The
//! generation agent does not know how boxes are extracted or how memory is
//! reclaimed; it holds one lane for each and calls it at the right point of
//! the loop.
//!
//! The hierarchy has two levels:
//!
//! 1. **`Lane`**: identity and classification, shared by every lane.
//! 2. Domain traits extending it:
//!    - [`AnnotationLane`]: frame buffers → detections.
//!    - [`MaintenanceLane`]: executes a [`CleanupAction`] against a reclaimer.

use crate::annotation::Detection;
use crate::frame::FrameBuffers;
use crate::scene::ResourceReclaimer;
use crate::telemetry::{CleanupAction, CleanupReport};
use std::any::Any;
use std::fmt;

/// Classification of lane types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaneKind {
    /// Turns segmentation buffers into detections.
    Annotation,
    /// Releases buffers and engine state between frames.
    Cleanup,
}

impl fmt::Display for LaneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneKind::Annotation => write!(f, "Annotation"),
            LaneKind::Cleanup => write!(f, "Cleanup"),
        }
    }
}

/// Base trait for all lanes.
pub trait Lane: Send + Sync {
    /// Human-readable name of the strategy, used in logs and run metadata.
    fn strategy_name(&self) -> &'static str;

    /// The kind of processing this lane performs.
    fn lane_kind(&self) -> LaneKind;

    /// Relative cost of one invocation. Defaults to `1.0`.
    fn estimate_cost(&self) -> f32 {
        1.0
    }

    /// Downcast to a concrete type.
    fn as_any(&self) -> &dyn Any;
}

/// A strategy that converts one frame into ordered detections.
///
/// Implementations must be pure: the same buffers always produce the same
/// detections in the same order, and an empty or background-only frame yields
/// an empty vector rather than an error.
pub trait AnnotationLane: Lane {
    /// Extracts detections from the frame.
    fn extract(&self, frame: &FrameBuffers) -> Vec<Detection>;
}

/// A strategy that carries out a cleanup decision.
pub trait MaintenanceLane: Lane {
    /// Executes `action` against `target` and reports what was reclaimed.
    fn run(&self, action: CleanupAction, target: &mut dyn ResourceReclaimer) -> CleanupReport;
}
