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

//! # Synthra Lanes
//!
//! Hot-path strategies plugged into the generation agents.
//!
//! - [`annotation_lane`]: segmentation buffers → normalized detections.
//! - [`maintenance_lane`]: executes cleanup actions against the renderer.

#![warn(missing_docs)]

pub mod annotation_lane;
pub mod maintenance_lane;

pub use annotation_lane::MaskBoundsLane;
pub use maintenance_lane::CleanupLane;
