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

//! # Synthra Core
//!
//! Foundational crate containing the data model, traits, and interface contracts
//! shared by every stage of the dataset generation pipeline.
//!
//! Nothing in here touches a renderer, the filesystem, or the operating system.
//! Concrete collaborators live in `synthra-infra` and `synthra-io`; the control
//! loop lives in `synthra-agents`.

#![warn(missing_docs)]

pub mod annotation;
pub mod cancel;
pub mod dataset;
pub mod frame;
pub mod lane;
pub mod memory;
pub mod scene;
pub mod settings;
pub mod sink;
pub mod telemetry;

pub use annotation::{ClassId, Detection, InstanceId, NormalizedBox, PixelBox};
pub use cancel::CancellationToken;
pub use dataset::{ClassTable, DatasetManifest, FrameRecord, Split, SplitRatios};
pub use frame::{
    BufferKind, ColorImage, FrameBuffers, FrameError, InstanceAttributeTable, InstanceAttributes,
    InstanceMap,
};
pub use lane::{AnnotationLane, Lane, LaneKind, MaintenanceLane};
pub use scene::{
    EngineResourceCounts, ResourceReclaimer, RetainedBuffer, SceneError, SceneInfo, SceneRenderer,
    SceneRequest,
};
pub use settings::{AnnotationSettings, GenerationSettings};
pub use sink::{FrameSink, SinkError};
pub use telemetry::{
    CleanupAction, CleanupReport, MemoryProbe, MemorySource, MemoryUsage, ResourceSample,
};
