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

//! # Synthra Telemetry
//!
//! Memory probing and the resource side of the generation loop: the
//! [`ResourceMonitor`] reads a probe, records an append-only
//! [`ResourceTimeline`] and decides, at each checkpoint, whether memory growth
//! warrants a cleanup.

#![warn(missing_docs)]

pub mod monitoring;
pub mod service;
pub mod storage;

pub use monitoring::{
    CeilingVerdict, CheckpointDecision, CleanupPolicy, ProbeRegistry, ResourceMonitor,
};
pub use service::TelemetryService;
pub use storage::{CleanupEvent, ResourceTimeline, TimelineError};
