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

//! The generation loop and its per-slot retry logic.

mod agent;
mod observer;
mod report;
mod retry;

pub use agent::{GenerationAgent, RunPlan};
pub use observer::{NoopObserver, RunObserver};
pub use report::{GenerationReport, RunSummary, SkippedSlot, StopReason};
pub use retry::{AttemptVerdict, RetryController, SlotState};

use synthra_core::{FrameError, SceneError, SinkError};
use synthra_data::AssemblyError;
use synthra_telemetry::TimelineError;
use thiserror::Error;

/// A failure that ends the run.
///
/// Empty attempts, skipped slots, cleanups and ceiling stops are not errors;
/// they are reported through [`GenerationReport`].
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The scene or render collaborator failed.
    #[error(transparent)]
    Scene(#[from] SceneError),
    /// The renderer returned malformed buffers.
    #[error("renderer returned malformed buffers: {0}")]
    Frame(#[from] FrameError),
    /// An accepted frame could not be persisted.
    #[error(transparent)]
    Sink(#[from] SinkError),
    /// The dataset could not be assembled.
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
    /// The resource timeline rejected a sample.
    #[error(transparent)]
    Timeline(#[from] TimelineError),
}
