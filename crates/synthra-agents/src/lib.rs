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

//! # Synthra Agents
//!
//! Agents own the control flow of a run and delegate the actual work to lanes:
//!
//! - [`generation_agent`]: the per-slot build → render → extract → decide loop.
//! - [`cleanup_agent`]: resource checkpoints between accepted frames.

#![warn(missing_docs)]

pub mod cleanup_agent;
pub mod generation_agent;

pub use cleanup_agent::{CheckpointOutcome, CleanupAgent};
pub use generation_agent::{
    AttemptVerdict, GenerationAgent, GenerationError, GenerationReport, NoopObserver,
    RetryController, RunObserver, RunPlan, RunSummary, SkippedSlot, SlotState, StopReason,
};
