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

//! Per-slot accept / retry / abandon decisions.

use synthra_core::Detection;

/// Where a slot stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Waiting for the result of the next attempt.
    Attempting,
    /// An attempt produced detections. Terminal.
    Accepted,
    /// The last attempt was empty and budget remains.
    Retry,
    /// Every attempt was empty. Terminal.
    Abandoned,
}

/// The decision for one attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptVerdict {
    /// Keep the frame; carries its detections.
    Accepted(Vec<Detection>),
    /// Discard the frame and rebuild.
    Retry {
        /// Attempts made so far, this one included.
        attempts: u32,
        /// Attempts still allowed.
        remaining: u32,
    },
    /// Give up on the slot.
    Abandoned {
        /// The abandoned slot.
        slot: usize,
        /// Attempts made.
        attempts: u32,
    },
}

/// Tracks the attempts of one slot.
///
/// A budget of `k` allows `k + 1` attempts. An attempt is accepted if and only
/// if it produced at least one detection; there is no partial acceptance.
#[derive(Debug, Clone)]
pub struct RetryController {
    slot: usize,
    max_attempts: u32,
    attempts: u32,
    state: SlotState,
}

impl RetryController {
    /// Creates a controller for `slot` with `retry_budget` extra attempts.
    pub fn new(slot: usize, retry_budget: u32) -> Self {
        Self {
            slot,
            max_attempts: retry_budget.saturating_add(1),
            attempts: 0,
            state: SlotState::Attempting,
        }
    }

    /// The slot being filled.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Zero-based index of the next attempt.
    pub fn next_attempt(&self) -> u32 {
        self.attempts
    }

    /// Attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Total attempts allowed.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Current state.
    pub fn state(&self) -> SlotState {
        self.state
    }

    /// `true` once the slot is accepted or abandoned.
    pub fn is_finished(&self) -> bool {
        matches!(self.state, SlotState::Accepted | SlotState::Abandoned)
    }

    /// Decides the fate of the attempt that produced `detections`.
    ///
    /// Calling this on a finished controller reports the slot as abandoned
    /// without counting another attempt.
    pub fn evaluate(&mut self, detections: Vec<Detection>) -> AttemptVerdict {
        if self.is_finished() {
            log::warn!(
                "RetryController: slot {} evaluated after it finished ({:?})",
                self.slot,
                self.state
            );
            return AttemptVerdict::Abandoned {
                slot: self.slot,
                attempts: self.attempts,
            };
        }

        self.attempts += 1;

        if !detections.is_empty() {
            self.state = SlotState::Accepted;
            return AttemptVerdict::Accepted(detections);
        }

        let remaining = self.max_attempts.saturating_sub(self.attempts);
        if remaining > 0 {
            self.state = SlotState::Retry;
            AttemptVerdict::Retry {
                attempts: self.attempts,
                remaining,
            }
        } else {
            self.state = SlotState::Abandoned;
            AttemptVerdict::Abandoned {
                slot: self.slot,
                attempts: self.attempts,
            }
        }
    }
}
