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

//! Persistence contract for accepted frames.

use crate::annotation::Detection;
use crate::frame::FrameBuffers;
use std::fmt;
use std::path::PathBuf;

/// Receives every accepted frame as soon as it is accepted.
pub trait FrameSink {
    /// Writes the color image and its label file.
    ///
    /// `detections` is never empty. On success returns the image path relative
    /// to the dataset root, which becomes the frame record's path.
    fn persist(
        &mut self,
        frame_index: u64,
        frame: &FrameBuffers,
        detections: &[Detection],
    ) -> Result<PathBuf, SinkError>;
}

impl<S: FrameSink + ?Sized> FrameSink for &mut S {
    fn persist(
        &mut self,
        frame_index: u64,
        frame: &FrameBuffers,
        detections: &[Detection],
    ) -> Result<PathBuf, SinkError> {
        (**self).persist(frame_index, frame, detections)
    }
}

/// A persistence failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// A filesystem operation failed.
    Io {
        /// The path being written.
        path: PathBuf,
        /// The underlying error message.
        message: String,
    },
    /// Encoding the image failed.
    Encode(String),
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::Io { path, message } => {
                write!(f, "Failed to write '{}': {message}", path.display())
            }
            SinkError::Encode(msg) => write!(f, "Failed to encode image: {msg}"),
        }
    }
}

impl std::error::Error for SinkError {}
