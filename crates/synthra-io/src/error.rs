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

//! Filesystem errors with path context.

use std::path::PathBuf;
use thiserror::Error;

/// A failure while reading or writing dataset or run-log files.
#[derive(Debug, Error)]
pub enum IoError {
    /// A filesystem operation failed.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A JSON document could not be produced.
    #[error("failed to serialize '{}': {source}", path.display())]
    Json {
        /// The target path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// A TOML document could not be produced.
    #[error("failed to serialize '{}': {source}", path.display())]
    Toml {
        /// The target path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: toml::ser::Error,
    },
    /// A label file could not be produced.
    #[error("failed to write labels '{}': {source}", path.display())]
    Label {
        /// The target path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: crate::labels::LabelFormatError,
    },
    /// An image could not be encoded.
    #[error("failed to encode '{}': {source}", path.display())]
    Image {
        /// The target path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: image::ImageError,
    },
}

impl IoError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IoError::Io {
            path: path.into(),
            source,
        }
    }
}
