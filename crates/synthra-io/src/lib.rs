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

//! Everything that touches the filesystem: configuration, the dataset writer,
//! run logs, the dataset checker and annotated previews.

#![warn(missing_docs)]

pub mod check;
pub mod config;
pub mod dataset;
pub mod error;
pub mod labels;
pub mod run_log;
pub mod visualize;

pub use check::{check_dataset, CheckIssue, CheckReport};
pub use config::{
    min_label_precision, AnnotationConfig, ConfigError, DatasetConfig, GenerationConfig,
    ImageFormat, LoopConfig, ProbeKind, ResourceConfig, SceneConfig, MAX_LABEL_PRECISION,
    MIN_LABEL_PRECISION,
};
pub use dataset::{DatasetWriter, WriterOptions};
pub use error::IoError;
pub use labels::{
    format_label_file, parse_label_line, LabelFormatError, LabelLine, LabelParseError,
};
pub use run_log::{RunLogDir, RunMetadata};
pub use visualize::{visualize_dataset, VisualizeReport, VISUALIZATIONS_DIR};
