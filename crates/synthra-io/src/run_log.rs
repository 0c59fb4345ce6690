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

//! The per-run log directory: `logs/generation_<YYYYmmdd_HHMMSS>/`.

use crate::config::GenerationConfig;
use crate::dataset::write_atomic;
use crate::error::IoError;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use synthra_telemetry::ResourceTimeline;

/// Effective configuration of the run.
pub const CONFIG_FILE: &str = "config.toml";
/// Command, timestamp and overrides.
pub const METADATA_FILE: &str = "run_metadata.json";
/// The sample timeline.
pub const MEMORY_CSV: &str = "memory_usage.csv";
/// Cleanup decisions with before and after readings.
pub const EVENTS_CSV: &str = "cleanup_events.csv";
/// The run summary.
pub const SUMMARY_FILE: &str = "generation_summary.json";

/// What was run, when and how.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    /// Subcommand name.
    pub command: String,
    /// Wall-clock start of the run.
    pub started_at: DateTime<Local>,
    /// Tool version.
    pub version: String,
    /// Seed actually used by the scene generator.
    pub seed: u64,
    /// Identifier of the memory probe.
    pub memory_probe: String,
    /// Lane strategies in use.
    pub lanes: Vec<String>,
    /// Values overridden from the command line.
    pub overrides: BTreeMap<String, String>,
}

/// A created run log directory.
#[derive(Debug, Clone)]
pub struct RunLogDir {
    path: PathBuf,
}

impl RunLogDir {
    /// Creates `<output_root>/logs/generation_<timestamp>`. A numeric suffix
    /// is added if two runs start within the same second.
    pub fn create(output_root: &Path, started_at: DateTime<Local>) -> Result<Self, IoError> {
        let logs = output_root.join("logs");
        let base = format!("generation_{}", started_at.format("%Y%m%d_%H%M%S"));

        let mut path = logs.join(&base);
        let mut suffix = 1;
        while path.exists() {
            path = logs.join(format!("{base}_{suffix}"));
            suffix += 1;
        }
        fs::create_dir_all(&path).map_err(|e| IoError::io(&path, e))?;
        log::info!("RunLog: logging run to '{}'", path.display());
        Ok(Self { path })
    }

    /// The directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the text log for `command`, e.g. `generate.log`.
    pub fn log_file(&self, command: &str) -> PathBuf {
        self.path.join(format!("{command}.log"))
    }

    /// Writes `config.toml`.
    pub fn write_config(&self, config: &GenerationConfig) -> Result<(), IoError> {
        let path = self.path.join(CONFIG_FILE);
        let text = config.to_toml_string().map_err(|source| IoError::Toml {
            path: path.clone(),
            source,
        })?;
        write_atomic(&path, text.as_bytes())
    }

    /// Writes `run_metadata.json`.
    pub fn write_metadata(&self, metadata: &RunMetadata) -> Result<(), IoError> {
        self.write_json(METADATA_FILE, metadata)
    }

    /// Writes `memory_usage.csv` and `cleanup_events.csv`.
    pub fn write_timeline(&self, timeline: &ResourceTimeline) -> Result<(), IoError> {
        let samples_path = self.path.join(MEMORY_CSV);
        let mut samples = Vec::new();
        timeline
            .write_samples_csv(&mut samples)
            .map_err(|e| IoError::io(&samples_path, e))?;
        write_atomic(&samples_path, &samples)?;

        let events_path = self.path.join(EVENTS_CSV);
        let mut events = Vec::new();
        timeline
            .write_events_csv(&mut events)
            .map_err(|e| IoError::io(&events_path, e))?;
        write_atomic(&events_path, &events)
    }

    /// Writes `generation_summary.json`.
    pub fn write_summary<T: Serialize>(&self, summary: &T) -> Result<(), IoError> {
        self.write_json(SUMMARY_FILE, summary)
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<(), IoError> {
        let path = self.path.join(name);
        let json = serde_json::to_vec_pretty(value).map_err(|source| IoError::Json {
            path: path.clone(),
            source,
        })?;
        write_atomic(&path, &json)
    }
}
