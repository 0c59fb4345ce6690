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

//! Builds the collaborators from a configuration, runs the generation agent
//! and writes the dataset-level files and the run log.

use crate::logging::LogTee;
use crate::progress::ProgressObserver;
use anyhow::{Context, Result};
use chrono::Local;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use synthra_agents::{CleanupAgent, GenerationAgent, GenerationReport, RunPlan};
use synthra_core::lane::Lane;
use synthra_core::{MemoryProbe, MemorySource};
use synthra_infra::{
    ProceduralScene, ProceduralSceneSettings, ProcessMemoryProbe, TrackingMemoryProbe,
};
use synthra_io::{
    visualize_dataset, DatasetWriter, GenerationConfig, ProbeKind, RunLogDir, RunMetadata,
    VisualizeReport, WriterOptions,
};
use synthra_lanes::MaskBoundsLane;
use synthra_telemetry::{ResourceMonitor, TelemetryService};

/// Subdirectory of the output root used by preview runs.
pub const PREVIEW_DIR: &str = "preview";

/// What kind of run to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Full dataset with split lists.
    Generate,
    /// A handful of frames under `<output>/preview`, without split lists.
    Preview {
        /// Frames to generate.
        count: usize,
    },
}

impl RunMode {
    fn command(&self) -> &'static str {
        match self {
            RunMode::Generate => "generate",
            RunMode::Preview { .. } => "preview",
        }
    }
}

/// Command-line values that replace configuration values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Replaces `output_dir`.
    pub output_dir: Option<PathBuf>,
    /// Replaces `num_images`.
    pub num_images: Option<usize>,
    /// Replaces `random_seed`.
    pub random_seed: Option<u64>,
}

impl Overrides {
    /// Applies the overrides and returns them as `name → value` for the run metadata.
    pub fn apply(&self, config: &mut GenerationConfig) -> BTreeMap<String, String> {
        let mut applied = BTreeMap::new();
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
            applied.insert("output_dir".to_owned(), dir.display().to_string());
        }
        if let Some(n) = self.num_images {
            config.num_images = n;
            applied.insert("num_images".to_owned(), n.to_string());
        }
        if let Some(seed) = self.random_seed {
            config.random_seed = Some(seed);
            applied.insert("random_seed".to_owned(), seed.to_string());
        }
        applied
    }
}

/// How a run reports while it works.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Draw a progress bar on stderr.
    pub show_progress: bool,
    /// Copy log records to `<command>.log` in the run log directory.
    pub log_tee: Option<LogTee>,
}

/// Where a finished run left its files, and what it did.
#[derive(Debug)]
pub struct RunOutcome {
    /// The dataset root.
    pub dataset_root: PathBuf,
    /// The run log directory.
    pub log_dir: PathBuf,
    /// The agent's report.
    pub report: GenerationReport,
    /// Set when `create_visualizations` is on.
    pub visualizations: Option<VisualizeReport>,
}

/// Loads the configuration file, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<GenerationConfig> {
    match path {
        Some(path) => Ok(GenerationConfig::load(path)?),
        None => {
            log::info!("Pipeline: no config file given, using defaults");
            Ok(GenerationConfig::default())
        }
    }
}

/// Procedural scene parameters from the `[scene]` section.
pub fn scene_settings(config: &GenerationConfig, seed: u64) -> ProceduralSceneSettings {
    let scene = &config.scene;
    ProceduralSceneSettings {
        width: scene.width,
        height: scene.height,
        class_names: scene.class_names.clone(),
        min_objects: scene.min_objects,
        max_objects: scene.max_objects,
        loss_probability: scene.loss_probability,
        object_size: (scene.object_size[0], scene.object_size[1]),
        seed,
    }
}

fn build_monitor(config: &GenerationConfig) -> Result<ResourceMonitor> {
    let telemetry = TelemetryService::default();
    let source = match config.resources.probe {
        ProbeKind::Process => match ProcessMemoryProbe::new() {
            Ok(probe) => {
                telemetry.register(Arc::new(probe));
                MemorySource::ProcessResident
            }
            Err(e) => {
                log::warn!("Pipeline: process memory probe unavailable ({e}), falling back to the allocator probe");
                telemetry.register(Arc::new(TrackingMemoryProbe::default()));
                MemorySource::Allocator
            }
        },
        ProbeKind::Allocator => {
            telemetry.register(Arc::new(TrackingMemoryProbe::default()));
            MemorySource::Allocator
        }
    };

    for (id, usage) in telemetry.snapshot() {
        log::info!(
            "Pipeline: probe '{id}' reads {:.1} MB",
            usage.current_bytes as f64 / (1024.0 * 1024.0)
        );
    }

    telemetry
        .monitor_for(source, config.cleanup_policy())
        .with_context(|| format!("no memory probe registered for source '{}'", source.as_str()))
}

/// Runs the pipeline end to end.
///
/// `config` must already carry the command-line overrides; `overrides` only
/// records them in the run metadata.
pub fn run(
    mut config: GenerationConfig,
    mode: RunMode,
    overrides: BTreeMap<String, String>,
    options: &RunOptions,
) -> Result<RunOutcome> {
    let started_at = Local::now();
    let seed = config
        .random_seed
        .unwrap_or_else(|| started_at.timestamp_micros() as u64);
    config.random_seed = Some(seed);

    let (dataset_root, write_split_lists) = match mode {
        RunMode::Generate => (config.output_dir.clone(), true),
        RunMode::Preview { count } => {
            config.num_images = count;
            (config.output_dir.join(PREVIEW_DIR), false)
        }
    };
    config.validate()?;

    let monitor = build_monitor(&config)?;
    let probe_id = monitor.probe().probe_id().into_owned();
    let scene = ProceduralScene::new(scene_settings(&config, seed))
        .context("failed to set up the procedural scene")?;
    let mut writer = DatasetWriter::create(
        &dataset_root,
        WriterOptions {
            write_split_lists,
            ..WriterOptions::from(&config)
        },
    )?;

    let annotation_lane = MaskBoundsLane::new(config.annotation_settings());
    let cleanup = CleanupAgent::new();
    let lanes = vec![
        annotation_lane.strategy_name().to_owned(),
        cleanup.strategy_name().to_owned(),
    ];

    let log_dir = RunLogDir::create(&dataset_root, started_at)?;
    let _log_file = match &options.log_tee {
        Some(tee) => {
            let path = log_dir.log_file(mode.command());
            match tee.attach_scoped(&path) {
                Ok(guard) => Some(guard),
                Err(e) => {
                    log::warn!("Pipeline: cannot write '{}': {e}", path.display());
                    None
                }
            }
        }
        None => None,
    };
    log_dir.write_config(&config)?;
    log_dir.write_metadata(&RunMetadata {
        command: mode.command().to_owned(),
        started_at,
        version: env!("CARGO_PKG_VERSION").to_owned(),
        seed,
        memory_probe: probe_id,
        lanes,
        overrides,
    })?;

    let plan = RunPlan {
        generation: config.generation_settings(),
        annotation: config.annotation_settings(),
        split_ratios: config.split_ratios(),
    };
    let observer = if options.show_progress {
        ProgressObserver::new()
    } else {
        ProgressObserver::hidden()
    };
    let agent = GenerationAgent::new(scene, &mut writer, monitor, plan)?
        .with_annotation_lane(Box::new(annotation_lane))
        .with_cleanup_agent(cleanup)
        .with_observer(Box::new(observer));

    let report = agent.run().context("generation run failed")?;

    writer.finish(&report.manifest)?;
    let visualizations = if config.generation.create_visualizations {
        Some(visualize_dataset(&dataset_root, None)?)
    } else {
        None
    };
    log_dir.write_timeline(&report.timeline)?;
    log_dir.write_summary(&report.summary)?;

    Ok(RunOutcome {
        dataset_root,
        log_dir: log_dir.path().to_path_buf(),
        report,
        visualizations,
    })
}
