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

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use synthra_cli::logging::LogTee;
use synthra_cli::pipeline::{self, Overrides, RunMode, RunOptions, PREVIEW_DIR};
use synthra_data::allocators::TrackingAllocator;
use synthra_io::{check_dataset, GenerationConfig, ProbeKind, VISUALIZATIONS_DIR};

#[global_allocator]
static GLOBAL: TrackingAllocator = TrackingAllocator::new(std::alloc::System);

fn small_config(output: &Path) -> GenerationConfig {
    let mut config = GenerationConfig::default();
    config.output_dir = output.to_path_buf();
    config.num_images = 6;
    config.random_seed = Some(11);
    config.resources.probe = ProbeKind::Allocator;
    config.resources.cleanup_interval = 2;
    config.scene.width = 64;
    config.scene.height = 48;
    config.scene.min_objects = 2;
    config.scene.max_objects = 3;
    config.scene.loss_probability = 0.0;
    config.scene.object_size = [8, 20];
    config.annotation.min_visible_pixels = 4;
    config
}

fn run(config: GenerationConfig, mode: RunMode) -> pipeline::RunOutcome {
    pipeline::run(config, mode, BTreeMap::new(), &RunOptions::default()).unwrap()
}

fn log_dirs(root: &Path) -> Vec<std::path::PathBuf> {
    fs::read_dir(root.join("logs"))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect()
}

#[test]
fn test_generate_writes_dataset_and_run_log() {
    // --- 1. ARRANGE ---
    let tmp = tempfile::tempdir().unwrap();
    let config = small_config(tmp.path());

    // --- 2. ACT ---
    let outcome = run(config, RunMode::Generate);

    // --- 3. ASSERT ---
    let root = tmp.path();
    assert_eq!(outcome.dataset_root, root);
    assert_eq!(outcome.report.summary.accepted_frames, 6);
    assert_eq!(outcome.report.manifest.total(), 6);

    for name in ["classes.txt", "manifest.json", "train.txt", "val.txt", "test.txt"] {
        assert!(root.join(name).is_file(), "missing {name}");
    }
    let classes = fs::read_to_string(root.join("classes.txt")).unwrap();
    assert_eq!(classes.lines().collect::<Vec<_>>(), ["cable", "connector", "device"]);

    let logs = log_dirs(root);
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0], outcome.log_dir);
    for name in [
        "config.toml",
        "run_metadata.json",
        "memory_usage.csv",
        "cleanup_events.csv",
        "generation_summary.json",
    ] {
        assert!(outcome.log_dir.join(name).is_file(), "missing log file {name}");
    }

    let metadata: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(outcome.log_dir.join("run_metadata.json")).unwrap())
            .unwrap();
    assert_eq!(metadata["command"], "generate");
    assert_eq!(metadata["seed"], 11);

    let report = check_dataset(root).unwrap();
    assert!(report.is_clean(), "issues: {:?}", report.issues);
    assert_eq!(report.images, 6);
    assert_eq!(report.labels, 6);
    assert!(report.annotations >= 6);
}

#[test]
fn test_saved_config_reloads_to_the_same_values() {
    // --- 1. ARRANGE ---
    let tmp = tempfile::tempdir().unwrap();
    let config = small_config(tmp.path());

    // --- 2. ACT ---
    let outcome = run(config.clone(), RunMode::Generate);
    let reloaded = GenerationConfig::load(&outcome.log_dir.join("config.toml")).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(reloaded, config);
}

#[test]
fn test_preview_writes_under_preview_dir_without_split_lists() {
    // --- 1. ARRANGE ---
    let tmp = tempfile::tempdir().unwrap();
    let config = small_config(tmp.path());

    // --- 2. ACT ---
    let outcome = run(config, RunMode::Preview { count: 2 });

    // --- 3. ASSERT ---
    let preview = tmp.path().join(PREVIEW_DIR);
    assert_eq!(outcome.dataset_root, preview);
    assert_eq!(outcome.report.summary.accepted_frames, 2);
    assert!(preview.join("manifest.json").is_file());
    assert!(!preview.join("train.txt").exists());
    assert!(!tmp.path().join("images").exists());
    assert!(check_dataset(&preview).unwrap().is_clean());
}

#[test]
fn test_same_seed_gives_identical_labels() {
    // --- 1. ARRANGE ---
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();

    // --- 2. ACT ---
    run(small_config(first.path()), RunMode::Generate);
    run(small_config(second.path()), RunMode::Generate);

    // --- 3. ASSERT ---
    for index in 0..6 {
        let name = format!("labels/frame_{index:06}.txt");
        assert_eq!(
            fs::read_to_string(first.path().join(&name)).unwrap(),
            fs::read_to_string(second.path().join(&name)).unwrap()
        );
    }
}

#[test]
fn test_overrides_are_applied_and_recorded() {
    // --- 1. ARRANGE ---
    let tmp = tempfile::tempdir().unwrap();
    let mut config = small_config(Path::new("unused"));
    let overrides = Overrides {
        output_dir: Some(tmp.path().to_path_buf()),
        num_images: Some(3),
        random_seed: Some(99),
    };

    // --- 2. ACT ---
    let applied = overrides.apply(&mut config);
    let outcome =
        pipeline::run(config, RunMode::Generate, applied.clone(), &RunOptions::default()).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(applied.len(), 3);
    assert_eq!(applied["num_images"], "3");
    assert_eq!(outcome.report.summary.accepted_frames, 3);
    let metadata: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(outcome.log_dir.join("run_metadata.json")).unwrap())
            .unwrap();
    assert_eq!(metadata["overrides"]["random_seed"], "99");
}

#[test]
fn test_invalid_config_fails_before_writing() {
    // --- 1. ARRANGE ---
    let tmp = tempfile::tempdir().unwrap();
    let mut config = small_config(tmp.path());
    config.dataset.train_split = 0.9;

    // --- 2. ACT ---
    let result = pipeline::run(
        config,
        RunMode::Generate,
        BTreeMap::new(),
        &RunOptions::default(),
    );

    // --- 3. ASSERT ---
    assert!(result.is_err());
    assert!(!tmp.path().join("images").exists());
}

#[test]
fn test_visualizations_are_created_when_enabled() {
    // --- 1. ARRANGE ---
    let tmp = tempfile::tempdir().unwrap();
    let mut config = small_config(tmp.path());
    config.generation.create_visualizations = true;

    // --- 2. ACT ---
    let outcome = run(config, RunMode::Generate);

    // --- 3. ASSERT ---
    let report = outcome.visualizations.unwrap();
    assert_eq!(report.written, 6);
    assert_eq!(report.unlabeled, 0);
    assert!(report.boxes >= 6);
    let annotated = tmp.path().join(VISUALIZATIONS_DIR);
    assert!(annotated.join("train/frame_000000_annotated.png").is_file());
}

#[test]
fn test_visualizations_are_off_by_default() {
    let tmp = tempfile::tempdir().unwrap();

    let outcome = run(small_config(tmp.path()), RunMode::Generate);

    assert!(outcome.visualizations.is_none());
    assert!(!tmp.path().join(VISUALIZATIONS_DIR).exists());
}

#[test]
fn test_run_log_file_is_attached_for_the_run_only() {
    // --- 1. ARRANGE ---
    let tmp = tempfile::tempdir().unwrap();
    let tee = LogTee::new();
    let options = RunOptions {
        show_progress: false,
        log_tee: Some(tee.clone()),
    };

    // --- 2. ACT ---
    let outcome = pipeline::run(
        small_config(tmp.path()),
        RunMode::Preview { count: 1 },
        BTreeMap::new(),
        &options,
    )
    .unwrap();

    // --- 3. ASSERT ---
    assert!(outcome.log_dir.join("preview.log").is_file());
    assert!(!tee.is_attached());
}
