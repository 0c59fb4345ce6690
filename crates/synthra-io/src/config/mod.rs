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

//! TOML run configuration.
//!
//! Every field has a default, so an empty file is a valid configuration.
//! [`GenerationConfig::validate`] must pass before the values are converted
//! into the settings consumed by the pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use synthra_core::{AnnotationSettings, GenerationSettings, SplitRatios};
use synthra_telemetry::CleanupPolicy;
use thiserror::Error;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Fewest decimals accepted for label files.
pub const MIN_LABEL_PRECISION: usize = 6;
/// Most decimals accepted for label files.
pub const MAX_LABEL_PRECISION: usize = 12;

/// Decimals needed so a one-pixel box on an image whose longer side is `side`
/// pixels keeps a non-zero extent in its label line.
pub fn min_label_precision(side: u32) -> usize {
    let mut precision = MIN_LABEL_PRECISION;
    while 10u64.pow(precision as u32) < 2 * u64::from(side) {
        precision += 1;
    }
    precision
}

/// A configuration that could not be loaded or is not usable.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config '{}': {source}", path.display())]
    Read {
        /// The config path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML for this schema.
    #[error("cannot parse config '{}': {source}", path.display())]
    Parse {
        /// The config path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: toml::de::Error,
    },
    /// A value is out of range.
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Encoding of the persisted color images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Lossless PNG.
    #[default]
    Png,
    /// JPEG at the configured quality.
    #[serde(alias = "jpeg")]
    Jpg,
}

impl ImageFormat {
    /// File extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpg => "jpg",
        }
    }
}

/// Which memory probe feeds the resource monitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// Resident set size of the process.
    #[default]
    Process,
    /// Live bytes of the tracking allocator.
    Allocator,
}

/// `[annotation]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnnotationConfig {
    /// Instances with fewer visible pixels are dropped.
    pub min_visible_pixels: u32,
    /// Attribute-table visibility filter.
    pub min_visibility: f32,
    /// Decimals written in label files.
    pub precision: usize,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            min_visible_pixels: 10,
            min_visibility: 0.0,
            precision: 6,
        }
    }
}

/// `[generation]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoopConfig {
    /// Extra attempts per slot after the first.
    pub retry_budget_per_frame: u32,
    /// Extra passes over abandoned slots.
    pub top_up_passes: u32,
    /// Color image encoding.
    pub image_format: ImageFormat,
    /// JPEG quality, 1 to 100.
    pub jpeg_quality: u8,
    /// Draw label boxes onto copies under `visualizations/` after the run.
    pub create_visualizations: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            retry_budget_per_frame: 4,
            top_up_passes: 0,
            image_format: ImageFormat::Png,
            jpeg_quality: 95,
            create_visualizations: false,
        }
    }
}

/// `[resources]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResourceConfig {
    /// Accepted frames between checkpoints. `0` disables them.
    pub cleanup_interval: usize,
    /// Growth since the last checkpoint above which a cleanup runs.
    pub standard_cleanup_growth_mb: f64,
    /// Fraction of peak memory that escalates to an aggressive cleanup.
    pub aggressive_cleanup_growth_threshold: f64,
    /// Memory that must not be exceeded after an aggressive cleanup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hard_ceiling_mb: Option<f64>,
    /// Memory probe feeding the monitor.
    pub probe: ProbeKind,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            cleanup_interval: 10,
            standard_cleanup_growth_mb: 0.0,
            aggressive_cleanup_growth_threshold: 0.10,
            hard_ceiling_mb: Some(8192.0),
            probe: ProbeKind::Process,
        }
    }
}

/// `[dataset]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatasetConfig {
    /// Training fraction.
    pub train_split: f64,
    /// Validation fraction.
    pub val_split: f64,
    /// Test fraction.
    pub test_split: f64,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        let ratios = SplitRatios::default();
        Self {
            train_split: ratios.train,
            val_split: ratios.val,
            test_split: ratios.test,
        }
    }
}

/// `[scene]` section, consumed by the procedural scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SceneConfig {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Class names, indexed by class id.
    pub class_names: Vec<String>,
    /// Fewest objects per scene.
    pub min_objects: usize,
    /// Most objects per scene.
    pub max_objects: usize,
    /// Probability that an object is culled.
    pub loss_probability: f64,
    /// Inclusive object extent range, in pixels.
    pub object_size: [u32; 2],
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            class_names: vec!["cable".into(), "connector".into(), "device".into()],
            min_objects: 1,
            max_objects: 5,
            loss_probability: 0.1,
            object_size: [24, 160],
        }
    }
}

/// The whole run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    /// Dataset root.
    pub output_dir: PathBuf,
    /// Slots to fill.
    pub num_images: usize,
    /// Seed of the scene generator. A time-based seed is used when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<u64>,
    /// Extraction settings.
    pub annotation: AnnotationConfig,
    /// Loop settings.
    pub generation: LoopConfig,
    /// Checkpoint settings.
    pub resources: ResourceConfig,
    /// Split settings.
    pub dataset: DatasetConfig,
    /// Scene settings.
    pub scene: SceneConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            num_images: 100,
            random_seed: Some(42),
            annotation: AnnotationConfig::default(),
            generation: LoopConfig::default(),
            resources: ResourceConfig::default(),
            dataset: DatasetConfig::default(),
            scene: SceneConfig::default(),
        }
    }
}

impl GenerationConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Loads and parses a TOML file. Does not validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text, path)?;
        log::info!("Config: loaded '{}'", path.display());
        Ok(config)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Checks every range constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: String) -> Result<(), ConfigError> {
            Err(ConfigError::Invalid { field, reason })
        }

        if self.num_images == 0 {
            return invalid("num_images", "must be at least 1".into());
        }
        if !self.split_ratios().is_valid() {
            return invalid(
                "dataset",
                format!(
                    "splits {}/{}/{} must each be in [0, 1] and sum to 1 within 0.01",
                    self.dataset.train_split, self.dataset.val_split, self.dataset.test_split
                ),
            );
        }
        let threshold = self.resources.aggressive_cleanup_growth_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return invalid(
                "resources.aggressive_cleanup_growth_threshold",
                format!("{threshold} is outside (0, 1]"),
            );
        }
        let standard = self.resources.standard_cleanup_growth_mb;
        if !standard.is_finite() || standard < 0.0 {
            return invalid(
                "resources.standard_cleanup_growth_mb",
                format!("{standard} must be a finite, non-negative size"),
            );
        }
        if let Some(ceiling) = self.resources.hard_ceiling_mb {
            if !ceiling.is_finite() || ceiling <= 0.0 {
                return invalid(
                    "resources.hard_ceiling_mb",
                    format!("{ceiling} must be a finite, positive size"),
                );
            }
        }
        if !(1..=100).contains(&self.generation.jpeg_quality) {
            return invalid(
                "generation.jpeg_quality",
                format!("{} is outside 1..=100", self.generation.jpeg_quality),
            );
        }
        if !(0.0..=1.0).contains(&self.annotation.min_visibility) {
            return invalid(
                "annotation.min_visibility",
                format!("{} is outside [0, 1]", self.annotation.min_visibility),
            );
        }

        let scene = &self.scene;
        if scene.width == 0 || scene.height == 0 {
            return invalid(
                "scene",
                format!("resolution {}x{} must be positive", scene.width, scene.height),
            );
        }
        let precision = self.annotation.precision;
        let needed = min_label_precision(scene.width.max(scene.height));
        if !(needed..=MAX_LABEL_PRECISION).contains(&precision) {
            return invalid(
                "annotation.precision",
                format!(
                    "{precision} is outside {needed}..={MAX_LABEL_PRECISION} for a {}x{} scene",
                    scene.width, scene.height
                ),
            );
        }
        if scene.class_names.is_empty() {
            return invalid("scene.class_names", "must not be empty".into());
        }
        if scene.min_objects > scene.max_objects {
            return invalid(
                "scene.min_objects",
                format!(
                    "{} exceeds max_objects {}",
                    scene.min_objects, scene.max_objects
                ),
            );
        }
        if !(0.0..=1.0).contains(&scene.loss_probability) {
            return invalid(
                "scene.loss_probability",
                format!("{} is outside [0, 1]", scene.loss_probability),
            );
        }
        let [lo, hi] = scene.object_size;
        if lo < 2 || lo > hi {
            return invalid(
                "scene.object_size",
                format!("[{lo}, {hi}] must be increasing and start at 2 or more"),
            );
        }
        Ok(())
    }

    /// Loop parameters.
    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            target_count: self.num_images,
            retry_budget_per_frame: self.generation.retry_budget_per_frame,
            cleanup_interval: self.resources.cleanup_interval,
            top_up_passes: self.generation.top_up_passes,
        }
    }

    /// Extraction thresholds.
    pub fn annotation_settings(&self) -> AnnotationSettings {
        AnnotationSettings {
            min_visible_pixels: self.annotation.min_visible_pixels,
            min_visibility: self.annotation.min_visibility,
        }
    }

    /// Split ratios.
    pub fn split_ratios(&self) -> SplitRatios {
        SplitRatios::new(
            self.dataset.train_split,
            self.dataset.val_split,
            self.dataset.test_split,
        )
    }

    /// Checkpoint policy, with sizes converted from MB to bytes.
    pub fn cleanup_policy(&self) -> CleanupPolicy {
        CleanupPolicy {
            standard_growth_bytes: (self.resources.standard_cleanup_growth_mb * BYTES_PER_MB)
                as u64,
            aggressive_growth_fraction: self.resources.aggressive_cleanup_growth_threshold,
            hard_ceiling_bytes: self
                .resources
                .hard_ceiling_mb
                .map(|mb| (mb * BYTES_PER_MB) as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn parse(text: &str) -> GenerationConfig {
        GenerationConfig::from_toml_str(text, Path::new("test.toml")).unwrap()
    }

    #[test]
    fn empty_document_yields_defaults() {
        let config = parse("");
        assert_eq!(config, GenerationConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = parse(
            r#"
            num_images = 12

            [generation]
            image_format = "jpeg"

            [resources]
            cleanup_interval = 3
            probe = "allocator"
            "#,
        );
        assert_eq!(config.num_images, 12);
        assert_eq!(config.generation.image_format, ImageFormat::Jpg);
        assert_eq!(config.generation.retry_budget_per_frame, 4);
        assert_eq!(config.resources.cleanup_interval, 3);
        assert_eq!(config.resources.probe, ProbeKind::Allocator);
        assert_eq!(config.scene, SceneConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = GenerationConfig::from_toml_str("num_imagez = 3", Path::new("bad.toml"));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn splits_must_sum_to_one() {
        let mut config = GenerationConfig::default();
        config.dataset.test_split = 0.30;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "dataset",
                ..
            })
        ));

        // Within the tolerance.
        config.dataset.test_split = 0.155;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn growth_threshold_must_be_a_fraction() {
        let mut config = GenerationConfig::default();
        config.resources.aggressive_cleanup_growth_threshold = 0.0;
        assert!(config.validate().is_err());
        config.resources.aggressive_cleanup_growth_threshold = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn label_precision_is_range_checked() {
        let mut config = parse("[annotation]\nprecision = 0");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "annotation.precision",
                ..
            })
        ));

        config.annotation.precision = MIN_LABEL_PRECISION;
        assert!(config.validate().is_ok());
        config.annotation.precision = MAX_LABEL_PRECISION + 1;
        assert!(config.validate().is_err());

        // Past 500k pixels six decimals no longer resolve a single pixel.
        config.annotation.precision = 6;
        config.scene.width = 600_000;
        assert!(config.validate().is_err());
        config.annotation.precision = 7;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn min_label_precision_grows_with_resolution() {
        assert_eq!(min_label_precision(640), 6);
        assert_eq!(min_label_precision(500_000), 6);
        assert_eq!(min_label_precision(500_001), 7);
        assert_eq!(min_label_precision(u32::MAX), 10);
    }

    #[test]
    fn nan_resource_values_are_rejected() {
        let config = parse(
            r#"
            [resources]
            aggressive_cleanup_growth_threshold = nan
            "#,
        );
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "resources.aggressive_cleanup_growth_threshold",
                ..
            })
        ));

        let config = parse("[resources]\nhard_ceiling_mb = nan");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "resources.hard_ceiling_mb",
                ..
            })
        ));

        let config = parse("[resources]\nhard_ceiling_mb = inf");
        assert!(config.validate().is_err());

        let config = parse("[resources]\nstandard_cleanup_growth_mb = nan");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "resources.standard_cleanup_growth_mb",
                ..
            })
        ));

        let mut config = GenerationConfig::default();
        config.resources.standard_cleanup_growth_mb = f64::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn scene_constraints_are_checked() {
        let mut config = GenerationConfig::default();
        config.scene.min_objects = 9;
        assert!(config.validate().is_err());

        let mut config = GenerationConfig::default();
        config.scene.class_names.clear();
        assert!(config.validate().is_err());

        let mut config = GenerationConfig::default();
        config.num_images = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn conversions_carry_values_through() {
        let mut config = GenerationConfig::default();
        config.num_images = 7;
        config.resources.standard_cleanup_growth_mb = 1.5;
        config.resources.hard_ceiling_mb = Some(2.0);

        let generation = config.generation_settings();
        assert_eq!(generation.target_count, 7);
        assert_eq!(generation.attempts_per_slot(), 5);

        let policy = config.cleanup_policy();
        assert_eq!(policy.standard_growth_bytes, 1_572_864);
        assert_eq!(policy.hard_ceiling_bytes, Some(2 * 1024 * 1024));
        assert_relative_eq!(policy.aggressive_growth_fraction, 0.10);
        assert_relative_eq!(config.split_ratios().sum(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn config_round_trips_through_toml() {
        let mut config = GenerationConfig::default();
        config.random_seed = None;
        config.resources.hard_ceiling_mb = None;
        let text = config.to_toml_string().unwrap();
        assert_eq!(parse(&text), config);
    }
}
