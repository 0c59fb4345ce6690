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

//! The dataset writer, the pipeline's [`FrameSink`].

use super::atomic::{commit, stage, write_atomic};
use super::manifest::{portable, ManifestFile};
use super::{frame_stem, CLASSES_FILE, IMAGES_DIR, LABELS_DIR, MANIFEST_FILE};
use crate::config::{GenerationConfig, ImageFormat};
use crate::error::IoError;
use crate::labels::format_label_file;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use std::fs;
use std::path::{Path, PathBuf};
use synthra_core::{ColorImage, DatasetManifest, Detection, FrameBuffers, FrameSink, SinkError, Split};

/// How frames are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    /// Color image encoding.
    pub image_format: ImageFormat,
    /// JPEG quality, ignored for PNG.
    pub jpeg_quality: u8,
    /// Decimals in label files.
    pub precision: usize,
    /// Whether `finish` writes `train.txt`, `val.txt` and `test.txt`.
    pub write_split_lists: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            image_format: ImageFormat::Png,
            jpeg_quality: 95,
            precision: 6,
            write_split_lists: true,
        }
    }
}

impl From<&GenerationConfig> for WriterOptions {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            image_format: config.generation.image_format,
            jpeg_quality: config.generation.jpeg_quality,
            precision: config.annotation.precision,
            write_split_lists: true,
        }
    }
}

/// Writes accepted frames as `images/frame_NNNNNN.<ext>` plus
/// `labels/frame_NNNNNN.txt`, and the dataset-level files at the end.
///
/// Each file is staged as a `.tmp` sibling and renamed into place. The label
/// is renamed first, so an image on disk always has its label.
#[derive(Debug)]
pub struct DatasetWriter {
    root: PathBuf,
    options: WriterOptions,
    frames_written: u64,
}

impl DatasetWriter {
    /// Creates the dataset root with its `images/` and `labels/` directories.
    pub fn create(root: impl Into<PathBuf>, options: WriterOptions) -> Result<Self, IoError> {
        let root = root.into();
        for dir in [IMAGES_DIR, LABELS_DIR] {
            let path = root.join(dir);
            fs::create_dir_all(&path).map_err(|e| IoError::io(&path, e))?;
        }
        log::info!("DatasetWriter: writing dataset to '{}'", root.display());
        Ok(Self {
            root,
            options,
            frames_written: 0,
        })
    }

    /// The dataset root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Frames persisted so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Image path of a frame, relative to the root.
    pub fn image_path(&self, frame_index: u64) -> PathBuf {
        Path::new(IMAGES_DIR).join(format!(
            "{}.{}",
            frame_stem(frame_index),
            self.options.image_format.extension()
        ))
    }

    /// Label path of a frame, relative to the root.
    pub fn label_path(&self, frame_index: u64) -> PathBuf {
        Path::new(LABELS_DIR).join(format!("{}.txt", frame_stem(frame_index)))
    }

    fn encode(&self, color: &ColorImage, target: &Path) -> Result<Vec<u8>, IoError> {
        let mut bytes = Vec::new();
        let (width, height) = (color.width(), color.height());
        let encoded = match self.options.image_format {
            ImageFormat::Png => PngEncoder::new(&mut bytes).write_image(
                color.as_raw(),
                width,
                height,
                ExtendedColorType::Rgb8,
            ),
            ImageFormat::Jpg => JpegEncoder::new_with_quality(&mut bytes, self.options.jpeg_quality)
                .write_image(color.as_raw(), width, height, ExtendedColorType::Rgb8),
        };
        encoded.map_err(|source| IoError::Image {
            path: target.to_path_buf(),
            source,
        })?;
        Ok(bytes)
    }

    fn write_frame(
        &mut self,
        frame_index: u64,
        frame: &FrameBuffers,
        detections: &[Detection],
    ) -> Result<PathBuf, IoError> {
        let image_rel = self.image_path(frame_index);
        let image_abs = self.root.join(&image_rel);
        let label_abs = self.root.join(self.label_path(frame_index));

        let image_bytes = self.encode(&frame.color, &image_abs)?;
        let label_text =
            format_label_file(detections, self.options.precision).map_err(|source| {
                IoError::Label {
                    path: label_abs.clone(),
                    source,
                }
            })?;

        let staged_label = stage(&label_abs, label_text.as_bytes())?;
        let staged_image = match stage(&image_abs, &image_bytes) {
            Ok(staged) => staged,
            Err(e) => {
                let _ = fs::remove_file(&staged_label);
                return Err(e);
            }
        };
        commit(&staged_label, &label_abs)?;
        commit(&staged_image, &image_abs)?;

        self.frames_written += 1;
        log::debug!(
            "DatasetWriter: wrote {} ({} labels)",
            image_rel.display(),
            detections.len()
        );
        Ok(image_rel)
    }

    /// Writes `classes.txt`, `manifest.json` and, unless disabled, the split
    /// lists.
    pub fn finish(&self, manifest: &DatasetManifest) -> Result<(), IoError> {
        let mut classes = String::new();
        for name in manifest.classes().names_in_order() {
            classes.push_str(name);
            classes.push('\n');
        }
        write_atomic(&self.root.join(CLASSES_FILE), classes.as_bytes())?;

        let manifest_path = self.root.join(MANIFEST_FILE);
        let json = serde_json::to_vec_pretty(&ManifestFile::from(manifest)).map_err(|source| {
            IoError::Json {
                path: manifest_path.clone(),
                source,
            }
        })?;
        write_atomic(&manifest_path, &json)?;

        if self.options.write_split_lists {
            for split in Split::ALL {
                let mut list = String::new();
                for path in manifest.relative_paths(split) {
                    list.push_str(&portable(path));
                    list.push('\n');
                }
                write_atomic(
                    &self.root.join(format!("{}.txt", split.name())),
                    list.as_bytes(),
                )?;
            }
        }

        log::info!(
            "DatasetWriter: dataset files written ({} frames: {} train, {} val, {} test)",
            manifest.total(),
            manifest.split(Split::Train).len(),
            manifest.split(Split::Val).len(),
            manifest.split(Split::Test).len()
        );
        Ok(())
    }
}

impl FrameSink for DatasetWriter {
    fn persist(
        &mut self,
        frame_index: u64,
        frame: &FrameBuffers,
        detections: &[Detection],
    ) -> Result<PathBuf, SinkError> {
        self.write_frame(frame_index, frame, detections)
            .map_err(SinkError::from)
    }
}

impl From<IoError> for SinkError {
    fn from(error: IoError) -> Self {
        match error {
            IoError::Image { source, .. } => SinkError::Encode(source.to_string()),
            IoError::Label { source, .. } => SinkError::Encode(source.to_string()),
            IoError::Io { path, source } => SinkError::Io {
                path,
                message: source.to_string(),
            },
            IoError::Json { path, source } => SinkError::Io {
                path,
                message: source.to_string(),
            },
            IoError::Toml { path, source } => SinkError::Io {
                path,
                message: source.to_string(),
            },
        }
    }
}
