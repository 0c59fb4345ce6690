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

//! Consistency check of a written dataset.
//!
//! Reports images without labels, labels without images, empty or non-text
//! label files, malformed or out-of-range label lines and class ids missing
//! from `classes.txt`.

use crate::dataset::{CLASSES_FILE, IMAGES_DIR, LABELS_DIR};
use crate::error::IoError;
use crate::labels::{parse_label_line, LabelParseError};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub(crate) const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// One problem found in a dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckIssue {
    /// `images/` or `labels/` is missing.
    MissingDirectory(PathBuf),
    /// An image has no label file.
    MissingLabel(PathBuf),
    /// A label file has no image.
    OrphanLabel(PathBuf),
    /// A label file has no lines.
    EmptyLabel(PathBuf),
    /// A label file is not UTF-8 text.
    UnreadableLabel(PathBuf),
    /// A label line could not be parsed or is out of range.
    MalformedLine {
        /// The label file.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// What is wrong.
        error: LabelParseError,
    },
    /// A label line references a class not listed in `classes.txt`.
    UnknownClass {
        /// The label file.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// The class id found.
        class_id: u32,
    },
}

impl fmt::Display for CheckIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckIssue::MissingDirectory(p) => write!(f, "missing directory {}", p.display()),
            CheckIssue::MissingLabel(p) => write!(f, "image without label: {}", p.display()),
            CheckIssue::OrphanLabel(p) => write!(f, "label without image: {}", p.display()),
            CheckIssue::EmptyLabel(p) => write!(f, "empty label file: {}", p.display()),
            CheckIssue::UnreadableLabel(p) => {
                write!(f, "label file is not UTF-8 text: {}", p.display())
            }
            CheckIssue::MalformedLine { path, line, error } => {
                write!(f, "{}:{line}: {error}", path.display())
            }
            CheckIssue::UnknownClass {
                path,
                line,
                class_id,
            } => write!(f, "{}:{line}: unknown class id {class_id}", path.display()),
        }
    }
}

/// Result of [`check_dataset`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckReport {
    /// Images found.
    pub images: usize,
    /// Label files found.
    pub labels: usize,
    /// Well-formed label lines.
    pub annotations: usize,
    /// Every problem found.
    pub issues: Vec<CheckIssue>,
}

impl CheckReport {
    /// `true` when no issue was found.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Checks the dataset under `root`.
pub fn check_dataset(root: &Path) -> Result<CheckReport, IoError> {
    let mut report = CheckReport::default();

    let images_dir = root.join(IMAGES_DIR);
    let labels_dir = root.join(LABELS_DIR);
    for dir in [&images_dir, &labels_dir] {
        if !dir.is_dir() {
            report.issues.push(CheckIssue::MissingDirectory(dir.clone()));
        }
    }
    if !report.is_clean() {
        return Ok(report);
    }

    let images = files_by_stem(&images_dir, &IMAGE_EXTENSIONS)?;
    let labels = files_by_stem(&labels_dir, &["txt"])?;
    report.images = images.len();
    report.labels = labels.len();

    let class_count = read_class_count(&root.join(CLASSES_FILE))?;

    for (stem, image) in &images {
        if !labels.contains_key(stem) {
            report.issues.push(CheckIssue::MissingLabel(image.clone()));
        }
    }

    for (stem, label) in &labels {
        if !images.contains_key(stem) {
            report.issues.push(CheckIssue::OrphanLabel(label.clone()));
        }

        let bytes = fs::read(label).map_err(|e| IoError::io(label, e))?;
        let Ok(text) = String::from_utf8(bytes) else {
            report.issues.push(CheckIssue::UnreadableLabel(label.clone()));
            continue;
        };
        let mut lines = 0;
        for (i, raw) in text.lines().enumerate() {
            if raw.trim().is_empty() {
                continue;
            }
            lines += 1;
            match parse_label_line(raw) {
                Ok(parsed) => match class_count {
                    Some(count) if parsed.class_id.0 as usize >= count => {
                        report.issues.push(CheckIssue::UnknownClass {
                            path: label.clone(),
                            line: i + 1,
                            class_id: parsed.class_id.0,
                        });
                    }
                    _ => report.annotations += 1,
                },
                Err(error) => report.issues.push(CheckIssue::MalformedLine {
                    path: label.clone(),
                    line: i + 1,
                    error,
                }),
            }
        }
        if lines == 0 {
            report.issues.push(CheckIssue::EmptyLabel(label.clone()));
        }
    }

    log::info!(
        "DatasetCheck: {} images, {} labels, {} annotations, {} issues",
        report.images,
        report.labels,
        report.annotations,
        report.issues.len()
    );
    Ok(report)
}

/// Files directly inside `dir` with one of `extensions`, keyed by stem.
pub(crate) fn files_by_stem(
    dir: &Path,
    extensions: &[&str],
) -> Result<BTreeMap<String, PathBuf>, IoError> {
    let mut files = BTreeMap::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| IoError::io(dir, e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)));
        if !matches {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            files.insert(stem.to_owned(), path.to_path_buf());
        }
    }
    Ok(files)
}

fn read_class_count(path: &Path) -> Result<Option<usize>, IoError> {
    if !path.is_file() {
        return Ok(None);
    }
    let text = fs::read_to_string(path).map_err(|e| IoError::io(path, e))?;
    Ok(Some(text.lines().filter(|l| !l.trim().is_empty()).count()))
}
