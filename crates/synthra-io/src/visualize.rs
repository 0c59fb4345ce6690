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

//! Annotated copies of dataset images.
//!
//! Every label box is drawn as a class-colored outline with a small tag above
//! its top-left corner. Images without labels get a red border. Copies land in
//! `visualizations/<split>/<stem>_annotated.png`, or directly in
//! `visualizations/` when the dataset has no split lists.

use crate::check::{files_by_stem, IMAGE_EXTENSIONS};
use crate::dataset::{write_atomic, IMAGES_DIR, LABELS_DIR};
use crate::error::IoError;
use crate::labels::{parse_label_line, LabelLine};
use image::{Rgb, RgbImage};
use std::collections::BTreeMap;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use synthra_core::{ClassId, NormalizedBox, Split};

/// Output directory, relative to the dataset root.
pub const VISUALIZATIONS_DIR: &str = "visualizations";

const BOX_THICKNESS: u32 = 2;
const TAG_SIZE: u32 = 6;
const UNLABELED_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// What [`visualize_dataset`] produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisualizeReport {
    /// Where the annotated copies were written.
    pub output_dir: PathBuf,
    /// Annotated copies written.
    pub written: usize,
    /// Boxes drawn over all images.
    pub boxes: usize,
    /// Images with no usable label line.
    pub unlabeled: usize,
    /// Images that could not be decoded.
    pub skipped: Vec<PathBuf>,
}

/// Stable outline color of a class.
pub fn class_color(class_id: ClassId) -> Rgb<u8> {
    let hash = class_id.0.wrapping_add(1).wrapping_mul(0x9E37_79B1);
    let [r, g, b, _] = hash.to_le_bytes();
    Rgb([r | 0x40, g | 0x40, b | 0x40])
}

/// Pixel rectangle `(x0, y0, x1, y1)` of a normalized box, inclusive and
/// clamped to the image.
pub fn pixel_rect(bbox: &NormalizedBox, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    if width == 0 || height == 0 {
        return None;
    }
    let (x0, y0, x1, y1) = bbox.edges();
    let to_px = |v: f64, size: u32| (v * size as f64).round().clamp(0.0, (size - 1) as f64) as u32;
    Some((
        to_px(x0, width),
        to_px(y0, height),
        to_px(x1, width),
        to_px(y1, height),
    ))
}

fn draw_rect(img: &mut RgbImage, rect: (u32, u32, u32, u32), color: Rgb<u8>, thickness: u32) {
    let (x0, y0, x1, y1) = rect;
    for t in 0..thickness {
        let (xx0, yy0) = (x0 + t, y0 + t);
        let (xx1, yy1) = (x1.saturating_sub(t), y1.saturating_sub(t));
        if xx0 > xx1 || yy0 > yy1 {
            break;
        }
        for x in xx0..=xx1 {
            img.put_pixel(x, yy0, color);
            img.put_pixel(x, yy1, color);
        }
        for y in yy0..=yy1 {
            img.put_pixel(xx0, y, color);
            img.put_pixel(xx1, y, color);
        }
    }
}

fn fill_rect(img: &mut RgbImage, rect: (u32, u32, u32, u32), color: Rgb<u8>) {
    let (x0, y0, x1, y1) = rect;
    for y in y0..=y1.min(img.height() - 1) {
        for x in x0..=x1.min(img.width() - 1) {
            img.put_pixel(x, y, color);
        }
    }
}

/// Draws every label onto `img`. Returns the number of boxes drawn.
pub fn draw_labels(img: &mut RgbImage, labels: &[LabelLine]) -> usize {
    let (width, height) = img.dimensions();
    let mut drawn = 0;
    for label in labels {
        let Some(rect) = pixel_rect(&label.bbox, width, height) else {
            continue;
        };
        let color = class_color(label.class_id);
        draw_rect(img, rect, color, BOX_THICKNESS);

        let (x0, y0, _, _) = rect;
        if y0 >= TAG_SIZE {
            fill_rect(img, (x0, y0 - TAG_SIZE, x0 + TAG_SIZE - 1, y0 - 1), color);
        }
        drawn += 1;
    }
    drawn
}

/// Frames the whole image in red.
pub fn mark_unlabeled(img: &mut RgbImage) {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    draw_rect(img, (0, 0, width - 1, height - 1), UNLABELED_COLOR, BOX_THICKNESS);
}

/// Stem → split name, from the split lists present under `root`.
fn split_membership(root: &Path) -> Result<BTreeMap<String, &'static str>, IoError> {
    let mut membership = BTreeMap::new();
    for split in Split::ALL {
        let list = root.join(format!("{}.txt", split.name()));
        if !list.is_file() {
            continue;
        }
        let text = fs::read_to_string(&list).map_err(|e| IoError::io(&list, e))?;
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(stem) = Path::new(line).file_stem().and_then(|s| s.to_str()) {
                membership.insert(stem.to_owned(), split.name());
            }
        }
    }
    Ok(membership)
}

/// Usable label lines of a label file. Missing, non-text and malformed
/// content yields fewer lines, never an error.
fn read_labels(path: &Path) -> Vec<LabelLine> {
    let Some(text) = fs::read(path).ok().and_then(|b| String::from_utf8(b).ok()) else {
        return Vec::new();
    };
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| match parse_label_line(l) {
            Ok(line) => Some(line),
            Err(e) => {
                log::debug!("Visualize: skipping line in '{}': {e}", path.display());
                None
            }
        })
        .collect()
}

fn encode_png(img: &RgbImage, target: &Path) -> Result<Vec<u8>, IoError> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .map_err(|source| IoError::Image {
            path: target.to_path_buf(),
            source,
        })?;
    Ok(bytes)
}

/// Writes annotated copies of up to `limit` images of the dataset under
/// `root`, in file-name order.
pub fn visualize_dataset(root: &Path, limit: Option<usize>) -> Result<VisualizeReport, IoError> {
    let images = files_by_stem(&root.join(IMAGES_DIR), &IMAGE_EXTENSIONS)?;
    let membership = split_membership(root)?;
    let output_dir = root.join(VISUALIZATIONS_DIR);
    let mut report = VisualizeReport {
        output_dir: output_dir.clone(),
        ..Default::default()
    };

    for (stem, image_path) in images.iter().take(limit.unwrap_or(usize::MAX)) {
        let mut img = match image::open(image_path) {
            Ok(decoded) => decoded.into_rgb8(),
            Err(e) => {
                log::warn!("Visualize: cannot decode '{}': {e}", image_path.display());
                report.skipped.push(image_path.clone());
                continue;
            }
        };

        let labels = read_labels(&root.join(LABELS_DIR).join(format!("{stem}.txt")));
        if labels.is_empty() {
            mark_unlabeled(&mut img);
            report.unlabeled += 1;
        } else {
            report.boxes += draw_labels(&mut img, &labels);
        }

        let dir = match membership.get(stem) {
            Some(split) => output_dir.join(split),
            None => output_dir.clone(),
        };
        fs::create_dir_all(&dir).map_err(|e| IoError::io(&dir, e))?;
        let target = dir.join(format!("{stem}_annotated.png"));
        write_atomic(&target, &encode_png(&img, &target)?)?;
        report.written += 1;
    }

    log::info!(
        "Visualize: {} annotated images ({} boxes, {} unlabeled, {} undecodable) in '{}'",
        report.written,
        report.boxes,
        report.unlabeled,
        report.skipped.len(),
        output_dir.display()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(class: u32, x_center: f64, y_center: f64, width: f64, height: f64) -> LabelLine {
        LabelLine {
            class_id: ClassId(class),
            bbox: NormalizedBox {
                x_center,
                y_center,
                width,
                height,
            },
        }
    }

    #[test]
    fn pixel_rect_maps_edges_back_to_pixels() {
        let rect = pixel_rect(&label(0, 0.5, 0.5, 0.25, 0.5).bbox, 16, 12);
        assert_eq!(rect, Some((6, 3, 10, 9)));

        let clamped = pixel_rect(&label(0, 0.5, 0.5, 1.0, 1.0).bbox, 16, 12);
        assert_eq!(clamped, Some((0, 0, 15, 11)));
    }

    #[test]
    fn boxes_are_outlined_in_the_class_color() {
        // --- 1. ARRANGE ---
        let mut img = RgbImage::new(64, 48);
        let labels = [label(2, 0.5, 0.5, 0.5, 0.5)];

        // --- 2. ACT ---
        let drawn = draw_labels(&mut img, &labels);

        // --- 3. ASSERT ---
        let color = class_color(ClassId(2));
        assert_eq!(drawn, 1);
        // Box spans (16, 12) to (48, 36).
        assert_eq!(*img.get_pixel(16, 12), color);
        assert_eq!(*img.get_pixel(48, 36), color);
        assert_eq!(*img.get_pixel(17, 24), color);
        assert_eq!(*img.get_pixel(32, 24), Rgb([0, 0, 0]));
        // Tag above the top-left corner.
        assert_eq!(*img.get_pixel(18, 8), color);
        assert_eq!(*img.get_pixel(30, 8), Rgb([0, 0, 0]));
    }

    #[test]
    fn classes_get_distinct_visible_colors() {
        let colors: Vec<_> = (0..4).map(|c| class_color(ClassId(c))).collect();
        for (i, a) in colors.iter().enumerate() {
            assert!(a.0.iter().all(|&c| c >= 0x40));
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn unlabeled_images_get_a_red_border() {
        let mut img = RgbImage::new(8, 8);
        mark_unlabeled(&mut img);
        assert_eq!(*img.get_pixel(0, 0), UNLABELED_COLOR);
        assert_eq!(*img.get_pixel(7, 4), UNLABELED_COLOR);
        assert_eq!(*img.get_pixel(4, 4), Rgb([0, 0, 0]));
    }
}
