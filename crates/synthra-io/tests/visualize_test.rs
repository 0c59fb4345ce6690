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
use std::path::{Path, PathBuf};
use synthra_core::{
    ClassId, ClassTable, ColorImage, DatasetManifest, Detection, FrameBuffers, FrameRecord,
    FrameSink, InstanceAttributeTable, InstanceMap, NormalizedBox, Split,
};
use synthra_io::visualize::class_color;
use synthra_io::{visualize_dataset, DatasetWriter, WriterOptions, VISUALIZATIONS_DIR};

fn frame() -> FrameBuffers {
    FrameBuffers::new(
        ColorImage::new(16, 12),
        InstanceMap::new(16, 12),
        InstanceAttributeTable::new(),
    )
}

fn detection(class: u32) -> Detection {
    let bbox = NormalizedBox {
        x_center: 0.5,
        y_center: 0.5,
        width: 0.25,
        height: 0.5,
    };
    Detection::new(ClassId(class), bbox, 1).unwrap()
}

fn write_dataset(root: &Path, options: WriterOptions) {
    let mut writer = DatasetWriter::create(root, options).unwrap();
    let paths: Vec<PathBuf> = (0..3)
        .map(|i| writer.persist(i, &frame(), &[detection(1)]).unwrap())
        .collect();

    let mut records = paths
        .into_iter()
        .enumerate()
        .map(|(i, p)| FrameRecord::new(i as u64, p, vec![detection(1)]).unwrap());
    let mut splits = BTreeMap::new();
    splits.insert(Split::Train, records.by_ref().take(2).collect());
    splits.insert(Split::Val, records.collect());
    writer
        .finish(&DatasetManifest::new(
            splits,
            ClassTable::from_names(["cable", "plug"]),
        ))
        .unwrap();
}

#[test]
fn annotated_copies_follow_the_split_lists() {
    // --- 1. ARRANGE ---
    let root = tempfile::tempdir().unwrap();
    write_dataset(root.path(), WriterOptions::default());

    // --- 2. ACT ---
    let report = visualize_dataset(root.path(), None).unwrap();

    // --- 3. ASSERT ---
    let out = root.path().join(VISUALIZATIONS_DIR);
    assert_eq!(report.output_dir, out);
    assert_eq!(report.written, 3);
    assert_eq!(report.boxes, 3);
    assert_eq!(report.unlabeled, 0);
    assert!(out.join("train/frame_000000_annotated.png").is_file());
    assert!(out.join("train/frame_000001_annotated.png").is_file());
    assert!(out.join("val/frame_000002_annotated.png").is_file());

    let annotated = image::open(out.join("train/frame_000000_annotated.png"))
        .unwrap()
        .to_rgb8();
    assert_eq!(annotated.dimensions(), (16, 12));
    // Box of the label spans (6, 3) to (10, 9).
    assert_eq!(*annotated.get_pixel(6, 3), class_color(ClassId(1)));
    assert_eq!(*annotated.get_pixel(10, 9), class_color(ClassId(1)));
    assert_eq!(annotated.get_pixel(8, 6).0, [0, 0, 0]);
}

#[test]
fn preview_datasets_and_bad_labels_are_handled() {
    // --- 1. ARRANGE ---
    let root = tempfile::tempdir().unwrap();
    let options = WriterOptions {
        write_split_lists: false,
        ..Default::default()
    };
    write_dataset(root.path(), options);
    let labels = root.path().join("labels");
    fs::write(labels.join("frame_000001.txt"), "not a label\n").unwrap();
    fs::remove_file(labels.join("frame_000002.txt")).unwrap();

    // --- 2. ACT ---
    let report = visualize_dataset(root.path(), Some(2)).unwrap();

    // --- 3. ASSERT ---
    let out = root.path().join(VISUALIZATIONS_DIR);
    assert_eq!(report.written, 2);
    assert_eq!(report.boxes, 1);
    assert_eq!(report.unlabeled, 1);
    assert!(out.join("frame_000000_annotated.png").is_file());
    assert!(out.join("frame_000001_annotated.png").is_file());
    assert!(!out.join("frame_000002_annotated.png").exists());

    let unlabeled = image::open(out.join("frame_000001_annotated.png"))
        .unwrap()
        .to_rgb8();
    assert_eq!(unlabeled.get_pixel(0, 0).0, [255, 0, 0]);
}

#[test]
fn undecodable_images_are_skipped() {
    let root = tempfile::tempdir().unwrap();
    write_dataset(root.path(), WriterOptions::default());
    fs::write(root.path().join("images/frame_000001.png"), b"not a png").unwrap();

    let report = visualize_dataset(root.path(), None).unwrap();

    assert_eq!(report.written, 2);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].ends_with("frame_000001.png"));
}
