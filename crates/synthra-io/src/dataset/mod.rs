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

//! Dataset persistence.

mod atomic;
mod manifest;
mod writer;

pub use atomic::write_atomic;
pub use manifest::ManifestFile;
pub use writer::{DatasetWriter, WriterOptions};

/// Directory holding the color images, relative to the dataset root.
pub const IMAGES_DIR: &str = "images";
/// Directory holding the label files, relative to the dataset root.
pub const LABELS_DIR: &str = "labels";
/// Class-name list, one name per line in id order.
pub const CLASSES_FILE: &str = "classes.txt";
/// Split and class manifest.
pub const MANIFEST_FILE: &str = "manifest.json";

/// File stem shared by the image and the label of a frame.
pub fn frame_stem(frame_index: u64) -> String {
    format!("frame_{frame_index:06}")
}
