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

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use synthra_core::{DatasetManifest, Split};

/// One entry of the class list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassEntry {
    /// Class id.
    pub id: u32,
    /// Class name.
    pub name: String,
}

/// On-disk form of `manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    /// Number of frames across all splits.
    pub total: usize,
    /// Classes in id order.
    pub classes: Vec<ClassEntry>,
    /// Split name → image paths relative to the dataset root, forward slashes.
    pub splits: BTreeMap<String, Vec<String>>,
}

impl From<&DatasetManifest> for ManifestFile {
    fn from(manifest: &DatasetManifest) -> Self {
        Self {
            total: manifest.total(),
            classes: manifest
                .classes()
                .iter()
                .map(|(id, name)| ClassEntry {
                    id: id.0,
                    name: name.to_owned(),
                })
                .collect(),
            splits: Split::ALL
                .iter()
                .map(|split| {
                    let paths = manifest
                        .relative_paths(*split)
                        .into_iter()
                        .map(portable)
                        .collect();
                    (split.name().to_owned(), paths)
                })
                .collect(),
        }
    }
}

/// Joins path components with `/` regardless of platform.
pub(crate) fn portable(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
