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

//! Accepted frames and the dataset they form.

use crate::annotation::{ClassId, Detection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// A persisted, accepted frame.
///
/// Constructed only through [`FrameRecord::new`], which refuses an empty
/// detection list, and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    index: u64,
    image_path: PathBuf,
    detections: Vec<Detection>,
}

impl FrameRecord {
    /// Creates a record. Returns `None` when `detections` is empty.
    pub fn new(index: u64, image_path: PathBuf, detections: Vec<Detection>) -> Option<Self> {
        if detections.is_empty() {
            return None;
        }
        Some(Self {
            index,
            image_path,
            detections,
        })
    }

    /// Position of the frame in acceptance order.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Image path relative to the dataset root.
    pub fn image_path(&self) -> &Path {
        &self.image_path
    }

    /// Detections, in extraction order.
    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }
}

/// A dataset partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    /// Training partition.
    Train,
    /// Validation partition.
    Val,
    /// Test partition.
    Test,
}

impl Split {
    /// Every split, in file order.
    pub const ALL: [Split; 3] = [Split::Train, Split::Val, Split::Test];

    /// The split name used for file names and manifests.
    pub fn name(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
            Split::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fractions of the accepted frames that go to each split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitRatios {
    /// Training fraction. The training split also takes the rounding remainder.
    pub train: f64,
    /// Validation fraction.
    pub val: f64,
    /// Test fraction.
    pub test: f64,
}

impl SplitRatios {
    /// Allowed deviation of the ratio sum from `1.0`.
    pub const SUM_TOLERANCE: f64 = 0.01;

    /// Creates a set of ratios.
    pub fn new(train: f64, val: f64, test: f64) -> Self {
        Self { train, val, test }
    }

    /// Sum of the three fractions.
    pub fn sum(&self) -> f64 {
        self.train + self.val + self.test
    }

    /// `true` when every fraction lies in `[0, 1]` and they sum to one within
    /// [`SUM_TOLERANCE`](Self::SUM_TOLERANCE).
    pub fn is_valid(&self) -> bool {
        let in_range = |r: f64| r.is_finite() && (0.0..=1.0).contains(&r);
        in_range(self.train)
            && in_range(self.val)
            && in_range(self.test)
            && (self.sum() - 1.0).abs() <= Self::SUM_TOLERANCE
    }
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self::new(0.70, 0.15, 0.15)
    }
}

/// Class id → class name table, ordered by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassTable {
    classes: BTreeMap<ClassId, String>,
}

impl ClassTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns ids `0..n` to the names in order.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            classes: names
                .into_iter()
                .enumerate()
                .map(|(id, name)| (ClassId(id as u32), name.into()))
                .collect(),
        }
    }

    /// Adds or renames a class.
    pub fn insert(&mut self, id: ClassId, name: impl Into<String>) {
        self.classes.insert(id, name.into());
    }

    /// `true` if the id is known.
    pub fn contains(&self, id: ClassId) -> bool {
        self.classes.contains_key(&id)
    }

    /// The name of a class.
    pub fn name(&self, id: ClassId) -> Option<&str> {
        self.classes.get(&id).map(String::as_str)
    }

    /// `(id, name)` pairs in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (ClassId, &str)> {
        self.classes.iter().map(|(id, name)| (*id, name.as_str()))
    }

    /// Names in ascending id order.
    pub fn names_in_order(&self) -> Vec<&str> {
        self.classes.values().map(String::as_str).collect()
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// `true` if the table has no class.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// The finished dataset: split → ordered records, plus the class table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetManifest {
    splits: BTreeMap<Split, Vec<FrameRecord>>,
    classes: ClassTable,
}

impl DatasetManifest {
    /// Assembles a manifest. Every split is present, possibly empty.
    pub fn new(mut splits: BTreeMap<Split, Vec<FrameRecord>>, classes: ClassTable) -> Self {
        for split in Split::ALL {
            splits.entry(split).or_default();
        }
        Self { splits, classes }
    }

    /// Records of one split, in acceptance order.
    pub fn split(&self, split: Split) -> &[FrameRecord] {
        self.splits.get(&split).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The class table.
    pub fn classes(&self) -> &ClassTable {
        &self.classes
    }

    /// Total records over all splits.
    pub fn total(&self) -> usize {
        self.splits.values().map(Vec::len).sum()
    }

    /// Relative image paths of one split.
    pub fn relative_paths(&self, split: Split) -> Vec<&Path> {
        self.split(split).iter().map(FrameRecord::image_path).collect()
    }

    /// Every record, train first, then val, then test.
    pub fn records(&self) -> impl Iterator<Item = (Split, &FrameRecord)> {
        self.splits
            .iter()
            .flat_map(|(split, records)| records.iter().map(move |r| (*split, r)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::NormalizedBox;

    fn detection() -> Detection {
        let bbox = NormalizedBox {
            x_center: 0.5,
            y_center: 0.5,
            width: 0.2,
            height: 0.2,
        };
        Detection::new(ClassId(0), bbox, 1).unwrap()
    }

    #[test]
    fn record_requires_detections() {
        assert!(FrameRecord::new(0, PathBuf::from("images/a.png"), vec![]).is_none());
        let record = FrameRecord::new(3, PathBuf::from("images/a.png"), vec![detection()]).unwrap();
        assert_eq!(record.index(), 3);
        assert_eq!(record.detections().len(), 1);
    }

    #[test]
    fn ratios_must_sum_to_one() {
        assert!(SplitRatios::default().is_valid());
        assert!(SplitRatios::new(0.7, 0.15, 0.145).is_valid());
        assert!(!SplitRatios::new(0.7, 0.2, 0.2).is_valid());
        assert!(!SplitRatios::new(1.2, -0.1, -0.1).is_valid());
    }

    #[test]
    fn class_table_orders_by_id() {
        let mut table = ClassTable::from_names(["cable", "connector"]);
        table.insert(ClassId(5), "device");
        assert_eq!(table.names_in_order(), vec!["cable", "connector", "device"]);
        assert_eq!(table.name(ClassId(1)), Some("connector"));
        assert!(!table.contains(ClassId(2)));
    }

    #[test]
    fn manifest_always_has_every_split() {
        let manifest = DatasetManifest::new(BTreeMap::new(), ClassTable::new());
        for split in Split::ALL {
            assert!(manifest.split(split).is_empty());
        }
        assert_eq!(manifest.total(), 0);
    }
}
