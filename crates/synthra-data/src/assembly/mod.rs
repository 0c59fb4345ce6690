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

//! Dataset assembly: accumulates accepted records and partitions them.
//!
//! Splits are computed from the number of frames actually accepted, never from
//! the requested target, so a run that skipped slots or stopped early still
//! gets exact ratios. Records keep their acceptance order: the first `train`
//! records form the training split, the next `val` the validation split, and
//! the rest the test split.

use std::collections::BTreeMap;
use synthra_core::{ClassId, ClassTable, DatasetManifest, FrameRecord, Split, SplitRatios};
use thiserror::Error;

/// Absorbs representation error in `ratio * total` before flooring, so that
/// `0.15 * 100` counts as 15 and not 14.
const FLOOR_EPSILON: f64 = 1e-9;

/// Errors raised while assembling the dataset.
#[derive(Debug, Error, PartialEq)]
pub enum AssemblyError {
    /// The split ratios are out of range or do not sum to one.
    #[error("invalid split ratios train={train} val={val} test={test}: each must be in [0, 1] and they must sum to 1")]
    InvalidRatios {
        /// Training fraction.
        train: f64,
        /// Validation fraction.
        val: f64,
        /// Test fraction.
        test: f64,
    },
    /// A detection references a class missing from the class table.
    #[error("frame {frame_index} references class {class_id}, which is not in the class table")]
    UnknownClass {
        /// The unknown class.
        class_id: ClassId,
        /// The frame containing the detection.
        frame_index: u64,
    },
    /// A frame reached the assembler without detections.
    #[error("frame {frame_index} has no detections")]
    EmptyRecord {
        /// The offending frame.
        frame_index: u64,
    },
    /// Records were not accepted in increasing index order.
    #[error("frame index {index} accepted after {previous}")]
    OutOfOrder {
        /// Index of the previously accepted record.
        previous: u64,
        /// Index of the rejected record.
        index: u64,
    },
}

/// Number of records per split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitSizes {
    /// Training records.
    pub train: usize,
    /// Validation records.
    pub val: usize,
    /// Test records.
    pub test: usize,
}

impl SplitSizes {
    /// Sum of the three sizes.
    pub fn total(&self) -> usize {
        self.train + self.val + self.test
    }
}

/// Computes floor-based split sizes for `total` records.
///
/// `val = floor(r_val * T)`, `test = floor(r_test * T)` and train takes the
/// remainder, so the sizes always add up to `total`.
pub fn split_sizes(total: usize, ratios: SplitRatios) -> Result<SplitSizes, AssemblyError> {
    if !ratios.is_valid() {
        return Err(AssemblyError::InvalidRatios {
            train: ratios.train,
            val: ratios.val,
            test: ratios.test,
        });
    }

    let portion = |ratio: f64| ((ratio * total as f64) + FLOOR_EPSILON).floor() as usize;
    let val = portion(ratios.val).min(total);
    let test = portion(ratios.test).min(total - val);

    Ok(SplitSizes {
        train: total - val - test,
        val,
        test,
    })
}

/// Accumulates accepted records for the run.
#[derive(Debug)]
pub struct DatasetAssembler {
    ratios: SplitRatios,
    records: Vec<FrameRecord>,
}

impl DatasetAssembler {
    /// Creates an assembler. Fails if the ratios are invalid.
    pub fn new(ratios: SplitRatios) -> Result<Self, AssemblyError> {
        split_sizes(0, ratios)?;
        Ok(Self {
            ratios,
            records: Vec::new(),
        })
    }

    /// Appends an accepted record. Indices must strictly increase.
    pub fn push(&mut self, record: FrameRecord) -> Result<(), AssemblyError> {
        if let Some(last) = self.records.last() {
            if record.index() <= last.index() {
                return Err(AssemblyError::OutOfOrder {
                    previous: last.index(),
                    index: record.index(),
                });
            }
        }
        self.records.push(record);
        Ok(())
    }

    /// Records accepted so far, in acceptance order.
    pub fn records(&self) -> &[FrameRecord] {
        &self.records
    }

    /// Number of records accepted so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// `true` if nothing was accepted.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Checks every class id against `classes`, partitions the records and
    /// builds the manifest.
    pub fn finalize(self, classes: ClassTable) -> Result<DatasetManifest, AssemblyError> {
        for record in &self.records {
            if let Some(unknown) = record
                .detections()
                .iter()
                .map(|d| d.class_id())
                .find(|id| !classes.contains(*id))
            {
                return Err(AssemblyError::UnknownClass {
                    class_id: unknown,
                    frame_index: record.index(),
                });
            }
        }

        let sizes = split_sizes(self.records.len(), self.ratios)?;
        log::info!(
            "DatasetAssembler: {} records -> train {}, val {}, test {}",
            self.records.len(),
            sizes.train,
            sizes.val,
            sizes.test
        );

        let mut records = self.records.into_iter();
        let mut splits = BTreeMap::new();
        for (split, size) in [
            (Split::Train, sizes.train),
            (Split::Val, sizes.val),
            (Split::Test, sizes.test),
        ] {
            splits.insert(split, records.by_ref().take(size).collect::<Vec<_>>());
        }

        Ok(DatasetManifest::new(splits, classes))
    }
}
