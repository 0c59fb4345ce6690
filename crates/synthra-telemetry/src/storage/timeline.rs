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

//! Append-only storage for the run's resource samples and cleanup events.

use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use synthra_core::{CleanupAction, ResourceSample};
use thiserror::Error;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Errors raised by the timeline.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimelineError {
    /// A sample did not advance the frame count.
    #[error("sample at frame {found} does not follow the last sample at frame {last}")]
    NotIncreasing {
        /// Frame count of the last stored sample.
        last: u64,
        /// Frame count of the rejected sample.
        found: u64,
    },
}

/// One executed checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupEvent {
    /// Accepted frames when the checkpoint ran.
    pub frame_count: u64,
    /// The decided action.
    pub action: CleanupAction,
    /// Memory before cleanup.
    pub memory_before: u64,
    /// Memory after cleanup.
    pub memory_after: u64,
    /// Growth since the previous checkpoint, in bytes.
    pub growth_since_checkpoint: i64,
    /// Growth since the run started, in bytes.
    pub growth_since_start: i64,
    /// Bytes freed by releasing retained buffers.
    pub bytes_released: u64,
    /// Engine objects freed by collection passes and orphan purging.
    pub objects_freed: u64,
}

/// The run's resource history.
///
/// Samples are strictly ordered by frame count and never revised; the only
/// mutation is [`push`](ResourceTimeline::push). Cleanup events are kept in a
/// separate list so that a post-cleanup reading at the same frame count does
/// not break that ordering.
#[derive(Debug, Clone, Default)]
pub struct ResourceTimeline {
    samples: Vec<ResourceSample>,
    events: Vec<CleanupEvent>,
}

impl ResourceTimeline {
    /// Creates an empty timeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sample. Rejects samples that do not advance the frame count.
    pub fn push(&mut self, sample: ResourceSample) -> Result<(), TimelineError> {
        if let Some(last) = self.samples.last() {
            if sample.frame_count <= last.frame_count {
                return Err(TimelineError::NotIncreasing {
                    last: last.frame_count,
                    found: sample.frame_count,
                });
            }
        }
        self.samples.push(sample);
        Ok(())
    }

    /// Appends a cleanup event.
    pub fn push_event(&mut self, event: CleanupEvent) {
        self.events.push(event);
    }

    /// All samples, in frame order.
    pub fn samples(&self) -> &[ResourceSample] {
        &self.samples
    }

    /// All cleanup events, in execution order.
    pub fn events(&self) -> &[CleanupEvent] {
        &self.events
    }

    /// The first sample.
    pub fn first(&self) -> Option<&ResourceSample> {
        self.samples.first()
    }

    /// The latest sample.
    pub fn last(&self) -> Option<&ResourceSample> {
        self.samples.last()
    }

    /// Highest memory reading seen in samples or cleanup events.
    pub fn peak_memory(&self) -> u64 {
        let sampled = self.samples.iter().map(|s| s.memory_bytes);
        let cleaned = self
            .events
            .iter()
            .flat_map(|e| [e.memory_before, e.memory_after]);
        sampled.chain(cleaned).max().unwrap_or(0)
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// `true` if nothing was sampled.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Writes the samples as CSV, header first.
    pub fn write_samples_csv<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(
            out,
            "frame_count,elapsed_ms,memory_bytes,memory_mb,meshes,materials,textures,images"
        )?;
        for s in &self.samples {
            writeln!(
                out,
                "{},{},{},{:.2},{},{},{},{}",
                s.frame_count,
                s.elapsed_ms,
                s.memory_bytes,
                s.memory_bytes as f64 / BYTES_PER_MB,
                s.resources.meshes,
                s.resources.materials,
                s.resources.textures,
                s.resources.images
            )?;
        }
        out.flush()
    }

    /// Writes the cleanup events as CSV, header first.
    pub fn write_events_csv<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(
            out,
            "frame_count,action,memory_before_bytes,memory_after_bytes,\
             growth_since_checkpoint_bytes,growth_since_start_bytes,bytes_released,objects_freed"
        )?;
        for e in &self.events {
            writeln!(
                out,
                "{},{},{},{},{},{},{},{}",
                e.frame_count,
                e.action,
                e.memory_before,
                e.memory_after,
                e.growth_since_checkpoint,
                e.growth_since_start,
                e.bytes_released,
                e.objects_freed
            )?;
        }
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synthra_core::EngineResourceCounts;

    fn sample(frame_count: u64, memory_bytes: u64) -> ResourceSample {
        ResourceSample {
            frame_count,
            memory_bytes,
            resources: EngineResourceCounts::default(),
            elapsed_ms: frame_count * 10,
        }
    }

    #[test]
    fn frame_counts_must_strictly_increase() {
        let mut timeline = ResourceTimeline::new();
        timeline.push(sample(0, 100)).unwrap();
        timeline.push(sample(10, 120)).unwrap();
        assert_eq!(
            timeline.push(sample(10, 90)),
            Err(TimelineError::NotIncreasing {
                last: 10,
                found: 10
            })
        );
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.last().map(|s| s.memory_bytes), Some(120));
    }

    #[test]
    fn peak_covers_samples_and_events() {
        let mut timeline = ResourceTimeline::new();
        timeline.push(sample(0, 100)).unwrap();
        timeline.push(sample(5, 300)).unwrap();
        assert_eq!(timeline.peak_memory(), 300);

        timeline.push_event(CleanupEvent {
            frame_count: 5,
            action: CleanupAction::Standard,
            memory_before: 350,
            memory_after: 200,
            growth_since_checkpoint: 250,
            growth_since_start: 250,
            bytes_released: 150,
            objects_freed: 2,
        });
        assert_eq!(timeline.peak_memory(), 350);
    }

    #[test]
    fn samples_csv_has_one_row_per_sample() {
        let mut timeline = ResourceTimeline::new();
        timeline.push(sample(0, 1024 * 1024)).unwrap();
        timeline.push(sample(10, 2 * 1024 * 1024)).unwrap();

        let mut buf = Vec::new();
        timeline.write_samples_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("frame_count,"));
        assert_eq!(lines[1], "0,0,1048576,1.00,0,0,0,0");
        assert_eq!(lines[2], "10,100,2097152,2.00,0,0,0,0");
    }
}
