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

//! Bounding-box extraction from an instance segmentation map.

use std::collections::BTreeMap;
use synthra_core::annotation::BACKGROUND_INSTANCE;
use synthra_core::lane::{AnnotationLane, LaneKind};
use synthra_core::{AnnotationSettings, Detection, FrameBuffers, InstanceId, PixelBox};

/// Pixel statistics gathered for one instance.
#[derive(Debug, Clone, Copy)]
struct InstanceExtent {
    bounds: PixelBox,
    pixels: u32,
}

/// Extracts one tight box per visible, classified instance.
///
/// A single pass over the segmentation map accumulates each nonzero id's
/// pixel count and bounds. Instances are then filtered in this order:
///
/// 1. fewer than `min_visible_pixels` pixels;
/// 2. no class in the attribute table;
/// 3. attribute-table visibility below `min_visibility` (only when present);
/// 4. a degenerate box, one pixel wide or tall.
///
/// Survivors come out in ascending instance id.
#[derive(Debug, Clone, Copy)]
pub struct MaskBoundsLane {
    min_visible_pixels: u32,
    min_visibility: f32,
}

impl MaskBoundsLane {
    /// Creates a lane with the given thresholds.
    pub fn new(settings: AnnotationSettings) -> Self {
        Self {
            min_visible_pixels: settings.min_visible_pixels,
            min_visibility: settings.min_visibility,
        }
    }

    /// The pixel threshold.
    pub fn min_visible_pixels(&self) -> u32 {
        self.min_visible_pixels
    }

    fn measure(frame: &FrameBuffers) -> BTreeMap<InstanceId, InstanceExtent> {
        let mut extents: BTreeMap<InstanceId, InstanceExtent> = BTreeMap::new();

        for (y, row) in frame.instances.rows().enumerate() {
            let y = y as u32;
            let mut x = 0u32;
            // Consecutive pixels of one id are folded into a single map update.
            for run in row.chunk_by(|a, b| a == b) {
                let id = run[0];
                let len = run.len() as u32;
                if id != BACKGROUND_INSTANCE {
                    let last = x + len - 1;
                    extents
                        .entry(id)
                        .and_modify(|e| {
                            e.bounds.include(x, y);
                            e.bounds.include(last, y);
                            e.pixels += len;
                        })
                        .or_insert_with(|| {
                            let mut bounds = PixelBox::point(x, y);
                            bounds.include(last, y);
                            InstanceExtent {
                                bounds,
                                pixels: len,
                            }
                        });
                }
                x += len;
            }
        }

        extents
    }
}

impl Default for MaskBoundsLane {
    fn default() -> Self {
        Self::new(AnnotationSettings::default())
    }
}

impl synthra_core::lane::Lane for MaskBoundsLane {
    fn strategy_name(&self) -> &'static str {
        "MaskBounds"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Annotation
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl AnnotationLane for MaskBoundsLane {
    fn extract(&self, frame: &FrameBuffers) -> Vec<Detection> {
        let (width, height) = frame.resolution();

        Self::measure(frame)
            .into_iter()
            .filter_map(|(id, extent)| {
                if extent.pixels < self.min_visible_pixels {
                    log::trace!(
                        "MaskBounds: instance {id} below pixel threshold ({} < {})",
                        extent.pixels,
                        self.min_visible_pixels
                    );
                    return None;
                }

                let attributes = frame.attributes.get(id)?;
                let class_id = attributes.class_id?;
                if let Some(visibility) = attributes.visibility {
                    if visibility < self.min_visibility {
                        return None;
                    }
                }

                let bbox = extent.bounds.normalize(width, height)?;
                Detection::new(class_id, bbox, id)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use synthra_core::{
        ClassId, ColorImage, InstanceAttributeTable, InstanceAttributes, InstanceMap,
    };

    fn frame_with(map: InstanceMap, attributes: InstanceAttributeTable) -> FrameBuffers {
        let color = ColorImage::new(map.width(), map.height());
        FrameBuffers::new(color, map, attributes)
    }

    fn lane(min_visible_pixels: u32) -> MaskBoundsLane {
        MaskBoundsLane::new(AnnotationSettings {
            min_visible_pixels,
            min_visibility: 0.0,
        })
    }

    #[test]
    fn small_instance_is_dropped_below_threshold() {
        let mut map = InstanceMap::new(64, 64);
        map.fill_rect(4, 4, 10, 8, 1); // 80 px
        map.fill_rect(40, 40, 3, 1, 2); // 3 px
        let attributes = [
            (1, InstanceAttributes::of_class(ClassId(0))),
            (2, InstanceAttributes::of_class(ClassId(1))),
        ]
        .into_iter()
        .collect();

        let detections = lane(10).extract(&frame_with(map, attributes));

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].instance_id(), 1);
        assert_eq!(detections[0].class_id(), ClassId(0));
    }

    #[test]
    fn box_matches_pixel_bounds() {
        let mut map = InstanceMap::new(100, 50);
        map.fill_rect(10, 20, 21, 11, 7); // x 10..=30, y 20..=30
        let attributes = [(7, InstanceAttributes::of_class(ClassId(2)))]
            .into_iter()
            .collect();

        let detections = lane(1).extract(&frame_with(map, attributes));
        let bbox = detections[0].bbox();

        assert_relative_eq!(bbox.x_center, 20.0 / 100.0);
        assert_relative_eq!(bbox.y_center, 25.0 / 50.0);
        assert_relative_eq!(bbox.width, 20.0 / 100.0);
        assert_relative_eq!(bbox.height, 10.0 / 50.0);
    }

    #[test]
    fn empty_map_yields_no_detections() {
        let frame = frame_with(InstanceMap::new(32, 32), InstanceAttributeTable::new());
        assert!(lane(1).extract(&frame).is_empty());
    }

    #[test]
    fn unclassified_instances_are_dropped() {
        let mut map = InstanceMap::new(32, 32);
        map.fill_rect(0, 0, 8, 8, 3);
        map.fill_rect(16, 16, 8, 8, 4);
        let mut attributes = InstanceAttributeTable::new();
        attributes.insert(3, InstanceAttributes::default());

        assert!(lane(1).extract(&frame_with(map, attributes)).is_empty());
    }

    #[test]
    fn single_row_instance_is_degenerate() {
        let mut map = InstanceMap::new(32, 32);
        map.fill_rect(0, 5, 32, 1, 9);
        let attributes = [(9, InstanceAttributes::of_class(ClassId(0)))]
            .into_iter()
            .collect();

        assert!(lane(1).extract(&frame_with(map, attributes)).is_empty());
    }

    #[test]
    fn low_visibility_is_filtered_when_reported() {
        let mut map = InstanceMap::new(32, 32);
        map.fill_rect(0, 0, 8, 8, 1);
        map.fill_rect(16, 16, 8, 8, 2);
        let hidden = InstanceAttributes {
            visibility: Some(0.1),
            ..InstanceAttributes::of_class(ClassId(0))
        };
        let attributes = [
            (1, hidden),
            (2, InstanceAttributes::of_class(ClassId(0))),
        ]
        .into_iter()
        .collect();
        let lane = MaskBoundsLane::new(AnnotationSettings {
            min_visible_pixels: 1,
            min_visibility: 0.5,
        });

        let detections = lane.extract(&frame_with(map, attributes));
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].instance_id(), 2);
    }

    #[test]
    fn output_is_ordered_by_instance_id() {
        let mut map = InstanceMap::new(64, 64);
        map.fill_rect(40, 0, 8, 8, 30);
        map.fill_rect(0, 40, 8, 8, 5);
        map.fill_rect(20, 20, 8, 8, 12);
        let attributes = [5, 12, 30]
            .into_iter()
            .map(|id| (id, InstanceAttributes::of_class(ClassId(0))))
            .collect();
        let frame = frame_with(map, attributes);

        let first = lane(1).extract(&frame);
        let ids: Vec<_> = first.iter().map(|d| d.instance_id()).collect();
        assert_eq!(ids, vec![5, 12, 30]);
        assert_eq!(first, lane(1).extract(&frame));
    }

    #[test]
    fn non_contiguous_instance_gets_one_enclosing_box() {
        let mut map = InstanceMap::new(20, 20);
        map.fill_rect(0, 0, 2, 2, 1);
        map.fill_rect(10, 10, 2, 2, 1);
        let attributes = [(1, InstanceAttributes::of_class(ClassId(0)))]
            .into_iter()
            .collect();

        let detections = lane(1).extract(&frame_with(map, attributes));
        assert_eq!(detections.len(), 1);
        assert_relative_eq!(detections[0].bbox().width, 11.0 / 20.0);
    }
}
