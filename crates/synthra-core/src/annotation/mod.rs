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

//! Detection records and the box geometry they carry.
//!
//! Boxes start life as a [`PixelBox`] accumulated over an instance's pixels and
//! are converted once into a [`NormalizedBox`] in YOLO layout. A [`Detection`]
//! can only be built from a box that satisfies the dataset invariants, so every
//! value of that type is safe to persist.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an object instance inside one segmentation map. `0` is background.
pub type InstanceId = u32;

/// The background value of an instance segmentation map.
pub const BACKGROUND_INSTANCE: InstanceId = 0;

/// Tolerance used when checking that box edges stay inside the unit square.
const EDGE_EPSILON: f64 = 1e-9;
const STEP_EPSILON: f64 = 1e-6;
const MAX_DECIMALS: usize = 15;

/// A semantic class identifier, stable across the whole dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(pub u32);

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tight pixel-space bounds of an instance. Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBox {
    /// Leftmost column covered by the instance.
    pub min_x: u32,
    /// Topmost row covered by the instance.
    pub min_y: u32,
    /// Rightmost column covered by the instance.
    pub max_x: u32,
    /// Bottom row covered by the instance.
    pub max_y: u32,
}

impl PixelBox {
    /// Creates a box covering a single pixel.
    pub fn point(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    /// Grows the box so it covers `(x, y)`.
    pub fn include(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// A box is degenerate when it spans a single row or a single column.
    pub fn is_degenerate(&self) -> bool {
        self.max_x <= self.min_x || self.max_y <= self.min_y
    }

    /// Converts the pixel box into a normalized YOLO box for an image of the given size.
    ///
    /// `x_center = (min_x + max_x) / 2 / width` and `width = (max_x - min_x) / width`,
    /// with the same construction on the vertical axis. Every component is clamped to
    /// `[0, 1]` to absorb rounding at the image border. Returns `None` for degenerate
    /// boxes or a zero-sized image, since those cannot produce a box with positive extent.
    pub fn normalize(&self, image_width: u32, image_height: u32) -> Option<NormalizedBox> {
        if image_width == 0 || image_height == 0 || self.is_degenerate() {
            return None;
        }

        let w = image_width as f64;
        let h = image_height as f64;

        let bbox = NormalizedBox {
            x_center: ((self.min_x as f64 + self.max_x as f64) / 2.0 / w).clamp(0.0, 1.0),
            y_center: ((self.min_y as f64 + self.max_y as f64) / 2.0 / h).clamp(0.0, 1.0),
            width: ((self.max_x - self.min_x) as f64 / w).clamp(0.0, 1.0),
            height: ((self.max_y - self.min_y) as f64 / h).clamp(0.0, 1.0),
        };

        bbox.is_valid().then_some(bbox)
    }
}

/// A YOLO-style box: center and extent, all as fractions of the image size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBox {
    /// Horizontal center, in `[0, 1]`.
    pub x_center: f64,
    /// Vertical center, in `[0, 1]`.
    pub y_center: f64,
    /// Width, in `(0, 1]`.
    pub width: f64,
    /// Height, in `(0, 1]`.
    pub height: f64,
}

impl NormalizedBox {
    /// Returns the box as `(x_min, y_min, x_max, y_max)` in normalized coordinates.
    pub fn edges(&self) -> (f64, f64, f64, f64) {
        (
            self.x_center - self.width / 2.0,
            self.y_center - self.height / 2.0,
            self.x_center + self.width / 2.0,
            self.y_center + self.height / 2.0,
        )
    }

    /// Checks the dataset box invariant: positive extent, every component in
    /// `[0, 1]`, and all four edges inside the unit square.
    pub fn is_valid(&self) -> bool {
        let components = [self.x_center, self.y_center, self.width, self.height];
        if components
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0 || *v > 1.0)
        {
            return false;
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return false;
        }
        let (x0, y0, x1, y1) = self.edges();
        x0 >= -EDGE_EPSILON && y0 >= -EDGE_EPSILON && x1 <= 1.0 + EDGE_EPSILON && y1 <= 1.0 + EDGE_EPSILON
    }

    /// Rounds the box to `precision` decimals, the way label files store it.
    ///
    /// Centers round to the nearest step. Extents round too, then shrink by whole
    /// steps where rounding would push an edge outside the unit square. Returns
    /// `None` when an extent rounds to zero.
    pub fn quantized(&self, precision: usize) -> Option<NormalizedBox> {
        let scale = 10f64.powi(precision.min(MAX_DECIMALS) as i32);
        let fit = |center: f64, extent: f64| {
            let steps_center = (center * scale).round();
            let room = (2.0 * steps_center.min(scale - steps_center) + STEP_EPSILON).floor();
            let steps_extent = (extent * scale).round().min(room);
            (steps_center / scale, steps_extent / scale)
        };

        let (x_center, width) = fit(self.x_center, self.width);
        let (y_center, height) = fit(self.y_center, self.height);
        let bbox = NormalizedBox {
            x_center,
            y_center,
            width,
            height,
        };
        bbox.is_valid().then_some(bbox)
    }
}

/// One object's annotation for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    class_id: ClassId,
    bbox: NormalizedBox,
    instance_id: InstanceId,
}

impl Detection {
    /// Builds a detection, rejecting boxes that violate the box invariant.
    pub fn new(class_id: ClassId, bbox: NormalizedBox, instance_id: InstanceId) -> Option<Self> {
        bbox.is_valid().then_some(Self {
            class_id,
            bbox,
            instance_id,
        })
    }

    /// The semantic class of the object.
    pub fn class_id(&self) -> ClassId {
        self.class_id
    }

    /// The normalized bounding box.
    pub fn bbox(&self) -> &NormalizedBox {
        &self.bbox
    }

    /// The segmentation instance this detection was extracted from.
    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    /// Formats the detection as one YOLO label line:
    /// `<class_id> <x_center> <y_center> <width> <height>`.
    ///
    /// The written box is [`NormalizedBox::quantized`], so it parses back into a
    /// valid box. Returns `None` when the box does not survive the rounding.
    pub fn to_label_line(&self, precision: usize) -> Option<String> {
        let bbox = self.bbox.quantized(precision)?;
        Some(format!(
            "{} {:.p$} {:.p$} {:.p$} {:.p$}",
            self.class_id,
            bbox.x_center,
            bbox.y_center,
            bbox.width,
            bbox.height,
            p = precision.min(MAX_DECIMALS)
        ))
    }
}
