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

//! Primitive shapes and their rasterization helpers.

use synthra_core::{ClassId, InstanceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShapeKind {
    Rectangle,
    Ellipse,
}

/// One object of a procedural scene, in pixel space.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlacedObject {
    pub instance: InstanceId,
    pub class_id: ClassId,
    pub kind: ShapeKind,
    pub center: (f32, f32),
    pub half_extent: (f32, f32),
    /// Distance to the camera. Smaller wins the z-test.
    pub depth: f32,
    pub color: [u8; 3],
    /// Culled objects exist in the scene but never reach the frame.
    pub culled: bool,
}

impl PlacedObject {
    /// Whether the point, in pixel-center coordinates, lies inside the shape.
    pub fn covers(&self, px: f32, py: f32) -> bool {
        let dx = (px - self.center.0) / self.half_extent.0;
        let dy = (py - self.center.1) / self.half_extent.1;
        match self.kind {
            ShapeKind::Rectangle => dx.abs() <= 1.0 && dy.abs() <= 1.0,
            ShapeKind::Ellipse => dx * dx + dy * dy <= 1.0,
        }
    }

    /// Surface normal at a covered point. Ellipses are shaded as domes.
    pub fn normal_at(&self, px: f32, py: f32) -> [f32; 3] {
        match self.kind {
            ShapeKind::Rectangle => [0.0, 0.0, 1.0],
            ShapeKind::Ellipse => {
                let dx = (px - self.center.0) / self.half_extent.0;
                let dy = (py - self.center.1) / self.half_extent.1;
                let dz = (1.0 - dx * dx - dy * dy).max(0.0).sqrt();
                let len = (dx * dx + dy * dy + dz * dz).sqrt().max(f32::EPSILON);
                [dx / len, dy / len, dz / len]
            }
        }
    }

    /// Analytic area of the full shape, ignoring clipping and occlusion.
    pub fn area(&self) -> f32 {
        let full = 4.0 * self.half_extent.0 * self.half_extent.1;
        match self.kind {
            ShapeKind::Rectangle => full,
            ShapeKind::Ellipse => full * std::f32::consts::FRAC_PI_4,
        }
    }

    /// Pixel rows and columns the shape may touch, clipped to the image.
    /// `None` when the shape lies entirely outside.
    pub fn pixel_span(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let clip = |lo: f32, hi: f32, max: u32| -> Option<(u32, u32)> {
            let start = lo.floor().max(0.0);
            let end = hi.ceil().min(max as f32);
            (end > start).then(|| (start as u32, end as u32))
        };
        let (x0, x1) = clip(
            self.center.0 - self.half_extent.0,
            self.center.0 + self.half_extent.0,
            width,
        )?;
        let (y0, y1) = clip(
            self.center.1 - self.half_extent.1,
            self.center.1 + self.half_extent.1,
            height,
        )?;
        Some((x0, x1, y0, y1))
    }
}

/// Lambert-ish shading of a base color under a light facing the camera.
pub(crate) fn shade(color: [u8; 3], normal: [f32; 3]) -> [u8; 3] {
    let intensity = 0.35 + 0.65 * normal[2].clamp(0.0, 1.0);
    color.map(|c| (c as f32 * intensity).round().clamp(0.0, 255.0) as u8)
}
