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

//! The per-frame buffer contract between the renderer and the pipeline.
//!
//! A [`FrameBuffers`] value is produced by one render call and owned by exactly one
//! iteration of the generation loop. It is large (several full-resolution arrays),
//! so it is released explicitly through [`FrameBuffers::release`] rather than left
//! to fall out of scope at an arbitrary point.

use crate::annotation::{ClassId, InstanceId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifies one field of a [`FrameBuffers`] value, or the equivalent scratch
/// buffer retained by a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BufferKind {
    /// RGB8 color image.
    Color,
    /// Per-pixel depth.
    Depth,
    /// Per-pixel surface normals.
    Normals,
    /// Instance segmentation map.
    InstanceMap,
    /// Instance attribute table.
    Attributes,
}

impl BufferKind {
    /// Returns a short, stable name for logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            BufferKind::Color => "color",
            BufferKind::Depth => "depth",
            BufferKind::Normals => "normals",
            BufferKind::InstanceMap => "instance_map",
            BufferKind::Attributes => "attributes",
        }
    }
}

/// An error describing a malformed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The frame has a zero width or height.
    ZeroResolution,
    /// A buffer does not hold one element per pixel.
    DimensionMismatch {
        /// The offending buffer.
        buffer: BufferKind,
        /// Number of elements the resolution requires.
        expected: usize,
        /// Number of elements actually present.
        found: usize,
    },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::ZeroResolution => write!(f, "Frame has a zero-sized resolution"),
            FrameError::DimensionMismatch {
                buffer,
                expected,
                found,
            } => write!(
                f,
                "Buffer '{}' holds {found} elements, expected {expected}",
                buffer.as_str()
            ),
        }
    }
}

impl std::error::Error for FrameError {}

/// An 8-bit RGB image stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl ColorImage {
    /// Creates a black image.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 3],
        }
    }

    /// Wraps raw RGB8 bytes. The length is checked by [`FrameBuffers::validate`].
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Writes one pixel. Out-of-range coordinates are ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 3;
        if let Some(slot) = self.pixels.get_mut(offset..offset + 3) {
            slot.copy_from_slice(&rgb);
        }
    }

    /// The raw RGB8 bytes.
    pub fn as_raw(&self) -> &[u8] {
        &self.pixels
    }

    /// Heap bytes held by the image.
    pub fn heap_bytes(&self) -> usize {
        self.pixels.capacity()
    }
}

/// A per-pixel instance id buffer, row-major. `0` is background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceMap {
    width: u32,
    height: u32,
    ids: Vec<InstanceId>,
}

impl InstanceMap {
    /// Creates a map filled with background.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ids: vec![0; width as usize * height as usize],
        }
    }

    /// Wraps raw ids. The length is checked by [`FrameBuffers::validate`].
    pub fn from_raw(width: u32, height: u32, ids: Vec<InstanceId>) -> Self {
        Self { width, height, ids }
    }

    /// Map width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Map height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the id at `(x, y)`, or `None` when out of range.
    pub fn get(&self, x: u32, y: u32) -> Option<InstanceId> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.ids
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Writes the id at `(x, y)`. Out-of-range coordinates are ignored.
    pub fn set(&mut self, x: u32, y: u32, id: InstanceId) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = y as usize * self.width as usize + x as usize;
        if let Some(slot) = self.ids.get_mut(index) {
            *slot = id;
        }
    }

    /// Paints an axis-aligned rectangle, clipped to the map.
    pub fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, id: InstanceId) {
        let x_end = x.saturating_add(width).min(self.width);
        let y_end = y.saturating_add(height).min(self.height);
        for row in y..y_end {
            for col in x..x_end {
                self.set(col, row, id);
            }
        }
    }

    /// Iterates over rows of ids, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[InstanceId]> {
        self.ids.chunks(self.width.max(1) as usize)
    }

    /// The raw id buffer.
    pub fn as_raw(&self) -> &[InstanceId] {
        &self.ids
    }

    /// Heap bytes held by the map.
    pub fn heap_bytes(&self) -> usize {
        self.ids.capacity() * std::mem::size_of::<InstanceId>()
    }
}

/// Metadata the renderer attaches to one instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceAttributes {
    /// The semantic class, if the instance belongs to an annotated object.
    pub class_id: Option<ClassId>,
    /// A human-readable object name, for logs.
    pub name: Option<String>,
    /// Fraction of the object visible from the camera, if the renderer knows it.
    pub visibility: Option<f32>,
}

impl InstanceAttributes {
    /// Attributes of an annotated object of the given class.
    pub fn of_class(class_id: ClassId) -> Self {
        Self {
            class_id: Some(class_id),
            ..Default::default()
        }
    }
}

/// Instance id → attributes lookup for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceAttributeTable {
    entries: BTreeMap<InstanceId, InstanceAttributes>,
}

impl InstanceAttributeTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the attributes for an instance.
    pub fn insert(&mut self, instance: InstanceId, attributes: InstanceAttributes) {
        self.entries.insert(instance, attributes);
    }

    /// Returns the attributes for an instance.
    pub fn get(&self, instance: InstanceId) -> Option<&InstanceAttributes> {
        self.entries.get(&instance)
    }

    /// Resolves the class of an instance, if it has one.
    pub fn class_of(&self, instance: InstanceId) -> Option<ClassId> {
        self.entries.get(&instance).and_then(|a| a.class_id)
    }

    /// Number of instances described.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no instance is described.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rough heap footprint of the table.
    pub fn heap_bytes(&self) -> usize {
        self.entries.len()
            * (std::mem::size_of::<InstanceId>() + std::mem::size_of::<InstanceAttributes>())
    }
}

impl FromIterator<(InstanceId, InstanceAttributes)> for InstanceAttributeTable {
    fn from_iter<T: IntoIterator<Item = (InstanceId, InstanceAttributes)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Everything one render call produces.
#[derive(Debug, Clone)]
pub struct FrameBuffers {
    /// The color image that gets persisted.
    pub color: ColorImage,
    /// Optional depth map, one value per pixel.
    pub depth: Option<Vec<f32>>,
    /// Optional normal map, one vector per pixel.
    pub normals: Option<Vec<[f32; 3]>>,
    /// Instance segmentation map.
    pub instances: InstanceMap,
    /// Instance attribute table.
    pub attributes: InstanceAttributeTable,
}

impl FrameBuffers {
    /// Creates a frame without depth or normals.
    pub fn new(
        color: ColorImage,
        instances: InstanceMap,
        attributes: InstanceAttributeTable,
    ) -> Self {
        Self {
            color,
            depth: None,
            normals: None,
            instances,
            attributes,
        }
    }

    /// Attaches a depth map.
    pub fn with_depth(mut self, depth: Vec<f32>) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Attaches a normal map.
    pub fn with_normals(mut self, normals: Vec<[f32; 3]>) -> Self {
        self.normals = Some(normals);
        self
    }

    /// The image resolution `(width, height)` used for normalization.
    pub fn resolution(&self) -> (u32, u32) {
        (self.instances.width(), self.instances.height())
    }

    /// Checks that every buffer holds exactly one element per pixel.
    pub fn validate(&self) -> Result<(), FrameError> {
        let (width, height) = self.resolution();
        if width == 0 || height == 0 {
            return Err(FrameError::ZeroResolution);
        }
        let pixels = width as usize * height as usize;

        let check = |buffer: BufferKind, expected: usize, found: usize| {
            if expected == found {
                Ok(())
            } else {
                Err(FrameError::DimensionMismatch {
                    buffer,
                    expected,
                    found,
                })
            }
        };

        check(BufferKind::InstanceMap, pixels, self.instances.as_raw().len())?;
        if (self.color.width(), self.color.height()) != (width, height) {
            return Err(FrameError::DimensionMismatch {
                buffer: BufferKind::Color,
                expected: pixels * 3,
                found: self.color.width() as usize * self.color.height() as usize * 3,
            });
        }
        check(BufferKind::Color, pixels * 3, self.color.as_raw().len())?;
        if let Some(depth) = &self.depth {
            check(BufferKind::Depth, pixels, depth.len())?;
        }
        if let Some(normals) = &self.normals {
            check(BufferKind::Normals, pixels, normals.len())?;
        }
        Ok(())
    }

    /// Heap bytes held by each present buffer.
    pub fn buffer_sizes(&self) -> Vec<(BufferKind, usize)> {
        let mut sizes = vec![
            (BufferKind::Color, self.color.heap_bytes()),
            (BufferKind::InstanceMap, self.instances.heap_bytes()),
            (BufferKind::Attributes, self.attributes.heap_bytes()),
        ];
        if let Some(depth) = &self.depth {
            sizes.push((
                BufferKind::Depth,
                depth.capacity() * std::mem::size_of::<f32>(),
            ));
        }
        if let Some(normals) = &self.normals {
            sizes.push((
                BufferKind::Normals,
                normals.capacity() * std::mem::size_of::<[f32; 3]>(),
            ));
        }
        sizes
    }

    /// Total heap bytes held by the frame.
    pub fn byte_size(&self) -> usize {
        self.buffer_sizes().iter().map(|(_, bytes)| bytes).sum()
    }

    /// Releases the frame field by field, largest buffer first.
    ///
    /// Returns the release order together with the number of bytes freed.
    pub fn release(self) -> (Vec<BufferKind>, usize) {
        let order = largest_first(self.buffer_sizes());
        let freed = self.byte_size();

        let FrameBuffers {
            color,
            depth,
            normals,
            instances,
            attributes,
        } = self;
        let mut color = Some(color);
        let mut depth = depth;
        let mut normals = normals;
        let mut instances = Some(instances);
        let mut attributes = Some(attributes);

        for kind in &order {
            match kind {
                BufferKind::Color => drop(color.take()),
                BufferKind::Depth => drop(depth.take()),
                BufferKind::Normals => drop(normals.take()),
                BufferKind::InstanceMap => drop(instances.take()),
                BufferKind::Attributes => drop(attributes.take()),
            }
        }

        log::trace!("FrameBuffers: released {freed} bytes in order {order:?}");
        (order, freed)
    }
}

/// Sorts buffers by size, descending. Ties keep the [`BufferKind`] order so the
/// release sequence is fixed for a given frame layout.
pub fn largest_first(mut sizes: Vec<(BufferKind, usize)>) -> Vec<BufferKind> {
    sizes.sort_by(|(ka, a), (kb, b)| b.cmp(a).then(ka.cmp(kb)));
    sizes.into_iter().map(|(kind, _)| kind).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: u32, height: u32) -> FrameBuffers {
        FrameBuffers::new(
            ColorImage::new(width, height),
            InstanceMap::new(width, height),
            InstanceAttributeTable::new(),
        )
    }

    #[test]
    fn validate_accepts_consistent_buffers() {
        let f = frame(8, 4)
            .with_depth(vec![0.0; 32])
            .with_normals(vec![[0.0, 0.0, 1.0]; 32]);
        assert!(f.validate().is_ok());
    }

    #[test]
    fn validate_reports_short_depth_buffer() {
        let f = frame(8, 4).with_depth(vec![0.0; 31]);
        assert_eq!(
            f.validate(),
            Err(FrameError::DimensionMismatch {
                buffer: BufferKind::Depth,
                expected: 32,
                found: 31,
            })
        );
    }

    #[test]
    fn validate_rejects_zero_resolution() {
        assert_eq!(frame(0, 4).validate(), Err(FrameError::ZeroResolution));
    }

    #[test]
    fn release_goes_largest_first() {
        // normals (12 B/px) > depth (4 B/px) = instance map (4 B/px) > color (3 B/px)
        let f = frame(16, 16)
            .with_depth(vec![0.0; 256])
            .with_normals(vec![[0.0; 3]; 256]);
        let total = f.byte_size();
        let (order, freed) = f.release();
        assert_eq!(freed, total);
        assert_eq!(order[0], BufferKind::Normals);
        assert_eq!(order[1], BufferKind::Depth);
        assert_eq!(order[2], BufferKind::InstanceMap);
        assert_eq!(order[3], BufferKind::Color);
        assert_eq!(order.len(), 5);
    }

    #[test]
    fn fill_rect_is_clipped_to_the_map() {
        let mut map = InstanceMap::new(4, 4);
        map.fill_rect(2, 2, 10, 10, 5);
        let painted = map.as_raw().iter().filter(|id| **id == 5).count();
        assert_eq!(painted, 4);
        assert_eq!(map.get(3, 3), Some(5));
        assert_eq!(map.get(4, 4), None);
    }
}
