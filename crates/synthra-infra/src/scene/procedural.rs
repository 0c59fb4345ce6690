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

use super::settings::ProceduralSceneSettings;
use super::shapes::{shade, PlacedObject, ShapeKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::mem::size_of;
use synthra_core::{
    BufferKind, ClassId, ClassTable, ColorImage, EngineResourceCounts, FrameBuffers,
    InstanceAttributeTable, InstanceAttributes, InstanceId, InstanceMap, ResourceReclaimer,
    RetainedBuffer, SceneError, SceneInfo, SceneRenderer, SceneRequest,
};

/// Depth written where no object covers the pixel.
const FAR_PLANE: f32 = 1000.0;

struct BuiltScene {
    objects: Vec<PlacedObject>,
    background: [[u8; 3]; 2],
}

/// A deterministic scene collaborator drawing flat primitives.
///
/// Each [`SceneRequest`] seeds its own generator from the base seed, so the
/// scene for a given slot, attempt and pass is identical across runs no matter
/// what happened before it.
///
/// Depth and normal scratch buffers survive between renders and are only
/// dropped through [`ResourceReclaimer::release_buffer`]. Tearing a scene down
/// leaves its materials and textures behind as orphans and every render
/// leaves one image, which collection passes and orphan purges reclaim.
pub struct ProceduralScene {
    settings: ProceduralSceneSettings,
    classes: ClassTable,
    current: Option<BuiltScene>,
    depth_scratch: Option<Vec<f32>>,
    normal_scratch: Option<Vec<[f32; 3]>>,
    live: EngineResourceCounts,
    orphans: EngineResourceCounts,
}

impl ProceduralScene {
    /// Creates the scene collaborator. Fails on unusable settings.
    pub fn new(settings: ProceduralSceneSettings) -> Result<Self, SceneError> {
        settings.validate()?;
        log::info!(
            "ProceduralScene: {}x{}, {} classes, {}-{} objects per scene, seed {}",
            settings.width,
            settings.height,
            settings.class_names.len(),
            settings.min_objects,
            settings.max_objects,
            settings.seed
        );
        Ok(Self {
            classes: settings.class_table(),
            settings,
            current: None,
            depth_scratch: None,
            normal_scratch: None,
            live: EngineResourceCounts::default(),
            orphans: EngineResourceCounts::default(),
        })
    }

    /// The settings in use.
    pub fn settings(&self) -> &ProceduralSceneSettings {
        &self.settings
    }

    fn rng_for(&self, request: SceneRequest) -> StdRng {
        let mut seed = self.settings.seed ^ 0x5EED_0F_5C3E_u64;
        for part in [request.slot as u64, request.attempt as u64, request.pass as u64] {
            seed = seed
                .rotate_left(17)
                .wrapping_mul(0x9E37_79B9_7F4A_7C15)
                .wrapping_add(part);
        }
        StdRng::seed_from_u64(seed)
    }

    fn place_objects(&self, rng: &mut StdRng) -> Vec<PlacedObject> {
        let s = &self.settings;
        let count = rng.gen_range(s.min_objects..=s.max_objects);
        let class_count = s.class_names.len() as u32;
        let (min_size, max_size) = s.object_size;

        (0..count)
            .map(|i| {
                let kind = if rng.gen_bool(0.5) {
                    ShapeKind::Rectangle
                } else {
                    ShapeKind::Ellipse
                };
                let half_extent = (
                    rng.gen_range(min_size..=max_size) as f32 / 2.0,
                    rng.gen_range(min_size..=max_size) as f32 / 2.0,
                );
                PlacedObject {
                    instance: (i + 1) as InstanceId,
                    class_id: ClassId(rng.gen_range(0..class_count)),
                    kind,
                    center: (
                        rng.gen_range(0.0..s.width as f32),
                        rng.gen_range(0.0..s.height as f32),
                    ),
                    half_extent,
                    depth: rng.gen_range(1.0..50.0),
                    color: [rng.gen(), rng.gen(), rng.gen()],
                    culled: rng.gen_bool(s.loss_probability),
                }
            })
            .collect()
    }

    fn name_of(&self, object: &PlacedObject) -> String {
        let class = self.classes.name(object.class_id).unwrap_or("object");
        format!("{class}_{:03}", object.instance)
    }
}

impl ResourceReclaimer for ProceduralScene {
    fn retained_buffers(&self) -> Vec<RetainedBuffer> {
        let mut held = Vec::new();
        if let Some(depth) = &self.depth_scratch {
            held.push(RetainedBuffer {
                kind: BufferKind::Depth,
                bytes: depth.len() * size_of::<f32>(),
            });
        }
        if let Some(normals) = &self.normal_scratch {
            held.push(RetainedBuffer {
                kind: BufferKind::Normals,
                bytes: normals.len() * size_of::<[f32; 3]>(),
            });
        }
        held
    }

    fn release_buffer(&mut self, kind: BufferKind) -> usize {
        match kind {
            BufferKind::Depth => self
                .depth_scratch
                .take()
                .map_or(0, |b| b.len() * size_of::<f32>()),
            BufferKind::Normals => self
                .normal_scratch
                .take()
                .map_or(0, |b| b.len() * size_of::<[f32; 3]>()),
            _ => 0,
        }
    }

    fn collect_pass(&mut self) -> u64 {
        // Render results are the only objects nothing references after teardown.
        std::mem::take(&mut self.orphans.images)
    }

    fn purge_orphans(&mut self) -> EngineResourceCounts {
        std::mem::take(&mut self.orphans)
    }
}

impl SceneRenderer for ProceduralScene {
    fn class_table(&self) -> ClassTable {
        self.classes.clone()
    }

    fn build(&mut self, request: SceneRequest) -> Result<SceneInfo, SceneError> {
        self.teardown();

        let mut rng = self.rng_for(request);
        let objects = self.place_objects(&mut rng);
        let background = [
            [rng.gen_range(0..96), rng.gen_range(0..96), rng.gen_range(0..96)],
            [rng.gen_range(96..=255), rng.gen_range(96..=255), rng.gen_range(96..=255)],
        ];

        let mut materials: Vec<ClassId> = objects.iter().map(|o| o.class_id).collect();
        materials.sort_unstable();
        materials.dedup();
        self.live = EngineResourceCounts {
            meshes: objects.len() as u64,
            materials: materials.len() as u64,
            textures: 1,
            images: 0,
        };

        let visible = objects.iter().filter(|o| !o.culled).count();
        log::trace!(
            "ProceduralScene: built slot {} attempt {} pass {} with {} objects ({} culled)",
            request.slot,
            request.attempt,
            request.pass,
            objects.len(),
            objects.len() - visible
        );
        self.current = Some(BuiltScene {
            objects,
            background,
        });
        Ok(SceneInfo { objects: visible })
    }

    fn render(&mut self) -> Result<FrameBuffers, SceneError> {
        let scene = self.current.as_ref().ok_or(SceneError::NoScene)?;
        let (width, height) = (self.settings.width, self.settings.height);
        let pixel_count = width as usize * height as usize;

        let mut depth = self.depth_scratch.take().unwrap_or_default();
        depth.clear();
        depth.resize(pixel_count, FAR_PLANE);
        let mut normals = self.normal_scratch.take().unwrap_or_default();
        normals.clear();
        normals.resize(pixel_count, [0.0, 0.0, 1.0]);

        let [top, bottom] = scene.background;
        let mut color = ColorImage::new(width, height);
        for y in 0..height {
            let t = y as f32 / height.max(2).saturating_sub(1) as f32;
            let rgb = [0, 1, 2].map(|c| (top[c] as f32 * (1.0 - t) + bottom[c] as f32 * t) as u8);
            for x in 0..width {
                color.put_pixel(x, y, rgb);
            }
        }

        let mut instances = InstanceMap::new(width, height);
        for object in scene.objects.iter().filter(|o| !o.culled) {
            let Some((x0, x1, y0, y1)) = object.pixel_span(width, height) else {
                continue;
            };
            for y in y0..y1 {
                for x in x0..x1 {
                    let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
                    let i = y as usize * width as usize + x as usize;
                    if !object.covers(px, py) || object.depth >= depth[i] {
                        continue;
                    }
                    let normal = object.normal_at(px, py);
                    depth[i] = object.depth;
                    normals[i] = normal;
                    instances.set(x, y, object.instance);
                    color.put_pixel(x, y, shade(object.color, normal));
                }
            }
        }

        let mut visible_pixels = vec![0u32; scene.objects.len() + 1];
        for &id in instances.as_raw() {
            if let Some(count) = visible_pixels.get_mut(id as usize) {
                *count += 1;
            }
        }
        let attributes: InstanceAttributeTable = scene
            .objects
            .iter()
            .map(|object| {
                let seen = visible_pixels[object.instance as usize] as f32;
                let attributes = InstanceAttributes {
                    class_id: Some(object.class_id),
                    name: Some(self.name_of(object)),
                    visibility: Some((seen / object.area()).clamp(0.0, 1.0)),
                };
                (object.instance, attributes)
            })
            .collect();

        let frame = FrameBuffers::new(color, instances, attributes)
            .with_depth(depth.clone())
            .with_normals(normals.clone());
        self.depth_scratch = Some(depth);
        self.normal_scratch = Some(normals);
        self.orphans.images += 1;
        Ok(frame)
    }

    fn teardown(&mut self) {
        if self.current.take().is_some() {
            self.orphans.materials += self.live.materials;
            self.orphans.textures += self.live.textures;
            self.live = EngineResourceCounts::default();
        }
    }

    fn resource_counts(&self) -> EngineResourceCounts {
        let mut counts = self.live;
        counts.accumulate(self.orphans);
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synthra_core::annotation::BACKGROUND_INSTANCE;

    fn small_settings() -> ProceduralSceneSettings {
        ProceduralSceneSettings {
            width: 64,
            height: 48,
            min_objects: 2,
            max_objects: 4,
            loss_probability: 0.0,
            object_size: (8, 24),
            ..Default::default()
        }
    }

    fn request(slot: usize) -> SceneRequest {
        SceneRequest {
            slot,
            attempt: 0,
            pass: 0,
        }
    }

    #[test]
    fn same_request_renders_the_same_frame() {
        let mut a = ProceduralScene::new(small_settings()).unwrap();
        let mut b = ProceduralScene::new(small_settings()).unwrap();

        // Different history on `b` must not matter.
        b.build(request(7)).unwrap();
        b.render().unwrap();

        a.build(request(3)).unwrap();
        b.build(request(3)).unwrap();
        let fa = a.render().unwrap();
        let fb = b.render().unwrap();
        assert_eq!(fa.instances, fb.instances);
        assert_eq!(fa.color, fb.color);
        assert_eq!(fa.attributes, fb.attributes);
    }

    #[test]
    fn render_produces_consistent_buffers() {
        let mut scene = ProceduralScene::new(small_settings()).unwrap();
        scene.build(request(0)).unwrap();
        let frame = scene.render().unwrap();

        assert!(frame.validate().is_ok());
        assert_eq!(frame.resolution(), (64, 48));
        assert!(frame.depth.is_some());
        assert!(frame.normals.is_some());
        for &id in frame.instances.as_raw() {
            if id != BACKGROUND_INSTANCE {
                assert!(frame.attributes.class_of(id).is_some());
            }
        }
    }

    #[test]
    fn fully_culled_scene_renders_only_background() {
        let mut scene = ProceduralScene::new(ProceduralSceneSettings {
            loss_probability: 1.0,
            ..small_settings()
        })
        .unwrap();
        let info = scene.build(request(0)).unwrap();
        let frame = scene.render().unwrap();

        assert_eq!(info.objects, 0);
        assert!(frame
            .instances
            .as_raw()
            .iter()
            .all(|&id| id == BACKGROUND_INSTANCE));
    }

    #[test]
    fn render_without_scene_fails() {
        let mut scene = ProceduralScene::new(small_settings()).unwrap();
        assert_eq!(scene.render().unwrap_err(), SceneError::NoScene);
    }

    #[test]
    fn teardown_leaves_orphans_that_reclaim_removes() {
        let mut scene = ProceduralScene::new(small_settings()).unwrap();
        scene.build(request(0)).unwrap();
        scene.render().unwrap();
        scene.teardown();

        let counts = scene.resource_counts();
        assert_eq!(counts.meshes, 0);
        assert_eq!(counts.textures, 1);
        assert_eq!(counts.images, 1);
        assert!(counts.materials >= 1);

        assert_eq!(scene.collect_pass(), 1);
        assert_eq!(scene.collect_pass(), 0);
        let purged = scene.purge_orphans();
        assert_eq!(purged.textures, 1);
        assert_eq!(scene.resource_counts().total(), 0);
    }

    #[test]
    fn scratch_buffers_are_retained_until_released() {
        let mut scene = ProceduralScene::new(small_settings()).unwrap();
        assert!(scene.retained_buffers().is_empty());

        scene.build(request(0)).unwrap();
        scene.render().unwrap();
        scene.teardown();

        let held = scene.retained_buffers();
        assert_eq!(held.len(), 2);
        assert_eq!(scene.release_buffer(BufferKind::Depth), 64 * 48 * 4);
        assert_eq!(scene.release_buffer(BufferKind::Depth), 0);
        assert_eq!(scene.release_buffer(BufferKind::Normals), 64 * 48 * 12);
        assert!(scene.retained_buffers().is_empty());
    }
}
