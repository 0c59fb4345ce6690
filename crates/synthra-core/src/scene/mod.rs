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

//! Contracts for the scene construction and rendering collaborator.
//!
//! The pipeline never builds geometry or picks cameras itself. It asks a
//! [`SceneRenderer`] for a fresh scene, renders it, and later asks the same
//! object, through [`ResourceReclaimer`], to give memory back.

use crate::dataset::ClassTable;
use crate::frame::{BufferKind, FrameBuffers};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Counts of large objects held by the rendering engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineResourceCounts {
    /// Mesh data blocks.
    pub meshes: u64,
    /// Material data blocks.
    pub materials: u64,
    /// Texture data blocks.
    pub textures: u64,
    /// Image data blocks.
    pub images: u64,
}

impl EngineResourceCounts {
    /// Sum over all categories.
    pub fn total(&self) -> u64 {
        self.meshes + self.materials + self.textures + self.images
    }

    /// Component-wise saturating addition.
    pub fn accumulate(&mut self, other: EngineResourceCounts) {
        self.meshes = self.meshes.saturating_add(other.meshes);
        self.materials = self.materials.saturating_add(other.materials);
        self.textures = self.textures.saturating_add(other.textures);
        self.images = self.images.saturating_add(other.images);
    }
}

/// Identifies one scene build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneRequest {
    /// Zero-based slot index inside the run.
    pub slot: usize,
    /// Zero-based attempt index inside the slot.
    pub attempt: u32,
    /// `0` for the main pass, `n` for the n-th top-up pass over abandoned slots.
    pub pass: u32,
}

/// What the collaborator reports after building a scene.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SceneInfo {
    /// Number of annotated objects placed in the scene.
    pub objects: usize,
}

/// A scratch buffer kept alive by the renderer between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetainedBuffer {
    /// Which frame field the buffer backs.
    pub kind: BufferKind,
    /// Bytes held.
    pub bytes: usize,
}

/// The reclamation surface of a rendering collaborator.
///
/// Cleanup lanes only ever see this trait, never the full renderer.
pub trait ResourceReclaimer {
    /// Scratch buffers currently held between frames.
    fn retained_buffers(&self) -> Vec<RetainedBuffer>;

    /// Drops the retained buffer of the given kind. Returns the bytes freed.
    fn release_buffer(&mut self, kind: BufferKind) -> usize;

    /// Runs one collection pass over unreferenced engine objects.
    /// Returns the number of objects freed by this pass.
    fn collect_pass(&mut self) -> u64;

    /// Removes engine objects that no live scene references.
    fn purge_orphans(&mut self) -> EngineResourceCounts;
}

/// The scene construction and rendering collaborator.
///
/// `build` and `render` are blocking. Exactly one scene exists at a time; the
/// loop calls [`teardown`](SceneRenderer::teardown) before building the next.
pub trait SceneRenderer: ResourceReclaimer {
    /// The class-id → name table this collaborator annotates with.
    fn class_table(&self) -> ClassTable;

    /// Builds a fresh scene.
    fn build(&mut self, request: SceneRequest) -> Result<SceneInfo, SceneError>;

    /// Renders the current scene.
    fn render(&mut self) -> Result<FrameBuffers, SceneError>;

    /// Discards the current scene. Calling it with no scene is a no-op.
    fn teardown(&mut self);

    /// Counts of large objects currently held by the engine.
    fn resource_counts(&self) -> EngineResourceCounts;
}

/// A failure reported by the scene or render collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The scene could not be built.
    Build(String),
    /// Rendering failed.
    Render(String),
    /// The engine is not available at all.
    EngineUnavailable(String),
    /// `render` was called without a built scene.
    NoScene,
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneError::Build(msg) => write!(f, "Scene build failed: {msg}"),
            SceneError::Render(msg) => write!(f, "Render failed: {msg}"),
            SceneError::EngineUnavailable(msg) => write!(f, "Rendering engine unavailable: {msg}"),
            SceneError::NoScene => write!(f, "Render requested without a scene"),
        }
    }
}

impl std::error::Error for SceneError {}
