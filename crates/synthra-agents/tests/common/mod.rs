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

//! Scripted collaborators shared by the generation loop tests.

#![allow(dead_code)]

use std::borrow::Cow;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use synthra_core::{
    BufferKind, ClassId, ClassTable, ColorImage, Detection, EngineResourceCounts, FrameBuffers,
    FrameSink, InstanceAttributeTable, InstanceAttributes, InstanceMap, MemoryProbe, MemorySource,
    MemoryUsage, ResourceReclaimer, RetainedBuffer, SceneError, SceneInfo, SceneRenderer,
    SceneRequest, SinkError,
};

pub const WIDTH: u32 = 32;
pub const HEIGHT: u32 = 32;

/// What the scripted scene does for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shot {
    /// One 8x8 instance of class 0.
    Object,
    /// Nothing but background.
    Empty,
    /// One 8x8 instance of a class absent from the class table.
    UnknownClass,
    /// The build call fails.
    FailBuild,
}

type Script = Box<dyn FnMut(SceneRequest) -> Shot>;

/// A renderer that follows a script and records every call.
pub struct ScriptedScene {
    script: Script,
    current: Option<Shot>,
    pub requests: Rc<RefCell<Vec<SceneRequest>>>,
    pub teardowns: Rc<RefCell<usize>>,
    pub retained: Vec<RetainedBuffer>,
    pub memory: Option<(Arc<FixedProbe>, u64)>,
}

impl ScriptedScene {
    pub fn new(script: impl FnMut(SceneRequest) -> Shot + 'static) -> Self {
        Self {
            script: Box::new(script),
            current: None,
            requests: Rc::new(RefCell::new(Vec::new())),
            teardowns: Rc::new(RefCell::new(0)),
            retained: Vec::new(),
            memory: None,
        }
    }

    pub fn always(shot: Shot) -> Self {
        Self::new(move |_| shot)
    }

    /// Every render grows `probe` by `bytes` and nothing ever gives it back.
    pub fn leaking(mut self, probe: Arc<FixedProbe>, bytes: u64) -> Self {
        self.memory = Some((probe, bytes));
        self
    }
}

impl ResourceReclaimer for ScriptedScene {
    fn retained_buffers(&self) -> Vec<RetainedBuffer> {
        self.retained.clone()
    }

    fn release_buffer(&mut self, kind: BufferKind) -> usize {
        match self.retained.iter().position(|b| b.kind == kind) {
            Some(i) => self.retained.remove(i).bytes,
            None => 0,
        }
    }

    fn collect_pass(&mut self) -> u64 {
        0
    }

    fn purge_orphans(&mut self) -> EngineResourceCounts {
        EngineResourceCounts::default()
    }
}

impl SceneRenderer for ScriptedScene {
    fn class_table(&self) -> ClassTable {
        ClassTable::from_names(["cube"])
    }

    fn build(&mut self, request: SceneRequest) -> Result<SceneInfo, SceneError> {
        self.requests.borrow_mut().push(request);
        let shot = (self.script)(request);
        if shot == Shot::FailBuild {
            return Err(SceneError::Build(format!("slot {} refused", request.slot)));
        }
        self.current = Some(shot);
        Ok(SceneInfo {
            objects: usize::from(shot != Shot::Empty),
        })
    }

    fn render(&mut self) -> Result<FrameBuffers, SceneError> {
        let shot = self.current.ok_or(SceneError::NoScene)?;
        if let Some((probe, bytes)) = &self.memory {
            probe.grow(*bytes);
        }

        let mut instances = InstanceMap::new(WIDTH, HEIGHT);
        let mut attributes = InstanceAttributeTable::new();
        let class = match shot {
            Shot::Object => Some(ClassId(0)),
            Shot::UnknownClass => Some(ClassId(7)),
            Shot::Empty | Shot::FailBuild => None,
        };
        if let Some(class) = class {
            instances.fill_rect(4, 4, 8, 8, 1);
            attributes.insert(1, InstanceAttributes::of_class(class));
        }
        Ok(FrameBuffers::new(
            ColorImage::new(WIDTH, HEIGHT),
            instances,
            attributes,
        ))
    }

    fn teardown(&mut self) {
        if self.current.take().is_some() {
            *self.teardowns.borrow_mut() += 1;
        }
    }

    fn resource_counts(&self) -> EngineResourceCounts {
        EngineResourceCounts {
            meshes: u64::from(self.current.is_some()),
            ..Default::default()
        }
    }
}

/// A sink that keeps what it was given in memory.
#[derive(Clone, Default)]
pub struct MemorySink {
    pub persisted: Rc<RefCell<Vec<(u64, usize)>>>,
}

impl FrameSink for MemorySink {
    fn persist(
        &mut self,
        frame_index: u64,
        _frame: &FrameBuffers,
        detections: &[Detection],
    ) -> Result<PathBuf, SinkError> {
        self.persisted
            .borrow_mut()
            .push((frame_index, detections.len()));
        Ok(PathBuf::from(format!("images/frame_{frame_index:06}.png")))
    }
}

/// A probe whose reading the test controls.
#[derive(Debug, Default)]
pub struct FixedProbe {
    bytes: AtomicU64,
}

impl FixedProbe {
    pub fn new(bytes: u64) -> Arc<Self> {
        Arc::new(Self {
            bytes: AtomicU64::new(bytes),
        })
    }

    pub fn grow(&self, bytes: u64) {
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }
}

impl MemoryProbe for FixedProbe {
    fn probe_id(&self) -> Cow<'static, str> {
        Cow::Borrowed("fixed")
    }

    fn source(&self) -> MemorySource {
        MemorySource::Allocator
    }

    fn usage(&self) -> MemoryUsage {
        MemoryUsage {
            current_bytes: self.bytes.load(Ordering::Relaxed),
            peak_bytes: None,
        }
    }
}
