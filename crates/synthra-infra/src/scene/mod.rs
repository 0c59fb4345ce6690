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

//! A seeded, self-contained scene collaborator.
//!
//! [`ProceduralScene`] stands in for a full 3D engine: it scatters rectangles
//! and ellipses at random depths, renders them with a z-test and reports
//! engine objects the way a real engine leaks them between scenes.

mod procedural;
mod settings;
mod shapes;

pub use procedural::ProceduralScene;
pub use settings::ProceduralSceneSettings;
