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

use synthra_core::{ClassTable, SceneError};

/// Parameters of the procedural scene.
#[derive(Debug, Clone, PartialEq)]
pub struct ProceduralSceneSettings {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Class names, indexed by class id.
    pub class_names: Vec<String>,
    /// Fewest objects placed per scene.
    pub min_objects: usize,
    /// Most objects placed per scene.
    pub max_objects: usize,
    /// Probability that a placed object is culled and never rendered.
    pub loss_probability: f64,
    /// Inclusive range of object extents, in pixels.
    pub object_size: (u32, u32),
    /// Base seed. Every scene request derives its own generator from it.
    pub seed: u64,
}

impl Default for ProceduralSceneSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            class_names: vec!["cable".into(), "connector".into(), "device".into()],
            min_objects: 1,
            max_objects: 5,
            loss_probability: 0.1,
            object_size: (24, 160),
            seed: 42,
        }
    }
}

impl ProceduralSceneSettings {
    /// Rejects settings the scene cannot work with.
    pub fn validate(&self) -> Result<(), SceneError> {
        let problem = if self.width == 0 || self.height == 0 {
            Some(format!("zero resolution {}x{}", self.width, self.height))
        } else if self.class_names.is_empty() {
            Some("no class names".to_owned())
        } else if self.min_objects > self.max_objects {
            Some(format!(
                "min_objects {} exceeds max_objects {}",
                self.min_objects, self.max_objects
            ))
        } else if !(0.0..=1.0).contains(&self.loss_probability) {
            Some(format!(
                "loss_probability {} is outside [0, 1]",
                self.loss_probability
            ))
        } else if self.object_size.0 < 2 || self.object_size.0 > self.object_size.1 {
            Some(format!(
                "object_size {:?} must be an increasing range starting at 2 or more",
                self.object_size
            ))
        } else {
            None
        };

        match problem {
            Some(msg) => Err(SceneError::EngineUnavailable(format!(
                "invalid scene settings: {msg}"
            ))),
            None => Ok(()),
        }
    }

    /// The class table derived from `class_names`.
    pub fn class_table(&self) -> ClassTable {
        ClassTable::from_names(self.class_names.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        assert!(ProceduralSceneSettings::default().validate().is_ok());
    }

    #[test]
    fn inverted_object_range_is_rejected() {
        let settings = ProceduralSceneSettings {
            min_objects: 4,
            max_objects: 2,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SceneError::EngineUnavailable(_))
        ));
    }

    #[test]
    fn class_table_follows_name_order() {
        let table = ProceduralSceneSettings::default().class_table();
        assert_eq!(table.names_in_order(), vec!["cable", "connector", "device"]);
    }
}
