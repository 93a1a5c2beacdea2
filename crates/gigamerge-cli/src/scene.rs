//! Scene description files
//!
//! A JSON file listing mesh layouts by name and the actors placing them:
//!
//! ```json
//! {
//!   "meshes": { "SM_Cube": { "materials": ["M_Stone"], "lods": [{ "sections": [{ "material_index": 0, "num_triangles": 12 }] }] } },
//!   "actors": [{ "name": "Cube0", "components": [{ "mesh": "SM_Cube", "transform": { "translation": [4, 0, 0] } }] }]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use gigamerge_core::{MaterialRef, MeshComponent, StaticMesh, Transform};
use gigamerge_editor::MergeSelection;

/// Placed mesh inside an actor
#[derive(Debug, Clone, Deserialize)]
pub struct ComponentDesc {
    /// Component name, defaults to the mesh name
    #[serde(default)]
    pub name: Option<String>,
    /// Key into the scene's meshes
    pub mesh: String,
    #[serde(default)]
    pub transform: Transform,
    /// Material overrides keyed by slot
    #[serde(default)]
    pub overrides: BTreeMap<usize, MaterialRef>,
}

/// Actor and its mesh components
#[derive(Debug, Clone, Deserialize)]
pub struct ActorDesc {
    pub name: String,
    #[serde(default)]
    pub components: Vec<ComponentDesc>,
}

/// Whole scene file
#[derive(Debug, Clone, Deserialize)]
pub struct SceneFile {
    pub meshes: BTreeMap<String, StaticMesh>,
    pub actors: Vec<ActorDesc>,
}

impl SceneFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading scene {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing scene {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Build the merge selection, optionally restricted to some actors.
    ///
    /// Actors are offered in file order, which is also the merge order.
    pub fn into_selection(self, only: &[String]) -> Result<MergeSelection> {
        let meshes: BTreeMap<String, Arc<StaticMesh>> = self
            .meshes
            .into_iter()
            .map(|(key, mut mesh)| {
                if mesh.name.is_empty() {
                    mesh.name = key.clone();
                }
                (key, Arc::new(mesh))
            })
            .collect();

        for name in only {
            if !self.actors.iter().any(|a| &a.name == name) {
                bail!("actor '{name}' is not in the scene");
            }
        }

        let mut selection = MergeSelection::new();
        for actor in self.actors {
            if !only.is_empty() && !only.contains(&actor.name) {
                continue;
            }

            let mut components = Vec::with_capacity(actor.components.len());
            for desc in actor.components {
                let mesh = meshes
                    .get(&desc.mesh)
                    .with_context(|| format!("actor '{}' uses unknown mesh '{}'", actor.name, desc.mesh))?;
                let name = desc.name.unwrap_or_else(|| desc.mesh.clone());
                let mut component = MeshComponent::new(name, Arc::clone(mesh), desc.transform);
                component.overrides = desc.overrides;
                components.push(component);
            }
            selection.add_actor(actor.name, components);
        }
        Ok(selection)
    }
}
