//! Mesh layout
//!
//! The triangle layout of static meshes (LODs, sections and material slots)
//! and the primitives that place them in the world. Geometry itself never
//! enters this crate: batch reconstruction only needs counts and materials.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::math::BoxSphereBounds;
use crate::transform::Transform;

/// Reference to a material, identified by name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialRef(pub String);

impl MaterialRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MaterialRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Contiguous triangle range sharing one material slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshSection {
    /// Index into the owning mesh's material slots
    pub material_index: usize,
    /// Number of triangles in the section
    pub num_triangles: u32,
}

impl MeshSection {
    pub fn new(material_index: usize, num_triangles: u32) -> Self {
        Self {
            material_index,
            num_triangles,
        }
    }
}

/// One level of detail
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshLod {
    /// Sections in triangle-buffer order
    pub sections: SmallVec<[MeshSection; 4]>,
}

impl MeshLod {
    /// Total triangles over all sections
    pub fn total_triangles(&self) -> u64 {
        self.sections.iter().map(|s| u64::from(s.num_triangles)).sum()
    }
}

/// Static mesh layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticMesh {
    /// Mesh name
    #[serde(default)]
    pub name: String,
    /// Material slots
    #[serde(default)]
    pub materials: Vec<MaterialRef>,
    /// LOD levels, most detailed first
    #[serde(default)]
    pub lods: Vec<MeshLod>,
    /// Local-space bounds
    #[serde(default)]
    pub bounds: BoxSphereBounds,
}

impl StaticMesh {
    /// Create an empty mesh with the given material slots
    pub fn new(name: impl Into<String>, materials: Vec<MaterialRef>) -> Self {
        Self {
            name: name.into(),
            materials,
            lods: Vec::new(),
            bounds: BoxSphereBounds::ZERO,
        }
    }

    /// Append a LOD built from `(material slot, triangles)` pairs
    pub fn with_lod(mut self, sections: &[(usize, u32)]) -> Self {
        self.lods.push(MeshLod {
            sections: sections
                .iter()
                .map(|&(slot, triangles)| MeshSection::new(slot, triangles))
                .collect(),
        });
        self
    }

    /// Replace the local bounds
    pub fn with_bounds(mut self, bounds: BoxSphereBounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn num_lods(&self) -> usize {
        self.lods.len()
    }

    /// Number of sections at `lod`, zero if the LOD does not exist
    pub fn num_sections(&self, lod: usize) -> usize {
        self.lods.get(lod).map_or(0, |l| l.sections.len())
    }

    pub fn section(&self, lod: usize, section: usize) -> Option<&MeshSection> {
        self.lods.get(lod)?.sections.get(section)
    }

    /// Material assigned to a slot
    pub fn material(&self, slot: usize) -> Option<&MaterialRef> {
        self.materials.get(slot)
    }

    /// Material of a section, resolved through the mesh's own slots
    pub fn section_material(&self, lod: usize, section: usize) -> Option<&MaterialRef> {
        self.material(self.section(lod, section)?.material_index)
    }

    /// Total triangles at `lod`
    pub fn total_triangles(&self, lod: usize) -> u64 {
        self.lods.get(lod).map_or(0, MeshLod::total_triangles)
    }

    /// True if any LOD has at least one section
    pub fn has_renderable_sections(&self) -> bool {
        self.lods.iter().any(|l| !l.sections.is_empty())
    }
}

/// Anything that can feed a merge: a mesh placed in the world with optional
/// per-slot material overrides.
pub trait SourcePrimitive {
    /// Display name used in logs
    fn name(&self) -> &str;

    /// World transform of the primitive
    fn world_transform(&self) -> Transform;

    /// Mesh rendered by the primitive
    fn mesh(&self) -> &StaticMesh;

    /// Override for a material slot, if any
    fn material_override(&self, slot: usize) -> Option<&MaterialRef>;

    /// Material actually rendered in `slot`: the override first, then the mesh slot
    fn effective_material(&self, slot: usize) -> Option<&MaterialRef> {
        self.material_override(slot).or_else(|| self.mesh().material(slot))
    }
}

/// Static mesh component owned by an actor in the level
#[derive(Debug, Clone)]
pub struct MeshComponent {
    /// Component name
    pub name: String,
    /// Mesh asset, shared between components
    pub mesh: Arc<StaticMesh>,
    /// World transform
    pub transform: Transform,
    /// Material overrides keyed by slot
    pub overrides: BTreeMap<usize, MaterialRef>,
}

impl MeshComponent {
    pub fn new(name: impl Into<String>, mesh: Arc<StaticMesh>, transform: Transform) -> Self {
        Self {
            name: name.into(),
            mesh,
            transform,
            overrides: BTreeMap::new(),
        }
    }

    /// Override the material of one slot
    pub fn with_override(mut self, slot: usize, material: MaterialRef) -> Self {
        self.overrides.insert(slot, material);
        self
    }
}

impl SourcePrimitive for MeshComponent {
    fn name(&self) -> &str {
        &self.name
    }

    fn world_transform(&self) -> Transform {
        self.transform
    }

    fn mesh(&self) -> &StaticMesh {
        &self.mesh
    }

    fn material_override(&self, slot: usize) -> Option<&MaterialRef> {
        self.overrides.get(&slot)
    }
}
