//! # GigaMerge Core
//!
//! Core library for merging placed static meshes into a single "GigaMesh"
//! that can still be culled per original object.
//!
//! - **Math**: bounds, frustum and plane helpers on top of glam
//! - **Transform**: world placement of merge sources
//! - **Mesh**: LOD/section/material layout of static meshes
//! - **Batch**: reconstruction of per-source triangle runs after a merge

pub mod batch;
pub mod math;
pub mod mesh;
pub mod transform;

use serde::{Deserialize, Serialize};

pub use batch::{
    AccountingPolicy, Batch, BatchElement, BatchError, BatchMap, BatchReconstructor, BatchResult,
};
pub use math::{Aabb, BoxSphereBounds, Frustum};
pub use mesh::{MaterialRef, MeshComponent, MeshLod, MeshSection, SourcePrimitive, StaticMesh};
pub use transform::Transform;

/// Which source LODs end up in the merged mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LodSelectionType {
    /// Merge every LOD into a matching merged LOD
    #[default]
    AllLods,
    /// Merge a single LOD of every source
    SpecificLod(u32),
    /// Let the merger pick a LOD from screen size
    CalculateLod,
    /// Merge only the lowest-detail LOD of every source
    LowestDetailLod,
}

/// Merge configuration, passed explicitly to the merge tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeSettings {
    /// Merge collision data of the sources
    pub merge_physics_data: bool,
    /// LOD selection policy
    pub lod_selection: LodSelectionType,
    /// Build the merged mesh around the world origin instead of the sources' center
    pub pivot_at_zero: bool,
    /// Screen area used when the merger computes a LOD
    pub screen_area_size: f32,
    /// Handling of batches that do not cover their section
    pub accounting: AccountingPolicy,
    /// Gather batch records on the rayon pool
    pub parallel_reconstruction: bool,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            merge_physics_data: true,
            lod_selection: LodSelectionType::AllLods,
            pivot_at_zero: false,
            screen_area_size: f32::MAX,
            accounting: AccountingPolicy::default(),
            parallel_reconstruction: false,
        }
    }
}

impl MergeSettings {
    /// Reconstructor configured from these settings
    pub fn reconstructor(&self) -> BatchReconstructor {
        BatchReconstructor::new(self.accounting).parallel(self.parallel_reconstruction)
    }
}
