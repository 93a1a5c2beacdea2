//! Mesh merge service
//!
//! The merge itself belongs to the host. The tool only relies on one
//! contract: every merged section is written by walking the sources in the
//! order given, one contiguous run per source section with that material.
//! [`LayoutMergeService`] honours it for layouts alone and stands in for the
//! host merger in tools and tests.

use glam::Vec3;

use gigamerge_assets::package::short_name;
use gigamerge_core::{
    BoxSphereBounds, LodSelectionType, MaterialRef, MergeSettings, MeshComponent, MeshLod,
    MeshSection, SourcePrimitive, StaticMesh,
};

use crate::{MergeError, MergeResult};

/// What a merge hands back
#[derive(Debug, Clone)]
pub struct MergeOutput {
    /// Created mesh assets
    pub assets: Vec<StaticMesh>,
    /// World-space point the merged mesh is built around
    pub pivot: Vec3,
}

/// Host merge of several components into static meshes
pub trait MeshMergeService {
    fn merge(
        &self,
        sources: &[MeshComponent],
        settings: &MergeSettings,
        package: &str,
    ) -> MergeResult<MergeOutput>;
}

/// Layout-only merger: combines section tables, never geometry
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutMergeService;

impl LayoutMergeService {
    pub fn new() -> Self {
        Self
    }
}

impl MeshMergeService for LayoutMergeService {
    fn merge(
        &self,
        sources: &[MeshComponent],
        settings: &MergeSettings,
        package: &str,
    ) -> MergeResult<MergeOutput> {
        if settings.lod_selection != LodSelectionType::AllLods {
            return Err(MergeError::Unsupported(format!(
                "LOD selection {:?}",
                settings.lod_selection
            )));
        }
        if sources.is_empty() {
            log::warn!("Merging 0 components");
            return Ok(MergeOutput {
                assets: Vec::new(),
                pivot: Vec3::ZERO,
            });
        }
        if settings.merge_physics_data {
            log::debug!("Layout merge carries no collision data");
        }
        if settings.screen_area_size != f32::MAX {
            log::debug!(
                "Screen area size {} ignored, every LOD is merged",
                settings.screen_area_size
            );
        }

        let num_lods = sources.iter().map(|s| s.mesh().num_lods()).max().unwrap_or(0);
        let mut materials: Vec<MaterialRef> = Vec::new();
        let mut lods = Vec::with_capacity(num_lods);

        for lod in 0..num_lods {
            let mut merged_lod = MeshLod::default();
            for source in sources {
                let Some(source_lod) = source.mesh().lods.get(lod) else {
                    continue;
                };
                for section in &source_lod.sections {
                    let Some(material) = source.effective_material(section.material_index) else {
                        log::warn!(
                            "'{}' LOD {} slot {} has no material, dropping {} triangles",
                            source.name(),
                            lod,
                            section.material_index,
                            section.num_triangles
                        );
                        continue;
                    };

                    let slot = match materials.iter().position(|m| m == material) {
                        Some(slot) => slot,
                        None => {
                            materials.push(material.clone());
                            materials.len() - 1
                        }
                    };
                    match merged_lod.sections.iter_mut().find(|s| s.material_index == slot) {
                        Some(merged) => {
                            merged.num_triangles = merged
                                .num_triangles
                                .checked_add(section.num_triangles)
                                .ok_or_else(|| MergeError::TriangleOverflow {
                                    lod,
                                    material: material.to_string(),
                                })?;
                        }
                        None => merged_lod
                            .sections
                            .push(MeshSection::new(slot, section.num_triangles)),
                    }
                }
            }
            lods.push(merged_lod);
        }

        let world_bounds = sources
            .iter()
            .map(|s| s.mesh().bounds.transform_by(&s.world_transform().to_affine()))
            .reduce(|a, b| a.union(&b))
            .unwrap_or(BoxSphereBounds::ZERO);

        let pivot = if settings.pivot_at_zero {
            Vec3::ZERO
        } else {
            world_bounds.origin
        };

        let merged = StaticMesh {
            name: short_name(package).to_string(),
            materials,
            lods,
            bounds: BoxSphereBounds {
                origin: world_bounds.origin - pivot,
                ..world_bounds
            },
        };
        log::info!(
            "Merged {} components into '{}' ({} LODs, {} materials)",
            sources.len(),
            merged.name,
            merged.num_lods(),
            merged.materials.len()
        );

        Ok(MergeOutput {
            assets: vec![merged],
            pivot,
        })
    }
}
