//! GigaMesh asset
//!
//! A merged static mesh carrying its [`BatchMap`], so each section can be
//! drawn as a set of triangle ranges, one per original object still in view.

use std::ops::Range;

use gigamerge_core::batch::{self, BatchMap, BatchResult};
use gigamerge_core::{Frustum, StaticMesh, Transform};
use serde::{Deserialize, Serialize};

use crate::package::short_name;
use crate::AssetId;

/// Merged mesh plus per-section batches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GigaMesh {
    /// Asset ID derived from the package
    pub id: AssetId,
    /// Long package name
    pub package: String,
    /// Merged mesh layout, renamed after the package
    pub mesh: StaticMesh,
    /// Batches keyed by `(lod, section)`
    pub batches: BatchMap,
}

impl GigaMesh {
    /// Copy a merged static mesh into a new GigaMesh with no batches yet
    pub fn duplicate(package: &str, mesh: &StaticMesh) -> Self {
        let mut mesh = mesh.clone();
        mesh.name = short_name(package).to_string();
        Self {
            id: AssetId::from_package(package),
            package: package.to_string(),
            mesh,
            batches: BatchMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.mesh.name
    }

    /// Replace the batch map wholesale
    pub fn attach_batches(&mut self, batches: BatchMap) {
        self.batches = batches;
    }

    /// Check that the batches exactly cover every section
    pub fn verify(&self) -> BatchResult<()> {
        batch::verify(&self.mesh, &self.batches)
    }

    /// Triangle ranges of `(lod, section)` whose source bounds are in view.
    ///
    /// `world` places the GigaMesh (i.e. its pivot) in the world. Adjacent
    /// visible elements are coalesced into one range.
    pub fn visible_ranges(
        &self,
        lod: usize,
        section: usize,
        frustum: &Frustum,
        world: &Transform,
    ) -> Vec<Range<u32>> {
        let Some(batch) = self.batches.batch(lod, section) else {
            return Vec::new();
        };

        let affine = world.to_affine();
        let mut ranges: Vec<Range<u32>> = Vec::new();
        for element in &batch.elements {
            if element.num_triangles == 0 || !frustum.intersects_bounds(&element.bounds.transform_by(&affine)) {
                continue;
            }
            match ranges.last_mut() {
                Some(last) if last.end == element.first_index => last.end = element.end_index(),
                _ => ranges.push(element.first_index..element.end_index()),
            }
        }
        ranges
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use gigamerge_core::batch::BatchReconstructor;
    use gigamerge_core::math::{Aabb, Mat4, Vec3};
    use gigamerge_core::{AccountingPolicy, BoxSphereBounds, MaterialRef, MeshComponent};

    use super::*;

    fn row_of_cubes(count: usize) -> (StaticMesh, Vec<MeshComponent>) {
        let cube = Arc::new(
            StaticMesh::new("SM_Cube", vec![MaterialRef::new("M_A")])
                .with_lod(&[(0, 12)])
                .with_bounds(BoxSphereBounds::from_aabb(&Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0)))),
        );
        let sources = (0..count)
            .map(|i| {
                MeshComponent::new(
                    format!("Cube{i}"),
                    Arc::clone(&cube),
                    Transform::from_translation(Vec3::new(i as f32 * 10.0, 0.0, 0.0)),
                )
            })
            .collect();
        let merged = StaticMesh::new("SM_MERGED", vec![MaterialRef::new("M_A")])
            .with_lod(&[(0, 12 * count as u32)]);
        (merged, sources)
    }

    fn giga(count: usize) -> GigaMesh {
        let (merged, sources) = row_of_cubes(count);
        let mut giga = GigaMesh::duplicate("/Game/GM_Row", &merged);
        let batches = BatchReconstructor::new(AccountingPolicy::Strict)
            .reconstruct(&merged, &sources, Vec3::ZERO)
            .unwrap();
        giga.attach_batches(batches);
        giga
    }

    /// Camera at `eye` looking down -Z with a narrow field of view
    fn frustum_looking_at(eye: Vec3) -> Frustum {
        let view = Mat4::look_at_rh(eye, eye - Vec3::Z, Vec3::Y);
        let proj = Mat4::perspective_rh(0.2, 1.0, 0.1, 1000.0);
        Frustum::from_matrix(proj * view)
    }

    #[test]
    fn test_duplicate_renames_mesh() {
        let (merged, _) = row_of_cubes(2);
        let giga = GigaMesh::duplicate("/Game/Props/GM_Row", &merged);
        assert_eq!(giga.name(), "GM_Row");
        assert_eq!(giga.mesh.lods, merged.lods);
        assert!(giga.batches.is_empty());
        assert_eq!(giga.id, AssetId::from_package("/Game/Props/GM_Row"));
    }

    #[test]
    fn test_verify_after_attach() {
        let giga = giga(3);
        assert!(giga.verify().is_ok());

        let (merged, _) = row_of_cubes(3);
        assert!(GigaMesh::duplicate("/Game/GM_Row", &merged).verify().is_err());
    }

    #[test]
    fn test_visible_ranges_cull_per_source() {
        let giga = giga(4);

        // Only the third cube (x = 20) is in the narrow view
        let ranges = giga.visible_ranges(
            0,
            0,
            &frustum_looking_at(Vec3::new(20.0, 0.0, 30.0)),
            &Transform::IDENTITY,
        );
        assert_eq!(ranges, vec![24..36]);
    }

    #[test]
    fn test_visible_ranges_coalesce_and_follow_placement() {
        let giga = giga(4);
        let wide = {
            let view = Mat4::look_at_rh(Vec3::new(15.0, 0.0, 200.0), Vec3::new(15.0, 0.0, 0.0), Vec3::Y);
            Frustum::from_matrix(Mat4::perspective_rh(1.0, 1.0, 0.1, 1000.0) * view)
        };
        assert_eq!(giga.visible_ranges(0, 0, &wide, &Transform::IDENTITY), vec![0..48]);

        // Moving the GigaMesh away hides everything
        let moved = Transform::from_translation(Vec3::new(0.0, 500.0, 0.0));
        assert!(giga.visible_ranges(0, 0, &wide, &moved).is_empty());
        assert!(giga.visible_ranges(3, 0, &wide, &Transform::IDENTITY).is_empty());
    }
}
