//! Batch reconstruction
//!
//! After several primitives are merged into one static mesh, every merged
//! section is a concatenation of triangle runs coming from the original
//! sources. This module recovers that provenance: for each `(lod, section)`
//! it produces a [`Batch`] listing which source wrote which triangle range,
//! together with that source's bounds in the pivot frame, so that sections of
//! the merged mesh can later be culled per original object.
//!
//! The merge service must write each section by walking the sources in the
//! order they were handed to it, one contiguous run per source section. The
//! reconstruction relies on that order and nothing else.

use glam::Vec3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::BoxSphereBounds;
use crate::mesh::{MaterialRef, SourcePrimitive, StaticMesh};
use crate::transform::Transform;

/// Batch errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("LOD {lod} section {section}: batches cover {actual} triangles, section has {expected}")]
    AccountingMismatch {
        lod: usize,
        section: usize,
        expected: u64,
        actual: u64,
    },

    #[error("LOD {lod} section {section} has no batch")]
    MissingBatch { lod: usize, section: usize },

    #[error("LOD {lod} section {section}: element {element} does not start where the previous one ends")]
    NonContiguous {
        lod: usize,
        section: usize,
        element: usize,
    },
}

/// Result type for batch operations
pub type BatchResult<T> = Result<T, BatchError>;

/// One source's contiguous triangle run inside a merged section
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchElement {
    /// Source bounds relative to the merge pivot
    pub bounds: BoxSphereBounds,
    /// First triangle of the run within the merged section
    pub first_index: u32,
    /// Number of triangles in the run
    pub num_triangles: u32,
    /// Position of the source in the merge input
    pub source_index: usize,
}

impl BatchElement {
    /// One past the last triangle of the run
    pub fn end_index(&self) -> u32 {
        self.first_index.saturating_add(self.num_triangles)
    }
}

/// Ordered elements of one merged section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub elements: Vec<BatchElement>,
}

impl Batch {
    pub fn total_triangles(&self) -> u64 {
        self.elements.iter().map(|e| u64::from(e.num_triangles)).sum()
    }

    /// Index of the first element that breaks gap-free packing from zero
    fn first_gap(&self) -> Option<usize> {
        let mut expected = 0u32;
        for (i, element) in self.elements.iter().enumerate() {
            if element.first_index != expected {
                return Some(i);
            }
            expected = element.end_index();
        }
        None
    }

    /// True if elements start at zero and follow each other without gaps
    pub fn is_contiguous(&self) -> bool {
        self.first_gap().is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }
}

/// All batches of a merged mesh, addressable by `(lod, section)`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchMap {
    lods: Vec<Vec<Batch>>,
}

impl BatchMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty map already addressing `num_lods` LODs
    pub fn with_lods(num_lods: usize) -> Self {
        Self {
            lods: vec![Vec::new(); num_lods],
        }
    }

    /// Store the batch for `(lod, section)`, replacing any previous one
    pub fn save_batch(&mut self, lod: usize, section: usize, batch: Batch) {
        if self.lods.len() <= lod {
            self.lods.resize_with(lod + 1, Vec::new);
        }
        let sections = &mut self.lods[lod];
        if sections.len() <= section {
            sections.resize_with(section + 1, Batch::default);
        }
        sections[section] = batch;
    }

    pub fn batch(&self, lod: usize, section: usize) -> Option<&Batch> {
        self.lods.get(lod)?.get(section)
    }

    pub fn num_lods(&self) -> usize {
        self.lods.len()
    }

    pub fn num_sections(&self, lod: usize) -> usize {
        self.lods.get(lod).map_or(0, Vec::len)
    }

    /// Iterate `((lod, section), batch)` in LOD-major order
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), &Batch)> {
        self.lods.iter().enumerate().flat_map(|(lod, sections)| {
            sections
                .iter()
                .enumerate()
                .map(move |(section, batch)| ((lod, section), batch))
        })
    }

    /// Total number of elements over all batches
    pub fn total_elements(&self) -> usize {
        self.iter().map(|(_, batch)| batch.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lods.is_empty()
    }
}

/// What to do when a section's batches do not add up to its triangle count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountingPolicy {
    /// Fail the reconstruction
    Strict,
    /// Log a warning and keep the batch as reconstructed
    BestEffort,
}

impl Default for AccountingPolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Strict
        } else {
            Self::BestEffort
        }
    }
}

/// Bounds of a source expressed relative to the pivot
pub fn pivot_relative_bounds<S: SourcePrimitive + ?Sized>(source: &S, pivot: Vec3) -> BoxSphereBounds {
    let origin = Transform::from_translation(pivot);
    let offset = source.world_transform().relative_to(&origin);
    source.mesh().bounds.transform_by(&offset)
}

/// Check coverage and contiguity of `batches` against `merged`
pub fn verify(merged: &StaticMesh, batches: &BatchMap) -> BatchResult<()> {
    for (lod, mesh_lod) in merged.lods.iter().enumerate() {
        for (section, mesh_section) in mesh_lod.sections.iter().enumerate() {
            let batch = batches
                .batch(lod, section)
                .ok_or(BatchError::MissingBatch { lod, section })?;

            if let Some(element) = batch.first_gap() {
                return Err(BatchError::NonContiguous { lod, section, element });
            }

            let expected = u64::from(mesh_section.num_triangles);
            let actual = batch.total_triangles();
            if actual != expected {
                return Err(BatchError::AccountingMismatch {
                    lod,
                    section,
                    expected,
                    actual,
                });
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct Contribution {
    source_index: usize,
    num_triangles: u32,
}

/// One appended record: `None` keeps the slot of a source section that
/// wrote into a different merged section.
#[derive(Debug, Clone, Copy)]
struct Record {
    lod: usize,
    section: usize,
    contribution: Option<Contribution>,
}

struct SectionAccumulator<'a> {
    material: Option<&'a MaterialRef>,
    total_triangles: u32,
    records: Vec<Option<Contribution>>,
}

/// Rebuilds the [`BatchMap`] of a merged mesh from its merge sources
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchReconstructor {
    policy: AccountingPolicy,
    parallel: bool,
}

impl BatchReconstructor {
    pub fn new(policy: AccountingPolicy) -> Self {
        Self {
            policy,
            parallel: false,
        }
    }

    /// Gather per-source records on the rayon pool
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn policy(&self) -> AccountingPolicy {
        self.policy
    }

    /// Reconstruct batches for `merged`.
    ///
    /// `sources` must be in the exact order given to the merge service and
    /// `pivot` is the world-space point the merged mesh was built around.
    pub fn reconstruct<S>(&self, merged: &StaticMesh, sources: &[S], pivot: Vec3) -> BatchResult<BatchMap>
    where
        S: SourcePrimitive + Sync,
    {
        let mut accumulators: Vec<Vec<SectionAccumulator<'_>>> = merged
            .lods
            .iter()
            .map(|lod| {
                lod.sections
                    .iter()
                    .map(|section| SectionAccumulator {
                        material: merged.material(section.material_index),
                        total_triangles: section.num_triangles,
                        records: Vec::new(),
                    })
                    .collect()
            })
            .collect();

        let materials: Vec<Vec<Option<&MaterialRef>>> = accumulators
            .iter()
            .map(|lod| lod.iter().map(|acc| acc.material).collect())
            .collect();

        let gathered: Vec<(usize, BoxSphereBounds, Vec<Record>)> = if self.parallel {
            let mut gathered: Vec<_> = sources
                .par_iter()
                .enumerate()
                .map(|(index, source)| {
                    (index, pivot_relative_bounds(source, pivot), source_records(index, source, &materials))
                })
                .collect();
            // Packing below depends on input order
            gathered.sort_by_key(|(index, _, _)| *index);
            gathered
        } else {
            sources
                .iter()
                .enumerate()
                .map(|(index, source)| {
                    (index, pivot_relative_bounds(source, pivot), source_records(index, source, &materials))
                })
                .collect()
        };

        let mut bounds = Vec::with_capacity(gathered.len());
        for (_, source_bounds, records) in gathered {
            bounds.push(source_bounds);
            for record in records {
                accumulators[record.lod][record.section]
                    .records
                    .push(record.contribution);
            }
        }

        let mut map = BatchMap::with_lods(merged.num_lods());
        for (lod, sections) in accumulators.into_iter().enumerate() {
            for (section, acc) in sections.into_iter().enumerate() {
                let packed = pack(&acc, &bounds);
                self.check_accounting(lod, section, &acc, &packed)?;
                map.save_batch(lod, section, packed.batch);
            }
        }

        log::debug!(
            "Reconstructed {} batch elements for '{}' from {} sources",
            map.total_elements(),
            merged.name,
            sources.len()
        );
        Ok(map)
    }

    fn check_accounting(
        &self,
        lod: usize,
        section: usize,
        acc: &SectionAccumulator<'_>,
        packed: &Packed,
    ) -> BatchResult<()> {
        let expected = u64::from(acc.total_triangles);
        let actual = packed.claimed;
        if actual == expected {
            return Ok(());
        }

        let error = BatchError::AccountingMismatch {
            lod,
            section,
            expected,
            actual,
        };
        match self.policy {
            AccountingPolicy::Strict => Err(error),
            AccountingPolicy::BestEffort => {
                if packed.truncated {
                    log::warn!(
                        "{error}; triangle indices overflow, keeping the first {} elements",
                        packed.batch.len()
                    );
                    return Ok(());
                }
                log::warn!("{error}; keeping reconstructed batch");
                Ok(())
            }
        }
    }
}

/// Records one source appends, in append order.
///
/// Every section of the source adds one record to every merged section of
/// the same LOD: a real contribution where the materials match, `None`
/// elsewhere.
fn source_records<S: SourcePrimitive + ?Sized>(
    source_index: usize,
    source: &S,
    materials: &[Vec<Option<&MaterialRef>>],
) -> Vec<Record> {
    let mesh = source.mesh();
    let mut records = Vec::new();

    for (lod, mesh_lod) in mesh.lods.iter().enumerate() {
        let Some(merged_sections) = materials.get(lod) else {
            log::debug!(
                "'{}' has LOD {} which the merged mesh lacks, skipping",
                source.name(),
                lod
            );
            break;
        };

        for mesh_section in &mesh_lod.sections {
            let material = source.effective_material(mesh_section.material_index);
            if material.is_none() {
                log::debug!(
                    "'{}' LOD {} has no material in slot {}",
                    source.name(),
                    lod,
                    mesh_section.material_index
                );
            }

            for (section, merged_material) in merged_sections.iter().enumerate() {
                let matches = matches!((material, merged_material), (Some(a), Some(b)) if a == *b);
                records.push(Record {
                    lod,
                    section,
                    contribution: matches.then_some(Contribution {
                        source_index,
                        num_triangles: mesh_section.num_triangles,
                    }),
                });
            }
        }
    }
    records
}

/// Packed batch of one section
struct Packed {
    batch: Batch,
    /// Triangles claimed by all real contributions, packed or not
    claimed: u64,
    /// Packing stopped because indices no longer fit in `u32`
    truncated: bool,
}

fn pack(acc: &SectionAccumulator<'_>, bounds: &[BoxSphereBounds]) -> Packed {
    let mut packed = Packed {
        batch: Batch::default(),
        claimed: 0,
        truncated: false,
    };
    let mut next_index = 0u32;
    for contribution in acc.records.iter().flatten() {
        packed.claimed += u64::from(contribution.num_triangles);
        if packed.truncated {
            continue;
        }
        let Some(end_index) = next_index.checked_add(contribution.num_triangles) else {
            packed.truncated = true;
            continue;
        };
        packed.batch.elements.push(BatchElement {
            bounds: bounds[contribution.source_index],
            first_index: next_index,
            num_triangles: contribution.num_triangles,
            source_index: contribution.source_index,
        });
        next_index = end_index;
    }
    packed
}

/// Reconstruct with the default policy on the calling thread
pub fn reconstruct<S>(merged: &StaticMesh, sources: &[S], pivot: Vec3) -> BatchResult<BatchMap>
where
    S: SourcePrimitive + Sync,
{
    BatchReconstructor::default().reconstruct(merged, sources, pivot)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::math::Aabb;
    use crate::mesh::MeshComponent;

    fn material(name: &str) -> MaterialRef {
        MaterialRef::new(name)
    }

    fn cube(material_name: &str, lods: &[u32]) -> Arc<StaticMesh> {
        let mut mesh = StaticMesh::new(format!("SM_Cube_{material_name}"), vec![material(material_name)])
            .with_bounds(BoxSphereBounds::from_aabb(&Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0))));
        for &triangles in lods {
            mesh = mesh.with_lod(&[(0, triangles)]);
        }
        Arc::new(mesh)
    }

    fn placed(name: &str, mesh: &Arc<StaticMesh>, position: Vec3) -> MeshComponent {
        MeshComponent::new(name, Arc::clone(mesh), Transform::from_translation(position))
    }

    fn strict() -> BatchReconstructor {
        BatchReconstructor::new(AccountingPolicy::Strict)
    }

    fn assert_vec_eq(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-4, "{a:?} != {b:?}");
    }

    #[test]
    fn test_two_cubes_around_midpoint() {
        let mesh = cube("M_Stone", &[1000]);
        let d = Vec3::new(4.0, 0.0, 0.0);
        let center = Vec3::new(10.0, 5.0, 0.0);
        let sources = [placed("A", &mesh, center - d), placed("B", &mesh, center + d)];
        let merged = StaticMesh::new("SM_MERGED", vec![material("M_Stone")]).with_lod(&[(0, 2000)]);

        let map = strict().reconstruct(&merged, &sources, center).unwrap();
        let batch = map.batch(0, 0).unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!((batch.elements[0].first_index, batch.elements[0].num_triangles), (0, 1000));
        assert_eq!((batch.elements[1].first_index, batch.elements[1].num_triangles), (1000, 1000));
        assert_vec_eq(batch.elements[0].bounds.origin, -d);
        assert_vec_eq(batch.elements[1].bounds.origin, d);
        assert_vec_eq(batch.elements[0].bounds.box_extent, Vec3::ONE);
    }

    #[test]
    fn test_sections_split_by_material() {
        let a = cube("M_A", &[300]);
        let b = cube("M_B", &[50]);
        let sources = [
            placed("P1", &a, Vec3::ZERO),
            placed("P2", &a, Vec3::X),
            placed("P3", &b, Vec3::Y),
        ];
        let merged = StaticMesh::new("SM_MERGED", vec![material("M_A"), material("M_B")])
            .with_lod(&[(0, 600), (1, 50)]);

        let map = strict().reconstruct(&merged, &sources, Vec3::ZERO).unwrap();

        let section_a = map.batch(0, 0).unwrap();
        assert_eq!(section_a.elements.iter().map(|e| e.source_index).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(section_a.total_triangles(), 600);

        let section_b = map.batch(0, 1).unwrap();
        assert_eq!(section_b.len(), 1);
        assert_eq!(section_b.elements[0].source_index, 2);
        assert_eq!(section_b.elements[0].first_index, 0);
        assert_eq!(section_b.total_triangles(), 50);

        assert!(verify(&merged, &map).is_ok());
    }

    #[test]
    fn test_source_missing_lod() {
        let full = cube("M_A", &[100, 40]);
        let single = cube("M_A", &[80]);
        let sources = [
            placed("Full0", &full, Vec3::ZERO),
            placed("Single", &single, Vec3::X),
            placed("Full1", &full, Vec3::Y),
        ];
        let merged = StaticMesh::new("SM_MERGED", vec![material("M_A")])
            .with_lod(&[(0, 280)])
            .with_lod(&[(0, 80)]);

        let map = strict().reconstruct(&merged, &sources, Vec3::ZERO).unwrap();

        let lod1 = map.batch(1, 0).unwrap();
        assert_eq!(lod1.elements.iter().map(|e| e.source_index).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(lod1.elements[1].first_index, 40);
        assert_eq!(lod1.total_triangles(), 80);
        assert_eq!(map.batch(0, 0).unwrap().len(), 3);
    }

    #[test]
    fn test_input_order_drives_element_order() {
        let small = cube("M_A", &[10]);
        let large = cube("M_A", &[90]);
        let merged = StaticMesh::new("SM_MERGED", vec![material("M_A")]).with_lod(&[(0, 100)]);

        let forward = [placed("Small", &small, -Vec3::X), placed("Large", &large, Vec3::X)];
        let reversed = [placed("Large", &large, Vec3::X), placed("Small", &small, -Vec3::X)];

        let f = strict().reconstruct(&merged, &forward, Vec3::ZERO).unwrap();
        let r = strict().reconstruct(&merged, &reversed, Vec3::ZERO).unwrap();

        let f = &f.batch(0, 0).unwrap().elements;
        let r = &r.batch(0, 0).unwrap().elements;
        assert_eq!((f[0].num_triangles, f[1].first_index), (10, 10));
        assert_eq!((r[0].num_triangles, r[1].first_index), (90, 90));
        assert_eq!(f[0].bounds, r[1].bounds);
        assert_eq!(f[1].bounds, r[0].bounds);
    }

    #[test]
    fn test_unmatched_material_contributes_nothing() {
        let a = cube("M_A", &[100]);
        let glass = cube("M_Glass", &[30]);
        let sources = [
            placed("A", &a, Vec3::ZERO),
            placed("Glass", &glass, Vec3::X),
            placed("A2", &a, Vec3::Y),
        ];
        let merged = StaticMesh::new("SM_MERGED", vec![material("M_A")]).with_lod(&[(0, 200)]);

        let map = strict().reconstruct(&merged, &sources, Vec3::ZERO).unwrap();

        assert!(map.iter().all(|(_, batch)| batch.elements.iter().all(|e| e.source_index != 1)));
        assert_eq!(map.batch(0, 0).unwrap().elements[1].first_index, 100);
    }

    #[test]
    fn test_material_override_redirects_section() {
        let a = cube("M_A", &[70]);
        let sources = [
            placed("Plain", &a, Vec3::ZERO),
            placed("Painted", &a, Vec3::X).with_override(0, material("M_B")),
        ];
        let merged = StaticMesh::new("SM_MERGED", vec![material("M_A"), material("M_B")])
            .with_lod(&[(0, 70), (1, 70)]);

        let map = strict().reconstruct(&merged, &sources, Vec3::ZERO).unwrap();

        assert_eq!(map.batch(0, 0).unwrap().elements[0].source_index, 0);
        assert_eq!(map.batch(0, 1).unwrap().elements[0].source_index, 1);
        assert_eq!(map.batch(0, 1).unwrap().elements[0].first_index, 0);
    }

    #[test]
    fn test_multiple_sections_same_material() {
        let mesh = Arc::new(
            StaticMesh::new("SM_Split", vec![material("M_A")])
                .with_lod(&[(0, 12), (0, 8)]),
        );
        let sources = [placed("Split", &mesh, Vec3::ZERO), placed("Split2", &mesh, Vec3::Z)];
        let merged = StaticMesh::new("SM_MERGED", vec![material("M_A")]).with_lod(&[(0, 40)]);

        let map = strict().reconstruct(&merged, &sources, Vec3::ZERO).unwrap();
        let batch = map.batch(0, 0).unwrap();

        let runs: Vec<_> = batch.elements.iter().map(|e| (e.source_index, e.first_index, e.num_triangles)).collect();
        assert_eq!(runs, vec![(0, 0, 12), (0, 12, 8), (1, 20, 12), (1, 32, 8)]);
        assert!(batch.is_contiguous());
    }

    #[test]
    fn test_bounds_follow_world_transform() {
        let mesh = cube("M_A", &[12]);
        let pivot = Vec3::new(1.0, 2.0, 3.0);
        let transform = Transform::new(
            Vec3::new(6.0, 2.0, 3.0),
            glam::Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
            Vec3::new(3.0, 1.0, 1.0),
        );
        let sources = [MeshComponent::new("Rotated", Arc::clone(&mesh), transform)];
        let merged = StaticMesh::new("SM_MERGED", vec![material("M_A")]).with_lod(&[(0, 12)]);

        let map = strict().reconstruct(&merged, &sources, pivot).unwrap();
        let bounds = map.batch(0, 0).unwrap().elements[0].bounds;

        let expected = mesh
            .bounds
            .transform_by(&transform.relative_to(&Transform::from_translation(pivot)));
        assert_eq!(bounds, expected);
        assert_vec_eq(bounds.origin, Vec3::new(5.0, 0.0, 0.0));
        assert_vec_eq(bounds.box_extent, Vec3::new(1.0, 3.0, 1.0));
    }

    #[test]
    fn test_strict_policy_reports_mismatch() {
        let mesh = cube("M_A", &[1000]);
        let sources = [placed("A", &mesh, Vec3::ZERO), placed("B", &mesh, Vec3::X)];
        let merged = StaticMesh::new("SM_MERGED", vec![material("M_A")]).with_lod(&[(0, 2500)]);

        let error = strict().reconstruct(&merged, &sources, Vec3::ZERO).unwrap_err();
        assert_eq!(
            error,
            BatchError::AccountingMismatch {
                lod: 0,
                section: 0,
                expected: 2500,
                actual: 2000,
            }
        );
    }

    #[test]
    fn test_best_effort_policy_keeps_batch() {
        let mesh = cube("M_A", &[1000]);
        let sources = [placed("A", &mesh, Vec3::ZERO), placed("B", &mesh, Vec3::X)];
        let merged = StaticMesh::new("SM_MERGED", vec![material("M_A")]).with_lod(&[(0, 2500)]);

        let map = BatchReconstructor::new(AccountingPolicy::BestEffort)
            .reconstruct(&merged, &sources, Vec3::ZERO)
            .unwrap();

        assert_eq!(map.batch(0, 0).unwrap().total_triangles(), 2000);
        assert!(matches!(
            verify(&merged, &map),
            Err(BatchError::AccountingMismatch { expected: 2500, .. })
        ));
    }

    #[test]
    fn test_index_overflow_is_a_mismatch() {
        let huge = cube("M_A", &[3_000_000_000]);
        let sources = [placed("A", &huge, Vec3::ZERO), placed("B", &huge, Vec3::X)];
        let merged = StaticMesh::new("SM_MERGED", vec![material("M_A")]).with_lod(&[(0, 10)]);

        let error = strict().reconstruct(&merged, &sources, Vec3::ZERO).unwrap_err();
        assert_eq!(
            error,
            BatchError::AccountingMismatch {
                lod: 0,
                section: 0,
                expected: 10,
                actual: 6_000_000_000,
            }
        );

        // Best effort keeps only the runs whose indices fit
        let map = BatchReconstructor::new(AccountingPolicy::BestEffort)
            .reconstruct(&merged, &sources, Vec3::ZERO)
            .unwrap();
        let batch = map.batch(0, 0).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.elements[0].end_index(), 3_000_000_000);
        assert!(batch.is_contiguous());
    }

    #[test]
    fn test_end_index_saturates() {
        let element = BatchElement {
            bounds: BoxSphereBounds::ZERO,
            first_index: u32::MAX - 1,
            num_triangles: 5,
            source_index: 0,
        };
        assert_eq!(element.end_index(), u32::MAX);
    }

    #[test]
    fn test_trailing_empty_lod_is_addressable() {
        let mesh = cube("M_A", &[10]);
        let sources = [placed("A", &mesh, Vec3::ZERO)];
        let mut merged = StaticMesh::new("SM_MERGED", vec![material("M_A")]).with_lod(&[(0, 10)]);
        merged.lods.push(Default::default());

        let map = strict().reconstruct(&merged, &sources, Vec3::ZERO).unwrap();
        assert_eq!(map.num_lods(), merged.num_lods());
        assert_eq!(map.num_sections(1), 0);
        assert!(verify(&merged, &map).is_ok());
    }

    #[test]
    fn test_unclaimed_section_is_empty() {
        let mesh = cube("M_A", &[10]);
        let sources = [placed("A", &mesh, Vec3::ZERO)];
        let merged = StaticMesh::new("SM_MERGED", vec![material("M_A"), material("M_Unused")])
            .with_lod(&[(0, 10), (1, 0)]);

        let map = strict().reconstruct(&merged, &sources, Vec3::ZERO).unwrap();
        assert!(map.batch(0, 1).unwrap().is_empty());
        assert_eq!(map.num_sections(0), 2);
    }

    #[test]
    fn test_source_lod_beyond_merged_is_ignored() {
        let deep = cube("M_A", &[50, 20, 5]);
        let sources = [placed("Deep", &deep, Vec3::ZERO)];
        let merged = StaticMesh::new("SM_MERGED", vec![material("M_A")]).with_lod(&[(0, 50)]);

        let map = strict().reconstruct(&merged, &sources, Vec3::ZERO).unwrap();
        assert_eq!(map.num_lods(), 1);
        assert_eq!(map.total_elements(), 1);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let a = cube("M_A", &[30, 10]);
        let b = cube("M_B", &[20, 6]);
        let sources: Vec<_> = (0..64)
            .map(|i| {
                let mesh = if i % 3 == 0 { &b } else { &a };
                placed(&format!("P{i}"), mesh, Vec3::new(i as f32, 0.0, 0.0))
            })
            .collect();
        let count_b = sources.iter().filter(|s| s.mesh.materials[0].name() == "M_B").count() as u32;
        let count_a = 64 - count_b;
        let merged = StaticMesh::new("SM_MERGED", vec![material("M_B"), material("M_A")])
            .with_lod(&[(0, 20 * count_b), (1, 30 * count_a)])
            .with_lod(&[(0, 6 * count_b), (1, 10 * count_a)]);

        let sequential = strict().reconstruct(&merged, &sources, Vec3::ZERO).unwrap();
        let parallel = strict().parallel(true).reconstruct(&merged, &sources, Vec3::ZERO).unwrap();

        assert_eq!(sequential, parallel);
        assert!(verify(&merged, &parallel).is_ok());
    }

    #[test]
    fn test_verify_flags_missing_and_gaps() {
        let merged = StaticMesh::new("SM_MERGED", vec![material("M_A")]).with_lod(&[(0, 10)]);
        assert_eq!(
            verify(&merged, &BatchMap::new()),
            Err(BatchError::MissingBatch { lod: 0, section: 0 })
        );

        let element = BatchElement {
            bounds: BoxSphereBounds::ZERO,
            first_index: 0,
            num_triangles: 5,
            source_index: 0,
        };
        let mut map = BatchMap::new();
        map.save_batch(
            0,
            0,
            Batch {
                elements: vec![element, BatchElement { first_index: 6, ..element }],
            },
        );
        assert_eq!(
            verify(&merged, &map),
            Err(BatchError::NonContiguous { lod: 0, section: 0, element: 1 })
        );
    }

    #[test]
    fn test_batch_map_addressing() {
        let mut map = BatchMap::new();
        map.save_batch(2, 1, Batch::default());

        assert_eq!(map.num_lods(), 3);
        assert_eq!(map.num_sections(0), 0);
        assert_eq!(map.num_sections(2), 2);
        assert!(map.batch(2, 1).is_some());
        assert!(map.batch(3, 0).is_none());
        assert_eq!(map.iter().map(|(key, _)| key).collect::<Vec<_>>(), vec![(2, 0), (2, 1)]);
    }
}
