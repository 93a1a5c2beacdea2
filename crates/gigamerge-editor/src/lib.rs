//! # GigaMerge Editor
//!
//! Editor-side merge tool for building GigaMeshes.
//!
//! ## Features
//! - Selection of the components to merge
//! - Merge service interface and a layout-only reference merger
//! - The merge pipeline: merge, duplicate, rebuild batches, save, register
//! - Scoped progress reporting

pub mod merge_service;
pub mod progress;
pub mod selection;
pub mod tool;

use thiserror::Error;

use gigamerge_assets::AssetError;
use gigamerge_core::BatchError;

pub use merge_service::{LayoutMergeService, MergeOutput, MeshMergeService};
pub use progress::ScopedSlowTask;
pub use selection::{MergeSelection, SelectionEntry};
pub use tool::MergeTool;

/// Merge errors
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Need at least two selected components to merge, have {0}")]
    NotEnoughSources(usize),

    #[error("Merge produced {0} assets, expected exactly one")]
    UnexpectedAssetCount(usize),

    #[error("Unsupported merge settings: {0}")]
    Unsupported(String),

    #[error("LOD {lod} section with material '{material}' exceeds the triangle index range")]
    TriangleOverflow { lod: usize, material: String },

    #[error("Batch reconstruction failed: {0}")]
    Batch(#[from] BatchError),

    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),
}

/// Result type for merge operations
pub type MergeResult<T> = Result<T, MergeError>;
