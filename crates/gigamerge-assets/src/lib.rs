//! # GigaMerge Assets
//!
//! Asset side of the merge pipeline.
//!
//! ## Features
//! - Package-derived asset IDs
//! - Package naming for merged meshes and GigaMeshes
//! - The GigaMesh asset and its per-object culling query
//! - A content directory that persists and registers assets

pub mod giga_mesh;
pub mod package;
pub mod store;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use giga_mesh::GigaMesh;
pub use store::{AssetStore, ContentDirectory};

/// Asset errors
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("Invalid package name '{package}': {reason}")]
    InvalidPackageName { package: String, reason: String },

    #[error("Invalid asset file {path}: {reason}")]
    InvalidFormat { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result type for asset operations
pub type AssetResult<T> = Result<T, AssetError>;

/// Asset ID derived from the package name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId(pub u64);

impl AssetId {
    /// Create an asset ID from a package name
    pub fn from_package(package: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        package.hash(&mut hasher);
        Self(hasher.finish())
    }

    /// Get the raw ID value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Asset type categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetType {
    /// Plain merged mesh as produced by the merge service
    StaticMesh,
    /// Merged mesh with batches
    GigaMesh,
}

impl AssetType {
    /// File extension of the asset payload
    pub fn extension(&self) -> &'static str {
        match self {
            Self::StaticMesh => "smesh",
            Self::GigaMesh => "gmesh",
        }
    }
}

/// Asset metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMeta {
    /// Asset ID
    pub id: AssetId,
    /// Short asset name
    pub name: String,
    /// Long package name
    pub package: String,
    /// Asset type
    pub asset_type: AssetType,
    /// Payload path relative to the content directory
    pub path: PathBuf,
    /// Number of batch elements (GigaMeshes only)
    pub batch_elements: usize,
}
