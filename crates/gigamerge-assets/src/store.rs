//! Asset storage
//!
//! [`AssetStore`] is what the merge tool needs from the host's asset system:
//! existence checks, persistence and registration. [`ContentDirectory`]
//! implements it on a plain directory, mapping `/Game/Dir/Name` to
//! `<root>/Dir/Name.<ext>` and keeping a JSON index of registered assets.

use std::fs;
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;

use gigamerge_core::StaticMesh;

use crate::package::{short_name, validate_package_name};
use crate::{AssetError, AssetId, AssetMeta, AssetResult, AssetType, GigaMesh};

const MAGIC: [u8; 4] = *b"GGMA";
const FORMAT_VERSION: u32 = 1;
const INDEX_FILE: &str = "asset_index.json";

/// Host asset system used by the merge tool
pub trait AssetStore {
    /// True if something already lives in `package`
    fn exists(&self, package: &str) -> bool;

    /// Persist the merged static mesh produced by the merge service
    fn save_static_mesh(&self, package: &str, mesh: &StaticMesh) -> AssetResult<AssetMeta>;

    /// Persist a GigaMesh with its batches
    fn save_giga_mesh(&self, asset: &GigaMesh) -> AssetResult<AssetMeta>;

    /// Load a previously saved GigaMesh
    fn load_giga_mesh(&self, package: &str) -> AssetResult<GigaMesh>;

    /// Announce a newly created asset
    fn register(&self, meta: AssetMeta) -> AssetResult<()>;

    /// All registered assets, ordered by package
    fn registered(&self) -> Vec<AssetMeta>;
}

/// Asset store backed by a content directory
pub struct ContentDirectory {
    /// Directory `/Game` maps to
    root: PathBuf,
    /// Registered assets
    registry: RwLock<AHashMap<AssetId, AssetMeta>>,
}

impl ContentDirectory {
    /// Create a store over `root` with an empty registry
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            registry: RwLock::new(AHashMap::new()),
        }
    }

    /// Create a store over `root`, loading its index if there is one
    pub fn open(root: impl Into<PathBuf>) -> AssetResult<Self> {
        let store = Self::new(root);
        let index_path = store.root.join(INDEX_FILE);
        if index_path.exists() {
            let text = fs::read_to_string(&index_path)?;
            let metas: Vec<AssetMeta> = serde_json::from_str(&text)
                .map_err(|e| AssetError::SerializationError(e.to_string()))?;
            log::debug!("Loaded {} assets from {}", metas.len(), index_path.display());

            let mut registry = store.registry.write();
            for meta in metas {
                registry.insert(meta.id, meta);
            }
        }
        Ok(store)
    }

    /// Get the content root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Payload path of `package` relative to the root
    pub fn relative_path(&self, package: &str, asset_type: AssetType) -> AssetResult<PathBuf> {
        validate_package_name(package)?;

        // Drop the mount point segment
        let mut path: PathBuf = package.split('/').skip(2).collect();
        if path.as_os_str().is_empty() {
            path = PathBuf::from(short_name(package));
        }
        path.set_extension(asset_type.extension());
        Ok(path)
    }

    fn write_payload<T: Serialize>(&self, relative: &Path, payload: &T) -> AssetResult<()> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = bincode::serialize(&(MAGIC, FORMAT_VERSION, payload))
            .map_err(|e| AssetError::SerializationError(e.to_string()))?;
        fs::write(&path, bytes)?;
        log::debug!("Wrote {} bytes to {}", path.metadata().map(|m| m.len()).unwrap_or(0), path.display());
        Ok(())
    }

    fn read_payload<T: DeserializeOwned>(&self, relative: &Path) -> AssetResult<T> {
        let path = self.root.join(relative);
        let bytes = fs::read(&path)?;
        let (magic, version, payload): ([u8; 4], u32, T) =
            bincode::deserialize(&bytes).map_err(|e| AssetError::InvalidFormat {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        if magic != MAGIC {
            return Err(AssetError::InvalidFormat {
                path,
                reason: "bad magic".to_string(),
            });
        }
        if version != FORMAT_VERSION {
            return Err(AssetError::InvalidFormat {
                path,
                reason: format!("unsupported version {version}"),
            });
        }
        Ok(payload)
    }

    fn write_index(&self) -> AssetResult<()> {
        let metas = self.registered();
        let text = serde_json::to_string_pretty(&metas)
            .map_err(|e| AssetError::SerializationError(e.to_string()))?;
        fs::create_dir_all(&self.root)?;
        fs::write(self.root.join(INDEX_FILE), text)?;
        Ok(())
    }
}

impl AssetStore for ContentDirectory {
    fn exists(&self, package: &str) -> bool {
        if self.registry.read().values().any(|m| m.package == package) {
            return true;
        }
        [AssetType::StaticMesh, AssetType::GigaMesh].iter().any(|ty| {
            self.relative_path(package, *ty)
                .map(|p| self.root.join(p).exists())
                .unwrap_or(false)
        })
    }

    fn save_static_mesh(&self, package: &str, mesh: &StaticMesh) -> AssetResult<AssetMeta> {
        let path = self.relative_path(package, AssetType::StaticMesh)?;
        self.write_payload(&path, mesh)?;

        Ok(AssetMeta {
            id: AssetId::from_package(package),
            name: short_name(package).to_string(),
            package: package.to_string(),
            asset_type: AssetType::StaticMesh,
            path,
            batch_elements: 0,
        })
    }

    fn save_giga_mesh(&self, asset: &GigaMesh) -> AssetResult<AssetMeta> {
        let path = self.relative_path(&asset.package, AssetType::GigaMesh)?;
        self.write_payload(&path, asset)?;

        Ok(AssetMeta {
            id: asset.id,
            name: asset.name().to_string(),
            package: asset.package.clone(),
            asset_type: AssetType::GigaMesh,
            path,
            batch_elements: asset.batches.total_elements(),
        })
    }

    fn load_giga_mesh(&self, package: &str) -> AssetResult<GigaMesh> {
        let path = self.relative_path(package, AssetType::GigaMesh)?;
        if !self.root.join(&path).exists() {
            return Err(AssetError::NotFound(package.to_string()));
        }
        self.read_payload(&path)
    }

    fn register(&self, meta: AssetMeta) -> AssetResult<()> {
        log::info!("Registered {:?} {} ({})", meta.asset_type, meta.package, meta.id);
        self.registry.write().insert(meta.id, meta);
        self.write_index()
    }

    fn registered(&self) -> Vec<AssetMeta> {
        let mut metas: Vec<_> = self.registry.read().values().cloned().collect();
        metas.sort_by(|a, b| a.package.cmp(&b.package));
        metas
    }
}
