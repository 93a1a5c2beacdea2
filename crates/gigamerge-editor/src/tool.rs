//! Merge tool
//!
//! Runs a full merge: selected components go through the merge service, the
//! resulting mesh is duplicated into a GigaMesh, batches are rebuilt and
//! attached, and both assets are saved and registered.

use gigamerge_assets::package::{self, CONTENT_ROOT};
use gigamerge_assets::{AssetStore, GigaMesh};
use gigamerge_core::{MergeSettings, StaticMesh};

use crate::merge_service::MeshMergeService;
use crate::progress::ScopedSlowTask;
use crate::selection::MergeSelection;
use crate::{MergeError, MergeResult};

/// Merges the current selection into a GigaMesh
pub struct MergeTool<M, S> {
    settings: MergeSettings,
    selection: MergeSelection,
    service: M,
    store: S,
}

impl<M: MeshMergeService, S: AssetStore> MergeTool<M, S> {
    pub fn new(settings: MergeSettings, service: M, store: S) -> Self {
        Self {
            settings,
            selection: MergeSelection::new(),
            service,
            store,
        }
    }

    pub fn settings(&self) -> &MergeSettings {
        &self.settings
    }

    pub fn selection(&self) -> &MergeSelection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut MergeSelection {
        &mut self.selection
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// A merge needs at least two selected components
    pub fn can_merge(&self) -> bool {
        self.selection.num_selected() > 1
    }

    /// Package suggested for the merged static mesh
    pub fn default_package_name(&self) -> String {
        package::default_package_name(CONTENT_ROOT, self.selection.selected_actor_names())
    }

    /// Package of the GigaMesh for `package`, or for the default package
    pub fn default_asset_package_name(&self, package: Option<&str>) -> String {
        match package {
            Some(package) if !package.is_empty() => package::asset_package_name(package),
            _ => package::asset_package_name(&self.default_package_name()),
        }
    }

    /// Merge the selection into `package` and build the GigaMesh next to it
    pub fn run_merge(&mut self, package: &str) -> MergeResult<GigaMesh> {
        if !self.can_merge() {
            return Err(MergeError::NotEnoughSources(self.selection.num_selected()));
        }
        package::validate_package_name(package)?;

        let components = self.selection.selected_components();
        let output = {
            let _task = ScopedSlowTask::new("Merging actors...");
            if self.store.exists(package) {
                log::info!("'{package}' already exists, its users will see the new mesh");
            }
            self.service.merge(&components, &self.settings, package)?
        };

        let [static_mesh]: [StaticMesh; 1] = output
            .assets
            .try_into()
            .map_err(|assets: Vec<StaticMesh>| MergeError::UnexpectedAssetCount(assets.len()))?;

        let asset_package = self.default_asset_package_name(Some(package));
        let mut giga = GigaMesh::duplicate(&asset_package, &static_mesh);
        {
            let _task = ScopedSlowTask::new("Calculating batches...");
            let batches = self
                .settings
                .reconstructor()
                .reconstruct(&static_mesh, &components, output.pivot)?;
            giga.attach_batches(batches);
        }

        {
            let _task = ScopedSlowTask::new("Saving assets...");
            let mesh_meta = self.store.save_static_mesh(package, &static_mesh)?;
            let giga_meta = self.store.save_giga_mesh(&giga)?;
            self.store.register(mesh_meta)?;
            self.store.register(giga_meta)?;
        }

        log::info!(
            "Created '{}' with {} batch elements from {} components",
            giga.package,
            giga.batches.total_elements(),
            components.len()
        );
        self.selection.reset();
        Ok(giga)
    }
}
