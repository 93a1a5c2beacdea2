//! Merge selection
//!
//! The components picked for a merge, grouped by owning actor, each of which
//! can be toggled in or out before the merge runs.

use gigamerge_core::{MeshComponent, SourcePrimitive};

/// One candidate component
#[derive(Debug, Clone)]
pub struct SelectionEntry {
    /// Owning actor
    pub actor: String,
    /// The component itself
    pub component: MeshComponent,
    /// Whether it takes part in the merge
    pub selected: bool,
}

/// Components offered for merging, in merge order
#[derive(Debug, Clone, Default)]
pub struct MergeSelection {
    entries: Vec<SelectionEntry>,
}

impl MergeSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer the components of an actor, all selected.
    ///
    /// Components without any renderable section are left out. Returns the
    /// number of components added.
    pub fn add_actor(
        &mut self,
        actor: impl Into<String>,
        components: impl IntoIterator<Item = MeshComponent>,
    ) -> usize {
        let actor = actor.into();
        let mut added = 0;
        for component in components {
            if !component.mesh().has_renderable_sections() {
                log::warn!("Skipping '{}' on '{}': mesh has no sections", component.name(), actor);
                continue;
            }
            self.entries.push(SelectionEntry {
                actor: actor.clone(),
                component,
                selected: true,
            });
            added += 1;
        }
        added
    }

    pub fn entries(&self) -> &[SelectionEntry] {
        &self.entries
    }

    /// Toggle one entry, returns false if `index` is out of range
    pub fn set_selected(&mut self, index: usize, selected: bool) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) => {
                entry.selected = selected;
                true
            }
            None => false,
        }
    }

    /// Toggle every component of an actor, returns how many entries changed
    pub fn set_actor_selected(&mut self, actor: &str, selected: bool) -> usize {
        let mut changed = 0;
        for entry in self.entries.iter_mut().filter(|e| e.actor == actor) {
            if entry.selected != selected {
                entry.selected = selected;
                changed += 1;
            }
        }
        changed
    }

    pub fn num_selected(&self) -> usize {
        self.entries.iter().filter(|e| e.selected).count()
    }

    /// Selected components in merge order
    pub fn selected_components(&self) -> Vec<MeshComponent> {
        self.entries
            .iter()
            .filter(|e| e.selected)
            .map(|e| e.component.clone())
            .collect()
    }

    /// Distinct actors with at least one selected component, first-seen order
    pub fn selected_actor_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for entry in self.entries.iter().filter(|e| e.selected) {
            if !names.contains(&entry.actor.as_str()) {
                names.push(&entry.actor);
            }
        }
        names
    }

    /// Drop every entry
    pub fn reset(&mut self) {
        self.entries.clear();
    }
}
