//! The package registry: metadata plus every manifest item.
//!
//! Items live in an append-only arena and are addressed by [`ItemHandle`].
//! The manifest and spine are not stored separately; both are traversals
//! over the arena, so they cannot drift out of sync with it.

use crate::id::IdGenerator;
use crate::manifest::{ItemHandle, ManifestItem};
use crate::metadata::Metadata;

/// The package document model.
#[derive(Debug, Clone, Default)]
pub struct Package {
    metadata: Metadata,
    /// Arena of registered items. A `None` slot has been vacated and is
    /// never reused.
    items: Vec<Option<ManifestItem>>,
    ids: IdGenerator,
}

impl Package {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a package around existing metadata.
    pub fn with_metadata(metadata: Metadata) -> Self {
        Self {
            metadata,
            ..Self::default()
        }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// Register an item and return its handle.
    ///
    /// Items without an id get the next generated one; explicit ids are
    /// kept as given. Ids are not checked for duplicates here.
    pub fn add_to_manifest(&mut self, mut item: ManifestItem) -> ItemHandle {
        if item.id.is_empty() {
            item.id = self.ids.next_id();
        }
        let handle = ItemHandle(self.items.len() as u32);
        self.items.push(Some(item));
        handle
    }

    /// Resolve a handle. Returns `None` for vacated or unknown slots.
    pub fn get(&self, handle: ItemHandle) -> Option<&ManifestItem> {
        self.items.get(handle.index()).and_then(Option::as_ref)
    }

    /// All live items in registration order.
    pub fn manifest_view(&self) -> impl Iterator<Item = &ManifestItem> {
        self.items.iter().flatten()
    }

    /// Live items in the reading order, in registration order.
    pub fn spine_view(&self) -> impl Iterator<Item = &ManifestItem> {
        self.manifest_view().filter(|item| item.in_spine)
    }

    /// Handles of all live items in registration order.
    pub fn handles(&self) -> impl Iterator<Item = ItemHandle> + '_ {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(i, _)| ItemHandle(i as u32))
    }

    /// Number of live items.
    pub fn len(&self) -> usize {
        self.manifest_view().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The id sequence as it stands after the registered items.
    ///
    /// The serializer clones this to number refinements without touching
    /// the package.
    pub fn ids(&self) -> &IdGenerator {
        &self.ids
    }

    #[cfg(test)]
    pub(crate) fn vacate(&mut self, handle: ItemHandle) -> Option<ManifestItem> {
        self.items.get_mut(handle.index()).and_then(Option::take)
    }
}
