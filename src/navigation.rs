//! The navigation (table of contents) view.

use std::path::{Path, PathBuf};

use crate::manifest::{ItemHandle, ManifestItem};
use crate::package::Package;

/// An ordered list of manifest items shown in the table of contents.
///
/// Entries are handles into the [`Package`] registry, so the view always
/// reflects the registry: an entry whose item is gone is skipped.
#[derive(Debug, Clone, Default)]
pub struct Navigation {
    entries: Vec<ItemHandle>,
    stylesheet: Option<PathBuf>,
}

impl Navigation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Order of calls is the order of the TOC.
    pub fn add(&mut self, handle: ItemHandle) {
        self.entries.push(handle);
    }

    /// Live entries in TOC order.
    pub fn view<'a>(&'a self, package: &'a Package) -> impl Iterator<Item = &'a ManifestItem> + 'a {
        self.entries.iter().filter_map(|&handle| package.get(handle))
    }

    /// Raw handles, including any that no longer resolve.
    pub fn handles(&self) -> &[ItemHandle] {
        &self.entries
    }

    /// Stylesheet linked from the navigation document, relative to the
    /// package document.
    pub fn stylesheet(&self) -> Option<&Path> {
        self.stylesheet.as_deref()
    }

    pub fn set_stylesheet(&mut self, path: impl Into<PathBuf>) {
        self.stylesheet = Some(path.into());
    }
}
