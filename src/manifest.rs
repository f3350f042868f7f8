//! Manifest items and the per-file metadata they carry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Key/value information about one asset.
///
/// Every registered item has at least `media-type`. Content documents may
/// add keys extracted from the file itself, such as `title`, `spine`,
/// `toc` and `properties`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMetadata(BTreeMap<String, String>);

impl FileMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Look up `key`, returning `default` when it is absent.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The MIME type of the asset; empty only for hand-built metadata.
    pub fn media_type(&self) -> &str {
        self.get_or("media-type", "")
    }

    pub fn title(&self) -> Option<&str> {
        self.get("title")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FileMetadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for FileMetadata {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.0
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}

/// Stable reference to an item in a [`Package`](crate::Package) registry.
///
/// Handles are plain indices: they stay valid as the registry grows and
/// resolve to `None` once the slot they name has been vacated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemHandle(pub u32);

impl ItemHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One asset of the publication.
///
/// Everything in the package, content documents and linked resources
/// alike, is listed in the manifest exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    /// XML id; empty until the item is registered.
    pub id: String,
    /// Path relative to the package document. Never goes upwards.
    pub path: PathBuf,
    /// Space-separated manifest properties (`nav`, `svg`, `scripted`, ...).
    pub properties: String,
    /// Space-separated `<itemref>` properties (`page-spread-left`, ...).
    pub spine_properties: String,
    pub metadata: FileMetadata,
    pub in_spine: bool,
    pub in_toc: bool,
}

impl ManifestItem {
    pub fn new(path: impl Into<PathBuf>, metadata: FileMetadata) -> Self {
        Self {
            id: String::new(),
            path: path.into(),
            properties: String::new(),
            spine_properties: String::new(),
            metadata,
            in_spine: false,
            in_toc: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_properties(mut self, properties: impl Into<String>) -> Self {
        self.properties = properties.into();
        self
    }

    /// Place the item in the reading order.
    pub fn in_spine(mut self) -> Self {
        self.in_spine = true;
        self
    }

    /// Place the item in the reading order and the table of contents.
    pub fn in_toc(mut self) -> Self {
        self.in_spine = true;
        self.in_toc = true;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn media_type(&self) -> &str {
        self.metadata.media_type()
    }
}

/// Join two space-separated token lists, `first` before `second`.
pub(crate) fn join_properties(first: &str, second: &str) -> String {
    first
        .split_ascii_whitespace()
        .chain(second.split_ascii_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_get_or() {
        let meta: FileMetadata = [("media-type", "image/png")].into_iter().collect();
        assert_eq!(meta.media_type(), "image/png");
        assert_eq!(meta.get_or("spine", "include"), "include");
        assert_eq!(meta.get("spine"), None);
        assert_eq!(meta.title(), None);
    }

    #[test]
    fn test_in_toc_implies_spine() {
        let item = ManifestItem::new("a.xhtml", FileMetadata::new()).in_toc();
        assert!(item.in_spine);
        assert!(item.in_toc);
    }

    #[test]
    fn test_join_properties() {
        assert_eq!(join_properties("", ""), "");
        assert_eq!(join_properties("nav", ""), "nav");
        assert_eq!(join_properties("", "svg scripted"), "svg scripted");
        assert_eq!(join_properties("nav ", " svg"), "nav svg");
    }
}
