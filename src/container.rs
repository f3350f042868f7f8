//! The EPUB container: the package, its navigation, and the files to copy.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::{Error, Result};
use crate::extract;
use crate::manifest::{FileMetadata, ItemHandle, ManifestItem, join_properties};
use crate::media_type::{self, guess_media_type};
use crate::navigation::Navigation;
use crate::package::Package;
use crate::util::{normalize_lexically, normalize_relative};
use crate::writer;

/// Directory holding the package document and every asset.
pub const CONTENTS_DIR: &str = "Contents";
/// File name of the generated navigation document.
pub const NAV_FILE: &str = "nav.xhtml";
/// File name of the generated package document.
pub const PACKAGE_FILE: &str = "package.opf";

/// Construction options for a [`Container`].
#[derive(Debug, Clone, Default)]
pub struct ContainerOptions {
    /// Keep the navigation document out of the reading order and the
    /// table of contents. It is still generated and listed in the manifest.
    pub omit_toc: bool,
}

/// The file hierarchy of an EPUB publication.
///
/// Assets are registered with [`add`](Container::add). XHTML and SVG
/// documents are scanned for `epub:` meta hints (see [`crate::extract`])
/// which decide their spine and TOC membership:
///
/// - `epub:spine` is `include` by default for XHTML and `omit` for SVG.
///   Items outside the spine never appear in the table of contents.
/// - `epub:toc` is `include` by default.
/// - `epub:properties` adds manifest properties after any given by the
///   caller.
///
/// # Example
///
/// ```no_run
/// use bindery::{Container, Creator};
///
/// let mut container = Container::new();
/// container.package_mut().metadata_mut().set_title("The Plastic Age");
/// container
///     .package_mut()
///     .metadata_mut()
///     .creators_mut()
///     .push(Creator::new("Percy Marks").with_role("aut"));
/// container.add_file("chapter-01.xhtml")?;
/// container.add("art/cover.png", "images/cover.png")?;
/// container.write("plastic-age")?;
/// # Ok::<(), bindery::Error>(())
/// ```
#[derive(Debug)]
pub struct Container {
    /// Local container path (`Contents/...`) -> source path.
    files: BTreeMap<PathBuf, PathBuf>,
    package: Package,
    navigation: Navigation,
}

impl Container {
    pub fn new() -> Self {
        Self::with_options(ContainerOptions::default())
    }

    pub fn with_options(options: ContainerOptions) -> Self {
        Self::with_package(Package::new(), options)
    }

    /// Build a container around an existing (normally empty) package.
    pub fn with_package(mut package: Package, options: ContainerOptions) -> Self {
        let metadata: FileMetadata = [
            ("title", "Table of Contents"),
            ("media-type", media_type::XHTML),
        ]
        .into_iter()
        .collect();

        let mut item = ManifestItem::new(NAV_FILE, metadata)
            .with_id("nav")
            .with_properties("nav");
        if !options.omit_toc {
            item = item.in_toc();
        }

        let in_toc = item.in_toc;
        let handle = package.add_to_manifest(item);

        let mut navigation = Navigation::new();
        if in_toc {
            navigation.add(handle);
        }

        Self {
            files: BTreeMap::new(),
            package,
            navigation,
        }
    }

    /// Add `path` under its file name.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<ItemHandle> {
        let path = path.as_ref();
        let local = path
            .file_name()
            .map(PathBuf::from)
            .ok_or_else(|| Error::InvalidLocalPath(path.to_path_buf()))?;
        self.add(path, local)
    }

    /// Add `source` to the container as `local`, relative to `Contents/`.
    pub fn add(&mut self, source: impl AsRef<Path>, local: impl AsRef<Path>) -> Result<ItemHandle> {
        self.add_with_properties(source, local, "")
    }

    /// Add `source` as `local` with extra manifest properties.
    ///
    /// Fails with [`Error::DuplicateAsset`] if `local` is already taken;
    /// in that case nothing is registered.
    pub fn add_with_properties(
        &mut self,
        source: impl AsRef<Path>,
        local: impl AsRef<Path>,
        properties: &str,
    ) -> Result<ItemHandle> {
        let source = source.as_ref();
        let local = local.as_ref();

        let local = normalize_relative(local)
            .ok_or_else(|| Error::InvalidLocalPath(local.to_path_buf()))?;
        if local == Path::new(NAV_FILE) || local == Path::new(PACKAGE_FILE) {
            return Err(Error::ReservedPath(local));
        }

        let key = Path::new(CONTENTS_DIR).join(&local);
        if let Some(existing) = self.files.get(&key) {
            return Err(Error::DuplicateAsset {
                source_path: source.to_path_buf(),
                conflicting_source: existing.clone(),
            });
        }

        let media_type = guess_media_type(&local);
        let (mut metadata, default_spine) = match media_type {
            media_type::XHTML => (extract::xhtml_metadata(source)?, "include"),
            media_type::SVG => (extract::svg_metadata(source)?, "omit"),
            _ => (FileMetadata::new(), "omit"),
        };
        metadata.insert("media-type", media_type);

        let in_spine = metadata.get_or("spine", default_spine) != "omit";
        let in_toc = in_spine && metadata.get_or("toc", "include") != "omit";

        let mut item = ManifestItem::new(local, FileMetadata::new());
        item.properties = join_properties(properties, metadata.get_or("properties", ""));
        item.spine_properties = metadata.get_or("spine-properties", "").to_string();
        item.in_spine = in_spine;
        item.in_toc = in_toc;
        item.metadata = metadata;

        self.files.insert(key, normalize_lexically(source));
        let handle = self.package.add_to_manifest(item);
        if in_toc {
            self.navigation.add(handle);
        }

        if let Some(item) = self.package.get(handle) {
            tracing::debug!(
                id = %item.id,
                path = %item.path.display(),
                media_type,
                in_spine,
                in_toc,
                "registered asset"
            );
        }
        Ok(handle)
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    pub fn package_mut(&mut self) -> &mut Package {
        &mut self.package
    }

    pub fn navigation(&self) -> &Navigation {
        &self.navigation
    }

    pub fn navigation_mut(&mut self) -> &mut Navigation {
        &mut self.navigation
    }

    /// Local container path -> source path for every added file.
    pub fn files(&self) -> &BTreeMap<PathBuf, PathBuf> {
        &self.files
    }

    /// Stylesheet linked from the navigation document.
    pub fn toc_stylesheet(&self) -> Option<&Path> {
        self.navigation.stylesheet()
    }

    /// Link a stylesheet, relative to `Contents/`, from the navigation
    /// document. The stylesheet itself must be added like any other asset.
    pub fn set_toc_stylesheet(&mut self, path: impl Into<PathBuf>) {
        self.navigation.set_stylesheet(path);
    }

    /// Write the container as a directory tree at `path`.
    ///
    /// The parent of `path` must exist and `path` itself must not. On
    /// failure the partially written tree is left in place.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if fs::symlink_metadata(path).is_ok() {
            return Err(Error::OutputExists(path.to_path_buf()));
        }

        let opf = writer::package_document(&self.package, Utc::now())?;
        let nav = writer::navigation_document(
            &self.navigation,
            &self.package,
            self.navigation.stylesheet(),
        )?;

        fs::create_dir(path)?;
        fs::write(path.join("mimetype"), writer::MIMETYPE)?;

        let meta_inf = path.join("META-INF");
        fs::create_dir(&meta_inf)?;
        fs::write(meta_inf.join("container.xml"), writer::CONTAINER_XML)?;

        let contents = path.join(CONTENTS_DIR);
        fs::create_dir(&contents)?;
        fs::write(contents.join(PACKAGE_FILE), opf)?;
        fs::write(contents.join(NAV_FILE), nav)?;

        for (key, source) in &self.files {
            let target = path.join(key);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(source, &target)?;
        }

        tracing::info!(
            path = %path.display(),
            items = self.package.len(),
            files = self.files.len(),
            "wrote package"
        );
        Ok(())
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}
