//! # bindery
//!
//! Assemble EPUB 3 publications from a set of content files.
//!
//! ## Features
//!
//! - Publication metadata: identifier, title, language, creators with
//!   `file-as` and MARC role refinements, collections with series/set
//!   positions, and rendition layout
//! - Content documents describe their own packaging through `epub:` meta
//!   elements (spine/TOC membership, manifest properties)
//! - Generates `package.opf`, `nav.xhtml` and `META-INF/container.xml`
//! - Writes the result as an unzipped EPUB directory tree
//!
//! ## Quick Start
//!
//! ```no_run
//! use bindery::{Collection, CollectionType, Container, Creator};
//!
//! let mut container = Container::new();
//! let metadata = container.package_mut().metadata_mut();
//! metadata.set_title("The Plastic Age");
//! metadata
//!     .creators_mut()
//!     .push(Creator::new("Percy Marks").with_file_as("Marks, Percy").with_role("aut"));
//! metadata.collections_mut().push(
//!     Collection::new("Jazz Age Novels")
//!         .with_type(CollectionType::Series)
//!         .with_group_position("3"),
//! );
//!
//! container.add_file("chapter-01.xhtml")?;
//! container.add("art/cover.png", "images/cover.png")?;
//! container.write("plastic-age")?;
//! # Ok::<(), bindery::Error>(())
//! ```
//!
//! ## The model
//!
//! A [`Package`] owns every [`ManifestItem`]. The spine is the subset of
//! items placed in the reading order and the [`Navigation`] lists the
//! subset shown in the table of contents; both are derived from the
//! package rather than stored next to it.

pub mod container;
pub mod error;
pub mod extract;
pub mod id;
pub mod manifest;
pub mod media_type;
pub mod metadata;
pub mod navigation;
pub mod package;
pub(crate) mod util;
pub mod writer;

pub use container::{Container, ContainerOptions};
pub use error::{Error, Result};
pub use id::IdGenerator;
pub use manifest::{FileMetadata, ItemHandle, ManifestItem};
pub use metadata::{Collection, CollectionType, Creator, Layout, Metadata, Orientation};
pub use navigation::Navigation;
pub use package::Package;
