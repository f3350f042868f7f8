//! Error types for package assembly.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while assembling or writing a package.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// A named entity outside XML's predefined five and the small set of
    /// HTML typography entities understood in titles.
    #[error("unknown entity: &{0};")]
    UnknownEntity(String),

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Two assets were offered under the same in-package path.
    #[error(
        "duplicate local name: {} conflicts with {}",
        .source_path.display(),
        .conflicting_source.display()
    )]
    DuplicateAsset {
        source_path: PathBuf,
        conflicting_source: PathBuf,
    },

    #[error("publication identifier already set")]
    IdentifierAlreadySet,

    #[error("output path already exists: {}", .0.display())]
    OutputExists(PathBuf),

    #[error("local path escapes the package root: {}", .0.display())]
    InvalidLocalPath(PathBuf),

    #[error("local path is reserved for a generated document: {}", .0.display())]
    ReservedPath(PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;
