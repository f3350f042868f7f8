//! Publication-level metadata (Dublin Core + rendition properties).

use uuid::Uuid;

use crate::error::{Error, Result};

/// Descriptive fields for the publication as a whole.
///
/// A fresh `Metadata` always has an identifier (`urn:uuid:` + a random
/// version 4 UUID), a title and a language, which are the three elements
/// every package document must carry.
#[derive(Debug, Clone)]
pub struct Metadata {
    identifier: String,
    identifier_set: bool,
    title: String,
    language: String,
    description: Option<String>,
    creators: Vec<Creator>,
    collections: Vec<Collection>,
    layout: Layout,
    orientation: Orientation,
}

/// An individual or organization primarily responsible for the content.
///
/// The `file_as` refinement is the sort form ("Marks, Percy") and `role`
/// is a three-letter MARC relator code such as `aut` or `ill`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Creator {
    pub name: String,
    pub file_as: Option<String>,
    pub role: Option<String>,
}

/// A larger set or ongoing series the publication belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub name: String,
    pub collection_type: CollectionType,
    pub group_position: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollectionType {
    #[default]
    Unspecified,
    Series,
    Set,
}

/// Rendition layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Layout {
    #[default]
    Reflowable,
    /// Each content document is a single fixed page.
    PrePaginated,
}

/// Rendition orientation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Orientation {
    #[default]
    Automatic,
    Landscape,
    Portrait,
}

impl Metadata {
    /// Create metadata with a freshly generated identifier.
    pub fn new() -> Self {
        Self::with_uuid(Uuid::new_v4())
    }

    /// Create metadata whose default identifier is built from `uuid`.
    pub fn with_uuid(uuid: Uuid) -> Self {
        Self {
            identifier: format!("urn:uuid:{}", uuid.hyphenated()),
            identifier_set: false,
            title: "Untitled".to_string(),
            language: "en-US".to_string(),
            description: None,
            creators: Vec::new(),
            collections: Vec::new(),
            layout: Layout::default(),
            orientation: Orientation::default(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Replace the generated identifier.
    ///
    /// The identifier may be overridden once; a second call fails with
    /// [`Error::IdentifierAlreadySet`] and leaves the first value in place.
    pub fn set_identifier(&mut self, identifier: impl Into<String>) -> Result<()> {
        if self.identifier_set {
            return Err(Error::IdentifierAlreadySet);
        }
        self.identifier = identifier.into();
        self.identifier_set = true;
        Ok(())
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Set the BCP 47 language tag of the content (default `en-US`).
    pub fn set_language(&mut self, language: impl Into<String>) {
        self.language = language.into();
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Set the description. An empty string clears it.
    pub fn set_description(&mut self, description: impl Into<String>) {
        let description = description.into();
        self.description = (!description.is_empty()).then_some(description);
    }

    pub fn creators(&self) -> &[Creator] {
        &self.creators
    }

    pub fn creators_mut(&mut self) -> &mut Vec<Creator> {
        &mut self.creators
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn collections_mut(&mut self) -> &mut Vec<Collection> {
        &mut self.collections
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Disable reflow: every content document is a single page and must
    /// declare its own viewport.
    pub fn set_pre_paginated(&mut self) {
        self.layout = Layout::PrePaginated;
    }

    pub fn set_reflowable(&mut self) {
        self.layout = Layout::Reflowable;
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new()
    }
}

impl Creator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_as: None,
            role: None,
        }
    }

    pub fn with_file_as(mut self, file_as: impl Into<String>) -> Self {
        self.file_as = Some(file_as.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// True if the creator carries any refinement and so needs an `id`.
    pub fn has_refinements(&self) -> bool {
        self.file_as.is_some() || self.role.is_some()
    }
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collection_type: CollectionType::Unspecified,
            group_position: None,
        }
    }

    pub fn with_type(mut self, collection_type: CollectionType) -> Self {
        self.collection_type = collection_type;
        self
    }

    pub fn with_group_position(mut self, position: impl Into<String>) -> Self {
        self.group_position = Some(position.into());
        self
    }

    pub fn set_group_position_number(&mut self, position: u32) {
        self.group_position = Some(position.to_string());
    }

    pub fn has_refinements(&self) -> bool {
        self.collection_type != CollectionType::Unspecified || self.group_position.is_some()
    }
}

impl CollectionType {
    /// The `collection-type` refinement value, if any.
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            CollectionType::Unspecified => None,
            CollectionType::Series => Some("series"),
            CollectionType::Set => Some("set"),
        }
    }
}

impl Layout {
    /// The `rendition:layout` property value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Layout::Reflowable => "reflowable",
            Layout::PrePaginated => "pre-paginated",
        }
    }
}

impl Orientation {
    /// The `rendition:orientation` property value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Automatic => "auto",
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
        }
    }
}

/// Check that `code` has the shape of a MARC relator code: exactly three
/// lowercase ASCII letters.
pub fn is_marc_relator(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let meta = Metadata::with_uuid(Uuid::nil());
        assert_eq!(
            meta.identifier(),
            "urn:uuid:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(meta.title(), "Untitled");
        assert_eq!(meta.language(), "en-US");
        assert_eq!(meta.description(), None);
        assert_eq!(meta.layout(), Layout::Reflowable);
        assert_eq!(meta.orientation(), Orientation::Automatic);
    }

    #[test]
    fn test_generated_identifier_is_v4() {
        let meta = Metadata::new();
        let uuid = meta.identifier().strip_prefix("urn:uuid:").unwrap();
        let parsed = Uuid::parse_str(uuid).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn test_identifier_set_once() {
        let mut meta = Metadata::new();
        meta.set_identifier("urn:isbn:9780000000000").unwrap();
        let err = meta.set_identifier("urn:isbn:9781111111111").unwrap_err();
        assert!(matches!(err, Error::IdentifierAlreadySet));
        assert_eq!(meta.identifier(), "urn:isbn:9780000000000");
    }

    #[test]
    fn test_layout_toggle() {
        let mut meta = Metadata::new();
        meta.set_pre_paginated();
        assert_eq!(meta.layout().as_str(), "pre-paginated");
        meta.set_reflowable();
        assert_eq!(meta.layout().as_str(), "reflowable");
    }

    #[test]
    fn test_empty_description_clears() {
        let mut meta = Metadata::new();
        meta.set_description("blurb");
        assert_eq!(meta.description(), Some("blurb"));
        meta.set_description("");
        assert_eq!(meta.description(), None);
    }

    #[test]
    fn test_refinements() {
        assert!(!Creator::new("Anon").has_refinements());
        assert!(Creator::new("Percy Marks").with_role("aut").has_refinements());

        let mut coll = Collection::new("Lost American Fiction");
        assert!(!coll.has_refinements());
        coll.set_group_position_number(23);
        assert_eq!(coll.group_position.as_deref(), Some("23"));
        assert!(coll.has_refinements());
    }

    #[test]
    fn test_marc_relator() {
        assert!(is_marc_relator("aut"));
        assert!(!is_marc_relator("AUT"));
        assert!(!is_marc_relator("auth"));
        assert!(!is_marc_relator("a1t"));
    }
}
