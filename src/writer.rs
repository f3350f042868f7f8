//! Serialization of the package model into EPUB 3 documents.
//!
//! Everything here is a pure function of the model: nothing is mutated and
//! nothing is read back from disk. The only input that varies between calls
//! is the `dcterms:modified` timestamp, which callers pass in.

use std::path::Path;

use chrono::{DateTime, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::Result;
use crate::manifest::ManifestItem;
use crate::metadata::Orientation;
use crate::navigation::Navigation;
use crate::package::Package;
use crate::util::href;

const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
const OPF_NS: &str = "http://www.idpf.org/2007/opf";
const OPS_NS: &str = "http://www.idpf.org/2007/ops";
const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";

/// Id of the `dc:identifier` element named by `unique-identifier`.
const PUB_ID: &str = "pub-id";

const NAV_TITLE: &str = "Table of Contents";

/// Contents of the `mimetype` file.
pub const MIMETYPE: &[u8] = b"application/epub+zip";

/// META-INF/container.xml template.
pub const CONTAINER_XML: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<container xmlns="urn:oasis:names:tc:opendocument:xmlns:container" version="1.0">
  <rootfiles>
    <rootfile full-path="Contents/package.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

/// Format a timestamp the way `dcterms:modified` requires.
pub fn format_modified(modified: DateTime<Utc>) -> String {
    modified.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Generate package.opf from the package model.
pub fn package_document(package: &Package, modified: DateTime<Utc>) -> Result<String> {
    let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    start(
        &mut w,
        "package",
        &[("version", "3.0"), ("unique-identifier", PUB_ID), ("xmlns", OPF_NS)],
    )?;

    write_metadata(&mut w, package, modified)?;

    start(&mut w, "manifest", &[])?;
    for item in package.manifest_view() {
        write_item(&mut w, item)?;
    }
    end(&mut w, "manifest")?;

    start(&mut w, "spine", &[])?;
    for item in package.spine_view() {
        let mut attrs = vec![("idref", item.id.as_str())];
        if !item.spine_properties.is_empty() {
            attrs.push(("properties", item.spine_properties.as_str()));
        }
        empty(&mut w, "itemref", &attrs)?;
    }
    end(&mut w, "spine")?;

    end(&mut w, "package")?;
    finish(w)
}

fn write_metadata(w: &mut Writer<Vec<u8>>, package: &Package, modified: DateTime<Utc>) -> Result<()> {
    let metadata = package.metadata();
    // Refinement ids continue the manifest's sequence on a copy, so they
    // cannot collide with item ids and the package is left untouched.
    let mut ids = package.ids().clone();

    start(w, "metadata", &[("xmlns:dc", DC_NS)])?;

    text_element(w, "dc:identifier", &[("id", PUB_ID)], metadata.identifier())?;
    text_element(w, "dc:title", &[], metadata.title())?;
    text_element(w, "dc:language", &[], metadata.language())?;

    if let Some(description) = metadata.description() {
        start(w, "dc:description", &[])?;
        write_cdata(w, description)?;
        end(w, "dc:description")?;
    }

    text_element(
        w,
        "meta",
        &[("property", "dcterms:modified")],
        &format_modified(modified),
    )?;

    for creator in metadata.creators() {
        if !creator.has_refinements() {
            text_element(w, "dc:creator", &[], &creator.name)?;
            continue;
        }

        let id = ids.next_id();
        text_element(w, "dc:creator", &[("id", id.as_str())], &creator.name)?;
        if let Some(role) = &creator.role {
            refinement(w, &id, "role", role, Some("marc:relators"))?;
        }
        if let Some(file_as) = &creator.file_as {
            refinement(w, &id, "file-as", file_as, None)?;
        }
    }

    for collection in metadata.collections() {
        if !collection.has_refinements() {
            text_element(
                w,
                "meta",
                &[("property", "belongs-to-collection")],
                &collection.name,
            )?;
            continue;
        }

        let id = ids.next_id();
        text_element(
            w,
            "meta",
            &[("property", "belongs-to-collection"), ("id", id.as_str())],
            &collection.name,
        )?;
        if let Some(kind) = collection.collection_type.as_str() {
            refinement(w, &id, "collection-type", kind, None)?;
        }
        if let Some(position) = &collection.group_position {
            refinement(w, &id, "group-position", position, None)?;
        }
    }

    text_element(
        w,
        "meta",
        &[("property", "rendition:layout")],
        metadata.layout().as_str(),
    )?;

    let orientation = metadata.orientation();
    if orientation != Orientation::Automatic {
        text_element(
            w,
            "meta",
            &[("property", "rendition:orientation")],
            orientation.as_str(),
        )?;
    }

    end(w, "metadata")
}

fn refinement(
    w: &mut Writer<Vec<u8>>,
    id: &str,
    property: &str,
    content: &str,
    scheme: Option<&str>,
) -> Result<()> {
    let refines = format!("#{id}");
    let mut attrs = vec![("refines", refines.as_str()), ("property", property)];
    if let Some(scheme) = scheme {
        attrs.push(("scheme", scheme));
    }
    text_element(w, "meta", &attrs, content)
}

fn write_item(w: &mut Writer<Vec<u8>>, item: &ManifestItem) -> Result<()> {
    let href = href(&item.path);
    let mut attrs = vec![
        ("id", item.id.as_str()),
        ("href", href.as_str()),
        ("media-type", item.media_type()),
    ];
    if !item.properties.is_empty() {
        attrs.push(("properties", item.properties.as_str()));
    }
    empty(w, "item", &attrs)
}

/// Generate nav.xhtml listing the live navigation entries.
pub fn navigation_document(
    navigation: &Navigation,
    package: &Package,
    stylesheet: Option<&Path>,
) -> Result<String> {
    let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    w.write_event(Event::DocType(BytesText::from_escaped("html")))?;

    start(&mut w, "html", &[("xmlns", XHTML_NS), ("xmlns:epub", OPS_NS)])?;

    start(&mut w, "head", &[])?;
    text_element(&mut w, "title", &[], NAV_TITLE)?;
    if let Some(stylesheet) = stylesheet {
        let href = href(stylesheet);
        empty(
            &mut w,
            "link",
            &[("rel", "stylesheet"), ("type", "text/css"), ("href", href.as_str())],
        )?;
    }
    end(&mut w, "head")?;

    start(&mut w, "body", &[("class", "navigation")])?;
    text_element(&mut w, "h1", &[], NAV_TITLE)?;
    start(&mut w, "nav", &[("epub:type", "toc")])?;
    start(&mut w, "ol", &[])?;

    for item in navigation.view(package) {
        let href = href(&item.path);
        start(&mut w, "li", &[])?;
        text_element(&mut w, "a", &[("href", href.as_str())], &entry_title(item))?;
        end(&mut w, "li")?;
    }

    end(&mut w, "ol")?;
    end(&mut w, "nav")?;
    end(&mut w, "body")?;
    end(&mut w, "html")?;
    finish(w)
}

/// The label of a TOC entry: the extracted title, or the file name when
/// the document has none.
fn entry_title(item: &ManifestItem) -> String {
    match item.metadata.title() {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => item
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
    }
}

fn start(w: &mut Writer<Vec<u8>>, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
    let elem = BytesStart::new(name).with_attributes(attrs.iter().copied());
    w.write_event(Event::Start(elem))?;
    Ok(())
}

fn end(w: &mut Writer<Vec<u8>>, name: &str) -> Result<()> {
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn empty(w: &mut Writer<Vec<u8>>, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
    let elem = BytesStart::new(name).with_attributes(attrs.iter().copied());
    w.write_event(Event::Empty(elem))?;
    Ok(())
}

fn text_element(
    w: &mut Writer<Vec<u8>>,
    name: &str,
    attrs: &[(&str, &str)],
    text: &str,
) -> Result<()> {
    start(w, name, attrs)?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    end(w, name)
}

/// Write `text` as CDATA, splitting any `]]>` across two sections.
fn write_cdata(w: &mut Writer<Vec<u8>>, text: &str) -> Result<()> {
    let mut rest = text;
    while let Some(pos) = rest.find("]]>") {
        w.write_event(Event::CData(BytesCData::new(&rest[..pos + 2])))?;
        rest = &rest[pos + 2..];
    }
    w.write_event(Event::CData(BytesCData::new(rest)))?;
    Ok(())
}

fn finish(w: Writer<Vec<u8>>) -> Result<String> {
    let mut bytes = w.into_inner();
    bytes.push(b'\n');
    Ok(String::from_utf8(bytes)?)
}
