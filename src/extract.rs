//! Metadata extraction from XHTML and SVG content documents.
//!
//! Authors control how a document is packaged with `meta` elements whose
//! names carry an `epub:` prefix:
//!
//! - `epub:spine`: `include` or `omit` the document from the reading order
//! - `epub:toc`: `include` or `omit` it from the table of contents
//! - `epub:properties`: extra manifest properties (`svg`, `scripted`, ...)
//! - `epub:spine-properties`: `<itemref>` properties (`page-spread-left`, ...)
//!
//! Each such element becomes one entry keyed by the name without the
//! prefix. The document title is stored under `title`.
//!
//! In XHTML the candidates are `meta` children of `head`. In SVG they are
//! `meta` elements anywhere inside the top-level `metadata` element, and
//! the title is the `title` child of the root.

use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};
use crate::manifest::FileMetadata;
use crate::util::{declared_encoding, decode_text};

const META_PREFIX: &str = "epub:";

/// Where to look for the title and the packaging hints.
struct Shape {
    title: &'static [&'static [u8]],
    meta_scope: &'static [&'static [u8]],
    /// Accept `meta` below direct children of `meta_scope`.
    meta_nested: bool,
}

const XHTML: Shape = Shape {
    title: &[b"html", b"head", b"title"],
    meta_scope: &[b"html", b"head"],
    meta_nested: false,
};

const SVG: Shape = Shape {
    title: &[b"svg", b"title"],
    meta_scope: &[b"svg", b"metadata"],
    meta_nested: true,
};

/// Read the title and `epub:` hints from an XHTML content document.
pub fn xhtml_metadata(path: &Path) -> Result<FileMetadata> {
    let bytes = std::fs::read(path)?;
    scan(&bytes, &XHTML)
}

/// Read the title and `epub:` hints from an SVG document.
pub fn svg_metadata(path: &Path) -> Result<FileMetadata> {
    let bytes = std::fs::read(path)?;
    scan(&bytes, &SVG)
}

fn scan(bytes: &[u8], shape: &Shape) -> Result<FileMetadata> {
    let content = decode_text(bytes, declared_encoding(bytes));
    let mut reader = Reader::from_str(&content);

    let mut metadata = FileMetadata::new();
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut title: Option<String> = None;
    let mut in_title = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if is_meta(&e, &stack, shape) {
                    read_meta(&e, &mut metadata);
                }
                stack.push(local_name(e.name().as_ref()).to_vec());
                if title.is_none() && path_is(&stack, shape.title) {
                    in_title = true;
                    title = Some(String::new());
                }
            }
            Event::Empty(e) => {
                if is_meta(&e, &stack, shape) {
                    read_meta(&e, &mut metadata);
                }
            }
            Event::Text(e) if in_title => {
                if let Some(t) = title.as_mut() {
                    t.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::CData(e) if in_title => {
                if let Some(t) = title.as_mut() {
                    t.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::GeneralRef(e) if in_title => {
                let entity = String::from_utf8_lossy(e.as_ref());
                let c = entity_char(&entity)
                    .ok_or_else(|| Error::UnknownEntity(entity.to_string()))?;
                if let Some(t) = title.as_mut() {
                    t.push(c);
                }
            }
            Event::End(_) => {
                if in_title && path_is(&stack, shape.title) {
                    in_title = false;
                }
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    metadata.insert("title", title.unwrap_or_default().trim());
    Ok(metadata)
}

fn is_meta(e: &BytesStart<'_>, stack: &[Vec<u8>], shape: &Shape) -> bool {
    if local_name(e.name().as_ref()) != b"meta" {
        return false;
    }
    if shape.meta_nested {
        stack.len() >= shape.meta_scope.len()
            && path_is(&stack[..shape.meta_scope.len()], shape.meta_scope)
    } else {
        path_is(stack, shape.meta_scope)
    }
}

fn read_meta(e: &BytesStart<'_>, metadata: &mut FileMetadata) {
    let mut name = None;
    let mut content = String::new();

    for attr in e.attributes().flatten() {
        let value = attribute_value(&attr.value);
        match attr.key.as_ref() {
            b"name" => name = Some(value),
            b"content" => content = value,
            _ => {}
        }
    }

    if let Some(name) = name
        && let Some(key) = name.strip_prefix(META_PREFIX)
    {
        metadata.insert(key, content);
    }
}

fn attribute_value(raw: &[u8]) -> String {
    let raw = String::from_utf8_lossy(raw);
    match quick_xml::escape::unescape(&raw) {
        Ok(value) => value.into_owned(),
        Err(_) => raw.into_owned(),
    }
}

fn path_is(stack: &[Vec<u8>], expected: &[&[u8]]) -> bool {
    stack.len() == expected.len() && stack.iter().zip(expected).all(|(a, b)| a.as_slice() == *b)
}

/// The part of a qualified name after its prefix: `h:meta` -> `meta`.
fn local_name(qname: &[u8]) -> &[u8] {
    match qname.iter().rposition(|&b| b == b':') {
        Some(colon) => &qname[colon + 1..],
        None => qname,
    }
}

/// The character behind an entity reference in a title.
///
/// Besides character references and XML's predefined entities, the HTML
/// entities that commonly appear in titles are accepted, since XHTML
/// documents are usually read without their DTD.
fn entity_char(entity: &str) -> Option<char> {
    let code = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok()?
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse().ok()?
    } else {
        return Some(match entity {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            "nbsp" => '\u{a0}',
            "ndash" => '\u{2013}',
            "mdash" => '\u{2014}',
            "lsquo" => '\u{2018}',
            "rsquo" => '\u{2019}',
            "ldquo" => '\u{201c}',
            "rdquo" => '\u{201d}',
            "hellip" => '\u{2026}',
            "copy" => '\u{a9}',
            _ => return None,
        });
    };
    char::from_u32(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAPTER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
  <head>
    <title>Chapter 1 &amp; Prologue</title>
    <meta name="epub:toc" content="omit"/>
    <meta name="epub:properties" content="svg"/>
    <meta name="viewport" content="width=600, height=800"/>
  </head>
  <body><meta name="epub:spine" content="omit"/><p>text</p></body>
</html>"#;

    #[test]
    fn test_xhtml_hints() {
        let meta = scan(CHAPTER.as_bytes(), &XHTML).unwrap();
        assert_eq!(meta.title(), Some("Chapter 1 & Prologue"));
        assert_eq!(meta.get("toc"), Some("omit"));
        assert_eq!(meta.get("properties"), Some("svg"));
        // Only head-level meta elements count.
        assert_eq!(meta.get("spine"), None);
        assert_eq!(meta.get("viewport"), None);
        assert_eq!(meta.len(), 3);
    }

    #[test]
    fn test_xhtml_without_title() {
        let doc = r#"<html xmlns="http://www.w3.org/1999/xhtml"><head/><body/></html>"#;
        let meta = scan(doc.as_bytes(), &XHTML).unwrap();
        assert_eq!(meta.title(), Some(""));
    }

    #[test]
    fn test_numeric_entities_in_title() {
        let doc = r#"<html><head><title>Caf&#233; &#x2014; Night</title></head></html>"#;
        let meta = scan(doc.as_bytes(), &XHTML).unwrap();
        assert_eq!(meta.title(), Some("Café — Night"));
    }

    #[test]
    fn test_windows_1252_document() {
        let mut doc = b"<?xml version=\"1.0\" encoding=\"windows-1252\"?>\n<html><head><title>Caf".to_vec();
        doc.push(0xe9);
        doc.extend_from_slice(b"</title></head></html>");
        let meta = scan(&doc, &XHTML).unwrap();
        assert_eq!(meta.title(), Some("Café"));
    }

    #[test]
    fn test_svg_hints() {
        let doc = r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:h="http://www.w3.org/1999/xhtml">
  <title>Frontispiece</title>
  <metadata>
    <h:meta name="epub:spine" content="include"/>
    <h:meta name="epub:toc" content="omit"/>
  </metadata>
  <g><title>not this one</title></g>
</svg>"#;
        let meta = scan(doc.as_bytes(), &SVG).unwrap();
        assert_eq!(meta.title(), Some("Frontispiece"));
        assert_eq!(meta.get("spine"), Some("include"));
        assert_eq!(meta.get("toc"), Some("omit"));
    }

    #[test]
    fn test_malformed_document() {
        let doc = "<html><head><title>oops</head></html>";
        assert!(scan(doc.as_bytes(), &XHTML).is_err());
    }

    #[test]
    fn test_html_entities_in_title() {
        let doc = "<html><head><title>Part&nbsp;One &mdash; &lsquo;Rush&rsquo;</title></head></html>";
        let meta = scan(doc.as_bytes(), &XHTML).unwrap();
        assert_eq!(meta.title(), Some("Part\u{a0}One \u{2014} \u{2018}Rush\u{2019}"));
    }

    #[test]
    fn test_unknown_entity_in_title() {
        let doc = "<html><head><title>Caf&eacutex;</title></head></html>";
        let err = scan(doc.as_bytes(), &XHTML).unwrap_err();
        assert!(matches!(err, Error::UnknownEntity(ref name) if name == "eacutex"));
    }

    #[test]
    fn test_entity_char() {
        assert_eq!(entity_char("#65"), Some('A'));
        assert_eq!(entity_char("#x41"), Some('A'));
        assert_eq!(entity_char("#xD800"), None);
        assert_eq!(entity_char("bogus"), None);
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"h:meta"), b"meta");
        assert_eq!(local_name(b"meta"), b"meta");
    }
}
