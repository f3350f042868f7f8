//! Text decoding, path normalization and href encoding helpers.

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// Decode a document to text.
///
/// Valid UTF-8 (with or without BOM) is used as is. Anything else is
/// decoded with the encoding named by `declared`, if `encoding_rs` knows
/// the label, and otherwise as Windows-1252.
pub fn decode_text<'a>(bytes: &'a [u8], declared: Option<&str>) -> Cow<'a, str> {
    let (text, _, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return text;
    }

    let fallback = declared
        .and_then(|label| encoding_rs::Encoding::for_label(label.as_bytes()))
        .unwrap_or(encoding_rs::WINDOWS_1252);
    fallback.decode(bytes).0
}

/// Pull the `encoding` pseudo-attribute out of an XML declaration.
pub fn declared_encoding(bytes: &[u8]) -> Option<&str> {
    let head = &bytes[..bytes.len().min(256)];
    let end = head.windows(2).position(|w| w == b"?>")?;
    let decl = std::str::from_utf8(&head[..end]).ok()?;
    let rest = &decl[decl.find("encoding")? + "encoding".len()..];
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let rest = &rest[1..];
    Some(&rest[..rest.find(quote)?])
}

/// Lexically normalize a path: drop `.` components and fold `..` into
/// the preceding component.
///
/// Returns `None` if the path is absolute or a `..` would climb above the
/// starting point. An empty result is also `None`.
pub fn normalize_relative(path: &Path) -> Option<PathBuf> {
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.iter().collect())
}

/// Lexically normalize any path, keeping a leading root and any `..` that
/// cannot be folded.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let folds = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if folds {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Characters escaped in an href besides controls and non-ASCII.
const HREF: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b':')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b']')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Encode a relative path as a URI reference with `/` separators.
pub fn href(path: &Path) -> String {
    path.components()
        .map(|c| {
            let part = c.as_os_str().to_string_lossy();
            utf8_percent_encode(&part, HREF).to_string()
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_utf8() {
        assert_eq!(decode_text("Café".as_bytes(), None), "Café");
    }

    #[test]
    fn test_decode_text_fallback() {
        // "Café" in Windows-1252
        assert_eq!(decode_text(b"Caf\xe9", None), "Café");
        assert_eq!(decode_text(b"Caf\xe9", Some("iso-8859-1")), "Café");
    }

    #[test]
    fn test_decode_text_declared_label() {
        // 0xE9 is "й" in windows-1251; unknown labels fall back to 1252.
        assert_eq!(decode_text(b"\xe9", Some("windows-1251")), "й");
        assert_eq!(decode_text(b"\xe9", Some("no-such-charset")), "é");
    }

    #[test]
    fn test_declared_encoding() {
        let doc = br#"<?xml version="1.0" encoding="windows-1252"?><html/>"#;
        assert_eq!(declared_encoding(doc), Some("windows-1252"));
        assert_eq!(declared_encoding(b"<?xml version='1.0' encoding = 'utf-8' ?>"), Some("utf-8"));
        assert_eq!(declared_encoding(b"<?xml version=\"1.0\"?>"), None);
        assert_eq!(declared_encoding(b"<html/>"), None);
    }

    #[test]
    fn test_normalize_relative() {
        let n = |s: &str| normalize_relative(Path::new(s));
        assert_eq!(n("a/./b.xhtml"), Some(PathBuf::from("a/b.xhtml")));
        assert_eq!(n("a/../b.xhtml"), Some(PathBuf::from("b.xhtml")));
        assert_eq!(n("../b.xhtml"), None);
        assert_eq!(n("/etc/passwd"), None);
        assert_eq!(n("."), None);
    }

    #[test]
    fn test_normalize_lexically() {
        let n = |s: &str| normalize_lexically(Path::new(s));
        assert_eq!(n("src/./ch1.xhtml"), PathBuf::from("src/ch1.xhtml"));
        assert_eq!(n("src/../ch1.xhtml"), PathBuf::from("ch1.xhtml"));
        assert_eq!(n("../ch1.xhtml"), PathBuf::from("../ch1.xhtml"));
        assert_eq!(n("/a/../../b"), PathBuf::from("/b"));
        assert_eq!(n("a/.."), PathBuf::from("."));
    }

    #[test]
    fn test_href() {
        assert_eq!(href(Path::new("text/ch 1.xhtml")), "text/ch%201.xhtml");
        assert_eq!(href(Path::new("café.xhtml")), "caf%C3%A9.xhtml");
        assert_eq!(href(Path::new("a#b.png")), "a%23b.png");
        assert_eq!(href(Path::new("chapter:1.xhtml")), "chapter%3A1.xhtml");
        assert_eq!(href(Path::new("text/part:2/ch.xhtml")), "text/part%3A2/ch.xhtml");
        assert_eq!(href(Path::new("nav.xhtml")), "nav.xhtml");
    }
}
