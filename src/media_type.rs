//! Core media types and extension lookup.

use std::path::Path;

pub const CSS: &str = "text/css";
pub const GIF: &str = "image/gif";
pub const JPEG: &str = "image/jpeg";
pub const OTF: &str = "font/otf";
pub const PNG: &str = "image/png";
pub const SVG: &str = "image/svg+xml";
pub const WEBP: &str = "image/webp";
pub const XHTML: &str = "application/xhtml+xml";

/// Fallback for extensions outside the core table.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Look up the media type for a path's extension.
///
/// The match is case-sensitive: `cover.PNG` is not a known type.
pub fn lookup(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?;
    match ext {
        "css" => Some(CSS),
        "gif" => Some(GIF),
        "jpg" | "jpeg" => Some(JPEG),
        "otf" => Some(OTF),
        "png" => Some(PNG),
        "svg" => Some(SVG),
        "webp" => Some(WEBP),
        "xhtml" => Some(XHTML),
        _ => None,
    }
}

/// Guess the media type from the extension, falling back to
/// `application/octet-stream`.
pub fn guess_media_type(path: &Path) -> &'static str {
    lookup(path).unwrap_or_else(|| {
        tracing::warn!(path = %path.display(), "unknown media type, falling back to octet-stream");
        OCTET_STREAM
    })
}
