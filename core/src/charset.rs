//! Response text encoding resolution.
//!
//! # Design
//! The encoding comes from the `"; charset="` parameter of the content-type
//! header when present and resolvable, and falls back to UTF-8 in every
//! other case. Lookup never fails a request.

use encoding_rs::{Encoding, UTF_8};

const CHARSET_MARKER: &str = "; charset=";

/// Resolve the encoding declared by a content-type header value.
///
/// Everything after the `"; charset="` marker is treated as the charset
/// label. A missing header, a missing marker, or an unknown label resolves
/// to UTF-8.
pub fn resolve(content_type: Option<&str>) -> &'static Encoding {
    content_type
        .and_then(|value| {
            value
                .find(CHARSET_MARKER)
                .map(|start| &value[start + CHARSET_MARKER.len()..])
        })
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8)
}

/// Decode `bytes` with `encoding`, replacing malformed sequences.
pub fn decode(bytes: &[u8], encoding: &'static Encoding) -> String {
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}
