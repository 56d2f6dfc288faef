//! Shared lopdf object helpers used across the loader modules.

use lopdf::{Dictionary, Document, Object, Stream};

/// Follow indirect references until a direct object is reached.
///
/// Gives up after a handful of hops so a reference that points at itself
/// cannot loop.
pub fn resolve<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Object> {
    let mut current = object;
    for _ in 0..8 {
        match current {
            Object::Reference(id) => current = document.get_object(*id).ok()?,
            direct => return Some(direct),
        }
    }
    None
}

/// Resolve `key` in `dict` to a dictionary, inline or by reference.
pub fn resolve_dict<'a>(
    document: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Dictionary> {
    let value = resolve(document, dict.get(key).ok()?)?;
    match value {
        Object::Dictionary(d) => Some(d),
        Object::Stream(s) => Some(&s.dict),
        _ => None,
    }
}

/// Stream content with its filters applied; unfiltered streams are returned
/// as stored.
pub fn stream_bytes(stream: &Stream) -> lopdf::Result<Vec<u8>> {
    if stream.dict.has(b"Filter") {
        stream.decompressed_content()
    } else {
        Ok(stream.content.clone())
    }
}

/// Extract a string value from a PDF dictionary for a given key.
///
/// Returns `Some(String)` if the key exists and contains a valid non-empty string,
/// `None` otherwise.
pub fn extract_string_from_dict(dict: &Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key)
        .ok()
        .and_then(|v| v.as_str().ok())
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .filter(|s| !s.is_empty())
}

/// Read a name-valued entry as raw bytes.
pub fn name_from_dict<'a>(dict: &'a Dictionary, key: &[u8]) -> Option<&'a [u8]> {
    dict.get(key).ok().and_then(|v| v.as_name().ok())
}
