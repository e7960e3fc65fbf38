//! Deterministic, filesystem-safe names for exported items and attachments.
//!
//! Every name is a pure function of the server record, so a re-run into the same
//! export root lands on the same paths and overwrites instead of duplicating.

use crate::contract::{Attachment, Item};

/// Characters replaced with `_` in every server-supplied path component.
pub const RESERVED_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Upper bound, in bytes, of the sanitized item name inside a directory name.
pub const MAX_NAME_LEN: usize = 50;

pub const FALLBACK_EXTENSION: &str = ".bin";

/// `"<sanitized name>_<short id>"`, e.g. `"Test Item_test123"` for item
/// `test123-abc`.
pub fn directory_name_for(item: &Item) -> String {
    let sanitized = sanitize(&item.name);
    let name = truncate_at_boundary(&sanitized, MAX_NAME_LEN);
    format!("{}_{}", name, sanitize(short_id(&item.id)))
}

/// The sanitized document title, or `<attachment id><ext>` when the title has
/// no stem. Titles without an extension get [`FALLBACK_EXTENSION`].
pub fn filename_for(_item: &Item, attachment: &Attachment) -> String {
    let title = sanitize(&attachment.document.title);
    let (stem, ext) = split_extension(&title);
    let ext = ext.unwrap_or(FALLBACK_EXTENSION);

    if !stem.is_empty() {
        return format!("{}{}", stem, ext);
    }
    format!("{}{}", sanitize(&attachment.id), ext)
}

/// The identifier up to its first `-`.
pub fn short_id(id: &str) -> &str {
    id.split('-').next().unwrap_or(id)
}

/// Replaces [`RESERVED_CHARS`] with `_` and trims surrounding whitespace.
/// Non-ASCII passes through untouched.
pub fn sanitize(value: &str) -> String {
    let replaced: String = value
        .chars()
        .map(|c| if RESERVED_CHARS.contains(&c) { '_' } else { c })
        .collect();
    replaced.trim().to_string()
}

/// Splits `"name.ext"` into `("name", Some(".ext"))`. The extension starts at
/// the last `.` and must be longer than the dot itself.
pub fn split_extension(value: &str) -> (&str, Option<&str>) {
    match value.rfind('.') {
        Some(idx) if idx + 1 < value.len() => (&value[..idx], Some(&value[idx..])),
        _ => (value, None),
    }
}

fn truncate_at_boundary(value: &str, max_len: usize) -> &str {
    if value.len() <= max_len {
        return value;
    }
    let mut end = max_len;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}
