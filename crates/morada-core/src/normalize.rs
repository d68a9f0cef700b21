//! Pure normalization of heterogeneous listing rows.
//!
//! Listing reads arrive through different join shapes, so image data may live
//! in a joined `listing_images` collection (whose records disagree on the URL
//! field name) or in a raw `images` string-array column. These functions are
//! total over arbitrary input and never touch the gateway.

use serde_json::Value;

use crate::constants::{IMAGE_FIELD_CANDIDATES, LOCATION_SEPARATOR};
use crate::gateway::Row;

/// Display URL of one joined image record: first non-empty candidate field
/// wins, in [`IMAGE_FIELD_CANDIDATES`] order.
fn image_url_of(record: &Value) -> Option<String> {
    let obj = record.as_object()?;
    for key in IMAGE_FIELD_CANDIDATES {
        if let Some(url) = obj.get(key).and_then(Value::as_str) {
            if !url.is_empty() {
                return Some(url.to_string());
            }
        }
    }
    None
}

/// Ordered display URLs for a listing row.
///
/// A non-empty joined collection is authoritative; an empty or absent one
/// falls back to the raw `images` column; otherwise no images.
pub fn resolve_images(row: &Row) -> Vec<String> {
    if let Some(Value::Array(records)) = row.get("listing_images") {
        if !records.is_empty() {
            return records.iter().filter_map(image_url_of).collect();
        }
    }
    if let Some(Value::Array(raw)) = row.get("images") {
        return raw
            .iter()
            .filter_map(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
    }
    Vec::new()
}

/// Cover image: explicit `cover_image` column, else first resolved image.
pub fn resolve_cover(row: &Row, images: &[String]) -> Option<String> {
    if let Some(cover) = row.get("cover_image").and_then(Value::as_str) {
        if !cover.is_empty() {
            return Some(cover.to_string());
        }
    }
    images.first().cloned()
}

/// Human-readable location: non-empty parts of the geographic hierarchy
/// joined most-specific first, empties skipped.
pub fn location_label(row: &Row) -> String {
    ["neighborhood", "city", "state"]
        .iter()
        .filter_map(|key| row.get(*key).and_then(Value::as_str))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(LOCATION_SEPARATOR)
}
