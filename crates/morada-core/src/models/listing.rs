use chrono::{DateTime, Utc};

use crate::gateway::Row;
use crate::normalize;

use super::{epoch, f64_field, str_field, time_field, u32_field};

/// Canonical listing entity, normalized from whichever join shape the
/// gateway returned.
#[derive(Debug, Clone)]
pub struct Listing {
    pub id: String,
    pub title: String,
    pub price: f64,
    pub bedrooms: Option<u32>,
    pub location: String,
    pub images: Vec<String>,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    pub fn from_row(row: &Row) -> Option<Self> {
        let images = normalize::resolve_images(row);
        let cover_image = normalize::resolve_cover(row, &images);
        Some(Listing {
            id: str_field(row, "id")?,
            title: str_field(row, "title").unwrap_or_default(),
            price: f64_field(row, "price").unwrap_or(0.0),
            bedrooms: u32_field(row, "bedrooms"),
            location: normalize::location_label(row),
            images,
            cover_image,
            created_at: time_field(row, "created_at").unwrap_or_else(epoch),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::row;
    use serde_json::json;

    #[test]
    fn test_listing_normalizes_images_and_location() {
        let listing = Listing::from_row(&row(json!({
            "id": "l1",
            "title": "T2 remodelado",
            "price": 245000.0,
            "bedrooms": 2,
            "neighborhood": "Alvalade",
            "city": "Lisboa",
            "listing_images": [{"image_url": "a.jpg"}, {"url": "b.jpg"}],
            "created_at": "2026-01-20T10:00:00+00:00",
        })))
        .unwrap();

        assert_eq!(listing.images, vec!["a.jpg", "b.jpg"]);
        assert_eq!(listing.cover_image, Some("a.jpg".to_string()));
        assert_eq!(listing.location, "Alvalade, Lisboa");
    }

    #[test]
    fn test_listing_requires_id() {
        assert!(Listing::from_row(&row(json!({"title": "sem id"}))).is_none());
    }
}
