//! Search-index projection of a listing.

use serde::{Deserialize, Serialize};

use super::{entities::ListingRecord, geo::GeoPoint};

/// Denormalized document pushed to the hosted search index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchIndexEntry {
    #[serde(rename = "objectID")]
    pub object_id: String,
    pub title: String,
    pub description: String,
    pub price: f64,
    #[serde(rename = "_geoloc")]
    pub geoloc: GeoPoint,
}

impl From<&ListingRecord> for SearchIndexEntry {
    fn from(listing: &ListingRecord) -> Self {
        Self {
            object_id: listing.id.to_string(),
            title: listing.title.clone(),
            description: listing.description.clone(),
            price: listing.price.as_f64(),
            geoloc: listing.location(),
        }
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn projects_listing_fields_with_index_field_names() {
        let listing = ListingRecord {
            id: Uuid::from_u128(42),
            title: "Loft near the park".to_string(),
            description: "Two rooms".to_string(),
            price: "310.25".parse().unwrap(),
            latitude: 44.451234,
            longitude: 26.085678,
            author_id: "user_2".to_string(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };

        let entry = SearchIndexEntry::from(&listing);
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["objectID"], listing.id.to_string());
        assert_eq!(json["price"], 310.25);
        assert_eq!(json["_geoloc"]["lat"], 44.451234);
        assert_eq!(json["_geoloc"]["lng"], 26.085678);
        assert!(json.get("author_id").is_none());
    }
}
