//! Ordering rules for the popular-listings ranking.
//!
//! Listings rank by review count, highest first. Ties fall back to the listing
//! identifier in ascending order so repeated computations over unchanged data
//! always yield the same sequence.

use std::cmp::Ordering;

use super::entities::PopularListing;

pub fn compare_popular(a: &PopularListing, b: &PopularListing) -> Ordering {
    b.review_count
        .cmp(&a.review_count)
        .then_with(|| a.listing.id.cmp(&b.listing.id))
}

pub fn sort_popular(listings: &mut [PopularListing]) {
    listings.sort_by(compare_popular);
}

/// Sort and keep the first `limit` entries.
pub fn rank_popular(mut listings: Vec<PopularListing>, limit: usize) -> Vec<PopularListing> {
    sort_popular(&mut listings);
    listings.truncate(limit);
    listings
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::*;
    use crate::domain::entities::ListingRecord;
    use crate::domain::price::Price;

    fn popular(id: u128, review_count: i64) -> PopularListing {
        PopularListing {
            listing: ListingRecord {
                id: Uuid::from_u128(id),
                title: format!("listing {id}"),
                description: String::new(),
                price: Price::ZERO,
                latitude: 44.43,
                longitude: 26.1,
                author_id: "user_1".to_string(),
                created_at: OffsetDateTime::UNIX_EPOCH,
                updated_at: OffsetDateTime::UNIX_EPOCH,
            },
            review_count,
        }
    }

    fn ids(listings: &[PopularListing]) -> Vec<u128> {
        listings.iter().map(|p| p.listing.id.as_u128()).collect()
    }

    #[test]
    fn orders_by_review_count_then_id() {
        let ranked = rank_popular(
            vec![popular(3, 1), popular(2, 4), popular(1, 1), popular(4, 0)],
            10,
        );
        assert_eq!(ids(&ranked), vec![2, 1, 3, 4]);
    }

    #[test]
    fn unreviewed_listing_never_outranks_reviewed_one() {
        let ranked = rank_popular(vec![popular(1, 0), popular(9, 1)], 10);
        assert_eq!(ids(&ranked), vec![9, 1]);
    }

    #[test]
    fn truncates_to_limit() {
        let input = (0..15).map(|i| popular(i, i as i64)).collect();
        let ranked = rank_popular(input, 10);
        assert_eq!(ranked.len(), 10);
        assert_eq!(ranked[0].review_count, 14);
        assert!(
            ranked
                .windows(2)
                .all(|pair| pair[0].review_count >= pair[1].review_count)
        );
    }

    #[test]
    fn ranking_is_stable_across_input_orders() {
        let forward = rank_popular(vec![popular(5, 2), popular(6, 2), popular(7, 2)], 10);
        let reverse = rank_popular(vec![popular(7, 2), popular(6, 2), popular(5, 2)], 10);
        assert_eq!(forward, reverse);
    }
}
