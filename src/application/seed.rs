//! Deterministic sample data for local development.
//!
//! Everything goes through the regular services, so validation, index
//! mirroring and the self-review rule apply to seeded data as well.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::listings::{CreateListingCommand, ListingError, ListingService};
use crate::application::repos::{RepoError, SeedRepo, UpsertUserParams, UsersRepo};
use crate::application::reviews::{CreateReviewCommand, ReviewError, ReviewService};
use crate::domain::price::Price;

const TARGET: &str = "topzonal::seed";
const USER_COUNT: usize = 3;
const LISTINGS_PER_USER: usize = 4;

const FIRST_NAMES: [&str; USER_COUNT] = ["Ana", "Mihai", "Ioana"];
const LAST_NAMES: [&str; USER_COUNT] = ["Popescu", "Ionescu", "Dumitru"];
const TITLES: [&str; 6] = [
    "Sunny two-room flat near the park",
    "Quiet studio with balcony",
    "Family apartment close to the metro",
    "Renovated loft in the old town",
    "Garden duplex on a calm street",
    "Compact flat with city views",
];
const COMMENTS: [&str; 4] = [
    "Exactly as described, the host was very responsive.",
    "Great location and a comfortable bed.",
    "Clean and quiet, would stay again.",
    "Good value for the price, small kitchen though.",
];

// Bounding box used for seeded coordinates.
const LAT_MIN: f64 = 44.4;
const LAT_SPAN: f64 = 0.1;
const LNG_MIN: f64 = 26.0;
const LNG_SPAN: f64 = 0.2;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Listing(#[from] ListingError),
    #[error(transparent)]
    Review(#[from] ReviewError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub listings: usize,
    pub images: usize,
    pub reviews: usize,
}

pub struct SeedService {
    store: Arc<dyn SeedRepo>,
    users: Arc<dyn UsersRepo>,
    listings: ListingService,
    reviews: ReviewService,
}

impl SeedService {
    pub fn new(
        store: Arc<dyn SeedRepo>,
        users: Arc<dyn UsersRepo>,
        listings: ListingService,
        reviews: ReviewService,
    ) -> Self {
        Self {
            store,
            users,
            listings,
            reviews,
        }
    }

    pub async fn run(&self) -> Result<SeedReport, SeedError> {
        self.store.clear_all().await?;
        info!(target: TARGET, "Cleared existing data");

        let mut report = SeedReport::default();
        let mut authors = Vec::with_capacity(USER_COUNT);
        for index in 0..USER_COUNT {
            let external_id = format!("user_placeholder_{}", index + 1);
            let first = FIRST_NAMES[index];
            let last = LAST_NAMES[index];
            self.users
                .ensure_user(UpsertUserParams {
                    external_id: external_id.clone(),
                    email: Some(format!(
                        "{}.{}@example.com",
                        first.to_lowercase(),
                        last.to_lowercase()
                    )),
                    first_name: Some(first.to_string()),
                    last_name: Some(last.to_string()),
                    image_url: Some(format!("https://i.pravatar.cc/150?u={external_id}")),
                })
                .await?;
            authors.push(external_id);
            report.users += 1;
        }

        let mut seeded = Vec::with_capacity(USER_COUNT * LISTINGS_PER_USER);
        for (author_index, author) in authors.iter().enumerate() {
            for slot in 0..LISTINGS_PER_USER {
                let ordinal = author_index * LISTINGS_PER_USER + slot;
                let command = sample_listing(ordinal);
                report.images += command.image_urls.len();
                let listing = self.listings.create(author, command).await?;
                seeded.push((author_index, listing.id));
                report.listings += 1;
            }
        }

        for (ordinal, (author_index, listing_id)) in seeded.iter().enumerate() {
            let review_count = 1 + ordinal % 2;
            for offset in 1..=review_count {
                let reviewer = &authors[(author_index + offset) % USER_COUNT];
                self.reviews
                    .create(
                        reviewer,
                        CreateReviewCommand {
                            listing_id: *listing_id,
                            rating: 3 + ((ordinal + offset) % 3) as i16,
                            comment: COMMENTS[(ordinal + offset) % COMMENTS.len()].to_string(),
                        },
                    )
                    .await?;
                report.reviews += 1;
            }
        }

        info!(
            target: TARGET,
            users = report.users,
            listings = report.listings,
            images = report.images,
            reviews = report.reviews,
            "Seeding finished"
        );
        Ok(report)
    }
}

fn sample_listing(ordinal: usize) -> CreateListingCommand {
    // Spread points over the bounding box with a low-discrepancy sequence.
    let lat_step = ((ordinal as f64) * 0.618_034).fract();
    let lng_step = ((ordinal as f64) * 0.754_878).fract();
    let image_count = 2 + ordinal % 4;
    let cents = 5_000 + ((ordinal as i64 * 3_779) % 45_001);

    CreateListingCommand {
        title: TITLES[ordinal % TITLES.len()].to_string(),
        description: format!(
            "{} Listing number {} in the sample catalogue.",
            TITLES[(ordinal + 1) % TITLES.len()],
            ordinal + 1
        ),
        price: Price::from_cents(cents).unwrap_or(Price::ZERO),
        latitude: round6(LAT_MIN + lat_step * LAT_SPAN),
        longitude: round6(LNG_MIN + lng_step * LNG_SPAN),
        image_urls: (0..image_count)
            .map(|image| format!("https://picsum.photos/seed/topzonal-{ordinal}-{image}/800/600"))
            .collect(),
    }
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_stay_inside_bounds() {
        for ordinal in 0..USER_COUNT * LISTINGS_PER_USER {
            let sample = sample_listing(ordinal);
            assert!((44.4..=44.5).contains(&sample.latitude));
            assert!((26.0..=26.2).contains(&sample.longitude));
            assert!((2..=5).contains(&sample.image_urls.len()));
            assert!((5_000..=50_000).contains(&sample.price.cents()));
        }
    }

    #[test]
    fn samples_are_deterministic() {
        let first = sample_listing(7);
        let second = sample_listing(7);
        assert_eq!(first.latitude, second.latitude);
        assert_eq!(first.image_urls, second.image_urls);
    }
}
