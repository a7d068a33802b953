mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use topzonal::application::listings::ListingService;
use topzonal::application::mirror::IndexMirror;
use topzonal::application::reviews::ReviewService;
use topzonal::application::seed::{SeedReport, SeedService};

use common::{InMemoryRepos, RecordingIndex};

fn seeder(repos: &Arc<InMemoryRepos>, index: &Arc<RecordingIndex>) -> SeedService {
    let mirror = Arc::new(IndexMirror::new(index.clone(), Duration::from_secs(2)));
    let listings = ListingService::new(repos.clone(), repos.clone(), repos.clone())
        .with_mirror_opt(Some(mirror));
    let reviews = ReviewService::new(repos.clone(), repos.clone(), repos.clone());
    SeedService::new(repos.clone(), repos.clone(), listings, reviews)
}

#[tokio::test]
async fn seed_replaces_existing_data_with_the_sample_catalogue() {
    let repos = Arc::new(InMemoryRepos::default());
    let index = Arc::new(RecordingIndex::default());
    let stale = repos.insert_listing("someone_else", "stale");
    repos.insert_reviews(stale.id, 2);
    repos.insert_user("someone_else");

    let report = seeder(&repos, &index).run().await.unwrap();

    assert_eq!(report.users, 3);
    assert_eq!(report.listings, 12);
    assert!((12..=24).contains(&report.reviews));
    assert_eq!(report.images, repos.image_count());

    assert!(repos.listing(stale.id).is_none());
    assert!(repos.user("someone_else").is_none());
    assert_eq!(repos.user_count(), 3);
    assert_eq!(repos.listing_count(), 12);

    let listings = repos.listings();
    let authors: HashMap<_, _> = listings
        .iter()
        .map(|listing| (listing.id, listing.author_id.clone()))
        .collect();
    let reviews = repos.reviews();
    assert_eq!(reviews.len(), report.reviews);
    for review in &reviews {
        assert_ne!(Some(&review.author_id), authors.get(&review.listing_id));
    }
    for listing in &listings {
        let count = reviews
            .iter()
            .filter(|review| review.listing_id == listing.id)
            .count();
        assert!((1..=2).contains(&count), "{} has {count} reviews", listing.id);
    }

    assert_eq!(index.saved.lock().unwrap().len(), 12);
}

#[tokio::test]
async fn reseeding_yields_the_same_report() {
    let repos = Arc::new(InMemoryRepos::default());
    let index = Arc::new(RecordingIndex::default());
    let seeder = seeder(&repos, &index);

    let first: SeedReport = seeder.run().await.unwrap();
    let second = seeder.run().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(repos.listing_count(), 12);
}
