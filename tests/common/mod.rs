//! In-memory stand-ins for the Postgres repositories and the search index.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderName, Request, Response};
use http_body_util::BodyExt;
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

use topzonal::application::listings::ListingService;
use topzonal::application::mirror::{IndexMirror, SearchIndex, SearchIndexError};
use topzonal::application::payments::PaymentService;
use topzonal::application::ranking::PopularListingsService;
use topzonal::application::repos::{
    CreateListingParams, CreateReviewParams, ListingsRepo, ListingsWriteRepo, RepoError,
    ReviewsRepo, SeedRepo, UpdateListingParams, UpsertUserParams, UsersRepo,
};
use topzonal::application::reviews::ReviewService;
use topzonal::cache::{CacheConfig, MemoryRankingStore};
use topzonal::domain::entities::{
    ImageRecord, ListingDetail, ListingRecord, PopularListing, ReviewRecord, UserRecord,
};
use topzonal::domain::price::Price;
use topzonal::domain::ranking::rank_popular;
use topzonal::domain::search::SearchIndexEntry;
use topzonal::infra::http::{self, ApiRateLimiter, ApiState};

pub const USER_HEADER: &str = "x-user-id";
pub const WEBHOOK_SECRET: &str = "whsec_integration";

#[derive(Default)]
struct Tables {
    listings: Vec<ListingRecord>,
    images: Vec<ImageRecord>,
    reviews: Vec<ReviewRecord>,
    users: HashMap<String, UserRecord>,
}

#[derive(Default)]
pub struct InMemoryRepos {
    tables: Mutex<Tables>,
    pub popular_queries: AtomicUsize,
    pub popular_fails: AtomicBool,
}

impl InMemoryRepos {
    pub fn insert_listing(&self, author_id: &str, title: &str) -> ListingRecord {
        let now = OffsetDateTime::now_utc();
        let listing = ListingRecord {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: format!("{title} description"),
            price: Price::from_cents(10_000).unwrap(),
            latitude: 44.43,
            longitude: 26.10,
            author_id: author_id.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().unwrap().listings.push(listing.clone());
        listing
    }

    pub fn insert_reviews(&self, listing_id: Uuid, count: usize) {
        let mut tables = self.tables.lock().unwrap();
        for n in 0..count {
            tables.reviews.push(ReviewRecord {
                id: Uuid::new_v4(),
                rating: 4,
                comment: format!("review {n}"),
                author_id: format!("reviewer_{n}"),
                listing_id,
                created_at: OffsetDateTime::now_utc(),
            });
        }
    }

    pub fn insert_user(&self, external_id: &str) {
        let record = new_user(external_id);
        self.tables
            .lock()
            .unwrap()
            .users
            .insert(external_id.to_string(), record);
    }

    pub fn set_premium_until(&self, external_id: &str, until: OffsetDateTime) {
        let mut tables = self.tables.lock().unwrap();
        let user = tables.users.get_mut(external_id).unwrap();
        user.is_premium = true;
        user.premium_until = Some(until);
    }

    pub fn user_count(&self) -> usize {
        self.tables.lock().unwrap().users.len()
    }

    pub fn user(&self, external_id: &str) -> Option<UserRecord> {
        self.tables.lock().unwrap().users.get(external_id).cloned()
    }

    pub fn listing(&self, id: Uuid) -> Option<ListingRecord> {
        self.tables
            .lock()
            .unwrap()
            .listings
            .iter()
            .find(|listing| listing.id == id)
            .cloned()
    }

    pub fn listings(&self) -> Vec<ListingRecord> {
        self.tables.lock().unwrap().listings.clone()
    }

    pub fn reviews(&self) -> Vec<ReviewRecord> {
        self.tables.lock().unwrap().reviews.clone()
    }

    pub fn image_count(&self) -> usize {
        self.tables.lock().unwrap().images.len()
    }

    pub fn listing_count(&self) -> usize {
        self.tables.lock().unwrap().listings.len()
    }

    pub fn review_count(&self, listing_id: Uuid) -> usize {
        self.tables
            .lock()
            .unwrap()
            .reviews
            .iter()
            .filter(|review| review.listing_id == listing_id)
            .count()
    }
}

fn new_user(external_id: &str) -> UserRecord {
    UserRecord {
        id: Uuid::new_v4(),
        external_id: external_id.to_string(),
        email: None,
        first_name: None,
        last_name: None,
        image_url: None,
        is_premium: false,
        premium_until: None,
        created_at: OffsetDateTime::now_utc(),
    }
}

#[async_trait]
impl ListingsRepo for InMemoryRepos {
    async fn list_popular(&self, limit: u32) -> Result<Vec<PopularListing>, RepoError> {
        self.popular_queries.fetch_add(1, Ordering::SeqCst);
        if self.popular_fails.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("connection refused"));
        }
        let tables = self.tables.lock().unwrap();
        let rows = tables
            .listings
            .iter()
            .map(|listing| PopularListing {
                listing: listing.clone(),
                review_count: tables
                    .reviews
                    .iter()
                    .filter(|review| review.listing_id == listing.id)
                    .count() as i64,
            })
            .collect();
        Ok(rank_popular(rows, limit as usize))
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<ListingRecord>, RepoError> {
        let mut listings = self.tables.lock().unwrap().listings.clone();
        listings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        listings.truncate(limit as usize);
        Ok(listings)
    }

    async fn list_after(
        &self,
        after: Option<Uuid>,
        limit: u32,
    ) -> Result<Vec<ListingRecord>, RepoError> {
        let mut listings = self.tables.lock().unwrap().listings.clone();
        listings.sort_by_key(|listing| listing.id);
        Ok(listings
            .into_iter()
            .filter(|listing| after.is_none_or(|after| listing.id > after))
            .take(limit as usize)
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ListingRecord>, RepoError> {
        Ok(self.listing(id))
    }

    async fn find_detail(&self, id: Uuid) -> Result<Option<ListingDetail>, RepoError> {
        let tables = self.tables.lock().unwrap();
        let Some(listing) = tables.listings.iter().find(|l| l.id == id).cloned() else {
            return Ok(None);
        };
        Ok(Some(ListingDetail {
            images: tables
                .images
                .iter()
                .filter(|image| image.listing_id == id)
                .cloned()
                .collect(),
            reviews: tables
                .reviews
                .iter()
                .filter(|review| review.listing_id == id)
                .cloned()
                .collect(),
            listing,
        }))
    }
}

#[async_trait]
impl ListingsWriteRepo for InMemoryRepos {
    async fn create_listing(
        &self,
        params: CreateListingParams,
    ) -> Result<ListingRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let listing = ListingRecord {
            id: Uuid::new_v4(),
            title: params.title,
            description: params.description,
            price: params.price,
            latitude: params.location.lat,
            longitude: params.location.lng,
            author_id: params.author_id,
            created_at: now,
            updated_at: now,
        };
        let mut tables = self.tables.lock().unwrap();
        for url in params.image_urls {
            tables.images.push(ImageRecord {
                id: Uuid::new_v4(),
                listing_id: listing.id,
                url,
            });
        }
        tables.listings.push(listing.clone());
        Ok(listing)
    }

    async fn update_listing(
        &self,
        params: UpdateListingParams,
    ) -> Result<ListingRecord, RepoError> {
        let mut tables = self.tables.lock().unwrap();
        let listing = tables
            .listings
            .iter_mut()
            .find(|listing| listing.id == params.id)
            .ok_or(RepoError::NotFound)?;
        listing.title = params.title;
        listing.description = params.description;
        listing.price = params.price;
        listing.latitude = params.location.lat;
        listing.longitude = params.location.lng;
        listing.updated_at = OffsetDateTime::now_utc();
        Ok(listing.clone())
    }

    async fn delete_listing(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.listings.len();
        tables.listings.retain(|listing| listing.id != id);
        if tables.listings.len() == before {
            return Err(RepoError::NotFound);
        }
        tables.images.retain(|image| image.listing_id != id);
        tables.reviews.retain(|review| review.listing_id != id);
        Ok(())
    }
}

#[async_trait]
impl ReviewsRepo for InMemoryRepos {
    async fn create_review(&self, params: CreateReviewParams) -> Result<ReviewRecord, RepoError> {
        let review = ReviewRecord {
            id: Uuid::new_v4(),
            rating: params.rating,
            comment: params.comment,
            author_id: params.author_id,
            listing_id: params.listing_id,
            created_at: OffsetDateTime::now_utc(),
        };
        self.tables.lock().unwrap().reviews.push(review.clone());
        Ok(review)
    }
}

#[async_trait]
impl UsersRepo for InMemoryRepos {
    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.user(external_id))
    }

    async fn ensure_user(&self, params: UpsertUserParams) -> Result<UserRecord, RepoError> {
        let mut tables = self.tables.lock().unwrap();
        let user = tables
            .users
            .entry(params.external_id.clone())
            .or_insert_with(|| new_user(&params.external_id));
        Ok(user.clone())
    }

    async fn grant_premium(
        &self,
        external_id: &str,
        until: OffsetDateTime,
    ) -> Result<Option<UserRecord>, RepoError> {
        let mut tables = self.tables.lock().unwrap();
        Ok(tables.users.get_mut(external_id).map(|user| {
            user.is_premium = true;
            let until = user.premium_until.map_or(until, |current| current.max(until));
            user.premium_until = Some(until);
            user.clone()
        }))
    }
}

#[async_trait]
impl SeedRepo for InMemoryRepos {
    async fn clear_all(&self) -> Result<(), RepoError> {
        *self.tables.lock().unwrap() = Tables::default();
        Ok(())
    }
}

/// Search index double that remembers calls and can be switched to fail.
#[derive(Default)]
pub struct RecordingIndex {
    pub saved: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
    pub failing: AtomicBool,
    pub missing_on_delete: AtomicBool,
}

#[async_trait]
impl SearchIndex for RecordingIndex {
    async fn save_object(&self, entry: &SearchIndexEntry) -> Result<(), SearchIndexError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SearchIndexError::Transport("connection reset".into()));
        }
        self.saved.lock().unwrap().push(entry.object_id.clone());
        Ok(())
    }

    async fn delete_object(&self, object_id: &str) -> Result<(), SearchIndexError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SearchIndexError::Status {
                status: 503,
                body: "unavailable".into(),
            });
        }
        if self.missing_on_delete.load(Ordering::SeqCst) {
            return Err(SearchIndexError::NotFound);
        }
        self.deleted.lock().unwrap().push(object_id.to_string());
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub repos: Arc<InMemoryRepos>,
    pub index: Arc<RecordingIndex>,
}

pub struct TestAppOptions {
    pub webhook_secret: Option<String>,
    pub max_requests: u32,
}

impl Default for TestAppOptions {
    fn default() -> Self {
        Self {
            webhook_secret: Some(WEBHOOK_SECRET.to_string()),
            max_requests: 100,
        }
    }
}

pub fn test_app() -> TestApp {
    test_app_with(TestAppOptions::default())
}

pub fn test_app_with(options: TestAppOptions) -> TestApp {
    let repos = Arc::new(InMemoryRepos::default());
    let index = Arc::new(RecordingIndex::default());
    let mirror = Arc::new(IndexMirror::new(index.clone(), Duration::from_secs(2)));

    let listings = ListingService::new(repos.clone(), repos.clone(), repos.clone())
        .with_mirror_opt(Some(mirror));
    let reviews = ReviewService::new(repos.clone(), repos.clone(), repos.clone());
    let popular = PopularListingsService::new(
        repos.clone(),
        Arc::new(MemoryRankingStore::new()),
        CacheConfig::default(),
        Duration::from_secs(5),
    );
    let payments = PaymentService::new(
        repos.clone(),
        options.webhook_secret,
        Duration::from_secs(300),
        30,
    );

    let state = ApiState {
        listings: Arc::new(listings),
        popular: Arc::new(popular),
        reviews: Arc::new(reviews),
        payments: Arc::new(payments),
        db: None,
        rate_limiter: Arc::new(ApiRateLimiter::new(
            Duration::from_secs(60),
            options.max_requests,
        )),
        user_header: HeaderName::from_static(USER_HEADER),
    };

    TestApp {
        router: http::build_router(state),
        repos,
        index,
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.unwrap()
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub fn json_request(
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(user) = user {
        builder = builder.header(USER_HEADER, user);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}
