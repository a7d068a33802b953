use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{
        CreateListingParams, ListingsRepo, ListingsWriteRepo, RepoError, UpdateListingParams,
    },
    domain::entities::{ImageRecord, ListingDetail, ListingRecord, PopularListing, ReviewRecord},
    domain::price::Price,
};

use super::{PostgresRepositories, map_sqlx_error};

const LISTING_COLUMNS: &str = "l.id, l.title, l.description, l.price_cents, l.latitude, \
    l.longitude, l.author_id, l.created_at, l.updated_at";

#[derive(sqlx::FromRow)]
struct ListingRow {
    id: Uuid,
    title: String,
    description: String,
    price_cents: i64,
    latitude: f64,
    longitude: f64,
    author_id: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<ListingRow> for ListingRecord {
    type Error = RepoError;

    fn try_from(row: ListingRow) -> Result<Self, Self::Error> {
        let price = Price::from_cents(row.price_cents).map_err(|err| RepoError::Integrity {
            message: format!("listing {}: {err}", row.id),
        })?;
        Ok(Self {
            id: row.id,
            title: row.title,
            description: row.description,
            price,
            latitude: row.latitude,
            longitude: row.longitude,
            author_id: row.author_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PopularRow {
    #[sqlx(flatten)]
    listing: ListingRow,
    review_count: i64,
}

#[derive(sqlx::FromRow)]
struct ImageRow {
    id: Uuid,
    listing_id: Uuid,
    url: String,
}

impl From<ImageRow> for ImageRecord {
    fn from(row: ImageRow) -> Self {
        Self {
            id: row.id,
            listing_id: row.listing_id,
            url: row.url,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct ReviewRow {
    pub(super) id: Uuid,
    pub(super) rating: i16,
    pub(super) comment: String,
    pub(super) author_id: String,
    pub(super) listing_id: Uuid,
    pub(super) created_at: OffsetDateTime,
}

impl From<ReviewRow> for ReviewRecord {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            rating: row.rating,
            comment: row.comment,
            author_id: row.author_id,
            listing_id: row.listing_id,
            created_at: row.created_at,
        }
    }
}

fn into_records(rows: Vec<ListingRow>) -> Result<Vec<ListingRecord>, RepoError> {
    rows.into_iter().map(ListingRecord::try_from).collect()
}

#[async_trait]
impl ListingsRepo for PostgresRepositories {
    async fn list_popular(&self, limit: u32) -> Result<Vec<PopularListing>, RepoError> {
        let sql = format!(
            "SELECT {LISTING_COLUMNS}, COUNT(r.id) AS review_count \
             FROM listings l \
             LEFT JOIN reviews r ON r.listing_id = l.id \
             GROUP BY l.id \
             ORDER BY review_count DESC, l.id ASC \
             LIMIT $1"
        );
        let rows = sqlx::query_as::<_, PopularRow>(&sql)
            .bind(i64::from(limit))
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(PopularListing {
                    listing: ListingRecord::try_from(row.listing)?,
                    review_count: row.review_count,
                })
            })
            .collect()
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<ListingRecord>, RepoError> {
        let sql = format!(
            "SELECT {LISTING_COLUMNS} FROM listings l \
             ORDER BY l.created_at DESC, l.id DESC \
             LIMIT $1"
        );
        let rows = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(i64::from(limit))
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        into_records(rows)
    }

    async fn list_after(
        &self,
        after: Option<Uuid>,
        limit: u32,
    ) -> Result<Vec<ListingRecord>, RepoError> {
        let sql = format!(
            "SELECT {LISTING_COLUMNS} FROM listings l \
             WHERE $1::uuid IS NULL OR l.id > $1 \
             ORDER BY l.id ASC \
             LIMIT $2"
        );
        let rows = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(after)
            .bind(i64::from(limit))
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        into_records(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ListingRecord>, RepoError> {
        let sql = format!("SELECT {LISTING_COLUMNS} FROM listings l WHERE l.id = $1");
        let row = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(ListingRecord::try_from).transpose()
    }

    async fn find_detail(&self, id: Uuid) -> Result<Option<ListingDetail>, RepoError> {
        let Some(listing) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let images = sqlx::query_as::<_, ImageRow>(
            "SELECT id, listing_id, url FROM listing_images WHERE listing_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(self.pool());
        let reviews = sqlx::query_as::<_, ReviewRow>(
            "SELECT id, rating, comment, author_id, listing_id, created_at \
             FROM reviews WHERE listing_id = $1 ORDER BY created_at DESC, id",
        )
        .bind(id)
        .fetch_all(self.pool());

        let (images, reviews) = tokio::try_join!(images, reviews).map_err(map_sqlx_error)?;

        Ok(Some(ListingDetail {
            listing,
            images: images.into_iter().map(ImageRecord::from).collect(),
            reviews: reviews.into_iter().map(ReviewRecord::from).collect(),
        }))
    }
}

#[async_trait]
impl ListingsWriteRepo for PostgresRepositories {
    async fn create_listing(
        &self,
        params: CreateListingParams,
    ) -> Result<ListingRecord, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query_as::<_, ListingRow>(
            "INSERT INTO listings \
                (id, title, description, price_cents, latitude, longitude, author_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, title, description, price_cents, latitude, longitude, author_id, \
                created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(&params.title)
        .bind(&params.description)
        .bind(params.price.cents())
        .bind(params.location.lat)
        .bind(params.location.lng)
        .bind(&params.author_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        for url in &params.image_urls {
            sqlx::query("INSERT INTO listing_images (id, listing_id, url) VALUES ($1, $2, $3)")
                .bind(Uuid::new_v4())
                .bind(row.id)
                .bind(url)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        ListingRecord::try_from(row)
    }

    async fn update_listing(
        &self,
        params: UpdateListingParams,
    ) -> Result<ListingRecord, RepoError> {
        let row = sqlx::query_as::<_, ListingRow>(
            "UPDATE listings \
             SET title = $2, description = $3, price_cents = $4, latitude = $5, \
                longitude = $6, updated_at = now() \
             WHERE id = $1 \
             RETURNING id, title, description, price_cents, latitude, longitude, author_id, \
                created_at, updated_at",
        )
        .bind(params.id)
        .bind(&params.title)
        .bind(&params.description)
        .bind(params.price.cents())
        .bind(params.location.lat)
        .bind(params.location.lng)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepoError::NotFound)?;

        ListingRecord::try_from(row)
    }

    async fn delete_listing(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM listings WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
