use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{RepoError, UpsertUserParams, UsersRepo},
    domain::entities::UserRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

const USER_COLUMNS: &str = "id, external_id, email, first_name, last_name, image_url, \
    is_premium, premium_until, created_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    external_id: String,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    image_url: Option<String>,
    is_premium: bool,
    premium_until: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            external_id: row.external_id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            image_url: row.image_url,
            is_premium: row.is_premium,
            premium_until: row.premium_until,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl UsersRepo for PostgresRepositories {
    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE external_id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(external_id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(UserRecord::from))
    }

    async fn ensure_user(&self, params: UpsertUserParams) -> Result<UserRecord, RepoError> {
        let sql = format!(
            "INSERT INTO users (id, external_id, email, first_name, last_name, image_url) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (external_id) DO UPDATE SET \
                email = COALESCE(users.email, EXCLUDED.email), \
                first_name = COALESCE(users.first_name, EXCLUDED.first_name), \
                last_name = COALESCE(users.last_name, EXCLUDED.last_name), \
                image_url = COALESCE(users.image_url, EXCLUDED.image_url) \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&params.external_id)
            .bind(&params.email)
            .bind(&params.first_name)
            .bind(&params.last_name)
            .bind(&params.image_url)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(UserRecord::from(row))
    }

    async fn grant_premium(
        &self,
        external_id: &str,
        until: OffsetDateTime,
    ) -> Result<Option<UserRecord>, RepoError> {
        // Never shorten an entitlement that already runs past `until`.
        let sql = format!(
            "UPDATE users SET \
                is_premium = TRUE, \
                premium_until = GREATEST(COALESCE(premium_until, $2), $2), \
                updated_at = now() \
             WHERE external_id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(external_id)
            .bind(until)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(UserRecord::from))
    }
}
