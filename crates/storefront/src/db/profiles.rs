//! Profile repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use bazaar_core::{StoreSlug, UserId};

use super::{ProfileStore, RepositoryError};
use crate::models::Profile;

const PROFILE_COLUMNS: &str =
    "id, store_name, store_slug, is_setup_complete, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    store_name: Option<String>,
    store_slug: Option<String>,
    is_setup_complete: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = RepositoryError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let store_slug = row
            .store_slug
            .as_deref()
            .map(StoreSlug::parse)
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid slug in database: {e}")))?;

        Ok(Self {
            id: UserId::new(row.id),
            store_name: row.store_name,
            store_slug,
            is_setup_complete: row.is_setup_complete,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// `PostgreSQL` profile repository.
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    /// Create a new profile repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for ProfileRepository {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn setup_state(&self, user: UserId) -> Result<Option<bool>, RepositoryError> {
        let complete: Option<bool> =
            sqlx::query_scalar("SELECT is_setup_complete FROM bazaar.profile WHERE id = $1")
                .bind(user)
                .fetch_optional(&self.pool)
                .await?;
        Ok(complete)
    }

    async fn get(&self, user: UserId) -> Result<Option<Profile>, RepositoryError> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {PROFILE_COLUMNS} FROM bazaar.profile WHERE id = $1"
        ))
        .bind(user)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Profile::try_from).transpose()
    }

    async fn get_storefront(&self, slug: &StoreSlug) -> Result<Option<Profile>, RepositoryError> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {PROFILE_COLUMNS} FROM bazaar.profile \
             WHERE store_slug = $1 AND is_setup_complete"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Profile::try_from).transpose()
    }

    async fn ensure(&self, user: UserId) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO bazaar.profile (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(user)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn complete_setup(
        &self,
        user: UserId,
        store_name: &str,
        slug: &StoreSlug,
    ) -> Result<Profile, RepositoryError> {
        let row: ProfileRow = sqlx::query_as(&format!(
            r"
            INSERT INTO bazaar.profile (id, store_name, store_slug, is_setup_complete)
            VALUES ($1, $2, $3, TRUE)
            ON CONFLICT (id) DO UPDATE
            SET store_name = EXCLUDED.store_name,
                store_slug = EXCLUDED.store_slug,
                is_setup_complete = TRUE,
                updated_at = now()
            RETURNING {PROFILE_COLUMNS}
            "
        ))
        .bind(user)
        .bind(store_name)
        .bind(slug)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "store slug"))?;

        Profile::try_from(row)
    }

    async fn list_storefronts(&self) -> Result<Vec<Profile>, RepositoryError> {
        let rows: Vec<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {PROFILE_COLUMNS} FROM bazaar.profile \
             WHERE is_setup_complete ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Profile::try_from).collect()
    }
}
