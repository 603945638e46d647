//! Postgres-backed comparison store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `NotFound` for the referenced parent |
//! | Database (other) | Any other | `Storage` |
//! | PoolClosed / other | N/A | `Storage` |
//!
//! Enum columns are stored as their wire strings (`in-progress`, `high`, ...)
//! and coordinates as a JSONB object, so rows read back exactly as the JSON
//! API shows them.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use designdiff_core::{
    Activity, ActivityType, Comment, Comparison, ComparisonId, ComparisonStatus, Coordinates,
    Discrepancy, DiscrepancyId, DiscrepancyPriority, DiscrepancyStatus, DiscrepancyType,
    DiscrepancyUpdate, ProjectId, UserId,
};

use super::{ComparisonStore, StoreError};

/// Schema statements, applied in order by [`PostgresComparisonStore::ensure_schema`].
///
/// `seq` columns give discrepancies and comments a stable creation order
/// independent of clock resolution.
pub const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS comparisons (
        id               UUID PRIMARY KEY,
        project_id       UUID NOT NULL,
        name             TEXT NOT NULL,
        description      TEXT NOT NULL DEFAULT '',
        design_image     TEXT NOT NULL,
        website_image    TEXT NOT NULL,
        status           TEXT NOT NULL,
        used_fallback    BOOLEAN NOT NULL DEFAULT FALSE,
        created_at       TIMESTAMPTZ NOT NULL,
        last_compared_at TIMESTAMPTZ NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS comparisons_project_idx ON comparisons (project_id, created_at DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS discrepancies (
        id            UUID PRIMARY KEY,
        seq           BIGSERIAL,
        comparison_id UUID NOT NULL REFERENCES comparisons (id) ON DELETE CASCADE,
        title         TEXT NOT NULL,
        description   TEXT NOT NULL DEFAULT '',
        type          TEXT NOT NULL,
        priority      TEXT NOT NULL,
        status        TEXT NOT NULL,
        coordinates   JSONB NOT NULL,
        created_at    TIMESTAMPTZ NOT NULL,
        updated_at    TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS discrepancies_comparison_idx ON discrepancies (comparison_id, seq)",
    r#"
    CREATE TABLE IF NOT EXISTS discrepancy_comments (
        id             UUID PRIMARY KEY,
        seq            BIGSERIAL,
        discrepancy_id UUID NOT NULL REFERENCES discrepancies (id) ON DELETE CASCADE,
        user_id        UUID NULL,
        body           TEXT NOT NULL,
        created_at     TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS discrepancy_comments_idx ON discrepancy_comments (discrepancy_id, seq)",
    r#"
    CREATE TABLE IF NOT EXISTS activities (
        id          UUID PRIMARY KEY,
        project_id  UUID NOT NULL,
        user_id     UUID NULL,
        type        TEXT NOT NULL,
        description TEXT NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS activities_project_idx ON activities (project_id, created_at DESC)",
];

const COMPARISON_COLUMNS: &str = "id, project_id, name, description, design_image, website_image, \
     status, used_fallback, created_at, last_compared_at";

const DISCREPANCY_COLUMNS: &str = "id, comparison_id, title, description, type, priority, status, \
     coordinates, created_at, updated_at";

/// Postgres-backed implementation of [`ComparisonStore`].
///
/// Uses the SQLx connection pool, which is `Send + Sync` and cheap to clone.
#[derive(Debug, Clone)]
pub struct PostgresComparisonStore {
    pool: Arc<PgPool>,
}

impl PostgresComparisonStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect to `database_url` and make sure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Create tables and indexes if they are missing. Idempotent.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl ComparisonStore for PostgresComparisonStore {
    #[instrument(skip(self, comparison), fields(comparison_id = %comparison.id), err)]
    async fn create_comparison(&self, comparison: Comparison) -> Result<Comparison, StoreError> {
        sqlx::query(&format!(
            "INSERT INTO comparisons ({COMPARISON_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        ))
        .bind(comparison.id.as_uuid())
        .bind(comparison.project_id.as_uuid())
        .bind(&comparison.name)
        .bind(&comparison.description)
        .bind(&comparison.design_image)
        .bind(&comparison.website_image)
        .bind(comparison.status.as_str())
        .bind(comparison.used_fallback)
        .bind(comparison.created_at)
        .bind(comparison.last_compared_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_comparison", e))?;

        Ok(comparison)
    }

    #[instrument(skip(self), fields(comparison_id = %id), err)]
    async fn get_comparison(&self, id: ComparisonId) -> Result<Option<Comparison>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {COMPARISON_COLUMNS} FROM comparisons WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_comparison", e))?;

        row.as_ref().map(comparison_from_row).transpose()
    }

    #[instrument(skip(self, comparison), fields(comparison_id = %comparison.id), err)]
    async fn update_comparison(&self, comparison: &Comparison) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE comparisons
            SET name = $2,
                description = $3,
                design_image = $4,
                website_image = $5,
                status = $6,
                used_fallback = $7,
                last_compared_at = $8
            WHERE id = $1
            "#,
        )
        .bind(comparison.id.as_uuid())
        .bind(&comparison.name)
        .bind(&comparison.description)
        .bind(&comparison.design_image)
        .bind(&comparison.website_image)
        .bind(comparison.status.as_str())
        .bind(comparison.used_fallback)
        .bind(comparison.last_compared_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_comparison", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("comparison", comparison.id));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(project_id = %project_id), err)]
    async fn list_comparisons(&self, project_id: ProjectId) -> Result<Vec<Comparison>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {COMPARISON_COLUMNS} FROM comparisons \
             WHERE project_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(project_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_comparisons", e))?;

        rows.iter().map(comparison_from_row).collect()
    }

    #[instrument(
        skip(self, discrepancy),
        fields(comparison_id = %discrepancy.comparison_id, discrepancy_id = %discrepancy.id),
        err
    )]
    async fn create_discrepancy(&self, discrepancy: Discrepancy) -> Result<Discrepancy, StoreError> {
        sqlx::query(&format!(
            "INSERT INTO discrepancies ({DISCREPANCY_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        ))
        .bind(discrepancy.id.as_uuid())
        .bind(discrepancy.comparison_id.as_uuid())
        .bind(&discrepancy.title)
        .bind(&discrepancy.description)
        .bind(discrepancy.kind.as_str())
        .bind(discrepancy.priority.as_str())
        .bind(discrepancy.status.as_str())
        .bind(Json(discrepancy.coordinates))
        .bind(discrepancy.created_at)
        .bind(discrepancy.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                StoreError::not_found("comparison", discrepancy.comparison_id)
            } else {
                map_sqlx_error("create_discrepancy", e)
            }
        })?;

        Ok(discrepancy)
    }

    #[instrument(skip(self), fields(discrepancy_id = %id), err)]
    async fn get_discrepancy(&self, id: DiscrepancyId) -> Result<Option<Discrepancy>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {DISCREPANCY_COLUMNS} FROM discrepancies WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_discrepancy", e))?;

        row.as_ref().map(discrepancy_from_row).transpose()
    }

    #[instrument(skip(self), fields(comparison_id = %comparison_id), err)]
    async fn list_discrepancies(
        &self,
        comparison_id: ComparisonId,
    ) -> Result<Vec<Discrepancy>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {DISCREPANCY_COLUMNS} FROM discrepancies \
             WHERE comparison_id = $1 ORDER BY seq ASC"
        ))
        .bind(comparison_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_discrepancies", e))?;

        rows.iter().map(discrepancy_from_row).collect()
    }

    #[instrument(skip(self, update), fields(discrepancy_id = %id), err)]
    async fn update_discrepancy(
        &self,
        id: DiscrepancyId,
        update: &DiscrepancyUpdate,
    ) -> Result<Discrepancy, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("update_discrepancy", e))?;

        let row = sqlx::query(&format!(
            "SELECT {DISCREPANCY_COLUMNS} FROM discrepancies WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_discrepancy", e))?
        .ok_or_else(|| StoreError::not_found("discrepancy", id))?;

        let mut discrepancy = discrepancy_from_row(&row)?;
        discrepancy.apply_update(update, Utc::now())?;

        sqlx::query(
            r#"
            UPDATE discrepancies
            SET title = $2, description = $3, priority = $4, status = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(discrepancy.id.as_uuid())
        .bind(&discrepancy.title)
        .bind(&discrepancy.description)
        .bind(discrepancy.priority.as_str())
        .bind(discrepancy.status.as_str())
        .bind(discrepancy.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_discrepancy", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("update_discrepancy", e))?;

        Ok(discrepancy)
    }

    #[instrument(skip(self, comment), fields(discrepancy_id = %comment.discrepancy_id), err)]
    async fn create_comment(&self, comment: Comment) -> Result<Comment, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO discrepancy_comments (id, discrepancy_id, user_id, body, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(comment.id.as_uuid())
        .bind(comment.discrepancy_id.as_uuid())
        .bind(comment.user_id.map(Uuid::from))
        .bind(&comment.body)
        .bind(comment.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                StoreError::not_found("discrepancy", comment.discrepancy_id)
            } else {
                map_sqlx_error("create_comment", e)
            }
        })?;

        Ok(comment)
    }

    #[instrument(skip(self), fields(discrepancy_id = %discrepancy_id), err)]
    async fn list_comments(&self, discrepancy_id: DiscrepancyId) -> Result<Vec<Comment>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, discrepancy_id, user_id, body, created_at
            FROM discrepancy_comments
            WHERE discrepancy_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(discrepancy_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_comments", e))?;

        rows.iter().map(comment_from_row).collect()
    }

    #[instrument(skip(self, activity), fields(project_id = %activity.project_id), err)]
    async fn create_activity(&self, activity: Activity) -> Result<Activity, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO activities (id, project_id, user_id, type, description, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(activity.id.as_uuid())
        .bind(activity.project_id.as_uuid())
        .bind(activity.user_id.map(Uuid::from))
        .bind(activity.kind.as_str())
        .bind(&activity.description)
        .bind(activity.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_activity", e))?;

        Ok(activity)
    }

    #[instrument(skip(self), fields(project_id = %project_id), err)]
    async fn list_activities(&self, project_id: ProjectId) -> Result<Vec<Activity>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, project_id, user_id, type, description, created_at
            FROM activities
            WHERE project_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(project_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_activities", e))?;

        rows.iter().map(activity_from_row).collect()
    }
}

fn comparison_from_row(row: &PgRow) -> Result<Comparison, StoreError> {
    let status: String = column(row, "status")?;
    Ok(Comparison {
        id: ComparisonId::from_uuid(column(row, "id")?),
        project_id: ProjectId::from_uuid(column(row, "project_id")?),
        name: column(row, "name")?,
        description: column(row, "description")?,
        design_image: column(row, "design_image")?,
        website_image: column(row, "website_image")?,
        status: parse_column::<ComparisonStatus>("status", &status)?,
        used_fallback: column(row, "used_fallback")?,
        created_at: column::<DateTime<Utc>>(row, "created_at")?,
        last_compared_at: column::<Option<DateTime<Utc>>>(row, "last_compared_at")?,
    })
}

fn discrepancy_from_row(row: &PgRow) -> Result<Discrepancy, StoreError> {
    let kind: String = column(row, "type")?;
    let priority: String = column(row, "priority")?;
    let status: String = column(row, "status")?;
    let Json(coordinates) = column::<Json<Coordinates>>(row, "coordinates")?;

    Ok(Discrepancy {
        id: DiscrepancyId::from_uuid(column(row, "id")?),
        comparison_id: ComparisonId::from_uuid(column(row, "comparison_id")?),
        title: column(row, "title")?,
        description: column(row, "description")?,
        kind: parse_column::<DiscrepancyType>("type", &kind)?,
        priority: parse_column::<DiscrepancyPriority>("priority", &priority)?,
        status: parse_column::<DiscrepancyStatus>("status", &status)?,
        coordinates,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

fn comment_from_row(row: &PgRow) -> Result<Comment, StoreError> {
    Ok(Comment {
        id: designdiff_core::CommentId::from_uuid(column(row, "id")?),
        discrepancy_id: DiscrepancyId::from_uuid(column(row, "discrepancy_id")?),
        user_id: column::<Option<Uuid>>(row, "user_id")?.map(UserId::from_uuid),
        body: column(row, "body")?,
        created_at: column(row, "created_at")?,
    })
}

fn activity_from_row(row: &PgRow) -> Result<Activity, StoreError> {
    let kind: String = column(row, "type")?;
    Ok(Activity {
        id: designdiff_core::ActivityId::from_uuid(column(row, "id")?),
        project_id: ProjectId::from_uuid(column(row, "project_id")?),
        user_id: column::<Option<Uuid>>(row, "user_id")?.map(UserId::from_uuid),
        kind: ActivityType::parse(&kind)
            .ok_or_else(|| StoreError::Storage(format!("unknown activity type '{kind}'")))?,
        description: column(row, "description")?,
        created_at: column(row, "created_at")?,
    })
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Storage(format!("failed to read column {name}: {e}")))
}

fn parse_column<T>(name: &str, raw: &str) -> Result<T, StoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| StoreError::Storage(format!("invalid {name} value '{raw}': {e}")))
}

/// Map SQLx errors to `StoreError` with operation context.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                _ => StoreError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Storage(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}

/// Check if an error is a foreign key violation (missing parent row).
fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23503"),
        _ => false,
    }
}
