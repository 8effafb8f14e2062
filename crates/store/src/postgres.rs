//! Postgres-backed stores (enabled with the `postgres` feature).
//!
//! Runtime-checked sqlx queries with manual row mapping. Error mapping:
//! unique violations (`23505`) become [`StoreError::Conflict`], missing rows
//! become [`StoreError::NotFound`], everything else surfaces as
//! [`StoreError::Unavailable`].

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use kycflow_core::{KycId, KycProfile, KycRecord, KycStatus, UserId};

use crate::error::StoreError;
use crate::kyc::KycStore;
use crate::user::{UserAccount, UserStore};

#[derive(Debug, Clone)]
pub struct PostgresKycStore {
    pool: Arc<PgPool>,
}

impl PostgresKycStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Create the backing table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kyc_records (
                id               UUID PRIMARY KEY,
                user_id          UUID NOT NULL,
                full_name        TEXT NOT NULL,
                email            TEXT NOT NULL,
                phone            TEXT NOT NULL,
                address          TEXT NOT NULL,
                id_number        TEXT NOT NULL,
                date_of_birth    DATE NOT NULL,
                summary          TEXT,
                status           TEXT NOT NULL,
                pdf_path         TEXT,
                pdf_generated_at TIMESTAMPTZ,
                submitted_at     TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }
}

fn map_sqlx_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            StoreError::Conflict(db.message().to_string())
        }
        _ => StoreError::Unavailable(e.to_string()),
    }
}

fn row_to_record(row: &sqlx::postgres::PgRow) -> Result<KycRecord, StoreError> {
    let status_str: String = row.try_get("status").map_err(map_sqlx_error)?;
    let status: KycStatus = status_str
        .parse()
        .map_err(|e| StoreError::Unavailable(format!("corrupt status column: {e}")))?;

    Ok(KycRecord {
        id: KycId::from_uuid(row.try_get::<Uuid, _>("id").map_err(map_sqlx_error)?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id").map_err(map_sqlx_error)?),
        profile: KycProfile {
            full_name: row.try_get("full_name").map_err(map_sqlx_error)?,
            email: row.try_get("email").map_err(map_sqlx_error)?,
            phone: row.try_get("phone").map_err(map_sqlx_error)?,
            address: row.try_get("address").map_err(map_sqlx_error)?,
            id_number: row.try_get("id_number").map_err(map_sqlx_error)?,
            date_of_birth: row
                .try_get::<NaiveDate, _>("date_of_birth")
                .map_err(map_sqlx_error)?,
        },
        summary: row.try_get("summary").map_err(map_sqlx_error)?,
        status,
        pdf_path: row.try_get("pdf_path").map_err(map_sqlx_error)?,
        pdf_generated_at: row
            .try_get::<Option<DateTime<Utc>>, _>("pdf_generated_at")
            .map_err(map_sqlx_error)?,
        submitted_at: row
            .try_get::<DateTime<Utc>, _>("submitted_at")
            .map_err(map_sqlx_error)?,
    })
}

const SELECT_COLUMNS: &str = "id, user_id, full_name, email, phone, address, id_number, \
     date_of_birth, summary, status, pdf_path, pdf_generated_at, submitted_at";

#[async_trait]
impl KycStore for PostgresKycStore {
    #[instrument(skip(self, record), fields(kyc_id = %record.id), err)]
    async fn insert(&self, record: KycRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO kyc_records
                (id, user_id, full_name, email, phone, address, id_number,
                 date_of_birth, summary, status, pdf_path, pdf_generated_at, submitted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.user_id.as_uuid())
        .bind(&record.profile.full_name)
        .bind(&record.profile.email)
        .bind(&record.profile.phone)
        .bind(&record.profile.address)
        .bind(&record.profile.id_number)
        .bind(record.profile.date_of_birth)
        .bind(&record.summary)
        .bind(record.status.as_str())
        .bind(&record.pdf_path)
        .bind(record.pdf_generated_at)
        .bind(record.submitted_at)
        .execute(&*self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn find_by_id(&self, id: KycId) -> Result<Option<KycRecord>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM kyc_records WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<KycRecord>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM kyc_records WHERE user_id = $1 ORDER BY submitted_at DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(row_to_record).collect()
    }

    async fn find_all(&self) -> Result<Vec<KycRecord>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM kyc_records ORDER BY submitted_at DESC"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(row_to_record).collect()
    }

    #[instrument(skip(self), fields(kyc_id = %id, status = %status), err)]
    async fn set_status(&self, id: KycId, status: KycStatus) -> Result<KycRecord, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE kyc_records SET status = $2 WHERE id = $1 RETURNING {SELECT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(status.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_record).transpose()?.ok_or(StoreError::NotFound)
    }

    #[instrument(skip(self, pdf_path), fields(kyc_id = %id), err)]
    async fn set_render_artifact(
        &self,
        id: KycId,
        pdf_path: String,
        generated_at: DateTime<Utc>,
    ) -> Result<KycRecord, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE kyc_records SET pdf_path = $2, pdf_generated_at = $3 \
             WHERE id = $1 RETURNING {SELECT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(&pdf_path)
        .bind(generated_at)
        .fetch_optional(&*self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_record).transpose()?.ok_or(StoreError::NotFound)
    }
}

#[derive(Debug, Clone)]
pub struct PostgresUserStore {
    pool: Arc<PgPool>,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_accounts (
                id            UUID PRIMARY KEY,
                username      TEXT NOT NULL UNIQUE,
                email         TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role          TEXT NOT NULL,
                created_at    TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }
}

fn row_to_account(row: &sqlx::postgres::PgRow) -> Result<UserAccount, StoreError> {
    Ok(UserAccount {
        id: UserId::from_uuid(row.try_get::<Uuid, _>("id").map_err(map_sqlx_error)?),
        username: row.try_get("username").map_err(map_sqlx_error)?,
        email: row.try_get("email").map_err(map_sqlx_error)?,
        password_hash: row.try_get("password_hash").map_err(map_sqlx_error)?,
        role: row.try_get("role").map_err(map_sqlx_error)?,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(map_sqlx_error)?,
    })
}

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn insert(&self, account: UserAccount) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO user_accounts (id, username, email, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.role)
        .bind(account.created_at)
        .execute(&*self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserAccount>, StoreError> {
        let row = sqlx::query(
            "SELECT id, username, email, password_hash, role, created_at \
             FROM user_accounts WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&*self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_account).transpose()
    }
}
