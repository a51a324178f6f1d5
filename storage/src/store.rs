use std::time::Duration;

use config::DatasourceConfig;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use thiserror::Error;

use crate::customer::{Customer, SeedDataset};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Customer not found: {id}")]
    NotFound { id: i64 }
}

/// Customer data-access object over a PostgreSQL pool.
pub struct CustomerStore {
    pool: PgPool
}

impl CustomerStore {
    /// Connect using resolved datasource configuration. The url is
    /// expected to come from dynamic overrides during integration runs.
    pub async fn connect(config: &DatasourceConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.timeout_seconds))
            .connect(&config.url)
            .await?;
        tracing::debug!(pool_size = config.pool_size, "customer store connected");
        Ok(Self { pool })
    }

    pub async fn initialize_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS customer (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )"
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert the seed rows. Idempotent against re-runs on a reused
    /// instance: already-present emails are left untouched.
    pub async fn seed(&self, dataset: &SeedDataset) -> Result<(), StoreError> {
        for customer in dataset.customers() {
            sqlx::query(
                "INSERT INTO customer (name, email)
                 VALUES ($1, $2)
                 ON CONFLICT (email) DO NOTHING"
            )
            .bind(&customer.name)
            .bind(&customer.email)
            .execute(&self.pool)
            .await?;
        }
        tracing::debug!(rows = dataset.len(), "seed dataset applied");
        Ok(())
    }

    pub async fn find_all(&self) -> Result<Vec<Customer>, StoreError> {
        let customers = sqlx::query_as::<_, Customer>(
            "SELECT id, name, email, created_at FROM customer ORDER BY id"
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(customers)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Customer>, StoreError> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT id, name, email, created_at FROM customer WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(customer)
    }

    pub async fn insert(
        &self,
        name: &str,
        email: &str
    ) -> Result<Customer, StoreError> {
        let customer = sqlx::query_as::<_, Customer>(
            "INSERT INTO customer (name, email)
             VALUES ($1, $2)
             RETURNING id, name, email, created_at"
        )
        .bind(name)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(customer)
    }

    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM customer WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { id });
        }
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM customer")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("count"))
    }
}
