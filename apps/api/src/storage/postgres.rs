use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use super::{Collection, KvStore, StoreError};

/// PostgreSQL backend: one row per key in `records`. Compare-and-swap is a
/// single conditional statement, so writers to different keys never contend.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KvStore for PgStore {
    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>, StoreError> {
        let value: Option<Value> =
            sqlx::query_scalar("SELECT value FROM records WHERE collection = $1 AND key = $2")
                .bind(collection.name())
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value)
    }

    async fn put(&self, collection: Collection, key: &str, value: Value) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO records (collection, key, value)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, key) DO UPDATE SET value = EXCLUDED.value
            "#,
        )
        .bind(collection.name())
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        collection: Collection,
        key: &str,
        expected: Option<&Value>,
        new: Value,
    ) -> Result<bool, StoreError> {
        let result = match expected {
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO records (collection, key, value)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (collection, key) DO NOTHING
                    "#,
                )
                .bind(collection.name())
                .bind(key)
                .bind(new)
                .execute(&self.pool)
                .await?
            }
            Some(expected) => {
                sqlx::query(
                    r#"
                    UPDATE records SET value = $3
                    WHERE collection = $1 AND key = $2 AND value = $4
                    "#,
                )
                .bind(collection.name())
                .bind(key)
                .bind(new)
                .bind(expected)
                .execute(&self.pool)
                .await?
            }
        };
        Ok(result.rows_affected() == 1)
    }

    async fn remove(&self, collection: Collection, key: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM records WHERE collection = $1 AND key = $2")
            .bind(collection.name())
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self, collection: Collection) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM records WHERE collection = $1")
            .bind(collection.name())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn load_all(&self, collection: Collection) -> Result<BTreeMap<String, Value>, StoreError> {
        let rows: Vec<(String, Value)> =
            sqlx::query_as("SELECT key, value FROM records WHERE collection = $1")
                .bind(collection.name())
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().collect())
    }

    async fn save_all(
        &self,
        collection: Collection,
        records: BTreeMap<String, Value>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM records WHERE collection = $1")
            .bind(collection.name())
            .execute(&mut *tx)
            .await?;
        for (key, value) in records {
            sqlx::query("INSERT INTO records (collection, key, value) VALUES ($1, $2, $3)")
                .bind(collection.name())
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn count(&self, collection: Collection) -> Result<usize, StoreError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE collection = $1")
            .bind(collection.name())
            .fetch_one(&self.pool)
            .await?;
        Ok(n as usize)
    }
}
