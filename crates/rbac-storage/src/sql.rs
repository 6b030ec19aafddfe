//! `SqlKvStore`: a [`KvStore`] backed by a single generic MySQL table
//! `(partition_key, sort_key, attributes)` — raw `sqlx::query` with
//! manual `Row::try_get` mapping, no ORM.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{MySqlPool, Row as SqlxRow};

use rbac_core::codec::{Key, Row};
use rbac_core::error::RbacError;
use rbac_core::kv::{chunked, CancellationToken, KvStore};

use crate::config::StorageConfig;

pub struct SqlKvStore {
    pool: MySqlPool,
    table_name: String,
}

impl SqlKvStore {
    pub fn new(pool: MySqlPool, config: &StorageConfig) -> Self {
        Self {
            pool,
            table_name: config.table_name.clone(),
        }
    }

    /// Creates the backing table if it does not already exist. Schema
    /// migration proper is out of scope — no schema version is stored —
    /// this is the minimal bootstrap a fresh deployment needs.
    pub async fn ensure_schema(&self) -> Result<(), RbacError> {
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                partition_key VARCHAR(512) NOT NULL,
                sort_key VARCHAR(512) NOT NULL,
                attributes JSON NOT NULL,
                PRIMARY KEY (partition_key, sort_key)
            )
            "#,
            table = self.table_name
        );
        sqlx::query(&ddl)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    fn escape_like_prefix(prefix: &str) -> String {
        // Escape SQL LIKE metacharacters so a resource/scope/role name
        // containing '%' or '_' is matched literally, not as a wildcard.
        prefix.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
    }

    fn decode_row(json: &str) -> Result<Row, RbacError> {
        serde_json::from_str::<HashMap<String, String>>(json).map_err(|e| RbacError::Internal {
            message: "failed to decode stored row attributes".to_string(),
            source: Some(e.into()),
        })
    }

    fn encode_row(row: &Row) -> Result<String, RbacError> {
        serde_json::to_string(row).map_err(|e| RbacError::Internal {
            message: "failed to encode row attributes".to_string(),
            source: Some(e.into()),
        })
    }
}

fn map_sqlx_error(err: sqlx::Error) -> RbacError {
    match &err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => RbacError::Transient {
            message: err.to_string(),
            source: Some(err.into()),
        },
        _ => RbacError::Internal {
            message: err.to_string(),
            source: Some(err.into()),
        },
    }
}

#[async_trait]
impl KvStore for SqlKvStore {
    async fn put_batch(
        &self,
        items: Vec<(Key, Row)>,
        cancel: &CancellationToken,
    ) -> Result<(), RbacError> {
        for chunk in chunked(items) {
            cancel.check()?;
            let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
            for ((pk, sk), row) in chunk {
                let attrs = Self::encode_row(&row)?;
                let sql = format!(
                    "INSERT INTO {table} (partition_key, sort_key, attributes) VALUES (?, ?, ?) \
                     ON DUPLICATE KEY UPDATE attributes = VALUES(attributes)",
                    table = self.table_name
                );
                sqlx::query(&sql)
                    .bind(pk)
                    .bind(sk)
                    .bind(attrs)
                    .execute(&mut *tx)
                    .await
                    .map_err(map_sqlx_error)?;
            }
            tx.commit().await.map_err(map_sqlx_error)?;
        }
        Ok(())
    }

    async fn put_if_absent(
        &self,
        key: Key,
        row: Row,
        cancel: &CancellationToken,
    ) -> Result<bool, RbacError> {
        cancel.check()?;
        let (pk, sk) = key;
        let attrs = Self::encode_row(&row)?;
        // Conditional put via `INSERT IGNORE`: duplicate definition rows
        // carry no payload of their own, so a lost race is harmless.
        let sql = format!(
            "INSERT IGNORE INTO {table} (partition_key, sort_key, attributes) VALUES (?, ?, ?)",
            table = self.table_name
        );
        let result = sqlx::query(&sql)
            .bind(pk)
            .bind(sk)
            .bind(attrs)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_batch(
        &self,
        keys: Vec<Key>,
        cancel: &CancellationToken,
    ) -> Result<(), RbacError> {
        for chunk in chunked(keys) {
            cancel.check()?;
            let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
            for (pk, sk) in chunk {
                let sql = format!(
                    "DELETE FROM {table} WHERE partition_key = ? AND sort_key = ?",
                    table = self.table_name
                );
                sqlx::query(&sql)
                    .bind(pk)
                    .bind(sk)
                    .execute(&mut *tx)
                    .await
                    .map_err(map_sqlx_error)?;
            }
            tx.commit().await.map_err(map_sqlx_error)?;
        }
        Ok(())
    }

    async fn get_item(
        &self,
        key: &Key,
        cancel: &CancellationToken,
    ) -> Result<Option<Row>, RbacError> {
        cancel.check()?;
        let (pk, sk) = key;
        let sql = format!(
            "SELECT attributes FROM {table} WHERE partition_key = ? AND sort_key = ?",
            table = self.table_name
        );
        let record = sqlx::query(&sql)
            .bind(pk)
            .bind(sk)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        match record {
            None => Ok(None),
            Some(sql_row) => {
                let json: String = sql_row.try_get("attributes").map_err(map_sqlx_error)?;
                Ok(Some(Self::decode_row(&json)?))
            }
        }
    }

    async fn query(
        &self,
        partition_key: &str,
        sort_key_prefix: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Row>, RbacError> {
        cancel.check()?;
        let rows = match sort_key_prefix {
            Some(prefix) => {
                let escaped = Self::escape_like_prefix(prefix);
                let sql = format!(
                    "SELECT attributes FROM {table} WHERE partition_key = ? \
                     AND sort_key LIKE ? ESCAPE '\\\\' ORDER BY sort_key ASC",
                    table = self.table_name
                );
                sqlx::query(&sql)
                    .bind(partition_key)
                    .bind(format!("{escaped}%"))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
            }
            None => {
                let sql = format!(
                    "SELECT attributes FROM {table} WHERE partition_key = ? ORDER BY sort_key ASC",
                    table = self.table_name
                );
                sqlx::query(&sql)
                    .bind(partition_key)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
            }
        };

        rows.iter()
            .map(|sql_row| {
                let json: String = sql_row.try_get("attributes").map_err(map_sqlx_error)?;
                Self::decode_row(&json)
            })
            .collect()
    }
}
