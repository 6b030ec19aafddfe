//! SQL-backed [`rbac_core::kv::KvStore`] gateway: a generic
//! `(partition_key, sort_key, attributes)` MySQL table, using raw `sqlx`
//! queries rather than an ORM or query builder.

pub mod config;
pub mod sql;

pub use config::StorageConfig;
pub use sql::SqlKvStore;

use sqlx::mysql::MySqlPoolOptions;

use rbac_core::error::RbacError;

/// Builds a connection pool from a [`StorageConfig`], mirroring
/// `auth_db::connection`'s pool-builder shape.
pub async fn connect(config: &StorageConfig) -> Result<sqlx::MySqlPool, RbacError> {
    MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.mysql_url)
        .await
        .map_err(|e| RbacError::Internal {
            message: "failed to establish MySQL connection pool".to_string(),
            source: Some(e.into()),
        })
}
