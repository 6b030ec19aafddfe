//! The handful of knobs the SQL-backed gateway needs. Config loading
//! proper (env/file layering) is an external concern; this module only
//! models the pool-sizing values themselves.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub mysql_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    /// Name of the generic `(partition_key, sort_key, attributes)` table.
    pub table_name: String,
}

impl StorageConfig {
    pub fn new(mysql_url: impl Into<String>) -> Self {
        Self {
            mysql_url: mysql_url.into(),
            max_connections: 20,
            min_connections: 2,
            acquire_timeout: Duration::from_secs(30),
            table_name: "rbac_items".to_string(),
        }
    }
}
