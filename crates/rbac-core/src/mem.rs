//! Default, dependency-free [`KvStore`] backend: a `DashMap`-backed
//! in-memory table nested one level so partition scans stay cheap:
//! `partition -> (sort_key -> row)`.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::codec::{Key, Row};
use crate::error::RbacError;
use crate::kv::{chunked, CancellationToken, KvStore};

#[derive(Default)]
pub struct InMemoryKvStore {
    partitions: DashMap<String, DashMap<String, Row>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self {
            partitions: DashMap::new(),
        }
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn put_batch(
        &self,
        items: Vec<(Key, Row)>,
        cancel: &CancellationToken,
    ) -> Result<(), RbacError> {
        for chunk in chunked(items) {
            cancel.check()?;
            for ((pk, sk), row) in chunk {
                self.partitions.entry(pk).or_default().insert(sk, row);
            }
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
        let partition = self.partitions.entry(pk).or_default();
        if partition.contains_key(&sk) {
            Ok(false)
        } else {
            partition.insert(sk, row);
            Ok(true)
        }
    }

    async fn delete_batch(
        &self,
        keys: Vec<Key>,
        cancel: &CancellationToken,
    ) -> Result<(), RbacError> {
        for chunk in chunked(keys) {
            cancel.check()?;
            for (pk, sk) in chunk {
                if let Some(partition) = self.partitions.get(&pk) {
                    partition.remove(&sk);
                }
            }
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
        Ok(self
            .partitions
            .get(pk)
            .and_then(|partition| partition.get(sk).map(|r| r.clone())))
    }

    async fn query(
        &self,
        partition_key: &str,
        sort_key_prefix: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Row>, RbacError> {
        cancel.check()?;
        let Some(partition) = self.partitions.get(partition_key) else {
            return Ok(Vec::new());
        };
        let mut rows: Vec<(String, Row)> = partition
            .iter()
            .filter(|entry| {
                sort_key_prefix
                    .map(|prefix| entry.key().starts_with(prefix))
                    .unwrap_or(true)
            })
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(rows.into_iter().map(|(_, row)| row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn row(k: &str, v: &str) -> Row {
        let mut r = HashMap::new();
        r.insert(k.to_string(), v.to_string());
        r
    }

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let store = InMemoryKvStore::new();
        let cancel = CancellationToken::new();
        store
            .put_batch(
                vec![(("PK".into(), "SK".into()), row("a", "b"))],
                &cancel,
            )
            .await
            .unwrap();
        let got = store
            .get_item(&("PK".into(), "SK".into()), &cancel)
            .await
            .unwrap();
        assert_eq!(got.unwrap().get("a").unwrap(), "b");
    }

    #[tokio::test]
    async fn put_if_absent_rejects_collision() {
        let store = InMemoryKvStore::new();
        let cancel = CancellationToken::new();
        let key = ("PK".to_string(), "SK".to_string());
        assert!(store
            .put_if_absent(key.clone(), row("a", "1"), &cancel)
            .await
            .unwrap());
        assert!(!store
            .put_if_absent(key, row("a", "2"), &cancel)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn query_filters_by_prefix_and_sorts() {
        let store = InMemoryKvStore::new();
        let cancel = CancellationToken::new();
        store
            .put_batch(
                vec![
                    (("PK".into(), "SCOPE#b".into()), row("x", "1")),
                    (("PK".into(), "SCOPE#a".into()), row("x", "2")),
                    (("PK".into(), "ROLE#z".into()), row("x", "3")),
                ],
                &cancel,
            )
            .await
            .unwrap();
        let rows = store.query("PK", Some("SCOPE#"), &cancel).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("x").unwrap(), "2");
        assert_eq!(rows[1].get("x").unwrap(), "1");
    }

    #[tokio::test]
    async fn delete_is_not_an_error_when_absent() {
        let store = InMemoryKvStore::new();
        let cancel = CancellationToken::new();
        store
            .delete_batch(vec![("PK".into(), "SK".into())], &cancel)
            .await
            .unwrap();
    }
}
