//! Table Gateway: the only component aware of the underlying key-value
//! store. All other components traffic in domain items and codec-emitted
//! keys.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::codec::{Key, Row};
use crate::error::RbacError;

/// The store's batch ceiling: if a caller submits more than this many
/// rows, implementations chunk and issue serially.
pub const BATCH_LIMIT: usize = 25;

/// A cooperative cancellation signal threaded through every operation.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns a `Transient` error if cancellation was requested; the
    /// only kind of error cancellation can legally surface as, since
    /// storage may be left in a "some subset of writes landed" state that
    /// a caller should treat as retryable.
    pub fn check(&self) -> Result<(), RbacError> {
        if self.is_cancelled() {
            Err(RbacError::transient("operation cancelled"))
        } else {
            Ok(())
        }
    }
}

/// Batched `Put`/`Delete`/`Get`/`Query` against the backing key-value
/// store. Implementations chunk internally at [`BATCH_LIMIT`] and must
/// transparently follow continuation tokens on `query` until exhausted,
/// returning the fully materialized list.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Idempotent put of N rows. Returns success only when every chunk
    /// completes.
    async fn put_batch(&self, items: Vec<(Key, Row)>, cancel: &CancellationToken)
        -> Result<(), RbacError>;

    /// Put a single row only if no row currently occupies that key.
    /// Returns `Ok(false)` without writing if the key is occupied.
    async fn put_if_absent(
        &self,
        key: Key,
        row: Row,
        cancel: &CancellationToken,
    ) -> Result<bool, RbacError>;

    /// Symmetric delete; absence of a row is not an error.
    async fn delete_batch(&self, keys: Vec<Key>, cancel: &CancellationToken)
        -> Result<(), RbacError>;

    /// Exact primary-key fetch.
    async fn get_item(&self, key: &Key, cancel: &CancellationToken)
        -> Result<Option<Row>, RbacError>;

    /// Paginated enumeration of every row in `partition_key` whose sort
    /// key begins with `sort_key_prefix` (or every row in the partition
    /// if `None`).
    async fn query(
        &self,
        partition_key: &str,
        sort_key_prefix: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Row>, RbacError>;
}

/// Splits `items` into chunks no larger than [`BATCH_LIMIT`]; shared by
/// every `KvStore` implementation so the chunking policy lives in one
/// place.
pub fn chunked<T>(items: Vec<T>) -> impl Iterator<Item = Vec<T>> {
    let mut items = items;
    std::iter::from_fn(move || {
        if items.is_empty() {
            None
        } else {
            let tail = items.split_off(items.len().min(BATCH_LIMIT));
            Some(std::mem::replace(&mut items, tail))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_respect_batch_limit() {
        let items: Vec<u32> = (0..60).collect();
        let chunks: Vec<_> = chunked(items).collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), BATCH_LIMIT);
        assert_eq!(chunks[2].len(), 10);
    }

    #[test]
    fn cancellation_token_reports_state() {
        let token = CancellationToken::new();
        assert!(token.check().is_ok());
        token.cancel();
        assert!(token.check().is_err());
    }
}
