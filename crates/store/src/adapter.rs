//! The remote store boundary.
//!
//! [`DocumentStore`] generalizes the hosted document-database client the
//! rest of the platform talks to: collection-scoped CRUD, a conditional
//! update, one-shot queries, and live queries. A live query pushes the
//! *entire* current result set on every underlying change — never a diff
//! — and the last snapshot always wins.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crewlink_core::types::DocId;

use crate::document::Document;
use crate::error::StoreError;
use crate::predicate::Predicate;

/// Outcome of a conditional update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The guard matched and the patch was applied.
    Applied,
    /// The guard did not match; the document was left untouched.
    Conflict,
}

/// Receiver half of a live query. Each message is the full current result
/// set for the query's predicates.
pub type SnapshotReceiver = mpsc::UnboundedReceiver<Vec<Document>>;

/// Cancellation handle for a live query.
///
/// The registration is cancelled by calling [`unsubscribe`] or by dropping
/// the handle. This is the only cancellation primitive the store offers;
/// individual reads and writes carry no deadline.
///
/// [`unsubscribe`]: SubscriptionHandle::unsubscribe
pub struct SubscriptionHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl SubscriptionHandle {
    /// Wrap the store-specific cancellation action.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Cancel the registration; no further snapshots will be pushed.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

/// A live query: the snapshot stream plus its cancellation handle.
pub struct LiveQuery {
    pub snapshots: SnapshotReceiver,
    pub handle: SubscriptionHandle,
}

/// Collection-scoped document storage with live queries.
///
/// Shared across the workflow services as `Arc<dyn DocumentStore>`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a record, returning the store-assigned id.
    ///
    /// The assigned id is also written into the stored body's `id` field,
    /// overwriting any placeholder the caller serialized.
    async fn create(&self, collection: &str, record: Value) -> Result<DocId, StoreError>;

    /// Point-read a document.
    async fn get(&self, collection: &str, id: DocId) -> Result<Option<Document>, StoreError>;

    /// Merge-patch a document: top-level fields in `patch` replace their
    /// counterparts, unspecified fields are left untouched.
    async fn update(&self, collection: &str, id: DocId, patch: Value) -> Result<(), StoreError>;

    /// Merge-patch a document only when `guard` matches its current body.
    ///
    /// Returns [`UpdateOutcome::Conflict`] without mutating when the guard
    /// fails, letting callers distinguish a lost race from success.
    async fn update_if(
        &self,
        collection: &str,
        id: DocId,
        guard: Predicate,
        patch: Value,
    ) -> Result<UpdateOutcome, StoreError>;

    /// Hard-delete a document.
    async fn delete(&self, collection: &str, id: DocId) -> Result<(), StoreError>;

    /// One-shot query; results are unordered.
    async fn query(
        &self,
        collection: &str,
        predicates: &[Predicate],
    ) -> Result<Vec<Document>, StoreError>;

    /// Register a live query.
    ///
    /// The current result set is pushed immediately, then again after
    /// every change to the collection.
    async fn subscribe(
        &self,
        collection: &str,
        predicates: Vec<Predicate>,
    ) -> Result<LiveQuery, StoreError>;
}
