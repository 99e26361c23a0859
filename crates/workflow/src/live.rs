//! Shared live-query plumbing for the feed and ledger subscriptions.

use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;

use crewlink_store::{Document, SubscriptionHandle};

/// A running live-query consumer: the store registration plus the local
/// task folding snapshots into a mirror.
///
/// Dropping the handle cancels the store registration; the consumer task
/// then drains and exits on its own once the snapshot channel closes.
pub struct LiveHandle {
    handle: SubscriptionHandle,
    task: JoinHandle<()>,
}

impl LiveHandle {
    pub(crate) fn new(handle: SubscriptionHandle, task: JoinHandle<()>) -> Self {
        Self { handle, task }
    }

    /// Cancel the store registration and stop the consumer task.
    pub fn unsubscribe(self) {
        self.handle.unsubscribe();
        self.task.abort();
    }
}

/// Decode a snapshot into typed records, skipping documents that fail.
///
/// A decode failure is a callback-level fault: it is logged and the
/// subscription keeps running on the remaining records.
pub(crate) fn decode_snapshot<T: DeserializeOwned>(collection: &str, docs: &[Document]) -> Vec<T> {
    docs.iter()
        .filter_map(|doc| match doc.decode::<T>() {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    collection,
                    id = %doc.id,
                    "Skipping undecodable record in snapshot"
                );
                None
            }
        })
        .collect()
}
