//! Per-session service wiring.

use std::sync::Arc;

use crewlink_store::{DocumentStore, SnapshotStore, StoreConfig};

use crate::conversations::Conversations;
use crate::dispatcher::SideEffects;
use crate::ledger::{JobLedger, PartnershipLedger};
use crate::notifications::NotificationFeed;

/// The workflow services for one user session.
///
/// Constructed once at session start and passed by reference to whatever
/// needs them; there is no ambient global state. Every service shares the
/// same store handle and snapshot directory.
pub struct Session {
    pub feed: Arc<NotificationFeed>,
    pub jobs: Arc<JobLedger>,
    pub partnerships: Arc<PartnershipLedger>,
    pub conversations: Arc<Conversations>,
}

impl Session {
    /// Wire the full workflow stack on top of `store`.
    pub fn new(store: Arc<dyn DocumentStore>, config: &StoreConfig) -> Self {
        let snapshots = Arc::new(SnapshotStore::new(config.snapshot_dir.clone()));

        let feed = Arc::new(NotificationFeed::new(
            Arc::clone(&store),
            Arc::clone(&snapshots),
            config.persist_snapshots,
        ));
        let conversations = Arc::new(Conversations::new(Arc::clone(&store)));
        let effects = Arc::new(SideEffects::new(
            Arc::clone(&feed),
            Arc::clone(&conversations),
        ));

        let jobs = Arc::new(JobLedger::new(
            Arc::clone(&store),
            Arc::clone(&effects),
            Arc::clone(&snapshots),
            config.persist_snapshots,
        ));
        let partnerships = Arc::new(PartnershipLedger::new(
            store,
            effects,
            snapshots,
            config.persist_snapshots,
        ));

        Self {
            feed,
            jobs,
            partnerships,
            conversations,
        }
    }

    /// Restore every persisted snapshot blob into its mirror.
    ///
    /// The reconciliation-on-connect step: run before subscribing, so the
    /// restored state serves the first paint and the first live snapshot
    /// supersedes it.
    pub fn restore_persisted(&self) {
        self.feed.restore_persisted();
        self.jobs.restore_persisted();
        self.partnerships.restore_persisted();
    }
}
