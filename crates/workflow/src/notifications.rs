//! Per-user notification feed.
//!
//! [`NotificationFeed`] maintains, for one user at a time, the live sorted
//! set of their notifications and exposes read-state mutation. It also
//! owns [`NotificationFeed::add`], the single write path every producer
//! (the side-effect dispatcher) goes through.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crewlink_core::collections::NOTIFICATIONS;
use crewlink_core::types::{DocId, Timestamp};
use crewlink_store::{DocumentStore, Mirror, Predicate, SnapshotStore, StoreError};

use crate::error::WorkflowResult;
use crate::live::{decode_snapshot, LiveHandle};

/// Closed tag set of notification causes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    JobApplication,
    PartnershipRequest,
    ApplicationApproved,
    ApplicationRejected,
    NewChat,
}

/// A notification record.
///
/// Immutable except the `read`/`read_at` transition, which is monotonic:
/// false to true exactly once, never reversed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: DocId,
    /// The sole addressee; multi-recipient events create one record per
    /// recipient.
    pub user_id: DocId,
    pub kind: NotificationKind,
    pub from_user_id: DocId,
    pub from_user_name: Option<String>,
    pub from_user_photo_url: Option<String>,
    pub job_id: Option<DocId>,
    pub job_title: Option<String>,
    pub offer_id: Option<DocId>,
    pub from_community_id: Option<DocId>,
    pub from_community_name: Option<String>,
    pub chat_id: Option<DocId>,
    /// Precomputed human-readable text; never templated client-side.
    pub message: String,
    pub read: bool,
    pub created_at: Timestamp,
    pub read_at: Option<Timestamp>,
}

/// Payload for the single notification write path.
///
/// Built with [`NewNotification::new`] and enriched with the `about_*`
/// builder methods for the correlation fields each kind needs.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: DocId,
    pub kind: NotificationKind,
    pub from_user_id: DocId,
    pub from_user_name: Option<String>,
    pub from_user_photo_url: Option<String>,
    pub job_id: Option<DocId>,
    pub job_title: Option<String>,
    pub offer_id: Option<DocId>,
    pub from_community_id: Option<DocId>,
    pub from_community_name: Option<String>,
    pub chat_id: Option<DocId>,
    pub message: String,
}

impl NewNotification {
    /// Create a notification payload with only the required fields.
    pub fn new(
        user_id: DocId,
        kind: NotificationKind,
        from_user_id: DocId,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            kind,
            from_user_id,
            from_user_name: None,
            from_user_photo_url: None,
            job_id: None,
            job_title: None,
            offer_id: None,
            from_community_id: None,
            from_community_name: None,
            chat_id: None,
            message: message.into(),
        }
    }

    /// Attach the acting user's display name.
    pub fn from_name(mut self, name: impl Into<String>) -> Self {
        self.from_user_name = Some(name.into());
        self
    }

    /// Attach the acting user's profile photo URL.
    pub fn from_photo(mut self, url: impl Into<String>) -> Self {
        self.from_user_photo_url = Some(url.into());
        self
    }

    /// Correlate with a job vacancy.
    pub fn about_job(mut self, job_id: DocId, title: impl Into<String>) -> Self {
        self.job_id = Some(job_id);
        self.job_title = Some(title.into());
        self
    }

    /// Correlate with a partnership offer.
    pub fn about_offer(mut self, offer_id: DocId) -> Self {
        self.offer_id = Some(offer_id);
        self
    }

    /// Correlate with the community acting through the notification.
    pub fn about_community(mut self, community_id: DocId, name: impl Into<String>) -> Self {
        self.from_community_id = Some(community_id);
        self.from_community_name = Some(name.into());
        self
    }

    /// Correlate with a conversation.
    pub fn about_chat(mut self, chat_id: DocId) -> Self {
        self.chat_id = Some(chat_id);
        self
    }
}

/// Snapshot-derived feed state, replaced atomically on every push.
#[derive(Debug, Clone, Default)]
pub struct FeedView {
    /// Sorted by `created_at` descending.
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
}

/// The live notification feed for one user session.
pub struct NotificationFeed {
    store: Arc<dyn DocumentStore>,
    mirror: Arc<Mirror<FeedView>>,
    snapshots: Arc<SnapshotStore>,
    persist: bool,
}

impl NotificationFeed {
    /// Create a feed bound to `store`, persisting snapshots when
    /// `persist` is set.
    pub fn new(store: Arc<dyn DocumentStore>, snapshots: Arc<SnapshotStore>, persist: bool) -> Self {
        Self {
            store,
            mirror: Arc::new(Mirror::default()),
            snapshots,
            persist,
        }
    }

    /// Restore the persisted feed blob into the mirror.
    ///
    /// The reconciliation-on-connect step: restored records serve the
    /// first paint and the first live snapshot supersedes them wholesale.
    pub fn restore_persisted(&self) {
        if let Some(notifications) = self.snapshots.load::<Notification>(NOTIFICATIONS) {
            self.mirror.replace(build_view(notifications));
        }
    }

    /// Register the live query for `user_id`'s notifications.
    ///
    /// Every pushed result set is re-sorted by `created_at` descending
    /// client-side (the remote query is unordered), `unread_count` is
    /// recomputed in the same pass, and the whole view is replaced in one
    /// atomic update. Subscribing for a different user requires the caller
    /// to `unsubscribe` the previous handle first; the feed itself does
    /// not enforce this.
    pub async fn subscribe(&self, user_id: DocId) -> WorkflowResult<LiveHandle> {
        let live = self
            .store
            .subscribe(NOTIFICATIONS, vec![Predicate::eq("user_id", user_id)])
            .await?;

        let mirror = Arc::clone(&self.mirror);
        let snapshots = Arc::clone(&self.snapshots);
        let persist = self.persist;
        let mut rx = live.snapshots;

        let task = tokio::spawn(async move {
            while let Some(docs) = rx.recv().await {
                let view = build_view(decode_snapshot(NOTIFICATIONS, &docs));
                if persist {
                    if let Err(e) = snapshots.save(NOTIFICATIONS, &view.notifications) {
                        tracing::warn!(error = %e, "Failed to persist notification snapshot");
                    }
                }
                mirror.replace(view);
            }
        });

        Ok(LiveHandle::new(live.handle, task))
    }

    /// The single notification write path.
    ///
    /// Sets `created_at = now` and `read = false`, then creates the
    /// record. No deduplication: two calls create two records. Store
    /// failures propagate to the caller.
    pub async fn add(&self, notification: NewNotification) -> WorkflowResult<DocId> {
        let record = Notification {
            id: DocId::nil(),
            user_id: notification.user_id,
            kind: notification.kind,
            from_user_id: notification.from_user_id,
            from_user_name: notification.from_user_name,
            from_user_photo_url: notification.from_user_photo_url,
            job_id: notification.job_id,
            job_title: notification.job_title,
            offer_id: notification.offer_id,
            from_community_id: notification.from_community_id,
            from_community_name: notification.from_community_name,
            chat_id: notification.chat_id,
            message: notification.message,
            read: false,
            created_at: Utc::now(),
            read_at: None,
        };
        let body = serde_json::to_value(&record).map_err(StoreError::from)?;
        let id = self.store.create(NOTIFICATIONS, body).await?;
        tracing::debug!(%id, user_id = %record.user_id, kind = ?record.kind, "Notification created");
        Ok(id)
    }

    /// Mark one notification read.
    ///
    /// Idempotent: the write is guarded on `read == false`, so a repeat
    /// call changes nothing and `read_at` is set exactly once. Failures
    /// are logged and swallowed — read-state must never block the UI; the
    /// cache may show `read` ahead of the store until the next snapshot.
    pub async fn mark_read(&self, notification_id: DocId) {
        let patch = json!({ "read": true, "read_at": Utc::now() });
        if let Err(e) = self
            .store
            .update_if(NOTIFICATIONS, notification_id, Predicate::eq("read", false), patch)
            .await
        {
            tracing::error!(error = %e, %notification_id, "Failed to mark notification read");
        }
    }

    /// Mark every cached unread notification for `user_id` read.
    ///
    /// One update per notification, issued concurrently. Partial failure
    /// leaves the failed ones unread with no retry; the next call picks
    /// up only the still-unread ones.
    pub async fn mark_all_read(&self, user_id: DocId) {
        let unread: Vec<DocId> = self.mirror.with(|view| {
            view.notifications
                .iter()
                .filter(|n| !n.read && n.user_id == user_id)
                .map(|n| n.id)
                .collect()
        });

        let updates = unread.into_iter().map(|id| {
            let store = Arc::clone(&self.store);
            async move {
                let patch = json!({ "read": true, "read_at": Utc::now() });
                store
                    .update_if(NOTIFICATIONS, id, Predicate::eq("read", false), patch)
                    .await
            }
        });

        let failed = join_all(updates)
            .await
            .into_iter()
            .filter(|result| result.is_err())
            .count();
        if failed > 0 {
            tracing::warn!(failed, %user_id, "Some notifications could not be marked read");
        }
    }

    /// Current feed state, read synchronously from the mirror.
    pub fn view(&self) -> FeedView {
        self.mirror.read()
    }

    /// Current notifications, newest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.mirror.with(|view| view.notifications.clone())
    }

    /// Count of cached notifications with `read == false`.
    pub fn unread_count(&self) -> usize {
        self.mirror.with(|view| view.unread_count)
    }
}

/// Sort newest-first and recompute the unread count in one pass.
fn build_view(mut notifications: Vec<Notification>) -> FeedView {
    notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let unread_count = notifications.iter().filter(|n| !n.read).count();
    FeedView {
        notifications,
        unread_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_serialize_snake_case() {
        let value = serde_json::to_value(NotificationKind::NewChat).expect("serializes");
        assert_eq!(value, serde_json::json!("new_chat"));
        let value = serde_json::to_value(NotificationKind::PartnershipRequest).expect("serializes");
        assert_eq!(value, serde_json::json!("partnership_request"));
    }

    #[test]
    fn build_view_sorts_newest_first_and_counts_unread() {
        let base = NewNotification::new(
            DocId::new_v4(),
            NotificationKind::NewChat,
            DocId::new_v4(),
            "m",
        );
        let at = |offset: i64, read: bool| Notification {
            id: DocId::new_v4(),
            user_id: base.user_id,
            kind: base.kind,
            from_user_id: base.from_user_id,
            from_user_name: None,
            from_user_photo_url: None,
            job_id: None,
            job_title: None,
            offer_id: None,
            from_community_id: None,
            from_community_name: None,
            chat_id: None,
            message: base.message.clone(),
            read,
            created_at: Utc::now() + chrono::Duration::seconds(offset),
            read_at: None,
        };

        let view = build_view(vec![at(1, true), at(3, false), at(2, false)]);

        assert_eq!(view.unread_count, 2);
        let stamps: Vec<_> = view.notifications.iter().map(|n| n.created_at).collect();
        assert!(stamps[0] > stamps[1] && stamps[1] > stamps[2]);
    }
}
