#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crewlink_core::identity::Identity;
use crewlink_core::types::DocId;
use crewlink_store::{
    Document, DocumentStore, LiveQuery, MemoryStore, Predicate, StoreConfig, StoreError,
    UpdateOutcome,
};
use crewlink_workflow::applications::{
    PortfolioSnapshot, SubmitJobApplication, SubmitPartnershipApplication,
};
use crewlink_workflow::Session;

/// A full workflow session over a fresh in-memory store, with a tempdir
/// snapshot directory and a fault-injecting store wrapper.
pub struct TestSession {
    pub store: Arc<FlakyStore>,
    pub session: Session,
    /// Kept alive so the snapshot directory survives the test.
    pub snapshot_dir: tempfile::TempDir,
}

/// Build a session the way `Session::new` is wired in production, on top
/// of [`FlakyStore`] so individual tests can inject write failures.
pub fn test_session() -> TestSession {
    let store = shared_store();
    let (session, snapshot_dir) = session_over(&store);
    TestSession {
        store,
        session,
        snapshot_dir,
    }
}

/// A store shared by several sessions, as with concurrent user sessions
/// against the same remote store.
pub fn shared_store() -> Arc<FlakyStore> {
    Arc::new(FlakyStore::new(MemoryStore::new()))
}

/// Build one session over `store` with its own snapshot directory.
pub fn session_over(store: &Arc<FlakyStore>) -> (Session, tempfile::TempDir) {
    let snapshot_dir = tempfile::tempdir().expect("tempdir");
    let config = StoreConfig {
        snapshot_dir: snapshot_dir.path().to_path_buf(),
        persist_snapshots: true,
    };
    let session = Session::new(Arc::clone(store) as Arc<dyn DocumentStore>, &config);
    (session, snapshot_dir)
}

pub fn identity(name: &str) -> Identity {
    Identity::new(DocId::new_v4(), name)
}

/// Poll until `condition` holds, panicking after two seconds.
///
/// Mirrors the UI's relationship to the mirror: writes land in the cache
/// only when the next live snapshot arrives.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 2s");
}

/// All documents currently in `collection`.
pub async fn all_docs(store: &FlakyStore, collection: &str) -> Vec<Document> {
    store
        .query(collection, &[])
        .await
        .expect("query should succeed")
}

/// All documents in `collection`, decoded into typed records.
pub async fn all_records<T: serde::de::DeserializeOwned>(
    store: &FlakyStore,
    collection: &str,
) -> Vec<T> {
    all_docs(store, collection)
        .await
        .iter()
        .map(|doc| doc.decode().expect("record decodes"))
        .collect()
}

/// Write a notification record directly, with a crafted `created_at`.
pub async fn seed_notification(
    store: &FlakyStore,
    user_id: DocId,
    offset_secs: i64,
    message: &str,
) -> DocId {
    let body = serde_json::json!({
        "id": DocId::nil(),
        "user_id": user_id,
        "kind": "new_chat",
        "from_user_id": DocId::new_v4(),
        "from_user_name": null,
        "from_user_photo_url": null,
        "job_id": null,
        "job_title": null,
        "offer_id": null,
        "from_community_id": null,
        "from_community_name": null,
        "chat_id": null,
        "message": message,
        "read": false,
        "created_at": chrono::Utc::now() + chrono::Duration::seconds(offset_secs),
        "read_at": null,
    });
    store
        .create(crewlink_core::collections::NOTIFICATIONS, body)
        .await
        .expect("seed notification")
}

pub fn job_submission(
    employer: &Identity,
    applicant: &Identity,
    job_title: &str,
    cover_letter: &str,
) -> SubmitJobApplication {
    SubmitJobApplication {
        job_id: DocId::new_v4(),
        job_title: job_title.to_string(),
        employer_id: employer.user_id,
        applicant: applicant.clone(),
        cover_letter: cover_letter.to_string(),
        portfolio: PortfolioSnapshot::default(),
    }
}

pub fn partnership_submission(
    owner: &Identity,
    applicant: &Identity,
    from_community_name: &str,
    offer_title: &str,
    message: &str,
) -> SubmitPartnershipApplication {
    SubmitPartnershipApplication {
        offer_id: DocId::new_v4(),
        offer_title: offer_title.to_string(),
        owner_id: owner.user_id,
        applicant: applicant.clone(),
        from_community_id: DocId::new_v4(),
        from_community_name: from_community_name.to_string(),
        message: message.to_string(),
    }
}

// ---------------------------------------------------------------------------
// FlakyStore
// ---------------------------------------------------------------------------

/// [`DocumentStore`] wrapper that fails selected writes on demand.
///
/// Everything else delegates to the wrapped [`MemoryStore`], so live
/// queries and reads behave exactly as in the happy path.
pub struct FlakyStore {
    inner: MemoryStore,
    create_failures: Mutex<HashSet<String>>,
    update_failures: Mutex<HashSet<DocId>>,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            create_failures: Mutex::new(HashSet::new()),
            update_failures: Mutex::new(HashSet::new()),
        }
    }

    /// Fail every `create` into `collection` until cleared.
    pub fn fail_creates_in(&self, collection: &str) {
        self.create_failures
            .lock()
            .expect("lock poisoned")
            .insert(collection.to_string());
    }

    pub fn clear_create_failures(&self) {
        self.create_failures.lock().expect("lock poisoned").clear();
    }

    /// Fail every `update`/`update_if` on `id` until cleared.
    pub fn fail_updates_on(&self, id: DocId) {
        self.update_failures
            .lock()
            .expect("lock poisoned")
            .insert(id);
    }

    pub fn clear_update_failures(&self) {
        self.update_failures.lock().expect("lock poisoned").clear();
    }

    fn check_create(&self, collection: &str) -> Result<(), StoreError> {
        if self
            .create_failures
            .lock()
            .expect("lock poisoned")
            .contains(collection)
        {
            return Err(StoreError::Unavailable(format!(
                "injected create failure in {collection}"
            )));
        }
        Ok(())
    }

    fn check_update(&self, id: DocId) -> Result<(), StoreError> {
        if self
            .update_failures
            .lock()
            .expect("lock poisoned")
            .contains(&id)
        {
            return Err(StoreError::Unavailable(format!(
                "injected update failure on {id}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn create(&self, collection: &str, record: Value) -> Result<DocId, StoreError> {
        self.check_create(collection)?;
        self.inner.create(collection, record).await
    }

    async fn get(&self, collection: &str, id: DocId) -> Result<Option<Document>, StoreError> {
        self.inner.get(collection, id).await
    }

    async fn update(&self, collection: &str, id: DocId, patch: Value) -> Result<(), StoreError> {
        self.check_update(id)?;
        self.inner.update(collection, id, patch).await
    }

    async fn update_if(
        &self,
        collection: &str,
        id: DocId,
        guard: Predicate,
        patch: Value,
    ) -> Result<UpdateOutcome, StoreError> {
        self.check_update(id)?;
        self.inner.update_if(collection, id, guard, patch).await
    }

    async fn delete(&self, collection: &str, id: DocId) -> Result<(), StoreError> {
        self.inner.delete(collection, id).await
    }

    async fn query(
        &self,
        collection: &str,
        predicates: &[Predicate],
    ) -> Result<Vec<Document>, StoreError> {
        self.inner.query(collection, predicates).await
    }

    async fn subscribe(
        &self,
        collection: &str,
        predicates: Vec<Predicate>,
    ) -> Result<LiveQuery, StoreError> {
        self.inner.subscribe(collection, predicates).await
    }
}
