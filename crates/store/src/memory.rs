//! In-memory document store with live queries.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, RwLock};

use crewlink_core::types::DocId;

use crate::adapter::{DocumentStore, LiveQuery, SubscriptionHandle, UpdateOutcome};
use crate::document::{stamp_id, Document};
use crate::error::StoreError;
use crate::predicate::{matches_all, Predicate};

type Collection = BTreeMap<DocId, Value>;

/// A registered live query.
struct Subscriber {
    collection: String,
    predicates: Vec<Predicate>,
    sender: mpsc::UnboundedSender<Vec<Document>>,
}

/// In-process [`DocumentStore`] used by tests and the local sandbox.
///
/// Every mutation re-evaluates each live query registered on the touched
/// collection and pushes the full matching result set, mirroring the
/// remote store's snapshot semantics.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

struct Inner {
    collections: RwLock<HashMap<String, Collection>>,
    subscribers: Mutex<HashMap<u64, Subscriber>>,
    next_subscriber: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                collections: RwLock::new(HashMap::new()),
                subscribers: Mutex::new(HashMap::new()),
                next_subscriber: AtomicU64::new(0),
            }),
        }
    }

    /// Push the current result set to every live query on `collection`.
    ///
    /// Subscribers whose receiving half has been dropped are pruned here.
    async fn notify(&self, collection: &str) {
        let snapshot: Vec<(DocId, Value)> = {
            let collections = self.inner.collections.read().await;
            collections
                .get(collection)
                .map(|c| c.iter().map(|(id, data)| (*id, data.clone())).collect())
                .unwrap_or_default()
        };

        let mut subscribers = self
            .inner
            .subscribers
            .lock()
            .expect("subscriber registry lock poisoned");
        subscribers.retain(|_, sub| {
            if sub.collection != collection {
                return true;
            }
            let docs: Vec<Document> = snapshot
                .iter()
                .filter(|(_, data)| matches_all(&sub.predicates, data))
                .map(|(id, data)| Document {
                    id: *id,
                    data: data.clone(),
                })
                .collect();
            sub.sender.send(docs).is_ok()
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Top-level merge: fields in `patch` replace their counterparts in `doc`.
fn merge_patch(doc: &mut Value, patch: &Value) -> Result<(), StoreError> {
    match (doc, patch) {
        (Value::Object(target), Value::Object(fields)) => {
            for (key, value) in fields {
                target.insert(key.clone(), value.clone());
            }
            Ok(())
        }
        _ => Err(StoreError::InvalidDocument(
            "merge patch requires object documents".to_string(),
        )),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, collection: &str, record: Value) -> Result<DocId, StoreError> {
        if !record.is_object() {
            return Err(StoreError::InvalidDocument(
                "records must be JSON objects".to_string(),
            ));
        }
        let id = DocId::new_v4();
        let mut record = record;
        stamp_id(&mut record, id);

        self.inner
            .collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id, record);

        self.notify(collection).await;
        Ok(id)
    }

    async fn get(&self, collection: &str, id: DocId) -> Result<Option<Document>, StoreError> {
        let collections = self.inner.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|c| c.get(&id))
            .map(|data| Document {
                id,
                data: data.clone(),
            }))
    }

    async fn update(&self, collection: &str, id: DocId, patch: Value) -> Result<(), StoreError> {
        {
            let mut collections = self.inner.collections.write().await;
            let doc = collections
                .get_mut(collection)
                .and_then(|c| c.get_mut(&id))
                .ok_or_else(|| StoreError::not_found(collection, id))?;
            merge_patch(doc, &patch)?;
        }
        self.notify(collection).await;
        Ok(())
    }

    async fn update_if(
        &self,
        collection: &str,
        id: DocId,
        guard: Predicate,
        patch: Value,
    ) -> Result<UpdateOutcome, StoreError> {
        {
            let mut collections = self.inner.collections.write().await;
            let doc = collections
                .get_mut(collection)
                .and_then(|c| c.get_mut(&id))
                .ok_or_else(|| StoreError::not_found(collection, id))?;
            if !guard.matches(doc) {
                return Ok(UpdateOutcome::Conflict);
            }
            merge_patch(doc, &patch)?;
        }
        self.notify(collection).await;
        Ok(UpdateOutcome::Applied)
    }

    async fn delete(&self, collection: &str, id: DocId) -> Result<(), StoreError> {
        {
            let mut collections = self.inner.collections.write().await;
            collections
                .get_mut(collection)
                .and_then(|c| c.remove(&id))
                .ok_or_else(|| StoreError::not_found(collection, id))?;
        }
        self.notify(collection).await;
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        predicates: &[Predicate],
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.inner.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|c| {
                c.iter()
                    .filter(|(_, data)| matches_all(predicates, data))
                    .map(|(id, data)| Document {
                        id: *id,
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn subscribe(
        &self,
        collection: &str,
        predicates: Vec<Predicate>,
    ) -> Result<LiveQuery, StoreError> {
        let (sender, snapshots) = mpsc::unbounded_channel();

        // New subscribers see the current result set right away.
        let initial = self.query(collection, &predicates).await?;
        let _ = sender.send(initial);

        let id = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .lock()
            .expect("subscriber registry lock poisoned")
            .insert(
                id,
                Subscriber {
                    collection: collection.to_string(),
                    predicates,
                    sender,
                },
            );

        let inner = Arc::clone(&self.inner);
        let handle = SubscriptionHandle::new(move || {
            if let Ok(mut subscribers) = inner.subscribers.lock() {
                subscribers.remove(&id);
            }
        });

        Ok(LiveQuery { snapshots, handle })
    }
}
