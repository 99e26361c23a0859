//! PostgreSQL-backed document store.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use tokio::sync::{broadcast, mpsc, oneshot};

use crewlink_core::types::DocId;

use crate::adapter::{DocumentStore, LiveQuery, SubscriptionHandle, UpdateOutcome};
use crate::document::{stamp_id, Document};
use crate::error::StoreError;
use crate::predicate::Predicate;

/// Buffer capacity of the in-process change hub.
const CHANGE_HUB_CAPACITY: usize = 256;

/// [`DocumentStore`] implementation on a single JSONB table.
///
/// All collections share one `documents` table; equality predicates
/// compile to JSONB containment so no per-collection schema or index is
/// required. Live queries are driven by an in-process change hub: every
/// local write broadcasts the touched collection name, and each
/// subscription re-runs its query and pushes the full result set. Writes
/// performed by other processes are not observed.
pub struct PgDocumentStore {
    pool: PgPool,
    changes: broadcast::Sender<String>,
}

impl PgDocumentStore {
    /// Wrap an existing pool and prepare the `documents` table.
    pub async fn new(pool: PgPool) -> Result<Self, StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (\
                 collection TEXT NOT NULL, \
                 id UUID NOT NULL, \
                 data JSONB NOT NULL, \
                 PRIMARY KEY (collection, id)\
             )",
        )
        .execute(&pool)
        .await?;

        let (changes, _) = broadcast::channel(CHANGE_HUB_CAPACITY);
        Ok(Self { pool, changes })
    }

    /// Connect to `database_url` and prepare the schema.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url).await?;
        Self::new(pool).await
    }

    /// Announce a write so live queries on `collection` refresh.
    fn notify(&self, collection: &str) {
        // SendError only means there are no live queries right now.
        let _ = self.changes.send(collection.to_string());
    }

    async fn run_query(
        pool: &PgPool,
        collection: &str,
        predicates: &[Predicate],
    ) -> Result<Vec<Document>, StoreError> {
        let rows: Vec<(DocId, Value)> =
            sqlx::query_as("SELECT id, data FROM documents WHERE collection = $1 AND data @> $2")
                .bind(collection)
                .bind(containment(predicates))
                .fetch_all(pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(id, data)| Document { id, data })
            .collect())
    }
}

/// Merge equality predicates into a single JSONB containment object.
fn containment(predicates: &[Predicate]) -> Value {
    let mut object = serde_json::Map::new();
    for p in predicates {
        object.insert(p.field.clone(), p.value.clone());
    }
    Value::Object(object)
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn create(&self, collection: &str, record: Value) -> Result<DocId, StoreError> {
        if !record.is_object() {
            return Err(StoreError::InvalidDocument(
                "records must be JSON objects".to_string(),
            ));
        }
        let id = DocId::new_v4();
        let mut record = record;
        stamp_id(&mut record, id);

        sqlx::query("INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(id)
            .bind(record)
            .execute(&self.pool)
            .await?;

        self.notify(collection);
        Ok(id)
    }

    async fn get(&self, collection: &str, id: DocId) -> Result<Option<Document>, StoreError> {
        let row: Option<(Value,)> =
            sqlx::query_as("SELECT data FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(data,)| Document { id, data }))
    }

    async fn update(&self, collection: &str, id: DocId, patch: Value) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE documents SET data = data || $3 WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .bind(patch)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(collection, id));
        }
        self.notify(collection);
        Ok(())
    }

    async fn update_if(
        &self,
        collection: &str,
        id: DocId,
        guard: Predicate,
        patch: Value,
    ) -> Result<UpdateOutcome, StoreError> {
        let result = sqlx::query(
            "UPDATE documents SET data = data || $4 \
             WHERE collection = $1 AND id = $2 AND data @> $3",
        )
        .bind(collection)
        .bind(id)
        .bind(containment(std::slice::from_ref(&guard)))
        .bind(patch)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            self.notify(collection);
            return Ok(UpdateOutcome::Applied);
        }
        // Distinguish a failed guard from a missing document.
        match self.get(collection, id).await? {
            Some(_) => Ok(UpdateOutcome::Conflict),
            None => Err(StoreError::not_found(collection, id)),
        }
    }

    async fn delete(&self, collection: &str, id: DocId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(collection, id));
        }
        self.notify(collection);
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        predicates: &[Predicate],
    ) -> Result<Vec<Document>, StoreError> {
        Self::run_query(&self.pool, collection, predicates).await
    }

    async fn subscribe(
        &self,
        collection: &str,
        predicates: Vec<Predicate>,
    ) -> Result<LiveQuery, StoreError> {
        let (sender, snapshots) = mpsc::unbounded_channel();

        let initial = Self::run_query(&self.pool, collection, &predicates).await?;
        let _ = sender.send(initial);

        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        let mut changes = self.changes.subscribe();
        let pool = self.pool.clone();
        let collection = collection.to_string();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut cancel_rx => break,
                    changed = changes.recv() => {
                        let refresh = match changed {
                            Ok(name) => name == collection,
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                tracing::warn!(
                                    skipped = n,
                                    collection = %collection,
                                    "Live query lagged behind the change hub"
                                );
                                true
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        };
                        if !refresh {
                            continue;
                        }
                        match PgDocumentStore::run_query(&pool, &collection, &predicates).await {
                            Ok(docs) => {
                                if sender.send(docs).is_err() {
                                    break;
                                }
                            }
                            Err(e) => tracing::error!(
                                error = %e,
                                collection = %collection,
                                "Live query refresh failed"
                            ),
                        }
                    }
                }
            }
        });

        let handle = SubscriptionHandle::new(move || {
            let _ = cancel_tx.send(());
        });
        Ok(LiveQuery { snapshots, handle })
    }
}
