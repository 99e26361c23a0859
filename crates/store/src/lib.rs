//! Remote store boundary and local cache primitives.
//!
//! This crate isolates everything the workflow components need from the
//! hosted document database behind a single trait:
//!
//! - [`DocumentStore`] — collection-scoped create/read/update/delete, a
//!   conditional update, one-shot queries, and live queries that push the
//!   entire matching result set on every change.
//! - [`MemoryStore`] — in-process implementation used by tests and the
//!   local sandbox.
//! - [`PgDocumentStore`] — PostgreSQL JSONB implementation with an
//!   in-process change hub.
//! - [`Mirror`] — last-snapshot-wins local cache read synchronously by
//!   presentation code.
//! - [`SnapshotStore`] — durable local snapshot blobs for instant first
//!   paint across sessions.

pub mod adapter;
pub mod config;
pub mod document;
pub mod error;
pub mod memory;
pub mod mirror;
pub mod postgres;
pub mod predicate;
pub mod snapshot;

pub use adapter::{DocumentStore, LiveQuery, SnapshotReceiver, SubscriptionHandle, UpdateOutcome};
pub use config::StoreConfig;
pub use document::Document;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use mirror::Mirror;
pub use postgres::PgDocumentStore;
pub use predicate::Predicate;
pub use snapshot::SnapshotStore;
