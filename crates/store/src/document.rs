//! The unit of storage: an id plus a JSON object body.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crewlink_core::types::DocId;

use crate::error::StoreError;

/// A document as returned by store reads and live-query snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocId,
    pub data: Value,
}

impl Document {
    /// Decode the document body into a typed record.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        Ok(serde_json::from_value(self.data.clone())?)
    }
}

/// Write the store-assigned id into the document body, overwriting any
/// placeholder value the caller serialized.
pub(crate) fn stamp_id(data: &mut Value, id: DocId) {
    if let Value::Object(map) = data {
        map.insert("id".to_string(), Value::String(id.to_string()));
    }
}
