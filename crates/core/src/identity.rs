//! Session identity snapshot.

use serde::{Deserialize, Serialize};

use crate::types::DocId;

/// The current user as reported by the session provider.
///
/// Available synchronously at call time and copied verbatim into the
/// denormalized actor fields of applications and notifications. The
/// snapshot is never refreshed after it has been written into a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: DocId,
    pub display_name: String,
    pub photo_url: Option<String>,
}

impl Identity {
    /// Build an identity snapshot for the given user.
    pub fn new(user_id: DocId, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            photo_url: None,
        }
    }

    /// Attach a profile photo URL to the snapshot.
    pub fn with_photo(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }
}
