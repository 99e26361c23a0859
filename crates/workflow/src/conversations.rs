//! Conversation records created as a side effect of application approval.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crewlink_core::collections::CONVERSATIONS;
use crewlink_core::types::{DocId, Timestamp};
use crewlink_store::{DocumentStore, StoreError};

use crate::error::WorkflowResult;

/// Which offer domain a conversation originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationKind {
    Job,
    Partnership,
}

/// Back-reference to the originating offer/application/community.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationContext {
    pub offer_id: DocId,
    pub application_id: DocId,
    pub community_id: Option<DocId>,
}

/// A chat record between exactly two participants.
///
/// `last_message`/`last_message_at` start empty and are owned by the
/// messaging feature, which is outside this subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: DocId,
    pub kind: ConversationKind,
    pub participants: [DocId; 2],
    pub context: ConversationContext,
    pub last_message: Option<String>,
    pub last_message_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Payload for creating a conversation.
#[derive(Debug, Clone)]
pub struct NewConversation {
    pub kind: ConversationKind,
    pub participants: [DocId; 2],
    pub context: ConversationContext,
}

/// Writer for the `conversations` collection.
pub struct Conversations {
    store: Arc<dyn DocumentStore>,
}

impl Conversations {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Create the chat record for an approved application.
    pub async fn create(&self, conversation: NewConversation) -> WorkflowResult<DocId> {
        let record = Conversation {
            id: DocId::nil(),
            kind: conversation.kind,
            participants: conversation.participants,
            context: conversation.context,
            last_message: None,
            last_message_at: None,
            created_at: Utc::now(),
        };
        let body = serde_json::to_value(&record).map_err(StoreError::from)?;
        let id = self.store.create(CONVERSATIONS, body).await?;
        tracing::info!(%id, kind = ?record.kind, "Conversation created");
        Ok(id)
    }
}
