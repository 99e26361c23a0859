//! Best-effort secondary fan-out.
//!
//! Every state-changing ledger operation performs its primary write
//! first, then hands the 0–3 secondary writes (notifications, the
//! conversation) to [`SideEffects`]. The secondary writes are issued
//! sequentially and are not transactional with the primary write: a
//! failure is logged and dropped, earlier secondary writes stay in place,
//! later ones are skipped, and the primary transition stands regardless.

use std::sync::Arc;

use crewlink_core::types::DocId;

use crate::conversations::{Conversations, NewConversation};
use crate::notifications::{NewNotification, NotificationFeed, NotificationKind};

/// Dispatches the secondary writes that follow each ledger transition.
pub struct SideEffects {
    feed: Arc<NotificationFeed>,
    conversations: Arc<Conversations>,
}

impl SideEffects {
    pub fn new(feed: Arc<NotificationFeed>, conversations: Arc<Conversations>) -> Self {
        Self {
            feed,
            conversations,
        }
    }

    /// Announce a fresh submission to the offer owner.
    pub async fn application_submitted(&self, owner_note: NewNotification) {
        self.send(owner_note).await;
    }

    /// Fan out an approval: the applicant notification, then the
    /// conversation, then one `new_chat` notification per participant.
    ///
    /// If the conversation write fails, the `new_chat` notifications are
    /// skipped; the applicant notification already sent stays in place.
    pub async fn application_approved(
        &self,
        applicant_note: NewNotification,
        conversation: NewConversation,
        offer_title: &str,
        reviewer_id: DocId,
    ) {
        self.send(applicant_note).await;

        let participants = conversation.participants;
        let chat_id = match self.conversations.create(conversation).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create conversation on approval");
                return;
            }
        };

        for participant in participants {
            let note = NewNotification::new(
                participant,
                NotificationKind::NewChat,
                reviewer_id,
                new_chat_message(offer_title),
            )
            .about_chat(chat_id);
            self.send(note).await;
        }
    }

    /// Fan out a rejection: a single applicant notification.
    pub async fn application_rejected(&self, applicant_note: NewNotification) {
        self.send(applicant_note).await;
    }

    /// Issue one notification write, logging and dropping any failure.
    async fn send(&self, note: NewNotification) {
        let user_id = note.user_id;
        let kind = note.kind;
        if let Err(e) = self.feed.add(note).await {
            tracing::error!(error = %e, %user_id, ?kind, "Dropping failed notification write");
        }
    }
}

// ---------------------------------------------------------------------------
// Notification texts
// ---------------------------------------------------------------------------

// Texts are precomputed at write time so the feed never templates
// client-side from the notification kind.

pub(crate) fn job_application_message(applicant_name: &str, job_title: &str) -> String {
    format!("{applicant_name} applied for \"{job_title}\"")
}

pub(crate) fn partnership_request_message(community_name: &str, offer_title: &str) -> String {
    format!("{community_name} responded to your partnership offer \"{offer_title}\"")
}

pub(crate) fn application_approved_message(offer_title: &str) -> String {
    format!("Your application for \"{offer_title}\" was approved")
}

pub(crate) fn application_rejected_message(offer_title: &str, reason: &str) -> String {
    if reason.is_empty() {
        format!("Your application for \"{offer_title}\" was declined")
    } else {
        format!("Your application for \"{offer_title}\" was declined: {reason}")
    }
}

pub(crate) fn new_chat_message(offer_title: &str) -> String {
    format!("A conversation about \"{offer_title}\" has been started")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_interpolate_names_and_titles() {
        assert_eq!(
            job_application_message("Sam", "Backend Engineer"),
            "Sam applied for \"Backend Engineer\""
        );
        assert_eq!(
            partnership_request_message("Robotics Club", "Hackathon sponsorship"),
            "Robotics Club responded to your partnership offer \"Hackathon sponsorship\""
        );
    }

    #[test]
    fn rejection_message_includes_reason_only_when_present() {
        assert_eq!(
            application_rejected_message("Backend Engineer", ""),
            "Your application for \"Backend Engineer\" was declined"
        );
        assert_eq!(
            application_rejected_message("Backend Engineer", "position filled"),
            "Your application for \"Backend Engineer\" was declined: position filled"
        );
    }
}
