//! The application review state machine.
//!
//! Job and partnership applications run two parallel instances of the
//! same lifecycle — `pending → approved | rejected`, both terminal —
//! over different collections. [`ApplicationLedger`] carries the shared
//! transition logic; [`ApplicationDomain`] supplies everything that
//! differs per offer domain (collection, record shape, notification
//! texts, conversation context).

use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use validator::Validate;

use crewlink_core::collections;
use crewlink_core::error::CoreError;
use crewlink_core::types::{DocId, Timestamp};
use crewlink_store::{DocumentStore, Mirror, Predicate, SnapshotStore, StoreError, UpdateOutcome};

use crate::applications::{
    ApplicationStatus, JobApplication, PartnershipApplication, SubmitJobApplication,
    SubmitPartnershipApplication,
};
use crate::conversations::{ConversationContext, ConversationKind, NewConversation};
use crate::dispatcher::{
    application_approved_message, application_rejected_message, job_application_message,
    partnership_request_message, SideEffects,
};
use crate::error::WorkflowResult;
use crate::live::{decode_snapshot, LiveHandle};
use crate::notifications::{NewNotification, NotificationKind};

/// One offer domain of the shared review state machine.
pub trait ApplicationDomain: Send + Sync + 'static {
    /// Stored record type.
    type Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static;
    /// Validated submission payload.
    type Submission: Validate + Send;

    const COLLECTION: &'static str;
    const ENTITY: &'static str;
    /// Document field naming the user who reviews submissions.
    const REVIEWER_FIELD: &'static str;
    /// Document field naming the submitting user.
    const APPLICANT_FIELD: &'static str;

    /// Build the pending record for a validated submission.
    fn record(submission: Self::Submission, now: Timestamp) -> Self::Record;
    fn id(record: &Self::Record) -> DocId;
    fn reviewer_id(record: &Self::Record) -> DocId;
    fn offer_title(record: &Self::Record) -> &str;

    /// Owner notification announcing the submission.
    fn submitted_notification(record: &Self::Record) -> NewNotification;
    /// Applicant notification announcing approval.
    fn approved_notification(record: &Self::Record, reviewer_id: DocId) -> NewNotification;
    /// Applicant notification announcing rejection.
    fn rejected_notification(
        record: &Self::Record,
        reviewer_id: DocId,
        reason: &str,
    ) -> NewNotification;
    /// Conversation opened between the applicant and the reviewer.
    fn conversation(record: &Self::Record) -> NewConversation;
}

/// Outcome of a review call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    /// This call performed the transition and ran the fan-out.
    Applied,
    /// The record had already left `pending`; nothing was written and no
    /// side effects ran.
    AlreadyReviewed,
}

/// The submit/review lifecycle for one offer domain.
///
/// Reviews operate against the mirror populated by the live
/// subscription, not a point read: a transition on a record the cache
/// has not seen fails with `NotFound`.
pub struct ApplicationLedger<D: ApplicationDomain> {
    store: Arc<dyn DocumentStore>,
    effects: Arc<SideEffects>,
    mirror: Arc<Mirror<Vec<D::Record>>>,
    snapshots: Arc<SnapshotStore>,
    persist: bool,
}

impl<D: ApplicationDomain> ApplicationLedger<D> {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        effects: Arc<SideEffects>,
        snapshots: Arc<SnapshotStore>,
        persist: bool,
    ) -> Self {
        Self {
            store,
            effects,
            mirror: Arc::new(Mirror::new(Vec::new())),
            snapshots,
            persist,
        }
    }

    /// Submit a new application.
    ///
    /// Validation failures surface before any write. The record creation
    /// is the primary write; the owner notification that follows is
    /// best-effort and never rolls the record back.
    pub async fn submit(&self, submission: D::Submission) -> WorkflowResult<DocId> {
        submission
            .validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;

        let record = D::record(submission, Utc::now());
        let body = serde_json::to_value(&record).map_err(StoreError::from)?;
        let id = self.store.create(D::COLLECTION, body).await?;
        tracing::info!(collection = D::COLLECTION, %id, "Application submitted");

        self.effects
            .application_submitted(D::submitted_notification(&record))
            .await;
        Ok(id)
    }

    /// Approve a pending application.
    ///
    /// The guarded status update is the primary write; once it is applied
    /// the dispatcher sends the applicant notification, creates the
    /// conversation, and notifies both participants. A record that has
    /// already left `pending` yields [`ReviewOutcome::AlreadyReviewed`]
    /// with no side effects, so a double approval is harmless.
    pub async fn approve(
        &self,
        application_id: DocId,
        reviewer_id: DocId,
    ) -> WorkflowResult<ReviewOutcome> {
        let (record, outcome) = self
            .transition(application_id, reviewer_id, ApplicationStatus::Approved)
            .await?;
        if outcome == UpdateOutcome::Conflict {
            tracing::debug!(
                collection = D::COLLECTION,
                %application_id,
                "Approval skipped, application already reviewed"
            );
            return Ok(ReviewOutcome::AlreadyReviewed);
        }
        tracing::info!(collection = D::COLLECTION, %application_id, %reviewer_id, "Application approved");

        self.effects
            .application_approved(
                D::approved_notification(&record, reviewer_id),
                D::conversation(&record),
                D::offer_title(&record),
                reviewer_id,
            )
            .await;
        Ok(ReviewOutcome::Applied)
    }

    /// Reject a pending application.
    ///
    /// An empty `reason` is accepted. On success exactly one rejection
    /// notification goes to the applicant; no conversation is created.
    pub async fn reject(
        &self,
        application_id: DocId,
        reviewer_id: DocId,
        reason: &str,
    ) -> WorkflowResult<ReviewOutcome> {
        let (record, outcome) = self
            .transition(application_id, reviewer_id, ApplicationStatus::Rejected)
            .await?;
        if outcome == UpdateOutcome::Conflict {
            tracing::debug!(
                collection = D::COLLECTION,
                %application_id,
                "Rejection skipped, application already reviewed"
            );
            return Ok(ReviewOutcome::AlreadyReviewed);
        }
        tracing::info!(collection = D::COLLECTION, %application_id, %reviewer_id, "Application rejected");

        self.effects
            .application_rejected(D::rejected_notification(&record, reviewer_id, reason))
            .await;
        Ok(ReviewOutcome::Applied)
    }

    /// Administrative hard delete. No notification is sent; authorization
    /// is the admin surface's obligation.
    pub async fn delete(&self, application_id: DocId) -> WorkflowResult<()> {
        self.store.delete(D::COLLECTION, application_id).await?;
        tracing::info!(collection = D::COLLECTION, %application_id, "Application deleted");
        Ok(())
    }

    /// Live query over the applications this user reviews.
    pub async fn subscribe_for_reviewer(&self, user_id: DocId) -> WorkflowResult<LiveHandle> {
        self.subscribe_where(Predicate::eq(D::REVIEWER_FIELD, user_id))
            .await
    }

    /// Live query over the applications this user submitted.
    pub async fn subscribe_for_applicant(&self, user_id: DocId) -> WorkflowResult<LiveHandle> {
        self.subscribe_where(Predicate::eq(D::APPLICANT_FIELD, user_id))
            .await
    }

    /// Current applications, read synchronously from the mirror.
    pub fn applications(&self) -> Vec<D::Record> {
        self.mirror.read()
    }

    /// Restore the persisted application blob into the mirror.
    pub fn restore_persisted(&self) {
        if let Some(records) = self.snapshots.load::<D::Record>(D::COLLECTION) {
            self.mirror.replace(records);
        }
    }

    fn cached(&self, id: DocId) -> Option<D::Record> {
        self.mirror
            .with(|records| records.iter().find(|r| D::id(r) == id).cloned())
    }

    /// Run the conditional pending→terminal transition shared by approve
    /// and reject.
    ///
    /// The record is looked up in the mirror — the ledger operates
    /// against the subscription-fed cache, not a point read — and the
    /// caller must be the record's designated reviewer. The status update
    /// itself is guarded on `status == pending` so concurrent reviews
    /// resolve to exactly one `Applied` outcome.
    async fn transition(
        &self,
        application_id: DocId,
        reviewer_id: DocId,
        status: ApplicationStatus,
    ) -> WorkflowResult<(D::Record, UpdateOutcome)> {
        let record = self.cached(application_id).ok_or(CoreError::NotFound {
            entity: D::ENTITY,
            id: application_id,
        })?;
        if D::reviewer_id(&record) != reviewer_id {
            return Err(CoreError::Forbidden(
                "only the offer owner may review an application".to_string(),
            )
            .into());
        }

        let patch = json!({
            "status": status,
            "reviewed_at": Utc::now(),
            "reviewed_by": reviewer_id,
        });
        let outcome = self
            .store
            .update_if(
                D::COLLECTION,
                application_id,
                Predicate::eq("status", ApplicationStatus::Pending),
                patch,
            )
            .await?;
        Ok((record, outcome))
    }

    async fn subscribe_where(&self, predicate: Predicate) -> WorkflowResult<LiveHandle> {
        let live = self.store.subscribe(D::COLLECTION, vec![predicate]).await?;

        let mirror = Arc::clone(&self.mirror);
        let snapshots = Arc::clone(&self.snapshots);
        let persist = self.persist;
        let mut rx = live.snapshots;

        let task = tokio::spawn(async move {
            while let Some(docs) = rx.recv().await {
                let records = decode_snapshot::<D::Record>(D::COLLECTION, &docs);
                if persist {
                    if let Err(e) = snapshots.save(D::COLLECTION, &records) {
                        tracing::warn!(
                            error = %e,
                            collection = D::COLLECTION,
                            "Failed to persist application snapshot"
                        );
                    }
                }
                mirror.replace(records);
            }
        });

        Ok(LiveHandle::new(live.handle, task))
    }
}

// ---------------------------------------------------------------------------
// Domain instances
// ---------------------------------------------------------------------------

/// Job vacancy domain.
pub struct JobDomain;

impl ApplicationDomain for JobDomain {
    type Record = JobApplication;
    type Submission = SubmitJobApplication;

    const COLLECTION: &'static str = collections::JOB_APPLICATIONS;
    const ENTITY: &'static str = "JobApplication";
    const REVIEWER_FIELD: &'static str = "employer_id";
    const APPLICANT_FIELD: &'static str = "applicant_id";

    fn record(submission: Self::Submission, now: Timestamp) -> JobApplication {
        JobApplication {
            id: DocId::nil(),
            job_id: submission.job_id,
            job_title: submission.job_title,
            applicant_id: submission.applicant.user_id,
            applicant_name: submission.applicant.display_name,
            applicant_photo_url: submission.applicant.photo_url,
            employer_id: submission.employer_id,
            cover_letter: submission.cover_letter,
            portfolio: submission.portfolio,
            status: ApplicationStatus::Pending,
            created_at: now,
            reviewed_at: None,
            reviewed_by: None,
        }
    }

    fn id(record: &JobApplication) -> DocId {
        record.id
    }

    fn reviewer_id(record: &JobApplication) -> DocId {
        record.employer_id
    }

    fn offer_title(record: &JobApplication) -> &str {
        &record.job_title
    }

    fn submitted_notification(record: &JobApplication) -> NewNotification {
        let mut note = NewNotification::new(
            record.employer_id,
            NotificationKind::JobApplication,
            record.applicant_id,
            job_application_message(&record.applicant_name, &record.job_title),
        )
        .from_name(record.applicant_name.clone())
        .about_job(record.job_id, record.job_title.clone());
        if let Some(url) = &record.applicant_photo_url {
            note = note.from_photo(url.clone());
        }
        note
    }

    fn approved_notification(record: &JobApplication, reviewer_id: DocId) -> NewNotification {
        NewNotification::new(
            record.applicant_id,
            NotificationKind::ApplicationApproved,
            reviewer_id,
            application_approved_message(&record.job_title),
        )
        .about_job(record.job_id, record.job_title.clone())
    }

    fn rejected_notification(
        record: &JobApplication,
        reviewer_id: DocId,
        reason: &str,
    ) -> NewNotification {
        NewNotification::new(
            record.applicant_id,
            NotificationKind::ApplicationRejected,
            reviewer_id,
            application_rejected_message(&record.job_title, reason),
        )
        .about_job(record.job_id, record.job_title.clone())
    }

    fn conversation(record: &JobApplication) -> NewConversation {
        NewConversation {
            kind: ConversationKind::Job,
            participants: [record.applicant_id, record.employer_id],
            context: ConversationContext {
                offer_id: record.job_id,
                application_id: record.id,
                community_id: None,
            },
        }
    }
}

/// Partnership offer domain.
pub struct PartnershipDomain;

impl ApplicationDomain for PartnershipDomain {
    type Record = PartnershipApplication;
    type Submission = SubmitPartnershipApplication;

    const COLLECTION: &'static str = collections::PARTNERSHIP_APPLICATIONS;
    const ENTITY: &'static str = "PartnershipApplication";
    const REVIEWER_FIELD: &'static str = "owner_id";
    const APPLICANT_FIELD: &'static str = "applicant_id";

    fn record(submission: Self::Submission, now: Timestamp) -> PartnershipApplication {
        PartnershipApplication {
            id: DocId::nil(),
            offer_id: submission.offer_id,
            offer_title: submission.offer_title,
            applicant_id: submission.applicant.user_id,
            applicant_name: submission.applicant.display_name,
            applicant_photo_url: submission.applicant.photo_url,
            from_community_id: submission.from_community_id,
            from_community_name: submission.from_community_name,
            owner_id: submission.owner_id,
            message: submission.message,
            status: ApplicationStatus::Pending,
            created_at: now,
            reviewed_at: None,
            reviewed_by: None,
        }
    }

    fn id(record: &PartnershipApplication) -> DocId {
        record.id
    }

    fn reviewer_id(record: &PartnershipApplication) -> DocId {
        record.owner_id
    }

    fn offer_title(record: &PartnershipApplication) -> &str {
        &record.offer_title
    }

    fn submitted_notification(record: &PartnershipApplication) -> NewNotification {
        let mut note = NewNotification::new(
            record.owner_id,
            NotificationKind::PartnershipRequest,
            record.applicant_id,
            partnership_request_message(&record.from_community_name, &record.offer_title),
        )
        .from_name(record.applicant_name.clone())
        .about_offer(record.offer_id)
        .about_community(record.from_community_id, record.from_community_name.clone());
        if let Some(url) = &record.applicant_photo_url {
            note = note.from_photo(url.clone());
        }
        note
    }

    fn approved_notification(record: &PartnershipApplication, reviewer_id: DocId) -> NewNotification {
        NewNotification::new(
            record.applicant_id,
            NotificationKind::ApplicationApproved,
            reviewer_id,
            application_approved_message(&record.offer_title),
        )
        .about_offer(record.offer_id)
    }

    fn rejected_notification(
        record: &PartnershipApplication,
        reviewer_id: DocId,
        reason: &str,
    ) -> NewNotification {
        NewNotification::new(
            record.applicant_id,
            NotificationKind::ApplicationRejected,
            reviewer_id,
            application_rejected_message(&record.offer_title, reason),
        )
        .about_offer(record.offer_id)
    }

    fn conversation(record: &PartnershipApplication) -> NewConversation {
        NewConversation {
            kind: ConversationKind::Partnership,
            participants: [record.applicant_id, record.owner_id],
            context: ConversationContext {
                offer_id: record.offer_id,
                application_id: record.id,
                community_id: Some(record.from_community_id),
            },
        }
    }
}

/// Ledger over job applications.
pub type JobLedger = ApplicationLedger<JobDomain>;

/// Ledger over partnership applications.
pub type PartnershipLedger = ApplicationLedger<PartnershipDomain>;
