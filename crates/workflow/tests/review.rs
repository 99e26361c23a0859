//! Review-path tests: approval and rejection transitions, their fan-out,
//! idempotence, authorization, and partial-failure behavior.

mod common;

use assert_matches::assert_matches;

use crewlink_core::collections::{CONVERSATIONS, JOB_APPLICATIONS, NOTIFICATIONS};
use crewlink_core::types::DocId;
use crewlink_core::CoreError;
use crewlink_workflow::applications::{ApplicationStatus, JobApplication};
use crewlink_workflow::conversations::Conversation;
use crewlink_workflow::notifications::{Notification, NotificationKind};
use crewlink_workflow::{ReviewOutcome, WorkflowError};

use common::{all_docs, all_records, identity, job_submission, test_session, wait_until};

// ---------------------------------------------------------------------------
// Test: approval transitions the record and fans out chat + notifications
// ---------------------------------------------------------------------------

#[tokio::test]
async fn approval_transitions_and_fans_out() {
    let t = test_session();
    let employer = identity("Avery");
    let applicant = identity("Sam");

    let sub = t
        .session
        .jobs
        .subscribe_for_reviewer(employer.user_id)
        .await
        .expect("subscribe");

    let id = t
        .session
        .jobs
        .submit(job_submission(
            &employer,
            &applicant,
            "Backend Engineer",
            "Hi",
        ))
        .await
        .expect("submit");
    wait_until(|| t.session.jobs.applications().len() == 1).await;

    let outcome = t
        .session
        .jobs
        .approve(id, employer.user_id)
        .await
        .expect("approve");
    assert_eq!(outcome, ReviewOutcome::Applied);

    let apps: Vec<JobApplication> = all_records(&t.store, JOB_APPLICATIONS).await;
    assert_eq!(apps[0].status, ApplicationStatus::Approved);
    assert_eq!(apps[0].reviewed_by, Some(employer.user_id));
    assert!(apps[0].reviewed_at.is_some());

    let chats: Vec<Conversation> = all_records(&t.store, CONVERSATIONS).await;
    assert_eq!(chats.len(), 1);
    let mut participants = chats[0].participants.to_vec();
    participants.sort();
    let mut expected = vec![applicant.user_id, employer.user_id];
    expected.sort();
    assert_eq!(participants, expected);
    assert_eq!(chats[0].context.application_id, id);
    assert!(chats[0].last_message.is_none());

    // Submission notification plus the approval fan-out of three.
    let notes: Vec<Notification> = all_records(&t.store, NOTIFICATIONS).await;
    assert_eq!(notes.len(), 4);
    let approved: Vec<_> = notes
        .iter()
        .filter(|n| n.kind == NotificationKind::ApplicationApproved)
        .collect();
    assert_eq!(approved.len(), 1);
    assert_eq!(approved[0].user_id, applicant.user_id);
    let new_chat: Vec<_> = notes
        .iter()
        .filter(|n| n.kind == NotificationKind::NewChat)
        .collect();
    assert_eq!(new_chat.len(), 2);
    let mut chat_recipients: Vec<_> = new_chat.iter().map(|n| n.user_id).collect();
    chat_recipients.sort();
    assert_eq!(chat_recipients, participants);
    assert!(new_chat.iter().all(|n| n.chat_id == Some(chats[0].id)));

    sub.unsubscribe();
}

// ---------------------------------------------------------------------------
// Test: rejection sends a single notification and no conversation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rejection_notifies_applicant_only() {
    let t = test_session();
    let employer = identity("Avery");
    let applicant = identity("Sam");

    let sub = t
        .session
        .jobs
        .subscribe_for_reviewer(employer.user_id)
        .await
        .expect("subscribe");
    let id = t
        .session
        .jobs
        .submit(job_submission(
            &employer,
            &applicant,
            "Backend Engineer",
            "Hi",
        ))
        .await
        .expect("submit");
    wait_until(|| t.session.jobs.applications().len() == 1).await;

    let outcome = t
        .session
        .jobs
        .reject(id, employer.user_id, "position filled")
        .await
        .expect("reject");
    assert_eq!(outcome, ReviewOutcome::Applied);

    let apps: Vec<JobApplication> = all_records(&t.store, JOB_APPLICATIONS).await;
    assert_eq!(apps[0].status, ApplicationStatus::Rejected);
    assert_eq!(apps[0].reviewed_by, Some(employer.user_id));

    assert!(all_docs(&t.store, CONVERSATIONS).await.is_empty());

    let notes: Vec<Notification> = all_records(&t.store, NOTIFICATIONS).await;
    assert_eq!(notes.len(), 2);
    let rejected: Vec<_> = notes
        .iter()
        .filter(|n| n.kind == NotificationKind::ApplicationRejected)
        .collect();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].user_id, applicant.user_id);
    assert!(rejected[0].message.contains("position filled"));

    sub.unsubscribe();
}

#[tokio::test]
async fn rejection_accepts_an_empty_reason() {
    let t = test_session();
    let employer = identity("Avery");

    let sub = t
        .session
        .jobs
        .subscribe_for_reviewer(employer.user_id)
        .await
        .expect("subscribe");
    let id = t
        .session
        .jobs
        .submit(job_submission(&employer, &identity("Sam"), "Role", "Hi"))
        .await
        .expect("submit");
    wait_until(|| t.session.jobs.applications().len() == 1).await;

    let outcome = t
        .session
        .jobs
        .reject(id, employer.user_id, "")
        .await
        .expect("reject with empty reason");
    assert_eq!(outcome, ReviewOutcome::Applied);

    sub.unsubscribe();
}

// ---------------------------------------------------------------------------
// Test: a second review is idempotent — no duplicate fan-out
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_approval_is_idempotent() {
    let t = test_session();
    let employer = identity("Avery");

    let sub = t
        .session
        .jobs
        .subscribe_for_reviewer(employer.user_id)
        .await
        .expect("subscribe");
    let id = t
        .session
        .jobs
        .submit(job_submission(&employer, &identity("Sam"), "Role", "Hi"))
        .await
        .expect("submit");
    wait_until(|| t.session.jobs.applications().len() == 1).await;

    let first = t
        .session
        .jobs
        .approve(id, employer.user_id)
        .await
        .expect("first approve");
    assert_eq!(first, ReviewOutcome::Applied);

    let second = t
        .session
        .jobs
        .approve(id, employer.user_id)
        .await
        .expect("second approve");
    assert_eq!(second, ReviewOutcome::AlreadyReviewed);

    // Still exactly one conversation and the original four notifications.
    assert_eq!(all_docs(&t.store, CONVERSATIONS).await.len(), 1);
    assert_eq!(all_docs(&t.store, NOTIFICATIONS).await.len(), 4);

    sub.unsubscribe();
}

// ---------------------------------------------------------------------------
// Test: reviews require the cache and the right reviewer
// ---------------------------------------------------------------------------

#[tokio::test]
async fn approval_of_an_uncached_application_is_not_found() {
    let t = test_session();
    let employer = identity("Avery");

    // Submitted, but no reviewer subscription has populated the mirror.
    let id = t
        .session
        .jobs
        .submit(job_submission(&employer, &identity("Sam"), "Role", "Hi"))
        .await
        .expect("submit");

    let err = t
        .session
        .jobs
        .approve(id, employer.user_id)
        .await
        .expect_err("mirror has not seen the record");
    assert_matches!(err, WorkflowError::Core(CoreError::NotFound { .. }));
}

#[tokio::test]
async fn approval_by_a_non_reviewer_is_forbidden() {
    let t = test_session();
    let employer = identity("Avery");
    let applicant = identity("Sam");

    let sub = t
        .session
        .jobs
        .subscribe_for_reviewer(employer.user_id)
        .await
        .expect("subscribe");
    let id = t
        .session
        .jobs
        .submit(job_submission(&employer, &applicant, "Role", "Hi"))
        .await
        .expect("submit");
    wait_until(|| t.session.jobs.applications().len() == 1).await;

    let err = t
        .session
        .jobs
        .approve(id, applicant.user_id)
        .await
        .expect_err("applicants cannot review their own application");
    assert_matches!(err, WorkflowError::Core(CoreError::Forbidden(_)));

    let apps: Vec<JobApplication> = all_records(&t.store, JOB_APPLICATIONS).await;
    assert_eq!(apps[0].status, ApplicationStatus::Pending);

    sub.unsubscribe();
}

// ---------------------------------------------------------------------------
// Test: a failed chat creation leaves the approval in place
// ---------------------------------------------------------------------------

#[tokio::test]
async fn approval_survives_failed_chat_creation() {
    let t = test_session();
    let employer = identity("Avery");
    let applicant = identity("Sam");

    let sub = t
        .session
        .jobs
        .subscribe_for_reviewer(employer.user_id)
        .await
        .expect("subscribe");
    let id = t
        .session
        .jobs
        .submit(job_submission(&employer, &applicant, "Role", "Hi"))
        .await
        .expect("submit");
    wait_until(|| t.session.jobs.applications().len() == 1).await;

    t.store.fail_creates_in(CONVERSATIONS);
    let outcome = t
        .session
        .jobs
        .approve(id, employer.user_id)
        .await
        .expect("approve reports success");
    assert_eq!(outcome, ReviewOutcome::Applied);

    // Status flipped and the applicant was notified, but there is no chat
    // and no new_chat notifications — and no compensation.
    let apps: Vec<JobApplication> = all_records(&t.store, JOB_APPLICATIONS).await;
    assert_eq!(apps[0].status, ApplicationStatus::Approved);
    assert!(all_docs(&t.store, CONVERSATIONS).await.is_empty());

    let notes: Vec<Notification> = all_records(&t.store, NOTIFICATIONS).await;
    assert_eq!(notes.len(), 2);
    assert!(notes
        .iter()
        .any(|n| n.kind == NotificationKind::ApplicationApproved && n.user_id == applicant.user_id));
    assert!(notes.iter().all(|n| n.kind != NotificationKind::NewChat));

    sub.unsubscribe();
}

// ---------------------------------------------------------------------------
// Test: administrative delete removes the record silently
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_removes_the_record_with_no_notification() {
    let t = test_session();
    let employer = identity("Avery");

    let id = t
        .session
        .jobs
        .submit(job_submission(&employer, &identity("Sam"), "Role", "Hi"))
        .await
        .expect("submit");
    assert_eq!(all_docs(&t.store, NOTIFICATIONS).await.len(), 1);

    t.session.jobs.delete(id).await.expect("delete");

    assert!(all_docs(&t.store, JOB_APPLICATIONS).await.is_empty());
    // Only the original submission notification remains.
    assert_eq!(all_docs(&t.store, NOTIFICATIONS).await.len(), 1);
}

#[tokio::test]
async fn delete_of_a_missing_record_is_an_error() {
    let t = test_session();
    let err = t
        .session
        .jobs
        .delete(DocId::new_v4())
        .await
        .expect_err("nothing to delete");
    assert_matches!(err, WorkflowError::Store(_));
}
