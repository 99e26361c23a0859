//! Application records, statuses, and submission payloads.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crewlink_core::identity::Identity;
use crewlink_core::types::{DocId, Timestamp};

/// Review lifecycle of an application.
///
/// `pending` is the only non-terminal state; there is no transition out
/// of `approved` or `rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    /// Whether the status admits no further transition.
    pub fn is_terminal(self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }
}

/// Denormalized copy of the applicant's profile, taken at submission time
/// and never refreshed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub skills: Vec<String>,
    pub projects: Vec<String>,
    pub experience_level: Option<String>,
}

/// An application against a job vacancy.
///
/// Append-only except the single `status`/`reviewed_at`/`reviewed_by`
/// update performed by the review transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobApplication {
    pub id: DocId,
    pub job_id: DocId,
    pub job_title: String,
    pub applicant_id: DocId,
    pub applicant_name: String,
    pub applicant_photo_url: Option<String>,
    pub employer_id: DocId,
    pub cover_letter: String,
    pub portfolio: PortfolioSnapshot,
    pub status: ApplicationStatus,
    pub created_at: Timestamp,
    pub reviewed_at: Option<Timestamp>,
    pub reviewed_by: Option<DocId>,
}

/// An application against a partnership offer, submitted on behalf of a
/// community by one of its admins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnershipApplication {
    pub id: DocId,
    pub offer_id: DocId,
    pub offer_title: String,
    pub applicant_id: DocId,
    pub applicant_name: String,
    pub applicant_photo_url: Option<String>,
    pub from_community_id: DocId,
    pub from_community_name: String,
    pub owner_id: DocId,
    pub message: String,
    pub status: ApplicationStatus,
    pub created_at: Timestamp,
    pub reviewed_at: Option<Timestamp>,
    pub reviewed_by: Option<DocId>,
}

/// Payload for submitting a job application.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitJobApplication {
    pub job_id: DocId,
    #[validate(length(min = 1, message = "job title must not be empty"))]
    pub job_title: String,
    pub employer_id: DocId,
    pub applicant: Identity,
    #[validate(length(min = 1, message = "cover letter must not be empty"))]
    pub cover_letter: String,
    #[serde(default)]
    pub portfolio: PortfolioSnapshot,
}

/// Payload for answering a partnership offer.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitPartnershipApplication {
    pub offer_id: DocId,
    #[validate(length(min = 1, message = "offer title must not be empty"))]
    pub offer_title: String,
    pub owner_id: DocId,
    pub applicant: Identity,
    pub from_community_id: DocId,
    #[validate(length(min = 1, message = "a community must be selected"))]
    pub from_community_name: String,
    #[validate(length(min = 1, message = "message must not be empty"))]
    pub message: String,
}
