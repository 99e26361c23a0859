//! Well-known remote collection name constants.
//!
//! These must match the collection names used by the store subscriptions,
//! the ledgers, and the snapshot blobs persisted per collection.

/// Job vacancy applications, one record per (job, applicant) submission.
pub const JOB_APPLICATIONS: &str = "job_applications";

/// Partnership offer applications, one record per (offer, community) answer.
pub const PARTNERSHIP_APPLICATIONS: &str = "partnership_applications";

/// Per-user notification records; every record has exactly one addressee.
pub const NOTIFICATIONS: &str = "notifications";

/// Conversations created as a side effect of application approval.
pub const CONVERSATIONS: &str = "conversations";
