//! Application & notification workflow core.
//!
//! The one subsystem of the platform with real design decisions: the
//! lifecycle of job and partnership applications coupled to a per-user
//! real-time notification feed.
//!
//! - [`applications`] — application records, statuses, submission DTOs.
//! - [`ledger`] — the submit/approve/reject state machine, one generic
//!   instance per offer domain.
//! - [`notifications`] — the per-user notification feed and its single
//!   write path.
//! - [`dispatcher`] — best-effort secondary fan-out after each primary
//!   write.
//! - [`conversations`] — chat records created on approval.
//! - [`session`] — per-session service wiring and snapshot restore.
//!
//! Consistency policy, everywhere: the primary record write is
//! authoritative and durable; secondary fan-out is best-effort. A
//! secondary failure never undoes the primary write.

pub mod applications;
pub mod conversations;
pub mod dispatcher;
pub mod error;
pub mod ledger;
mod live;
pub mod notifications;
pub mod session;

pub use error::{WorkflowError, WorkflowResult};
pub use ledger::{ApplicationLedger, JobLedger, PartnershipLedger, ReviewOutcome};
pub use live::LiveHandle;
pub use notifications::NotificationFeed;
pub use session::Session;
