//! Leave-request lifecycle engine: calendar day counting, balance accounting,
//! the request state machine, policy toggles, and notification dispatch.
//!
//! Storage and email live behind collaborator traits so the whole workflow can
//! be exercised against in-memory doubles.

pub mod calendar;
pub mod domain;
pub mod ledger;
pub mod notification;
pub mod policy;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use calendar::{count_chargeable_days, CalendarError};
pub use domain::{
    BalanceSnapshot, BalanceSummary, LeaveDays, LeaveRequest, LeaveRequestView, LeaveStatus,
    LeaveType, RequestId, StaffMember, StaffRole, UserId,
};
pub use ledger::{BalanceLedger, LedgerError};
pub use notification::{
    EmailRecipient, Mailer, MailerError, NotificationDispatcher, Organization, TemplateId,
};
pub use policy::{LeavePolicy, PolicySource};
pub use repository::{LeaveRepository, RepositoryError, RequestFilter, StaffRepository};
pub use router::leave_router;
pub use service::{LeaveEdit, LeaveService, LeaveServiceError, LeaveSubmission};
