use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{LeaveRequest, LeaveStatus, LeaveType, RequestId, StaffMember, UserId};

/// Error enumeration for storage failures.
///
/// `Conflict` signals an optimistic-lock failure: the record was written by
/// someone else since it was fetched. It is the only error the state machine
/// retries.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("record version conflict")]
    Conflict,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Filters accepted by the request listing, matching the admin screen's controls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestFilter {
    pub user_id: Option<UserId>,
    pub status: Option<LeaveStatus>,
    pub leave_type: Option<LeaveType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Storage abstraction for leave requests so the state machine can be exercised
/// against an in-memory double.
pub trait LeaveRepository: Send + Sync {
    fn insert(&self, record: LeaveRequest) -> Result<LeaveRequest, RepositoryError>;

    fn fetch(&self, id: RequestId) -> Result<Option<LeaveRequest>, RepositoryError>;

    /// Compare-and-swap write: fails with `Conflict` when the stored version no
    /// longer matches `record.version`.
    fn update(&self, record: LeaveRequest) -> Result<(), RepositoryError>;

    /// Hard delete; archival is the storage implementation's concern.
    fn delete(&self, id: RequestId) -> Result<(), RepositoryError>;

    /// Whether any non-rejected request for `user_id` intersects `[start, end]`,
    /// ignoring `exclude` (the request currently being edited).
    fn find_overlapping(
        &self,
        user_id: UserId,
        start: NaiveDate,
        end: NaiveDate,
        exclude: Option<RequestId>,
    ) -> Result<bool, RepositoryError>;

    fn list(&self, filter: &RequestFilter) -> Result<Vec<LeaveRequest>, RepositoryError>;
}

/// Storage abstraction over the staff directory, restricted to what the ledger
/// and notification fan-out need.
pub trait StaffRepository: Send + Sync {
    fn fetch_staff(&self, id: UserId) -> Result<Option<StaffMember>, RepositoryError>;

    /// Compare-and-swap write on the staff record; `Conflict` when the stored
    /// version moved. Serializes concurrent balance mutations for one user.
    fn update_staff(&self, staff: StaffMember) -> Result<(), RepositoryError>;

    /// Every staff member whose role reviews leave requests (HR and admins).
    fn reviewers(&self) -> Result<Vec<StaffMember>, RepositoryError>;
}
