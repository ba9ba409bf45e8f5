use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use super::calendar::{count_chargeable_days, CalendarError};
use super::domain::{
    BalanceSummary, LeaveRequest, LeaveRequestView, LeaveStatus, LeaveType, RequestId,
    StaffMember, UserId,
};
use super::ledger::{BalanceLedger, LedgerError};
use super::notification::{Mailer, NotificationDispatcher, Organization};
use super::policy::LeavePolicy;
use super::repository::{LeaveRepository, RepositoryError, RequestFilter, StaffRepository};

/// Intent payload for a new leave request. The leave type arrives in wire form so
/// the state machine owns its validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveSubmission {
    pub user_id: UserId,
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub reason: String,
}

/// Intent payload for editing an existing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveEdit {
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub reason: String,
}

/// Error raised by the leave state machine. Callers branch on the kind; none of
/// these carry partial mutations.
#[derive(Debug, thiserror::Error)]
pub enum LeaveServiceError {
    #[error("invalid leave type '{0}'")]
    InvalidLeaveType(String),
    #[error("no chargeable days in the period {start} to {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    #[error("start date {0} cannot be in the past")]
    PastDate(NaiveDate),
    #[error("insufficient leave balance: {available} days available")]
    InsufficientBalance { requested: u32, available: u32 },
    #[error("an existing leave request already covers this period")]
    OverlappingRequest,
    #[error("leave request {} not found", .0 .0)]
    NotFound(RequestId),
    #[error("leave request belongs to another user")]
    NotOwner,
    #[error("leave request is already {}", .status.label())]
    InvalidTransition { status: LeaveStatus },
    #[error("leave request editing is disabled")]
    EditingDisabled,
    #[error("rejected requests cannot be edited")]
    RejectedImmutable,
    #[error("approved requests cannot be deleted")]
    ApprovedImmutable,
    #[error("staff member {} not found", .0 .0)]
    UnknownStaff(UserId),
    #[error("concurrent update lost, operation was retried and lost again")]
    StorageConflict,
    #[error(transparent)]
    Storage(RepositoryError),
}

impl From<RepositoryError> for LeaveServiceError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict => LeaveServiceError::StorageConflict,
            other => LeaveServiceError::Storage(other),
        }
    }
}

impl From<LedgerError> for LeaveServiceError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::StaffNotFound(user_id) => LeaveServiceError::UnknownStaff(user_id),
            LedgerError::Storage(err) => err.into(),
        }
    }
}

impl From<CalendarError> for LeaveServiceError {
    fn from(value: CalendarError) -> Self {
        match value {
            CalendarError::InvalidRange { start, end } => {
                LeaveServiceError::InvalidDateRange { start, end }
            }
        }
    }
}

static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> RequestId {
    RequestId(REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

/// Run `op`, retrying exactly once when it loses an optimistic-concurrency race.
/// Every other error surfaces immediately.
fn with_conflict_retry<T>(
    mut op: impl FnMut() -> Result<T, LeaveServiceError>,
) -> Result<T, LeaveServiceError> {
    match op() {
        Err(LeaveServiceError::StorageConflict) => op(),
        other => other,
    }
}

/// The request state machine, composing the calendar, ledger, repositories, and
/// notification dispatcher under one policy snapshot.
pub struct LeaveService<R, S, M> {
    requests: Arc<R>,
    staff: Arc<S>,
    ledger: BalanceLedger<S>,
    notifications: NotificationDispatcher<S, M>,
    policy: LeavePolicy,
}

impl<R, S, M> LeaveService<R, S, M>
where
    R: LeaveRepository + 'static,
    S: StaffRepository + 'static,
    M: Mailer + 'static,
{
    pub fn new(
        requests: Arc<R>,
        staff: Arc<S>,
        mailer: Arc<M>,
        policy: LeavePolicy,
        organization: Organization,
    ) -> Self {
        let ledger = BalanceLedger::new(staff.clone());
        let notifications = NotificationDispatcher::new(staff.clone(), mailer, organization);
        Self {
            requests,
            staff,
            ledger,
            notifications,
            policy,
        }
    }

    pub fn policy(&self) -> &LeavePolicy {
        &self.policy
    }

    /// Validate and store a new pending request. No balance is debited here;
    /// the debit happens at approval.
    pub fn submit(&self, submission: LeaveSubmission) -> Result<RequestId, LeaveServiceError> {
        with_conflict_retry(|| self.submit_once(&submission))
    }

    fn submit_once(&self, submission: &LeaveSubmission) -> Result<RequestId, LeaveServiceError> {
        let leave_type = LeaveType::parse(&submission.leave_type)
            .ok_or_else(|| LeaveServiceError::InvalidLeaveType(submission.leave_type.clone()))?;

        let (start, end) = (submission.start_date, submission.end_date);
        if start > end {
            return Err(LeaveServiceError::InvalidDateRange { start, end });
        }
        if start < today() {
            return Err(LeaveServiceError::PastDate(start));
        }

        let total_days = self.chargeable_days(start, end)?;

        let owner = self.load_staff(submission.user_id)?;
        let available = self.ledger.available(owner.id, leave_type)?;
        if total_days > available {
            return Err(LeaveServiceError::InsufficientBalance {
                requested: total_days,
                available,
            });
        }

        if self.requests.find_overlapping(owner.id, start, end, None)? {
            return Err(LeaveServiceError::OverlappingRequest);
        }

        let record = LeaveRequest {
            id: next_request_id(),
            user_id: owner.id,
            leave_type,
            start_date: start,
            end_date: end,
            total_days,
            reason: submission.reason.clone(),
            status: LeaveStatus::Pending,
            approver: None,
            decided_at: None,
            rejection_reason: None,
            is_edited: false,
            original_request_id: None,
            debited_days: 0,
            created_at: Utc::now(),
            version: 0,
        };

        let stored = self.requests.insert(record)?;

        if self.policy.notify_admin_on_request {
            self.notifications.request_submitted(&stored, &owner);
        }

        Ok(stored.id)
    }

    /// Move a request into `approved`, debiting the owner's balance. Re-approving
    /// an already-approved request is refused rather than double-debited.
    pub fn approve(&self, id: RequestId, approver: UserId) -> Result<(), LeaveServiceError> {
        with_conflict_retry(|| self.approve_once(id, approver))
    }

    fn approve_once(&self, id: RequestId, approver: UserId) -> Result<(), LeaveServiceError> {
        let request = self.load_request(id)?;
        if request.status == LeaveStatus::Approved {
            return Err(LeaveServiceError::InvalidTransition {
                status: request.status,
            });
        }

        let owner = self.load_staff(request.user_id)?;
        self.ledger
            .debit(owner.id, request.leave_type, request.total_days)?;

        let mut updated = request.clone();
        updated.status = LeaveStatus::Approved;
        updated.approver = Some(approver);
        updated.decided_at = Some(Utc::now());
        updated.rejection_reason = None;
        updated.debited_days = request.total_days;

        if let Err(err) = self.requests.update(updated.clone()) {
            // Lost the race after debiting; restore the balance before surfacing.
            self.restore(owner.id, request.leave_type, request.total_days);
            return Err(err.into());
        }

        if self.policy.notify_user_on_approval {
            let owner = self.refreshed(owner);
            let approved_by = self.staff.fetch_staff(approver).ok().flatten();
            self.notifications
                .request_approved(&updated, &owner, approved_by.as_ref());
        }

        Ok(())
    }

    /// Move a request into `rejected`. A previously approved request has its
    /// debit credited back first.
    pub fn reject(
        &self,
        id: RequestId,
        approver: UserId,
        rejection_reason: String,
    ) -> Result<(), LeaveServiceError> {
        with_conflict_retry(|| self.reject_once(id, approver, &rejection_reason))
    }

    fn reject_once(
        &self,
        id: RequestId,
        approver: UserId,
        rejection_reason: &str,
    ) -> Result<(), LeaveServiceError> {
        let request = self.load_request(id)?;
        let owner = self.load_staff(request.user_id)?;

        if request.debited_days > 0 {
            self.ledger
                .credit(owner.id, request.leave_type, request.debited_days)?;
        }

        let mut updated = request.clone();
        updated.status = LeaveStatus::Rejected;
        updated.approver = Some(approver);
        updated.decided_at = Some(Utc::now());
        updated.rejection_reason = Some(rejection_reason.to_string());
        updated.debited_days = 0;

        if let Err(err) = self.requests.update(updated.clone()) {
            if request.debited_days > 0 {
                self.recharge(owner.id, request.leave_type, request.debited_days);
            }
            return Err(err.into());
        }

        if self.policy.notify_user_on_rejection {
            let owner = self.refreshed(owner);
            let rejected_by = self.staff.fetch_staff(approver).ok().flatten();
            self.notifications.request_rejected(
                &updated,
                &owner,
                rejected_by.as_ref(),
                rejection_reason,
            );
        }

        Ok(())
    }

    /// Rework an existing request. Editing an approved request first reverses its
    /// debit; depending on policy the request either returns to `pending` for
    /// re-approval or keeps its approval and is immediately re-debited under the
    /// new day count.
    pub fn edit(
        &self,
        id: RequestId,
        owner_id: UserId,
        edit: LeaveEdit,
    ) -> Result<(), LeaveServiceError> {
        with_conflict_retry(|| self.edit_once(id, owner_id, &edit))
    }

    fn edit_once(
        &self,
        id: RequestId,
        owner_id: UserId,
        edit: &LeaveEdit,
    ) -> Result<(), LeaveServiceError> {
        let request = self.load_request(id)?;
        if request.user_id != owner_id {
            return Err(LeaveServiceError::NotOwner);
        }
        if !self.policy.allow_leave_editing {
            return Err(LeaveServiceError::EditingDisabled);
        }
        if request.status == LeaveStatus::Rejected && !self.policy.allow_edit_rejected {
            return Err(LeaveServiceError::RejectedImmutable);
        }

        let leave_type = LeaveType::parse(&edit.leave_type)
            .ok_or_else(|| LeaveServiceError::InvalidLeaveType(edit.leave_type.clone()))?;
        let (start, end) = (edit.start_date, edit.end_date);
        if start > end {
            return Err(LeaveServiceError::InvalidDateRange { start, end });
        }
        let total_days = self.chargeable_days(start, end)?;

        if self
            .requests
            .find_overlapping(owner_id, start, end, Some(id))?
        {
            return Err(LeaveServiceError::OverlappingRequest);
        }

        let owner = self.load_staff(owner_id)?;
        let was_approved = request.status == LeaveStatus::Approved;

        // Reverse the old debit before recomputing anything against the ledger.
        if was_approved && request.debited_days > 0 {
            self.ledger
                .credit(owner.id, request.leave_type, request.debited_days)?;
        }

        let mut updated = request.clone();
        updated.leave_type = leave_type;
        updated.start_date = start;
        updated.end_date = end;
        updated.reason = edit.reason.clone();
        updated.total_days = total_days;
        updated.debited_days = 0;

        if was_approved {
            if self.policy.require_reapproval_on_edit {
                updated.status = LeaveStatus::Pending;
                updated.is_edited = true;
                updated.approver = None;
                updated.decided_at = None;
            } else {
                // Request stays approved; charge the new figure right away so
                // the ledger matches what the calendar now says.
                if let Err(err) = self.ledger.debit(owner.id, leave_type, total_days) {
                    self.recharge(owner.id, request.leave_type, request.debited_days);
                    return Err(err.into());
                }
                updated.debited_days = total_days;
            }
        }

        if let Err(err) = self.requests.update(updated) {
            if was_approved {
                if !self.policy.require_reapproval_on_edit {
                    self.restore(owner.id, leave_type, total_days);
                }
                self.recharge(owner.id, request.leave_type, request.debited_days);
            }
            return Err(err.into());
        }

        Ok(())
    }

    /// Remove a request permanently, reversing its debit when it was approved.
    pub fn delete(&self, id: RequestId, owner_id: UserId) -> Result<(), LeaveServiceError> {
        with_conflict_retry(|| self.delete_once(id, owner_id))
    }

    fn delete_once(&self, id: RequestId, owner_id: UserId) -> Result<(), LeaveServiceError> {
        let request = self.load_request(id)?;
        if request.user_id != owner_id {
            return Err(LeaveServiceError::NotOwner);
        }
        if request.status == LeaveStatus::Approved && !self.policy.allow_delete_approved {
            return Err(LeaveServiceError::ApprovedImmutable);
        }

        if request.debited_days > 0 {
            self.ledger
                .credit(request.user_id, request.leave_type, request.debited_days)?;
        }

        if let Err(err) = self.requests.delete(id) {
            if request.debited_days > 0 {
                self.recharge(request.user_id, request.leave_type, request.debited_days);
            }
            return Err(err.into());
        }

        Ok(())
    }

    /// Read-only balance snapshot `{type: {total, used, remaining}}`.
    pub fn balance(&self, user_id: UserId) -> Result<BalanceSummary, LeaveServiceError> {
        Ok(self.ledger.snapshot(user_id)?)
    }

    /// Fetch one request joined with its owner's display fields.
    pub fn request(&self, id: RequestId) -> Result<LeaveRequestView, LeaveServiceError> {
        let request = self.load_request(id)?;
        let owner = self.load_staff(request.user_id)?;
        Ok(join_view(request, &owner))
    }

    /// Filterable request listing with joined user display fields.
    pub fn list(&self, filter: &RequestFilter) -> Result<Vec<LeaveRequestView>, LeaveServiceError> {
        let records = self.requests.list(filter)?;
        let mut owners: HashMap<UserId, StaffMember> = HashMap::new();

        let mut views = Vec::with_capacity(records.len());
        for record in records {
            if !owners.contains_key(&record.user_id) {
                let owner = self.load_staff(record.user_id)?;
                owners.insert(record.user_id, owner);
            }
            let owner = &owners[&record.user_id];
            views.push(join_view(record, owner));
        }

        Ok(views)
    }

    /// Day-count preview for a prospective range under the active weekend policy.
    pub fn day_count(&self, start: NaiveDate, end: NaiveDate) -> Result<u32, LeaveServiceError> {
        Ok(count_chargeable_days(
            start,
            end,
            self.policy.weekend_counts_as_leave,
        )?)
    }

    fn chargeable_days(&self, start: NaiveDate, end: NaiveDate) -> Result<u32, LeaveServiceError> {
        let days = count_chargeable_days(start, end, self.policy.weekend_counts_as_leave)?;
        if days == 0 {
            // A weekend-only range charges nothing; storing it would violate the
            // total_days > 0 invariant.
            return Err(LeaveServiceError::InvalidDateRange { start, end });
        }
        Ok(days)
    }

    fn load_request(&self, id: RequestId) -> Result<LeaveRequest, LeaveServiceError> {
        self.requests
            .fetch(id)?
            .ok_or(LeaveServiceError::NotFound(id))
    }

    fn load_staff(&self, id: UserId) -> Result<StaffMember, LeaveServiceError> {
        self.staff
            .fetch_staff(id)?
            .ok_or(LeaveServiceError::UnknownStaff(id))
    }

    fn refreshed(&self, fallback: StaffMember) -> StaffMember {
        self.staff
            .fetch_staff(fallback.id)
            .ok()
            .flatten()
            .unwrap_or(fallback)
    }

    /// Compensating credit after a lost race; retried once, then logged.
    fn restore(&self, user_id: UserId, leave_type: LeaveType, days: u32) {
        let attempt = self.ledger.credit(user_id, leave_type, days);
        let attempt = match attempt {
            Err(LedgerError::Storage(RepositoryError::Conflict)) => {
                self.ledger.credit(user_id, leave_type, days)
            }
            other => other,
        };
        if let Err(err) = attempt {
            error!(user = user_id.0, days, error = %err, "failed to restore leave balance");
        }
    }

    /// Compensating debit after a lost race; retried once, then logged.
    fn recharge(&self, user_id: UserId, leave_type: LeaveType, days: u32) {
        if days == 0 {
            return;
        }
        let attempt = self.ledger.debit(user_id, leave_type, days);
        let attempt = match attempt {
            Err(LedgerError::Storage(RepositoryError::Conflict)) => {
                self.ledger.debit(user_id, leave_type, days)
            }
            other => other,
        };
        if let Err(err) = attempt {
            error!(user = user_id.0, days, error = %err, "failed to re-charge leave balance");
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn join_view(request: LeaveRequest, owner: &StaffMember) -> LeaveRequestView {
    LeaveRequestView {
        request,
        first_name: owner.first_name.clone(),
        last_name: owner.last_name.clone(),
        email: owner.email.clone(),
        department: owner.department.clone(),
    }
}
