use std::sync::Arc;

use super::domain::{BalanceSnapshot, BalanceSummary, LeaveType, StaffMember, UserId};
use super::repository::{RepositoryError, StaffRepository};

/// Errors raised by balance mutations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("staff member {0:?} not found")]
    StaffNotFound(UserId),
    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

/// Per-user, per-type allocation and usage accounting.
///
/// The ledger never enforces `used <= allocation`; that pre-check belongs to the
/// state machine at submit time. Credits clamp at zero so restoring a request
/// that was never debited is a no-op rather than a negative balance.
pub struct BalanceLedger<S> {
    staff: Arc<S>,
}

impl<S> BalanceLedger<S>
where
    S: StaffRepository,
{
    pub fn new(staff: Arc<S>) -> Self {
        Self { staff }
    }

    fn load(&self, user_id: UserId) -> Result<StaffMember, LedgerError> {
        self.staff
            .fetch_staff(user_id)?
            .ok_or(LedgerError::StaffNotFound(user_id))
    }

    /// Days still available for `leave_type`, floor-clamped at zero.
    pub fn available(&self, user_id: UserId, leave_type: LeaveType) -> Result<u32, LedgerError> {
        let staff = self.load(user_id)?;
        Ok(available_of(&staff, leave_type))
    }

    /// Read-only `{total, used, remaining}` figures across all four types.
    pub fn snapshot(&self, user_id: UserId) -> Result<BalanceSummary, LedgerError> {
        let staff = self.load(user_id)?;
        let snap = |leave_type| BalanceSnapshot {
            total: staff.allocations.get(leave_type),
            used: staff.used.get(leave_type),
            remaining: available_of(&staff, leave_type),
        };

        Ok(BalanceSummary {
            annual: snap(LeaveType::Annual),
            sick: snap(LeaveType::Sick),
            personal: snap(LeaveType::Personal),
            emergency: snap(LeaveType::Emergency),
        })
    }

    /// Charge `days` against the user's usage counter for `leave_type`.
    pub fn debit(&self, user_id: UserId, leave_type: LeaveType, days: u32) -> Result<(), LedgerError> {
        self.mutate(user_id, |used| used.saturating_add(days), leave_type)
    }

    /// Restore `days` to the user's usage counter, clamped at zero.
    pub fn credit(&self, user_id: UserId, leave_type: LeaveType, days: u32) -> Result<(), LedgerError> {
        self.mutate(user_id, |used| used.saturating_sub(days), leave_type)
    }

    fn mutate(
        &self,
        user_id: UserId,
        apply: impl FnOnce(u32) -> u32,
        leave_type: LeaveType,
    ) -> Result<(), LedgerError> {
        let mut staff = self.load(user_id)?;
        let counter = staff.used.get_mut(leave_type);
        *counter = apply(*counter);
        self.staff.update_staff(staff)?;
        Ok(())
    }
}

fn available_of(staff: &StaffMember, leave_type: LeaveType) -> u32 {
    staff
        .allocations
        .get(leave_type)
        .saturating_sub(staff.used.get(leave_type))
}
