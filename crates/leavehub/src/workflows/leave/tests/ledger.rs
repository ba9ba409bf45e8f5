use std::sync::Arc;

use super::common::{staff_member, MemoryStaffRepository, STAFF_ID};
use crate::workflows::leave::domain::LeaveType;
use crate::workflows::leave::ledger::{BalanceLedger, LedgerError};

fn ledger() -> (BalanceLedger<MemoryStaffRepository>, Arc<MemoryStaffRepository>) {
    let staff = Arc::new(MemoryStaffRepository::default());
    staff.seed(staff_member());
    (BalanceLedger::new(staff.clone()), staff)
}

#[test]
fn available_reflects_allocation_minus_used() {
    let (ledger, _) = ledger();
    assert_eq!(ledger.available(STAFF_ID, LeaveType::Annual).unwrap(), 20);
    ledger.debit(STAFF_ID, LeaveType::Annual, 8).unwrap();
    assert_eq!(ledger.available(STAFF_ID, LeaveType::Annual).unwrap(), 12);
}

#[test]
fn available_is_idempotent_without_mutation() {
    let (ledger, _) = ledger();
    ledger.debit(STAFF_ID, LeaveType::Sick, 3).unwrap();
    let first = ledger.available(STAFF_ID, LeaveType::Sick).unwrap();
    let second = ledger.available(STAFF_ID, LeaveType::Sick).unwrap();
    assert_eq!(first, second);
}

#[test]
fn credit_reverses_debit_exactly() {
    let (ledger, staff) = ledger();
    ledger.debit(STAFF_ID, LeaveType::Personal, 4).unwrap();
    ledger.credit(STAFF_ID, LeaveType::Personal, 4).unwrap();
    assert_eq!(staff.get(STAFF_ID).unwrap().used.personal, 0);
}

#[test]
fn credit_clamps_at_zero() {
    let (ledger, staff) = ledger();
    ledger.debit(STAFF_ID, LeaveType::Emergency, 2).unwrap();
    // Crediting more than was debited floors at zero rather than going negative.
    ledger.credit(STAFF_ID, LeaveType::Emergency, 10).unwrap();
    assert_eq!(staff.get(STAFF_ID).unwrap().used.emergency, 0);
}

#[test]
fn debit_does_not_enforce_allocation_cap() {
    // The submit-time pre-check is the caller's job; the ledger itself records
    // whatever it is told, which edits to approved requests rely on.
    let (ledger, staff) = ledger();
    ledger.debit(STAFF_ID, LeaveType::Emergency, 50).unwrap();
    assert_eq!(staff.get(STAFF_ID).unwrap().used.emergency, 50);
    assert_eq!(ledger.available(STAFF_ID, LeaveType::Emergency).unwrap(), 0);
}

#[test]
fn snapshot_reports_all_four_buckets() {
    let (ledger, _) = ledger();
    ledger.debit(STAFF_ID, LeaveType::Annual, 5).unwrap();
    let summary = ledger.snapshot(STAFF_ID).unwrap();

    assert_eq!(summary.annual.total, 20);
    assert_eq!(summary.annual.used, 5);
    assert_eq!(summary.annual.remaining, 15);
    assert_eq!(summary.sick.remaining, 10);
    assert_eq!(summary.personal.remaining, 5);
    assert_eq!(summary.emergency.remaining, 3);
}

#[test]
fn unknown_staff_is_reported() {
    let (ledger, _) = ledger();
    let result = ledger.available(crate::workflows::leave::domain::UserId(99), LeaveType::Annual);
    assert!(matches!(result, Err(LedgerError::StaffNotFound(_))));
}
