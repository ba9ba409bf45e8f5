use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for staff members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub u64);

/// Identifier wrapper for leave requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub u64);

/// The four independent balance buckets every staff member carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaveType {
    Annual,
    Sick,
    Personal,
    Emergency,
}

impl LeaveType {
    pub const ALL: [LeaveType; 4] = [
        LeaveType::Annual,
        LeaveType::Sick,
        LeaveType::Personal,
        LeaveType::Emergency,
    ];

    /// Parse the wire form used by submissions; `None` for anything outside the enumeration.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "annual" => Some(LeaveType::Annual),
            "sick" => Some(LeaveType::Sick),
            "personal" => Some(LeaveType::Personal),
            "emergency" => Some(LeaveType::Emergency),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            LeaveType::Annual => "annual",
            LeaveType::Sick => "sick",
            LeaveType::Personal => "personal",
            LeaveType::Emergency => "emergency",
        }
    }

    /// Human-readable name used in notification variables.
    pub const fn display_name(self) -> &'static str {
        match self {
            LeaveType::Annual => "Annual Leave",
            LeaveType::Sick => "Sick Leave",
            LeaveType::Personal => "Personal Leave",
            LeaveType::Emergency => "Emergency Leave",
        }
    }
}

/// Lifecycle states of a leave request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LeaveStatus::Pending => "pending",
            LeaveStatus::Approved => "approved",
            LeaveStatus::Rejected => "rejected",
        }
    }
}

/// Per-type day counters; one instance models allocations, another models usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveDays {
    pub annual: u32,
    pub sick: u32,
    pub personal: u32,
    pub emergency: u32,
}

impl LeaveDays {
    pub const fn get(&self, leave_type: LeaveType) -> u32 {
        match leave_type {
            LeaveType::Annual => self.annual,
            LeaveType::Sick => self.sick,
            LeaveType::Personal => self.personal,
            LeaveType::Emergency => self.emergency,
        }
    }

    pub fn get_mut(&mut self, leave_type: LeaveType) -> &mut u32 {
        match leave_type {
            LeaveType::Annual => &mut self.annual,
            LeaveType::Sick => &mut self.sick,
            LeaveType::Personal => &mut self.personal,
            LeaveType::Emergency => &mut self.emergency,
        }
    }
}

/// Access levels mirrored from the staff directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Staff,
    Hr,
    Admin,
}

impl StaffRole {
    /// Whether this role receives new-request notifications.
    pub const fn reviews_requests(self) -> bool {
        matches!(self, StaffRole::Hr | StaffRole::Admin)
    }
}

/// Staff record restricted to the fields the balance ledger and notifications need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub department: String,
    pub role: StaffRole,
    pub allocations: LeaveDays,
    pub used: LeaveDays,
    /// Optimistic-concurrency counter bumped by the staff repository on every write.
    pub version: u64,
}

impl StaffMember {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Stored leave request. `total_days` is a snapshot taken at submit/edit time and is
/// never recomputed implicitly, so historical accounting stays stable when the
/// weekend policy changes. `debited_days` tracks what is currently charged against
/// the ledger for this request, which keeps credit and debit exactly paired across
/// edit histories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveRequest {
    pub id: RequestId,
    pub user_id: UserId,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_days: u32,
    pub reason: String,
    pub status: LeaveStatus,
    pub approver: Option<UserId>,
    pub decided_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub is_edited: bool,
    pub original_request_id: Option<RequestId>,
    pub debited_days: u32,
    pub created_at: DateTime<Utc>,
    /// Optimistic-concurrency counter bumped by the leave repository on every write.
    pub version: u64,
}

impl LeaveRequest {
    /// Whether this request should block an overlapping submission.
    pub fn blocks_overlap(&self) -> bool {
        self.status != LeaveStatus::Rejected
    }

    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && start <= self.end_date
    }
}

/// Read-only balance figures for one leave type; `remaining` is floor-clamped at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub total: u32,
    pub used: u32,
    pub remaining: u32,
}

/// Balance snapshot across all four leave types, keyed the way the frontend expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSummary {
    pub annual: BalanceSnapshot,
    pub sick: BalanceSnapshot,
    pub personal: BalanceSnapshot,
    pub emergency: BalanceSnapshot,
}

impl BalanceSummary {
    pub const fn get(&self, leave_type: LeaveType) -> BalanceSnapshot {
        match leave_type {
            LeaveType::Annual => self.annual,
            LeaveType::Sick => self.sick,
            LeaveType::Personal => self.personal,
            LeaveType::Emergency => self.emergency,
        }
    }
}

/// Leave request joined with its owner's display fields for list output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveRequestView {
    #[serde(flatten)]
    pub request: LeaveRequest,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub department: String,
}
