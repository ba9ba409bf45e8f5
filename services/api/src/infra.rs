use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

use leavehub::workflows::leave::{
    EmailRecipient, LeaveDays, LeaveRepository, LeaveRequest, Mailer, MailerError, PolicySource,
    RepositoryError, RequestFilter, RequestId, StaffMember, StaffRepository, StaffRole, TemplateId,
    UserId,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Request store for single-node deployments and demos. The version check on
/// update mirrors what a database-backed implementation enforces with
/// optimistic locking.
#[derive(Default, Clone)]
pub(crate) struct InMemoryLeaveRepository {
    records: Arc<Mutex<HashMap<RequestId, LeaveRequest>>>,
}

impl LeaveRepository for InMemoryLeaveRepository {
    fn insert(&self, record: LeaveRequest) -> Result<LeaveRequest, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id, record.clone());
        Ok(record)
    }

    fn fetch(&self, id: RequestId) -> Result<Option<LeaveRequest>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(&id).cloned())
    }

    fn update(&self, mut record: LeaveRequest) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let stored = guard.get(&record.id).ok_or(RepositoryError::NotFound)?;
        if stored.version != record.version {
            return Err(RepositoryError::Conflict);
        }
        record.version += 1;
        guard.insert(record.id, record);
        Ok(())
    }

    fn delete(&self, id: RequestId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.remove(&id).ok_or(RepositoryError::NotFound)?;
        Ok(())
    }

    fn find_overlapping(
        &self,
        user_id: UserId,
        start: NaiveDate,
        end: NaiveDate,
        exclude: Option<RequestId>,
    ) -> Result<bool, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.values().any(|record| {
            record.user_id == user_id
                && Some(record.id) != exclude
                && record.blocks_overlap()
                && record.overlaps(start, end)
        }))
    }

    fn list(&self, filter: &RequestFilter) -> Result<Vec<LeaveRequest>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut records: Vec<LeaveRequest> = guard
            .values()
            .filter(|record| {
                filter.user_id.map_or(true, |user| record.user_id == user)
                    && filter.status.map_or(true, |status| record.status == status)
                    && filter
                        .leave_type
                        .map_or(true, |leave_type| record.leave_type == leave_type)
                    && filter.from.map_or(true, |from| record.start_date >= from)
                    && filter.to.map_or(true, |to| record.end_date <= to)
            })
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryStaffRepository {
    records: Arc<Mutex<HashMap<UserId, StaffMember>>>,
}

impl InMemoryStaffRepository {
    pub(crate) fn seed(&self, staff: StaffMember) {
        self.records
            .lock()
            .expect("staff mutex poisoned")
            .insert(staff.id, staff);
    }
}

impl StaffRepository for InMemoryStaffRepository {
    fn fetch_staff(&self, id: UserId) -> Result<Option<StaffMember>, RepositoryError> {
        let guard = self.records.lock().expect("staff mutex poisoned");
        Ok(guard.get(&id).cloned())
    }

    fn update_staff(&self, mut staff: StaffMember) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("staff mutex poisoned");
        let stored = guard.get(&staff.id).ok_or(RepositoryError::NotFound)?;
        if stored.version != staff.version {
            return Err(RepositoryError::Conflict);
        }
        staff.version += 1;
        guard.insert(staff.id, staff);
        Ok(())
    }

    fn reviewers(&self) -> Result<Vec<StaffMember>, RepositoryError> {
        let guard = self.records.lock().expect("staff mutex poisoned");
        let mut reviewers: Vec<StaffMember> = guard
            .values()
            .filter(|staff| staff.role.reviews_requests())
            .cloned()
            .collect();
        reviewers.sort_by_key(|staff| staff.id);
        Ok(reviewers)
    }
}

/// Mailer stand-in that records deliveries in the service log instead of
/// talking to an SMTP relay.
#[derive(Default, Clone)]
pub(crate) struct LoggingMailer;

impl Mailer for LoggingMailer {
    fn send(
        &self,
        template: TemplateId,
        recipient: &EmailRecipient,
        variables: &BTreeMap<String, String>,
    ) -> Result<(), MailerError> {
        info!(
            template = template.as_str(),
            recipient = %recipient.email,
            variables = variables.len(),
            "email dispatched"
        );
        Ok(())
    }
}

/// Policy source backed by process environment variables: the option name is
/// uppercased and prefixed with `LEAVE_`, so `weekend_counts_as_leave` resolves
/// from `LEAVE_WEEKEND_COUNTS_AS_LEAVE`.
pub(crate) struct EnvPolicySource;

impl EnvPolicySource {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var(format!("LEAVE_{}", name.to_uppercase())).ok()
    }
}

impl PolicySource for EnvPolicySource {
    fn get_bool(&self, name: &str) -> Option<bool> {
        match self.lookup(name)?.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        }
    }

    fn get_int(&self, name: &str) -> Option<u32> {
        self.lookup(name)?.trim().parse().ok()
    }
}

/// Starter roster so the service answers requests out of the box. A database
/// deployment replaces this with its staff table.
pub(crate) fn seed_demo_staff(staff: &InMemoryStaffRepository, allocations: LeaveDays) {
    let members = [
        (
            1,
            "jdoe",
            "Jordan",
            "Doe",
            "jordan.doe@example.com",
            "Engineering",
            StaffRole::Staff,
        ),
        (
            2,
            "mokafor",
            "Maya",
            "Okafor",
            "maya.okafor@example.com",
            "Finance",
            StaffRole::Staff,
        ),
        (
            3,
            "asmith",
            "Alex",
            "Smith",
            "alex.smith@example.com",
            "People Ops",
            StaffRole::Hr,
        ),
        (
            4,
            "rvance",
            "Riley",
            "Vance",
            "riley.vance@example.com",
            "Operations",
            StaffRole::Admin,
        ),
    ];

    for (id, username, first_name, last_name, email, department, role) in members {
        staff.seed(StaffMember {
            id: UserId(id),
            username: username.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            department: department.to_string(),
            role,
            allocations,
            used: LeaveDays::default(),
            version: 0,
        });
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
