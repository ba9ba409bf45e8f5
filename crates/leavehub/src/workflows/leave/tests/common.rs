use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use crate::workflows::leave::domain::{
    LeaveDays, LeaveRequest, RequestId, StaffMember, StaffRole, UserId,
};
use crate::workflows::leave::notification::{
    EmailRecipient, Mailer, MailerError, Organization, TemplateId,
};
use crate::workflows::leave::policy::LeavePolicy;
use crate::workflows::leave::repository::{
    LeaveRepository, RepositoryError, RequestFilter, StaffRepository,
};
use crate::workflows::leave::service::{LeaveService, LeaveSubmission};

pub(super) const STAFF_ID: UserId = UserId(1);
pub(super) const HR_ID: UserId = UserId(2);

/// A Monday comfortably in the future so submit-time past-date checks never trip.
pub(super) fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 1, 7).expect("valid date")
}

pub(super) fn friday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 1, 11).expect("valid date")
}

pub(super) fn staff_member() -> StaffMember {
    StaffMember {
        id: STAFF_ID,
        username: "jdoe".to_string(),
        first_name: "Jordan".to_string(),
        last_name: "Doe".to_string(),
        email: "jordan.doe@example.test".to_string(),
        department: "Engineering".to_string(),
        role: StaffRole::Staff,
        allocations: LeaveDays {
            annual: 20,
            sick: 10,
            personal: 5,
            emergency: 3,
        },
        used: LeaveDays::default(),
        version: 0,
    }
}

pub(super) fn hr_member() -> StaffMember {
    StaffMember {
        id: HR_ID,
        username: "asmith".to_string(),
        first_name: "Alex".to_string(),
        last_name: "Smith".to_string(),
        email: "alex.smith@example.test".to_string(),
        department: "People Ops".to_string(),
        role: StaffRole::Hr,
        allocations: LeaveDays {
            annual: 20,
            sick: 10,
            personal: 5,
            emergency: 3,
        },
        used: LeaveDays::default(),
        version: 0,
    }
}

pub(super) fn submission() -> LeaveSubmission {
    LeaveSubmission {
        user_id: STAFF_ID,
        leave_type: "annual".to_string(),
        start_date: monday(),
        end_date: friday(),
        reason: "Family trip".to_string(),
    }
}

pub(super) fn organization() -> Organization {
    Organization {
        name: "Example Org".to_string(),
        email: "hr@example.test".to_string(),
        ..Organization::default()
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryLeaveRepository {
    records: Arc<Mutex<HashMap<RequestId, LeaveRequest>>>,
}

impl MemoryLeaveRepository {
    pub(super) fn get(&self, id: RequestId) -> Option<LeaveRequest> {
        self.records.lock().expect("repository mutex poisoned").get(&id).cloned()
    }
}

impl LeaveRepository for MemoryLeaveRepository {
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
pub(super) struct MemoryStaffRepository {
    records: Arc<Mutex<HashMap<UserId, StaffMember>>>,
}

impl MemoryStaffRepository {
    pub(super) fn seed(&self, staff: StaffMember) {
        self.records
            .lock()
            .expect("staff mutex poisoned")
            .insert(staff.id, staff);
    }

    pub(super) fn get(&self, id: UserId) -> Option<StaffMember> {
        self.records.lock().expect("staff mutex poisoned").get(&id).cloned()
    }
}

impl StaffRepository for MemoryStaffRepository {
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

pub(super) type SentEmail = (TemplateId, EmailRecipient, BTreeMap<String, String>);

#[derive(Default, Clone)]
pub(super) struct MemoryMailer {
    sent: Arc<Mutex<Vec<SentEmail>>>,
}

impl MemoryMailer {
    pub(super) fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }
}

impl Mailer for MemoryMailer {
    fn send(
        &self,
        template: TemplateId,
        recipient: &EmailRecipient,
        variables: &BTreeMap<String, String>,
    ) -> Result<(), MailerError> {
        self.sent
            .lock()
            .expect("mailer mutex poisoned")
            .push((template, recipient.clone(), variables.clone()));
        Ok(())
    }
}

/// Mailer double whose transport always fails; notification is best-effort so
/// the state machine must shrug this off.
pub(super) struct FailingMailer;

impl Mailer for FailingMailer {
    fn send(
        &self,
        _template: TemplateId,
        _recipient: &EmailRecipient,
        _variables: &BTreeMap<String, String>,
    ) -> Result<(), MailerError> {
        Err(MailerError::Transport("smtp offline".to_string()))
    }
}

/// Wraps the in-memory request store and makes the next `failures` calls to
/// `update` lose the optimistic-concurrency race without writing anything.
#[derive(Default)]
pub(super) struct ConflictingLeaveRepository {
    inner: MemoryLeaveRepository,
    failures: std::sync::atomic::AtomicU32,
}

impl ConflictingLeaveRepository {
    /// Arm the double so the next `failures` updates are lost races.
    pub(super) fn fail_next(&self, failures: u32) {
        self.failures
            .store(failures, std::sync::atomic::Ordering::SeqCst);
    }

    pub(super) fn get(&self, id: RequestId) -> Option<LeaveRequest> {
        self.inner.get(id)
    }
}

impl LeaveRepository for ConflictingLeaveRepository {
    fn insert(&self, record: LeaveRequest) -> Result<LeaveRequest, RepositoryError> {
        self.inner.insert(record)
    }

    fn fetch(&self, id: RequestId) -> Result<Option<LeaveRequest>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn update(&self, record: LeaveRequest) -> Result<(), RepositoryError> {
        use std::sync::atomic::Ordering;
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(RepositoryError::Conflict);
        }
        self.inner.update(record)
    }

    fn delete(&self, id: RequestId) -> Result<(), RepositoryError> {
        self.inner.delete(id)
    }

    fn find_overlapping(
        &self,
        user_id: UserId,
        start: NaiveDate,
        end: NaiveDate,
        exclude: Option<RequestId>,
    ) -> Result<bool, RepositoryError> {
        self.inner.find_overlapping(user_id, start, end, exclude)
    }

    fn list(&self, filter: &RequestFilter) -> Result<Vec<LeaveRequest>, RepositoryError> {
        self.inner.list(filter)
    }
}

/// Repository double whose storage is always offline.
pub(super) struct UnavailableLeaveRepository;

impl LeaveRepository for UnavailableLeaveRepository {
    fn insert(&self, _record: LeaveRequest) -> Result<LeaveRequest, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: RequestId) -> Result<Option<LeaveRequest>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _record: LeaveRequest) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete(&self, _id: RequestId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_overlapping(
        &self,
        _user_id: UserId,
        _start: NaiveDate,
        _end: NaiveDate,
        _exclude: Option<RequestId>,
    ) -> Result<bool, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self, _filter: &RequestFilter) -> Result<Vec<LeaveRequest>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) type TestService = LeaveService<MemoryLeaveRepository, MemoryStaffRepository, MemoryMailer>;

pub(super) fn build_service(
    policy: LeavePolicy,
) -> (
    TestService,
    Arc<MemoryLeaveRepository>,
    Arc<MemoryStaffRepository>,
    Arc<MemoryMailer>,
) {
    let requests = Arc::new(MemoryLeaveRepository::default());
    let staff = Arc::new(MemoryStaffRepository::default());
    staff.seed(staff_member());
    staff.seed(hr_member());
    let mailer = Arc::new(MemoryMailer::default());
    let service = LeaveService::new(
        requests.clone(),
        staff.clone(),
        mailer.clone(),
        policy,
        organization(),
    );
    (service, requests, staff, mailer)
}

pub(super) fn leave_router_with_service(service: TestService) -> axum::Router {
    crate::workflows::leave::router::leave_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
