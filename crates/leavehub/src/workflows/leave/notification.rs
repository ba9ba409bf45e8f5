use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{LeaveRequest, StaffMember};
use super::repository::StaffRepository;

/// Email templates the workflow can fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateId {
    Welcome,
    LeaveRequestNotification,
    LeaveApproved,
    LeaveRejected,
    PasswordReset,
}

impl TemplateId {
    pub const fn as_str(self) -> &'static str {
        match self {
            TemplateId::Welcome => "welcome",
            TemplateId::LeaveRequestNotification => "leave_request_notification",
            TemplateId::LeaveApproved => "leave_approved",
            TemplateId::LeaveRejected => "leave_rejected",
            TemplateId::PasswordReset => "password_reset",
        }
    }
}

/// Addressee for one outbound email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRecipient {
    pub email: String,
    pub name: String,
}

/// Email dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("mail transport unavailable: {0}")]
    Transport(String),
}

/// Outbound email collaborator; rendering and SMTP mechanics live behind it.
pub trait Mailer: Send + Sync {
    fn send(
        &self,
        template: TemplateId,
        recipient: &EmailRecipient,
        variables: &BTreeMap<String, String>,
    ) -> Result<(), MailerError>;
}

/// Organization fields substituted into every template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub website: String,
    pub login_url: String,
}

impl Default for Organization {
    fn default() -> Self {
        Self {
            name: "Leave Management".to_string(),
            email: String::new(),
            phone: String::new(),
            address: String::new(),
            website: String::new(),
            login_url: String::new(),
        }
    }
}

/// Decides which template fires for which transition and assembles the variable
/// context. Sending is best-effort: failures are logged and never surfaced to
/// the state machine.
pub struct NotificationDispatcher<S, M> {
    staff: Arc<S>,
    mailer: Arc<M>,
    organization: Organization,
}

impl<S, M> NotificationDispatcher<S, M>
where
    S: StaffRepository,
    M: Mailer,
{
    pub fn new(staff: Arc<S>, mailer: Arc<M>, organization: Organization) -> Self {
        Self {
            staff,
            mailer,
            organization,
        }
    }

    /// Fan a new-request notification out to every reviewer, falling back to the
    /// organization address when no reviewers exist.
    pub fn request_submitted(&self, request: &LeaveRequest, owner: &StaffMember) {
        let mut variables = self.base_variables(owner, request);
        variables.insert("{{status}}".to_string(), "Pending".to_string());

        let recipients = match self.staff.reviewers() {
            Ok(reviewers) if !reviewers.is_empty() => reviewers
                .iter()
                .map(|reviewer| EmailRecipient {
                    email: reviewer.email.clone(),
                    name: reviewer.full_name(),
                })
                .collect(),
            Ok(_) if !self.organization.email.is_empty() => vec![EmailRecipient {
                email: self.organization.email.clone(),
                name: "HR Administrator".to_string(),
            }],
            Ok(_) => Vec::new(),
            Err(err) => {
                warn!(error = %err, "unable to resolve reviewers for request notification");
                Vec::new()
            }
        };

        for recipient in &recipients {
            self.deliver(TemplateId::LeaveRequestNotification, recipient, &variables);
        }
    }

    pub fn request_approved(
        &self,
        request: &LeaveRequest,
        owner: &StaffMember,
        approver: Option<&StaffMember>,
    ) {
        let mut variables = self.base_variables(owner, request);
        variables.insert(
            "{{approved_by}}".to_string(),
            approver
                .map(StaffMember::full_name)
                .unwrap_or_else(|| "HR Administrator".to_string()),
        );
        variables.insert(
            "{{approved_date}}".to_string(),
            Utc::now().format("%Y-%m-%d").to_string(),
        );

        self.deliver(TemplateId::LeaveApproved, &owner_recipient(owner), &variables);
    }

    pub fn request_rejected(
        &self,
        request: &LeaveRequest,
        owner: &StaffMember,
        approver: Option<&StaffMember>,
        rejection_reason: &str,
    ) {
        let mut variables = self.base_variables(owner, request);
        variables.insert(
            "{{rejected_by}}".to_string(),
            approver
                .map(StaffMember::full_name)
                .unwrap_or_else(|| "HR Administrator".to_string()),
        );
        variables.insert(
            "{{rejected_date}}".to_string(),
            Utc::now().format("%Y-%m-%d").to_string(),
        );
        variables.insert(
            "{{rejection_reason}}".to_string(),
            rejection_reason.to_string(),
        );

        self.deliver(TemplateId::LeaveRejected, &owner_recipient(owner), &variables);
    }

    fn deliver(
        &self,
        template: TemplateId,
        recipient: &EmailRecipient,
        variables: &BTreeMap<String, String>,
    ) {
        if let Err(err) = self.mailer.send(template, recipient, variables) {
            warn!(
                template = template.as_str(),
                recipient = %recipient.email,
                error = %err,
                "notification dispatch failed"
            );
        }
    }

    fn base_variables(
        &self,
        owner: &StaffMember,
        request: &LeaveRequest,
    ) -> BTreeMap<String, String> {
        let mut variables = user_variables(owner);
        variables.extend(request_variables(request));
        variables.extend(self.system_variables());
        variables
    }

    fn system_variables(&self) -> BTreeMap<String, String> {
        let now = Utc::now();
        BTreeMap::from([
            (
                "{{organization_name}}".to_string(),
                self.organization.name.clone(),
            ),
            (
                "{{organization_email}}".to_string(),
                self.organization.email.clone(),
            ),
            (
                "{{organization_phone}}".to_string(),
                self.organization.phone.clone(),
            ),
            (
                "{{organization_address}}".to_string(),
                self.organization.address.clone(),
            ),
            (
                "{{organization_website}}".to_string(),
                self.organization.website.clone(),
            ),
            (
                "{{login_url}}".to_string(),
                self.organization.login_url.clone(),
            ),
            (
                "{{current_date}}".to_string(),
                now.format("%Y-%m-%d").to_string(),
            ),
            (
                "{{current_time}}".to_string(),
                now.format("%H:%M:%S").to_string(),
            ),
            (
                "{{current_datetime}}".to_string(),
                now.format("%Y-%m-%d %H:%M:%S").to_string(),
            ),
        ])
    }
}

fn owner_recipient(owner: &StaffMember) -> EmailRecipient {
    EmailRecipient {
        email: owner.email.clone(),
        name: owner.full_name(),
    }
}

fn user_variables(staff: &StaffMember) -> BTreeMap<String, String> {
    let mut variables = BTreeMap::from([
        ("{{first_name}}".to_string(), staff.first_name.clone()),
        ("{{last_name}}".to_string(), staff.last_name.clone()),
        ("{{full_name}}".to_string(), staff.full_name()),
        ("{{username}}".to_string(), staff.username.clone()),
        ("{{email}}".to_string(), staff.email.clone()),
        ("{{department}}".to_string(), staff.department.clone()),
    ]);

    for leave_type in super::domain::LeaveType::ALL {
        let total = staff.allocations.get(leave_type);
        let used = staff.used.get(leave_type);
        let label = leave_type.label();
        variables.insert(format!("{{{{{label}_leave}}}}"), total.to_string());
        variables.insert(format!("{{{{{label}_leave_used}}}}"), used.to_string());
        variables.insert(
            format!("{{{{{label}_leave_remaining}}}}"),
            total.saturating_sub(used).to_string(),
        );
    }

    variables
}

fn request_variables(request: &LeaveRequest) -> BTreeMap<String, String> {
    let mut variables = BTreeMap::from([
        (
            "{{leave_type}}".to_string(),
            request.leave_type.display_name().to_string(),
        ),
        (
            "{{start_date}}".to_string(),
            request.start_date.format("%Y-%m-%d").to_string(),
        ),
        (
            "{{end_date}}".to_string(),
            request.end_date.format("%Y-%m-%d").to_string(),
        ),
        ("{{total_days}}".to_string(), request.total_days.to_string()),
        ("{{reason}}".to_string(), request.reason.clone()),
    ]);

    let mut status = request.status.label().to_string();
    if let Some(first) = status.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    variables.insert("{{status}}".to_string(), status);

    if let Some(reason) = &request.rejection_reason {
        variables.insert("{{rejection_reason}}".to_string(), reason.clone());
    }

    variables
}
