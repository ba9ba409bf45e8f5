use serde::{Deserialize, Serialize};

use super::domain::LeaveDays;

/// Named settings collaborator; implementations resolve values from whatever
/// settings store the host application uses.
pub trait PolicySource: Send + Sync {
    fn get_bool(&self, name: &str) -> Option<bool>;
    fn get_int(&self, name: &str) -> Option<u32>;
}

/// Toggles parameterizing the leave workflow. Defaults match the behavior the
/// system ships with: weekends chargeable, editing allowed with forced
/// re-approval, rejected requests immutable, approved requests undeletable,
/// every notification enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeavePolicy {
    pub weekend_counts_as_leave: bool,
    pub allow_leave_editing: bool,
    pub allow_edit_rejected: bool,
    pub require_reapproval_on_edit: bool,
    pub allow_delete_approved: bool,
    pub notify_admin_on_request: bool,
    pub notify_user_on_approval: bool,
    pub notify_user_on_rejection: bool,
}

impl Default for LeavePolicy {
    fn default() -> Self {
        Self {
            weekend_counts_as_leave: true,
            allow_leave_editing: true,
            allow_edit_rejected: false,
            require_reapproval_on_edit: true,
            allow_delete_approved: false,
            notify_admin_on_request: true,
            notify_user_on_approval: true,
            notify_user_on_rejection: true,
        }
    }
}

impl LeavePolicy {
    /// Resolve every toggle from a settings source, falling back to the defaults
    /// for options the source does not carry.
    pub fn from_source(source: &dyn PolicySource) -> Self {
        let defaults = Self::default();
        let get = |name: &str, fallback: bool| source.get_bool(name).unwrap_or(fallback);

        Self {
            weekend_counts_as_leave: get(
                "weekend_counts_as_leave",
                defaults.weekend_counts_as_leave,
            ),
            allow_leave_editing: get("allow_leave_editing", defaults.allow_leave_editing),
            allow_edit_rejected: get("allow_edit_rejected", defaults.allow_edit_rejected),
            require_reapproval_on_edit: get(
                "require_reapproval_on_edit",
                defaults.require_reapproval_on_edit,
            ),
            allow_delete_approved: get("allow_delete_approved", defaults.allow_delete_approved),
            notify_admin_on_request: get(
                "notify_admin_on_request",
                defaults.notify_admin_on_request,
            ),
            notify_user_on_approval: get(
                "notify_user_on_approval",
                defaults.notify_user_on_approval,
            ),
            notify_user_on_rejection: get(
                "notify_user_on_rejection",
                defaults.notify_user_on_rejection,
            ),
        }
    }

    /// Per-type allocation granted to newly provisioned staff, resolvable from the
    /// same settings source (`default_annual_leave` and friends).
    pub fn default_allocations(source: &dyn PolicySource) -> LeaveDays {
        LeaveDays {
            annual: source.get_int("default_annual_leave").unwrap_or(20),
            sick: source.get_int("default_sick_leave").unwrap_or(10),
            personal: source.get_int("default_personal_leave").unwrap_or(5),
            emergency: source.get_int("default_emergency_leave").unwrap_or(3),
        }
    }
}
