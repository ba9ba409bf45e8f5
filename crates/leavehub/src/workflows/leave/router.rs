use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::domain::{LeaveStatus, LeaveType, RequestId, UserId};
use super::notification::Mailer;
use super::repository::{LeaveRepository, RequestFilter, StaffRepository};
use super::service::{LeaveEdit, LeaveService, LeaveServiceError, LeaveSubmission};

/// Router builder exposing the leave workflow over HTTP. Authentication is the
/// host application's concern; callers identify themselves in the payload.
pub fn leave_router<R, S, M>(service: Arc<LeaveService<R, S, M>>) -> Router
where
    R: LeaveRepository + 'static,
    S: StaffRepository + 'static,
    M: Mailer + 'static,
{
    Router::new()
        .route(
            "/api/v1/leave/requests",
            post(submit_handler::<R, S, M>).get(list_handler::<R, S, M>),
        )
        .route(
            "/api/v1/leave/requests/:request_id",
            get(get_handler::<R, S, M>)
                .put(edit_handler::<R, S, M>)
                .delete(delete_handler::<R, S, M>),
        )
        .route(
            "/api/v1/leave/requests/:request_id/approve",
            post(approve_handler::<R, S, M>),
        )
        .route(
            "/api/v1/leave/requests/:request_id/reject",
            post(reject_handler::<R, S, M>),
        )
        .route(
            "/api/v1/leave/balance/:user_id",
            get(balance_handler::<R, S, M>),
        )
        .route("/api/v1/leave/days", post(day_count_handler::<R, S, M>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApprovePayload {
    pub(crate) approver: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RejectPayload {
    pub(crate) approver: u64,
    #[serde(default)]
    pub(crate) rejection_reason: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EditPayload {
    pub(crate) user_id: u64,
    #[serde(flatten)]
    pub(crate) edit: LeaveEdit,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OwnerPayload {
    pub(crate) user_id: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DayCountPayload {
    pub(crate) start_date: NaiveDate,
    pub(crate) end_date: NaiveDate,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    pub(crate) user_id: Option<u64>,
    pub(crate) status: Option<String>,
    pub(crate) leave_type: Option<String>,
    pub(crate) from: Option<NaiveDate>,
    pub(crate) to: Option<NaiveDate>,
}

impl ListQuery {
    fn into_filter(self) -> Result<RequestFilter, Response> {
        let status = match self.status.as_deref() {
            None | Some("all") => None,
            Some("pending") => Some(LeaveStatus::Pending),
            Some("approved") => Some(LeaveStatus::Approved),
            Some("rejected") => Some(LeaveStatus::Rejected),
            Some(other) => {
                return Err(bad_request(format!("unknown status filter '{other}'")));
            }
        };

        let leave_type = match self.leave_type.as_deref() {
            None | Some("all") => None,
            Some(raw) => Some(
                LeaveType::parse(raw)
                    .ok_or_else(|| bad_request(format!("unknown leave type filter '{raw}'")))?,
            ),
        };

        Ok(RequestFilter {
            user_id: self.user_id.map(UserId),
            status,
            leave_type,
            from: self.from,
            to: self.to,
        })
    }
}

async fn submit_handler<R, S, M>(
    State(service): State<Arc<LeaveService<R, S, M>>>,
    Json(submission): Json<LeaveSubmission>,
) -> Response
where
    R: LeaveRepository + 'static,
    S: StaffRepository + 'static,
    M: Mailer + 'static,
{
    match service.submit(submission) {
        Ok(id) => (
            StatusCode::CREATED,
            Json(json!({ "request_id": id, "status": LeaveStatus::Pending.label() })),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

async fn list_handler<R, S, M>(
    State(service): State<Arc<LeaveService<R, S, M>>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: LeaveRepository + 'static,
    S: StaffRepository + 'static,
    M: Mailer + 'static,
{
    let filter = match query.into_filter() {
        Ok(filter) => filter,
        Err(response) => return response,
    };

    match service.list(&filter) {
        Ok(views) => (StatusCode::OK, Json(json!({ "requests": views }))).into_response(),
        Err(err) => error_response(err),
    }
}

async fn get_handler<R, S, M>(
    State(service): State<Arc<LeaveService<R, S, M>>>,
    Path(request_id): Path<u64>,
) -> Response
where
    R: LeaveRepository + 'static,
    S: StaffRepository + 'static,
    M: Mailer + 'static,
{
    match service.request(RequestId(request_id)) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn edit_handler<R, S, M>(
    State(service): State<Arc<LeaveService<R, S, M>>>,
    Path(request_id): Path<u64>,
    Json(payload): Json<EditPayload>,
) -> Response
where
    R: LeaveRepository + 'static,
    S: StaffRepository + 'static,
    M: Mailer + 'static,
{
    match service.edit(RequestId(request_id), UserId(payload.user_id), payload.edit) {
        Ok(()) => ok_message("Leave request updated successfully."),
        Err(err) => error_response(err),
    }
}

async fn delete_handler<R, S, M>(
    State(service): State<Arc<LeaveService<R, S, M>>>,
    Path(request_id): Path<u64>,
    Json(payload): Json<OwnerPayload>,
) -> Response
where
    R: LeaveRepository + 'static,
    S: StaffRepository + 'static,
    M: Mailer + 'static,
{
    match service.delete(RequestId(request_id), UserId(payload.user_id)) {
        Ok(()) => ok_message("Leave request deleted successfully."),
        Err(err) => error_response(err),
    }
}

async fn approve_handler<R, S, M>(
    State(service): State<Arc<LeaveService<R, S, M>>>,
    Path(request_id): Path<u64>,
    Json(payload): Json<ApprovePayload>,
) -> Response
where
    R: LeaveRepository + 'static,
    S: StaffRepository + 'static,
    M: Mailer + 'static,
{
    match service.approve(RequestId(request_id), UserId(payload.approver)) {
        Ok(()) => ok_message("Leave request approved successfully."),
        Err(err) => error_response(err),
    }
}

async fn reject_handler<R, S, M>(
    State(service): State<Arc<LeaveService<R, S, M>>>,
    Path(request_id): Path<u64>,
    Json(payload): Json<RejectPayload>,
) -> Response
where
    R: LeaveRepository + 'static,
    S: StaffRepository + 'static,
    M: Mailer + 'static,
{
    match service.reject(
        RequestId(request_id),
        UserId(payload.approver),
        payload.rejection_reason,
    ) {
        Ok(()) => ok_message("Leave request rejected successfully."),
        Err(err) => error_response(err),
    }
}

async fn balance_handler<R, S, M>(
    State(service): State<Arc<LeaveService<R, S, M>>>,
    Path(user_id): Path<u64>,
) -> Response
where
    R: LeaveRepository + 'static,
    S: StaffRepository + 'static,
    M: Mailer + 'static,
{
    match service.balance(UserId(user_id)) {
        Ok(summary) => (StatusCode::OK, Json(json!({ "balance": summary }))).into_response(),
        Err(err) => error_response(err),
    }
}

async fn day_count_handler<R, S, M>(
    State(service): State<Arc<LeaveService<R, S, M>>>,
    Json(payload): Json<DayCountPayload>,
) -> Response
where
    R: LeaveRepository + 'static,
    S: StaffRepository + 'static,
    M: Mailer + 'static,
{
    match service.day_count(payload.start_date, payload.end_date) {
        Ok(total_days) => (
            StatusCode::OK,
            Json(json!({
                "total_days": total_days,
                "weekend_counts_as_leave": service.policy().weekend_counts_as_leave,
            })),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

fn ok_message(message: &str) -> Response {
    (StatusCode::OK, Json(json!({ "message": message }))).into_response()
}

fn bad_request(message: String) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "error": message })),
    )
        .into_response()
}

fn error_response(err: LeaveServiceError) -> Response {
    let status = match &err {
        LeaveServiceError::InvalidLeaveType(_)
        | LeaveServiceError::InvalidDateRange { .. }
        | LeaveServiceError::PastDate(_)
        | LeaveServiceError::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        LeaveServiceError::OverlappingRequest
        | LeaveServiceError::InvalidTransition { .. }
        | LeaveServiceError::StorageConflict => StatusCode::CONFLICT,
        LeaveServiceError::NotFound(_) | LeaveServiceError::UnknownStaff(_) => {
            StatusCode::NOT_FOUND
        }
        LeaveServiceError::NotOwner
        | LeaveServiceError::EditingDisabled
        | LeaveServiceError::RejectedImmutable
        | LeaveServiceError::ApprovedImmutable => StatusCode::FORBIDDEN,
        LeaveServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, Json(json!({ "error": err.to_string() }))).into_response()
}
