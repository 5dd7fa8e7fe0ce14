//! Leave request handlers
//!
//! Author: hephaex@gmail.com

use crate::audit::ClientInfo;
use crate::auth::{ensure_self_or_manager, CurrentAccount};
use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::handlers::employees::load_employee;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::NaiveDate;
use leave_core::{leave, LeaveError, LeaveRequest, LeaveStatus, Pagination};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Leave application body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeaveApply {
    pub employee_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Leave request as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeaveOut {
    pub id: i64,
    pub employee_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub num_days: i32,
    pub status: LeaveStatus,
}

impl From<LeaveRequest> for LeaveOut {
    fn from(leave: LeaveRequest) -> Self {
        Self {
            id: leave.id,
            employee_id: leave.employee_id,
            start_date: leave.start_date,
            end_date: leave.end_date,
            num_days: leave.num_days,
            status: leave.status,
        }
    }
}

/// Approval result with the owner's remaining balance
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApproveOut {
    pub id: i64,
    pub employee_id: i64,
    pub status: LeaveStatus,
    pub updated_leave_balance: i32,
}

/// Apply for leave (self or manager)
#[utoipa::path(
    post,
    path = "/leave/apply",
    tag = "leave",
    request_body = LeaveApply,
    responses(
        (status = 201, description = "Leave request created", body = LeaveOut),
        (status = 400, description = "Rejected by leave rules", body = crate::error::ApiError),
        (status = 401, description = "Invalid token", body = crate::error::ApiError),
        (status = 403, description = "Applying for someone else", body = crate::error::ApiError),
        (status = 404, description = "Employee not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn apply_leave(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAccount(caller)): Extension<CurrentAccount>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<LeaveApply>,
) -> Result<impl IntoResponse, AppError> {
    ensure_self_or_manager(
        &caller,
        request.employee_id,
        &ClientInfo::from_headers(&headers),
        "You can only apply for leave for yourself",
    )?;
    let employee = load_employee(&state, request.employee_id).await?;

    let overlapping = state
        .leaves
        .has_overlapping_leave(employee.id, request.start_date, request.end_date)
        .await?;
    let new_leave =
        leave::validate_application(&employee, request.start_date, request.end_date, overlapping)?;

    let created = state.leaves.create_leave(new_leave).await?;
    tracing::info!(
        leave_id = created.id,
        employee_id = created.employee_id,
        num_days = created.num_days,
        "Leave applied"
    );

    Ok((StatusCode::CREATED, Json(LeaveOut::from(created))))
}

/// Approve an applied leave and deduct its days (manager only)
#[utoipa::path(
    put,
    path = "/leave/{id}/approve",
    tag = "leave",
    params(("id" = i64, Path, description = "Leave request ID")),
    responses(
        (status = 200, description = "Leave approved", body = ApproveOut),
        (status = 400, description = "Leave is not in the applied state", body = crate::error::ApiError),
        (status = 401, description = "Invalid token", body = crate::error::ApiError),
        (status = 403, description = "Caller is not a manager", body = crate::error::ApiError),
        (status = 404, description = "Leave request not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn approve_leave(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAccount(caller)): Extension<CurrentAccount>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApproveOut>, AppError> {
    let (leave, balance) = state.leaves.approve_leave(id).await?;
    tracing::info!(
        leave_id = leave.id,
        employee_id = leave.employee_id,
        approved_by = caller.id,
        balance,
        "Leave approved"
    );

    Ok(Json(ApproveOut {
        id: leave.id,
        employee_id: leave.employee_id,
        status: leave.status,
        updated_leave_balance: balance,
    }))
}

/// Reject an applied leave (manager only)
#[utoipa::path(
    put,
    path = "/leave/{id}/reject",
    tag = "leave",
    params(("id" = i64, Path, description = "Leave request ID")),
    responses(
        (status = 200, description = "Leave rejected", body = LeaveOut),
        (status = 400, description = "Leave already decided", body = crate::error::ApiError),
        (status = 401, description = "Invalid token", body = crate::error::ApiError),
        (status = 403, description = "Caller is not a manager", body = crate::error::ApiError),
        (status = 404, description = "Leave request not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn reject_leave(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAccount(caller)): Extension<CurrentAccount>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<LeaveOut>, AppError> {
    let leave = state.leaves.reject_leave(id).await?;
    tracing::info!(leave_id = leave.id, rejected_by = caller.id, "Leave rejected");

    Ok(Json(leave.into()))
}

/// List an employee's leave requests (self or manager)
#[utoipa::path(
    get,
    path = "/leave/employee/{employee_id}",
    tag = "leave",
    params(
        ("employee_id" = i64, Path, description = "Employee ID"),
        ("skip" = Option<u32>, Query, description = "Rows to skip (default 0)"),
        ("limit" = Option<u32>, Query, description = "Maximum rows (default 100)"),
    ),
    responses(
        (status = 200, description = "Leave requests", body = [LeaveOut]),
        (status = 401, description = "Invalid token", body = crate::error::ApiError),
        (status = 403, description = "Not your leave requests", body = crate::error::ApiError),
        (status = 404, description = "Employee not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_employee_leaves(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAccount(caller)): Extension<CurrentAccount>,
    headers: HeaderMap,
    ApiPath(employee_id): ApiPath<i64>,
    ApiQuery(page): ApiQuery<Pagination>,
) -> Result<Json<Vec<LeaveOut>>, AppError> {
    ensure_self_or_manager(
        &caller,
        employee_id,
        &ClientInfo::from_headers(&headers),
        "You can only view your own leave requests",
    )?;
    if state.accounts.find_account_by_id(employee_id).await?.is_none() {
        return Err(LeaveError::NotFound("Employee".to_string()).into());
    }

    let leaves = state
        .leaves
        .list_leaves_for_employee(employee_id, page)
        .await?;

    Ok(Json(leaves.into_iter().map(LeaveOut::from).collect()))
}
