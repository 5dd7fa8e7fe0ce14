//! Employee API handlers
//!
//! Author: hephaex@gmail.com

use crate::audit::ClientInfo;
use crate::auth::{ensure_self_or_manager, CurrentAccount, EmployeeCreate};
use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::NaiveDate;
use leave_core::{Account, LeaveError, Pagination, Role};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Employee as returned by the API. Never includes the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EmployeeOut {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub department: String,
    pub joining_date: NaiveDate,
    pub leave_balance: i32,
    pub role: Role,
}

impl From<Account> for EmployeeOut {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            email: account.email,
            department: account.department,
            joining_date: account.joining_date,
            leave_balance: account.leave_balance,
            role: account.role,
        }
    }
}

/// Leave balance response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceOut {
    pub employee_id: i64,
    pub leave_balance: i32,
}

pub(crate) async fn load_employee(state: &AppState, id: i64) -> Result<Account, AppError> {
    state
        .accounts
        .find_account_by_id(id)
        .await?
        .ok_or_else(|| LeaveError::NotFound("Employee".to_string()).into())
}

/// Create an employee with any role (manager only)
#[utoipa::path(
    post,
    path = "/employees",
    tag = "employees",
    request_body = EmployeeCreate,
    responses(
        (status = 201, description = "Employee created", body = EmployeeOut),
        (status = 400, description = "Invalid input or email already exists", body = crate::error::ApiError),
        (status = 401, description = "Invalid token", body = crate::error::ApiError),
        (status = 403, description = "Caller is not a manager", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<EmployeeCreate>,
) -> Result<impl IntoResponse, AppError> {
    let client = ClientInfo::from_headers(&headers);
    let role = request.role;
    let account = state.sessions.register(request, role, &client).await?;

    Ok((StatusCode::CREATED, Json(EmployeeOut::from(account))))
}

/// Get one employee (self or manager)
#[utoipa::path(
    get,
    path = "/employees/{id}",
    tag = "employees",
    params(("id" = i64, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee", body = EmployeeOut),
        (status = 401, description = "Invalid token", body = crate::error::ApiError),
        (status = 403, description = "Not your record", body = crate::error::ApiError),
        (status = 404, description = "Employee not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAccount(caller)): Extension<CurrentAccount>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<EmployeeOut>, AppError> {
    let client = ClientInfo::from_headers(&headers);
    ensure_self_or_manager(&caller, id, &client, "You can only view your own profile")?;
    let account = load_employee(&state, id).await?;

    Ok(Json(account.into()))
}

/// List employees ordered by id (manager only)
#[utoipa::path(
    get,
    path = "/employees",
    tag = "employees",
    params(
        ("skip" = Option<u32>, Query, description = "Rows to skip (default 0)"),
        ("limit" = Option<u32>, Query, description = "Maximum rows (default 100)"),
    ),
    responses(
        (status = 200, description = "Employees", body = [EmployeeOut]),
        (status = 401, description = "Invalid token", body = crate::error::ApiError),
        (status = 403, description = "Caller is not a manager", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    State(state): State<Arc<AppState>>,
    ApiQuery(page): ApiQuery<Pagination>,
) -> Result<Json<Vec<EmployeeOut>>, AppError> {
    let accounts = state.accounts.list_accounts(page).await?;

    Ok(Json(accounts.into_iter().map(EmployeeOut::from).collect()))
}

/// Get an employee's leave balance (self or manager)
#[utoipa::path(
    get,
    path = "/employees/{id}/balance",
    tag = "employees",
    params(("id" = i64, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Leave balance", body = BalanceOut),
        (status = 401, description = "Invalid token", body = crate::error::ApiError),
        (status = 403, description = "Not your balance", body = crate::error::ApiError),
        (status = 404, description = "Employee not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAccount(caller)): Extension<CurrentAccount>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<BalanceOut>, AppError> {
    let client = ClientInfo::from_headers(&headers);
    ensure_self_or_manager(&caller, id, &client, "You can only view your own balance")?;
    let account = load_employee(&state, id).await?;

    Ok(Json(BalanceOut {
        employee_id: account.id,
        leave_balance: account.leave_balance,
    }))
}
