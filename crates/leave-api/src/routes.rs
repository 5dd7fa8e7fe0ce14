//! API route definitions
//!
//! Author: hephaex@gmail.com

use crate::auth::{auth_middleware, require_role};
use crate::handlers::{auth, employees, leave};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use leave_core::Role;
use std::sync::Arc;

const MEMBERS: &[Role] = &[Role::Employee, Role::Manager];
const MANAGERS: &[Role] = &[Role::Manager];

/// Create the API routes
///
/// Route layers run bottom-up, so `auth_middleware` resolves the caller
/// before `require_role` inspects it.
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no access token required)
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/token", post(auth::login_handler))
        .route("/auth/refresh", post(auth::refresh_handler))
        .route("/auth/logout", post(auth::logout_handler));

    // Any authenticated account; handlers enforce self-or-manager
    let member_routes = Router::new()
        .route("/employees/:id", get(employees::get_employee))
        .route("/employees/:id/balance", get(employees::get_balance))
        .route("/leave/apply", post(leave::apply_leave))
        .route(
            "/leave/employee/:employee_id",
            get(leave::list_employee_leaves),
        )
        .route_layer(middleware::from_fn(require_role(MEMBERS)))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Managers only
    let manager_routes = Router::new()
        .route(
            "/employees",
            post(employees::create_employee).get(employees::list_employees),
        )
        .route("/leave/:id/approve", put(leave::approve_leave))
        .route("/leave/:id/reject", put(leave::reject_leave))
        .route_layer(middleware::from_fn(require_role(MANAGERS)))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(member_routes)
        .merge(manager_routes)
}
