//! Leave API - REST server
//!
//! HTTP endpoints for employees, leave requests and the session lifecycle
//! (registration, login, refresh rotation, logout).
//!
//! Author: hephaex@gmail.com

pub mod audit;
pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::get,
    Router,
};
use leave_core::config::ServerConfig;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

/// OpenAPI document for the whole API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leave Manager API",
        description = "Employee leave management with JWT sessions"
    ),
    paths(
        handlers::auth::register_handler,
        handlers::auth::login_handler,
        handlers::auth::refresh_handler,
        handlers::auth::logout_handler,
        handlers::employees::create_employee,
        handlers::employees::get_employee,
        handlers::employees::list_employees,
        handlers::employees::get_balance,
        handlers::leave::apply_leave,
        handlers::leave::approve_leave,
        handlers::leave::reject_leave,
        handlers::leave::list_employee_leaves,
        handlers::health::health_check,
        handlers::health::readiness_check,
        handlers::health::metrics,
    ),
    components(schemas(
        auth::EmployeeCreate,
        auth::RefreshRequest,
        auth::TokenPair,
        handlers::auth::LoginForm,
        handlers::auth::LogoutResponse,
        handlers::employees::EmployeeOut,
        handlers::employees::BalanceOut,
        handlers::leave::LeaveApply,
        handlers::leave::LeaveOut,
        handlers::leave::ApproveOut,
        handlers::health::HealthResponse,
        handlers::health::BuildInfo,
        handlers::health::ReadinessResponse,
        handlers::health::ReadinessChecks,
        handlers::health::MetricsResponse,
        error::ApiError,
        leave_core::Role,
        leave_core::LeaveStatus,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration and session lifecycle"),
        (name = "employees", description = "Employee records"),
        (name = "leave", description = "Leave requests"),
        (name = "health", description = "Probes and counters"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Build the CORS layer from server configuration
///
/// An empty origin list allows any origin.
fn cors_layer(server: &ServerConfig) -> CorsLayer {
    if server.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let api = routes::api_routes(state.clone())
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::metrics))
        .layer(axum_middleware::from_fn(
            middleware::security_headers_middleware,
        ));

    let app = Router::new()
        .merge(api)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http());

    let app = if state.config.server.cors_enabled {
        app.layer(cors_layer(&state.config.server))
    } else {
        app
    };

    app.with_state(state)
}

#[cfg(any(test, feature = "test-utils"))]
pub use testing::*;

#[cfg(any(test, feature = "test-utils"))]
mod testing {
    use super::*;
    use crate::auth::{PasswordConfig, PasswordHasher};
    use chrono::NaiveDate;
    use leave_core::{Account, AccountRepository, AppConfig, MemoryStore, NewAccount, Role};

    /// Email of the manager created by [`seed_manager`]
    pub const TEST_MANAGER_EMAIL: &str = "manager@example.com";
    /// Password of the manager created by [`seed_manager`]
    pub const TEST_MANAGER_PASSWORD: &str = "managerpass";

    /// Configuration with cheap Argon2 parameters and a fixed secret
    pub fn testing_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.auth.secret_key = "test-secret-key-for-integration-tests".to_string();
        config.auth.argon2_memory_kib = 8192;
        config.auth.argon2_iterations = 1;
        config.auth.argon2_parallelism = 1;
        config.auth.sweep_interval_secs = 0;
        config
    }

    /// Application state over an in-memory store
    pub fn create_test_state(config: AppConfig, store: Arc<MemoryStore>) -> Arc<AppState> {
        Arc::new(AppState::new(config, store).expect("test state"))
    }

    /// Router over a caller-supplied config and store
    pub fn create_router_with_store(config: AppConfig, store: Arc<MemoryStore>) -> Router {
        create_router(create_test_state(config, store))
    }

    /// Router over a fresh in-memory store
    pub fn create_router_for_testing() -> Router {
        create_router_with_store(testing_config(), Arc::new(MemoryStore::new()))
    }

    /// Insert a manager account directly into the store
    pub async fn seed_manager(config: &AppConfig, store: &MemoryStore) -> Account {
        let hasher = PasswordHasher::new(&PasswordConfig::from(&config.auth)).expect("hasher");
        let password_hash = hasher.hash(TEST_MANAGER_PASSWORD).expect("hash");

        store
            .create_account(NewAccount {
                name: "Manager".to_string(),
                email: TEST_MANAGER_EMAIL.to_string(),
                department: "Management".to_string(),
                joining_date: NaiveDate::from_ymd_opt(2020, 1, 1).expect("date"),
                leave_balance: config.leave.default_balance,
                password_hash,
                role: Role::Manager,
            })
            .await
            .expect("seed manager")
    }
}
