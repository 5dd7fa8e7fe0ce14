//! Authorization guard
//!
//! Resolves the caller's account from the bearer token and enforces the
//! role and ownership rules. The account is re-read on every request, so
//! deactivation takes effect without waiting for the token to expire.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use leave_core::{Account, AccountRepository, Role};

use super::jwt::TokenSigner;
use crate::audit::{audit_log, AuditEvent, ClientInfo};
use crate::error::{AppError, AuthError};
use crate::state::AppState;

/// Account resolved by `auth_middleware`, available to handlers via
/// `Extension<CurrentAccount>`
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub Account);

/// Resolves bearer tokens to live accounts
#[derive(Clone)]
pub struct AuthorizationGuard {
    signer: TokenSigner,
    accounts: Arc<dyn AccountRepository>,
}

impl AuthorizationGuard {
    pub fn new(signer: TokenSigner, accounts: Arc<dyn AccountRepository>) -> Self {
        Self { signer, accounts }
    }

    /// Verify the token and load its account.
    ///
    /// A bad token, an unknown subject and an inactive account are the same
    /// `InvalidToken` failure. The specific reason goes to the audit log.
    pub async fn current_account(
        &self,
        token: &str,
        client: &ClientInfo,
    ) -> Result<Account, AppError> {
        let reject = |reason: String| {
            audit_log(&AuditEvent::InvalidToken {
                ip_address: client.ip_address.clone(),
                user_agent: client.user_agent.clone(),
                reason,
            });
            AppError::from(AuthError::InvalidToken)
        };

        let claims = match self.signer.verify(token) {
            Ok(claims) => claims,
            Err(e) => return Err(reject(e.to_string())),
        };

        match self.accounts.find_account_by_email(&claims.sub).await? {
            Some(account) if account.is_active => Ok(account),
            Some(_) => Err(reject("account is inactive".to_string())),
            None => Err(reject("unknown subject".to_string())),
        }
    }

    /// Check the account's role against an allow-list
    pub fn require_role(account: &Account, allowed: &[Role]) -> Result<(), AuthError> {
        if allowed.contains(&account.role) {
            Ok(())
        } else {
            Err(AuthError::permission_denied())
        }
    }
}

/// Allow access to a resource owned by `owner_id`.
///
/// Owners always pass. Roles that bypass ownership pass for any owner.
/// Everyone else gets `Forbidden(message)` and an `AccessDenied` audit record.
pub fn ensure_self_or_manager(
    caller: &Account,
    owner_id: i64,
    client: &ClientInfo,
    message: &str,
) -> Result<(), AuthError> {
    if caller.id == owner_id || caller.role.bypasses_ownership() {
        return Ok(());
    }

    audit_log(&AuditEvent::AccessDenied {
        account_id: Some(caller.id),
        email: Some(caller.email.clone()),
        resource: format!("employee:{owner_id}"),
        required_role: Some(Role::Manager.as_str().to_string()),
        ip_address: client.ip_address.clone(),
        user_agent: client.user_agent.clone(),
    });
    Err(AuthError::Forbidden(message.to_string()))
}

/// Extract the token from `Authorization: Bearer <token>`.
///
/// The scheme is matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Authentication middleware that requires a valid access token
///
/// On success inserts `CurrentAccount` into the request extensions.
///
/// ```ignore
/// let app = Router::new()
///     .route("/protected", get(handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
/// ```
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let client = ClientInfo::from_headers(request.headers());

    let Some(token) = bearer_token(request.headers()) else {
        audit_log(&AuditEvent::InvalidToken {
            ip_address: client.ip_address,
            user_agent: client.user_agent,
            reason: "missing or malformed Authorization header".to_string(),
        });
        return Err(AuthError::InvalidToken.into());
    };

    let account = state.guard.current_account(token, &client).await?;
    request.extensions_mut().insert(CurrentAccount(account));

    Ok(next.run(request).await)
}

/// Type alias for role middleware future
type RoleMiddlewareFuture =
    Pin<Box<dyn Future<Output = Result<Response, AppError>> + Send>>;

/// Middleware factory for role-based access control
///
/// Must run after `auth_middleware`, so it is added as an inner layer:
///
/// ```ignore
/// let app = Router::new()
///     .route("/employees", get(list_employees))
///     .route_layer(middleware::from_fn(require_role(&[Role::Manager])))
///     .route_layer(middleware::from_fn_with_state(state, auth_middleware));
/// ```
pub fn require_role(
    allowed: &'static [Role],
) -> impl Fn(Request<Body>, Next) -> RoleMiddlewareFuture + Clone {
    move |request: Request<Body>, next: Next| {
        Box::pin(async move {
            let Some(CurrentAccount(account)) = request.extensions().get::<CurrentAccount>().cloned()
            else {
                return Err(AuthError::InvalidToken.into());
            };

            if let Err(e) = AuthorizationGuard::require_role(&account, allowed) {
                let client = ClientInfo::from_headers(request.headers());
                let roles: Vec<&str> = allowed.iter().map(Role::as_str).collect();
                audit_log(&AuditEvent::AccessDenied {
                    account_id: Some(account.id),
                    email: Some(account.email.clone()),
                    resource: format!("{} {}", request.method(), request.uri().path()),
                    required_role: Some(roles.join(",")),
                    ip_address: client.ip_address,
                    user_agent: client.user_agent,
                });
                return Err(e.into());
            }

            Ok(next.run(request).await)
        })
    }
}
