//! Session service layer
//!
//! Registration, login, refresh with rotation, and logout. Every path
//! that rejects a caller does so with one fixed error per operation so
//! clients cannot tell which check failed.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use leave_core::{
    Account, AccountRepository, AppConfig, LeaveError, NewAccount, RefreshTokenRepository, Role,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::jwt::TokenSigner;
use super::password::{PasswordConfig, PasswordError, PasswordHasher};
use super::refresh::RefreshTokenStore;
use crate::audit::{audit_log, AuditEvent, ClientInfo};
use crate::error::{AppError, AuthError};

/// Hashed at startup and verified against when the email is unknown
const DUMMY_PASSWORD: &str = "dummy-password-for-timing";

/// Account creation request, used by self-registration and by managers
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct EmployeeCreate {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub department: String,
    pub joining_date: NaiveDate,
    #[validate(length(min = 1, max = 1024))]
    pub password: String,
    /// Ignored by self-registration, which always creates employees
    #[serde(default)]
    pub role: Role,
}

/// Refresh/logout request body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Access and refresh token pair
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Always "bearer"
    pub token_type: String,
}

/// Session service
#[derive(Clone)]
pub struct SessionService {
    accounts: Arc<dyn AccountRepository>,
    hasher: PasswordHasher,
    signer: TokenSigner,
    refresh_tokens: RefreshTokenStore,
    access_ttl: Duration,
    default_balance: i32,
    dummy_hash: Arc<str>,
}

impl SessionService {
    /// Build the service from configuration.
    ///
    /// Fails only if the configured Argon2 parameters are unusable.
    pub fn new(
        config: &AppConfig,
        accounts: Arc<dyn AccountRepository>,
        tokens: Arc<dyn RefreshTokenRepository>,
    ) -> Result<Self, PasswordError> {
        let hasher = PasswordHasher::new(&PasswordConfig::from(&config.auth))?;
        let dummy_hash = hasher.hash(DUMMY_PASSWORD)?;

        Ok(Self {
            refresh_tokens: RefreshTokenStore::new(
                tokens,
                accounts.clone(),
                config.auth.refresh_token_ttl(),
            ),
            accounts,
            hasher,
            signer: TokenSigner::from_config(&config.auth),
            access_ttl: config.auth.access_token_ttl(),
            default_balance: config.leave.default_balance,
            dummy_hash: dummy_hash.into(),
        })
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    pub fn refresh_tokens(&self) -> &RefreshTokenStore {
        &self.refresh_tokens
    }

    /// Create an account with `role` and the configured default balance
    pub async fn register(
        &self,
        request: EmployeeCreate,
        role: Role,
        client: &ClientInfo,
    ) -> Result<Account, AppError> {
        if let Err(e) = request.validate() {
            audit_log(&AuditEvent::RegistrationFailure {
                email: request.email.clone(),
                reason: e.to_string(),
                ip_address: client.ip_address.clone(),
                user_agent: client.user_agent.clone(),
            });
            return Err(e.into());
        }

        let password_hash = self.hash_password(request.password).await?;

        let created = self
            .accounts
            .create_account(NewAccount {
                name: request.name,
                email: request.email.clone(),
                department: request.department,
                joining_date: request.joining_date,
                leave_balance: self.default_balance,
                password_hash,
                role,
            })
            .await;

        match created {
            Ok(account) => {
                audit_log(&AuditEvent::RegistrationSuccess {
                    account_id: account.id,
                    email: account.email.clone(),
                    role: account.role.to_string(),
                    ip_address: client.ip_address.clone(),
                    user_agent: client.user_agent.clone(),
                });
                Ok(account)
            }
            Err(e) => {
                if matches!(e, LeaveError::DuplicateEmail) {
                    audit_log(&AuditEvent::RegistrationFailure {
                        email: request.email,
                        reason: e.to_string(),
                        ip_address: client.ip_address.clone(),
                        user_agent: client.user_agent.clone(),
                    });
                }
                Err(e.into())
            }
        }
    }

    /// Exchange email and password for a token pair.
    ///
    /// Unknown email, wrong password, and inactive account all fail with
    /// `InvalidCredentials` after exactly one password verification.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        client: &ClientInfo,
    ) -> Result<TokenPair, AppError> {
        let account = self.accounts.find_account_by_email(email).await?;

        let (stored_hash, account) = match account {
            Some(account) => (account.password_hash.clone(), Some(account)),
            None => (self.dummy_hash.to_string(), None),
        };
        let password_ok = self
            .verify_password(password.to_string(), stored_hash)
            .await?;

        let reason = match &account {
            None => Some("unknown email"),
            Some(_) if !password_ok => Some("wrong password"),
            Some(account) if !account.is_active => Some("inactive account"),
            Some(_) => None,
        };

        let account = match (reason, account) {
            (None, Some(account)) => account,
            (reason, _) => {
                audit_log(&AuditEvent::LoginFailure {
                    email: email.to_string(),
                    reason: reason.unwrap_or("unknown email").to_string(),
                    ip_address: client.ip_address.clone(),
                    user_agent: client.user_agent.clone(),
                });
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        let access_token = self.issue_access_token(&account)?;
        let refresh_token = self.refresh_tokens.issue_and_store(account.id).await?;

        audit_log(&AuditEvent::LoginSuccess {
            account_id: account.id,
            email: account.email.clone(),
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
        });

        Ok(TokenPair::bearer(access_token, refresh_token))
    }

    /// Rotate a refresh token into a fresh pair.
    ///
    /// The presented token is consumed whether or not the owner is still
    /// active, so a replay always fails.
    pub async fn refresh(&self, raw: &str, client: &ClientInfo) -> Result<TokenPair, AppError> {
        let reject = |reason: &str| {
            audit_log(&AuditEvent::RefreshRejected {
                reason: reason.to_string(),
                ip_address: client.ip_address.clone(),
                user_agent: client.user_agent.clone(),
            });
            AppError::from(AuthError::InvalidOrExpired)
        };

        let Some((account, refresh_token)) = self.refresh_tokens.rotate(raw).await? else {
            return Err(reject("unknown, expired or already used token"));
        };

        if !account.is_active {
            self.refresh_tokens.revoke(&refresh_token).await?;
            return Err(reject("inactive account"));
        }

        let access_token = self.issue_access_token(&account)?;

        audit_log(&AuditEvent::TokenRefresh {
            account_id: account.id,
            email: account.email.clone(),
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
        });

        Ok(TokenPair::bearer(access_token, refresh_token))
    }

    /// Revoke a refresh token. Unknown tokens fail with `InvalidRefreshToken`.
    pub async fn logout(&self, raw: &str, client: &ClientInfo) -> Result<(), AppError> {
        let revoked = self.refresh_tokens.revoke(raw).await?;

        audit_log(&AuditEvent::Logout {
            revoked,
            ip_address: client.ip_address.clone(),
        });

        if revoked {
            Ok(())
        } else {
            Err(AuthError::InvalidRefreshToken.into())
        }
    }

    fn issue_access_token(&self, account: &Account) -> Result<String, AppError> {
        self.signer
            .issue(&account.email, account.role, self.access_ttl)
            .map_err(|e| AppError::Internal(format!("Failed to issue access token: {e}")))
    }

    async fn hash_password(&self, password: String) -> Result<String, AppError> {
        let hasher = self.hasher.clone();
        let hashed = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(format!("Password hashing task failed: {e}")))??;
        Ok(hashed)
    }

    async fn verify_password(&self, password: String, hashed: String) -> Result<bool, AppError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hashed))
            .await
            .map_err(|e| AppError::Internal(format!("Password verification task failed: {e}")))
    }
}

impl TokenPair {
    fn bearer(access_token: String, refresh_token: String) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing_config;
    use leave_core::MemoryStore;

    fn service_with(config: &AppConfig) -> (Arc<MemoryStore>, SessionService) {
        let db = Arc::new(MemoryStore::new());
        let service = SessionService::new(config, db.clone(), db.clone()).unwrap();
        (db, service)
    }

    fn service() -> (Arc<MemoryStore>, SessionService) {
        service_with(&testing_config())
    }

    fn new_employee(email: &str, password: &str) -> EmployeeCreate {
        EmployeeCreate {
            name: "Diana".to_string(),
            email: email.to_string(),
            department: "HR".to_string(),
            joining_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            password: password.to_string(),
            role: Role::Manager,
        }
    }

    fn auth_error(result: Result<impl std::fmt::Debug, AppError>) -> AuthError {
        match result {
            Err(AppError::Auth(e)) => e,
            other => panic!("expected auth error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_register_uses_given_role_and_default_balance() {
        let (_db, service) = service();
        let client = ClientInfo::default();

        let account = service
            .register(new_employee("diana@example.com", "p"), Role::Employee, &client)
            .await
            .unwrap();

        assert_eq!(account.role, Role::Employee);
        assert_eq!(account.leave_balance, 20);
        assert!(account.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let (_db, service) = service();
        let client = ClientInfo::default();
        service
            .register(new_employee("dup@example.com", "p"), Role::Employee, &client)
            .await
            .unwrap();

        let err = service
            .register(new_employee("dup@example.com", "q"), Role::Employee, &client)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg == "Email already exist"));
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_input() {
        let (_db, service) = service();
        let client = ClientInfo::default();

        let err = service
            .register(new_employee("not-an-email", "p"), Role::Employee, &client)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = service
            .register(new_employee("ok@example.com", ""), Role::Employee, &client)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_login_failures_are_uniform() {
        let (db, service) = service();
        let client = ClientInfo::default();
        let account = service
            .register(new_employee("eve@example.com", "secret"), Role::Employee, &client)
            .await
            .unwrap();

        let unknown = service.login("nobody@example.com", "secret", &client).await;
        let wrong = service.login("eve@example.com", "wrong", &client).await;
        let wrong_case = service.login("EVE@example.com", "secret", &client).await;

        db.set_account_active(account.id, false).await.unwrap();
        let inactive = service.login("eve@example.com", "secret", &client).await;

        for result in [unknown, wrong, wrong_case, inactive] {
            assert_eq!(auth_error(result), AuthError::InvalidCredentials);
        }
        assert_eq!(db.refresh_token_count().await, 0);
    }

    #[tokio::test]
    async fn test_login_issues_verifiable_pair() {
        let (db, service) = service();
        let client = ClientInfo::default();
        service
            .register(new_employee("fay@example.com", "secret"), Role::Manager, &client)
            .await
            .unwrap();

        let pair = service.login("fay@example.com", "secret", &client).await.unwrap();
        assert_eq!(pair.token_type, "bearer");
        assert_eq!(db.refresh_token_count().await, 1);

        let claims = service.signer().verify(&pair.access_token).unwrap();
        assert_eq!(claims.sub, "fay@example.com");
        assert_eq!(claims.role, Role::Manager);
    }

    #[tokio::test]
    async fn test_refresh_rotates_and_rejects_replay() {
        let (db, service) = service();
        let client = ClientInfo::default();
        service
            .register(new_employee("gus@example.com", "secret"), Role::Employee, &client)
            .await
            .unwrap();
        let first = service.login("gus@example.com", "secret", &client).await.unwrap();

        let second = service.refresh(&first.refresh_token, &client).await.unwrap();
        assert_ne!(second.refresh_token, first.refresh_token);
        assert_eq!(db.refresh_token_count().await, 1);

        let replay = service.refresh(&first.refresh_token, &client).await;
        assert_eq!(auth_error(replay), AuthError::InvalidOrExpired);

        // The rotated token still works
        assert!(service.refresh(&second.refresh_token, &client).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_for_inactive_account() {
        let (db, service) = service();
        let client = ClientInfo::default();
        let account = service
            .register(new_employee("hal@example.com", "secret"), Role::Employee, &client)
            .await
            .unwrap();
        let pair = service.login("hal@example.com", "secret", &client).await.unwrap();

        db.set_account_active(account.id, false).await.unwrap();
        let result = service.refresh(&pair.refresh_token, &client).await;
        assert_eq!(auth_error(result), AuthError::InvalidOrExpired);
        assert_eq!(db.refresh_token_count().await, 0);
    }

    #[tokio::test]
    async fn test_logout_then_refresh() {
        let (_db, service) = service();
        let client = ClientInfo::default();
        service
            .register(new_employee("ivy@example.com", "secret"), Role::Employee, &client)
            .await
            .unwrap();
        let pair = service.login("ivy@example.com", "secret", &client).await.unwrap();

        service.logout(&pair.refresh_token, &client).await.unwrap();

        let refresh = service.refresh(&pair.refresh_token, &client).await;
        assert_eq!(auth_error(refresh), AuthError::InvalidOrExpired);

        let second_logout = service.logout(&pair.refresh_token, &client).await;
        assert_eq!(auth_error(second_logout), AuthError::InvalidRefreshToken);
    }

    #[tokio::test]
    async fn test_expired_refresh_token() {
        let mut config = testing_config();
        config.auth.refresh_token_ttl_days = -1;
        let (_db, service) = service_with(&config);
        let client = ClientInfo::default();
        service
            .register(new_employee("jon@example.com", "secret"), Role::Employee, &client)
            .await
            .unwrap();
        let pair = service.login("jon@example.com", "secret", &client).await.unwrap();

        let result = service.refresh(&pair.refresh_token, &client).await;
        assert_eq!(auth_error(result), AuthError::InvalidOrExpired);
    }
}
