//! Authentication and authorization module
//!
//! This module provides the session subsystem:
//! - Password hashing with Argon2id
//! - Access token signing and verification (HS256 JWT)
//! - Opaque refresh tokens with rotation and expiry sweep
//! - Session service for registration, login, refresh and logout
//! - Guard and middleware for request authentication and role checks

pub mod guard;
pub mod jwt;
pub mod password;
pub mod refresh;
pub mod service;

pub use guard::{
    auth_middleware, bearer_token, ensure_self_or_manager, require_role, AuthorizationGuard,
    CurrentAccount,
};
pub use jwt::{Claims, TokenError, TokenSigner};
pub use password::{PasswordConfig, PasswordError, PasswordHasher};
pub use refresh::RefreshTokenStore;
pub use service::{EmployeeCreate, RefreshRequest, SessionService, TokenPair};
