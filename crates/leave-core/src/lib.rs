//! Leave Core - Domain models, storage traits, and shared types
//!
//! This crate defines the core abstractions used throughout the leave manager:
//! - Accounts (employees that can log in) and their roles
//! - Leave requests and the leave-balance policy
//! - Refresh token records
//! - Common error types
//! - Repository traits with PostgreSQL and in-memory implementations
//! - Configuration management

pub mod config;
pub mod leave;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use config::{AppConfig, AuthConfig, ConfigError, DatabaseConfig, LeaveConfig, LoggingConfig};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use repository::{AccountRepository, LeaveRepository, RefreshTokenRepository};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for leave manager operations
#[derive(Error, Debug)]
pub enum LeaveError {
    /// The named resource does not exist ("Employee", "Leave request")
    #[error("{0} not found")]
    NotFound(String),

    #[error("Email already exist")]
    DuplicateEmail,

    #[error("{0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

pub type Result<T> = std::result::Result<T, LeaveError>;

impl LeaveError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }
}

// ============================================================================
// Roles
// ============================================================================

/// Authorization tier of an account
///
/// Closed set: every authorization decision matches on it exhaustively.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Employee,
    Manager,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Manager => "manager",
        }
    }

    /// Whether this role may act on resources owned by other accounts
    pub fn bypasses_ownership(&self) -> bool {
        match self {
            Role::Manager => true,
            Role::Employee => false,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = LeaveError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "employee" => Ok(Role::Employee),
            "manager" => Ok(Role::Manager),
            other => Err(LeaveError::validation(format!("Unknown role: {other}"))),
        }
    }
}

// ============================================================================
// Accounts
// ============================================================================

/// Employee record, which is also the login identity
///
/// `email` is unique and matched case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub department: String,
    pub joining_date: NaiveDate,
    pub leave_balance: i32,
    /// Argon2id PHC string
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Data needed to insert a new account
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub department: String,
    pub joining_date: NaiveDate,
    pub leave_balance: i32,
    pub password_hash: String,
    pub role: Role,
}

// ============================================================================
// Refresh tokens
// ============================================================================

/// Stored refresh token. Only the hash of the opaque secret is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub id: i64,
    pub account_id: i64,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    /// A token is live while `expires_at` is strictly in the future
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub account_id: i64,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

// ============================================================================
// Leave requests
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LeaveStatus {
    Applied,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveStatus::Applied => "applied",
            LeaveStatus::Approved => "approved",
            LeaveStatus::Rejected => "rejected",
        }
    }

    /// Applied and approved leaves block overlapping applications
    pub fn blocks_overlap(&self) -> bool {
        matches!(self, LeaveStatus::Applied | LeaveStatus::Approved)
    }
}

impl std::fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LeaveStatus {
    type Err = LeaveError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "applied" => Ok(LeaveStatus::Applied),
            "approved" => Ok(LeaveStatus::Approved),
            "rejected" => Ok(LeaveStatus::Rejected),
            other => Err(LeaveError::validation(format!("Unknown leave status: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveRequest {
    pub id: i64,
    pub employee_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub num_days: i32,
    pub status: LeaveStatus,
}

#[derive(Debug, Clone)]
pub struct NewLeaveRequest {
    pub employee_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub num_days: i32,
}

// ============================================================================
// Pagination
// ============================================================================

/// Offset pagination used by list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    100
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_limit(),
        }
    }
}

impl Pagination {
    pub fn new(skip: u32, limit: u32) -> Self {
        Self { skip, limit }
    }
}
