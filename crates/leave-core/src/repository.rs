//! Storage contracts
//!
//! Every check re-reads the store; implementations must not cache accounts
//! or tokens across calls. Implementations are shared between request
//! tasks behind `Arc<dyn …>`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::{
    Account, LeaveRequest, NewAccount, NewLeaveRequest, NewRefreshToken, Pagination,
    RefreshTokenRecord, Result,
};

/// Employee/user records
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Insert a new account. Fails with `DuplicateEmail` if the email is taken.
    async fn create_account(&self, account: NewAccount) -> Result<Account>;

    async fn find_account_by_id(&self, id: i64) -> Result<Option<Account>>;

    /// Exact, case-sensitive email match
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Accounts ordered by id
    async fn list_accounts(&self, page: Pagination) -> Result<Vec<Account>>;

    /// Connectivity probe for readiness checks
    async fn ping(&self) -> bool {
        true
    }
}

/// Hashed refresh tokens
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn insert_refresh_token(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord>;

    async fn find_refresh_token(&self, token_hash: &str) -> Result<Option<RefreshTokenRecord>>;

    /// Returns whether a row was deleted
    async fn delete_refresh_token(&self, token_hash: &str) -> Result<bool>;

    /// Atomically consume a live token and store its replacement.
    ///
    /// Deletes the row matching `token_hash` only if `expires_at > now`,
    /// then inserts `replacement_hash` for the same account. Returns the
    /// new record, or `None` if nothing live was consumed. Of several
    /// concurrent calls with the same hash at most one returns `Some`.
    async fn rotate_refresh_token(
        &self,
        token_hash: &str,
        replacement_hash: &str,
        replacement_expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>>;

    /// Delete all rows with `expires_at < now`, returning how many went
    async fn delete_expired_refresh_tokens(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// Leave requests and balance bookkeeping
#[async_trait]
pub trait LeaveRepository: Send + Sync {
    async fn create_leave(&self, leave: NewLeaveRequest) -> Result<LeaveRequest>;

    async fn list_leaves_for_employee(
        &self,
        employee_id: i64,
        page: Pagination,
    ) -> Result<Vec<LeaveRequest>>;

    /// Whether an applied or approved leave intersects `[start, end]`
    async fn has_overlapping_leave(
        &self,
        employee_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<bool>;

    /// Approve an applied leave and deduct its days from the owner's
    /// balance in one unit. Returns the leave and the new balance.
    async fn approve_leave(&self, leave_id: i64) -> Result<(LeaveRequest, i32)>;

    async fn reject_leave(&self, leave_id: i64) -> Result<LeaveRequest>;
}
