//! PostgreSQL store
//!
//! Implements the repository traits using SQLx and PostgreSQL. Multi-step
//! writes (refresh-token rotation, leave approval) run in one transaction.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;

use crate::repository::{AccountRepository, LeaveRepository, RefreshTokenRepository};
use crate::{
    leave, Account, LeaveError, LeaveRequest, NewAccount, NewLeaveRequest, NewRefreshToken,
    Pagination, RefreshTokenRecord, Result,
};

const SCHEMA: &str = include_str!("../migrations/0001_init.sql");

const ACCOUNT_COLUMNS: &str = "id, name, email, department, joining_date, leave_balance, \
     password_hash, role, is_active, created_at";

const LEAVE_COLUMNS: &str = "id, employee_id, start_date, end_date, num_days, status";

/// PostgreSQL-backed store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store connection
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| LeaveError::DatabaseError(format!("PostgreSQL connection failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Apply the embedded schema. Safe to run repeatedly.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("apply schema", e))?;
        tracing::info!("Database schema is up to date");
        Ok(())
    }
}

fn db_error(action: &str, e: sqlx::Error) -> LeaveError {
    LeaveError::DatabaseError(format!("Failed to {action}: {e}"))
}

/// Account row from database
#[derive(Debug, FromRow)]
struct AccountRow {
    id: i64,
    name: String,
    email: String,
    department: String,
    joining_date: NaiveDate,
    leave_balance: i32,
    password_hash: String,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = LeaveError;

    fn try_from(row: AccountRow) -> Result<Self> {
        let role = row
            .role
            .parse()
            .map_err(|_| LeaveError::DatabaseError(format!("Invalid role in row: {}", row.role)))?;

        Ok(Account {
            id: row.id,
            name: row.name,
            email: row.email,
            department: row.department,
            joining_date: row.joining_date,
            leave_balance: row.leave_balance,
            password_hash: row.password_hash,
            role,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

/// Refresh token row from database
#[derive(Debug, FromRow)]
struct RefreshTokenRow {
    id: i64,
    account_id: i64,
    token_hash: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<RefreshTokenRow> for RefreshTokenRecord {
    fn from(row: RefreshTokenRow) -> Self {
        RefreshTokenRecord {
            id: row.id,
            account_id: row.account_id,
            token_hash: row.token_hash,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

/// Leave request row from database
#[derive(Debug, FromRow)]
struct LeaveRow {
    id: i64,
    employee_id: i64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    num_days: i32,
    status: String,
}

impl TryFrom<LeaveRow> for LeaveRequest {
    type Error = LeaveError;

    fn try_from(row: LeaveRow) -> Result<Self> {
        let status = row.status.parse().map_err(|_| {
            LeaveError::DatabaseError(format!("Invalid leave status in row: {}", row.status))
        })?;

        Ok(LeaveRequest {
            id: row.id,
            employee_id: row.employee_id,
            start_date: row.start_date,
            end_date: row.end_date,
            num_days: row.num_days,
            status,
        })
    }
}

#[async_trait]
impl AccountRepository for PgStore {
    async fn create_account(&self, account: NewAccount) -> Result<Account> {
        let row: AccountRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO employees (
                name, email, department, joining_date, leave_balance, password_hash, role
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.department)
        .bind(account.joining_date)
        .bind(account.leave_balance)
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => LeaveError::DuplicateEmail,
            e => db_error("create account", e),
        })?;

        Account::try_from(row)
    }

    async fn find_account_by_id(&self, id: i64) -> Result<Option<Account>> {
        let row: Option<AccountRow> =
            sqlx::query_as(&format!("SELECT {ACCOUNT_COLUMNS} FROM employees WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("fetch account", e))?;

        row.map(Account::try_from).transpose()
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM employees WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("fetch account", e))?;

        row.map(Account::try_from).transpose()
    }

    async fn list_accounts(&self, page: Pagination) -> Result<Vec<Account>> {
        let rows: Vec<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM employees ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(page.limit))
        .bind(i64::from(page.skip))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list accounts", e))?;

        rows.into_iter().map(Account::try_from).collect()
    }

    async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

#[async_trait]
impl RefreshTokenRepository for PgStore {
    async fn insert_refresh_token(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord> {
        let row: RefreshTokenRow = sqlx::query_as(
            r#"
            INSERT INTO refresh_tokens (account_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, account_id, token_hash, expires_at, created_at
            "#,
        )
        .bind(token.account_id)
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("store refresh token", e))?;

        Ok(row.into())
    }

    async fn find_refresh_token(&self, token_hash: &str) -> Result<Option<RefreshTokenRecord>> {
        let row: Option<RefreshTokenRow> = sqlx::query_as(
            "SELECT id, account_id, token_hash, expires_at, created_at FROM refresh_tokens WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("fetch refresh token", e))?;

        Ok(row.map(Into::into))
    }

    async fn delete_refresh_token(&self, token_hash: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("revoke refresh token", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn rotate_refresh_token(
        &self,
        token_hash: &str,
        replacement_hash: &str,
        replacement_expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin rotation", e))?;

        // The row lock taken by DELETE makes concurrent rotations of the
        // same hash serialize; the loser sees zero rows.
        let consumed: Option<(i64,)> = sqlx::query_as(
            "DELETE FROM refresh_tokens WHERE token_hash = $1 AND expires_at > $2 RETURNING account_id",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("consume refresh token", e))?;

        let Some((account_id,)) = consumed else {
            tx.rollback()
                .await
                .map_err(|e| db_error("roll back rotation", e))?;
            return Ok(None);
        };

        let row: RefreshTokenRow = sqlx::query_as(
            r#"
            INSERT INTO refresh_tokens (account_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, account_id, token_hash, expires_at, created_at
            "#,
        )
        .bind(account_id)
        .bind(replacement_hash)
        .bind(replacement_expires_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("store rotated refresh token", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("commit rotation", e))?;

        Ok(Some(row.into()))
    }

    async fn delete_expired_refresh_tokens(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("sweep refresh tokens", e))?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl LeaveRepository for PgStore {
    async fn create_leave(&self, new_leave: NewLeaveRequest) -> Result<LeaveRequest> {
        let row: LeaveRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO leave_requests (employee_id, start_date, end_date, num_days, status)
            VALUES ($1, $2, $3, $4, 'applied')
            RETURNING {LEAVE_COLUMNS}
            "#
        ))
        .bind(new_leave.employee_id)
        .bind(new_leave.start_date)
        .bind(new_leave.end_date)
        .bind(new_leave.num_days)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                LeaveError::NotFound("Employee".to_string())
            }
            e => db_error("create leave request", e),
        })?;

        LeaveRequest::try_from(row)
    }

    async fn list_leaves_for_employee(
        &self,
        employee_id: i64,
        page: Pagination,
    ) -> Result<Vec<LeaveRequest>> {
        let rows: Vec<LeaveRow> = sqlx::query_as(&format!(
            r#"
            SELECT {LEAVE_COLUMNS} FROM leave_requests
            WHERE employee_id = $1
            ORDER BY id
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(employee_id)
        .bind(i64::from(page.limit))
        .bind(i64::from(page.skip))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list leave requests", e))?;

        rows.into_iter().map(LeaveRequest::try_from).collect()
    }

    async fn has_overlapping_leave(
        &self,
        employee_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM leave_requests
                WHERE employee_id = $1
                  AND status IN ('applied', 'approved')
                  AND start_date <= $3
                  AND end_date >= $2
            )
            "#,
        )
        .bind(employee_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("check overlapping leave", e))?;

        Ok(exists)
    }

    async fn approve_leave(&self, leave_id: i64) -> Result<(LeaveRequest, i32)> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin approval", e))?;

        let request: LeaveRequest = sqlx::query_as::<_, LeaveRow>(&format!(
            "SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = $1 FOR UPDATE"
        ))
        .bind(leave_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("fetch leave request", e))?
        .ok_or_else(|| LeaveError::NotFound("Leave request".to_string()))?
        .try_into()?;

        let balance: i32 =
            sqlx::query_scalar("SELECT leave_balance FROM employees WHERE id = $1 FOR UPDATE")
                .bind(request.employee_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| db_error("fetch leave balance", e))?
                .ok_or_else(|| LeaveError::NotFound("Employee".to_string()))?;

        let updated_balance = leave::approve(request.status, balance, request.num_days)?;

        sqlx::query("UPDATE employees SET leave_balance = $1 WHERE id = $2")
            .bind(updated_balance)
            .bind(request.employee_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("update leave balance", e))?;

        let approved: LeaveRequest = sqlx::query_as::<_, LeaveRow>(&format!(
            "UPDATE leave_requests SET status = 'approved' WHERE id = $1 RETURNING {LEAVE_COLUMNS}"
        ))
        .bind(leave_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("approve leave request", e))?
        .try_into()?;

        tx.commit()
            .await
            .map_err(|e| db_error("commit approval", e))?;

        Ok((approved, updated_balance))
    }

    async fn reject_leave(&self, leave_id: i64) -> Result<LeaveRequest> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin rejection", e))?;

        let request: LeaveRequest = sqlx::query_as::<_, LeaveRow>(&format!(
            "SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = $1 FOR UPDATE"
        ))
        .bind(leave_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("fetch leave request", e))?
        .ok_or_else(|| LeaveError::NotFound("Leave request".to_string()))?
        .try_into()?;

        leave::reject(request.status)?;

        let rejected: LeaveRequest = sqlx::query_as::<_, LeaveRow>(&format!(
            "UPDATE leave_requests SET status = 'rejected' WHERE id = $1 RETURNING {LEAVE_COLUMNS}"
        ))
        .bind(leave_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("reject leave request", e))?
        .try_into()?;

        tx.commit()
            .await
            .map_err(|e| db_error("commit rejection", e))?;

        Ok(rejected)
    }
}
