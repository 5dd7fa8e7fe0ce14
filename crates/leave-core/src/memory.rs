//! In-memory store
//!
//! Implements every repository trait over a single mutex-guarded set of
//! tables. Used by tests and the testing router. Holding one lock per
//! call gives the same atomicity the PostgreSQL store gets from
//! transactions.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

use crate::repository::{AccountRepository, LeaveRepository, RefreshTokenRepository};
use crate::{
    leave, Account, LeaveError, LeaveRequest, LeaveStatus, NewAccount, NewLeaveRequest,
    NewRefreshToken, Pagination, RefreshTokenRecord, Result,
};

#[derive(Debug, Default)]
struct Tables {
    accounts: BTreeMap<i64, Account>,
    refresh_tokens: HashMap<String, RefreshTokenRecord>,
    leaves: BTreeMap<i64, LeaveRequest>,
    next_account_id: i64,
    next_token_id: i64,
    next_leave_id: i64,
}

impl Tables {
    fn insert_token(&mut self, token: NewRefreshToken) -> Result<RefreshTokenRecord> {
        if self.refresh_tokens.contains_key(&token.token_hash) {
            return Err(LeaveError::DatabaseError(
                "duplicate refresh token hash".to_string(),
            ));
        }
        self.next_token_id += 1;
        let record = RefreshTokenRecord {
            id: self.next_token_id,
            account_id: token.account_id,
            token_hash: token.token_hash,
            expires_at: token.expires_at,
            created_at: Utc::now(),
        };
        self.refresh_tokens
            .insert(record.token_hash.clone(), record.clone());
        Ok(record)
    }
}

/// Process-local store for tests and development
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of refresh tokens currently stored, live or not
    pub async fn refresh_token_count(&self) -> usize {
        self.tables.lock().await.refresh_tokens.len()
    }

    /// Flip an account's active flag
    pub async fn set_account_active(&self, id: i64, active: bool) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let account = tables
            .accounts
            .get_mut(&id)
            .ok_or_else(|| LeaveError::NotFound("Employee".to_string()))?;
        account.is_active = active;
        Ok(())
    }
}

fn page<T: Clone>(items: impl Iterator<Item = T>, page: Pagination) -> Vec<T> {
    items
        .skip(page.skip as usize)
        .take(page.limit as usize)
        .collect()
}

#[async_trait]
impl AccountRepository for MemoryStore {
    async fn create_account(&self, account: NewAccount) -> Result<Account> {
        let mut tables = self.tables.lock().await;
        if tables.accounts.values().any(|a| a.email == account.email) {
            return Err(LeaveError::DuplicateEmail);
        }

        tables.next_account_id += 1;
        let created = Account {
            id: tables.next_account_id,
            name: account.name,
            email: account.email,
            department: account.department,
            joining_date: account.joining_date,
            leave_balance: account.leave_balance,
            password_hash: account.password_hash,
            role: account.role,
            is_active: true,
            created_at: Utc::now(),
        };
        tables.accounts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_account_by_id(&self, id: i64) -> Result<Option<Account>> {
        Ok(self.tables.lock().await.accounts.get(&id).cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        Ok(self
            .tables
            .lock()
            .await
            .accounts
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn list_accounts(&self, pagination: Pagination) -> Result<Vec<Account>> {
        let tables = self.tables.lock().await;
        Ok(page(tables.accounts.values().cloned(), pagination))
    }
}

#[async_trait]
impl RefreshTokenRepository for MemoryStore {
    async fn insert_refresh_token(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord> {
        self.tables.lock().await.insert_token(token)
    }

    async fn find_refresh_token(&self, token_hash: &str) -> Result<Option<RefreshTokenRecord>> {
        Ok(self
            .tables
            .lock()
            .await
            .refresh_tokens
            .get(token_hash)
            .cloned())
    }

    async fn delete_refresh_token(&self, token_hash: &str) -> Result<bool> {
        Ok(self
            .tables
            .lock()
            .await
            .refresh_tokens
            .remove(token_hash)
            .is_some())
    }

    async fn rotate_refresh_token(
        &self,
        token_hash: &str,
        replacement_hash: &str,
        replacement_expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>> {
        let mut tables = self.tables.lock().await;

        let live = tables
            .refresh_tokens
            .get(token_hash)
            .is_some_and(|record| record.is_live_at(now));
        if !live {
            return Ok(None);
        }

        let Some(consumed) = tables.refresh_tokens.remove(token_hash) else {
            return Ok(None);
        };
        let replacement = tables.insert_token(NewRefreshToken {
            account_id: consumed.account_id,
            token_hash: replacement_hash.to_string(),
            expires_at: replacement_expires_at,
        })?;
        Ok(Some(replacement))
    }

    async fn delete_expired_refresh_tokens(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.tables.lock().await;
        let before = tables.refresh_tokens.len();
        tables.refresh_tokens.retain(|_, record| record.expires_at >= now);
        Ok((before - tables.refresh_tokens.len()) as u64)
    }
}

#[async_trait]
impl LeaveRepository for MemoryStore {
    async fn create_leave(&self, leave: NewLeaveRequest) -> Result<LeaveRequest> {
        let mut tables = self.tables.lock().await;
        if !tables.accounts.contains_key(&leave.employee_id) {
            return Err(LeaveError::NotFound("Employee".to_string()));
        }

        tables.next_leave_id += 1;
        let created = LeaveRequest {
            id: tables.next_leave_id,
            employee_id: leave.employee_id,
            start_date: leave.start_date,
            end_date: leave.end_date,
            num_days: leave.num_days,
            status: LeaveStatus::Applied,
        };
        tables.leaves.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_leaves_for_employee(
        &self,
        employee_id: i64,
        pagination: Pagination,
    ) -> Result<Vec<LeaveRequest>> {
        let tables = self.tables.lock().await;
        Ok(page(
            tables
                .leaves
                .values()
                .filter(|l| l.employee_id == employee_id)
                .cloned(),
            pagination,
        ))
    }

    async fn has_overlapping_leave(
        &self,
        employee_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<bool> {
        Ok(self.tables.lock().await.leaves.values().any(|l| {
            l.employee_id == employee_id
                && l.status.blocks_overlap()
                && leave::ranges_overlap(l.start_date, l.end_date, start, end)
        }))
    }

    async fn approve_leave(&self, leave_id: i64) -> Result<(LeaveRequest, i32)> {
        let mut tables = self.tables.lock().await;
        let request = tables
            .leaves
            .get(&leave_id)
            .cloned()
            .ok_or_else(|| LeaveError::NotFound("Leave request".to_string()))?;
        let account = tables
            .accounts
            .get_mut(&request.employee_id)
            .ok_or_else(|| LeaveError::NotFound("Employee".to_string()))?;

        let balance = leave::approve(request.status, account.leave_balance, request.num_days)?;
        account.leave_balance = balance;

        let approved = LeaveRequest {
            status: LeaveStatus::Approved,
            ..request
        };
        tables.leaves.insert(leave_id, approved.clone());
        Ok((approved, balance))
    }

    async fn reject_leave(&self, leave_id: i64) -> Result<LeaveRequest> {
        let mut tables = self.tables.lock().await;
        let request = tables
            .leaves
            .get_mut(&leave_id)
            .ok_or_else(|| LeaveError::NotFound("Leave request".to_string()))?;

        leave::reject(request.status)?;
        request.status = LeaveStatus::Rejected;
        Ok(request.clone())
    }
}
