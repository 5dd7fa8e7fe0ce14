//! Application state management
//!
//! Author: hephaex@gmail.com

use leave_core::{AccountRepository, AppConfig, LeaveRepository, RefreshTokenRepository};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::auth::{AuthorizationGuard, PasswordError, SessionService};

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Employee records
    pub accounts: Arc<dyn AccountRepository>,
    /// Leave requests
    pub leaves: Arc<dyn LeaveRepository>,
    /// Login, refresh, logout, registration
    pub sessions: SessionService,
    /// Bearer token resolution and role checks
    pub guard: AuthorizationGuard,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Error response counter (status >= 400)
    pub error_count: AtomicU64,
    /// Ready status
    pub is_ready: AtomicBool,
}

impl AppState {
    /// Create application state over one store implementing every repository
    pub fn new<S>(config: AppConfig, store: Arc<S>) -> Result<Self, PasswordError>
    where
        S: AccountRepository + RefreshTokenRepository + LeaveRepository + 'static,
    {
        Self::with_repositories(config, store.clone(), store.clone(), store)
    }

    /// Create application state from separate repositories
    pub fn with_repositories(
        config: AppConfig,
        accounts: Arc<dyn AccountRepository>,
        tokens: Arc<dyn RefreshTokenRepository>,
        leaves: Arc<dyn LeaveRepository>,
    ) -> Result<Self, PasswordError> {
        let sessions = SessionService::new(&config, accounts.clone(), tokens)?;
        let guard = AuthorizationGuard::new(sessions.signer().clone(), accounts.clone());

        Ok(Self {
            config,
            accounts,
            leaves,
            sessions,
            guard,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            is_ready: AtomicBool::new(true),
        })
    }

    /// Record one finished request
    pub fn record_request(&self, status: u16) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        if status >= 400 {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    pub fn get_error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Check if service is ready
    pub fn is_ready(&self) -> bool {
        self.is_ready.load(Ordering::SeqCst)
    }
}
