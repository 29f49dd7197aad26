// ============================
// filestation-lib/src/lib.rs
// ============================
//! Core library for the filestation server: session, CSRF, and credential
//! management plus the request filters that enforce them.

pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;

use std::sync::Arc;

use crate::auth::{AuthManager, Clock, SystemClock};
use crate::config::Settings;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Authentication authority
    pub auth: Arc<AuthManager>,
    /// Settings the server was started with
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Create application state with the production clock.
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    /// Create application state with an injected clock (tests).
    pub fn with_clock(settings: Settings, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let auth = Arc::new(AuthManager::new(&settings, clock)?);
        Ok(Self {
            auth,
            settings: Arc::new(settings),
        })
    }
}
