// ============================
// filestation-lib/src/auth/manager.rs
// ============================
//! The authentication authority.
//!
//! `AuthManager` owns the admin credential hash, the session map, the CSRF
//! token map, and the login rate limiter. Expiry is checked lazily on every
//! lookup; the periodic sweep only bounds memory and is never needed for
//! correctness.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use metrics::{counter, gauge};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::auth::clock::Clock;
use crate::auth::password::{self, PasswordRequirements};
use crate::auth::rate_limit::LoginRateLimiter;
use crate::auth::token::generate_token;
use crate::config::Settings;
use crate::error::AuthError;
use crate::metrics as keys;

/// First-run admin credential. Intentionally a fixed, documented value:
/// the station boots usable and the operator is expected to change it
/// through the password endpoint, which also revokes every session.
pub const DEFAULT_PASSWORD: &str = "admin123";

/// State guarded by the single reader/writer lock. Credential, sessions,
/// and CSRF tokens move together so `change_password` can swap the hash
/// and drop the sessions without a window in between.
struct AuthState {
    password_hash: String,
    sessions: HashMap<String, Instant>,
    csrf_tokens: HashMap<String, Instant>,
}

/// What one reclaimer sweep removed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub sessions: usize,
    pub csrf_tokens: usize,
    pub attempt_addresses: usize,
}

impl SweepStats {
    pub fn total(&self) -> usize {
        self.sessions + self.csrf_tokens + self.attempt_addresses
    }
}

pub struct AuthManager {
    state: RwLock<AuthState>,
    limiter: LoginRateLimiter,
    requirements: PasswordRequirements,
    session_ttl: Duration,
    csrf_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl AuthManager {
    /// Build the manager and hash the bootstrap credential. Hashing failure
    /// here is an environment fault and aborts startup.
    pub fn new(settings: &Settings, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let password_hash = password::hash_password(DEFAULT_PASSWORD)
            .context("hashing the bootstrap credential")?;
        let limiter = LoginRateLimiter::new(
            settings.max_login_attempts,
            settings.login_window(),
            clock.clone(),
        );
        Ok(Self {
            state: RwLock::new(AuthState {
                password_hash,
                sessions: HashMap::new(),
                csrf_tokens: HashMap::new(),
            }),
            limiter,
            requirements: settings.password_requirements.clone(),
            session_ttl: settings.session_ttl(),
            csrf_ttl: settings.csrf_ttl(),
            clock,
        })
    }

    /// Attempt a login for a client address.
    ///
    /// A blocked address fails before the credential is consulted. A wrong
    /// password records a failed attempt; a correct one clears the address
    /// history and mints a session valid for the configured TTL.
    pub fn login(&self, plain: &str, client_addr: &str) -> Result<String, AuthError> {
        if self.limiter.is_blocked(client_addr) {
            counter!(keys::LOGIN_RATE_LIMITED).increment(1);
            return Err(AuthError::RateLimited);
        }

        // The write lock is held across verification, serializing logins.
        // Verification is slow by construction (scrypt), so this also keeps
        // a concurrent password change from racing the credential read.
        let mut state = self.state.write();
        if !password::verify_password(&state.password_hash, plain) {
            self.limiter.record_failure(client_addr);
            counter!(keys::LOGIN_FAILED).increment(1);
            return Err(AuthError::InvalidCredential);
        }

        self.limiter.clear(client_addr);
        let token = generate_token();
        let expires_at = self.clock.now() + self.session_ttl;
        state.sessions.insert(token.clone(), expires_at);

        counter!(keys::SESSION_CREATED).increment(1);
        gauge!(keys::SESSION_ACTIVE).set(state.sessions.len() as f64);
        info!(client_addr, "admin login");
        Ok(token)
    }

    /// True iff the token is present and unexpired. An expired token still
    /// physically in the map counts as absent.
    pub fn verify_session(&self, token: &str) -> bool {
        let state = self.state.read();
        match state.sessions.get(token) {
            Some(expires_at) => self.clock.now() < *expires_at,
            None => false,
        }
    }

    /// Remove a session. Idempotent; unknown tokens are not an error.
    pub fn logout(&self, token: &str) {
        let mut state = self.state.write();
        state.sessions.remove(token);
        gauge!(keys::SESSION_ACTIVE).set(state.sessions.len() as f64);
    }

    /// Replace the admin credential.
    ///
    /// Verifies the old password, validates the new one against policy,
    /// then swaps the hash and drops every session in one critical section.
    /// Nothing is applied on any failure.
    pub fn change_password(&self, old: &str, new: &str) -> Result<(), AuthError> {
        let mut state = self.state.write();
        if !password::verify_password(&state.password_hash, old) {
            return Err(AuthError::InvalidCredential);
        }
        password::validate_policy(new, &self.requirements)?;
        let hash = password::hash_password(new).map_err(AuthError::Hashing)?;

        state.password_hash = hash;
        let dropped = state.sessions.len();
        state.sessions.clear();
        gauge!(keys::SESSION_ACTIVE).set(0.0);
        info!(sessions_dropped = dropped, "admin password changed, all sessions revoked");
        Ok(())
    }

    /// Mint a one-time CSRF token.
    pub fn issue_csrf_token(&self) -> String {
        let token = generate_token();
        let expires_at = self.clock.now() + self.csrf_ttl;
        self.state.write().csrf_tokens.insert(token.clone(), expires_at);
        counter!(keys::CSRF_ISSUED).increment(1);
        token
    }

    /// Consume a CSRF token. The token is removed whether or not it was
    /// valid; true only if it existed and had not expired. Unknown and
    /// expired tokens are indistinguishable to the caller.
    pub fn verify_and_consume_csrf(&self, token: &str) -> bool {
        let mut state = self.state.write();
        match state.csrf_tokens.remove(token) {
            Some(expires_at) => self.clock.now() < expires_at,
            None => false,
        }
    }

    /// Drop expired sessions and CSRF tokens and prune attempt history.
    /// Shared by the reclaimer and callable directly from tests.
    pub fn sweep_expired(&self) -> SweepStats {
        let now = self.clock.now();
        let mut state = self.state.write();

        let sessions_before = state.sessions.len();
        state.sessions.retain(|_, expires_at| now < *expires_at);
        let csrf_before = state.csrf_tokens.len();
        state.csrf_tokens.retain(|_, expires_at| now < *expires_at);

        let stats = SweepStats {
            sessions: sessions_before - state.sessions.len(),
            csrf_tokens: csrf_before - state.csrf_tokens.len(),
            attempt_addresses: self.limiter.sweep(),
        };

        gauge!(keys::SESSION_ACTIVE).set(state.sessions.len() as f64);
        if stats.total() > 0 {
            counter!(keys::SWEEP_REMOVED).increment(stats.total() as u64);
            debug!(
                sessions = stats.sessions,
                csrf_tokens = stats.csrf_tokens,
                attempt_addresses = stats.attempt_addresses,
                "reclaimed expired auth state"
            );
        }
        stats
    }

    /// Hash a standalone password (used for per-file protection, separate
    /// from the admin credential).
    pub fn hash_password(&self, plain: &str) -> Result<String, AuthError> {
        password::hash_password(plain).map_err(AuthError::Hashing)
    }

    /// Verify a standalone password against its hash.
    pub fn verify_password(&self, hash: &str, plain: &str) -> bool {
        password::verify_password(hash, plain)
    }

    #[cfg(test)]
    fn session_count(&self) -> usize {
        self.state.read().sessions.len()
    }

    #[cfg(test)]
    fn csrf_count(&self) -> usize {
        self.state.read().csrf_tokens.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use crate::auth::password::PolicyViolation;

    const ADDR: &str = "192.0.2.1";

    fn manager() -> (AuthManager, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let manager = AuthManager::new(&Settings::default(), clock.clone()).unwrap();
        (manager, clock)
    }

    #[test]
    fn login_issues_a_valid_session() {
        let (manager, _clock) = manager();
        let token = manager.login(DEFAULT_PASSWORD, ADDR).unwrap();
        assert!(manager.verify_session(&token));
        assert!(!manager.verify_session("no-such-token"));
    }

    #[test]
    fn wrong_password_is_rejected_and_counted() {
        let (manager, _clock) = manager();
        assert!(matches!(
            manager.login("wrong", ADDR),
            Err(AuthError::InvalidCredential)
        ));
        assert_eq!(manager.session_count(), 0);
    }

    #[test]
    fn sixth_attempt_is_blocked_even_with_the_correct_password() {
        let (manager, _clock) = manager();
        for _ in 0..5 {
            assert!(manager.login("wrong", ADDR).is_err());
        }
        assert!(matches!(
            manager.login(DEFAULT_PASSWORD, ADDR),
            Err(AuthError::RateLimited)
        ));
    }

    #[test]
    fn successful_login_clears_the_attempt_window() {
        let (manager, clock) = manager();
        for _ in 0..4 {
            assert!(manager.login("wrong", ADDR).is_err());
        }
        manager.login(DEFAULT_PASSWORD, ADDR).unwrap();

        // the next failure starts a fresh window instead of blocking
        assert!(matches!(
            manager.login("wrong", ADDR),
            Err(AuthError::InvalidCredential)
        ));

        clock.advance(Duration::from_secs(1));
        assert!(manager.login(DEFAULT_PASSWORD, ADDR).is_ok());
    }

    #[test]
    fn blocked_address_unblocks_after_the_window() {
        let (manager, clock) = manager();
        for _ in 0..5 {
            assert!(manager.login("wrong", ADDR).is_err());
        }
        assert!(matches!(
            manager.login(DEFAULT_PASSWORD, ADDR),
            Err(AuthError::RateLimited)
        ));

        clock.advance(Duration::from_secs(15 * 60 + 1));
        assert!(manager.login(DEFAULT_PASSWORD, ADDR).is_ok());
    }

    #[test]
    fn sessions_expire_lazily() {
        let (manager, clock) = manager();
        let token = manager.login(DEFAULT_PASSWORD, ADDR).unwrap();

        clock.advance(Duration::from_secs(24 * 60 * 60 - 1));
        assert!(manager.verify_session(&token));

        clock.advance(Duration::from_secs(2));
        // expired but not yet swept: still rejected
        assert_eq!(manager.session_count(), 1);
        assert!(!manager.verify_session(&token));
    }

    #[test]
    fn logout_is_idempotent() {
        let (manager, _clock) = manager();
        let token = manager.login(DEFAULT_PASSWORD, ADDR).unwrap();

        manager.logout(&token);
        assert!(!manager.verify_session(&token));

        // repeated and unknown logouts are no-ops
        manager.logout(&token);
        manager.logout("never-issued");
        assert_eq!(manager.session_count(), 0);
    }

    #[test]
    fn change_password_revokes_all_sessions() {
        let (manager, _clock) = manager();
        let token = manager.login(DEFAULT_PASSWORD, ADDR).unwrap();
        let other = manager.login(DEFAULT_PASSWORD, "192.0.2.2").unwrap();

        manager.change_password(DEFAULT_PASSWORD, "Abcd1234").unwrap();

        assert!(!manager.verify_session(&token));
        assert!(!manager.verify_session(&other));
        assert!(manager.login("Abcd1234", ADDR).is_ok());
        assert!(matches!(
            manager.login(DEFAULT_PASSWORD, "192.0.2.3"),
            Err(AuthError::InvalidCredential)
        ));
    }

    #[test]
    fn change_password_rejects_policy_violations_without_applying() {
        let (manager, _clock) = manager();
        let token = manager.login(DEFAULT_PASSWORD, ADDR).unwrap();

        let err = manager
            .change_password(DEFAULT_PASSWORD, "abcdefgh")
            .unwrap_err();
        assert!(matches!(
            err,
            AuthError::Policy(PolicyViolation::Composition)
        ));

        // the credential and the sessions are untouched
        assert!(manager.verify_session(&token));
        assert!(manager.login(DEFAULT_PASSWORD, "192.0.2.2").is_ok());
    }

    #[test]
    fn change_password_rejects_wrong_old_password() {
        let (manager, _clock) = manager();
        assert!(matches!(
            manager.change_password("wrong", "Abcd1234"),
            Err(AuthError::InvalidCredential)
        ));
        assert!(manager.login(DEFAULT_PASSWORD, ADDR).is_ok());
    }

    #[test]
    fn csrf_tokens_are_single_use() {
        let (manager, _clock) = manager();
        let token = manager.issue_csrf_token();

        assert!(manager.verify_and_consume_csrf(&token));
        assert!(!manager.verify_and_consume_csrf(&token));
        assert!(!manager.verify_and_consume_csrf("never-issued"));
    }

    #[test]
    fn expired_csrf_tokens_are_consumed_and_rejected() {
        let (manager, clock) = manager();
        let token = manager.issue_csrf_token();

        clock.advance(Duration::from_secs(2 * 60 * 60 + 1));
        assert!(!manager.verify_and_consume_csrf(&token));
        // the expired token was purged by the failed check
        assert_eq!(manager.csrf_count(), 0);
    }

    #[test]
    fn sweep_empties_all_maps_once_everything_expired() {
        let (manager, clock) = manager();
        let session = manager.login(DEFAULT_PASSWORD, ADDR).unwrap();
        let csrf = manager.issue_csrf_token();
        assert!(manager.login("wrong", "192.0.2.9").is_err());

        clock.advance(Duration::from_secs(25 * 60 * 60));

        // lazy checks already reject the physically present entries
        assert_eq!(manager.session_count(), 1);
        assert_eq!(manager.csrf_count(), 1);
        assert!(!manager.verify_session(&session));

        let stats = manager.sweep_expired();
        assert_eq!(
            stats,
            SweepStats {
                sessions: 1,
                csrf_tokens: 1,
                attempt_addresses: 1,
            }
        );
        assert_eq!(manager.session_count(), 0);
        assert_eq!(manager.csrf_count(), 0);
        assert!(!manager.verify_and_consume_csrf(&csrf));
    }

    #[test]
    fn sweep_keeps_live_entries() {
        let (manager, clock) = manager();
        let session = manager.login(DEFAULT_PASSWORD, ADDR).unwrap();

        clock.advance(Duration::from_secs(60));
        assert_eq!(manager.sweep_expired(), SweepStats::default());
        assert!(manager.verify_session(&session));
    }

    #[test]
    fn standalone_password_helpers_are_independent_of_the_credential() {
        let (manager, _clock) = manager();
        let hash = manager.hash_password("FilePass1").unwrap();
        assert!(manager.verify_password(&hash, "FilePass1"));
        assert!(!manager.verify_password(&hash, DEFAULT_PASSWORD));
    }
}
