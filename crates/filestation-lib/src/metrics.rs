// ============================
// filestation-lib/src/metrics.rs
// ============================
//! Central place for metric keys
pub const SESSION_CREATED: &str = "auth.session.created";
pub const SESSION_ACTIVE: &str = "auth.session.active";
pub const LOGIN_FAILED: &str = "auth.login.failed";
pub const LOGIN_RATE_LIMITED: &str = "auth.login.rate_limited";
pub const CSRF_ISSUED: &str = "auth.csrf.issued";
pub const SWEEP_REMOVED: &str = "auth.sweep.removed";
