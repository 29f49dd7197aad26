// ============================
// filestation-lib/src/auth/mod.rs
// ============================
//! Authentication and anti-abuse core.

pub mod clock;
pub mod manager;
pub mod password;
pub mod rate_limit;
pub mod reclaimer;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use manager::{AuthManager, SweepStats, DEFAULT_PASSWORD};
pub use password::{
    hash_password, validate_policy, verify_password, PasswordRequirements, PolicyViolation,
    MIN_PASSWORD_LENGTH,
};
pub use rate_limit::LoginRateLimiter;
pub use reclaimer::{spawn_reclaimer, ReclaimerHandle};
pub use token::generate_token;
