// ============================
// filestation-lib/src/config.rs
// ============================
//! Configuration management.
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use crate::auth::password::PasswordRequirements;

/// Application settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Site title shown by the HTTP layer
    pub site_title: String,
    /// Directory shared files are stored in
    pub upload_dir: PathBuf,
    /// Session TTL in seconds
    pub session_ttl_secs: u64,
    /// CSRF token TTL in seconds
    pub csrf_ttl_secs: u64,
    /// Failed login attempts allowed per address within the window
    pub max_login_attempts: usize,
    /// Trailing window for counting failed logins, in seconds
    pub login_window_secs: u64,
    /// Interval between reclaimer sweeps, in seconds
    pub reclaim_interval_secs: u64,
    /// Password requirements
    pub password_requirements: PasswordRequirements,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".parse().expect("valid default bind addr"),
            site_title: "File Station".to_string(),
            upload_dir: PathBuf::from("uploads"),
            session_ttl_secs: 60 * 60 * 24, // 24 hours
            csrf_ttl_secs: 60 * 60 * 2,     // 2 hours
            max_login_attempts: 5,
            login_window_secs: 15 * 60,
            reclaim_interval_secs: 60 * 60,
            password_requirements: PasswordRequirements::default(),
        }
    }
}

impl Settings {
    /// Load settings from `filestation.toml` and `FILESTATION_*` env vars.
    pub fn load() -> Result<Self> {
        Self::load_from("filestation.toml")
    }

    /// Load settings from an explicit config file path, with env overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let settings = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("FILESTATION_"))
            .extract()?;
        Ok(settings)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn csrf_ttl(&self) -> Duration {
        Duration::from_secs(self.csrf_ttl_secs)
    }

    pub fn login_window(&self) -> Duration {
        Duration::from_secs(self.login_window_secs)
    }

    pub fn reclaim_interval(&self) -> Duration {
        Duration::from_secs(self.reclaim_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_constants() {
        let settings = Settings::default();
        assert_eq!(settings.session_ttl(), Duration::from_secs(24 * 60 * 60));
        assert_eq!(settings.csrf_ttl(), Duration::from_secs(2 * 60 * 60));
        assert_eq!(settings.max_login_attempts, 5);
        assert_eq!(settings.login_window(), Duration::from_secs(15 * 60));
        assert_eq!(settings.reclaim_interval(), Duration::from_secs(60 * 60));
        assert_eq!(settings.upload_dir, PathBuf::from("uploads"));
        assert_eq!(settings.password_requirements.min_length, 8);
        assert!(!settings.password_requirements.require_special);
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let settings = Settings::load_from("does-not-exist.toml").unwrap();
        assert_eq!(settings.bind_addr, "127.0.0.1:8080".parse().unwrap());
    }
}
