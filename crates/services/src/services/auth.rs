//! Admin login and bearer-token sessions.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use rand::RngCore;
use secrecy::ExposeSecret;
use serde::Serialize;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::config::AdminCredentials;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("admin access is not configured")]
    Disabled,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("session is missing, expired or unknown")]
    InvalidSession,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Checks admin credentials and tracks the sessions issued for them.
/// Sessions are kept in memory and do not survive a restart.
pub struct AdminGate {
    credentials: Option<AdminCredentials>,
    ttl: TimeDelta,
    sessions: DashMap<String, DateTime<Utc>>,
}

impl AdminGate {
    pub fn new(credentials: Option<AdminCredentials>, ttl: Duration) -> Self {
        if credentials.is_none() {
            warn!("No admin credentials configured, admin routes are disabled");
        }
        Self {
            credentials,
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::hours(12)),
            sessions: DashMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn login(&self, username: &str, password: &str) -> Result<AdminSession, AuthError> {
        let credentials = self.credentials.as_ref().ok_or(AuthError::Disabled)?;

        let username_ok = credentials.username.as_bytes().ct_eq(username.as_bytes());
        let password_ok = credentials
            .password
            .expose_secret()
            .as_bytes()
            .ct_eq(password.as_bytes());
        if !bool::from(username_ok & password_ok) {
            warn!(username, "Rejected admin login");
            return Err(AuthError::InvalidCredentials);
        }

        self.purge_expired();
        let session = AdminSession {
            token: new_token(),
            expires_at: Utc::now()
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        self.sessions
            .insert(session.token.clone(), session.expires_at);
        info!(username, expires_at = %session.expires_at, "Admin logged in");
        Ok(session)
    }

    pub fn validate(&self, token: &str) -> Result<(), AuthError> {
        if !self.is_enabled() {
            return Err(AuthError::Disabled);
        }
        let expires_at = self
            .sessions
            .get(token)
            .map(|entry| *entry.value())
            .ok_or(AuthError::InvalidSession)?;
        if expires_at <= Utc::now() {
            self.sessions.remove(token);
            debug!("Admin session expired");
            return Err(AuthError::InvalidSession);
        }
        Ok(())
    }

    /// Ends the session; returns whether it existed.
    pub fn logout(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, expires_at| *expires_at > now);
        before - self.sessions.len()
    }
}

fn new_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn gate(ttl: Duration) -> AdminGate {
        AdminGate::new(
            Some(AdminCredentials {
                username: "admin".to_string(),
                password: SecretString::from("s3cret".to_string()),
            }),
            ttl,
        )
    }

    fn gate_with_ttl(ttl: TimeDelta) -> AdminGate {
        AdminGate {
            ttl,
            ..gate(Duration::ZERO)
        }
    }

    #[test]
    fn test_login_and_validate() {
        let gate = gate(Duration::from_secs(60));
        let session = gate.login("admin", "s3cret").unwrap();
        assert_eq!(session.token.len(), 64);
        assert!(gate.validate(&session.token).is_ok());
        assert!(gate.logout(&session.token));
        assert_eq!(gate.validate(&session.token), Err(AuthError::InvalidSession));
    }

    #[test]
    fn test_wrong_credentials_are_rejected() {
        let gate = gate(Duration::from_secs(60));
        assert_eq!(
            gate.login("admin", "wrong").unwrap_err(),
            AuthError::InvalidCredentials
        );
        assert_eq!(
            gate.login("root", "s3cret").unwrap_err(),
            AuthError::InvalidCredentials
        );
        assert_eq!(gate.validate("not-a-token"), Err(AuthError::InvalidSession));
    }

    #[test]
    fn test_expired_session_is_rejected() {
        let gate = gate(Duration::ZERO);
        let session = gate.login("admin", "s3cret").unwrap();
        assert_eq!(gate.validate(&session.token), Err(AuthError::InvalidSession));
        assert_eq!(gate.purge_expired(), 0);
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let gate = gate(Duration::from_secs(1_000_000_000_000 * 60));
        let session = gate.login("admin", "s3cret").unwrap();
        assert!(session.expires_at > Utc::now());
        assert!(gate.validate(&session.token).is_ok());

        let gate = gate_with_ttl(TimeDelta::MAX);
        let session = gate.login("admin", "s3cret").unwrap();
        assert_eq!(session.expires_at, DateTime::<Utc>::MAX_UTC);
        assert!(gate.validate(&session.token).is_ok());
    }

    #[test]
    fn test_disabled_gate() {
        let gate = AdminGate::new(None, Duration::from_secs(60));
        assert!(!gate.is_enabled());
        assert_eq!(gate.login("admin", "x").unwrap_err(), AuthError::Disabled);
        assert_eq!(gate.validate("x"), Err(AuthError::Disabled));
    }
}
