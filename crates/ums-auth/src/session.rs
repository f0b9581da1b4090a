//! Server-side login sessions
//!
//! A successful login stores a session row keyed by a random token; the
//! token travels in an `HttpOnly` cookie. Each authenticated request slides
//! the expiry forward by the inactivity timeout.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use chrono::{Duration, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use ums_db::{Database, NewSession, Session};
use uuid::Uuid;

use crate::error::AuthError;
use crate::user_details::{UserDetails, UserDetailsService};

/// Session cookie settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// Inactivity timeout
    pub timeout: Duration,
    /// Add the `Secure` attribute to the cookie
    pub cookie_secure: bool,
}

/// Longest allowed inactivity timeout (one year)
pub const MAX_TIMEOUT_MINUTES: i64 = 366 * 24 * 60;

impl SessionConfig {
    /// The timeout is clamped to `1..=MAX_TIMEOUT_MINUTES`
    pub fn new(cookie_name: impl Into<String>, timeout_minutes: i64, cookie_secure: bool) -> Self {
        let clamped = timeout_minutes.clamp(1, MAX_TIMEOUT_MINUTES);
        if clamped != timeout_minutes {
            warn!(
                "Session timeout of {} minutes out of range, using {}",
                timeout_minutes, clamped
            );
        }
        Self {
            cookie_name: cookie_name.into(),
            timeout: Duration::try_minutes(clamped).unwrap_or_else(|| Duration::minutes(1)),
            cookie_secure,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new("UMS_SESSION", 30, false)
    }
}

/// Creates, resolves and revokes login sessions
#[derive(Clone)]
pub struct SessionManager {
    db: Database,
    users: Arc<dyn UserDetailsService>,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(db: Database, users: Arc<dyn UserDetailsService>, config: SessionConfig) -> Self {
        Self { db, users, config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Start a session for an authenticated user
    pub async fn create(&self, user: &UserDetails) -> Result<Session, AuthError> {
        let session = self
            .db
            .create_session(NewSession {
                id: Uuid::new_v4().simple().to_string(),
                user_id: user.id,
                expires_at: Utc::now() + self.config.timeout,
            })
            .await?;

        debug!("Created session for user: {}", user.username);
        Ok(session)
    }

    /// Resolve a session token to its user
    ///
    /// Unknown tokens, expired sessions and sessions of deleted or disabled
    /// users resolve to `None`; dead rows are removed on the way.
    pub async fn resolve(&self, token: &str) -> Result<Option<UserDetails>, AuthError> {
        let Some(session) = self.db.get_session(token).await? else {
            return Ok(None);
        };

        let now = Utc::now();
        if session.is_expired_at(now) {
            debug!("Session expired for user id {}", session.user_id);
            self.db.delete_session(token).await?;
            return Ok(None);
        }

        let user = match self.users.load_user_by_id(session.user_id).await? {
            Some(user) if user.enabled => user,
            _ => {
                self.db.delete_session(token).await?;
                return Ok(None);
            }
        };

        self.db.touch_session(token, now + self.config.timeout).await?;
        Ok(Some(user))
    }

    /// Revoke a session
    pub async fn invalidate(&self, token: &str) -> Result<bool, AuthError> {
        Ok(self.db.delete_session(token).await?)
    }

    /// Remove every expired session
    pub async fn purge_expired(&self) -> Result<u64, AuthError> {
        Ok(self.db.delete_expired_sessions(Utc::now()).await?)
    }

    /// `Set-Cookie` value carrying a session token
    pub fn session_cookie(&self, token: &str) -> String {
        self.cookie(token, self.config.timeout.num_seconds())
    }

    /// `Set-Cookie` value removing the session cookie
    pub fn clear_cookie(&self) -> String {
        self.cookie("", 0)
    }

    fn cookie(&self, value: &str, max_age: i64) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.config.cookie_name, value, max_age
        );
        if self.config.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// Read the session token from the request's `Cookie` headers
    pub fn token_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, value)| *name == self.config.cookie_name && !value.is_empty())
            .map(|(_, value)| value.to_string())
    }
}

/// Periodically remove expired sessions
pub fn spawn_purge_task(sessions: Arc<SessionManager>, every: StdDuration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match sessions.purge_expired().await {
                Ok(0) => {}
                Ok(count) => info!("Purged {} expired sessions", count),
                Err(e) => warn!("Failed to purge expired sessions: {}", e),
            }
        }
    })
}
